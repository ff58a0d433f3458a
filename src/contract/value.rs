//! SCALE values described by the contract's type registry.
//!
//! Values are exchanged as `serde_json::Value` in a human-readable form:
//! - integers as numbers (128-bit values that overflow 64 bits as strings)
//! - byte sequences and arrays as `0x` hex strings
//! - `AccountId` as an SS58 string
//! - structs as objects, tuple structs as arrays, newtypes transparently
//! - fieldless enum variants as their name, others as `{"Variant": ..}`
//! - `Option` as `null` or the inner value

use parity_scale_codec::{Compact, Decode, Encode, Input};
use serde_json::{Map, Value};

use crate::chain::AccountId;
use crate::contract::metadata::{Field, Primitive, TypeDef, TypeInfo, TypeRegistry};
use crate::contract::types::{ContractError, ContractResult};

const MAX_DEPTH: usize = 64;

fn codec_err(context: &str, e: parity_scale_codec::Error) -> ContractError {
    ContractError::Decode(format!("{}: {}", context, e))
}

fn is_option(info: &TypeInfo) -> bool {
    info.path == ["Option"]
}

fn is_account_id(info: &TypeInfo) -> bool {
    info.name() == Some("AccountId")
}

fn is_byte(registry: &TypeRegistry, ty: u32) -> bool {
    matches!(
        registry.resolve(ty).map(|info| &info.def),
        Ok(TypeDef::Primitive(Primitive::U8))
    )
}

/// Decode one value of type `ty` from the front of `input`.
pub fn decode(registry: &TypeRegistry, ty: u32, input: &mut &[u8]) -> ContractResult<Value> {
    decode_at(registry, ty, input, 0)
}

/// Decode a buffer holding exactly one value of type `ty`.
pub fn decode_all(registry: &TypeRegistry, ty: u32, bytes: &[u8]) -> ContractResult<Value> {
    let mut input = bytes;
    let value = decode(registry, ty, &mut input)?;
    if !input.is_empty() {
        return Err(ContractError::Decode(format!(
            "type {}: {} trailing byte(s)",
            ty,
            input.len()
        )));
    }
    Ok(value)
}

fn decode_at(registry: &TypeRegistry, ty: u32, input: &mut &[u8], depth: usize) -> ContractResult<Value> {
    if depth > MAX_DEPTH {
        return Err(ContractError::Decode("type nesting too deep".to_string()));
    }
    let info = registry.resolve(ty)?;

    match &info.def {
        TypeDef::Primitive(p) => decode_primitive(*p, input),
        TypeDef::Composite(_) if is_account_id(info) => {
            let raw = <[u8; 32]>::decode(input).map_err(|e| codec_err("AccountId", e))?;
            Ok(Value::String(AccountId(raw).to_string()))
        }
        TypeDef::Composite(def) => decode_fields(registry, &def.fields, input, depth),
        TypeDef::Variant(def) => {
            let index = u8::decode(input).map_err(|e| codec_err("variant index", e))?;
            let variant = def.variants.iter().find(|v| v.index == index).ok_or_else(|| {
                ContractError::Decode(format!(
                    "variant index {} not defined for {}",
                    index,
                    info.path.join("::")
                ))
            })?;

            if is_option(info) {
                return match variant.name.as_str() {
                    "None" => Ok(Value::Null),
                    _ => decode_fields(registry, &variant.fields, input, depth),
                };
            }
            if variant.fields.is_empty() {
                return Ok(Value::String(variant.name.clone()));
            }

            let inner = decode_fields(registry, &variant.fields, input, depth)?;
            let mut object = Map::new();
            object.insert(variant.name.clone(), inner);
            Ok(Value::Object(object))
        }
        TypeDef::Sequence(element) => {
            let len = Compact::<u32>::decode(input).map_err(|e| codec_err("sequence length", e))?.0;
            decode_elements(registry, element.ty, len as usize, input, depth)
        }
        TypeDef::Array(array) => decode_elements(registry, array.ty, array.len as usize, input, depth),
        TypeDef::Tuple(items) if items.is_empty() => Ok(Value::Null),
        TypeDef::Tuple(items) => items
            .iter()
            .map(|item| decode_at(registry, *item, input, depth + 1))
            .collect::<ContractResult<Vec<_>>>()
            .map(Value::Array),
        TypeDef::Compact(_) => {
            let n = Compact::<u128>::decode(input).map_err(|e| codec_err("compact", e))?.0;
            Ok(number_u128(n))
        }
        TypeDef::BitSequence(_) => Err(ContractError::Decode("bit sequences are not supported".to_string())),
    }
}

fn decode_fields(registry: &TypeRegistry, fields: &[Field], input: &mut &[u8], depth: usize) -> ContractResult<Value> {
    match fields {
        [] => Ok(Value::Null),
        [single] if single.name.is_none() => decode_at(registry, single.ty, input, depth + 1),
        _ if fields.iter().all(|f| f.name.is_some()) => {
            let mut object = Map::new();
            for field in fields {
                let value = decode_at(registry, field.ty, input, depth + 1)?;
                object.insert(field.name.clone().unwrap_or_default(), value);
            }
            Ok(Value::Object(object))
        }
        _ => fields
            .iter()
            .map(|f| decode_at(registry, f.ty, input, depth + 1))
            .collect::<ContractResult<Vec<_>>>()
            .map(Value::Array),
    }
}

fn decode_elements(registry: &TypeRegistry, ty: u32, len: usize, input: &mut &[u8], depth: usize) -> ContractResult<Value> {
    if is_byte(registry, ty) {
        if len > input.len() {
            return Err(ContractError::Decode(format!(
                "need {} bytes, {} left",
                len,
                input.len()
            )));
        }
        let mut bytes = vec![0u8; len];
        input.read(&mut bytes).map_err(|e| codec_err("bytes", e))?;
        return Ok(Value::String(format!("0x{}", hex::encode(bytes))));
    }

    let mut items = Vec::with_capacity(len.min(input.len()));
    for _ in 0..len {
        items.push(decode_at(registry, ty, input, depth + 1)?);
    }
    Ok(Value::Array(items))
}

fn number_u128(n: u128) -> Value {
    u64::try_from(n).map_or_else(|_| Value::String(n.to_string()), Value::from)
}

fn number_i128(n: i128) -> Value {
    i64::try_from(n).map_or_else(|_| Value::String(n.to_string()), Value::from)
}

fn decode_primitive(primitive: Primitive, input: &mut &[u8]) -> ContractResult<Value> {
    let err = |e| codec_err("primitive", e);
    Ok(match primitive {
        Primitive::Bool => Value::Bool(bool::decode(input).map_err(err)?),
        Primitive::Char => {
            let code = u32::decode(input).map_err(err)?;
            let c = char::from_u32(code)
                .ok_or_else(|| ContractError::Decode(format!("invalid char {:#x}", code)))?;
            Value::String(c.to_string())
        }
        Primitive::Str => Value::String(String::decode(input).map_err(err)?),
        Primitive::U8 => Value::from(u8::decode(input).map_err(err)?),
        Primitive::U16 => Value::from(u16::decode(input).map_err(err)?),
        Primitive::U32 => Value::from(u32::decode(input).map_err(err)?),
        Primitive::U64 => Value::from(u64::decode(input).map_err(err)?),
        Primitive::U128 => number_u128(u128::decode(input).map_err(err)?),
        Primitive::I8 => Value::from(i8::decode(input).map_err(err)?),
        Primitive::I16 => Value::from(i16::decode(input).map_err(err)?),
        Primitive::I32 => Value::from(i32::decode(input).map_err(err)?),
        Primitive::I64 => Value::from(i64::decode(input).map_err(err)?),
        Primitive::I128 => number_i128(i128::decode(input).map_err(err)?),
        Primitive::U256 | Primitive::I256 => {
            let mut le = <[u8; 32]>::decode(input).map_err(err)?;
            le.reverse();
            Value::String(format!("0x{}", hex::encode(le)))
        }
    })
}

/// Encode `value` as type `ty`, appending to `out`.
pub fn encode(registry: &TypeRegistry, ty: u32, value: &Value, out: &mut Vec<u8>) -> ContractResult<()> {
    encode_at(registry, ty, value, out, 0)
}

fn mismatch(expected: &str, value: &Value) -> ContractError {
    ContractError::Encode(format!("{} as {}", value, expected))
}

fn encode_at(registry: &TypeRegistry, ty: u32, value: &Value, out: &mut Vec<u8>, depth: usize) -> ContractResult<()> {
    if depth > MAX_DEPTH {
        return Err(ContractError::Encode("type nesting too deep".to_string()));
    }
    let info = registry.resolve(ty)?;

    match &info.def {
        TypeDef::Primitive(p) => encode_primitive(*p, value, out),
        TypeDef::Composite(_) if is_account_id(info) => {
            let account: AccountId = value
                .as_str()
                .ok_or_else(|| mismatch("AccountId", value))?
                .parse()
                .map_err(|e: crate::chain::ChainError| ContractError::Encode(e.to_string()))?;
            account.encode_to(out);
            Ok(())
        }
        TypeDef::Composite(def) => encode_fields(registry, &def.fields, value, out, depth),
        TypeDef::Variant(def) => {
            if is_option(info) {
                let some = def.variants.iter().find(|v| v.name == "Some");
                return match (value, some) {
                    (Value::Null, _) => {
                        out.push(0);
                        Ok(())
                    }
                    (_, Some(some)) => {
                        out.push(some.index);
                        encode_fields(registry, &some.fields, value, out, depth)
                    }
                    (_, None) => Err(mismatch("Option", value)),
                };
            }

            let (name, inner) = match value {
                Value::String(name) => (name.as_str(), &Value::Null),
                Value::Object(object) if object.len() == 1 => {
                    let (name, inner) = object.iter().next().ok_or_else(|| mismatch("enum", value))?;
                    (name.as_str(), inner)
                }
                _ => return Err(mismatch("enum", value)),
            };
            let variant = def
                .variants
                .iter()
                .find(|v| v.name == name)
                .ok_or_else(|| ContractError::Encode(format!("unknown variant '{}'", name)))?;
            out.push(variant.index);
            encode_fields(registry, &variant.fields, inner, out, depth)
        }
        TypeDef::Sequence(element) => {
            if let (true, Value::String(s)) = (is_byte(registry, element.ty), value) {
                let bytes = hex_arg(s)?;
                bytes.encode_to(out);
                return Ok(());
            }
            let items = value.as_array().ok_or_else(|| mismatch("sequence", value))?;
            Compact(items.len() as u32).encode_to(out);
            for item in items {
                encode_at(registry, element.ty, item, out, depth + 1)?;
            }
            Ok(())
        }
        TypeDef::Array(array) => {
            if let (true, Value::String(s)) = (is_byte(registry, array.ty), value) {
                let bytes = hex_arg(s)?;
                if bytes.len() != array.len as usize {
                    return Err(ContractError::Encode(format!(
                        "expected {} bytes, got {}",
                        array.len,
                        bytes.len()
                    )));
                }
                out.extend_from_slice(&bytes);
                return Ok(());
            }
            let items = value.as_array().ok_or_else(|| mismatch("array", value))?;
            if items.len() != array.len as usize {
                return Err(ContractError::Encode(format!(
                    "expected {} elements, got {}",
                    array.len,
                    items.len()
                )));
            }
            for item in items {
                encode_at(registry, array.ty, item, out, depth + 1)?;
            }
            Ok(())
        }
        TypeDef::Tuple(types) if types.is_empty() => Ok(()),
        TypeDef::Tuple(types) => {
            let items = value.as_array().filter(|a| a.len() == types.len()).ok_or_else(|| {
                mismatch(&format!("{}-tuple", types.len()), value)
            })?;
            for (item_ty, item) in types.iter().zip(items) {
                encode_at(registry, *item_ty, item, out, depth + 1)?;
            }
            Ok(())
        }
        TypeDef::Compact(_) => {
            Compact(as_u128(value)?).encode_to(out);
            Ok(())
        }
        TypeDef::BitSequence(_) => Err(ContractError::Encode("bit sequences are not supported".to_string())),
    }
}

fn encode_fields(registry: &TypeRegistry, fields: &[Field], value: &Value, out: &mut Vec<u8>, depth: usize) -> ContractResult<()> {
    match fields {
        [] => Ok(()),
        [single] if single.name.is_none() => encode_at(registry, single.ty, value, out, depth + 1),
        _ if fields.iter().all(|f| f.name.is_some()) => {
            let object = value.as_object().ok_or_else(|| mismatch("struct", value))?;
            for field in fields {
                let name = field.name.as_deref().unwrap_or_default();
                let item = object
                    .get(name)
                    .ok_or_else(|| ContractError::Encode(format!("missing field '{}'", name)))?;
                encode_at(registry, field.ty, item, out, depth + 1)?;
            }
            Ok(())
        }
        _ => {
            let items = value
                .as_array()
                .filter(|a| a.len() == fields.len())
                .ok_or_else(|| mismatch(&format!("{}-field tuple struct", fields.len()), value))?;
            for (field, item) in fields.iter().zip(items) {
                encode_at(registry, field.ty, item, out, depth + 1)?;
            }
            Ok(())
        }
    }
}

fn hex_arg(s: &str) -> ContractResult<Vec<u8>> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| ContractError::Encode(format!("bytes must be 0x-prefixed hex, got '{}'", s)))?;
    hex::decode(digits).map_err(|e| ContractError::Encode(format!("'{}': {}", s, e)))
}

fn clean_number(s: &str) -> String {
    s.chars().filter(|c| *c != ',' && *c != '_').collect()
}

fn as_u128(value: &Value) -> ContractResult<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from).ok_or_else(|| mismatch("unsigned integer", value)),
        Value::String(s) => clean_number(s).parse().map_err(|_| mismatch("unsigned integer", value)),
        _ => Err(mismatch("unsigned integer", value)),
    }
}

fn as_i128(value: &Value) -> ContractResult<i128> {
    match value {
        Value::Number(n) => n.as_i64().map(i128::from).ok_or_else(|| mismatch("integer", value)),
        Value::String(s) => clean_number(s).parse().map_err(|_| mismatch("integer", value)),
        _ => Err(mismatch("integer", value)),
    }
}

fn encode_primitive(primitive: Primitive, value: &Value, out: &mut Vec<u8>) -> ContractResult<()> {
    fn narrow<T: TryFrom<N>, N: Copy + std::fmt::Display>(n: N, name: &str) -> ContractResult<T> {
        T::try_from(n).map_err(|_| ContractError::Encode(format!("{} out of range for {}", n, name)))
    }

    match primitive {
        Primitive::Bool => value.as_bool().ok_or_else(|| mismatch("bool", value))?.encode_to(out),
        Primitive::Char => {
            let s = value.as_str().ok_or_else(|| mismatch("char", value))?;
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => (c as u32).encode_to(out),
                _ => return Err(mismatch("char", value)),
            }
        }
        Primitive::Str => value.as_str().ok_or_else(|| mismatch("str", value))?.encode_to(out),
        Primitive::U8 => narrow::<u8, _>(as_u128(value)?, "u8")?.encode_to(out),
        Primitive::U16 => narrow::<u16, _>(as_u128(value)?, "u16")?.encode_to(out),
        Primitive::U32 => narrow::<u32, _>(as_u128(value)?, "u32")?.encode_to(out),
        Primitive::U64 => narrow::<u64, _>(as_u128(value)?, "u64")?.encode_to(out),
        Primitive::U128 => as_u128(value)?.encode_to(out),
        Primitive::I8 => narrow::<i8, _>(as_i128(value)?, "i8")?.encode_to(out),
        Primitive::I16 => narrow::<i16, _>(as_i128(value)?, "i16")?.encode_to(out),
        Primitive::I32 => narrow::<i32, _>(as_i128(value)?, "i32")?.encode_to(out),
        Primitive::I64 => narrow::<i64, _>(as_i128(value)?, "i64")?.encode_to(out),
        Primitive::I128 => as_i128(value)?.encode_to(out),
        Primitive::U256 | Primitive::I256 => {
            return Err(ContractError::Encode("256-bit integers are not supported".to_string()))
        }
    }
    Ok(())
}
