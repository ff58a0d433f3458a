//! ink! contract metadata (the contract's interface description).
//!
//! Only the parts needed to call messages are kept: message specs and the
//! portable type registry used to encode arguments and decode outputs.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::contract::types::{ContractError, ContractResult};

/// Interface description embedded at build time.
pub const EMBEDDED_METADATA: &str = include_str!("../../artifacts/metadata.json");

/// Scalar types of the portable registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    Char,
    Str,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    I8,
    I16,
    I32,
    I64,
    I128,
    I256,
}

/// A struct field or enum variant field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: u32,
    #[serde(default)]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct CompositeDef {
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    pub index: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct VariantDef {
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ElementDef {
    #[serde(rename = "type")]
    pub ty: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ArrayDef {
    pub len: u32,
    #[serde(rename = "type")]
    pub ty: u32,
}

/// Shape of a registry type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeDef {
    Primitive(Primitive),
    Composite(CompositeDef),
    Variant(VariantDef),
    Sequence(ElementDef),
    Array(ArrayDef),
    Tuple(Vec<u32>),
    Compact(ElementDef),
    BitSequence(Value),
}

/// A registry entry: definition plus its Rust path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TypeInfo {
    #[serde(default)]
    pub path: Vec<String>,
    pub def: TypeDef,
}

impl TypeInfo {
    /// Last path segment, e.g. `AccountId`.
    pub fn name(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct PortableType {
    id: u32,
    #[serde(rename = "type")]
    ty: TypeInfo,
}

/// Type registry indexed by id.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<u32, TypeInfo>,
}

impl TypeRegistry {
    pub fn resolve(&self, id: u32) -> ContractResult<&TypeInfo> {
        self.types
            .get(&id)
            .ok_or_else(|| ContractError::Metadata(format!("type id {} not in registry", id)))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<(u32, TypeInfo)> for TypeRegistry {
    fn from_iter<I: IntoIterator<Item = (u32, TypeInfo)>>(iter: I) -> Self {
        Self {
            types: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeSpec {
    #[serde(rename = "type")]
    ty: u32,
    #[serde(default)]
    display_name: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawArg {
    label: String,
    #[serde(rename = "type")]
    ty: TypeSpec,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    label: String,
    selector: String,
    #[serde(default)]
    mutates: bool,
    #[serde(default)]
    payable: bool,
    #[serde(default)]
    args: Vec<RawArg>,
    #[serde(default)]
    return_type: Option<TypeSpec>,
    #[serde(default)]
    docs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSpec {
    #[serde(default)]
    messages: Vec<RawMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct RawContract {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    contract: RawContract,
    spec: RawSpec,
    types: Vec<PortableType>,
}

/// A message argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub label: String,
    pub ty: u32,
    pub display_name: Vec<String>,
}

/// A callable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSpec {
    pub label: String,
    pub selector: [u8; 4],
    pub mutates: bool,
    pub payable: bool,
    pub args: Vec<ArgSpec>,
    pub return_type: Option<u32>,
    pub docs: String,
}

/// Parsed contract interface.
#[derive(Debug, Clone)]
pub struct ContractMetadata {
    pub name: String,
    pub contract_version: String,
    /// Metadata format version (4 or 5).
    pub format_version: u32,
    messages: Vec<MessageSpec>,
    registry: TypeRegistry,
}

impl ContractMetadata {
    /// Parse metadata JSON as produced by `cargo contract build`.
    pub fn from_json(json: &str) -> ContractResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ContractError::Metadata(format!("invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// The interface description compiled into the binary.
    pub fn embedded() -> ContractResult<Self> {
        Self::from_json(EMBEDDED_METADATA)
    }

    /// Load from a file path.
    pub fn from_path(path: &std::path::Path) -> ContractResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ContractError::Metadata(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    fn from_value(value: Value) -> ContractResult<Self> {
        if value.get("V3").is_some() || value.get("V2").is_some() || value.get("V1").is_some() {
            return Err(ContractError::Metadata(
                "legacy metadata format, rebuild the contract with ink! 4 or newer".to_string(),
            ));
        }

        let raw: RawMetadata = serde_json::from_value(value)
            .map_err(|e| ContractError::Metadata(e.to_string()))?;

        let format_version = match &raw.version {
            Some(Value::String(s)) => s.parse::<u32>().ok(),
            Some(Value::Number(n)) => n.as_u64().map(|n| n as u32),
            _ => None,
        }
        .filter(|v| *v >= 4)
        .ok_or_else(|| {
            ContractError::Metadata(format!("unsupported metadata version {:?}", raw.version))
        })?;

        let registry: TypeRegistry = raw.types.into_iter().map(|t| (t.id, t.ty)).collect();

        let messages = raw
            .spec
            .messages
            .into_iter()
            .map(|m| {
                let selector = parse_selector(&m.label, &m.selector)?;
                Ok(MessageSpec {
                    label: m.label,
                    selector,
                    mutates: m.mutates,
                    payable: m.payable,
                    args: m
                        .args
                        .into_iter()
                        .map(|a| ArgSpec {
                            label: a.label,
                            ty: a.ty.ty,
                            display_name: a.ty.display_name,
                        })
                        .collect(),
                    return_type: m.return_type.map(|r| r.ty),
                    docs: m.docs.join("\n").trim().to_string(),
                })
            })
            .collect::<ContractResult<Vec<_>>>()?;

        for message in &messages {
            for arg in &message.args {
                registry.resolve(arg.ty)?;
            }
            if let Some(ty) = message.return_type {
                registry.resolve(ty)?;
            }
        }

        Ok(Self {
            name: raw.contract.name,
            contract_version: raw.contract.version,
            format_version,
            messages,
            registry,
        })
    }

    /// Look up a message by label.
    pub fn message(&self, label: &str) -> ContractResult<&MessageSpec> {
        self.messages
            .iter()
            .find(|m| m.label == label)
            .ok_or_else(|| ContractError::UnknownMessage(label.to_string()))
    }

    pub fn messages(&self) -> &[MessageSpec] {
        &self.messages
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Whether `ty` is ink!'s `MessageResult<T>`, i.e. `Result<T, LangError>`.
    pub fn is_message_result(&self, ty: u32) -> bool {
        let Ok(info) = self.registry.resolve(ty) else {
            return false;
        };
        let TypeDef::Variant(def) = &info.def else {
            return false;
        };
        if info.path != ["Result"] {
            return false;
        }
        def.variants
            .iter()
            .find(|v| v.name == "Err")
            .and_then(|v| v.fields.first())
            .and_then(|f| self.registry.resolve(f.ty).ok())
            .is_some_and(|err| err.name() == Some("LangError"))
    }
}

fn parse_selector(label: &str, selector: &str) -> ContractResult<[u8; 4]> {
    let bytes = hex::decode(selector.strip_prefix("0x").unwrap_or(selector))
        .map_err(|e| ContractError::Metadata(format!("message '{}' selector: {}", label, e)))?;
    bytes.try_into().map_err(|_| {
        ContractError::Metadata(format!("message '{}' selector must be 4 bytes", label))
    })
}
