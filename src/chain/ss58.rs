//! SS58 address encoding.
//!
//! `base58(prefix ++ account ++ checksum)` where checksum is the first two
//! bytes of `blake2b_512("SS58PRE" ++ prefix ++ account)`.

use blake2::{Blake2b512, Digest};

const CHECKSUM_PREAMBLE: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;

/// Largest prefix the two-byte form can express.
pub const MAX_PREFIX: u16 = 16383;

/// Reasons an SS58 string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Ss58Error {
    #[error("invalid base58: {0}")]
    Base58(String),
    #[error("invalid length {0}")]
    Length(usize),
    #[error("invalid prefix byte {0:#04x}")]
    Prefix(u8),
    #[error("checksum mismatch")]
    Checksum,
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Blake2b512::new();
    hasher.update(CHECKSUM_PREAMBLE);
    hasher.update(data);
    let digest = hasher.finalize();
    [digest[0], digest[1]]
}

/// Decode an address into its network prefix and 32-byte account.
pub fn decode(address: &str) -> Result<(u16, [u8; 32]), Ss58Error> {
    let data = bs58::decode(address)
        .into_vec()
        .map_err(|e| Ss58Error::Base58(e.to_string()))?;
    let first = *data.first().ok_or(Ss58Error::Length(0))?;

    let (prefix, prefix_len) = match first {
        0..=63 => (first as u16, 1),
        64..=127 => {
            let second = *data.get(1).ok_or(Ss58Error::Length(data.len()))?;
            let lower = ((first & 0b0011_1111) << 2) | (second >> 6);
            let upper = second & 0b0011_1111;
            (lower as u16 | ((upper as u16) << 8), 2)
        }
        _ => return Err(Ss58Error::Prefix(first)),
    };

    if data.len() != prefix_len + 32 + CHECKSUM_LEN {
        return Err(Ss58Error::Length(data.len()));
    }

    let body_end = data.len() - CHECKSUM_LEN;
    if checksum(&data[..body_end]) != data[body_end..] {
        return Err(Ss58Error::Checksum);
    }

    let mut account = [0u8; 32];
    account.copy_from_slice(&data[prefix_len..body_end]);
    Ok((prefix, account))
}

/// Encode a 32-byte account under the given network prefix.
///
/// Prefixes above [`MAX_PREFIX`] are masked to 14 bits.
pub fn encode(prefix: u16, account: &[u8; 32]) -> String {
    let prefix = prefix & MAX_PREFIX;
    let mut data = Vec::with_capacity(2 + 32 + CHECKSUM_LEN);
    if prefix < 64 {
        data.push(prefix as u8);
    } else {
        let first = ((prefix & 0b0000_0000_1111_1100) >> 2) as u8 | 0b0100_0000;
        let second = (prefix >> 8) as u8 | (((prefix & 0b0000_0000_0000_0011) as u8) << 6);
        data.push(first);
        data.push(second);
    }
    data.extend_from_slice(account);
    let sum = checksum(&data);
    data.extend_from_slice(&sum);
    bs58::encode(data).into_string()
}
