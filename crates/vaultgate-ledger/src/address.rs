// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - ACCOUNT ADDRESSES
//
// Fixed-length 20-byte account identifiers, rendered as "0x" + 40 hex chars.
// Mixed-case input must carry a valid Keccak-256 case checksum; uniform-case
// input is accepted as-is. Parsing never panics on any input.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Address length in raw bytes (40 hex chars on the wire)
pub const ADDRESS_BYTES: usize = 20;

/// A 20-byte account identifier.
///
/// `Ord` is derived so addresses can key `BTreeMap`s with deterministic
/// iteration order (required for the conservation audit and for the
/// sorted-order lock acquisition in batch distribution).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_BYTES]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    /// Input does not start with "0x"
    MissingPrefix,
    /// Hex part is not exactly 40 characters
    BadLength(usize),
    /// Non-hex character in the hex part
    InvalidHex,
    /// Mixed-case input whose case pattern fails the checksum
    BadChecksum,
}

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressParseError::MissingPrefix => write!(f, "address must start with 0x"),
            AddressParseError::BadLength(n) => {
                write!(f, "address must be 40 hex chars, got {}", n)
            }
            AddressParseError::InvalidHex => write!(f, "address contains non-hex characters"),
            AddressParseError::BadChecksum => write!(f, "address case checksum mismatch"),
        }
    }
}

impl std::error::Error for AddressParseError {}

impl Address {
    pub const fn from_bytes(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Checksummed string form: "0x" + hex with Keccak-256 case encoding.
    /// A hex letter is uppercased when the corresponding nibble of
    /// keccak256(lowercase_hex) is >= 8.
    pub fn to_checksum_string(&self) -> String {
        let lower = hex::encode(self.0);
        let mut hasher = Keccak256::new();
        hasher.update(lower.as_bytes());
        let digest = hasher.finalize();

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                digest[i / 2] >> 4
            } else {
                digest[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .strip_prefix("0x")
            .ok_or(AddressParseError::MissingPrefix)?;

        if hex_part.len() != ADDRESS_BYTES * 2 {
            return Err(AddressParseError::BadLength(hex_part.len()));
        }

        let mut bytes = [0u8; ADDRESS_BYTES];
        hex::decode_to_slice(&hex_part.to_ascii_lowercase(), &mut bytes)
            .map_err(|_| AddressParseError::InvalidHex)?;

        let addr = Address(bytes);

        // Uniform-case input carries no checksum information and is accepted.
        // Mixed-case input MUST match the checksum encoding exactly.
        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && addr.to_checksum_string() != s {
            return Err(AddressParseError::BadChecksum);
        }

        Ok(addr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum_string())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_checksum_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
