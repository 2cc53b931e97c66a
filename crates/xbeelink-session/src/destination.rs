use std::fmt;

use xbeelink_frame::{Address16, Address64};

use crate::config::ModuleKind;
use crate::error::{Result, SessionError};

/// Where a remote request is sent.
///
/// Exactly one addressing mode per request; the enum makes any other
/// combination unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Node identifier (`NI`), resolved to a 64-bit address before sending.
    NodeId(String),
    /// 64-bit hardware address.
    Address64(Address64),
    /// 16-bit network address.
    Address16(Address16),
    /// Every node in range.
    Broadcast,
}

impl Destination {
    pub fn node_id(identifier: impl Into<String>) -> Self {
        Self::NodeId(identifier.into())
    }

    /// Parse a 64-bit address from 16 hex digits (either case).
    pub fn address64_hex(hex: &str) -> Result<Self> {
        parse_hex::<8>("destination64", hex).map(Self::Address64)
    }

    /// Parse a 16-bit address from 4 hex digits (either case).
    pub fn address16_hex(hex: &str) -> Result<Self> {
        parse_hex::<2>("destination16", hex).map(Self::Address16)
    }

    pub fn address64_bytes(bytes: &[u8]) -> Result<Self> {
        <Address64>::try_from(bytes)
            .map(Self::Address64)
            .map_err(|_| wrong_length("destination64", 8))
    }

    pub fn address16_bytes(bytes: &[u8]) -> Result<Self> {
        <Address16>::try_from(bytes)
            .map(Self::Address16)
            .map_err(|_| wrong_length("destination16", 2))
    }

    /// Reject destinations the module family cannot address.
    pub(crate) fn check(&self, module: ModuleKind) -> Result<()> {
        match self {
            Self::NodeId(identifier) if identifier.is_empty() => Err(SessionError::Validation(
                "node identifier must not be empty".to_string(),
            )),
            Self::NodeId(_) if !module.supports_node_ids() => Err(SessionError::Validation(
                format!("node identifier destinations are not supported on {module}"),
            )),
            _ => Ok(()),
        }
    }
}

impl From<Address64> for Destination {
    fn from(address: Address64) -> Self {
        Self::Address64(address)
    }
}

impl From<Address16> for Destination {
    fn from(address: Address16) -> Self {
        Self::Address16(address)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeId(identifier) => write!(f, "node '{identifier}'"),
            Self::Address64(address) => f.write_str(&to_hex(address)),
            Self::Address16(address) => f.write_str(&to_hex(address)),
            Self::Broadcast => f.write_str("broadcast"),
        }
    }
}

/// Format an address as upper-case hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn parse_hex<const N: usize>(field: &str, hex: &str) -> Result<[u8; N]> {
    if hex.len() != N * 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(wrong_length(field, N));
    }
    let mut out = [0u8; N];
    for (slot, pair) in out.iter_mut().zip(hex.as_bytes().chunks_exact(2)) {
        let digits = std::str::from_utf8(pair).map_err(|_| wrong_length(field, N))?;
        *slot = u8::from_str_radix(digits, 16).map_err(|_| wrong_length(field, N))?;
    }
    Ok(out)
}

fn wrong_length(field: &str, bytes: usize) -> SessionError {
    SessionError::Validation(format!(
        "'{field}' must be a hex string of length {} or a byte array of length {bytes}",
        bytes * 2
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_in_either_case() {
        assert_eq!(
            Destination::address64_hex("0013a20040A1B2C3").unwrap(),
            Destination::Address64([0x00, 0x13, 0xA2, 0x00, 0x40, 0xA1, 0xB2, 0xC3])
        );
        assert_eq!(
            Destination::address16_hex("fffe").unwrap(),
            Destination::Address16([0xFF, 0xFE])
        );
    }

    #[test]
    fn rejects_wrong_lengths_and_digits() {
        for bad in ["", "0102", "01020304050607", "010203040506070809", "01020304050607zz"] {
            assert!(Destination::address64_hex(bad).unwrap_err().is_validation(), "{bad}");
        }
        assert!(Destination::address16_hex("123").is_err());
        assert!(Destination::address16_hex("+123").is_err());
        assert!(Destination::address64_bytes(&[1, 2, 3]).is_err());
        assert!(Destination::address16_bytes(&[1, 2]).is_ok());
    }

    #[test]
    fn node_ids_are_checked_against_module() {
        assert!(Destination::node_id("PUMP").check(ModuleKind::ZigBee).is_ok());
        assert!(Destination::node_id("PUMP").check(ModuleKind::Series1).is_err());
        assert!(Destination::node_id("").check(ModuleKind::ZigBee).is_err());
        assert!(Destination::Broadcast.check(ModuleKind::Series1).is_ok());
    }

    #[test]
    fn displays_addresses_as_hex() {
        assert_eq!(
            Destination::Address64([0, 0x13, 0xA2, 0, 0x40, 0x0A, 0x0B, 0x0C]).to_string(),
            "0013A200400A0B0C"
        );
        assert_eq!(Destination::node_id("PUMP").to_string(), "node 'PUMP'");
    }
}
