//! Types shared between message groups

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Index of a software interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceIndex(pub u32);

impl InterfaceIndex {
    /// Wildcard used by dumps to mean "every interface"
    pub const ANY: Self = Self(u32::MAX);
}

impl Display for InterfaceIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for InterfaceIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Ethernet hardware address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl Display for MacAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Error returned when parsing a malformed MAC address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid MAC address: {0}")]
pub struct ParseMacError(String);

impl FromStr for MacAddress {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 6];
        let mut parts = s.split(':');
        for byte in &mut out {
            let part = parts.next().ok_or_else(|| ParseMacError(s.to_string()))?;
            if part.len() != 2 {
                return Err(ParseMacError(s.to_string()));
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| ParseMacError(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(ParseMacError(s.to_string()));
        }
        Ok(Self(out))
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Interface status flags (`if_status_flags`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IfStatusFlags(pub u32);

impl IfStatusFlags {
    pub const ADMIN_UP: Self = Self(1);
    pub const LINK_UP: Self = Self(2);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_address_round_trips_through_text() {
        let mac: MacAddress = "de:ad:be:ef:00:01".parse().unwrap();
        assert_eq!(mac, MacAddress([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]));
        assert_eq!(mac.to_string(), "de:ad:be:ef:00:01");
    }

    #[test]
    fn malformed_mac_addresses_are_rejected() {
        for bad in ["", "de:ad:be:ef:00", "de:ad:be:ef:00:01:02", "zz:ad:be:ef:00:01", "d:ad:be:ef:00:01"] {
            assert!(bad.parse::<MacAddress>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn json_forms() {
        assert_eq!(serde_json::to_string(&InterfaceIndex(7)).unwrap(), "7");
        assert_eq!(
            serde_json::to_string(&MacAddress::default()).unwrap(),
            "\"00:00:00:00:00:00\""
        );
        let mac: MacAddress = serde_json::from_str("\"02:fe:00:00:00:01\"").unwrap();
        assert_eq!(mac.0[0], 0x02);
    }

    #[test]
    fn status_flags() {
        let flags = IfStatusFlags::ADMIN_UP.union(IfStatusFlags::LINK_UP);
        assert!(flags.contains(IfStatusFlags::ADMIN_UP));
        assert!(!IfStatusFlags::default().contains(IfStatusFlags::LINK_UP));
    }
}
