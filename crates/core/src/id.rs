//! Strongly-typed identifiers.
//!
//! Ids are issued by the upstream API and are opaque here: a UUID, any other
//! non-empty string, or an integer. They keep their wire shape on the way
//! back out.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Upstream identifier in the shape it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpaqueId {
    Int(i64),
    Text(String),
}

impl OpaqueId {
    fn checked(self, name: &str) -> Result<Self, DomainError> {
        match &self {
            OpaqueId::Text(text) if text.trim().is_empty() => {
                Err(DomainError::invalid_id(format!("{name}: empty identifier")))
            }
            _ => Ok(self),
        }
    }
}

impl fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpaqueId::Int(n) => fmt::Display::fmt(n, f),
            OpaqueId::Text(s) => f.write_str(s),
        }
    }
}

/// Identifier of a dashboard user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "OpaqueId", into = "OpaqueId")]
pub struct UserId(OpaqueId);

/// Identifier of the vendor (merchant) a user operates for in the vendor context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "OpaqueId", into = "OpaqueId")]
pub struct VendorId(OpaqueId);

macro_rules! impl_opaque_id {
    ($t:ident, $name:literal) => {
        impl $t {
            /// Fresh UUIDv7 identifier. Ids normally arrive from the upstream
            /// API; this is mostly useful in tests.
            pub fn new() -> Self {
                Self(OpaqueId::Text(Uuid::now_v7().to_string()))
            }

            pub fn as_opaque(&self) -> &OpaqueId {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(OpaqueId::Text(value.to_string()))
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(OpaqueId::Int(value))
            }
        }

        impl TryFrom<OpaqueId> for $t {
            type Error = DomainError;

            fn try_from(value: OpaqueId) -> Result<Self, Self::Error> {
                value.checked($name).map(Self)
            }
        }

        impl From<$t> for OpaqueId {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::try_from(OpaqueId::Text(s.trim().to_string()))
            }
        }
    };
}

impl_opaque_id!(UserId, "UserId");
impl_opaque_id!(VendorId, "VendorId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reports_the_type_name() {
        let err = "  ".parse::<UserId>().unwrap_err();
        assert!(err.to_string().contains("UserId"));
    }

    #[test]
    fn display_matches_inner_uuid() {
        let uuid = Uuid::now_v7();
        assert_eq!(VendorId::from(uuid).to_string(), uuid.to_string());
    }

    #[test]
    fn integer_and_string_ids_keep_their_wire_shape() {
        let numeric: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(numeric, UserId::from(42));
        assert_eq!(numeric.to_string(), "42");
        assert_eq!(serde_json::to_string(&numeric).unwrap(), "42");

        let text: VendorId = serde_json::from_str("\"vnd_01H8\"").unwrap();
        assert_eq!(text.to_string(), "vnd_01H8");
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"vnd_01H8\"");
    }

    #[test]
    fn empty_or_non_scalar_ids_are_rejected() {
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
        assert!(serde_json::from_str::<UserId>("null").is_err());
        assert!(serde_json::from_str::<UserId>("{\"id\":1}").is_err());
    }
}
