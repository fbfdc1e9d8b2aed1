use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use paydesk_core::DomainError;

/// Operating mode a dual-role user holds a session in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Admin,
    Vendor,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Admin => "admin",
            ContextKind::Vendor => "vendor",
        }
    }

    /// Entering the admin context always needs a fresh password check.
    pub fn requires_verification(&self) -> bool {
        matches!(self, ContextKind::Admin)
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(ContextKind::Admin),
            "vendor" => Ok(ContextKind::Vendor),
            other => Err(DomainError::validation(format!("unknown context '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_requires_verification() {
        assert!(ContextKind::Admin.requires_verification());
        assert!(!ContextKind::Vendor.requires_verification());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Admin".parse::<ContextKind>(), Ok(ContextKind::Admin));
        assert_eq!(" vendor".parse::<ContextKind>(), Ok(ContextKind::Vendor));
        assert!("owner".parse::<ContextKind>().is_err());
    }
}
