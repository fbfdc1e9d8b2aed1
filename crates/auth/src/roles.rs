use serde::{Deserialize, Serialize};

use crate::permissions::{Permission, PermissionRecord};

/// Reserved role granting every permission.
pub const SUPER_ADMIN: &str = "Super Admin";

/// Reserved role for platform operators.
pub const PLATFORM_ADMIN: &str = "Platform Admin";

/// Role names reserved by the platform. They cannot be deleted, and only a
/// super-admin may modify them.
pub const SYSTEM_ROLES: [&str; 2] = [SUPER_ADMIN, PLATFORM_ADMIN];

/// Exact-match membership test against [`SYSTEM_ROLES`].
pub fn is_system_role(name: &str) -> bool {
    SYSTEM_ROLES.contains(&name)
}

/// Role record as delivered by the upstream API.
///
/// Roles may arrive as a bare name or as `{ "name", "permissions" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRole")]
pub struct Role {
    pub name: String,
    pub permissions: Vec<PermissionRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRole {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        permissions: Vec<PermissionRecord>,
    },
}

impl From<RawRole> for Role {
    fn from(raw: RawRole) -> Self {
        match raw {
            RawRole::Name(name) => Self {
                name,
                permissions: Vec::new(),
            },
            RawRole::Full { name, permissions } => Self { name, permissions },
        }
    }
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions
            .extend(permissions.into_iter().map(PermissionRecord::from));
        self
    }

    pub fn is_system(&self) -> bool {
        is_system_role(&self.name)
    }

    /// Known permissions granted by this role; unknown wire names are skipped.
    pub fn granted(&self) -> impl Iterator<Item = Permission> + '_ {
        self.permissions.iter().filter_map(PermissionRecord::permission)
    }

    pub fn grants(&self, permission: Permission) -> bool {
        self.granted().any(|p| p == permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_reserved_names_are_system_roles() {
        assert!(is_system_role("Super Admin"));
        assert!(is_system_role("Platform Admin"));
        assert!(!is_system_role("super admin"));
        assert!(!is_system_role("Super Admin "));
        assert!(!is_system_role("Finance"));
        assert!(!is_system_role(""));
    }

    #[test]
    fn role_deserializes_from_name_or_object() {
        let roles: Vec<Role> = serde_json::from_value(serde_json::json!([
            "Support",
            { "name": "Finance", "permissions": ["View Payouts", { "name": "manage_payouts" }] }
        ]))
        .unwrap();

        assert_eq!(roles[0], Role::new("Support"));
        assert!(roles[1].grants(Permission::ViewPayouts));
        assert!(roles[1].grants(Permission::ManagePayouts));
        assert!(!roles[1].grants(Permission::ViewKyc));
    }
}
