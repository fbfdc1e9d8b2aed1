//! User record as returned by the upstream API (`/auth/me`, login, switch).
//!
//! The session owns one `User` at a time and replaces it wholesale on every
//! re-fetch; nothing here is mutated in place.

use serde::{Deserialize, Serialize};

use paydesk_core::{UserId, VendorId};

use crate::context::ContextKind;
use crate::permissions::{Permission, PermissionRecord};
use crate::roles::Role;

/// Provenance name used for `platform_permissions` that no platform role
/// accounts for.
pub const PLATFORM_GRANT: &str = "platform";

/// Admin sub-record, present for platform operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default)]
    pub is_platform_admin: bool,
    #[serde(default)]
    pub platform_roles: Vec<Role>,
    #[serde(default)]
    pub platform_permissions: Vec<PermissionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Legacy flag predating the `admin` sub-record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_super_admin: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminProfile>,

    /// Permissions granted to the user independently of any role.
    #[serde(default)]
    pub permissions: Vec<PermissionRecord>,

    /// Vendor-side roles.
    #[serde(default)]
    pub roles: Vec<Role>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<VendorId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_contexts: Option<Vec<ContextKind>>,
}

impl User {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            name: None,
            is_super_admin: None,
            admin: None,
            permissions: Vec::new(),
            roles: Vec::new(),
            vendor_id: None,
            available_contexts: None,
        }
    }

    pub fn with_admin(mut self, admin: AdminProfile) -> Self {
        self.admin = Some(admin);
        self
    }

    pub fn with_direct(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions
            .extend(permissions.into_iter().map(PermissionRecord::from));
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn with_vendor(mut self, vendor_id: VendorId) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    /// Known direct permissions; unknown wire names are skipped.
    pub fn direct_permissions(&self) -> impl Iterator<Item = Permission> + '_ {
        self.permissions.iter().filter_map(PermissionRecord::permission)
    }

    /// Every role the user holds: vendor roles first, then platform roles.
    pub fn all_roles(&self) -> impl Iterator<Item = &Role> + '_ {
        self.roles.iter().chain(
            self.admin
                .iter()
                .flat_map(|admin| admin.platform_roles.iter()),
        )
    }

    /// Role-derived permissions paired with the name of the granting role.
    ///
    /// `platform_permissions` count as role-derived; entries that no platform
    /// role grants are attributed to [`PLATFORM_GRANT`].
    pub fn role_permissions(&self) -> impl Iterator<Item = (Permission, &str)> + '_ {
        let from_roles = self
            .all_roles()
            .flat_map(|role| role.granted().map(move |p| (p, role.name.as_str())));

        let platform = self.admin.iter().flat_map(|admin| {
            admin
                .platform_permissions
                .iter()
                .filter_map(PermissionRecord::permission)
                .filter(move |p| !admin.platform_roles.iter().any(|r| r.grants(*p)))
                .map(|p| (p, PLATFORM_GRANT))
        });

        from_roles.chain(platform)
    }

    /// Contexts this user may hold a session in.
    ///
    /// Uses the upstream's explicit list when sent; otherwise admin is
    /// available to platform/super admins and vendor to users bound to a vendor.
    pub fn available_contexts(&self) -> Vec<ContextKind> {
        if let Some(explicit) = &self.available_contexts {
            return explicit.clone();
        }

        let mut contexts = Vec::with_capacity(2);
        if self
            .admin
            .as_ref()
            .is_some_and(|a| a.is_platform_admin || a.is_super_admin)
        {
            contexts.push(ContextKind::Admin);
        }
        if self.vendor_id.is_some() {
            contexts.push(ContextKind::Vendor);
        }
        contexts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_upstream_payload() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "0190a5a0-0000-7000-8000-000000000001",
            "email": "ops@example.com"
        }))
        .unwrap();

        assert!(user.admin.is_none());
        assert!(user.permissions.is_empty());
        assert!(user.available_contexts().is_empty());
    }

    #[test]
    fn accepts_non_uuid_identifiers() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 42,
            "email": "vendor@example.com",
            "vendor_id": "acme-payments"
        }))
        .unwrap();

        assert_eq!(user.id, UserId::from(42));
        assert_eq!(user.vendor_id.as_ref().map(ToString::to_string).as_deref(), Some("acme-payments"));
        assert_eq!(user.available_contexts(), vec![ContextKind::Vendor]);
        assert_eq!(serde_json::to_value(&user).unwrap()["id"], 42);
    }

    #[test]
    fn derives_contexts_when_not_sent() {
        let user = User::new(UserId::new(), "dual@example.com")
            .with_vendor(VendorId::new())
            .with_admin(AdminProfile {
                is_platform_admin: true,
                ..Default::default()
            });

        assert_eq!(
            user.available_contexts(),
            vec![ContextKind::Admin, ContextKind::Vendor]
        );
    }

    #[test]
    fn explicit_contexts_win() {
        let mut user = User::new(UserId::new(), "v@example.com").with_vendor(VendorId::new());
        user.available_contexts = Some(vec![]);
        assert!(user.available_contexts().is_empty());
    }

    #[test]
    fn platform_permissions_not_covered_by_a_role_use_platform_grant() {
        let user = User::new(UserId::new(), "a@example.com").with_admin(AdminProfile {
            is_platform_admin: true,
            platform_roles: vec![Role::new("Compliance").with_permissions([Permission::ViewKyc])],
            platform_permissions: vec![Permission::ViewKyc.into(), Permission::ViewVendors.into()],
            ..Default::default()
        });

        let derived: Vec<_> = user.role_permissions().collect();
        assert_eq!(
            derived,
            vec![
                (Permission::ViewKyc, "Compliance"),
                (Permission::ViewVendors, PLATFORM_GRANT),
            ]
        );
    }
}
