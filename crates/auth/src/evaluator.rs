//! Permission evaluation.
//!
//! - No IO
//! - No panics
//! - Total: a missing user is denied by every predicate
//!
//! Super-admins pass every permission check, including `direct_only` checks.

use std::collections::HashSet;

use tracing::debug;

use crate::error::AuthError;
use crate::permissions::{Permission, PermissionSource, PermissionWithSource};
use crate::roles::is_system_role;
use crate::user::User;

/// Options for a single permission check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Only consider permissions granted directly to the user.
    pub direct_only: bool,
}

impl CheckOptions {
    pub const fn direct_only() -> Self {
        Self { direct_only: true }
    }
}

pub fn is_super_admin(user: Option<&User>) -> bool {
    let Some(user) = user else {
        return false;
    };
    match &user.admin {
        Some(admin) => admin.is_super_admin,
        None => user.is_super_admin.unwrap_or(false),
    }
}

pub fn is_platform_admin(user: Option<&User>) -> bool {
    user.and_then(|u| u.admin.as_ref())
        .is_some_and(|admin| admin.is_platform_admin)
}

pub fn has_permission(user: Option<&User>, permission: Permission, options: CheckOptions) -> bool {
    let Some(u) = user else {
        return false;
    };
    if is_super_admin(user) {
        return true;
    }
    if u.direct_permissions().any(|p| p == permission) {
        return true;
    }
    if options.direct_only {
        return false;
    }
    u.role_permissions().any(|(p, _)| p == permission)
}

/// True for an empty list when a user is present.
pub fn has_all_permissions(user: Option<&User>, permissions: &[Permission]) -> bool {
    if user.is_none() {
        return false;
    }
    if is_super_admin(user) {
        return true;
    }
    permissions
        .iter()
        .all(|p| has_permission(user, *p, CheckOptions::default()))
}

pub fn has_any_permission(user: Option<&User>, permissions: &[Permission]) -> bool {
    if is_super_admin(user) {
        return true;
    }
    permissions
        .iter()
        .any(|p| has_permission(user, *p, CheckOptions::default()))
}

pub fn has_role(user: Option<&User>, role_name: &str) -> bool {
    user.is_some_and(|u| u.all_roles().any(|r| r.name == role_name))
}

pub fn has_any_role(user: Option<&User>, role_names: &[&str]) -> bool {
    role_names.iter().any(|name| has_role(user, name))
}

pub fn has_all_roles(user: Option<&User>, role_names: &[&str]) -> bool {
    user.is_some() && role_names.iter().all(|name| has_role(user, name))
}

/// System roles are modifiable only by a super-admin; other roles need
/// `Update Roles`.
pub fn can_modify_role(user: Option<&User>, role_name: &str) -> bool {
    if is_system_role(role_name) {
        return is_super_admin(user);
    }
    has_permission(user, Permission::UpdateRoles, CheckOptions::default())
}

/// System roles are never deletable, not even by a super-admin.
pub fn can_delete_role(user: Option<&User>, role_name: &str) -> bool {
    if is_system_role(role_name) {
        return false;
    }
    has_permission(user, Permission::DeleteRoles, CheckOptions::default())
}

/// Every known permission of the user with its provenance, direct grants
/// first. Identical (permission, source) pairs are reported once.
pub fn effective_permissions(user: Option<&User>) -> Vec<PermissionWithSource> {
    let Some(u) = user else {
        return Vec::new();
    };

    let mut seen: HashSet<(Permission, PermissionSource)> = HashSet::new();
    let mut out = Vec::new();

    let direct = u.direct_permissions().map(|p| (p, PermissionSource::Direct));
    let derived = u.role_permissions().map(|(p, role)| {
        (
            p,
            PermissionSource::Role {
                role_name: role.to_string(),
            },
        )
    });

    for (permission, source) in direct.chain(derived) {
        if seen.insert((permission, source.clone())) {
            out.push(PermissionWithSource::new(permission, source));
        }
    }
    out
}

/// Authorize a user for a permission, for callers that propagate errors.
pub fn require_permission(user: Option<&User>, permission: Permission) -> Result<(), AuthError> {
    if user.is_none() {
        return Err(AuthError::Unauthenticated);
    }
    if has_permission(user, permission, CheckOptions::default()) {
        Ok(())
    } else {
        debug!(permission = %permission, "permission denied");
        Err(AuthError::unauthorized(format!(
            "missing permission '{permission}'"
        )))
    }
}

/// Read-only view over the session's current user.
///
/// Consumers hold one of these instead of reaching for shared state.
#[derive(Debug, Clone, Copy)]
pub struct PermissionService<'a> {
    user: Option<&'a User>,
}

impl<'a> PermissionService<'a> {
    pub fn new(user: Option<&'a User>) -> Self {
        Self { user }
    }

    pub fn user(&self) -> Option<&'a User> {
        self.user
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        has_permission(self.user, permission, CheckOptions::default())
    }

    pub fn has_direct_permission(&self, permission: Permission) -> bool {
        has_permission(self.user, permission, CheckOptions::direct_only())
    }

    pub fn has_all_permissions(&self, permissions: &[Permission]) -> bool {
        has_all_permissions(self.user, permissions)
    }

    pub fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        has_any_permission(self.user, permissions)
    }

    pub fn has_role(&self, role_name: &str) -> bool {
        has_role(self.user, role_name)
    }

    pub fn is_super_admin(&self) -> bool {
        is_super_admin(self.user)
    }

    pub fn is_platform_admin(&self) -> bool {
        is_platform_admin(self.user)
    }

    pub fn can_modify_role(&self, role_name: &str) -> bool {
        can_modify_role(self.user, role_name)
    }

    pub fn can_delete_role(&self, role_name: &str) -> bool {
        can_delete_role(self.user, role_name)
    }

    pub fn effective_permissions(&self) -> Vec<PermissionWithSource> {
        effective_permissions(self.user)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AuthError> {
        require_permission(self.user, permission)
    }
}
