//! `paydesk-auth`: pure authorization model for the dashboard (no I/O).
//!
//! Permission enumeration, system roles, the user record as delivered by the
//! upstream API, and the evaluator that turns them into decisions.

pub mod context;
pub mod error;
pub mod evaluator;
pub mod explain;
pub mod permissions;
pub mod roles;
pub mod token;
pub mod user;

pub use context::ContextKind;
pub use error::{AuthError, AuthResult};
pub use evaluator::{
    can_delete_role, can_modify_role, effective_permissions, has_all_permissions, has_all_roles,
    has_any_permission, has_any_role, has_permission, has_role, is_platform_admin,
    is_super_admin, require_permission, CheckOptions, PermissionService,
};
pub use explain::{explain, AuthorizationExplanation, Denial, DenialKind};
pub use permissions::{
    to_backend_permission, to_frontend_permission, Permission, PermissionCategory,
    PermissionRecord, PermissionSource, PermissionWithSource, UnknownPermission,
};
pub use roles::{is_system_role, Role, PLATFORM_ADMIN, SUPER_ADMIN, SYSTEM_ROLES};
pub use token::{validate_token, SessionToken, TokenValidationError};
pub use user::{AdminProfile, User};
