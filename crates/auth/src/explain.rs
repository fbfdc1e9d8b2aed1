//! Authorization explanations for audit and debugging views.

use serde::Serialize;

use crate::evaluator::{effective_permissions, has_permission, is_super_admin, CheckOptions};
use crate::permissions::{Permission, PermissionSource, PermissionWithSource};
use crate::user::User;

/// Detailed explanation of a permission decision.
///
/// Answers "why can / can't this user do X?" for the dashboard's audit views.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    /// The permission that was checked.
    pub required_permission: Permission,

    pub direct_only: bool,

    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// Grants that satisfy the check (empty on denial or super-admin override).
    pub matched: Vec<PermissionWithSource>,

    pub is_super_admin: bool,

    /// If denied, what was missing and how to fix it.
    pub denial: Option<Denial>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Denial {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// No user in session.
    Unauthenticated,
    /// Neither a direct grant nor any role grants the permission.
    MissingPermission,
    /// Only a role grants it, but the check demanded a direct grant.
    DirectOnly,
}

pub fn explain(
    user: Option<&User>,
    required: Permission,
    options: CheckOptions,
) -> AuthorizationExplanation {
    let base = |granted: bool,
                reason: String,
                matched: Vec<PermissionWithSource>,
                denial: Option<Denial>| AuthorizationExplanation {
        required_permission: required,
        direct_only: options.direct_only,
        granted,
        reason,
        matched,
        is_super_admin: is_super_admin(user),
        denial,
    };

    if user.is_none() {
        return base(
            false,
            "No authenticated user in session".to_string(),
            Vec::new(),
            Some(Denial {
                kind: DenialKind::Unauthenticated,
                message: "Sign in to evaluate permissions".to_string(),
                suggestions: vec!["Log in again; the session may have expired".to_string()],
            }),
        );
    }

    if is_super_admin(user) {
        return base(
            true,
            "User is a super-admin; every permission check passes".to_string(),
            Vec::new(),
            None,
        );
    }

    let matching: Vec<PermissionWithSource> = effective_permissions(user)
        .into_iter()
        .filter(|p| p.permission == required)
        .collect();

    if has_permission(user, required, options) {
        let matched: Vec<_> = if options.direct_only {
            matching
                .into_iter()
                .filter(|p| p.source == PermissionSource::Direct)
                .collect()
        } else {
            matching
        };
        let sources = matched
            .iter()
            .map(|p| p.source.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return base(
            true,
            format!("Permission '{required}' granted via {sources}"),
            matched,
            None,
        );
    }

    if options.direct_only && !matching.is_empty() {
        let roles: Vec<String> = matching.iter().map(|p| p.source.to_string()).collect();
        return base(
            false,
            format!("Permission '{required}' is only granted through roles ({})", roles.join(", ")),
            Vec::new(),
            Some(Denial {
                kind: DenialKind::DirectOnly,
                message: format!("'{required}' must be granted directly to the user"),
                suggestions: vec![format!("Grant '{required}' directly to the user")],
            }),
        );
    }

    base(
        false,
        format!("User does not have permission '{required}'"),
        Vec::new(),
        Some(Denial {
            kind: DenialKind::MissingPermission,
            message: format!("Missing required permission: '{required}'"),
            suggestions: vec![
                format!("Assign a role that grants '{required}'"),
                format!("Grant '{required}' directly to the user"),
            ],
        }),
    )
}
