use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Functional area a permission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PermissionCategory {
    Dashboard,
    Transactions,
    Vendors,
    #[serde(rename = "KYC")]
    Kyc,
    #[serde(rename = "Payment Pages")]
    PaymentPages,
    Payouts,
    Settlements,
    Users,
    Roles,
    Settings,
    Reports,
    Developers,
    Audit,
}

impl PermissionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionCategory::Dashboard => "Dashboard",
            PermissionCategory::Transactions => "Transactions",
            PermissionCategory::Vendors => "Vendors",
            PermissionCategory::Kyc => "KYC",
            PermissionCategory::PaymentPages => "Payment Pages",
            PermissionCategory::Payouts => "Payouts",
            PermissionCategory::Settlements => "Settlements",
            PermissionCategory::Users => "Users",
            PermissionCategory::Roles => "Roles",
            PermissionCategory::Settings => "Settings",
            PermissionCategory::Reports => "Reports",
            PermissionCategory::Developers => "Developers",
            PermissionCategory::Audit => "Audit",
        }
    }
}

impl fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! permissions {
    ($( $variant:ident => $display:literal, $backend:literal, $category:ident; )*) => {
        /// Permission identifier shared with the upstream API.
        ///
        /// The set is closed: wire values are validated through [`FromStr`],
        /// which accepts the display form (`"View KYC"`) as well as the
        /// backend form (`"view_kyc"`).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Permission {
            $( $variant, )*
        }

        impl Permission {
            /// Every permission, in declaration order.
            pub const ALL: &'static [Permission] = &[ $( Permission::$variant, )* ];

            /// Human-readable name used by the dashboard (`"View KYC"`).
            pub const fn display_name(self) -> &'static str {
                match self {
                    $( Permission::$variant => $display, )*
                }
            }

            /// Snake-case name used by direct backend calls (`"view_kyc"`).
            pub const fn backend_name(self) -> &'static str {
                match self {
                    $( Permission::$variant => $backend, )*
                }
            }

            pub const fn category(self) -> PermissionCategory {
                match self {
                    $( Permission::$variant => PermissionCategory::$category, )*
                }
            }
        }
    };
}

permissions! {
    ViewDashboard => "View Dashboard", "view_dashboard", Dashboard;
    ViewTransactions => "View Transactions", "view_transactions", Transactions;
    ExportTransactions => "Export Transactions", "export_transactions", Transactions;
    RefundTransactions => "Refund Transactions", "refund_transactions", Transactions;
    ViewVendors => "View Vendors", "view_vendors", Vendors;
    ManageVendors => "Manage Vendors", "manage_vendors", Vendors;
    ViewKyc => "View KYC", "view_kyc", Kyc;
    ApproveKyc => "Approve KYC", "approve_kyc", Kyc;
    RejectKyc => "Reject KYC", "reject_kyc", Kyc;
    ViewPaymentPages => "View Payment Pages", "view_payment_pages", PaymentPages;
    ManagePaymentPages => "Manage Payment Pages", "manage_payment_pages", PaymentPages;
    ViewPayouts => "View Payouts", "view_payouts", Payouts;
    ManagePayouts => "Manage Payouts", "manage_payouts", Payouts;
    ViewSettlements => "View Settlements", "view_settlements", Settlements;
    ManageSettlements => "Manage Settlements", "manage_settlements", Settlements;
    ViewUsers => "View Users", "view_users", Users;
    CreateUsers => "Create Users", "create_users", Users;
    UpdateUsers => "Update Users", "update_users", Users;
    DeleteUsers => "Delete Users", "delete_users", Users;
    ViewRoles => "View Roles", "view_roles", Roles;
    CreateRoles => "Create Roles", "create_roles", Roles;
    UpdateRoles => "Update Roles", "update_roles", Roles;
    DeleteRoles => "Delete Roles", "delete_roles", Roles;
    AssignRoles => "Assign Roles", "assign_roles", Roles;
    ViewSettings => "View Settings", "view_settings", Settings;
    ManageSettings => "Manage Settings", "manage_settings", Settings;
    ViewReports => "View Reports", "view_reports", Reports;
    ManageApiKeys => "Manage API Keys", "manage_api_keys", Developers;
    ManageWebhooks => "Manage Webhooks", "manage_webhooks", Developers;
    ViewAuditLogs => "View Audit Logs", "view_audit_logs", Audit;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(p) = Permission::ALL.iter().find(|p| p.display_name() == trimmed) {
            return Ok(*p);
        }
        let key = snake_case(trimmed);
        Permission::ALL
            .iter()
            .find(|p| p.backend_name() == key)
            .copied()
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Convert a dashboard permission name to the upstream's snake_case form.
///
/// Names outside the enumeration are lower-cased with whitespace and hyphens
/// collapsed to `_`.
pub fn to_backend_permission(name: &str) -> String {
    match name.parse::<Permission>() {
        Ok(p) => p.backend_name().to_string(),
        Err(_) => snake_case(name),
    }
}

/// Convert an upstream snake_case permission name to its display form.
///
/// Names outside the enumeration are Title Cased word by word.
pub fn to_frontend_permission(name: &str) -> String {
    match name.parse::<Permission>() {
        Ok(p) => p.display_name().to_string(),
        Err(_) => name
            .trim()
            .split(|c: char| c == '_' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .map(title_case)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn snake_case(name: &str) -> String {
    name.trim()
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// A permission as it appears on the wire inside a user or role record.
///
/// The name is kept verbatim; [`PermissionRecord::permission`] validates it
/// against the enumeration. Unknown names never fail deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPermissionRecord")]
pub struct PermissionRecord {
    pub name: String,
    pub category: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPermissionRecord {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        category: Option<String>,
    },
}

impl From<RawPermissionRecord> for PermissionRecord {
    fn from(raw: RawPermissionRecord) -> Self {
        match raw {
            RawPermissionRecord::Name(name) => Self { name, category: None },
            RawPermissionRecord::Full { name, category } => Self { name, category },
        }
    }
}

impl PermissionRecord {
    pub fn permission(&self) -> Option<Permission> {
        self.name.parse().ok()
    }
}

impl From<Permission> for PermissionRecord {
    fn from(p: Permission) -> Self {
        Self {
            name: p.display_name().to_string(),
            category: Some(p.category().as_str().to_string()),
        }
    }
}

/// Where a user's permission comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PermissionSource {
    Direct,
    Role { role_name: String },
}

impl fmt::Display for PermissionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionSource::Direct => f.write_str("direct"),
            PermissionSource::Role { role_name } => write!(f, "role:{role_name}"),
        }
    }
}

/// Permission plus provenance, for display and audit only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionWithSource {
    pub permission: Permission,
    pub category: PermissionCategory,
    pub source: PermissionSource,
}

impl PermissionWithSource {
    pub fn new(permission: Permission, source: PermissionSource) -> Self {
        Self {
            permission,
            category: permission.category(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn display_and_backend_forms_both_parse() {
        assert_eq!("View KYC".parse::<Permission>(), Ok(Permission::ViewKyc));
        assert_eq!("view_kyc".parse::<Permission>(), Ok(Permission::ViewKyc));
        assert_eq!(" view-kyc ".parse::<Permission>(), Ok(Permission::ViewKyc));
        assert!("Launch Rockets".parse::<Permission>().is_err());
    }

    #[test]
    fn documented_mapping_examples() {
        assert_eq!(to_backend_permission("View KYC"), "view_kyc");
        assert_eq!(to_frontend_permission("view_kyc"), "View KYC");
        assert_eq!(to_backend_permission("Manage API Keys"), "manage_api_keys");
    }

    #[test]
    fn unknown_names_fall_back_to_case_conversion() {
        assert_eq!(to_backend_permission("Approve Chargebacks"), "approve_chargebacks");
        assert_eq!(to_frontend_permission("approve_chargebacks"), "Approve Chargebacks");
    }

    #[test]
    fn names_are_unique() {
        let mut display: Vec<_> = Permission::ALL.iter().map(|p| p.display_name()).collect();
        let mut backend: Vec<_> = Permission::ALL.iter().map(|p| p.backend_name()).collect();
        display.sort();
        display.dedup();
        backend.sort();
        backend.dedup();
        assert_eq!(display.len(), Permission::ALL.len());
        assert_eq!(backend.len(), Permission::ALL.len());
    }

    #[test]
    fn backend_names_are_derived_from_display_names() {
        for p in Permission::ALL {
            assert_eq!(snake_case(p.display_name()), p.backend_name(), "{p:?}");
        }
    }

    #[test]
    fn records_accept_plain_strings_and_objects() {
        let records: Vec<PermissionRecord> = serde_json::from_value(serde_json::json!([
            "View Transactions",
            { "name": "view_kyc", "category": "KYC" },
            { "name": "Something Else" }
        ]))
        .unwrap();

        assert_eq!(records[0].permission(), Some(Permission::ViewTransactions));
        assert_eq!(records[1].permission(), Some(Permission::ViewKyc));
        assert_eq!(records[1].category.as_deref(), Some("KYC"));
        assert_eq!(records[2].permission(), None);
    }

    #[test]
    fn source_serializes_as_tagged_variant() {
        let role = PermissionSource::Role { role_name: "Finance".into() };
        assert_eq!(
            serde_json::to_value(&role).unwrap(),
            serde_json::json!({ "type": "role", "role_name": "Finance" })
        );
        assert_eq!(role.to_string(), "role:Finance");
        assert_eq!(PermissionSource::Direct.to_string(), "direct");
    }

    #[test]
    fn permission_serializes_as_display_name() {
        let json = serde_json::to_string(&Permission::ManageVendors).unwrap();
        assert_eq!(json, "\"Manage Vendors\"");
        let back: Permission = serde_json::from_str("\"manage_vendors\"").unwrap();
        assert_eq!(back, Permission::ManageVendors);
    }

    proptest! {
        #[test]
        fn frontend_backend_round_trip_is_identity(idx in 0usize..Permission::ALL.len()) {
            let name = Permission::ALL[idx].display_name();
            prop_assert_eq!(to_frontend_permission(&to_backend_permission(name)), name);
        }

        #[test]
        fn backend_conversion_is_idempotent(name in "[A-Za-z]{1,8}( [A-Za-z]{1,8}){0,3}") {
            let once = to_backend_permission(&name);
            prop_assert_eq!(to_backend_permission(&once), once);
        }
    }
}
