//! # Access Module
//!
//! Roles, permissions, and the acting principal.
//!
//! ## Grant Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Role            Grants                                                 │
//! │  ─────────────   ─────────────────────────────────────────────────────  │
//! │  super_admin  ┐                                                         │
//! │  admin        ├─ every permission                                       │
//! │  cafe_owner   ┘                                                         │
//! │  content_admin┐                                                         │
//! │  editor       ┴─ blog:manage (plus anything explicitly assigned)        │
//! │  staff        ── only the explicitly assigned set                       │
//! │  customer     ── nothing                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Owner Scoping
//! Every financial record carries an `owner_id`. A cafe owner's records are
//! keyed by the owner's own id; staff accounts created by an owner act on
//! the owner's records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

// =============================================================================
// Role
// =============================================================================

/// The fixed set of account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Editor,
    Staff,
    Customer,
    CafeOwner,
    ContentAdmin,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Editor,
        Role::Staff,
        Role::Customer,
        Role::CafeOwner,
        Role::ContentAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Staff => "staff",
            Role::Customer => "customer",
            Role::CafeOwner => "cafe_owner",
            Role::ContentAdmin => "content_admin",
        }
    }

    /// Roles that implicitly hold every permission.
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin | Role::CafeOwner)
    }

    /// Permissions granted by the role alone.
    pub fn implied_permissions(&self) -> &'static [Permission] {
        match self {
            Role::SuperAdmin | Role::Admin | Role::CafeOwner => &Permission::ALL,
            Role::Editor | Role::ContentAdmin => &[Permission::BlogManage],
            Role::Staff | Role::Customer => &[],
        }
    }

    /// Roles an owner may create under their own account.
    pub fn is_assignable_by_owner(&self) -> bool {
        matches!(self, Role::Staff | Role::Editor | Role::ContentAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}

// =============================================================================
// Permission
// =============================================================================

/// Module-level permissions, serialised as `module:action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Permission {
    #[serde(rename = "products:manage")]
    ProductsManage,
    #[serde(rename = "sales:manage")]
    SalesManage,
    #[serde(rename = "invoices:manage")]
    InvoicesManage,
    #[serde(rename = "expenses:manage")]
    ExpensesManage,
    #[serde(rename = "cash_register:manage")]
    CashRegisterManage,
    #[serde(rename = "reports:view")]
    ReportsView,
    #[serde(rename = "blog:manage")]
    BlogManage,
    #[serde(rename = "users:manage")]
    UsersManage,
}

impl Permission {
    pub const ALL: [Permission; 8] = [
        Permission::ProductsManage,
        Permission::SalesManage,
        Permission::InvoicesManage,
        Permission::ExpensesManage,
        Permission::CashRegisterManage,
        Permission::ReportsView,
        Permission::BlogManage,
        Permission::UsersManage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ProductsManage => "products:manage",
            Permission::SalesManage => "sales:manage",
            Permission::InvoicesManage => "invoices:manage",
            Permission::ExpensesManage => "expenses:manage",
            Permission::CashRegisterManage => "cash_register:manage",
            Permission::ReportsView => "reports:view",
            Permission::BlogManage => "blog:manage",
            Permission::UsersManage => "users:manage",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown permission: {}", s))
    }
}

// =============================================================================
// Principal
// =============================================================================

/// The authenticated account acting on a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Principal {
    pub id: String,
    /// Set for accounts created under a cafe owner.
    pub owner_id: Option<String>,
    pub role: Role,
    /// Explicitly assigned permissions, on top of the role's implied ones.
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// The owner id every query of this principal is scoped by.
    pub fn owner_id(&self) -> &str {
        self.owner_id.as_deref().unwrap_or(&self.id)
    }

    /// Checks the role grant first, then the explicit set.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.implied_permissions().contains(&permission)
            || self.permissions.contains(&permission)
    }

    /// Every permission in effect, role grants included.
    pub fn effective_permissions(&self) -> Vec<Permission> {
        Permission::ALL
            .iter()
            .copied()
            .filter(|p| self.has_permission(*p))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role, permissions: Vec<Permission>) -> Principal {
        Principal {
            id: "u1".to_string(),
            owner_id: None,
            role,
            permissions,
        }
    }

    #[test]
    fn test_owner_roles_hold_everything() {
        for role in [Role::SuperAdmin, Role::Admin, Role::CafeOwner] {
            let p = principal(role, vec![]);
            assert!(Permission::ALL.iter().all(|perm| p.has_permission(*perm)));
        }
    }

    #[test]
    fn test_staff_holds_only_assigned() {
        let p = principal(Role::Staff, vec![Permission::SalesManage]);
        assert!(p.has_permission(Permission::SalesManage));
        assert!(!p.has_permission(Permission::ReportsView));
        assert_eq!(p.effective_permissions(), vec![Permission::SalesManage]);
    }

    #[test]
    fn test_content_roles_manage_blog() {
        assert!(principal(Role::Editor, vec![]).has_permission(Permission::BlogManage));
        assert!(principal(Role::ContentAdmin, vec![]).has_permission(Permission::BlogManage));
        assert!(!principal(Role::Customer, vec![]).has_permission(Permission::BlogManage));
    }

    #[test]
    fn test_owner_scoping() {
        let owner = principal(Role::CafeOwner, vec![]);
        assert_eq!(owner.owner_id(), "u1");

        let staff = Principal {
            id: "u2".to_string(),
            owner_id: Some("u1".to_string()),
            role: Role::Staff,
            permissions: vec![],
        };
        assert_eq!(staff.owner_id(), "u1");
    }

    #[test]
    fn test_string_forms() {
        assert_eq!("cafe_owner".parse::<Role>().unwrap(), Role::CafeOwner);
        assert_eq!(
            "cash_register:manage".parse::<Permission>().unwrap(),
            Permission::CashRegisterManage
        );
        assert!("root".parse::<Role>().is_err());
        assert_eq!(
            serde_json::to_string(&Permission::ReportsView).unwrap(),
            "\"reports:view\""
        );
    }
}
