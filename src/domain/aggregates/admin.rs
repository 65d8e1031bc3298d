//! Admin Aggregate: a separate identity class from marketplace users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::user::{normalize_email, AccountStatus};

pub const LOGIN_HISTORY_LIMIT: usize = 50;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: Uuid,
    pub public_id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: AdminRole,
    pub permissions: Vec<Permission>,
    pub status: AccountStatus,
    pub last_login: Option<DateTime<Utc>>,
    pub login_history: Vec<LoginRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole { #[default] Admin, SuperAdmin }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    ManageVendors,
    ManageProducts,
    ManageOrders,
    ManageCategories,
    ManageSettings,
    ViewAnalytics,
    ManageAdmins,
}

impl Permission {
    pub const ALL: [Permission; 8] = [
        Self::ManageUsers, Self::ManageVendors, Self::ManageProducts, Self::ManageOrders,
        Self::ManageCategories, Self::ManageSettings, Self::ViewAnalytics, Self::ManageAdmins,
    ];
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRecord {
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Admin {
    pub fn new(name: impl Into<String>, email: &str, password_hash: String, role: AdminRole, permissions: Vec<Permission>) -> Self {
        let now = Utc::now();
        let permissions = permissions.into_iter().fold(Vec::new(), |mut acc, p| {
            if !acc.contains(&p) { acc.push(p); }
            acc
        });
        Self {
            id: Uuid::now_v7(), public_id: None, name: name.into(), email: normalize_email(email), password_hash,
            role, permissions, status: AccountStatus::Active, last_login: None, login_history: vec![],
            created_at: now, updated_at: now,
        }
    }

    pub fn super_admin(name: impl Into<String>, email: &str, password_hash: String) -> Self {
        Self::new(name, email, password_hash, AdminRole::SuperAdmin, Permission::ALL.to_vec())
    }

    pub fn is_super_admin(&self) -> bool { self.role == AdminRole::SuperAdmin }
    pub fn is_active(&self) -> bool { self.status == AccountStatus::Active }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_super_admin() || self.permissions.contains(&permission)
    }

    /// Appends to the login history, keeping only the newest entries.
    pub fn record_login(&mut self, ip_address: Option<String>, user_agent: Option<String>) {
        let now = Utc::now();
        self.last_login = Some(now);
        self.login_history.push(LoginRecord { timestamp: now, ip_address, user_agent });
        if self.login_history.len() > LOGIN_HISTORY_LIMIT {
            let excess = self.login_history.len() - LOGIN_HISTORY_LIMIT;
            self.login_history.drain(..excess);
        }
        self.updated_at = now;
    }

    pub fn rename(&mut self, name: String) {
        if !name.trim().is_empty() { self.name = name; self.updated_at = Utc::now(); }
    }

    pub fn set_password_hash(&mut self, hash: String) { self.password_hash = hash; self.updated_at = Utc::now(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions() {
        let admin = Admin::new("Ops", "ops@x.io", "h".into(), AdminRole::Admin, vec![Permission::ViewAnalytics]);
        assert!(admin.has_permission(Permission::ViewAnalytics));
        assert!(!admin.has_permission(Permission::ManageUsers));
        let root = Admin::super_admin("Root", "root@x.io", "h".into());
        assert!(root.is_super_admin());
        assert!(Permission::ALL.iter().all(|p| root.has_permission(*p)));
    }

    #[test]
    fn test_login_history_is_bounded() {
        let mut admin = Admin::super_admin("Root", "root@x.io", "h".into());
        for i in 0..(LOGIN_HISTORY_LIMIT + 5) {
            admin.record_login(Some(format!("10.0.0.{i}")), None);
        }
        assert_eq!(admin.login_history.len(), LOGIN_HISTORY_LIMIT);
        assert_eq!(admin.login_history[0].ip_address.as_deref(), Some("10.0.0.5"));
        assert!(admin.last_login.is_some());
    }

    #[test]
    fn test_permission_wire_names() {
        assert_eq!(serde_json::to_string(&Permission::ViewAnalytics).unwrap(), "\"view_analytics\"");
    }
}
