//! User Aggregate: customers and vendors share one collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::order::Address;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub public_id: Option<String>,
    pub vendor_public_id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub store_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub store_status: AccountStatus,
    pub shipping_addresses: Vec<ShippingAddress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole { #[default] User, Vendor }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus { #[default] Active, Inactive, Suspended }

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(flatten)]
    pub address: Address,
    #[serde(default)]
    pub is_default: bool,
}

/// Store metadata a vendor registers with.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDetails {
    pub store_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
}

/// Partial profile update; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub logo: Option<String>,
    pub shipping_addresses: Option<Vec<ShippingAddress>>,
}

/// Fields an admin may change on any account.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub store_name: Option<String>,
    pub store_status: Option<AccountStatus>,
}

impl User {
    pub fn customer(name: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), public_id: None, vendor_public_id: None, name: name.into(),
            email: normalize_email(&email.into()), password_hash, role: UserRole::User, store_name: None,
            phone_number: None, address: None, description: None, logo: None,
            store_status: AccountStatus::Active, shipping_addresses: vec![], created_at: now, updated_at: now,
        }
    }

    pub fn vendor(name: impl Into<String>, email: impl Into<String>, password_hash: String, store: StoreDetails) -> Self {
        let mut user = Self::customer(name, email, password_hash);
        user.role = UserRole::Vendor;
        user.set_store(store);
        user
    }

    pub fn is_vendor(&self) -> bool { self.role == UserRole::Vendor }

    pub fn set_store(&mut self, store: StoreDetails) {
        self.store_name = store.store_name;
        self.phone_number = store.phone_number;
        self.address = store.address;
        self.description = store.description;
        self.logo = store.logo;
        self.touch();
    }

    pub fn apply_profile(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) { self.name = name; }
        if let Some(phone) = update.phone_number { self.phone_number = Some(phone); }
        if let Some(address) = update.address { self.address = Some(address); }
        if let Some(logo) = update.logo { self.logo = Some(logo); }
        if let Some(mut addresses) = update.shipping_addresses {
            // at most one default; the first flagged wins
            let mut seen_default = false;
            for a in &mut addresses {
                a.is_default = a.is_default && !seen_default;
                seen_default |= a.is_default;
            }
            self.shipping_addresses = addresses;
        }
        self.touch();
    }

    pub fn apply_account_update(&mut self, update: AccountUpdate) {
        if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) { self.name = name; }
        if let Some(email) = update.email.filter(|e| !e.trim().is_empty()) { self.email = normalize_email(&email); }
        if let Some(role) = update.role { self.role = role; }
        if let Some(store_name) = update.store_name { self.store_name = Some(store_name); }
        if let Some(status) = update.store_status { self.store_status = status; }
        self.touch();
    }

    pub fn default_shipping_address(&self) -> Option<&Address> {
        self.shipping_addresses.iter().find(|a| a.is_default).map(|a| &a.address)
    }

    pub fn set_password_hash(&mut self, hash: String) { self.password_hash = hash; self.touch(); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_registration() {
        let v = User::vendor("Ada", " Ada@Shop.io ", "hash".into(), StoreDetails { store_name: Some("Ada's".into()), ..Default::default() });
        assert!(v.is_vendor());
        assert_eq!(v.email, "ada@shop.io");
        assert_eq!(v.store_name.as_deref(), Some("Ada's"));
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let u = User::customer("Bo", "bo@x.io", "secret-hash".into());
        let json = serde_json::to_string(&u).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"storeStatus\":\"active\""));
    }

    #[test]
    fn test_single_default_address() {
        let mut u = User::customer("Bo", "bo@x.io", "h".into());
        let addr = |city: &str| ShippingAddress { address: Address { city: city.into(), ..Default::default() }, is_default: true };
        u.apply_profile(ProfileUpdate { shipping_addresses: Some(vec![addr("Oslo"), addr("Rome")]), ..Default::default() });
        assert_eq!(u.shipping_addresses.iter().filter(|a| a.is_default).count(), 1);
        assert_eq!(u.default_shipping_address().map(|a| a.city.as_str()), Some("Oslo"));
    }

    #[test]
    fn test_blank_name_is_ignored() {
        let mut u = User::customer("Bo", "bo@x.io", "h".into());
        u.apply_profile(ProfileUpdate { name: Some("  ".into()), phone_number: Some("555".into()), ..Default::default() });
        assert_eq!(u.name, "Bo");
        assert_eq!(u.phone_number.as_deref(), Some("555"));
    }

    #[test]
    fn test_account_update_promotes_to_vendor() {
        let mut u = User::customer("Bo", "bo@x.io", "h".into());
        u.apply_account_update(AccountUpdate {
            email: Some(" BO@Store.io".into()),
            role: Some(UserRole::Vendor),
            store_status: Some(AccountStatus::Suspended),
            name: Some("  ".into()),
            ..Default::default()
        });
        assert!(u.is_vendor());
        assert_eq!(u.email, "bo@store.io");
        assert_eq!(u.name, "Bo");
        assert_eq!(u.store_status, AccountStatus::Suspended);
    }
}
