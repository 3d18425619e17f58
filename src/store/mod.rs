//! Document store the sync reads from and writes to.
//!
//! [`PgStore`] persists into PostgreSQL; [`MemoryStore`] keeps everything in
//! process and backs the tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::{
    AdditionalSettings, Address, AddressType, Contact, Customer, DocStatus, Item, SalesOrder, WooCommerceSettings,
};
use crate::domain::value_objects::SiteDomain;
use crate::Result;

/// Entry of the ERP error log.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorLog { pub id: Uuid, pub title: String, pub message: String, pub creation: DateTime<Utc> }

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn woocommerce_settings(&self) -> Result<WooCommerceSettings>;
    async fn additional_settings(&self) -> Result<AdditionalSettings>;
    async fn system_language(&self) -> Result<Option<String>>;
    /// Source text to translated text for `language`.
    async fn translations(&self, language: &str) -> Result<HashMap<String, String>>;
    async fn company_abbr(&self, company: &str) -> Result<Option<String>>;
    async fn warehouse_exists(&self, name: &str) -> Result<bool>;

    async fn find_customer_by_email(&self, woocommerce_email: &str) -> Result<Option<Customer>>;
    async fn customer_exists(&self, name: &str) -> Result<bool>;
    async fn insert_customer(&self, customer: &Customer) -> Result<()>;
    async fn update_customer(&self, customer: &Customer) -> Result<()>;

    async fn insert_address(&self, address: &Address) -> Result<()>;
    /// First address of `address_type` for the WooCommerce email; `NotFound` when there is none.
    async fn get_address(&self, woocommerce_email: &str, address_type: AddressType) -> Result<Address>;
    /// Saves `address`, renaming the record from `old_name` when its name changed.
    async fn save_address(&self, old_name: &str, address: &Address) -> Result<()>;
    async fn insert_contact(&self, contact: &Contact) -> Result<()>;

    async fn find_item_by_link(&self, woocommerce_id: &str, site: &SiteDomain) -> Result<Option<Item>>;
    async fn item_code_exists(&self, item_code: &str) -> Result<bool>;
    async fn insert_item(&self, item: &Item) -> Result<()>;

    /// Inserts the order with its rows and returns the name drawn from its naming series.
    async fn insert_sales_order(&self, order: &SalesOrder) -> Result<String>;
    async fn set_docstatus(&self, name: &str, docstatus: DocStatus) -> Result<()>;

    async fn log_error(&self, title: &str, message: &str) -> Result<()>;
}

/// `<prefix><counter>` with the counter zero-padded to five digits.
pub(crate) fn series_name(prefix: &str, current: i64) -> String {
    format!("{}{:05}", prefix, current)
}
