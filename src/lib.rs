//! WooCommerce Fusion
//!
//! Turns WooCommerce order webhooks into ERP documents.
//!
//! ## Features
//! - Customer matching by WooCommerce email, with billing/shipping addresses and contact
//! - Items linked per (product id, site) so several shops can share one ERP
//! - Sales orders with status mapping, delivery lead time and tax lines
//! - Error log entries carrying the offending payload or document

pub mod config;
pub mod domain;
pub mod i18n;
pub mod store;
pub mod sync;
pub mod webhook;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Webhook Payload
// =============================================================================

/// Order body as posted by the WooCommerce webhook.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WcOrder {
    pub id: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub payment_method_title: Option<String>,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub shipping_tax: Decimal,
    #[serde(default)]
    pub shipping_total: Decimal,
    #[serde(default)]
    pub billing: WcAddress,
    #[serde(default)]
    pub shipping: WcAddress,
    #[serde(default)]
    pub line_items: Vec<WcLineItem>,
    #[serde(rename = "_links", default)]
    pub links: WcLinks,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WcAddress {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub company: Option<String>,
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WcLineItem {
    pub product_id: i64,
    #[serde(default)]
    pub name: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub total_tax: Decimal,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WcLinks {
    #[serde(rename = "self", default)]
    pub self_links: Vec<WcLink>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WcLink {
    pub href: String,
}

impl WcOrder {
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.billing.first_name, self.billing.last_name)
    }

    /// Calendar date of `date_created`, which WooCommerce sends as `YYYY-MM-DDTHH:MM:SS`.
    pub fn created_date(&self) -> Result<NaiveDate> {
        let date = self.date_created.split('T').next().unwrap_or_default();
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| FusionError::InvalidPayload(format!("date_created {:?}: {}", self.date_created, e)))
    }
}

impl WcAddress {
    /// Empty strings count as absent, the way WooCommerce leaves unused fields.
    pub fn field(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Unknown WooCommerce order status: {0}")]
    UnknownOrderStatus(String),

    #[error("Cannot determine WooCommerce site from {0:?}")]
    InvalidSiteUrl(String),

    #[error("Invalid order payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    MissingWarehouse(String),

    #[error("No Item linked to WooCommerce product {product_id} on {site}")]
    ItemNotLinked { product_id: String, site: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{doctype} {name} not found")]
    NotFound { doctype: &'static str, name: String },

    #[error("{doctype} {name} already exists")]
    DuplicateEntry { doctype: &'static str, name: String },

    #[error("Invalid document state: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl FusionError {
    /// Errors worded for the shop administrator rather than for a developer.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::MissingWarehouse(_) | Self::Validation(_))
    }
}

impl From<validator::ValidationErrors> for FusionError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<sqlx::Error> for FusionError {
    fn from(e: sqlx::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FusionError>;
