//! Value Objects for WooCommerce sync

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::{FusionError, Result, WcOrder};

/// Network location of the WooCommerce site an order came from, e.g. `shop.example.com:8443`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteDomain(String);

impl SiteDomain {
    pub fn parse(href: &str) -> Result<Self> {
        let url = Url::parse(href).map_err(|_| FusionError::InvalidSiteUrl(href.to_string()))?;
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(|| FusionError::InvalidSiteUrl(href.to_string()))?;
        Ok(match url.port() {
            Some(port) => Self(format!("{}:{}", host, port)),
            None => Self(host.to_string()),
        })
    }

    /// Site of the order's own REST link (`_links.self[0].href`).
    pub fn from_order(order: &WcOrder) -> Result<Self> {
        let href = order.links.self_links.first().map(|l| l.href.as_str()).ok_or_else(|| FusionError::InvalidSiteUrl(String::new()))?;
        Self::parse(href)
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SiteDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// WooCommerce status code to the label stored on the Sales Order.
const WC_ORDER_STATUS_MAPPING: &[(&str, &str)] = &[
    ("pending", "Pending Payment"),
    ("on-hold", "On hold"),
    ("failed", "Failed"),
    ("cancelled", "Cancelled"),
    ("processing", "Processing"),
    ("refunded", "Refunded"),
    ("completed", "Shipped"),
    ("ready-pickup", "Ready for Pickup"),
    ("pickup", "Picked up"),
    ("delivered", "Delivered"),
    ("processing-lp", "Processing LP"),
    ("checkout-draft", "Draft"),
    ("gplsquote-req", "Quote Sent"),
    ("trash", "Trash"),
    ("partial-shipped", "Partially Shipped"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WcOrderStatus { code: &'static str, label: &'static str }

impl WcOrderStatus {
    pub fn from_code(code: &str) -> Result<Self> {
        WC_ORDER_STATUS_MAPPING
            .iter()
            .find(|(c, _)| *c == code)
            .map(|&(code, label)| Self { code, label })
            .ok_or_else(|| FusionError::UnknownOrderStatus(code.to_string()))
    }

    pub fn code(&self) -> &'static str { self.code }
    pub fn label(&self) -> &'static str { self.label }
}

/// Short customer identifier: three letters of the name plus a three digit suffix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerCode(String);

impl CustomerCode {
    pub fn generate(customer_name: &str, rng: &mut impl Rng) -> Self {
        let prefix: String = customer_name.chars().take(3).collect::<String>().to_uppercase();
        Self(format!("{}{:03}", prefix, rng.gen_range(1..1000)))
    }

    /// `<code>-<n>`, for when random codes keep colliding.
    pub fn with_suffix(&self, n: u32) -> Self { Self(format!("{}-{}", self.0, n)) }

    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for CustomerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
