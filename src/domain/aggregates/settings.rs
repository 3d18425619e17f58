//! Settings singletons read by the sync

use serde::{Deserialize, Serialize};

use crate::{FusionError, Result};

pub const DEFAULT_SALES_ORDER_SERIES: &str = "SO-WOO-";
pub const DEFAULT_DELIVERY_AFTER_DAYS: u32 = 7;

/// "Woocommerce Settings" singleton.
#[derive(Clone, Debug, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct WooCommerceSettings {
    pub company: Option<String>,
    pub sales_order_series: Option<String>,
    pub delivery_after_days: Option<i32>,
    pub uom: Option<String>,
    pub warehouse: Option<String>,
    pub tax_account: Option<String>,
    /// Freight and forwarding account used for shipping lines.
    pub f_n_f_account: Option<String>,
}

impl WooCommerceSettings {
    pub fn sales_order_series(&self) -> &str {
        non_empty(&self.sales_order_series).unwrap_or(DEFAULT_SALES_ORDER_SERIES)
    }

    /// Lead time between order and delivery date; unset or zero means the default week.
    pub fn delivery_after_days(&self) -> Result<u32> {
        match self.delivery_after_days {
            None | Some(0) => Ok(DEFAULT_DELIVERY_AFTER_DAYS),
            Some(days) => u32::try_from(days)
                .map_err(|_| FusionError::Validation(format!("Delivery After (Days) must not be negative, got {days}"))),
        }
    }

    pub fn uom(&self) -> Option<&str> { non_empty(&self.uom) }
    pub fn warehouse(&self) -> Option<&str> { non_empty(&self.warehouse) }
    pub fn company(&self) -> Option<&str> { non_empty(&self.company) }
}

/// "WooCommerce Additional Settings" singleton.
#[derive(Clone, Debug, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdditionalSettings {
    pub submit_sales_orders: Option<bool>,
}

impl AdditionalSettings {
    /// Orders are submitted unless the setting is explicitly off.
    pub fn submit_sales_orders(&self) -> bool { self.submit_sales_orders.unwrap_or(true) }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = WooCommerceSettings { sales_order_series: Some(String::new()), delivery_after_days: Some(0), ..Default::default() };
        assert_eq!(s.sales_order_series(), "SO-WOO-");
        assert_eq!(s.delivery_after_days().unwrap(), 7);
        assert_eq!(WooCommerceSettings::default().delivery_after_days().unwrap(), 7);
        assert!(s.warehouse().is_none());
        assert!(AdditionalSettings::default().submit_sales_orders());
        assert!(!AdditionalSettings { submit_sales_orders: Some(false) }.submit_sales_orders());
    }

    #[test]
    fn test_negative_lead_time_is_rejected() {
        let s = WooCommerceSettings { delivery_after_days: Some(-2), ..Default::default() };
        assert!(matches!(s.delivery_after_days(), Err(FusionError::Validation(_))));
        let s = WooCommerceSettings { delivery_after_days: Some(10), ..Default::default() };
        assert_eq!(s.delivery_after_days().unwrap(), 10);
    }
}
