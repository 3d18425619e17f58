//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    CustomerCreated { customer: String, woocommerce_email: Option<String> },
    CustomerUpdated { customer: String },
    ItemCreated { item_code: String, woocommerce_id: String, woocommerce_server: String },
    SalesOrderCreated { sales_order: String, woocommerce_id: i64, grand_total: Decimal },
    SalesOrderSubmitted { sales_order: String },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::CustomerCreated { .. } => "woocommerce.customer.created",
            Self::CustomerUpdated { .. } => "woocommerce.customer.updated",
            Self::ItemCreated { .. } => "woocommerce.item.created",
            Self::SalesOrderCreated { .. } => "woocommerce.sales_order.created",
            Self::SalesOrderSubmitted { .. } => "woocommerce.sales_order.submitted",
        }
    }
}
