//! Sales Order Aggregate

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{SiteDomain, WcOrderStatus};
use crate::{FusionError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocStatus { #[default] Draft, Submitted }

impl DocStatus {
    pub fn as_i16(&self) -> i16 { match self { Self::Draft => 0, Self::Submitted => 1 } }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct SalesOrderItem {
    #[validate(length(min = 1))]
    pub item_code: String,
    pub item_name: String,
    pub description: String,
    pub delivery_date: NaiveDate,
    pub uom: String,
    #[validate(custom = "positive")]
    pub qty: Decimal,
    pub rate: Decimal,
    pub warehouse: String,
}

impl SalesOrderItem {
    pub fn amount(&self) -> Decimal { self.qty * self.rate }
}

fn positive(qty: &Decimal) -> std::result::Result<(), ValidationError> {
    if qty.is_sign_positive() && !qty.is_zero() { Ok(()) } else { Err(ValidationError::new("qty_not_positive")) }
}

/// Row of the order's "Sales Taxes and Charges" table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesTaxesAndCharges { pub charge_type: String, pub account_head: Option<String>, pub tax_amount: Decimal, pub description: String }

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct SalesOrder {
    /// Assigned from the naming series on insert.
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub customer: String,
    pub po_no: String,
    pub woocommerce_id: i64,
    pub woocommerce_server: String,
    pub woocommerce_status: Option<String>,
    pub woocommerce_payment_method: Option<String>,
    #[validate(length(min = 1))]
    pub naming_series: String,
    pub transaction_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub company: Option<String>,
    pub docstatus: DocStatus,
    pub items: Vec<SalesOrderItem>,
    pub taxes: Vec<SalesTaxesAndCharges>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl SalesOrder {
    pub fn new(customer: impl Into<String>, woocommerce_id: i64, site: &SiteDomain, naming_series: impl Into<String>, transaction_date: NaiveDate, delivery_date: NaiveDate) -> Self {
        Self {
            name: None, customer: customer.into(), po_no: woocommerce_id.to_string(), woocommerce_id,
            woocommerce_server: site.to_string(), woocommerce_status: None, woocommerce_payment_method: None,
            naming_series: naming_series.into(), transaction_date, delivery_date, company: None,
            docstatus: DocStatus::Draft, items: vec![], taxes: vec![], events: vec![],
        }
    }

    pub fn set_status(&mut self, status: WcOrderStatus) { self.woocommerce_status = Some(status.label().to_string()); }

    pub fn add_item(&mut self, item: SalesOrderItem) { self.items.push(item); }

    /// Appends an `Actual` charge. Tax amounts are taken as sent, never recomputed.
    pub fn add_tax(&mut self, tax_amount: Decimal, description: impl Into<String>, account_head: Option<&str>) {
        self.taxes.push(SalesTaxesAndCharges {
            charge_type: "Actual".to_string(), account_head: account_head.map(str::to_string), tax_amount, description: description.into(),
        });
    }

    pub fn net_total(&self) -> Decimal { self.items.iter().map(SalesOrderItem::amount).sum() }
    pub fn grand_total(&self) -> Decimal { self.net_total() + self.taxes.iter().map(|t| t.tax_amount).sum::<Decimal>() }

    /// Document and row level validation before insert.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        for item in &self.items { item.validate()?; }
        Ok(())
    }

    pub fn mark_inserted(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.name = Some(name.clone());
        self.raise_event(DomainEvent::SalesOrderCreated { sales_order: name, woocommerce_id: self.woocommerce_id, grand_total: self.grand_total() });
    }

    pub fn submit(&mut self) -> Result<()> {
        let name = self.name.clone().ok_or_else(|| FusionError::InvalidState("Sales Order must be saved before submit".into()))?;
        if self.docstatus != DocStatus::Draft { return Err(FusionError::InvalidState(format!("Sales Order {name} is already submitted"))); }
        if self.items.is_empty() { return Err(FusionError::Validation(format!("Sales Order {name} has no items"))); }
        self.docstatus = DocStatus::Submitted;
        self.raise_event(DomainEvent::SalesOrderSubmitted { sales_order: name });
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}
