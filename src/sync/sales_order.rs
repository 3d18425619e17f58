//! Sales order construction from a WooCommerce order.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use super::{log_failure, SyncContext};
use crate::domain::aggregates::{DocStatus, SalesOrder, SalesOrderItem};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{SiteDomain, WcOrderStatus};
use crate::{FusionError, Result, WcOrder};

/// Sales order as it ended up in the store. `name` is `None` when the insert was rejected.
#[derive(Clone, Debug, Serialize)]
pub struct SalesOrderOutcome { pub name: Option<String>, pub docstatus: DocStatus }

/// Configured warehouse, else `Stores - <company abbr>` when that warehouse exists.
pub async fn resolve_warehouse(ctx: &SyncContext<'_>) -> Result<String> {
    if let Some(warehouse) = ctx.settings.warehouse() { return Ok(warehouse.to_string()); }
    let abbr = match ctx.settings.company() {
        Some(company) => ctx.store.company_abbr(company).await?,
        None => None,
    };
    let default = ctx.tr.format("Stores - {0}", abbr.unwrap_or_default());
    if ctx.store.warehouse_exists(&default).await? { return Ok(default); }
    Err(FusionError::MissingWarehouse(ctx.tr.t("Please set Warehouse in Woocommerce Settings")))
}

pub async fn create_sales_order(ctx: &SyncContext<'_>, order: &WcOrder, customer: &str, site: &SiteDomain, warehouse: &str, events: &mut Vec<DomainEvent>) -> Result<SalesOrderOutcome> {
    let transaction_date = match order.created_date() {
        Ok(date) => date,
        Err(e) => {
            log_failure(ctx.store, &e, "Order Data", order).await;
            return Err(e);
        }
    };
    let mut so = SalesOrder::new(customer, order.id, site, ctx.settings.sales_order_series(), transaction_date, transaction_date);
    match delivery_date(ctx, transaction_date) {
        Ok(date) => so.delivery_date = date,
        Err(e) => {
            log_failure(ctx.store, &e, "Sales Order Data", &so).await;
            return Err(e);
        }
    }

    match WcOrderStatus::from_code(&order.status) {
        Ok(status) => so.set_status(status),
        Err(e) => {
            log_failure(ctx.store, &e, "Sales Order Data", &so).await;
            return Err(e);
        }
    }
    so.woocommerce_payment_method = order.payment_method_title.clone();
    so.company = ctx.settings.company().map(str::to_string);

    if let Err(e) = set_items_in_sales_order(ctx, &mut so, order, site, warehouse).await {
        log_failure(ctx.store, &e, "Sales Order Data", &so).await;
        return Err(e);
    }

    // Insert and submit failures are logged only; the webhook still succeeds.
    if let Err(e) = insert_and_submit(ctx, &mut so).await {
        warn!(woocommerce_id = order.id, error = %e, "sales order not saved");
        log_failure(ctx.store, &e, "Sales Order Data", &so).await;
    }
    events.extend(so.take_events());
    Ok(SalesOrderOutcome { name: so.name.clone(), docstatus: so.docstatus })
}

fn delivery_date(ctx: &SyncContext<'_>, transaction_date: NaiveDate) -> Result<NaiveDate> {
    let days = ctx.settings.delivery_after_days()?;
    transaction_date.checked_add_days(Days::new(days.into()))
        .ok_or_else(|| FusionError::Validation(format!("Delivery After (Days) of {days} runs past the last supported date")))
}

async fn set_items_in_sales_order(ctx: &SyncContext<'_>, so: &mut SalesOrder, order: &WcOrder, site: &SiteDomain, warehouse: &str) -> Result<()> {
    for line in &order.line_items {
        let woocommerce_id = line.product_id.to_string();
        let item = ctx.store.find_item_by_link(&woocommerce_id, site).await?
            .ok_or_else(|| FusionError::ItemNotLinked { product_id: woocommerce_id.clone(), site: site.to_string() })?;
        so.add_item(SalesOrderItem {
            item_code: item.item_code, description: item.item_name.clone(), item_name: item.item_name,
            delivery_date: so.delivery_date, uom: ctx.uom(), qty: line.quantity, rate: line.price, warehouse: warehouse.to_string(),
        });
        so.add_tax(line.total_tax, "Ordered Item tax", ctx.settings.tax_account.as_deref());
    }
    so.add_tax(order.shipping_tax, "Shipping Tax", ctx.settings.f_n_f_account.as_deref());
    so.add_tax(order.shipping_total, "Shipping Total", ctx.settings.f_n_f_account.as_deref());
    Ok(())
}

async fn insert_and_submit(ctx: &SyncContext<'_>, so: &mut SalesOrder) -> Result<()> {
    so.check()?;
    let name = ctx.store.insert_sales_order(so).await?;
    so.mark_inserted(name.clone());
    info!(sales_order = %name, customer = %so.customer, woocommerce_id = so.woocommerce_id, "sales order created");
    if ctx.additional.submit_sales_orders() {
        let mut submitted = so.clone();
        submitted.submit()?;
        ctx.store.set_docstatus(&name, DocStatus::Submitted).await?;
        *so = submitted;
        info!(sales_order = %name, "sales order submitted");
    }
    Ok(())
}
