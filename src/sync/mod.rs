//! WooCommerce order to ERP document translation.
//!
//! A `created` order event runs, in order: warehouse resolution, site
//! detection, customer resolution, item resolution and sales order
//! construction. Failures are written to the error log together with the
//! payload or document that caused them.

pub mod customer;
pub mod items;
pub mod sales_order;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::aggregates::{AdditionalSettings, WooCommerceSettings};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::SiteDomain;
use crate::i18n::{Translator, DEFAULT_LANGUAGE};
use crate::store::DocumentStore;
use crate::{FusionError, Result, WcOrder};

pub use customer::link_customer_and_address;
pub use items::link_items;
pub use sales_order::{create_sales_order, resolve_warehouse, SalesOrderOutcome};

pub const ERROR_TITLE: &str = "WooCommerce Error";
pub const ORDER_CREATED: &str = "created";

/// Settings and translations loaded once per webhook delivery.
pub struct SyncContext<'a> {
    pub store: &'a dyn DocumentStore,
    pub settings: WooCommerceSettings,
    pub additional: AdditionalSettings,
    pub tr: Translator,
}

impl<'a> SyncContext<'a> {
    pub async fn load(store: &'a dyn DocumentStore) -> Result<Self> {
        let settings = store.woocommerce_settings().await?;
        let additional = store.additional_settings().await?;
        let language = store.system_language().await?.filter(|l| !l.is_empty()).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let catalog = store.translations(&language).await?;
        Ok(Self { store, settings, additional, tr: Translator::new(language, catalog) })
    }

    /// Unit of measure for new items and order rows.
    pub fn uom(&self) -> String {
        self.settings.uom().map(str::to_string).unwrap_or_else(|| self.tr.t("Nos"))
    }
}

/// What one order event produced.
#[derive(Clone, Debug, Serialize)]
pub struct SyncReport {
    pub customer: String,
    pub site: SiteDomain,
    pub items_created: Vec<String>,
    pub sales_order: SalesOrderOutcome,
    pub events: Vec<DomainEvent>,
}

/// Runs the sync for one webhook delivery. Events other than `created` are acknowledged without changes.
pub async fn handle_order_event(store: &dyn DocumentStore, event: &str, order: &WcOrder) -> Result<Option<SyncReport>> {
    if event != ORDER_CREATED {
        info!(event, woocommerce_id = order.id, "order event ignored");
        return Ok(None);
    }
    let ctx = SyncContext::load(store).await?;
    let warehouse = resolve_warehouse(&ctx).await?;
    let site = match SiteDomain::from_order(order) {
        Ok(site) => site,
        Err(e) => {
            log_failure(store, &e, "Order Data", order).await;
            return Err(e);
        }
    };

    let mut events = Vec::new();
    let customer = link_customer_and_address(&ctx, &order.billing, &order.shipping, &order.customer_name(), &mut events).await?;
    let items_created = link_items(&ctx, &order.line_items, &site, &mut events).await?;
    let sales_order = create_sales_order(&ctx, order, &customer, &site, &warehouse, &mut events).await?;
    info!(woocommerce_id = order.id, %site, %customer, sales_order = ?sales_order.name, "order synced");
    Ok(Some(SyncReport { customer, site, items_created, sales_order, events }))
}

/// Writes `error` and a JSON snapshot of the offending record to the error log.
pub async fn log_failure(store: &dyn DocumentStore, error: &FusionError, label: &str, snapshot: &impl Serialize) {
    let snapshot = serde_json::to_string_pretty(snapshot).unwrap_or_else(|e| format!("<unserializable: {e}>"));
    error!(error = %error, "{label} rejected");
    let message = format!("{error}\n\n{label}: \n{snapshot}");
    if let Err(e) = store.log_error(ERROR_TITLE, &message).await {
        warn!(error = %e, "error log entry not written");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Address, AddressType, Customer, DocStatus};
    use crate::domain::value_objects::CustomerCode;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_settings(WooCommerceSettings {
                company: Some("Woo Co".into()),
                tax_account: Some("VAT - WC".into()),
                f_n_f_account: Some("Freight - WC".into()),
                ..Default::default()
            })
            .with_company("Woo Co", "WC")
            .with_warehouse("Stores - WC")
    }

    fn order(site: &str, status: &str, first_name: &str) -> WcOrder {
        serde_json::from_value(json!({
            "id": 727,
            "status": status,
            "payment_method_title": "Credit Card",
            "date_created": "2023-05-20T10:15:00",
            "shipping_tax": "1.50",
            "shipping_total": "10.00",
            "billing": {
                "first_name": first_name, "last_name": "Doe", "address_1": "1 Long St", "city": "Cape Town",
                "postcode": "8001", "country": "ZA", "email": "jane@example.com", "phone": "021 555 0100"
            },
            "shipping": {"first_name": first_name, "last_name": "Doe", "address_1": "2 Short St", "city": "Cape Town", "country": "ZA"},
            "line_items": [{"product_id": 93, "name": "Beanie", "quantity": 2, "price": 18.5, "total_tax": "2.78"}],
            "_links": {"self": [{"href": format!("https://{site}/wp-json/wc/v3/orders/727")}]}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_created_order_builds_all_documents() {
        let store = store();
        let report = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap().unwrap();

        let customers = store.customers();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].name, report.customer);
        assert!(report.customer.starts_with("JAN"));
        assert_eq!(customers[0].customer_name, "Jane Doe");
        assert_eq!(store.addresses().len(), 2);
        assert_eq!(store.contacts().len(), 1);
        assert_eq!(report.items_created, vec!["woocommerce - 93".to_string()]);

        let so = &store.sales_orders()[0];
        assert_eq!(report.sales_order.name.as_deref(), Some("SO-WOO-00001"));
        assert_eq!(so.docstatus, DocStatus::Submitted);
        assert_eq!(so.po_no, "727");
        assert_eq!(so.woocommerce_server, "shop.example.com");
        assert_eq!(so.woocommerce_status.as_deref(), Some("Processing"));
        assert_eq!(so.woocommerce_payment_method.as_deref(), Some("Credit Card"));
        assert_eq!(so.transaction_date, NaiveDate::from_ymd_opt(2023, 5, 20).unwrap());
        assert_eq!(so.delivery_date, NaiveDate::from_ymd_opt(2023, 5, 27).unwrap());
        assert_eq!(so.company.as_deref(), Some("Woo Co"));
        assert_eq!(so.items.len(), 1);
        assert_eq!(so.items[0].warehouse, "Stores - WC");
        assert_eq!(so.items[0].uom, "Nos");
        assert_eq!(so.items[0].qty, Decimal::from(2));
        let taxes: Vec<_> = so.taxes.iter().map(|t| (t.description.as_str(), t.account_head.as_deref(), t.tax_amount)).collect();
        assert_eq!(taxes, vec![
            ("Ordered Item tax", Some("VAT - WC"), Decimal::new(278, 2)),
            ("Shipping Tax", Some("Freight - WC"), Decimal::new(150, 2)),
            ("Shipping Total", Some("Freight - WC"), Decimal::new(1000, 2)),
        ]);
        assert!(report.events.contains(&DomainEvent::SalesOrderSubmitted { sales_order: "SO-WOO-00001".into() }));
        assert!(store.error_logs().is_empty());
    }

    #[tokio::test]
    async fn test_other_events_are_ignored() {
        let store = store();
        assert!(handle_order_event(&store, "updated", &order("shop.example.com", "processing", "Jane")).await.unwrap().is_none());
        assert!(store.has_no_documents());
    }

    #[tokio::test]
    async fn test_existing_customer_is_not_renamed() {
        let store = store();
        let first = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap().unwrap();
        let second = handle_order_event(&store, "created", &order("shop.example.com", "completed", "Janet")).await.unwrap().unwrap();

        assert_eq!(first.customer, second.customer);
        let customers = store.customers();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].name, first.customer);
        assert_eq!(customers[0].customer_name, "Janet Doe");
        assert_eq!(store.addresses().len(), 2);
        assert!(store.addresses().iter().all(|a| a.address_title == "Janet Doe"));
        assert_eq!(store.contacts().len(), 1);
        assert!(second.items_created.is_empty());
        assert_eq!(store.sales_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_same_product_on_two_sites_gives_two_items() {
        let store = store();
        let a = handle_order_event(&store, "created", &order("a.example.com", "processing", "Jane")).await.unwrap().unwrap();
        let b = handle_order_event(&store, "created", &order("b.example.com", "processing", "Jane")).await.unwrap().unwrap();

        assert_eq!(a.items_created, vec!["woocommerce - 93".to_string()]);
        assert_eq!(b.items_created, vec!["woocommerce - 93-1".to_string()]);
        assert_eq!(store.items().len(), 2);
        let orders = store.sales_orders();
        assert_eq!(orders[0].items[0].item_code, "woocommerce - 93");
        assert_eq!(orders[1].items[0].item_code, "woocommerce - 93-1");
        assert_eq!(orders[1].woocommerce_server, "b.example.com");
    }

    #[tokio::test]
    async fn test_unknown_status_aborts_with_logged_error() {
        let store = store();
        let err = handle_order_event(&store, "created", &order("shop.example.com", "teleported", "Jane")).await.unwrap_err();
        assert!(matches!(err, FusionError::UnknownOrderStatus(ref s) if s == "teleported"));
        assert!(store.sales_orders().is_empty());
        let logs = store.error_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].title, ERROR_TITLE);
        assert!(logs[0].message.contains("Sales Order Data"));
        assert!(logs[0].message.contains("\"woocommerce_id\": 727"));
    }

    #[tokio::test]
    async fn test_submit_setting_off_keeps_draft() {
        let store = store().with_additional_settings(AdditionalSettings { submit_sales_orders: Some(false) });
        let report = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap().unwrap();
        assert_eq!(report.sales_order.docstatus, DocStatus::Draft);
        assert_eq!(store.sales_orders()[0].docstatus, DocStatus::Draft);
    }

    #[tokio::test]
    async fn test_missing_warehouse_fails_before_any_document() {
        let store = MemoryStore::new()
            .with_settings(WooCommerceSettings { company: Some("Woo Co".into()), ..Default::default() })
            .with_company("Woo Co", "WC");
        let err = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap_err();
        assert!(matches!(err, FusionError::MissingWarehouse(_)));
        assert!(err.is_user_facing());
        assert_eq!(err.to_string(), "Please set Warehouse in Woocommerce Settings");
        assert!(store.has_no_documents());
    }

    #[tokio::test]
    async fn test_configured_warehouse_and_lead_time() {
        let store = MemoryStore::new().with_settings(WooCommerceSettings {
            warehouse: Some("Finished Goods - WC".into()),
            delivery_after_days: Some(3),
            sales_order_series: Some("WEB-".into()),
            uom: Some("Unit".into()),
            ..Default::default()
        });
        let report = handle_order_event(&store, "created", &order("shop.example.com", "on-hold", "Jane")).await.unwrap().unwrap();
        let so = &store.sales_orders()[0];
        assert_eq!(report.sales_order.name.as_deref(), Some("WEB-00001"));
        assert_eq!(so.items[0].warehouse, "Finished Goods - WC");
        assert_eq!(so.items[0].uom, "Unit");
        assert_eq!(store.items()[0].stock_uom, "Unit");
        assert_eq!(so.delivery_date, NaiveDate::from_ymd_opt(2023, 5, 23).unwrap());
        assert_eq!(so.woocommerce_status.as_deref(), Some("On hold"));
    }

    #[tokio::test]
    async fn test_translated_defaults() {
        let store = MemoryStore::new()
            .with_settings(WooCommerceSettings { company: Some("Woo Co".into()), ..Default::default() })
            .with_company("Woo Co", "WC")
            .with_warehouse("Lager - WC")
            .with_language("de")
            .with_translation("de", "Stores - {0}", "Lager - {0}")
            .with_translation("de", "Nos", "Stk")
            .with_translation("de", "WooCommerce Products", "WooCommerce-Produkte");
        handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap();
        let item = &store.items()[0];
        assert_eq!(item.stock_uom, "Stk");
        assert_eq!(item.item_group, "WooCommerce-Produkte");
        assert_eq!(store.sales_orders()[0].items[0].warehouse, "Lager - WC");
    }

    #[tokio::test]
    async fn test_rejected_sales_order_is_logged_not_raised() {
        let store = store();
        store.reject_writes("Sales Order");
        let report = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap().unwrap();
        assert!(report.sales_order.name.is_none());
        assert!(store.sales_orders().is_empty());
        assert_eq!(store.customers().len(), 1);
        assert!(store.error_logs()[0].message.contains("Sales Order Data"));
    }

    #[tokio::test]
    async fn test_customer_update_failure_is_swallowed() {
        let store = store();
        handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap();
        store.reject_writes("Customer");
        let report = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Janet")).await.unwrap().unwrap();
        assert_eq!(store.customers()[0].customer_name, "Jane Doe");
        assert!(report.sales_order.name.is_some());
        assert!(store.error_logs()[0].message.contains("Customer Data"));
    }

    #[tokio::test]
    async fn test_customer_creation_failure_aborts() {
        let store = store();
        store.reject_writes("Customer");
        let err = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap_err();
        assert!(matches!(err, FusionError::Validation(_)));
        assert!(store.sales_orders().is_empty());
        assert_eq!(store.error_logs().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_site_link_is_logged() {
        let store = store();
        let mut o = order("shop.example.com", "processing", "Jane");
        o.links.self_links.clear();
        let err = handle_order_event(&store, "created", &o).await.unwrap_err();
        assert!(matches!(err, FusionError::InvalidSiteUrl(_)));
        assert!(store.has_no_documents());
        assert!(store.error_logs()[0].message.contains("Order Data"));
    }

    #[tokio::test]
    async fn test_rejected_item_aborts_before_sales_order() {
        let store = store();
        store.reject_writes("Item");
        let err = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap_err();
        assert!(matches!(err, FusionError::Validation(_)));
        assert!(store.items().is_empty());
        assert!(store.sales_orders().is_empty());
        assert_eq!(store.customers().len(), 1);
        let logs = store.error_logs();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].message.contains("Item Data"));
        assert!(logs[0].message.contains("woocommerce - 93"));
    }

    #[tokio::test]
    async fn test_unlinked_line_item_aborts_sales_order() {
        let store = store();
        let ctx = SyncContext::load(&store).await.unwrap();
        let o = order("shop.example.com", "processing", "Jane");
        let site = SiteDomain::from_order(&o).unwrap();
        let mut events = Vec::new();
        let err = create_sales_order(&ctx, &o, "JAN001", &site, "Stores - WC", &mut events).await.unwrap_err();
        assert!(matches!(err, FusionError::ItemNotLinked { ref product_id, ref site } if product_id == "93" && site == "shop.example.com"));
        assert!(store.sales_orders().is_empty());
        assert!(events.is_empty());
        assert!(store.error_logs()[0].message.contains("Sales Order Data"));
    }

    #[tokio::test]
    async fn test_existing_customer_without_addresses() {
        let store = store();
        let customer = Customer::create(CustomerCode::generate("Jane", &mut rand::thread_rng()), "Jane Doe", Some("jane@example.com".into()));
        store.insert_customer(&customer).await.unwrap();
        let ctx = SyncContext::load(&store).await.unwrap();
        let o = order("shop.example.com", "processing", "Janet");
        let mut events = Vec::new();
        let name = link_customer_and_address(&ctx, &o.billing, &o.shipping, &o.customer_name(), &mut events).await.unwrap();
        assert_eq!(name, customer.name);
        assert!(store.addresses().is_empty());
        assert_eq!(store.customers()[0].customer_name, "Janet Doe");
    }

    #[tokio::test]
    async fn test_address_rename_conflict_is_left_alone() {
        let store = store();
        let customer = Customer::create(CustomerCode::generate("Jane", &mut rand::thread_rng()), "Jane Doe", Some("jane@example.com".into()));
        store.insert_customer(&customer).await.unwrap();
        let o = order("shop.example.com", "processing", "Jane");
        // Billing address still filed under a previous customer, and its new name already taken.
        let previous = Customer::create(CustomerCode::generate("Old", &mut rand::thread_rng()), "Old Name", Some("jane@example.com".into()));
        let stale = Address::from_woocommerce(&o.billing, &previous, AddressType::Billing);
        let mut blocker = Address::from_woocommerce(&o.billing, &customer, AddressType::Billing);
        blocker.woocommerce_email = None;
        store.insert_address(&stale).await.unwrap();
        store.insert_address(&blocker).await.unwrap();

        let ctx = SyncContext::load(&store).await.unwrap();
        let mut events = Vec::new();
        let name = link_customer_and_address(&ctx, &o.billing, &o.shipping, &o.customer_name(), &mut events).await.unwrap();
        assert_eq!(name, customer.name);
        let mut names: Vec<_> = store.addresses().into_iter().map(|a| a.name).collect();
        names.sort();
        let mut expected = vec![stale.name.clone(), blocker.name.clone()];
        expected.sort();
        assert_eq!(names, expected);
        assert!(store.error_logs().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_address_is_logged_with_its_data() {
        let store = store();
        store.reject_writes("Address");
        let err = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap_err();
        assert!(matches!(err, FusionError::Validation(_)));
        assert!(store.sales_orders().is_empty());
        let logs = store.error_logs();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].message.contains("Address Data"));
        assert!(logs[0].message.contains("1 Long St"));
    }

    #[tokio::test]
    async fn test_rejected_contact_is_logged_with_its_data() {
        let store = store();
        store.reject_writes("Contact");
        let err = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap_err();
        assert!(matches!(err, FusionError::Validation(_)));
        assert_eq!(store.addresses().len(), 2);
        let logs = store.error_logs();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].message.contains("Contact Data"));
        assert!(logs[0].message.contains("021 555 0100"));
    }

    #[tokio::test]
    async fn test_out_of_range_lead_time_is_logged_not_panicking() {
        let store = MemoryStore::new().with_settings(WooCommerceSettings {
            warehouse: Some("Stores - WC".into()),
            delivery_after_days: Some(i32::MAX),
            ..Default::default()
        });
        let err = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap_err();
        assert!(matches!(err, FusionError::Validation(_)));
        assert!(store.sales_orders().is_empty());
        let logs = store.error_logs();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].message.contains("Sales Order Data"));
    }

    #[tokio::test]
    async fn test_negative_lead_time_is_rejected() {
        let store = MemoryStore::new().with_settings(WooCommerceSettings {
            warehouse: Some("Stores - WC".into()),
            delivery_after_days: Some(-3),
            ..Default::default()
        });
        let err = handle_order_event(&store, "created", &order("shop.example.com", "processing", "Jane")).await.unwrap_err();
        assert!(matches!(err, FusionError::Validation(_)));
        assert!(store.sales_orders().is_empty());
        assert!(store.error_logs()[0].message.contains("Sales Order Data"));
    }
}
