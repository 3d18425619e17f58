//! PostgreSQL document store

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use uuid::Uuid;

use super::{series_name, DocumentStore};
use crate::domain::aggregates::{
    AdditionalSettings, Address, AddressType, Contact, Customer, DocStatus, Item, ItemWooCommerceServer, SalesOrder, WooCommerceSettings,
};
use crate::domain::value_objects::SiteDomain;
use crate::{FusionError, Result};

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

#[derive(sqlx::FromRow)]
struct AddressRow {
    name: String, address_title: String, address_type: String, address_line1: String, address_line2: String, city: String,
    state: Option<String>, pincode: Option<String>, country: Option<String>, phone: Option<String>, email_id: Option<String>,
    woocommerce_email: Option<String>, customer: String,
}

impl TryFrom<AddressRow> for Address {
    type Error = FusionError;
    fn try_from(r: AddressRow) -> Result<Self> {
        Ok(Address {
            name: r.name, address_title: r.address_title, address_type: r.address_type.parse()?, address_line1: r.address_line1,
            address_line2: r.address_line2, city: r.city, state: r.state, pincode: r.pincode, country: r.country, phone: r.phone,
            email_id: r.email_id, woocommerce_email: r.woocommerce_email, customer: r.customer,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow { item_code: String, item_name: String, stock_uom: String, item_group: String }

/// Maps unique-key violations on insert to `DuplicateEntry`.
fn insert_error<'a>(doctype: &'static str, name: &'a str) -> impl FnOnce(sqlx::Error) -> FusionError + 'a {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() { return FusionError::DuplicateEntry { doctype, name: name.to_string() }; }
        }
        FusionError::from(e)
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| FusionError::StorageError(e.to_string()))?;
        Ok(Self::new(pool))
    }

    async fn item_links(&self, item_code: &str) -> Result<Vec<ItemWooCommerceServer>> {
        Ok(sqlx::query_as::<_, ItemWooCommerceServer>("SELECT woocommerce_id, woocommerce_server FROM item_woocommerce_servers WHERE parent = $1 ORDER BY idx")
            .bind(item_code).fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn woocommerce_settings(&self) -> Result<WooCommerceSettings> {
        Ok(sqlx::query_as::<_, WooCommerceSettings>("SELECT company, sales_order_series, delivery_after_days, uom, warehouse, tax_account, f_n_f_account FROM woocommerce_settings LIMIT 1")
            .fetch_optional(&self.pool).await?.unwrap_or_default())
    }

    async fn additional_settings(&self) -> Result<AdditionalSettings> {
        Ok(sqlx::query_as::<_, AdditionalSettings>("SELECT submit_sales_orders FROM woocommerce_additional_settings LIMIT 1")
            .fetch_optional(&self.pool).await?.unwrap_or_default())
    }

    async fn system_language(&self) -> Result<Option<String>> {
        Ok(sqlx::query_scalar::<_, Option<String>>("SELECT language FROM system_settings LIMIT 1").fetch_optional(&self.pool).await?.flatten())
    }

    async fn translations(&self, language: &str) -> Result<HashMap<String, String>> {
        let rows = sqlx::query_as::<_, (String, String)>("SELECT source_text, translated_text FROM translations WHERE language = $1")
            .bind(language).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().collect())
    }

    async fn company_abbr(&self, company: &str) -> Result<Option<String>> {
        Ok(sqlx::query_scalar::<_, String>("SELECT abbr FROM companies WHERE name = $1").bind(company).fetch_optional(&self.pool).await?)
    }

    async fn warehouse_exists(&self, name: &str) -> Result<bool> {
        Ok(sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM warehouses WHERE name = $1)").bind(name).fetch_one(&self.pool).await?)
    }

    async fn find_customer_by_email(&self, woocommerce_email: &str) -> Result<Option<Customer>> {
        Ok(sqlx::query_as::<_, Customer>("SELECT name, customer_name, woocommerce_email FROM customers WHERE woocommerce_email = $1 ORDER BY created_at LIMIT 1")
            .bind(woocommerce_email).fetch_optional(&self.pool).await?)
    }

    async fn customer_exists(&self, name: &str) -> Result<bool> {
        Ok(sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE name = $1)").bind(name).fetch_one(&self.pool).await?)
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query("INSERT INTO customers (name, customer_name, woocommerce_email, created_at, updated_at) VALUES ($1, $2, $3, NOW(), NOW())")
            .bind(&customer.name).bind(&customer.customer_name).bind(&customer.woocommerce_email)
            .execute(&self.pool).await.map_err(insert_error("Customer", &customer.name))?;
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<()> {
        let done = sqlx::query("UPDATE customers SET customer_name = $2, woocommerce_email = $3, updated_at = NOW() WHERE name = $1")
            .bind(&customer.name).bind(&customer.customer_name).bind(&customer.woocommerce_email)
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(FusionError::NotFound { doctype: "Customer", name: customer.name.clone() }); }
        Ok(())
    }

    async fn insert_address(&self, a: &Address) -> Result<()> {
        sqlx::query("INSERT INTO addresses (name, address_title, address_type, address_line1, address_line2, city, state, pincode, country, phone, email_id, woocommerce_email, customer, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())")
            .bind(&a.name).bind(&a.address_title).bind(a.address_type.as_str()).bind(&a.address_line1).bind(&a.address_line2).bind(&a.city)
            .bind(&a.state).bind(&a.pincode).bind(&a.country).bind(&a.phone).bind(&a.email_id).bind(&a.woocommerce_email).bind(&a.customer)
            .execute(&self.pool).await.map_err(insert_error("Address", &a.name))?;
        Ok(())
    }

    async fn get_address(&self, woocommerce_email: &str, address_type: AddressType) -> Result<Address> {
        sqlx::query_as::<_, AddressRow>("SELECT name, address_title, address_type, address_line1, address_line2, city, state, pincode, country, phone, email_id, woocommerce_email, customer FROM addresses WHERE woocommerce_email = $1 AND address_type = $2 ORDER BY created_at LIMIT 1")
            .bind(woocommerce_email).bind(address_type.as_str()).fetch_optional(&self.pool).await?
            .ok_or_else(|| FusionError::NotFound { doctype: "Address", name: format!("{woocommerce_email} ({address_type})") })?
            .try_into()
    }

    async fn save_address(&self, old_name: &str, a: &Address) -> Result<()> {
        let done = sqlx::query("UPDATE addresses SET name = $1, address_title = $2, address_line1 = $3, address_line2 = $4, city = $5, state = $6, pincode = $7, country = $8, phone = $9, email_id = $10, woocommerce_email = $11, customer = $12 WHERE name = $13")
            .bind(&a.name).bind(&a.address_title).bind(&a.address_line1).bind(&a.address_line2).bind(&a.city).bind(&a.state)
            .bind(&a.pincode).bind(&a.country).bind(&a.phone).bind(&a.email_id).bind(&a.woocommerce_email).bind(&a.customer).bind(old_name)
            .execute(&self.pool).await.map_err(insert_error("Address", &a.name))?;
        if done.rows_affected() == 0 { return Err(FusionError::NotFound { doctype: "Address", name: old_name.to_string() }); }
        Ok(())
    }

    async fn insert_contact(&self, c: &Contact) -> Result<()> {
        sqlx::query("INSERT INTO contacts (name, first_name, last_name, email_id, phone, is_primary_contact, is_billing_contact, customer, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())")
            .bind(&c.name).bind(&c.first_name).bind(&c.last_name).bind(&c.email_id).bind(&c.phone)
            .bind(c.is_primary_contact).bind(c.is_billing_contact).bind(&c.customer)
            .execute(&self.pool).await.map_err(insert_error("Contact", &c.name))?;
        Ok(())
    }

    async fn find_item_by_link(&self, woocommerce_id: &str, site: &SiteDomain) -> Result<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>("SELECT i.item_code, i.item_name, i.stock_uom, i.item_group FROM items i JOIN item_woocommerce_servers s ON s.parent = i.item_code WHERE s.woocommerce_id = $1 AND s.woocommerce_server = $2 ORDER BY i.created_at LIMIT 1")
            .bind(woocommerce_id).bind(site.as_str()).fetch_optional(&self.pool).await?;
        let Some(row) = row else { return Ok(None) };
        let mut item = Item::create(row.item_code, row.item_name, row.stock_uom, row.item_group);
        item.woocommerce_servers = self.item_links(&item.item_code).await?;
        Ok(Some(item))
    }

    async fn item_code_exists(&self, item_code: &str) -> Result<bool> {
        Ok(sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM items WHERE item_code = $1)").bind(item_code).fetch_one(&self.pool).await?)
    }

    async fn insert_item(&self, item: &Item) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO items (item_code, item_name, stock_uom, item_group, created_at) VALUES ($1, $2, $3, $4, NOW())")
            .bind(&item.item_code).bind(&item.item_name).bind(&item.stock_uom).bind(&item.item_group)
            .execute(&mut *tx).await.map_err(insert_error("Item", &item.item_code))?;
        for (idx, link) in item.woocommerce_servers.iter().enumerate() {
            sqlx::query("INSERT INTO item_woocommerce_servers (parent, idx, woocommerce_id, woocommerce_server) VALUES ($1, $2, $3, $4)")
                .bind(&item.item_code).bind(idx as i32 + 1).bind(&link.woocommerce_id).bind(&link.woocommerce_server)
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_sales_order(&self, so: &SalesOrder) -> Result<String> {
        let mut tx = self.pool.begin().await?;
        let current: i64 = sqlx::query_scalar("INSERT INTO naming_series (prefix, current) VALUES ($1, 1) ON CONFLICT (prefix) DO UPDATE SET current = naming_series.current + 1 RETURNING current")
            .bind(&so.naming_series).fetch_one(&mut *tx).await?;
        let name = series_name(&so.naming_series, current);
        sqlx::query("INSERT INTO sales_orders (name, customer, po_no, woocommerce_id, woocommerce_server, woocommerce_status, woocommerce_payment_method, naming_series, transaction_date, delivery_date, company, docstatus, grand_total, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())")
            .bind(&name).bind(&so.customer).bind(&so.po_no).bind(so.woocommerce_id).bind(&so.woocommerce_server).bind(&so.woocommerce_status)
            .bind(&so.woocommerce_payment_method).bind(&so.naming_series).bind(so.transaction_date).bind(so.delivery_date).bind(&so.company)
            .bind(so.docstatus.as_i16()).bind(so.grand_total())
            .execute(&mut *tx).await.map_err(insert_error("Sales Order", &name))?;
        for (idx, item) in so.items.iter().enumerate() {
            sqlx::query("INSERT INTO sales_order_items (parent, idx, item_code, item_name, description, delivery_date, uom, qty, rate, amount, warehouse) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)")
                .bind(&name).bind(idx as i32 + 1).bind(&item.item_code).bind(&item.item_name).bind(&item.description)
                .bind(item.delivery_date).bind(&item.uom).bind(item.qty).bind(item.rate).bind(item.amount()).bind(&item.warehouse)
                .execute(&mut *tx).await?;
        }
        for (idx, tax) in so.taxes.iter().enumerate() {
            sqlx::query("INSERT INTO sales_order_taxes (parent, idx, charge_type, account_head, tax_amount, description) VALUES ($1, $2, $3, $4, $5, $6)")
                .bind(&name).bind(idx as i32 + 1).bind(&tax.charge_type).bind(&tax.account_head).bind(tax.tax_amount).bind(&tax.description)
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(name)
    }

    async fn set_docstatus(&self, name: &str, docstatus: DocStatus) -> Result<()> {
        let done = sqlx::query("UPDATE sales_orders SET docstatus = $2 WHERE name = $1").bind(name).bind(docstatus.as_i16()).execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(FusionError::NotFound { doctype: "Sales Order", name: name.to_string() }); }
        Ok(())
    }

    async fn log_error(&self, title: &str, message: &str) -> Result<()> {
        sqlx::query("INSERT INTO error_logs (id, title, message, creation) VALUES ($1, $2, $3, NOW())")
            .bind(Uuid::now_v7()).bind(title).bind(message).execute(&self.pool).await?;
        Ok(())
    }
}
