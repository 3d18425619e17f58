//! In-process document store

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{series_name, DocumentStore, ErrorLog};
use crate::domain::aggregates::{
    AdditionalSettings, Address, AddressType, Contact, Customer, DocStatus, Item, SalesOrder, WooCommerceSettings,
};
use crate::domain::value_objects::SiteDomain;
use crate::{FusionError, Result};

#[derive(Default)]
struct Tables {
    woocommerce_settings: WooCommerceSettings,
    additional_settings: AdditionalSettings,
    language: Option<String>,
    translations: HashMap<String, HashMap<String, String>>,
    companies: HashMap<String, String>,
    warehouses: HashSet<String>,
    customers: BTreeMap<String, Customer>,
    addresses: BTreeMap<String, Address>,
    contacts: BTreeMap<String, Contact>,
    items: BTreeMap<String, Item>,
    sales_orders: BTreeMap<String, SalesOrder>,
    naming_series: HashMap<String, i64>,
    error_logs: Vec<ErrorLog>,
    rejected: HashSet<&'static str>,
}

impl Tables {
    fn check_writable(&self, doctype: &'static str) -> Result<()> {
        if self.rejected.contains(doctype) { return Err(FusionError::Validation(format!("{doctype} rejected by store"))); }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore { tables: Mutex<Tables> }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_settings(self, settings: WooCommerceSettings) -> Self { self.lock().woocommerce_settings = settings; self }
    pub fn with_additional_settings(self, settings: AdditionalSettings) -> Self { self.lock().additional_settings = settings; self }
    pub fn with_language(self, language: &str) -> Self { self.lock().language = Some(language.to_string()); self }
    pub fn with_company(self, name: &str, abbr: &str) -> Self { self.lock().companies.insert(name.to_string(), abbr.to_string()); self }
    pub fn with_warehouse(self, name: &str) -> Self { self.lock().warehouses.insert(name.to_string()); self }

    pub fn with_translation(self, language: &str, source: &str, translated: &str) -> Self {
        self.lock().translations.entry(language.to_string()).or_default().insert(source.to_string(), translated.to_string());
        self
    }

    /// Makes every write of `doctype` fail validation.
    pub fn reject_writes(&self, doctype: &'static str) { self.lock().rejected.insert(doctype); }

    pub fn customers(&self) -> Vec<Customer> { self.lock().customers.values().cloned().collect() }
    pub fn addresses(&self) -> Vec<Address> { self.lock().addresses.values().cloned().collect() }
    pub fn contacts(&self) -> Vec<Contact> { self.lock().contacts.values().cloned().collect() }
    pub fn items(&self) -> Vec<Item> { self.lock().items.values().cloned().collect() }
    pub fn sales_orders(&self) -> Vec<SalesOrder> { self.lock().sales_orders.values().cloned().collect() }
    pub fn error_logs(&self) -> Vec<ErrorLog> { self.lock().error_logs.clone() }

    /// True when nothing but settings and the error log has been written.
    pub fn has_no_documents(&self) -> bool {
        let t = self.lock();
        t.customers.is_empty() && t.addresses.is_empty() && t.contacts.is_empty() && t.items.is_empty() && t.sales_orders.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn woocommerce_settings(&self) -> Result<WooCommerceSettings> { Ok(self.lock().woocommerce_settings.clone()) }
    async fn additional_settings(&self) -> Result<AdditionalSettings> { Ok(self.lock().additional_settings.clone()) }
    async fn system_language(&self) -> Result<Option<String>> { Ok(self.lock().language.clone()) }

    async fn translations(&self, language: &str) -> Result<HashMap<String, String>> {
        Ok(self.lock().translations.get(language).cloned().unwrap_or_default())
    }

    async fn company_abbr(&self, company: &str) -> Result<Option<String>> { Ok(self.lock().companies.get(company).cloned()) }
    async fn warehouse_exists(&self, name: &str) -> Result<bool> { Ok(self.lock().warehouses.contains(name)) }

    async fn find_customer_by_email(&self, woocommerce_email: &str) -> Result<Option<Customer>> {
        Ok(self.lock().customers.values().find(|c| c.woocommerce_email.as_deref() == Some(woocommerce_email)).cloned())
    }

    async fn customer_exists(&self, name: &str) -> Result<bool> { Ok(self.lock().customers.contains_key(name)) }

    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        let mut t = self.lock();
        t.check_writable("Customer")?;
        if t.customers.contains_key(&customer.name) { return Err(FusionError::DuplicateEntry { doctype: "Customer", name: customer.name.clone() }); }
        t.customers.insert(customer.name.clone(), customer.clone());
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<()> {
        let mut t = self.lock();
        t.check_writable("Customer")?;
        let stored = t.customers.get_mut(&customer.name).ok_or_else(|| FusionError::NotFound { doctype: "Customer", name: customer.name.clone() })?;
        stored.customer_name = customer.customer_name.clone();
        stored.woocommerce_email = customer.woocommerce_email.clone();
        Ok(())
    }

    async fn insert_address(&self, address: &Address) -> Result<()> {
        let mut t = self.lock();
        t.check_writable("Address")?;
        if t.addresses.contains_key(&address.name) { return Err(FusionError::DuplicateEntry { doctype: "Address", name: address.name.clone() }); }
        t.addresses.insert(address.name.clone(), address.clone());
        Ok(())
    }

    async fn get_address(&self, woocommerce_email: &str, address_type: AddressType) -> Result<Address> {
        self.lock()
            .addresses
            .values()
            .find(|a| a.woocommerce_email.as_deref() == Some(woocommerce_email) && a.address_type == address_type)
            .cloned()
            .ok_or_else(|| FusionError::NotFound { doctype: "Address", name: format!("{woocommerce_email} ({address_type})") })
    }

    async fn save_address(&self, old_name: &str, address: &Address) -> Result<()> {
        let mut t = self.lock();
        t.check_writable("Address")?;
        if !t.addresses.contains_key(old_name) { return Err(FusionError::NotFound { doctype: "Address", name: old_name.to_string() }); }
        if address.name != old_name && t.addresses.contains_key(&address.name) {
            return Err(FusionError::DuplicateEntry { doctype: "Address", name: address.name.clone() });
        }
        t.addresses.remove(old_name);
        t.addresses.insert(address.name.clone(), address.clone());
        Ok(())
    }

    async fn insert_contact(&self, contact: &Contact) -> Result<()> {
        let mut t = self.lock();
        t.check_writable("Contact")?;
        if t.contacts.contains_key(&contact.name) { return Err(FusionError::DuplicateEntry { doctype: "Contact", name: contact.name.clone() }); }
        t.contacts.insert(contact.name.clone(), contact.clone());
        Ok(())
    }

    async fn find_item_by_link(&self, woocommerce_id: &str, site: &SiteDomain) -> Result<Option<Item>> {
        Ok(self.lock().items.values().find(|i| i.is_linked(woocommerce_id, site)).cloned())
    }

    async fn item_code_exists(&self, item_code: &str) -> Result<bool> { Ok(self.lock().items.contains_key(item_code)) }

    async fn insert_item(&self, item: &Item) -> Result<()> {
        let mut t = self.lock();
        t.check_writable("Item")?;
        if t.items.contains_key(&item.item_code) { return Err(FusionError::DuplicateEntry { doctype: "Item", name: item.item_code.clone() }); }
        t.items.insert(item.item_code.clone(), item.clone());
        Ok(())
    }

    async fn insert_sales_order(&self, order: &SalesOrder) -> Result<String> {
        let mut t = self.lock();
        t.check_writable("Sales Order")?;
        let counter = t.naming_series.entry(order.naming_series.clone()).or_insert(0);
        *counter += 1;
        let name = series_name(&order.naming_series, *counter);
        let mut stored = order.clone();
        stored.name = Some(name.clone());
        t.sales_orders.insert(name.clone(), stored);
        Ok(name)
    }

    async fn set_docstatus(&self, name: &str, docstatus: DocStatus) -> Result<()> {
        let mut t = self.lock();
        t.check_writable("Sales Order")?;
        let order = t.sales_orders.get_mut(name).ok_or_else(|| FusionError::NotFound { doctype: "Sales Order", name: name.to_string() })?;
        order.docstatus = docstatus;
        Ok(())
    }

    async fn log_error(&self, title: &str, message: &str) -> Result<()> {
        self.lock().error_logs.push(ErrorLog { id: Uuid::new_v4(), title: title.to_string(), message: message.to_string(), creation: Utc::now() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_naming_series_per_prefix() {
        let store = MemoryStore::new();
        let site = SiteDomain::parse("https://shop.example.com/").unwrap();
        let day = chrono::NaiveDate::from_ymd_opt(2023, 5, 20).unwrap();
        let a = store.insert_sales_order(&SalesOrder::new("C", 1, &site, "SO-WOO-", day, day)).await.unwrap();
        let b = store.insert_sales_order(&SalesOrder::new("C", 2, &site, "SO-WOO-", day, day)).await.unwrap();
        let c = store.insert_sales_order(&SalesOrder::new("C", 3, &site, "WEB-", day, day)).await.unwrap();
        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("SO-WOO-00001", "SO-WOO-00002", "WEB-00001"));
    }

    #[tokio::test]
    async fn test_address_rename_conflict() {
        let store = MemoryStore::new();
        let customer = Customer::create(crate::domain::value_objects::CustomerCode::generate("Jane", &mut rand::thread_rng()), "Jane Doe", Some("jane@example.com".into()));
        let billing = Address::from_woocommerce(&Default::default(), &customer, AddressType::Billing);
        let shipping = Address::from_woocommerce(&Default::default(), &customer, AddressType::Shipping);
        store.insert_address(&billing).await.unwrap();
        store.insert_address(&shipping).await.unwrap();
        let mut moved = billing.clone();
        moved.name = shipping.name.clone();
        assert!(matches!(store.save_address(&billing.name, &moved).await, Err(FusionError::DuplicateEntry { .. })));
        assert!(matches!(store.get_address("nobody@example.com", AddressType::Billing).await, Err(FusionError::NotFound { .. })));
    }
}
