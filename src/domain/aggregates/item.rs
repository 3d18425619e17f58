//! Item Aggregate

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::events::DomainEvent;
use crate::domain::value_objects::SiteDomain;

/// One row of the Item's link table: a WooCommerce product on a given site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemWooCommerceServer { pub woocommerce_id: String, pub woocommerce_server: String }

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Item {
    #[validate(length(min = 1, max = 140))]
    pub item_code: String,
    pub item_name: String,
    #[validate(length(min = 1))]
    pub stock_uom: String,
    #[validate(length(min = 1))]
    pub item_group: String,
    pub woocommerce_servers: Vec<ItemWooCommerceServer>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Item {
    pub fn create(item_code: impl Into<String>, item_name: impl Into<String>, stock_uom: impl Into<String>, item_group: impl Into<String>) -> Self {
        Self {
            item_code: item_code.into(), item_name: item_name.into(), stock_uom: stock_uom.into(),
            item_group: item_group.into(), woocommerce_servers: vec![], events: vec![],
        }
    }

    /// New Item already linked to `woocommerce_id` on `site`.
    pub fn create_for_product(item_code: impl Into<String>, item_name: impl Into<String>, stock_uom: impl Into<String>, item_group: impl Into<String>, woocommerce_id: &str, site: &SiteDomain) -> Self {
        let mut item = Self::create(item_code, item_name, stock_uom, item_group);
        item.link(woocommerce_id, site);
        item.raise_event(DomainEvent::ItemCreated {
            item_code: item.item_code.clone(), woocommerce_id: woocommerce_id.to_string(), woocommerce_server: site.to_string(),
        });
        item
    }

    pub fn link(&mut self, woocommerce_id: &str, site: &SiteDomain) {
        if self.is_linked(woocommerce_id, site) { return; }
        self.woocommerce_servers.push(ItemWooCommerceServer { woocommerce_id: woocommerce_id.to_string(), woocommerce_server: site.to_string() });
    }

    pub fn is_linked(&self, woocommerce_id: &str, site: &SiteDomain) -> bool {
        self.woocommerce_servers.iter().any(|l| l.woocommerce_id == woocommerce_id && l.woocommerce_server == site.as_str())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_are_per_site() {
        let a = SiteDomain::parse("https://a.example.com/").unwrap();
        let b = SiteDomain::parse("https://b.example.com/").unwrap();
        let mut item = Item::create_for_product("woocommerce - 93", "Beanie", "Nos", "WooCommerce Products", "93", &a);
        assert!(item.is_linked("93", &a));
        assert!(!item.is_linked("93", &b));
        item.link("93", &b);
        item.link("93", &b);
        assert_eq!(item.woocommerce_servers.len(), 2);
        assert_eq!(item.take_events().len(), 1);
        assert!(item.take_events().is_empty());
    }
}
