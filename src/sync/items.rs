//! Item resolution keyed by (WooCommerce product id, site).

use tracing::info;
use validator::Validate;

use super::{log_failure, SyncContext};
use crate::domain::aggregates::Item;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::SiteDomain;
use crate::{Result, WcLineItem};

/// Creates an Item for every line whose product has no Item linked on `site`. Returns the new item codes.
pub async fn link_items(ctx: &SyncContext<'_>, line_items: &[WcLineItem], site: &SiteDomain, events: &mut Vec<DomainEvent>) -> Result<Vec<String>> {
    let mut created = Vec::new();
    for line in line_items {
        let woocommerce_id = line.product_id.to_string();
        if ctx.store.find_item_by_link(&woocommerce_id, site).await?.is_some() { continue; }

        let item_code = free_item_code(ctx, &ctx.tr.format("woocommerce - {0}", &woocommerce_id)).await?;
        let mut item = Item::create_for_product(item_code, &line.name, ctx.uom(), ctx.tr.t("WooCommerce Products"), &woocommerce_id, site);
        let saved = match item.validate() {
            Ok(()) => ctx.store.insert_item(&item).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = saved {
            log_failure(ctx.store, &e, "Item Data", &item).await;
            return Err(e);
        }
        info!(item_code = %item.item_code, woocommerce_id = %woocommerce_id, site = %site, "item created");
        events.extend(item.take_events());
        created.push(item.item_code);
    }
    Ok(created)
}

/// `base`, or `base-<n>` with the first free `n` when another Item already holds the code.
async fn free_item_code(ctx: &SyncContext<'_>, base: &str) -> Result<String> {
    if !ctx.store.item_code_exists(base).await? { return Ok(base.to_string()); }
    let mut n = 1;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !ctx.store.item_code_exists(&candidate).await? { return Ok(candidate); }
        n += 1;
    }
}
