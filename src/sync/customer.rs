//! Customer resolution: match by WooCommerce email, create or refresh.

use tracing::{debug, info};
use validator::Validate;

use super::{log_failure, SyncContext};
use crate::domain::aggregates::{Address, AddressType, Contact, Customer};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::CustomerCode;
use crate::{FusionError, Result, WcAddress};

/// Random codes tried before falling back to a numbered suffix.
const CODE_ATTEMPTS: usize = 5;

/// Creates or refreshes the customer behind an order and returns its record name.
pub async fn link_customer_and_address(ctx: &SyncContext<'_>, billing: &WcAddress, shipping: &WcAddress, customer_name: &str, events: &mut Vec<DomainEvent>) -> Result<String> {
    let email = WcAddress::field(&billing.email).map(str::to_string);
    let existing = match &email {
        Some(email) => ctx.store.find_customer_by_email(email).await?,
        None => None,
    };
    match existing {
        Some(customer) => update_customer(ctx, customer, customer_name, email, events).await,
        None => create_customer(ctx, billing, shipping, customer_name, email, events).await,
    }
}

async fn create_customer(ctx: &SyncContext<'_>, billing: &WcAddress, shipping: &WcAddress, customer_name: &str, email: Option<String>, events: &mut Vec<DomainEvent>) -> Result<String> {
    let code = free_customer_code(ctx, customer_name).await?;
    let mut customer = Customer::create(code, customer_name, email);
    let saved = match customer.validate() {
        Ok(()) => ctx.store.insert_customer(&customer).await,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = saved {
        log_failure(ctx.store, &e, "Customer Data", &customer).await;
        return Err(e);
    }
    info!(customer = %customer.name, "customer created");
    events.extend(customer.take_events());

    for address_type in AddressType::ALL {
        let raw = match address_type { AddressType::Billing => billing, AddressType::Shipping => shipping };
        let address = Address::from_woocommerce(raw, &customer, address_type);
        let saved = match address.validate() {
            Ok(()) => ctx.store.insert_address(&address).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = saved {
            log_failure(ctx.store, &e, "Address Data", &address).await;
            return Err(e);
        }
    }
    if let Some(contact) = Contact::from_woocommerce(billing, &customer) {
        let saved = match contact.validate() {
            Ok(()) => ctx.store.insert_contact(&contact).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = saved {
            log_failure(ctx.store, &e, "Contact Data", &contact).await;
            return Err(e);
        }
    }
    Ok(customer.name)
}

async fn update_customer(ctx: &SyncContext<'_>, mut customer: Customer, customer_name: &str, email: Option<String>, events: &mut Vec<DomainEvent>) -> Result<String> {
    customer.update_details(customer_name, email.clone());
    let saved = match customer.validate() {
        Ok(()) => ctx.store.update_customer(&customer).await,
        Err(e) => Err(e.into()),
    };
    match saved {
        Ok(()) => events.extend(customer.take_events()),
        // Update failures leave the stale record in place; the order still goes through.
        Err(e) => log_failure(ctx.store, &e, "Customer Data", &customer).await,
    }

    if let Some(email) = &email {
        for address_type in AddressType::ALL {
            match refresh_address(ctx, email, address_type, &customer).await {
                Ok(()) => {}
                Err(e @ (FusionError::NotFound { .. } | FusionError::DuplicateEntry { .. } | FusionError::Validation(_))) => {
                    debug!(customer = %customer.name, %address_type, error = %e, "address left as is");
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(customer.name)
}

async fn refresh_address(ctx: &SyncContext<'_>, email: &str, address_type: AddressType, customer: &Customer) -> Result<()> {
    let mut address = ctx.store.get_address(email, address_type).await?;
    let old_name = address.name.clone();
    address.name = address.retitle(customer);
    address.validate()?;
    ctx.store.save_address(&old_name, &address).await
}

async fn free_customer_code(ctx: &SyncContext<'_>, customer_name: &str) -> Result<CustomerCode> {
    let mut code = CustomerCode::generate(customer_name, &mut rand::thread_rng());
    for _ in 1..CODE_ATTEMPTS {
        if !ctx.store.customer_exists(code.as_str()).await? { return Ok(code); }
        code = CustomerCode::generate(customer_name, &mut rand::thread_rng());
    }
    let mut n = 1;
    while ctx.store.customer_exists(code.with_suffix(n).as_str()).await? { n += 1; }
    Ok(code.with_suffix(n))
}
