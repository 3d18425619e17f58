//! Customer Aggregate

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::domain::events::DomainEvent;
use crate::domain::value_objects::CustomerCode;
use crate::{FusionError, WcAddress};

const NOT_PROVIDED: &str = "Not Provided";

#[derive(Clone, Debug, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct Customer {
    #[validate(length(min = 1, max = 140))]
    pub name: String,
    #[validate(length(min = 1))]
    pub customer_name: String,
    pub woocommerce_email: Option<String>,
    #[sqlx(skip)]
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Customer {
    pub fn create(code: CustomerCode, customer_name: impl Into<String>, woocommerce_email: Option<String>) -> Self {
        let mut customer = Self { name: code.into_inner(), customer_name: customer_name.into(), woocommerce_email, events: vec![] };
        customer.raise_event(DomainEvent::CustomerCreated { customer: customer.name.clone(), woocommerce_email: customer.woocommerce_email.clone() });
        customer
    }

    /// Refreshes the display name and email. The record name stays as it was first created.
    pub fn update_details(&mut self, customer_name: impl Into<String>, woocommerce_email: Option<String>) {
        self.customer_name = customer_name.into();
        self.woocommerce_email = woocommerce_email;
        self.raise_event(DomainEvent::CustomerUpdated { customer: self.name.clone() });
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType { Billing, Shipping }

impl AddressType {
    pub const ALL: [AddressType; 2] = [AddressType::Billing, AddressType::Shipping];

    pub fn as_str(&self) -> &'static str {
        match self { Self::Billing => "Billing", Self::Shipping => "Shipping" }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for AddressType {
    type Err = FusionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Billing" => Ok(Self::Billing),
            "Shipping" => Ok(Self::Shipping),
            other => Err(FusionError::Validation(format!("unknown address type {other:?}"))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1))]
    pub name: String,
    pub address_title: String,
    pub address_type: AddressType,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email_id: Option<String>,
    pub woocommerce_email: Option<String>,
    pub customer: String,
}

impl Address {
    pub fn from_woocommerce(raw: &WcAddress, customer: &Customer, address_type: AddressType) -> Self {
        let or_not_provided = |v: &Option<String>| WcAddress::field(v).unwrap_or(NOT_PROVIDED).to_string();
        let owned = |v: &Option<String>| WcAddress::field(v).map(str::to_string);
        Self {
            name: Self::name_for(customer, address_type),
            address_title: customer.name.clone(),
            address_type,
            address_line1: or_not_provided(&raw.address_1),
            address_line2: or_not_provided(&raw.address_2),
            city: or_not_provided(&raw.city),
            state: owned(&raw.state),
            pincode: owned(&raw.postcode),
            country: WcAddress::field(&raw.country).map(str::to_uppercase),
            phone: owned(&raw.phone),
            email_id: customer.woocommerce_email.clone(),
            woocommerce_email: customer.woocommerce_email.clone(),
            customer: customer.name.clone(),
        }
    }

    pub fn name_for(customer: &Customer, address_type: AddressType) -> String {
        format!("{}-{}", customer.name, address_type)
    }

    /// Retitles the address after its customer and returns the name it should carry.
    pub fn retitle(&mut self, customer: &Customer) -> String {
        self.address_title = customer.customer_name.clone();
        self.customer = customer.name.clone();
        Self::name_for(customer, self.address_type)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Contact {
    #[validate(length(min = 1))]
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    #[validate(email)]
    pub email_id: Option<String>,
    pub phone: Option<String>,
    pub is_primary_contact: bool,
    pub is_billing_contact: bool,
    pub customer: String,
}

impl Contact {
    /// Primary billing contact, or `None` when the billing data has neither email nor phone.
    pub fn from_woocommerce(raw: &WcAddress, customer: &Customer) -> Option<Self> {
        let email_id = WcAddress::field(&raw.email).map(str::to_string);
        let phone = WcAddress::field(&raw.phone).map(str::to_string);
        if email_id.is_none() && phone.is_none() { return None; }
        let full_name = [raw.first_name.trim(), raw.last_name.trim()].iter().filter(|p| !p.is_empty()).copied().collect::<Vec<_>>().join(" ");
        let name = if full_name.is_empty() { customer.name.clone() } else { format!("{}-{}", full_name, customer.name) };
        Some(Self {
            name, first_name: raw.first_name.clone(), last_name: raw.last_name.clone(), email_id, phone,
            is_primary_contact: true, is_billing_contact: true, customer: customer.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer { name: "JAN042".into(), customer_name: "Jane Doe".into(), woocommerce_email: Some("jane@example.com".into()), events: vec![] }
    }

    #[test]
    fn test_update_keeps_record_name() {
        let mut c = customer();
        c.update_details("Janet Doe", Some("janet@example.com".into()));
        assert_eq!(c.name, "JAN042");
        assert_eq!(c.customer_name, "Janet Doe");
        assert_eq!(c.take_events(), vec![DomainEvent::CustomerUpdated { customer: "JAN042".into() }]);
    }

    #[test]
    fn test_address_defaults() {
        let raw = WcAddress { address_1: Some("1 Long St".into()), country: Some("za".into()), ..Default::default() };
        let a = Address::from_woocommerce(&raw, &customer(), AddressType::Shipping);
        assert_eq!(a.name, "JAN042-Shipping");
        assert_eq!(a.address_line2, NOT_PROVIDED);
        assert_eq!(a.city, NOT_PROVIDED);
        assert_eq!(a.country.as_deref(), Some("ZA"));
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_contact_requires_email_or_phone() {
        let raw = WcAddress { first_name: "Jane".into(), last_name: "Doe".into(), ..Default::default() };
        assert!(Contact::from_woocommerce(&raw, &customer()).is_none());
        let raw = WcAddress { phone: Some("021 555 0100".into()), ..raw };
        let contact = Contact::from_woocommerce(&raw, &customer()).unwrap();
        assert_eq!(contact.name, "Jane Doe-JAN042");
        assert!(contact.is_primary_contact && contact.is_billing_contact);
    }
}
