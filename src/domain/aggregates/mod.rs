//! Aggregates module
pub mod customer;
pub mod item;
pub mod sales_order;
pub mod settings;

pub use customer::{Address, AddressType, Contact, Customer};
pub use item::{Item, ItemWooCommerceServer};
pub use sales_order::{DocStatus, SalesOrder, SalesOrderItem, SalesTaxesAndCharges};
pub use settings::{AdditionalSettings, WooCommerceSettings};
