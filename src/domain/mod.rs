//! ERP documents touched by the WooCommerce sync
pub mod aggregates;
pub mod events;
pub mod value_objects;
