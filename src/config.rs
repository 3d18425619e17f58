//! Process configuration from the environment (`.env` is loaded first by `main`).

use anyhow::{bail, Context, Result};

pub const DEFAULT_PORT: u16 = 8083;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    /// Everything in process; lost on restart.
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub store: StoreBackend,
    pub nats_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("PORT") {
            Some(port) => port.parse().with_context(|| format!("PORT={port:?} is not a port number"))?,
            None => DEFAULT_PORT,
        };
        let store = match lookup("WOOCOMMERCE_STORE").as_deref().unwrap_or("postgres") {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres { database_url: lookup("DATABASE_URL").context("DATABASE_URL must be set")? },
            other => bail!("WOOCOMMERCE_STORE={other:?}, expected postgres or memory"),
        };
        let nats_url = lookup("NATS_URL").filter(|u| !u.is_empty());
        Ok(Self { port, store, nats_url })
    }
}
