//! WooCommerce Fusion - order webhooks into ERP sales orders

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use woocommerce_fusion::config::{Config, StoreBackend};
use woocommerce_fusion::store::{DocumentStore, MemoryStore, PgStore};
use woocommerce_fusion::webhook::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let store: Arc<dyn DocumentStore> = match &config.store {
        StoreBackend::Postgres { database_url } => Arc::new(PgStore::connect(database_url).await?),
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, documents are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, events will not be published"); None }
        },
        None => None,
    };

    let app = webhook::router(AppState { store, nats });
    tracing::info!("🚀 WooCommerce Fusion listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
