use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use typeahead::{server, MemoryStore, Registry, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "typeahead=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "typeahead.json".to_string());

    tracing::info!("📄 Loading configuration from {}", config_path);
    let config = ServerConfig::load(&config_path)?;

    tracing::info!("📚 Loading dataset from {}", config.dataset.display());
    let mut store = MemoryStore::load(&config.dataset)?;
    tracing::info!("✅ Loaded {} collections", store.len());

    for (collection, scopes) in config.scopes {
        for (name, fields) in scopes {
            store.register_eq_scope(&collection, name, fields)?;
        }
    }

    // A bad endpoint declaration aborts startup here, before serving.
    let registry = Registry::from_decls(config.endpoints)?;
    tracing::info!("✅ Registered {} autocomplete endpoints", registry.len());

    let addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind))?;

    server::serve(addr, Arc::new(store), &registry).await?;

    Ok(())
}
