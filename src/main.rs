use anyhow::{Context, Result};
use axum::{Router, extract::FromRef};
use cached::TimedCache;
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::services::ServeDir;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::catalog::{Catalog, HttpCatalog, LoadedLookups};
use crate::config::Settings;
use crate::preferences::PreferenceStore;

// Declare modules
mod catalog;
mod config;
mod error;
mod filters;
mod preferences;
mod routes;

pub type LookupCache = TimedCache<&'static str, LoadedLookups>;

// Shared application state
#[derive(Clone, FromRef)]
pub struct AppState {
    settings: Arc<Settings>,
    catalog: Arc<dyn Catalog>,
    lookup_cache: Arc<Mutex<LookupCache>>,
    preferences: Arc<PreferenceStore>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, catalog: Arc<dyn Catalog>) -> Self {
        let lookup_cache = TimedCache::with_lifespan(settings.lookup_cache_secs);
        Self {
            settings,
            catalog,
            lookup_cache: Arc::new(Mutex::new(lookup_cache)),
            preferences: Arc::new(PreferenceStore::new()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_filters=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing storefront filter server...");

    // Load configuration (.env, config.toml, APP__* variables)
    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    let shared_settings = Arc::new(settings);

    let http_client = Arc::new(
        Client::builder()
            .timeout(Duration::from_secs(shared_settings.request_timeout_secs))
            .build()
            .context("Failed to build shared reqwest client")?,
    );
    tracing::info!("Catalog backend: {}", shared_settings.api_base_url);

    let catalog: Arc<dyn Catalog> = Arc::new(HttpCatalog::new(http_client, &shared_settings.api_base_url));
    let app_state = AppState::new(shared_settings.clone(), catalog);

    let router: Router = routes::create_router(app_state);
    let app = router.nest_service("/static", ServeDir::new(&shared_settings.static_dir));

    let addr: SocketAddr = shared_settings
        .server_address
        .parse()
        .with_context(|| format!("Invalid server address format: {}", shared_settings.server_address))?;

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            tracing::info!("Server listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
