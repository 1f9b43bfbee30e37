use std::sync::Arc;

use santa_agent::{
    catalog::{CatalogError, RapidApiCatalog},
    runtime::AgentRuntime,
};
use santa_core::config::{AppConfig, ConfigError, LoadOptions};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::BasicCredentials;
use crate::fabric::{register_handler, FabricClient, FabricError, HandlerRegistry};
use crate::routes::AppState;

pub struct Application {
    pub config: Arc<AppConfig>,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("gift catalog client could not be built: {0}")]
    Catalog(#[from] CatalogError),
    #[error("SignalWire client could not be built: {0}")]
    Fabric(#[from] FabricError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let credentials = Arc::new(BasicCredentials::from_config_or_generate(&config.auth));

    let catalog = RapidApiCatalog::from_config(&config.gifts)?;
    if !config.gifts.has_api_key() {
        warn!(
            event_name = "system.bootstrap.catalog_fallback",
            correlation_id = "bootstrap",
            "RAPIDAPI_KEY not set, gift searches use built-in suggestions"
        );
    }
    let runtime = Arc::new(AgentRuntime::new(
        Arc::new(catalog),
        config.gifts.christmas_year.clone(),
        config.media.clone(),
    ));

    let fabric = FabricClient::from_config(&config.signalwire)?.map(Arc::new);
    let handler = Arc::new(HandlerRegistry::default());
    match &fabric {
        Some(client) => register_on_startup(&config, client, &credentials, &handler).await,
        None => warn!(
            event_name = "system.bootstrap.signalwire_skipped",
            correlation_id = "bootstrap",
            "SignalWire credentials not configured, skipping SWML handler setup"
        ),
    }

    let config = Arc::new(config);
    let state = AppState { config: config.clone(), runtime, credentials, fabric, handler };
    Ok(Application { config, state })
}

/// The URL the platform fetches SWML from, credentials embedded.
pub fn handler_url(public_url: &str, credentials: &BasicCredentials) -> String {
    credentials.embed_in(&format!("{}/santa", public_url.trim_end_matches('/')))
}

async fn register_on_startup(
    config: &AppConfig,
    client: &FabricClient,
    credentials: &BasicCredentials,
    registry: &HandlerRegistry,
) {
    let Some(public_url) = config.server.public_url.as_deref() else {
        warn!(
            event_name = "system.bootstrap.signalwire_skipped",
            correlation_id = "bootstrap",
            "SWML_PROXY_URL_BASE/APP_URL not set, skipping SWML handler setup"
        );
        return;
    };

    let url = handler_url(public_url, credentials);
    match register_handler(client, &config.signalwire.agent_name, &url).await {
        Ok(handler) => {
            info!(
                event_name = "system.bootstrap.handler_ready",
                correlation_id = "bootstrap",
                handler_id = %handler.handler_id,
                address = handler.address.as_deref().unwrap_or("unknown"),
                "SWML handler ready"
            );
            registry.set(handler).await;
        }
        Err(error) => error!(
            event_name = "system.bootstrap.handler_failed",
            correlation_id = "bootstrap",
            error = %error,
            "SWML handler registration failed"
        ),
    }
}
