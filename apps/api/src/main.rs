mod analysis;
mod billing;
mod config;
mod entitlement;
mod errors;
mod extraction;
mod layout;
mod llm_client;
mod models;
mod render;
mod routes;
mod session;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::billing::paypal::PayPalClient;
use crate::billing::stripe::StripeClient;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::session::{InMemorySessionStore, RedisSessionStore, SessionStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed or half-configured env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Analyzer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize session store
    let sessions: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => {
            let store = RedisSessionStore::connect(url, config.session_ttl_secs).await?;
            info!("Redis session store initialized");
            Arc::new(store)
        }
        None => {
            warn!("REDIS_URL not set; sessions are kept in memory");
            Arc::new(InMemorySessionStore::new(Duration::from_secs(
                config.session_ttl_secs,
            )))
        }
    };

    // Initialize LLM client
    let llm = LlmClient::new(
        &config.llm_api_base,
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    if config.managed_llm_api_key.is_some() {
        info!("Managed LLM key available for paid sessions");
    }

    // Initialize payment providers
    let stripe = match &config.stripe {
        Some(stripe_config) => {
            info!("Stripe billing enabled");
            Some(Arc::new(StripeClient::new(
                stripe_config.clone(),
                &config.app_url,
            )?))
        }
        None => None,
    };
    let paypal = match &config.paypal {
        Some(paypal_config) => {
            info!("PayPal billing enabled ({})", paypal_config.base_url);
            Some(Arc::new(PayPalClient::new(
                paypal_config.clone(),
                &config.app_url,
            )?))
        }
        None => None,
    };

    // Build app state
    let state = AppState {
        llm,
        sessions,
        config: config.clone(),
        stripe,
        paypal,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to APP_URL once the frontend domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
