use std::sync::Arc;

use crate::billing::paypal::PayPalClient;
use crate::billing::stripe::StripeClient;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    /// Redis-backed when `REDIS_URL` is set, in-memory otherwise.
    pub sessions: Arc<dyn SessionStore>,
    pub config: Config,
    /// Present only when every Stripe key is configured.
    pub stripe: Option<Arc<StripeClient>>,
    pub paypal: Option<Arc<PayPalClient>>,
}

#[cfg(test)]
impl AppState {
    /// In-memory sessions, single-attempt LLM calls against `llm_api_base`, no payment providers.
    pub fn for_tests(llm_api_base: &str) -> Self {
        use std::time::Duration;

        use crate::llm_client::RetryPolicy;
        use crate::session::InMemorySessionStore;

        let config = Config::for_tests(llm_api_base);
        let llm = LlmClient::new(&config.llm_api_base, Duration::from_secs(config.llm_timeout_secs))
            .expect("test LLM client")
            .with_retry_policy(RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
            });

        AppState {
            llm,
            sessions: Arc::new(InMemorySessionStore::new(Duration::from_secs(
                config.session_ttl_secs,
            ))),
            config,
            stripe: None,
            paypal: None,
        }
    }
}
