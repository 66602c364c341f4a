//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for billing runs, unit schedules and ledger summaries
//! - Internal API key middleware
//! - Error responses mapped from domain errors
//!
//! Handlers reach persistence only through the `residia_core::store` traits,
//! so the router runs unchanged over PostgreSQL or an in-memory store.

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use residia_core::billing::{BillingGenerator, GeneratorOptions};
use residia_core::ledger::{LedgerCache, LedgerService};
use residia_core::store::{BillingStore, LedgerStore};
use residia_shared::{ApiConfig, BillingConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Store used by billing runs and schedule previews.
    pub billing_store: Arc<dyn BillingStore>,
    /// Store used by ledger queries.
    pub ledger_store: Arc<dyn LedgerStore>,
    /// Generator tuning.
    pub generator_options: GeneratorOptions,
    /// Key required on internal routes; `None` disables them.
    pub internal_api_key: Option<Arc<str>>,
    /// Cache shared by ledger summary requests.
    pub ledger_cache: LedgerCache,
}

impl AppState {
    /// Builds state from stores and configuration.
    #[must_use]
    pub fn new(
        billing_store: Arc<dyn BillingStore>,
        ledger_store: Arc<dyn LedgerStore>,
        billing: &BillingConfig,
        api: &ApiConfig,
    ) -> Self {
        Self {
            billing_store,
            ledger_store,
            generator_options: GeneratorOptions::from(billing),
            internal_api_key: api
                .internal_api_key
                .as_deref()
                .filter(|key| !key.is_empty())
                .map(Arc::from),
            ledger_cache: LedgerCache::with_config(
                api.ledger_cache_capacity,
                api.ledger_cache_ttl_secs,
            ),
        }
    }

    /// Generator over the billing store.
    #[must_use]
    pub fn generator(&self, dry_run: bool) -> BillingGenerator<dyn BillingStore> {
        BillingGenerator::new(
            Arc::clone(&self.billing_store),
            GeneratorOptions {
                dry_run,
                ..self.generator_options
            },
        )
    }

    /// Ledger service over the ledger store, sharing the summary cache.
    #[must_use]
    pub fn ledger(&self) -> LedgerService<dyn LedgerStore> {
        LedgerService::new(Arc::clone(&self.ledger_store)).with_cache(self.ledger_cache.clone())
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
