//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::require_internal_key};

pub mod billing;
pub mod health;
pub mod ledger;

/// Creates the API router; everything but health requires the internal key.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let internal_routes = Router::new()
        .merge(billing::routes())
        .merge(ledger::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_internal_key,
        ));

    Router::new().merge(health::routes()).merge(internal_routes)
}
