//! Ledger summary routes.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::Utc;
use residia_core::calendar::first_of_month;
use residia_core::ledger::{LedgerStatement, LedgerSummary, parse_target_month};
use residia_shared::{AppError, types::CommunityId};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// Creates the ledger routes (requires the internal key middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/communities/{community_id}/ledger", get(get_summary))
        .route(
            "/communities/{community_id}/ledger/statement",
            get(get_statement),
        )
}

/// Query parameters for a monthly summary.
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Target month as `YYYY-MM` (defaults to the current month, UTC).
    pub month: Option<String>,
    /// Replaces the community's stored opening balance.
    pub opening_balance: Option<String>,
}

/// Query parameters for a statement.
#[derive(Debug, Deserialize)]
pub struct StatementQuery {
    /// First month as `YYYY-MM`.
    pub from: String,
    /// Last month as `YYYY-MM`.
    pub to: String,
}

/// GET `/communities/{community_id}/ledger` - Balance summary for one month.
async fn get_summary(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<LedgerSummary>, ApiError> {
    let month = match query.month.as_deref() {
        Some(raw) => parse_target_month(raw)?,
        None => first_of_month(Utc::now().date_naive()),
    };
    let opening_override = query
        .opening_balance
        .as_deref()
        .map(|raw| {
            Decimal::from_str(raw.trim()).map_err(|_| {
                ApiError(AppError::Validation(format!(
                    "opening_balance is not a decimal: {raw}"
                )))
            })
        })
        .transpose()?;

    let summary = state
        .ledger()
        .summarize(community_id, month, opening_override)
        .await?;
    Ok(Json(summary))
}

/// GET `/communities/{community_id}/ledger/statement` - Consecutive monthly summaries.
async fn get_statement(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Query(query): Query<StatementQuery>,
) -> Result<Json<LedgerStatement>, ApiError> {
    let from = parse_target_month(&query.from)?;
    let to = parse_target_month(&query.to)?;

    let statement = state.ledger().statement(community_id, from, to).await?;
    Ok(Json(statement))
}
