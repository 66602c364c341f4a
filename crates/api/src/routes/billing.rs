//! Billing run and schedule preview routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use residia_core::billing::{GenerationReport, PlannedPeriod, check_horizon};
use residia_shared::types::{CommunityId, UnitId};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{AppState, error::ApiError};

/// Creates the billing routes (requires the internal key middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/billing/runs", post(run_billing))
        .route(
            "/communities/{community_id}/units/{unit_id}/schedule",
            get(unit_schedule),
        )
}

/// Request body for a billing run. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    /// Bill through this date's month (defaults to today, UTC).
    pub as_of: Option<NaiveDate>,
    /// Restrict the run to one community.
    pub community_id: Option<CommunityId>,
    /// Plan without writing.
    #[serde(default)]
    pub dry_run: bool,
}

/// Query parameters for a schedule preview.
#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    /// Preview through this date's month (defaults to today, UTC).
    pub as_of: Option<NaiveDate>,
}

/// Response for a schedule preview.
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    /// Community of the unit.
    pub community_id: CommunityId,
    /// Unit previewed.
    pub unit_id: UnitId,
    /// Horizon month used.
    pub as_of: NaiveDate,
    /// One entry per month from the unit's start through the horizon.
    pub periods: Vec<PlannedPeriod>,
}

/// POST `/billing/runs` - Generate missing billing records.
async fn run_billing(
    State(state): State<AppState>,
    body: Option<Json<RunRequest>>,
) -> Result<Json<GenerationReport>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let today = Utc::now().date_naive();
    let as_of = check_horizon(request.as_of.unwrap_or(today), today)?;
    let generator = state.generator(request.dry_run);

    let report = match request.community_id {
        Some(community_id) => generator.generate_for_community(community_id, as_of).await?,
        None => generator.generate(as_of, &CancellationToken::new()).await?,
    };

    if !report.dry_run && report.records_created > 0 {
        state.ledger_cache.invalidate_all();
    }

    info!(
        as_of = %report.as_of,
        dry_run = report.dry_run,
        created = report.records_created,
        failed = report.communities_failed,
        "Billing run finished via API"
    );

    Ok(Json(report))
}

/// GET `/communities/{community_id}/units/{unit_id}/schedule` - Preview a unit's periods.
async fn unit_schedule(
    State(state): State<AppState>,
    Path((community_id, unit_id)): Path<(CommunityId, UnitId)>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let periods = state
        .generator(true)
        .preview_unit(community_id, unit_id, as_of)
        .await?;

    Ok(Json(ScheduleResponse {
        community_id,
        unit_id,
        as_of,
        periods,
    }))
}
