//! Daily billing job.

use std::time::Duration;

use chrono::{Datelike, Timelike, Utc};
use residia_core::billing::BillingGenerator;
use residia_core::ledger::LedgerCache;
use residia_core::store::BillingStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the generator once per UTC day, at or after `hour_utc`.
///
/// Returns when `shutdown` is cancelled. A run in progress sees the same
/// token and stops starting new communities.
pub async fn run_daily_billing(
    generator: BillingGenerator<dyn BillingStore>,
    ledger_cache: LedgerCache,
    hour_utc: u32,
    shutdown: CancellationToken,
) {
    info!(hour_utc, "Billing scheduler started");
    let mut last_run: Option<(i32, u32)> = None;

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                info!("Billing scheduler stopped");
                return;
            }
            () = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        let now = Utc::now();
        let today = now.date_naive();
        let day = (today.year(), today.ordinal());
        if last_run == Some(day) || now.hour() < hour_utc {
            continue;
        }
        last_run = Some(day);

        match generator.generate(today, &shutdown).await {
            Ok(report) => {
                if report.records_created > 0 {
                    ledger_cache.invalidate_all();
                }
                if report.is_partial() {
                    warn!(
                        failed = report.communities_failed,
                        cancelled = report.communities_cancelled,
                        created = report.records_created,
                        "Scheduled billing run finished with failures"
                    );
                } else {
                    info!(
                        communities = report.communities_processed,
                        created = report.records_created,
                        "Scheduled billing run finished"
                    );
                }
            }
            // Retried on the next day's slot; running again is harmless.
            Err(e) => error!(error = %e, "Scheduled billing run failed"),
        }
    }
}
