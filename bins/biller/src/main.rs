//! Residia billing CLI.
//!
//! Runs the billing generator outside the server, previews a unit's
//! schedule, and prints ledger summaries. Output is JSON on stdout; logs
//! go to stderr.
//!
//! Usage:
//!   biller run [--as-of DATE] [--community ID] [--dry-run]
//!   biller preview --community ID --unit ID [--as-of DATE]
//!   biller ledger --community ID [--month YYYY-MM] [--opening-balance AMOUNT]
//!   biller statement --community ID --from YYYY-MM --to YYYY-MM

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use residia_core::billing::{BillingGenerator, GeneratorOptions, check_horizon};
use residia_core::calendar::first_of_month;
use residia_core::ledger::{LedgerService, parse_target_month};
use residia_db::{BillingRepository, LedgerRepository, connect};
use residia_shared::AppConfig;
use residia_shared::types::{CommunityId, UnitId};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "biller")]
#[command(about = "Billing runs and ledger queries for Residia")]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create every missing billing record through the given month
    Run {
        /// Bill through this date's month (default: today, UTC)
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Only bill this community
        #[arg(long)]
        community: Option<Uuid>,

        /// Plan and report without writing
        #[arg(long)]
        dry_run: bool,

        /// Communities processed at once (default: from configuration)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Show every period of one unit and what a run would do with it
    Preview {
        /// Community of the unit
        #[arg(long)]
        community: Uuid,

        /// Unit to preview
        #[arg(long)]
        unit: Uuid,

        /// Preview through this date's month (default: today, UTC)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Balance summary for one month
    Ledger {
        /// Community to summarize
        #[arg(long)]
        community: Uuid,

        /// Month as YYYY-MM (default: current month, UTC)
        #[arg(long)]
        month: Option<String>,

        /// Replace the stored opening balance
        #[arg(long)]
        opening_balance: Option<Decimal>,
    },

    /// Monthly summaries over a range
    Statement {
        /// Community to summarize
        #[arg(long)]
        community: Uuid,

        /// First month as YYYY-MM
        #[arg(long)]
        from: String,

        /// Last month as YYYY-MM
        #[arg(long)]
        to: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "residia=debug" } else { "residia=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Run {
            as_of,
            community,
            dry_run,
            concurrency,
        } => {
            let mut options = GeneratorOptions::from(&config.billing);
            options.dry_run = dry_run;
            if let Some(concurrency) = concurrency {
                options.concurrency = concurrency.max(1);
            }
            let generator = BillingGenerator::new(Arc::new(BillingRepository::new(db)), options);
            let as_of = check_horizon(as_of.unwrap_or(today), today)?;

            let report = match community {
                Some(id) => {
                    generator
                        .generate_for_community(CommunityId::from_uuid(id), as_of)
                        .await?
                }
                None => {
                    let cancel = CancellationToken::new();
                    let on_signal = cancel.clone();
                    tokio::spawn(async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            warn!("Interrupted; finishing communities already started");
                            on_signal.cancel();
                        }
                    });
                    generator.generate(as_of, &cancel).await?
                }
            };

            print_json(&report)?;
            if report.is_partial() {
                warn!(
                    failed = report.communities_failed,
                    cancelled = report.communities_cancelled,
                    "Run incomplete; rerun to finish"
                );
                return Ok(ExitCode::FAILURE);
            }
            info!(created = report.records_created, "Run complete");
        }
        Commands::Preview {
            community,
            unit,
            as_of,
        } => {
            let generator = BillingGenerator::new(
                Arc::new(BillingRepository::new(db)),
                GeneratorOptions::from(&config.billing),
            );
            let periods = generator
                .preview_unit(
                    CommunityId::from_uuid(community),
                    UnitId::from_uuid(unit),
                    as_of.unwrap_or(today),
                )
                .await?;
            print_json(&periods)?;
        }
        Commands::Ledger {
            community,
            month,
            opening_balance,
        } => {
            let month = match month.as_deref() {
                Some(raw) => parse_target_month(raw)?,
                None => first_of_month(today),
            };
            let summary = LedgerService::new(Arc::new(LedgerRepository::new(db)))
                .summarize(CommunityId::from_uuid(community), month, opening_balance)
                .await?;
            print_json(&summary)?;
        }
        Commands::Statement {
            community,
            from,
            to,
        } => {
            let statement = LedgerService::new(Arc::new(LedgerRepository::new(db)))
                .statement(
                    CommunityId::from_uuid(community),
                    parse_target_month(&from)?,
                    parse_target_month(&to)?,
                )
                .await?;
            print_json(&statement)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
