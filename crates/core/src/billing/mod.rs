//! Recurring maintenance billing.
//!
//! - [`rate`] resolves the charge formula in force for a month
//! - [`period`] enumerates months and pro-rates the first one
//! - [`planner`] decides which records a community is missing
//! - [`generator`] loads, plans and persists across communities

pub mod error;
pub mod generator;
pub mod period;
pub mod planner;
pub mod rate;
pub mod types;


pub use error::BillingError;
pub use generator::{BillingGenerator, GeneratorOptions};
pub use period::{PeriodCalculator, PeriodCharge, Periods};
pub use planner::{
    BillingPlanner, CommunityPlan, EARLIEST_START_YEAR, PeriodDisposition, PlannedPeriod,
    UnitPlan, check_horizon, skipped_unit_id,
};
pub use rate::{RateResolver, RateSource, RateStrategy, ResolvedRate};
pub use types::{
    BillingKey, BillingRecord, BillingStatus, CommunityOutcome, CommunityStatus,
    GenerationReport, NewBillingRecord,
};
