//! Pure billing plans.
//!
//! Given a snapshot of a community (rates, units, already-billed keys) the
//! planner decides which records a run should add. It performs no I/O, so
//! the same snapshot always yields the same plan.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use residia_shared::types::UnitId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::BillingError;
use super::period::{PeriodCalculator, Periods};
use super::rate::{RateResolver, RateSource};
use super::types::{BillingKey, BillingStatus, NewBillingRecord};
use crate::calendar::first_of_month;
use crate::community::{Community, RateConfiguration, Unit};

/// Start dates before this year come from corrupt or placeholder data.
pub const EARLIEST_START_YEAR: i32 = 1900;

/// What a run would do with one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodDisposition {
    /// A record already exists; the period is left untouched.
    AlreadyBilled,
    /// A new pending record would be created.
    Billable,
    /// The period resolves to no charge and is skipped.
    NoCharge,
}

/// One row of a unit's billing schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedPeriod {
    /// First day of the month.
    pub period_date: NaiveDate,
    /// What a run would do.
    pub disposition: PeriodDisposition,
    /// Computed amount, when the period carries a charge.
    pub amount: Option<Decimal>,
    /// True for a partial first month.
    pub prorated: bool,
    /// Where the rate came from.
    pub rate_source: RateSource,
}

/// Records to add for one unit.
#[derive(Debug, Clone, Default)]
pub struct UnitPlan {
    /// New records in ascending period order.
    pub records: Vec<NewBillingRecord>,
    /// Periods skipped because a record exists.
    pub periods_already_billed: u64,
    /// Periods skipped because they carry no charge.
    pub periods_without_charge: u64,
}

/// Records to add for a whole community.
#[derive(Debug, Default)]
pub struct CommunityPlan {
    /// New records, grouped by unit in input order.
    pub records: Vec<NewBillingRecord>,
    /// Periods skipped because a record exists.
    pub periods_already_billed: u64,
    /// Periods skipped because they carry no charge.
    pub periods_without_charge: u64,
    /// Units that could not be planned, with the reason.
    pub skipped_units: Vec<BillingError>,
}

/// Plans billing for one community up to a horizon month.
#[derive(Debug, Clone)]
pub struct BillingPlanner<'a> {
    community: &'a Community,
    resolver: RateResolver<'a>,
    horizon: NaiveDate,
}

impl<'a> BillingPlanner<'a> {
    /// Creates a planner billing through the month containing `as_of`.
    #[must_use]
    pub fn new(community: &'a Community, rates: &'a [RateConfiguration], as_of: NaiveDate) -> Self {
        Self {
            community,
            resolver: RateResolver::for_community(community, rates),
            horizon: first_of_month(as_of),
        }
    }

    /// Last period this planner bills.
    #[must_use]
    pub const fn horizon(&self) -> NaiveDate {
        self.horizon
    }

    /// Plans every unit of the community.
    ///
    /// A unit that cannot be planned is recorded in `skipped_units` and
    /// does not affect the others.
    #[must_use]
    pub fn plan_community(&self, units: &[Unit], billed: &HashSet<BillingKey>) -> CommunityPlan {
        let mut plan = CommunityPlan::default();
        let mut staged: HashSet<BillingKey> = HashSet::new();

        for unit in units {
            match self.plan_unit(unit, billed) {
                Ok(unit_plan) => {
                    plan.periods_already_billed += unit_plan.periods_already_billed;
                    plan.periods_without_charge += unit_plan.periods_without_charge;
                    for record in unit_plan.records {
                        // The same unit listed twice must not be staged twice.
                        if staged.insert(record.key()) {
                            plan.records.push(record);
                        } else {
                            plan.periods_already_billed += 1;
                        }
                    }
                }
                Err(e) => plan.skipped_units.push(e),
            }
        }

        plan
    }

    /// Plans the records missing for one unit.
    pub fn plan_unit(
        &self,
        unit: &Unit,
        billed: &HashSet<BillingKey>,
    ) -> Result<UnitPlan, BillingError> {
        let mut plan = UnitPlan::default();
        let Some((start, periods)) = self.periods_for(unit)? else {
            return Ok(plan);
        };

        for period in periods {
            if billed.contains(&BillingKey::new(unit.id, period)) {
                plan.periods_already_billed += 1;
                continue;
            }

            let rate = self.resolver.resolve(period);
            let monthly_total =
                PeriodCalculator::monthly_total(self.community.kind, &rate, unit.flat_size);

            match PeriodCalculator::compute_amount(monthly_total, period, start) {
                Some(charge) if charge.amount > Decimal::ZERO => {
                    plan.records.push(NewBillingRecord {
                        user_id: unit.user_id,
                        unit_id: unit.id,
                        community_id: self.community.id,
                        amount: charge.amount,
                        period_date: period,
                        status: BillingStatus::Pending,
                    });
                }
                _ => plan.periods_without_charge += 1,
            }
        }

        Ok(plan)
    }

    /// Full schedule for one unit, including periods that are already billed.
    pub fn preview_unit(
        &self,
        unit: &Unit,
        billed: &HashSet<BillingKey>,
    ) -> Result<Vec<PlannedPeriod>, BillingError> {
        let Some((start, periods)) = self.periods_for(unit)? else {
            return Ok(Vec::new());
        };

        let schedule = periods
            .map(|period| {
                let rate = self.resolver.resolve(period);
                let monthly_total =
                    PeriodCalculator::monthly_total(self.community.kind, &rate, unit.flat_size);
                let charge = PeriodCalculator::compute_amount(monthly_total, period, start)
                    .filter(|charge| charge.amount > Decimal::ZERO);

                let disposition = if billed.contains(&BillingKey::new(unit.id, period)) {
                    PeriodDisposition::AlreadyBilled
                } else if charge.is_some() {
                    PeriodDisposition::Billable
                } else {
                    PeriodDisposition::NoCharge
                };

                PlannedPeriod {
                    period_date: period,
                    disposition,
                    amount: charge.map(|c| c.amount),
                    prorated: charge.is_some_and(|c| c.prorated),
                    rate_source: rate.source,
                }
            })
            .collect();

        Ok(schedule)
    }

    /// Validates a unit and returns its start date and period sequence.
    ///
    /// `None` for units without a start date, which are never billed.
    fn periods_for(&self, unit: &Unit) -> Result<Option<(NaiveDate, Periods)>, BillingError> {
        if unit.community_id != self.community.id {
            return Err(BillingError::InvalidUnit {
                unit_id: unit.id,
                reason: format!("belongs to community {}", unit.community_id),
            });
        }
        if unit.flat_size.is_some_and(|size| size < Decimal::ZERO) {
            return Err(BillingError::InvalidUnit {
                unit_id: unit.id,
                reason: "negative flat size".to_string(),
            });
        }

        let Some(start) = unit.maintenance_start_date else {
            return Ok(None);
        };

        if start.year() < EARLIEST_START_YEAR {
            return Err(BillingError::MalformedDate {
                unit_id: unit.id,
                detail: format!("maintenance start date {start} is before {EARLIEST_START_YEAR}"),
            });
        }

        let periods = PeriodCalculator::enumerate_periods(start, self.horizon);
        Ok(Some((start, periods)))
    }
}

/// Accepts a run horizon no later than the month containing `today`.
///
/// Writing runs never bill past the current month.
///
/// # Errors
///
/// Returns [`BillingError::HorizonInFuture`] when `as_of` falls in a later month.
pub fn check_horizon(as_of: NaiveDate, today: NaiveDate) -> Result<NaiveDate, BillingError> {
    let latest = first_of_month(today);
    if first_of_month(as_of) > latest {
        return Err(BillingError::HorizonInFuture { as_of, latest });
    }
    Ok(as_of)
}

/// Identifies the unit a skipped-unit error refers to.
#[must_use]
pub fn skipped_unit_id(error: &BillingError) -> Option<UnitId> {
    match error {
        BillingError::MalformedDate { unit_id, .. }
        | BillingError::InvalidUnit { unit_id, .. }
        | BillingError::UnitNotFound(unit_id) => Some(*unit_id),
        _ => None,
    }
}
