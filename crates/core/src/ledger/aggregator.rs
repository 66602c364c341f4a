//! Monthly balance aggregation.
//!
//! Every record falls in exactly one window relative to the target month:
//! before it, inside it, or after it. Records after the month never
//! contribute.

use chrono::NaiveDate;
use residia_shared::types::CommunityId;
use rust_decimal::Decimal;

use super::types::{ExpenseRecord, ExpenseStatus, LedgerSummary};
use crate::billing::{BillingRecord, BillingStatus};
use crate::calendar::{first_of_month, next_month_start};

/// Position of a date relative to a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Before the first day of the month.
    Prior,
    /// Within the month.
    Current,
    /// On or after the first day of the next month.
    Future,
}

impl Partition {
    /// Classifies `date` against the month starting at `start`.
    ///
    /// `next` is `None` only at the end of the calendar, where no date can
    /// fall after the month.
    #[must_use]
    pub fn of(date: NaiveDate, start: NaiveDate, next: Option<NaiveDate>) -> Self {
        if date < start {
            Self::Prior
        } else if next.is_some_and(|next| date >= next) {
            Self::Future
        } else {
            Self::Current
        }
    }
}

/// Pure ledger arithmetic over already-loaded records.
pub struct LedgerAggregator;

impl LedgerAggregator {
    /// Summarizes the month containing `month`.
    ///
    /// Only paid billing counts as income and only approved expenses count
    /// as spending. Missing amounts count as zero.
    #[must_use]
    pub fn summarize(
        community_id: CommunityId,
        month: NaiveDate,
        opening_balance: Decimal,
        billing: &[BillingRecord],
        expenses: &[ExpenseRecord],
    ) -> LedgerSummary {
        let start = first_of_month(month);
        let next = next_month_start(start);

        let mut prior_income = Decimal::ZERO;
        let mut collected = Decimal::ZERO;
        let mut pending = Decimal::ZERO;
        for record in billing {
            let amount = record.amount.unwrap_or(Decimal::ZERO);
            match (Partition::of(record.period_date, start, next), record.status) {
                (Partition::Prior, BillingStatus::Paid) => prior_income += amount,
                (Partition::Current, BillingStatus::Paid) => collected += amount,
                (Partition::Current, _) => pending += amount,
                _ => {}
            }
        }

        let mut prior_expense = Decimal::ZERO;
        let mut spent = Decimal::ZERO;
        for expense in expenses
            .iter()
            .filter(|expense| expense.status == ExpenseStatus::Approved)
        {
            let amount = expense.amount.unwrap_or(Decimal::ZERO);
            match Partition::of(expense.date, start, next) {
                Partition::Prior => prior_expense += amount,
                Partition::Current => spent += amount,
                Partition::Future => {}
            }
        }

        let previous_balance = opening_balance + prior_income - prior_expense;

        LedgerSummary {
            community_id,
            month: start,
            opening_balance,
            previous_balance,
            collected_this_month: collected,
            pending_this_month: pending,
            expenses_this_month: spent,
            closing_balance: previous_balance + collected - spent,
        }
    }

    /// Summarizes consecutive months from `from` through `to`, inclusive.
    ///
    /// Empty when `from` is after `to`.
    #[must_use]
    pub fn statement(
        community_id: CommunityId,
        from: NaiveDate,
        to: NaiveDate,
        opening_balance: Decimal,
        billing: &[BillingRecord],
        expenses: &[ExpenseRecord],
    ) -> Vec<LedgerSummary> {
        let last = first_of_month(to);
        std::iter::successors(Some(first_of_month(from)), |month| next_month_start(*month))
            .take_while(|month| *month <= last)
            .map(|month| Self::summarize(community_id, month, opening_balance, billing, expenses))
            .collect()
    }
}
