//! Ledger domain types.

use chrono::NaiveDate;
use residia_shared::types::{CommunityId, ExpenseId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Approval state of an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Awaiting approval.
    Pending,
    /// Approved; counts against the balance.
    Approved,
    /// Rejected; never counted.
    Rejected,
}

/// A community expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Unique identifier.
    pub id: ExpenseId,
    /// Community that incurred the expense.
    pub community_id: CommunityId,
    /// Amount spent. Historical rows may lack one.
    pub amount: Option<Decimal>,
    /// Date the expense was incurred.
    pub date: NaiveDate,
    /// Approval state.
    pub status: ExpenseStatus,
}

/// Balance summary for one community and one month.
///
/// `closing_balance = previous_balance + collected_this_month - expenses_this_month`.
/// Pending charges are reported but never counted toward a balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    /// Community summarized.
    pub community_id: CommunityId,
    /// First day of the month.
    pub month: NaiveDate,
    /// Balance the community started with before any billing.
    pub opening_balance: Decimal,
    /// Balance carried into the month.
    pub previous_balance: Decimal,
    /// Paid charges for the month.
    pub collected_this_month: Decimal,
    /// Unpaid charges for the month.
    pub pending_this_month: Decimal,
    /// Approved expenses dated in the month.
    pub expenses_this_month: Decimal,
    /// Balance at the end of the month.
    pub closing_balance: Decimal,
}

/// Consecutive monthly summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatement {
    /// Community summarized.
    pub community_id: CommunityId,
    /// First month, inclusive.
    pub from: NaiveDate,
    /// Last month, inclusive.
    pub to: NaiveDate,
    /// One summary per month in ascending order.
    pub months: Vec<LedgerSummary>,
}
