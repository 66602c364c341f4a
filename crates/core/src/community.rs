//! Communities, billable units and rate configurations.
//!
//! These are read-only inputs to the billing engine and the ledger.

use chrono::NaiveDate;
use residia_shared::types::{CommunityId, RateConfigurationId, UnitId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a community prices its monthly maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityKind {
    /// Every unit pays the same fixed amount.
    Standalone,
    /// Units pay a rate per unit of floor area.
    RateBased,
}

/// A residential community.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    /// Unique identifier.
    pub id: CommunityId,
    /// Display name.
    pub name: String,
    /// Pricing classification.
    pub kind: CommunityKind,
    /// Legacy per-area rate, used when no rate configuration applies.
    pub flat_amount: Option<Decimal>,
    /// Legacy fixed monthly amount, used when no rate configuration applies.
    pub fixed_amount: Option<Decimal>,
    /// Manually set starting balance. Absent means zero.
    pub opening_balance: Option<Decimal>,
    /// Inactive communities are not billed.
    pub is_active: bool,
}

impl Community {
    /// Opening balance with the absent case treated as zero.
    #[must_use]
    pub fn opening_balance_or_zero(&self) -> Decimal {
        self.opening_balance.unwrap_or(Decimal::ZERO)
    }
}

/// A dated rate configuration for one community.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfiguration {
    /// Unique identifier.
    pub id: RateConfigurationId,
    /// Community this configuration belongs to.
    pub community_id: CommunityId,
    /// First date this configuration applies.
    pub effective_date: NaiveDate,
    /// Charge per unit of floor area (rate-based communities).
    pub rate_per_area: Decimal,
    /// Fixed monthly charge (standalone communities).
    pub fixed_amount: Decimal,
}

/// A billable flat owned or occupied by one resident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// Community the unit belongs to.
    pub community_id: CommunityId,
    /// Resident who receives the bills.
    pub user_id: UserId,
    /// Floor area used by rate-based pricing.
    pub flat_size: Option<Decimal>,
    /// First billable day. Units without one are never billed.
    pub maintenance_start_date: Option<NaiveDate>,
}
