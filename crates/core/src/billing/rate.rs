//! Rate resolution for a billing period.
//!
//! A period's rate comes from the first strategy in the chain that can
//! price it:
//! 1. Versioned configuration with the greatest `effective_date` on or before the period
//! 2. Legacy rate fields on the community record
//! 3. Nothing configured: zero, and the period is not billed

use chrono::NaiveDate;
use residia_shared::types::RateConfigurationId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::community::{Community, RateConfiguration};

/// Where a resolved rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RateSource {
    /// A dated rate configuration.
    Versioned {
        /// Configuration used.
        configuration_id: RateConfigurationId,
        /// Its effective date.
        effective_date: NaiveDate,
    },
    /// The community's legacy rate fields.
    Legacy,
    /// No rate applies.
    Unconfigured,
}

/// Charge formula applicable to one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRate {
    /// Charge per unit of floor area.
    pub rate_per_area: Decimal,
    /// Fixed monthly charge.
    pub fixed_amount: Decimal,
    /// Provenance of the rate.
    pub source: RateSource,
}

impl ResolvedRate {
    /// Zero rate used when nothing is configured.
    #[must_use]
    pub const fn unconfigured() -> Self {
        Self {
            rate_per_area: Decimal::ZERO,
            fixed_amount: Decimal::ZERO,
            source: RateSource::Unconfigured,
        }
    }

    /// Returns true unless the rate fell through every strategy.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.source != RateSource::Unconfigured
    }
}

/// One step of the fallback chain.
#[derive(Debug, Clone, Copy)]
pub enum RateStrategy<'a> {
    /// Dated configurations; any order is accepted.
    Versioned(&'a [RateConfiguration]),
    /// Legacy community fields. Applies when either field is present.
    Legacy {
        /// Legacy per-area rate.
        flat_amount: Option<Decimal>,
        /// Legacy fixed amount.
        fixed_amount: Option<Decimal>,
    },
}

impl RateStrategy<'_> {
    /// Prices `period`, or returns `None` to defer to the next strategy.
    #[must_use]
    pub fn try_resolve(&self, period: NaiveDate) -> Option<ResolvedRate> {
        match *self {
            Self::Versioned(rates) => rates
                .iter()
                .filter(|rate| rate.effective_date <= period)
                .max_by_key(|rate| rate.effective_date)
                .map(|rate| ResolvedRate {
                    rate_per_area: rate.rate_per_area,
                    fixed_amount: rate.fixed_amount,
                    source: RateSource::Versioned {
                        configuration_id: rate.id,
                        effective_date: rate.effective_date,
                    },
                }),
            Self::Legacy {
                flat_amount,
                fixed_amount,
            } => {
                if flat_amount.is_none() && fixed_amount.is_none() {
                    return None;
                }
                Some(ResolvedRate {
                    rate_per_area: flat_amount.unwrap_or(Decimal::ZERO),
                    fixed_amount: fixed_amount.unwrap_or(Decimal::ZERO),
                    source: RateSource::Legacy,
                })
            }
        }
    }
}

/// Evaluates a chain of [`RateStrategy`] in order.
#[derive(Debug, Clone)]
pub struct RateResolver<'a> {
    chain: Vec<RateStrategy<'a>>,
}

impl<'a> RateResolver<'a> {
    /// Creates a resolver over an explicit chain.
    #[must_use]
    pub fn new(chain: Vec<RateStrategy<'a>>) -> Self {
        Self { chain }
    }

    /// Standard chain for a community: versioned configurations, then legacy fields.
    #[must_use]
    pub fn for_community(community: &Community, rates: &'a [RateConfiguration]) -> Self {
        Self::new(vec![
            RateStrategy::Versioned(rates),
            RateStrategy::Legacy {
                flat_amount: community.flat_amount,
                fixed_amount: community.fixed_amount,
            },
        ])
    }

    /// Resolves the rate for `period`, falling back to zero.
    #[must_use]
    pub fn resolve(&self, period: NaiveDate) -> ResolvedRate {
        self.chain
            .iter()
            .find_map(|strategy| strategy.try_resolve(period))
            .unwrap_or_else(ResolvedRate::unconfigured)
    }
}

/// Resolves the rate for one period of one community.
#[must_use]
pub fn resolve(
    community: &Community,
    rates: &[RateConfiguration],
    period: NaiveDate,
) -> ResolvedRate {
    RateResolver::for_community(community, rates).resolve(period)
}
