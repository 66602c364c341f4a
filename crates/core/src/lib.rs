//! Core business logic for Residia.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached only through the traits in [`store`].
//!
//! # Modules
//!
//! - `calendar` - Month boundary arithmetic shared by billing and ledger
//! - `community` - Communities, units and rate configurations
//! - `billing` - Recurring maintenance billing (rates, periods, generation)
//! - `ledger` - Community balance aggregation
//! - `store` - Persistence seam and an in-memory implementation

pub mod billing;
pub mod calendar;
pub mod community;
pub mod ledger;
pub mod store;
