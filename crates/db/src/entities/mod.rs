//! `SeaORM` entity definitions.

#![allow(missing_docs)]

pub mod communities;
pub mod expenses;
pub mod maintenance_records;
pub mod rate_configurations;
pub mod sea_orm_active_enums;
pub mod units;
pub mod users;
