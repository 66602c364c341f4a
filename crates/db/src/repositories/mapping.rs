//! Conversions between `SeaORM` models and core domain types.
//!
//! Core never sees raw rows; every read goes through one of these.

use residia_core::billing::{BillingRecord, BillingStatus, NewBillingRecord};
use residia_core::community::{Community, CommunityKind, RateConfiguration, Unit};
use residia_core::ledger::{ExpenseRecord, ExpenseStatus};
use residia_shared::types::{
    BillingRecordId, CommunityId, ExpenseId, RateConfigurationId, UnitId, UserId,
};
use sea_orm::{ActiveValue::NotSet, Set};

use crate::entities::{
    communities, expenses, maintenance_records, rate_configurations, sea_orm_active_enums, units,
};

impl From<sea_orm_active_enums::CommunityKind> for CommunityKind {
    fn from(kind: sea_orm_active_enums::CommunityKind) -> Self {
        match kind {
            sea_orm_active_enums::CommunityKind::Standalone => Self::Standalone,
            sea_orm_active_enums::CommunityKind::RateBased => Self::RateBased,
        }
    }
}

impl From<CommunityKind> for sea_orm_active_enums::CommunityKind {
    fn from(kind: CommunityKind) -> Self {
        match kind {
            CommunityKind::Standalone => Self::Standalone,
            CommunityKind::RateBased => Self::RateBased,
        }
    }
}

impl From<sea_orm_active_enums::BillingStatus> for BillingStatus {
    fn from(status: sea_orm_active_enums::BillingStatus) -> Self {
        match status {
            sea_orm_active_enums::BillingStatus::Pending => Self::Pending,
            sea_orm_active_enums::BillingStatus::Submitted => Self::Submitted,
            sea_orm_active_enums::BillingStatus::Paid => Self::Paid,
        }
    }
}

impl From<BillingStatus> for sea_orm_active_enums::BillingStatus {
    fn from(status: BillingStatus) -> Self {
        match status {
            BillingStatus::Pending => Self::Pending,
            BillingStatus::Submitted => Self::Submitted,
            BillingStatus::Paid => Self::Paid,
        }
    }
}

impl From<sea_orm_active_enums::ExpenseStatus> for ExpenseStatus {
    fn from(status: sea_orm_active_enums::ExpenseStatus) -> Self {
        match status {
            sea_orm_active_enums::ExpenseStatus::Pending => Self::Pending,
            sea_orm_active_enums::ExpenseStatus::Approved => Self::Approved,
            sea_orm_active_enums::ExpenseStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<communities::Model> for Community {
    fn from(model: communities::Model) -> Self {
        Self {
            id: CommunityId::from_uuid(model.id),
            name: model.name,
            kind: model.kind.into(),
            flat_amount: model.flat_amount,
            fixed_amount: model.fixed_amount,
            opening_balance: model.opening_balance,
            is_active: model.is_active,
        }
    }
}

impl From<rate_configurations::Model> for RateConfiguration {
    fn from(model: rate_configurations::Model) -> Self {
        Self {
            id: RateConfigurationId::from_uuid(model.id),
            community_id: CommunityId::from_uuid(model.community_id),
            effective_date: model.effective_date,
            rate_per_area: model.rate_per_area,
            fixed_amount: model.fixed_amount,
        }
    }
}

impl From<units::Model> for Unit {
    fn from(model: units::Model) -> Self {
        Self {
            id: UnitId::from_uuid(model.id),
            community_id: CommunityId::from_uuid(model.community_id),
            user_id: UserId::from_uuid(model.user_id),
            flat_size: model.flat_size,
            maintenance_start_date: model.maintenance_start_date,
        }
    }
}

impl From<maintenance_records::Model> for BillingRecord {
    fn from(model: maintenance_records::Model) -> Self {
        Self {
            id: BillingRecordId::from_uuid(model.id),
            unit_id: UnitId::from_uuid(model.unit_id),
            user_id: UserId::from_uuid(model.user_id),
            community_id: CommunityId::from_uuid(model.community_id),
            period_date: model.period_date,
            amount: model.amount,
            status: model.status.into(),
        }
    }
}

impl From<expenses::Model> for ExpenseRecord {
    fn from(model: expenses::Model) -> Self {
        Self {
            id: ExpenseId::from_uuid(model.id),
            community_id: CommunityId::from_uuid(model.community_id),
            amount: model.amount,
            date: model.date,
            status: model.status.into(),
        }
    }
}

/// Builds the insert row for a staged record. `created_at` is left to the
/// column default.
pub(crate) fn new_record_active_model(
    record: &NewBillingRecord,
) -> maintenance_records::ActiveModel {
    maintenance_records::ActiveModel {
        id: Set(BillingRecordId::new().into_inner()),
        unit_id: Set(record.unit_id.into_inner()),
        user_id: Set(record.user_id.into_inner()),
        community_id: Set(record.community_id.into_inner()),
        period_date: Set(record.period_date),
        amount: Set(Some(record.amount)),
        status: Set(record.status.into()),
        created_at: NotSet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_community_model_maps_legacy_fields() {
        let id = Uuid::new_v4();
        let model = communities::Model {
            id,
            name: "Hilltop Towers".to_string(),
            kind: sea_orm_active_enums::CommunityKind::Standalone,
            flat_amount: None,
            fixed_amount: Some(dec!(2500)),
            opening_balance: None,
            is_active: true,
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
        };

        let community = Community::from(model);

        assert_eq!(community.id, CommunityId::from_uuid(id));
        assert_eq!(community.kind, CommunityKind::Standalone);
        assert_eq!(community.fixed_amount, Some(dec!(2500)));
        assert_eq!(community.opening_balance_or_zero(), dec!(0));
    }

    #[test]
    fn test_record_model_keeps_missing_amount() {
        let model = maintenance_records::Model {
            id: Uuid::new_v4(),
            unit_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            community_id: Uuid::new_v4(),
            period_date: date(2024, 5, 1),
            amount: None,
            status: sea_orm_active_enums::BillingStatus::Submitted,
            created_at: Utc::now().fixed_offset(),
        };

        let record = BillingRecord::from(model);

        assert_eq!(record.amount, None);
        assert_eq!(record.status, BillingStatus::Submitted);
        assert_eq!(record.period_date, date(2024, 5, 1));
    }

    #[test]
    fn test_new_record_active_model() {
        let record = NewBillingRecord {
            user_id: UserId::new(),
            unit_id: UnitId::new(),
            community_id: CommunityId::new(),
            amount: dec!(1600),
            period_date: date(2024, 6, 1),
            status: BillingStatus::Pending,
        };

        let active = new_record_active_model(&record);

        assert_eq!(active.unit_id, Set(record.unit_id.into_inner()));
        assert_eq!(active.amount, Set(Some(dec!(1600))));
        assert_eq!(active.status, Set(sea_orm_active_enums::BillingStatus::Pending));
        assert_eq!(active.created_at, NotSet);
    }

    #[test]
    fn test_status_round_trip_through_db_enum() {
        for status in [BillingStatus::Pending, BillingStatus::Submitted, BillingStatus::Paid] {
            let db: sea_orm_active_enums::BillingStatus = status.into();
            assert_eq!(BillingStatus::from(db), status);
        }
    }
}
