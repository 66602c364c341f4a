//! Billing repository backing the billing generator.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use residia_core::billing::{BillingKey, NewBillingRecord};
use residia_core::community::{Community, RateConfiguration, Unit};
use residia_core::store::{BillingStore, CommunityStore, InsertOutcome, StoreError};
use residia_shared::types::{CommunityId, UnitId};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use super::RepositoryError;
use super::community::find_community;
use super::mapping::new_record_active_model;
use crate::entities::{communities, maintenance_records, rate_configurations, units};

/// Rows per INSERT statement. Eight bind parameters per row keeps each
/// statement well under PostgreSQL's 65535 parameter limit.
const INSERT_CHUNK_SIZE: usize = 1000;

/// Billing repository over PostgreSQL.
#[derive(Debug, Clone)]
pub struct BillingRepository {
    db: DatabaseConnection,
}

impl BillingRepository {
    /// Creates a new billing repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists active communities ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_active_communities(&self) -> Result<Vec<Community>, RepositoryError> {
        let models = communities::Entity::find()
            .filter(communities::Column::IsActive.eq(true))
            .order_by_asc(communities::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Community::from).collect())
    }

    /// Lists rate configurations, newest effective date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_rate_configurations(
        &self,
        community_id: CommunityId,
    ) -> Result<Vec<RateConfiguration>, RepositoryError> {
        let models = rate_configurations::Entity::find()
            .filter(rate_configurations::Column::CommunityId.eq(community_id.into_inner()))
            .order_by_desc(rate_configurations::Column::EffectiveDate)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(RateConfiguration::from).collect())
    }

    /// Lists units with a maintenance start date.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_billable_units(
        &self,
        community_id: CommunityId,
    ) -> Result<Vec<Unit>, RepositoryError> {
        let models = units::Entity::find()
            .filter(units::Column::CommunityId.eq(community_id.into_inner()))
            .filter(units::Column::MaintenanceStartDate.is_not_null())
            .order_by_asc(units::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Unit::from).collect())
    }

    /// Loads the `(unit_id, period_date)` of every record in the community.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn load_billed_keys(
        &self,
        community_id: CommunityId,
    ) -> Result<HashSet<BillingKey>, RepositoryError> {
        let rows: Vec<(Uuid, NaiveDate)> = maintenance_records::Entity::find()
            .select_only()
            .column(maintenance_records::Column::UnitId)
            .column(maintenance_records::Column::PeriodDate)
            .filter(maintenance_records::Column::CommunityId.eq(community_id.into_inner()))
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(unit_id, period_date)| BillingKey::new(UnitId::from_uuid(unit_id), period_date))
            .collect())
    }

    /// Inserts records in one transaction, skipping keys that already exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is written then.
    pub async fn insert_new_records(
        &self,
        records: &[NewBillingRecord],
    ) -> Result<InsertOutcome, RepositoryError> {
        if records.is_empty() {
            return Ok(InsertOutcome::default());
        }

        let txn = self.db.begin().await?;
        let mut inserted = 0u64;

        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            inserted += maintenance_records::Entity::insert_many(
                chunk.iter().map(new_record_active_model),
            )
            .on_conflict(
                OnConflict::columns([
                    maintenance_records::Column::UnitId,
                    maintenance_records::Column::PeriodDate,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }

        txn.commit().await?;

        let total = records.len() as u64;
        let outcome = InsertOutcome {
            inserted,
            duplicates: total.saturating_sub(inserted),
        };
        debug!(
            inserted = outcome.inserted,
            duplicates = outcome.duplicates,
            "Inserted billing records"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl CommunityStore for BillingRepository {
    async fn find_community(&self, id: CommunityId) -> Result<Option<Community>, StoreError> {
        Ok(find_community(&self.db, id).await?)
    }
}

#[async_trait]
impl BillingStore for BillingRepository {
    async fn active_communities(&self) -> Result<Vec<Community>, StoreError> {
        Ok(self.list_active_communities().await?)
    }

    async fn rate_configurations(
        &self,
        community_id: CommunityId,
    ) -> Result<Vec<RateConfiguration>, StoreError> {
        Ok(self.list_rate_configurations(community_id).await?)
    }

    async fn billable_units(&self, community_id: CommunityId) -> Result<Vec<Unit>, StoreError> {
        Ok(self.list_billable_units(community_id).await?)
    }

    async fn billed_keys(
        &self,
        community_id: CommunityId,
    ) -> Result<HashSet<BillingKey>, StoreError> {
        Ok(self.load_billed_keys(community_id).await?)
    }

    async fn insert_records(
        &self,
        records: &[NewBillingRecord],
    ) -> Result<InsertOutcome, StoreError> {
        Ok(self.insert_new_records(records).await?)
    }
}
