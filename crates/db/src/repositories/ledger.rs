//! Ledger repository backing ledger summaries.

use async_trait::async_trait;
use chrono::NaiveDate;
use residia_core::billing::BillingRecord;
use residia_core::community::Community;
use residia_core::ledger::ExpenseRecord;
use residia_core::store::{CommunityStore, LedgerStore, StoreError};
use residia_shared::types::CommunityId;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use super::RepositoryError;
use super::community::find_community;
use crate::entities::{expenses, maintenance_records, sea_orm_active_enums::ExpenseStatus};

/// Read-only ledger repository over PostgreSQL.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Billing records with `period_date < before`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_billing_before(
        &self,
        community_id: CommunityId,
        before: NaiveDate,
    ) -> Result<Vec<BillingRecord>, RepositoryError> {
        let models = maintenance_records::Entity::find()
            .filter(maintenance_records::Column::CommunityId.eq(community_id.into_inner()))
            .filter(maintenance_records::Column::PeriodDate.lt(before))
            .order_by_asc(maintenance_records::Column::PeriodDate)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(BillingRecord::from).collect())
    }

    /// Approved expenses dated before `before`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_approved_expenses_before(
        &self,
        community_id: CommunityId,
        before: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>, RepositoryError> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::CommunityId.eq(community_id.into_inner()))
            .filter(expenses::Column::Status.eq(ExpenseStatus::Approved))
            .filter(expenses::Column::Date.lt(before))
            .order_by_asc(expenses::Column::Date)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(ExpenseRecord::from).collect())
    }
}

#[async_trait]
impl CommunityStore for LedgerRepository {
    async fn find_community(&self, id: CommunityId) -> Result<Option<Community>, StoreError> {
        Ok(find_community(&self.db, id).await?)
    }
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    async fn billing_records_before(
        &self,
        community_id: CommunityId,
        before: NaiveDate,
    ) -> Result<Vec<BillingRecord>, StoreError> {
        Ok(self.list_billing_before(community_id, before).await?)
    }

    async fn approved_expenses_before(
        &self,
        community_id: CommunityId,
        before: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>, StoreError> {
        Ok(self.list_approved_expenses_before(community_id, before).await?)
    }
}
