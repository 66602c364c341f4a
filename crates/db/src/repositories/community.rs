//! Community lookups shared by the billing and ledger repositories.

use residia_core::community::Community;
use residia_shared::types::CommunityId;
use sea_orm::{ConnectionTrait, EntityTrait};

use super::RepositoryError;
use crate::entities::communities;

/// Finds a community by id, active or not.
pub(crate) async fn find_community<C: ConnectionTrait>(
    db: &C,
    id: CommunityId,
) -> Result<Option<Community>, RepositoryError> {
    let model = communities::Entity::find_by_id(id.into_inner()).one(db).await?;
    Ok(model.map(Community::from))
}
