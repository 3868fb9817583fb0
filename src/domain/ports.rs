use crate::domain::model::{Course, ItemId, OwnerId, OwnerRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Document store for owners and courses.
///
/// Each owner is one document. `save_owner` is a compare-and-swap on
/// `OwnerRecord::version`: the write lands only if the stored version still
/// equals `expected_version`, and the stored copy comes back with the version bumped.
/// A save that adds an item whose course no longer exists fails with `ItemNotFound`,
/// checked under the same lock as the version so it cannot race `delete_course`.
/// Implementations must apply a save as a single atomic unit.
#[async_trait]
pub trait RankingStore: Send + Sync {
    async fn insert_owner(&self, owner: OwnerRecord) -> Result<OwnerRecord>;

    async fn load_owner(&self, owner_id: OwnerId) -> Result<OwnerRecord>;

    async fn save_owner(&self, owner: OwnerRecord, expected_version: u64) -> Result<OwnerRecord>;

    async fn insert_course(&self, course: Course) -> Result<Course>;

    async fn get_course(&self, item_id: ItemId) -> Result<Course>;

    async fn list_courses(&self) -> Result<Vec<Course>>;

    /// Removes a course and drops it from every owner's ranking, closing the gap it leaves.
    async fn delete_course(&self, item_id: ItemId) -> Result<Course>;
}
