use crate::core::commit;
use crate::domain::model::{Course, ItemId, OwnerId, OwnerRecord};
use crate::domain::ports::RankingStore;
use crate::utils::error::{RankError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Documents {
    owners: HashMap<OwnerId, OwnerRecord>,
    courses: HashMap<ItemId, Course>,
}

/// Process-local store. One lock guards every document, which makes each
/// compare-and-swap and each cascading delete atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<Documents>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RankingStore for MemoryStore {
    async fn insert_owner(&self, owner: OwnerRecord) -> Result<OwnerRecord> {
        let mut docs = self.docs.lock().await;
        if docs
            .owners
            .values()
            .any(|o| o.email.eq_ignore_ascii_case(&owner.email))
        {
            return Err(RankError::DuplicateEmail { email: owner.email });
        }
        docs.owners.insert(owner.id, owner.clone());
        Ok(owner)
    }

    async fn load_owner(&self, owner_id: OwnerId) -> Result<OwnerRecord> {
        let docs = self.docs.lock().await;
        docs.owners
            .get(&owner_id)
            .cloned()
            .ok_or_else(|| RankError::OwnerNotFound {
                owner_id: owner_id.to_string(),
            })
    }

    async fn save_owner(
        &self,
        mut owner: OwnerRecord,
        expected_version: u64,
    ) -> Result<OwnerRecord> {
        let mut guard = self.docs.lock().await;
        let docs = &mut *guard;
        let current = docs
            .owners
            .get_mut(&owner.id)
            .ok_or_else(|| RankError::OwnerNotFound {
                owner_id: owner.id.to_string(),
            })?;

        if current.version != expected_version {
            return Err(RankError::Conflict {
                expected: expected_version,
                actual: current.version,
            });
        }

        // 新加入的課程必須在同一把鎖內仍然存在
        if let Some(missing) = owner
            .rankings
            .item_ids()
            .find(|id| !current.rankings.contains(*id) && !docs.courses.contains_key(id))
        {
            return Err(RankError::ItemNotFound {
                item_id: missing.to_string(),
            });
        }

        owner.version = expected_version + 1;
        *current = owner.clone();
        Ok(owner)
    }

    async fn insert_course(&self, course: Course) -> Result<Course> {
        let mut docs = self.docs.lock().await;
        if docs
            .courses
            .values()
            .any(|c| c.code.eq_ignore_ascii_case(&course.code))
        {
            return Err(RankError::DuplicateCourseCode { code: course.code });
        }
        docs.courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn get_course(&self, item_id: ItemId) -> Result<Course> {
        let docs = self.docs.lock().await;
        docs.courses
            .get(&item_id)
            .cloned()
            .ok_or_else(|| RankError::ItemNotFound {
                item_id: item_id.to_string(),
            })
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let docs = self.docs.lock().await;
        let mut courses: Vec<Course> = docs.courses.values().cloned().collect();
        courses.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(courses)
    }

    async fn delete_course(&self, item_id: ItemId) -> Result<Course> {
        let mut docs = self.docs.lock().await;
        let course = docs
            .courses
            .remove(&item_id)
            .ok_or_else(|| RankError::ItemNotFound {
                item_id: item_id.to_string(),
            })?;

        for owner in docs.owners.values_mut() {
            if let Some(updated) = commit::remove(&owner.rankings, item_id) {
                owner.rankings = updated;
                owner.version += 1;
            }
        }
        Ok(course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::OwnerRankingList;
    use chrono::Utc;

    fn course(code: &str) -> Course {
        Course {
            id: ItemId::new(),
            title: format!("Course {}", code),
            code: code.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_owner_compare_and_swap() {
        let store = MemoryStore::new();
        let owner = store
            .insert_owner(OwnerRecord::new("Test User", "test@test.com"))
            .await
            .unwrap();

        let saved = store.save_owner(owner.clone(), 0).await.unwrap();
        assert_eq!(saved.version, 1);

        let stale = store.save_owner(owner, 0).await;
        assert!(matches!(stale, Err(RankError::Conflict { expected: 0, actual: 1 })));
    }

    #[tokio::test]
    async fn test_save_owner_rejects_deleted_course() {
        let store = MemoryStore::new();
        let owner = store
            .insert_owner(OwnerRecord::new("Test User", "test@test.com"))
            .await
            .unwrap();
        let kept = store.insert_course(course("KEEP1")).await.unwrap();
        let gone = store.insert_course(course("GONE1")).await.unwrap();

        let mut ranked = owner.clone();
        ranked.rankings = OwnerRankingList::from_ordered_items([kept.id]).unwrap();
        let ranked = store.save_owner(ranked, 0).await.unwrap();

        store.delete_course(gone.id).await.unwrap();

        let mut stale = ranked.clone();
        stale.rankings = OwnerRankingList::from_ordered_items([kept.id, gone.id]).unwrap();
        let err = store.save_owner(stale, ranked.version).await.unwrap_err();
        assert!(matches!(err, RankError::ItemNotFound { .. }));

        let stored = store.load_owner(owner.id).await.unwrap();
        assert_eq!(stored.version, 1);
        assert!(!stored.rankings.contains(gone.id));
    }

    #[tokio::test]
    async fn test_duplicate_email_and_code() {
        let store = MemoryStore::new();
        store
            .insert_owner(OwnerRecord::new("A", "a@test.com"))
            .await
            .unwrap();
        assert!(matches!(
            store.insert_owner(OwnerRecord::new("B", "A@test.com")).await,
            Err(RankError::DuplicateEmail { .. })
        ));

        store.insert_course(course("CS101")).await.unwrap();
        assert!(matches!(
            store.insert_course(course("CS101")).await,
            Err(RankError::DuplicateCourseCode { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_course_cascades_to_rankings() {
        let store = MemoryStore::new();
        let a = store.insert_course(course("CS101")).await.unwrap();
        let b = store.insert_course(course("MATH101")).await.unwrap();

        let mut owner = store
            .insert_owner(OwnerRecord::new("Test User", "test@test.com"))
            .await
            .unwrap();
        owner.rankings =
            crate::domain::model::OwnerRankingList::from_ordered_items(vec![a.id, b.id]).unwrap();
        store.save_owner(owner.clone(), 0).await.unwrap();

        store.delete_course(a.id).await.unwrap();

        let reloaded = store.load_owner(owner.id).await.unwrap();
        assert_eq!(reloaded.rankings.len(), 1);
        assert_eq!(reloaded.rankings.rank_of(b.id), Some(0));
        assert_eq!(reloaded.version, 2);
        assert!(store.get_course(a.id).await.is_err());
    }
}
