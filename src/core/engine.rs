use crate::core::commit::{self, CommitOutcome};
use crate::core::milestones::{CommitObserver, MilestoneObserver};
use crate::core::resolver::resolve;
use crate::core::session::{ComparisonSession, Preference};
use crate::domain::model::{
    Achievement, Course, ItemId, OwnerId, OwnerRecord, OwnerStats, RankedEntry,
};
use crate::domain::ports::RankingStore;
use crate::utils::error::{RankError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_COMMIT_RETRIES: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCourse {
    pub rank: usize,
    pub course: Course,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextComparison {
    pub done: bool,
    pub position: usize,
    pub compare_against: Option<Course>,
    pub low: usize,
    pub high: usize,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub owner_id: OwnerId,
    pub item_id: ItemId,
    pub new_rank: usize,
    pub version: u64,
    pub first_insertion: bool,
    pub changed: bool,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub id: OwnerId,
    pub name: String,
    pub email: String,
    pub stats: OwnerStats,
    pub achievements: Vec<Achievement>,
    pub ranked_count: usize,
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&OwnerRecord> for OwnerProfile {
    fn from(owner: &OwnerRecord) -> Self {
        Self {
            id: owner.id,
            name: owner.name.clone(),
            email: owner.email.clone(),
            stats: owner.stats,
            achievements: owner.achievements.clone(),
            ranked_count: owner.rankings.len(),
            version: owner.version,
            created_at: owner.created_at,
        }
    }
}

/// Ties the resolver, comparison sessions and rank commits to a store.
///
/// Every mutation of an owner is a read, a pure computation and one
/// compare-and-swap save. Unpinned writes are retried on conflict; writes pinned
/// to a snapshot version fail with [`RankError::Conflict`] instead.
#[derive(Clone)]
pub struct RankingEngine {
    store: Arc<dyn RankingStore>,
    observer: Arc<dyn CommitObserver>,
    commit_retries: usize,
}

impl RankingEngine {
    pub fn new(store: Arc<dyn RankingStore>) -> Self {
        Self {
            store,
            observer: Arc::new(MilestoneObserver::default()),
            commit_retries: DEFAULT_COMMIT_RETRIES,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CommitObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_commit_retries(mut self, retries: usize) -> Self {
        self.commit_retries = retries.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn RankingStore> {
        &self.store
    }

    pub async fn create_owner(&self, name: &str, email: &str) -> Result<OwnerProfile> {
        let owner = self
            .store
            .insert_owner(OwnerRecord::new(name.trim(), email.trim()))
            .await?;
        tracing::info!(owner_id = %owner.id, "👤 Created user");
        Ok(OwnerProfile::from(&owner))
    }

    pub async fn owner_profile(&self, owner_id: OwnerId) -> Result<OwnerProfile> {
        let owner = self.store.load_owner(owner_id).await?;
        Ok(OwnerProfile::from(&owner))
    }

    pub async fn create_course(&self, title: &str, code: &str) -> Result<Course> {
        let course = Course {
            id: ItemId::new(),
            title: title.trim().to_string(),
            code: code.trim().to_string(),
            created_at: Utc::now(),
        };
        let course = self.store.insert_course(course).await?;
        tracing::info!(item_id = %course.id, code = %course.code, "📚 Created course");
        Ok(course)
    }

    pub async fn get_course(&self, item_id: ItemId) -> Result<Course> {
        self.store.get_course(item_id).await
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        self.store.list_courses().await
    }

    /// Case-insensitive substring match on course code or title. A blank query lists everything.
    pub async fn search_courses(&self, query: &str) -> Result<Vec<Course>> {
        let needle = query.trim().to_lowercase();
        let courses = self.store.list_courses().await?;
        if needle.is_empty() {
            return Ok(courses);
        }
        let matches: Vec<Course> = courses
            .into_iter()
            .filter(|c| {
                c.code.to_lowercase().contains(&needle) || c.title.to_lowercase().contains(&needle)
            })
            .collect();
        tracing::debug!(query = %needle, hits = matches.len(), "🔍 Course search");
        Ok(matches)
    }

    pub async fn delete_course(&self, item_id: ItemId) -> Result<Course> {
        let course = self.store.delete_course(item_id).await?;
        tracing::info!(item_id = %item_id, "🗑️ Deleted course and its rankings");
        Ok(course)
    }

    /// The owner's ranking in order, joined with course data.
    pub async fn rankings(&self, owner_id: OwnerId) -> Result<Vec<RankedCourse>> {
        let owner = self.store.load_owner(owner_id).await?;
        let mut ranked = Vec::with_capacity(owner.rankings.len());
        for entry in owner.rankings.entries() {
            match self.store.get_course(entry.item_id).await {
                Ok(course) => ranked.push(RankedCourse {
                    rank: entry.rank,
                    course,
                }),
                Err(RankError::ItemNotFound { .. }) => {
                    tracing::warn!(
                        owner_id = %owner_id,
                        item_id = %entry.item_id,
                        "Ranked course no longer exists"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(ranked)
    }

    /// Stateless resolver step over the owner's current list.
    ///
    /// `item_id` names the item being placed; when it is already ranked it is
    /// left out of the snapshot. `version`, when given, must match the owner's
    /// current version.
    pub async fn next_comparison(
        &self,
        owner_id: OwnerId,
        low: Option<usize>,
        high: Option<usize>,
        version: Option<u64>,
        item_id: Option<ItemId>,
    ) -> Result<NextComparison> {
        let owner = self.store.load_owner(owner_id).await?;
        if let Some(expected) = version {
            ensure_version(expected, owner.version)?;
        }

        let snapshot = match item_id {
            Some(item_id) => {
                self.store.get_course(item_id).await?;
                owner.rankings.snapshot_excluding(item_id)
            }
            None => owner.rankings.entries().to_vec(),
        };
        let low = low.unwrap_or(0);
        let high = high.unwrap_or(snapshot.len());

        let resolution = resolve(&snapshot, low, high)?;
        let compare_against = match resolution.compare_against() {
            Some(id) => Some(self.store.get_course(id).await?),
            None => None,
        };

        tracing::debug!(
            owner_id = %owner_id,
            low,
            high,
            position = resolution.position(),
            done = resolution.is_done(),
            "Resolved next comparison"
        );

        Ok(NextComparison {
            done: resolution.is_done(),
            position: resolution.position(),
            compare_against,
            low,
            high,
            version: owner.version,
        })
    }

    pub async fn start_session(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
    ) -> Result<ComparisonSession> {
        let owner = self.store.load_owner(owner_id).await?;
        self.store.get_course(item_id).await?;

        let snapshot = owner.rankings.snapshot_excluding(item_id);
        let session = ComparisonSession::start(owner.id, item_id, &snapshot, owner.version)?;

        tracing::info!(
            owner_id = %owner_id,
            item_id = %item_id,
            snapshot_len = snapshot.len(),
            rerank = owner.rankings.contains(item_id),
            "🔍 Started comparison session"
        );
        Ok(session)
    }

    pub async fn answer(
        &self,
        owner_id: OwnerId,
        mut session: ComparisonSession,
        preference: Preference,
    ) -> Result<ComparisonSession> {
        ensure_session_owner(owner_id, &session)?;
        let snapshot = self.pinned_snapshot(&session).await?;

        session.answer(&snapshot, preference)?;
        tracing::debug!(
            owner_id = %owner_id,
            item_id = %session.target_item,
            low = session.low,
            high = session.high,
            comparisons = session.comparisons,
            "Narrowed comparison bounds"
        );
        Ok(session)
    }

    /// Applies a finished session. Fails with `Conflict` if the owner's list moved since
    /// the session started.
    pub async fn commit_session(
        &self,
        owner_id: OwnerId,
        session: &ComparisonSession,
    ) -> Result<CommitReceipt> {
        ensure_session_owner(owner_id, session)?;
        let position = session.final_position().ok_or(RankError::SessionIncomplete)?;
        self.insert_ranking(owner_id, session.target_item, position, Some(session.snapshot_version))
            .await
    }

    pub async fn insert_ranking(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
        position: usize,
        expected_version: Option<u64>,
    ) -> Result<CommitReceipt> {
        self.store.get_course(item_id).await?;

        let observer = Arc::clone(&self.observer);
        let (saved, (outcome, achievements)) = self
            .update_owner(owner_id, expected_version, move |owner| {
                let outcome: CommitOutcome = commit::commit(&owner.rankings, item_id, position)?;
                if !outcome.changed {
                    return Ok((false, (outcome, Vec::new())));
                }
                owner.rankings = outcome.list.clone();
                let achievements = observer.on_commit(owner, &outcome);
                Ok((true, (outcome, achievements)))
            })
            .await?;

        tracing::info!(
            owner_id = %owner_id,
            item_id = %item_id,
            new_rank = outcome.new_rank,
            first_insertion = outcome.first_insertion,
            version = saved.version,
            "✅ Ranking committed"
        );

        Ok(CommitReceipt {
            owner_id,
            item_id,
            new_rank: outcome.new_rank,
            version: saved.version,
            first_insertion: outcome.first_insertion,
            changed: outcome.changed,
            achievements,
        })
    }

    pub async fn remove_ranking(&self, owner_id: OwnerId, item_id: ItemId) -> Result<OwnerProfile> {
        let (saved, ()) = self
            .update_owner(owner_id, None, move |owner| {
                let updated = commit::remove(&owner.rankings, item_id).ok_or_else(|| {
                    RankError::ItemNotFound {
                        item_id: item_id.to_string(),
                    }
                })?;
                owner.rankings = updated;
                Ok((true, ()))
            })
            .await?;

        tracing::info!(owner_id = %owner_id, item_id = %item_id, "Removed ranking");
        Ok(OwnerProfile::from(&saved))
    }

    async fn pinned_snapshot(&self, session: &ComparisonSession) -> Result<Vec<RankedEntry>> {
        let owner = self.store.load_owner(session.owner_id).await?;
        ensure_version(session.snapshot_version, owner.version)?;
        Ok(owner.rankings.snapshot_excluding(session.target_item))
    }

    /// Read-modify-write of one owner document.
    ///
    /// `apply` returns whether a write is needed plus a value to hand back.
    async fn update_owner<T, F>(
        &self,
        owner_id: OwnerId,
        pinned_version: Option<u64>,
        mut apply: F,
    ) -> Result<(OwnerRecord, T)>
    where
        T: Send,
        F: FnMut(&mut OwnerRecord) -> Result<(bool, T)> + Send,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut owner = self.store.load_owner(owner_id).await?;
            if let Some(expected) = pinned_version {
                ensure_version(expected, owner.version)?;
            }

            let read_version = owner.version;
            let (needs_write, value) = apply(&mut owner)?;
            if !needs_write {
                return Ok((owner, value));
            }

            match self.store.save_owner(owner, read_version).await {
                Ok(saved) => return Ok((saved, value)),
                Err(RankError::Conflict { expected, actual })
                    if pinned_version.is_none() && attempt < self.commit_retries =>
                {
                    tracing::warn!(
                        owner_id = %owner_id,
                        attempt,
                        expected,
                        actual,
                        "⚠️ Concurrent update, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn ensure_version(expected: u64, actual: u64) -> Result<()> {
    if expected != actual {
        return Err(RankError::Conflict { expected, actual });
    }
    Ok(())
}

fn ensure_session_owner(owner_id: OwnerId, session: &ComparisonSession) -> Result<()> {
    if session.owner_id != owner_id {
        return Err(RankError::SessionMismatch {
            message: format!("session belongs to {}", session.owner_id),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::MemoryStore;

    async fn engine_with_courses(n: usize) -> (RankingEngine, OwnerId, Vec<ItemId>) {
        let engine = RankingEngine::new(Arc::new(MemoryStore::new()));
        let owner = engine.create_owner("Test User", "test@test.com").await.unwrap();
        let mut items = Vec::new();
        for i in 0..n {
            let course = engine
                .create_course(&format!("Test Course {}", i), &format!("TEST{}", 100 + i))
                .await
                .unwrap();
            items.push(course.id);
        }
        (engine, owner.id, items)
    }

    #[tokio::test]
    async fn test_insert_ranking_bumps_version_and_stats() {
        let (engine, owner_id, items) = engine_with_courses(2).await;

        let receipt = engine.insert_ranking(owner_id, items[0], 0, None).await.unwrap();
        assert_eq!(receipt.new_rank, 0);
        assert_eq!(receipt.version, 1);
        assert!(receipt.first_insertion);

        let profile = engine.owner_profile(owner_id).await.unwrap();
        assert_eq!(profile.stats.total_rankings, 1);
        assert_eq!(profile.ranked_count, 1);
    }

    #[tokio::test]
    async fn test_search_courses_matches_code_or_title() {
        let engine = RankingEngine::new(Arc::new(MemoryStore::new()));
        engine.create_course("Calculus I", "MATH101").await.unwrap();
        engine.create_course("Linear Algebra", "MATH220").await.unwrap();
        engine.create_course("Intro to Programming", "CS101").await.unwrap();

        let by_code = engine.search_courses("math").await.unwrap();
        assert_eq!(by_code.len(), 2);

        let by_title = engine.search_courses("  PROGRAMMING ").await.unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].code, "CS101");

        assert!(engine.search_courses("chemistry").await.unwrap().is_empty());
        assert_eq!(engine.search_courses("   ").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_pinned_insert_rejects_stale_version() {
        let (engine, owner_id, items) = engine_with_courses(2).await;
        engine.insert_ranking(owner_id, items[0], 0, None).await.unwrap();

        let err = engine.insert_ranking(owner_id, items[1], 0, Some(0)).await.unwrap_err();
        assert!(matches!(err, RankError::Conflict { expected: 0, actual: 1 }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_noop_rerank_does_not_write() {
        let (engine, owner_id, items) = engine_with_courses(2).await;
        engine.insert_ranking(owner_id, items[0], 0, None).await.unwrap();
        engine.insert_ranking(owner_id, items[1], 1, None).await.unwrap();

        let receipt = engine.insert_ranking(owner_id, items[1], 1, None).await.unwrap();
        assert!(!receipt.changed);
        assert_eq!(receipt.version, 2);
    }

    #[tokio::test]
    async fn test_commit_incomplete_session_is_rejected() {
        let (engine, owner_id, items) = engine_with_courses(3).await;
        engine.insert_ranking(owner_id, items[0], 0, None).await.unwrap();

        let session = engine.start_session(owner_id, items[1]).await.unwrap();
        assert!(!session.is_done());
        assert!(matches!(
            engine.commit_session(owner_id, &session).await,
            Err(RankError::SessionIncomplete)
        ));
    }

    #[tokio::test]
    async fn test_session_for_other_owner_is_rejected() {
        let (engine, owner_id, items) = engine_with_courses(2).await;
        let other = engine.create_owner("Other", "other@test.com").await.unwrap();
        engine.insert_ranking(owner_id, items[0], 0, None).await.unwrap();

        let session = engine.start_session(owner_id, items[1]).await.unwrap();
        assert!(matches!(
            engine.answer(other.id, session, Preference::New).await,
            Err(RankError::SessionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_owner_and_item() {
        let (engine, owner_id, _) = engine_with_courses(0).await;

        assert!(matches!(
            engine.rankings(OwnerId::new()).await,
            Err(RankError::OwnerNotFound { .. })
        ));
        assert!(matches!(
            engine.start_session(owner_id, ItemId::new()).await,
            Err(RankError::ItemNotFound { .. })
        ));
    }
}
