use crate::utils::error::{RankError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for OwnerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One item in an owner's ranking. `rank` is 0-based; rank 0 is the most preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub item_id: ItemId,
    pub rank: usize,
}

/// An owner's strict total order of items.
///
/// Entries are kept sorted by rank and ranks are always exactly `0..len()`.
/// Construction from untrusted data goes through [`OwnerRankingList::from_entries`],
/// which rejects duplicates and gaps instead of repairing them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RankedEntry>", into = "Vec<RankedEntry>")]
pub struct OwnerRankingList {
    entries: Vec<RankedEntry>,
}

impl OwnerRankingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(mut entries: Vec<RankedEntry>) -> Result<Self> {
        entries.sort_by_key(|e| e.rank);

        let mut seen = HashSet::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if entry.rank != index {
                return Err(RankError::ValidationError {
                    message: format!(
                        "ranks must be contiguous from 0: expected rank {} but found {}",
                        index, entry.rank
                    ),
                });
            }
            if !seen.insert(entry.item_id) {
                return Err(RankError::ValidationError {
                    message: format!("item {} is ranked more than once", entry.item_id),
                });
            }
        }

        Ok(Self { entries })
    }

    /// Builds a list from items already in preference order.
    pub fn from_ordered_items<I: IntoIterator<Item = ItemId>>(items: I) -> Result<Self> {
        let entries = items
            .into_iter()
            .enumerate()
            .map(|(rank, item_id)| RankedEntry { item_id, rank })
            .collect();
        Self::from_entries(entries)
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rank_of(&self, item_id: ItemId) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.item_id == item_id)
            .map(|e| e.rank)
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.rank_of(item_id).is_some()
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.entries.iter().map(|e| e.item_id)
    }

    /// The sorted view a comparison session searches over.
    /// When `target` is already ranked it is left out, so a re-rank never compares an
    /// item with itself.
    pub fn snapshot_excluding(&self, target: ItemId) -> Vec<RankedEntry> {
        self.entries
            .iter()
            .filter(|e| e.item_id != target)
            .enumerate()
            .map(|(rank, e)| RankedEntry {
                item_id: e.item_id,
                rank,
            })
            .collect()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<RankedEntry> {
        &mut self.entries
    }

    pub fn is_contiguous(&self) -> bool {
        self.entries.iter().enumerate().all(|(i, e)| e.rank == i)
    }
}

impl TryFrom<Vec<RankedEntry>> for OwnerRankingList {
    type Error = RankError;

    fn try_from(entries: Vec<RankedEntry>) -> Result<Self> {
        Self::from_entries(entries)
    }
}

impl From<OwnerRankingList> for Vec<RankedEntry> {
    fn from(list: OwnerRankingList) -> Self {
        list.entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: ItemId,
    pub title: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    RankingMilestone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub kind: AchievementKind,
    pub name: String,
    pub description: String,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerStats {
    pub total_rankings: u32,
    pub achievement_count: u32,
}

/// The single persisted document per owner. `version` is bumped by the store on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub id: OwnerId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub rankings: OwnerRankingList,
    #[serde(default)]
    pub stats: OwnerStats,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl OwnerRecord {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: OwnerId::new(),
            name: name.into(),
            email: email.into(),
            rankings: OwnerRankingList::new(),
            stats: OwnerStats::default(),
            achievements: Vec::new(),
            version: 0,
            created_at: Utc::now(),
        }
    }
}
