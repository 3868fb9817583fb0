use crate::domain::model::{ItemId, RankedEntry};
use crate::utils::error::{RankError, Result};
use serde::{Deserialize, Serialize};

/// One step of the insertion binary search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// The search interval is empty; the new item belongs at `position`.
    Done { position: usize },
    /// Ask the human to compare the new item with `compare_against`, which sits at `position`.
    Compare {
        position: usize,
        compare_against: ItemId,
    },
}

impl Resolution {
    pub fn is_done(&self) -> bool {
        matches!(self, Resolution::Done { .. })
    }

    pub fn position(&self) -> usize {
        match *self {
            Resolution::Done { position } | Resolution::Compare { position, .. } => position,
        }
    }

    pub fn compare_against(&self) -> Option<ItemId> {
        match *self {
            Resolution::Compare { compare_against, .. } => Some(compare_against),
            Resolution::Done { .. } => None,
        }
    }
}

/// Next step of the search over the half-open interval `[low, high)` of `snapshot`.
///
/// `snapshot` must be sorted by rank. Bounds outside `low <= high <= snapshot.len()`
/// are rejected rather than clamped.
pub fn resolve(snapshot: &[RankedEntry], low: usize, high: usize) -> Result<Resolution> {
    if snapshot.is_empty() {
        return Ok(Resolution::Done { position: 0 });
    }

    if low > high || high > snapshot.len() {
        return Err(RankError::InvalidBounds {
            low,
            high,
            len: snapshot.len(),
        });
    }

    if low == high {
        return Ok(Resolution::Done { position: low });
    }

    let mid = low + (high - low) / 2;
    Ok(Resolution::Compare {
        position: mid,
        compare_against: snapshot[mid].item_id,
    })
}
