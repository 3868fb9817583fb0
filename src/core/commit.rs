use crate::domain::model::{ItemId, OwnerRankingList, RankedEntry};
use crate::utils::error::{RankError, Result};

/// Result of applying an insertion to a ranking list. Nothing is persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub list: OwnerRankingList,
    pub new_rank: usize,
    /// The item had no entry before this commit.
    pub first_insertion: bool,
    /// False when a re-rank resolved to the item's current rank.
    pub changed: bool,
}

/// Places `item_id` at `position` in `list`.
///
/// For an item that is already ranked, `position` is an index into the list
/// with that item removed, the same view the comparison session searched.
pub fn commit(list: &OwnerRankingList, item_id: ItemId, position: usize) -> Result<CommitOutcome> {
    let old_rank = list.rank_of(item_id);
    let max = list.len() - usize::from(old_rank.is_some());
    if position > max {
        return Err(RankError::InvalidPosition { position, max });
    }

    if old_rank == Some(position) {
        return Ok(CommitOutcome {
            list: list.clone(),
            new_rank: position,
            first_insertion: false,
            changed: false,
        });
    }

    let mut updated = list.clone();
    if let Some(old) = old_rank {
        close_gap(updated.entries_mut(), item_id, old);
    }

    let entries = updated.entries_mut();
    for entry in entries.iter_mut() {
        if entry.rank >= position {
            entry.rank += 1;
        }
    }
    entries.insert(position, RankedEntry { item_id, rank: position });
    debug_assert!(updated.is_contiguous());

    Ok(CommitOutcome {
        list: updated,
        new_rank: position,
        first_insertion: old_rank.is_none(),
        changed: true,
    })
}

/// Drops `item_id` from the list. Returns `None` if it was not ranked.
pub fn remove(list: &OwnerRankingList, item_id: ItemId) -> Option<OwnerRankingList> {
    let old = list.rank_of(item_id)?;
    let mut updated = list.clone();
    close_gap(updated.entries_mut(), item_id, old);
    debug_assert!(updated.is_contiguous());
    Some(updated)
}

fn close_gap(entries: &mut Vec<RankedEntry>, item_id: ItemId, old_rank: usize) {
    entries.retain(|e| e.item_id != item_id);
    for entry in entries.iter_mut() {
        if entry.rank > old_rank {
            entry.rank -= 1;
        }
    }
}
