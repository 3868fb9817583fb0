use crate::core::resolver::{resolve, Resolution};
use crate::domain::model::{ItemId, OwnerId, RankedEntry};
use crate::utils::error::{RankError, Result};
use serde::{Deserialize, Serialize};

/// Human answer to a single comparison. There is deliberately no "equal":
/// ties have to be broken by the person picking a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    /// The new item ranks better than the one it was compared against.
    #[serde(alias = "prefer_new")]
    New,
    /// The existing item ranks better.
    #[serde(alias = "prefer_existing")]
    Existing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    AwaitingComparison,
    HasCandidate {
        compare_against: ItemId,
        position: usize,
    },
    Done {
        position: usize,
    },
}

/// State of one insertion in progress.
///
/// The value is self-contained and serializable so it can travel with the
/// caller between requests. `snapshot_version` and `snapshot_len` pin the
/// owner's list as it was when the session started; the engine refuses to
/// advance or commit against any other version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSession {
    pub owner_id: OwnerId,
    pub target_item: ItemId,
    pub low: usize,
    pub high: usize,
    pub snapshot_version: u64,
    pub snapshot_len: usize,
    pub comparisons: u32,
    #[serde(flatten)]
    pub state: SessionState,
}

impl ComparisonSession {
    /// Fresh session over a snapshot of `snapshot_len` entries, before the first resolver call.
    pub fn new(
        owner_id: OwnerId,
        target_item: ItemId,
        snapshot_len: usize,
        snapshot_version: u64,
    ) -> Self {
        Self {
            owner_id,
            target_item,
            low: 0,
            high: snapshot_len,
            snapshot_version,
            snapshot_len,
            comparisons: 0,
            state: SessionState::AwaitingComparison,
        }
    }

    /// Creates the session and runs the first resolver step.
    pub fn start(
        owner_id: OwnerId,
        target_item: ItemId,
        snapshot: &[RankedEntry],
        snapshot_version: u64,
    ) -> Result<Self> {
        let mut session = Self::new(owner_id, target_item, snapshot.len(), snapshot_version);
        session.advance(snapshot)?;
        Ok(session)
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, SessionState::Done { .. })
    }

    pub fn final_position(&self) -> Option<usize> {
        match self.state {
            SessionState::Done { position } => Some(position),
            _ => None,
        }
    }

    pub fn candidate(&self) -> Option<(ItemId, usize)> {
        match self.state {
            SessionState::HasCandidate {
                compare_against,
                position,
            } => Some((compare_against, position)),
            _ => None,
        }
    }

    /// Runs the resolver for the current bounds. Only valid while awaiting a comparison.
    pub fn advance(&mut self, snapshot: &[RankedEntry]) -> Result<&SessionState> {
        match self.state {
            SessionState::Done { .. } => return Err(RankError::SessionComplete),
            SessionState::HasCandidate { .. } => return Ok(&self.state),
            SessionState::AwaitingComparison => {}
        }
        self.check_snapshot(snapshot)?;

        self.state = match resolve(snapshot, self.low, self.high)? {
            Resolution::Done { position } => SessionState::Done { position },
            Resolution::Compare {
                position,
                compare_against,
            } => SessionState::HasCandidate {
                compare_against,
                position,
            },
        };
        Ok(&self.state)
    }

    /// Narrows the bounds around the pending candidate and advances.
    pub fn answer(
        &mut self,
        snapshot: &[RankedEntry],
        preference: Preference,
    ) -> Result<&SessionState> {
        let (compare_against, mid) = match self.state {
            SessionState::Done { .. } => return Err(RankError::SessionComplete),
            SessionState::AwaitingComparison => return Err(RankError::NoPendingComparison),
            SessionState::HasCandidate {
                compare_against,
                position,
            } => (compare_against, position),
        };
        self.check_snapshot(snapshot)?;
        self.check_candidate(snapshot, compare_against, mid)?;

        let comparisons = self
            .comparisons
            .checked_add(1)
            .ok_or_else(|| RankError::SessionMismatch {
                message: "comparison count overflow".to_string(),
            })?;
        match preference {
            Preference::New => self.high = mid,
            Preference::Existing => self.low = mid + 1,
        }
        self.comparisons = comparisons;
        self.state = SessionState::AwaitingComparison;
        self.advance(snapshot)
    }

    fn check_snapshot(&self, snapshot: &[RankedEntry]) -> Result<()> {
        if snapshot.len() != self.snapshot_len {
            return Err(RankError::SessionMismatch {
                message: format!(
                    "session was started over {} entries but snapshot has {}",
                    self.snapshot_len,
                    snapshot.len()
                ),
            });
        }
        if self.low > self.high || self.high > self.snapshot_len {
            return Err(RankError::InvalidBounds {
                low: self.low,
                high: self.high,
                len: self.snapshot_len,
            });
        }
        Ok(())
    }

    /// The pending candidate must be the step the resolver takes for the current bounds.
    /// Sessions come back from callers, so this is where a forged one is caught.
    fn check_candidate(
        &self,
        snapshot: &[RankedEntry],
        compare_against: ItemId,
        position: usize,
    ) -> Result<()> {
        let expected = resolve(snapshot, self.low, self.high)?;
        if expected.position() != position || expected.compare_against() != Some(compare_against) {
            return Err(RankError::SessionMismatch {
                message: format!(
                    "candidate at position {} does not match bounds [{}, {})",
                    position, self.low, self.high
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(n: usize) -> Vec<RankedEntry> {
        (0..n)
            .map(|rank| RankedEntry {
                item_id: ItemId::new(),
                rank,
            })
            .collect()
    }

    fn run(n: usize, mut choose: impl FnMut(usize) -> Preference) -> ComparisonSession {
        let list = snapshot(n);
        let mut session =
            ComparisonSession::start(OwnerId::new(), ItemId::new(), &list, 0).unwrap();
        while let Some((_, position)) = session.candidate() {
            session.answer(&list, choose(position)).unwrap();
        }
        session
    }

    #[test]
    fn test_start_on_empty_snapshot_is_done() {
        let session = ComparisonSession::start(OwnerId::new(), ItemId::new(), &[], 0).unwrap();
        assert_eq!(session.state, SessionState::Done { position: 0 });
        assert_eq!(session.comparisons, 0);
    }

    #[test]
    fn test_start_has_candidate_at_midpoint() {
        let list = snapshot(3);
        let session = ComparisonSession::start(OwnerId::new(), ItemId::new(), &list, 4).unwrap();
        assert_eq!(session.candidate(), Some((list[1].item_id, 1)));
        assert_eq!((session.low, session.high), (0, 3));
        assert_eq!(session.snapshot_version, 4);
    }

    #[test]
    fn test_prefer_new_everywhere_lands_first() {
        let session = run(3, |_| Preference::New);
        assert_eq!(session.final_position(), Some(0));
    }

    #[test]
    fn test_prefer_existing_everywhere_lands_last() {
        let session = run(3, |_| Preference::Existing);
        assert_eq!(session.final_position(), Some(3));
    }

    #[test]
    fn test_converges_to_middle_in_three_comparisons() {
        let session = run(7, |position| {
            if position >= 3 {
                Preference::New
            } else {
                Preference::Existing
            }
        });
        assert_eq!(session.final_position(), Some(3));
        assert_eq!(session.comparisons, 3);
    }

    #[test]
    fn test_answer_after_done_is_rejected() {
        let mut session = run(2, |_| Preference::New);
        let list = snapshot(2);
        assert!(matches!(
            session.answer(&list, Preference::New),
            Err(RankError::SessionComplete)
        ));
    }

    #[test]
    fn test_answer_before_advance_is_rejected() {
        let list = snapshot(4);
        let mut session = ComparisonSession::new(OwnerId::new(), ItemId::new(), list.len(), 0);
        assert!(matches!(
            session.answer(&list, Preference::New),
            Err(RankError::NoPendingComparison)
        ));
    }

    #[test]
    fn test_snapshot_size_change_is_rejected() {
        let list = snapshot(4);
        let mut session =
            ComparisonSession::start(OwnerId::new(), ItemId::new(), &list, 0).unwrap();
        let grown = snapshot(5);
        assert!(matches!(
            session.answer(&grown, Preference::New),
            Err(RankError::SessionMismatch { .. })
        ));
    }

    #[test]
    fn test_forged_candidate_is_rejected() {
        let list = snapshot(4);
        let session = ComparisonSession::start(OwnerId::new(), ItemId::new(), &list, 0).unwrap();

        let mut far = session.clone();
        far.state = SessionState::HasCandidate {
            compare_against: list[2].item_id,
            position: usize::MAX,
        };
        assert!(matches!(
            far.answer(&list, Preference::Existing),
            Err(RankError::SessionMismatch { .. })
        ));

        // 位置正確但比較對象被換掉
        let mut swapped = session.clone();
        swapped.state = SessionState::HasCandidate {
            compare_against: list[0].item_id,
            position: 2,
        };
        assert!(matches!(
            swapped.answer(&list, Preference::New),
            Err(RankError::SessionMismatch { .. })
        ));

        let mut wide = session;
        wide.high = usize::MAX;
        assert!(matches!(
            wide.answer(&list, Preference::New),
            Err(RankError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_comparison_counter_overflow_is_rejected() {
        let list = snapshot(4);
        let mut session =
            ComparisonSession::start(OwnerId::new(), ItemId::new(), &list, 0).unwrap();
        session.comparisons = u32::MAX;

        assert!(session.answer(&list, Preference::New).is_err());
        assert_eq!(session.comparisons, u32::MAX);
        assert_eq!((session.low, session.high), (0, 4));
    }

    #[test]
    fn test_session_json_shape() {
        let list = snapshot(3);
        let session = ComparisonSession::start(OwnerId::new(), ItemId::new(), &list, 1).unwrap();
        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["state"], "HAS_CANDIDATE");
        assert_eq!(json["position"], 1);
        assert_eq!(json["low"], 0);
        assert_eq!(json["high"], 3);

        let back: ComparisonSession = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }
}
