pub mod commit;
pub mod engine;
pub mod milestones;
pub mod resolver;
pub mod session;

pub use crate::domain::model::{ItemId, OwnerId, OwnerRankingList, RankedEntry};
pub use crate::domain::ports::RankingStore;
pub use crate::utils::error::Result;
