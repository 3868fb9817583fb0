use crate::core::commit::CommitOutcome;
use crate::domain::model::{Achievement, AchievementKind, OwnerRecord};
use chrono::Utc;

pub const DEFAULT_MILESTONES: [u32; 4] = [10, 25, 50, 100];

/// Hook run after a commit has been computed and before it is written,
/// so whatever it changes on the owner lands in the same atomic save.
pub trait CommitObserver: Send + Sync {
    /// Returns the achievements awarded by this commit.
    fn on_commit(&self, owner: &mut OwnerRecord, outcome: &CommitOutcome) -> Vec<Achievement>;
}

/// Counts first-time rankings and awards an achievement at each milestone.
#[derive(Debug, Clone)]
pub struct MilestoneObserver {
    milestones: Vec<u32>,
}

impl MilestoneObserver {
    pub fn new(milestones: Vec<u32>) -> Self {
        Self { milestones }
    }

    pub fn milestones(&self) -> &[u32] {
        &self.milestones
    }
}

impl Default for MilestoneObserver {
    fn default() -> Self {
        Self::new(DEFAULT_MILESTONES.to_vec())
    }
}

impl CommitObserver for MilestoneObserver {
    fn on_commit(&self, owner: &mut OwnerRecord, outcome: &CommitOutcome) -> Vec<Achievement> {
        if !outcome.first_insertion {
            return Vec::new();
        }

        owner.stats.total_rankings += 1;
        let total = owner.stats.total_rankings;

        let mut awarded = Vec::new();
        if self.milestones.contains(&total) {
            let achievement = Achievement {
                kind: AchievementKind::RankingMilestone,
                name: format!("{} Rankings", total),
                description: format!("Ranked {} courses!", total),
                earned_at: Utc::now(),
            };
            tracing::info!(owner_id = %owner.id, total, "🏆 Ranking milestone reached");
            owner.achievements.push(achievement.clone());
            awarded.push(achievement);
        }

        owner.stats.achievement_count = owner.achievements.len() as u32;
        awarded
    }
}
