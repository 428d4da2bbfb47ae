pub mod engine;
pub mod filter;

pub use engine::{
    group_by_location, group_by_tier, leaderboard, summarize, tier_distribution,
    BooleanPercentage, CriterionAverage, LocationGroup, TeamSummary, TierGroup, UNASSIGNED,
};
pub use filter::{filter_evaluations, SummaryFilter};
