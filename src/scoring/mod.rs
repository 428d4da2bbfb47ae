pub mod config;
pub mod model;
pub mod tiers;
pub mod validation;

pub use config::*;
pub use model::{ScoreModel, ScoreModelError, ScoreSet};
pub use tiers::{classify, Tier, TierThresholds};
pub use validation::validate_scoring;
