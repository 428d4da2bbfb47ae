use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::ScoreSet;

/// One judge's scored submission for one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: u64,
    pub participant_name: String,
    pub team_id: u64,
    pub scores: ScoreSet,
    #[serde(default)]
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A submission as received, before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EvaluationInput {
    pub participant_name: String,
    pub team_id: u64,
    pub scores: ScoreSet,
    #[serde(default)]
    pub comments: Option<String>,
}

/// A submission that passed validation: names trimmed, empty comments
/// dropped, every score within range.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidEvaluation {
    pub participant_name: String,
    pub team_id: u64,
    pub scores: ScoreSet,
    pub comments: Option<String>,
}
