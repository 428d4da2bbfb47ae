use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::teams::Team;

pub const STORE_VERSION: u32 = 1;

/// On-disk layout of the data file. Evaluation headers and their score rows
/// are separate record sets, joined on `evaluation_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreData {
    pub version: u32,
    /// Score model the evaluations were recorded under
    pub score_model: String,
    pub next_team_id: u64,
    pub next_evaluation_id: u64,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub evaluations: Vec<EvaluationRecord>,
    #[serde(default)]
    pub evaluation_scores: Vec<ScoreRow>,
}

impl StoreData {
    pub fn new(score_model: &str) -> Self {
        Self {
            version: STORE_VERSION,
            score_model: score_model.to_string(),
            next_team_id: 1,
            next_evaluation_id: 1,
            teams: Vec::new(),
            evaluations: Vec::new(),
            evaluation_scores: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: u64,
    pub participant_name: String,
    pub team_id: u64,
    #[serde(default)]
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub evaluation_id: u64,
    pub field: String,
    pub value: i64,
}

/// Header of an evaluation about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvaluation {
    pub participant_name: String,
    pub team_id: u64,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}
