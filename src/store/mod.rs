pub mod storage;
pub mod types;

pub use storage::{get_data_path, load_store_data, save_store_data, JsonStore};
pub use types::{EvaluationRecord, NewEvaluation, ScoreRow, StoreData, STORE_VERSION};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::evaluations::Evaluation;
use crate::scoring::ScoreSet;
use crate::teams::{NewTeam, Team};

/// Persistence collaborator holding teams and evaluations.
///
/// Implementations enforce the relational constraints themselves (unique team
/// number and name, evaluations must reference an existing team, teams with
/// evaluations cannot be deleted) so that a caller skipping the registry
/// checks still cannot corrupt the data. Every single-record write is atomic;
/// an evaluation header and its score rows are two writes.
pub trait Store {
    /// All teams, in creation order.
    fn teams(&self) -> Result<Vec<Team>>;

    fn team(&self, id: u64) -> Result<Option<Team>> {
        Ok(self.teams()?.into_iter().find(|t| t.id == id))
    }

    fn insert_team(&mut self, team: NewTeam, created_at: DateTime<Utc>) -> Result<Team>;

    fn update_team(&mut self, team: &Team) -> Result<()>;

    /// Returns false if no team had that id.
    fn delete_team(&mut self, id: u64) -> Result<bool>;

    /// All evaluations with their scores joined in, in creation order.
    fn evaluations(&self) -> Result<Vec<Evaluation>>;

    fn evaluation(&self, id: u64) -> Result<Option<Evaluation>> {
        Ok(self.evaluations()?.into_iter().find(|e| e.id == id))
    }

    fn count_evaluations_for_team(&self, team_id: u64) -> Result<usize>;

    /// Insert an evaluation header, returning its new id.
    fn insert_evaluation(&mut self, header: NewEvaluation) -> Result<u64>;

    /// Insert the score rows of an evaluation inserted earlier.
    fn insert_scores(&mut self, evaluation_id: u64, scores: &ScoreSet) -> Result<()>;

    fn replace_scores(
        &mut self,
        evaluation_id: u64,
        scores: &ScoreSet,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete an evaluation and its score rows. Returns false if no evaluation
    /// had that id.
    fn delete_evaluation(&mut self, id: u64) -> Result<bool>;
}
