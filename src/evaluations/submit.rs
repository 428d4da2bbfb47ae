use chrono::Utc;
use tracing::{error, info, warn};

use super::types::{Evaluation, EvaluationInput, ValidEvaluation};
use super::validator::{validate_submission, SubmissionMode};
use crate::admin::AdminToken;
use crate::error::{Error, Result};
use crate::scoring::{ScoreModel, ScoreSet};
use crate::store::{NewEvaluation, Store};

/// Validate and persist a judge's submission, returning the new evaluation id.
///
/// Nothing is persisted when validation fails.
pub fn submit_evaluation<S: Store + ?Sized>(
    store: &mut S,
    model: &ScoreModel,
    input: &EvaluationInput,
) -> Result<u64> {
    let teams = store.teams()?;
    let valid = validate_submission(input, model, &teams, SubmissionMode::Judge)?;
    persist_evaluation(store, valid)
}

/// Write the header, then the score rows. If the score rows fail the header
/// is deleted again so no evaluation is left without scores.
fn persist_evaluation<S: Store + ?Sized>(store: &mut S, valid: ValidEvaluation) -> Result<u64> {
    let id = store.insert_evaluation(NewEvaluation {
        participant_name: valid.participant_name,
        team_id: valid.team_id,
        comments: valid.comments,
        created_at: Utc::now(),
    })?;

    if let Err(e) = store.insert_scores(id, &valid.scores) {
        warn!(evaluation_id = id, "Score rows failed to persist, removing evaluation");
        if let Err(cleanup) = store.delete_evaluation(id) {
            error!(
                evaluation_id = id,
                "Compensating delete failed: {:#}", cleanup
            );
        }
        return Err(Error::Store(e));
    }

    info!(evaluation_id = id, team_id = valid.team_id, "Evaluation recorded");
    Ok(id)
}

/// Re-score an existing evaluation. Judge name, team and comments stay as
/// they were; `updated_at` moves forward.
pub fn edit_scores<S: Store + ?Sized>(
    store: &mut S,
    model: &ScoreModel,
    _admin: &AdminToken,
    id: u64,
    scores: ScoreSet,
) -> Result<Evaluation> {
    let existing = store
        .evaluation(id)?
        .ok_or(Error::NotFound {
            entity: "evaluation",
            id,
        })?;

    let input = EvaluationInput {
        participant_name: existing.participant_name.clone(),
        team_id: existing.team_id,
        scores,
        comments: existing.comments.clone(),
    };
    let teams = store.teams()?;
    let valid = validate_submission(&input, model, &teams, SubmissionMode::Admin)?;

    let updated_at = Utc::now();
    store.replace_scores(id, &valid.scores, updated_at)?;
    info!(evaluation_id = id, "Evaluation re-scored");

    Ok(Evaluation {
        scores: valid.scores,
        updated_at,
        ..existing
    })
}

pub fn delete_evaluation<S: Store + ?Sized>(
    store: &mut S,
    _admin: &AdminToken,
    id: u64,
) -> Result<()> {
    if !store.delete_evaluation(id)? {
        return Err(Error::NotFound {
            entity: "evaluation",
            id,
        });
    }
    info!(evaluation_id = id, "Evaluation deleted");
    Ok(())
}

/// Delete every evaluation, or every evaluation of one team. Returns how many
/// were removed.
pub fn purge_evaluations<S: Store + ?Sized>(
    store: &mut S,
    _admin: &AdminToken,
    team_id: Option<u64>,
) -> Result<usize> {
    let doomed: Vec<u64> = store
        .evaluations()?
        .into_iter()
        .filter(|e| team_id.map_or(true, |t| e.team_id == t))
        .map(|e| e.id)
        .collect();

    let mut removed = 0;
    for id in doomed {
        if store.delete_evaluation(id)? {
            removed += 1;
        }
    }
    info!(removed, ?team_id, "Evaluations purged");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::unlock;
    use crate::error::ValidationError;
    use crate::store::JsonStore;
    use crate::teams::{NewTeam, Team};
    use anyhow::anyhow;
    use chrono::DateTime;

    fn admin() -> AdminToken {
        unlock("secret", "secret").unwrap()
    }

    fn store_with_team(active: bool) -> (JsonStore, Team) {
        let mut store = JsonStore::in_memory("likert5");
        let team = store
            .insert_team(
                NewTeam {
                    number: Some(1),
                    name: Some("Alpha".to_string()),
                    location: None,
                    active,
                },
                Utc::now(),
            )
            .unwrap();
        (store, team)
    }

    fn scores(model: &ScoreModel, values: [i64; 5]) -> ScoreSet {
        model
            .fields()
            .iter()
            .zip(values)
            .map(|(f, v)| (f.name.clone(), v))
            .collect()
    }

    fn submission(team_id: u64, scores: ScoreSet) -> EvaluationInput {
        EvaluationInput {
            participant_name: "Dana".to_string(),
            team_id,
            scores,
            comments: Some("Great demo".to_string()),
        }
    }

    /// Store whose score-row writes always fail.
    struct FailingScores(JsonStore);

    impl Store for FailingScores {
        fn teams(&self) -> anyhow::Result<Vec<Team>> {
            self.0.teams()
        }
        fn insert_team(
            &mut self,
            team: NewTeam,
            created_at: DateTime<Utc>,
        ) -> anyhow::Result<Team> {
            self.0.insert_team(team, created_at)
        }
        fn update_team(&mut self, team: &Team) -> anyhow::Result<()> {
            self.0.update_team(team)
        }
        fn delete_team(&mut self, id: u64) -> anyhow::Result<bool> {
            self.0.delete_team(id)
        }
        fn evaluations(&self) -> anyhow::Result<Vec<Evaluation>> {
            self.0.evaluations()
        }
        fn count_evaluations_for_team(&self, team_id: u64) -> anyhow::Result<usize> {
            self.0.count_evaluations_for_team(team_id)
        }
        fn insert_evaluation(&mut self, header: NewEvaluation) -> anyhow::Result<u64> {
            self.0.insert_evaluation(header)
        }
        fn insert_scores(&mut self, _: u64, _: &ScoreSet) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }
        fn replace_scores(
            &mut self,
            evaluation_id: u64,
            scores: &ScoreSet,
            updated_at: DateTime<Utc>,
        ) -> anyhow::Result<()> {
            self.0.replace_scores(evaluation_id, scores, updated_at)
        }
        fn delete_evaluation(&mut self, id: u64) -> anyhow::Result<bool> {
            self.0.delete_evaluation(id)
        }
    }

    #[test]
    fn test_submit_persists_evaluation() {
        let model = ScoreModel::likert5();
        let (mut store, team) = store_with_team(true);

        let id = submit_evaluation(&mut store, &model, &submission(team.id, scores(&model, [4, 3, 2, 1, 0])))
            .unwrap();

        let stored = store.evaluation(id).unwrap().unwrap();
        assert_eq!(stored.team_id, team.id);
        assert_eq!(stored.participant_name, "Dana");
        assert_eq!(stored.comments.as_deref(), Some("Great demo"));
        assert_eq!(model.total_score(&stored.scores), 10);
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[test]
    fn test_out_of_range_persists_nothing() {
        let model = ScoreModel::likert5();
        let (mut store, team) = store_with_team(true);

        let err = submit_evaluation(&mut store, &model, &submission(team.id, scores(&model, [4, 4, 5, 4, 4])))
            .unwrap_err();

        match err {
            Error::Validation(ValidationError::ScoreOutOfRange { ref field, value, .. }) => {
                assert_eq!(field, "prompt_craft");
                assert_eq!(value, 5);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(store.evaluations().unwrap().is_empty());
        assert!(store.data().evaluation_scores.is_empty());
    }

    #[test]
    fn test_submit_to_inactive_team_rejected() {
        let model = ScoreModel::likert5();
        let (mut store, team) = store_with_team(false);
        let err = submit_evaluation(&mut store, &model, &submission(team.id, scores(&model, [1; 5])))
            .unwrap_err();
        assert_eq!(err.code(), "UnknownTeam");
    }

    #[test]
    fn test_failed_score_write_removes_header() {
        let model = ScoreModel::likert5();
        let (store, team) = store_with_team(true);
        let mut failing = FailingScores(store);

        let err = submit_evaluation(&mut failing, &model, &submission(team.id, scores(&model, [1; 5])))
            .unwrap_err();

        assert!(matches!(err, Error::Store(_)));
        assert!(failing.evaluations().unwrap().is_empty());
        assert_eq!(failing.count_evaluations_for_team(team.id).unwrap(), 0);
    }

    #[test]
    fn test_edit_scores_updates_timestamp_only_on_edit() {
        let model = ScoreModel::likert5();
        let (mut store, team) = store_with_team(true);
        let id = submit_evaluation(&mut store, &model, &submission(team.id, scores(&model, [1; 5])))
            .unwrap();
        let before = store.evaluation(id).unwrap().unwrap();

        let edited = edit_scores(&mut store, &model, &admin(), id, scores(&model, [3; 5])).unwrap();

        assert_eq!(model.total_score(&edited.scores), 15);
        assert_eq!(edited.created_at, before.created_at);
        assert!(edited.updated_at >= before.updated_at);
        assert_eq!(store.evaluation(id).unwrap().unwrap(), edited);
    }

    #[test]
    fn test_edit_scores_validates() {
        let model = ScoreModel::likert5();
        let (mut store, team) = store_with_team(true);
        let id = submit_evaluation(&mut store, &model, &submission(team.id, scores(&model, [1; 5])))
            .unwrap();

        let err = edit_scores(&mut store, &model, &admin(), id, scores(&model, [9; 5])).unwrap_err();
        assert_eq!(err.code(), "ScoreOutOfRange");
        let unchanged = store.evaluation(id).unwrap().unwrap();
        assert_eq!(model.total_score(&unchanged.scores), 5);
    }

    #[test]
    fn test_edit_unknown_evaluation() {
        let model = ScoreModel::likert5();
        let (mut store, _) = store_with_team(true);
        let err = edit_scores(&mut store, &model, &admin(), 4, scores(&model, [1; 5])).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "evaluation", id: 4 }));
    }

    #[test]
    fn test_delete_and_purge() {
        let model = ScoreModel::likert5();
        let (mut store, team) = store_with_team(true);
        let other = store
            .insert_team(
                NewTeam {
                    number: Some(2),
                    name: None,
                    location: None,
                    active: true,
                },
                Utc::now(),
            )
            .unwrap();
        let first = submit_evaluation(&mut store, &model, &submission(team.id, scores(&model, [1; 5])))
            .unwrap();
        submit_evaluation(&mut store, &model, &submission(team.id, scores(&model, [2; 5]))).unwrap();
        submit_evaluation(&mut store, &model, &submission(other.id, scores(&model, [3; 5]))).unwrap();

        delete_evaluation(&mut store, &admin(), first).unwrap();
        assert_eq!(
            delete_evaluation(&mut store, &admin(), first).unwrap_err().code(),
            "NotFound"
        );

        assert_eq!(purge_evaluations(&mut store, &admin(), Some(team.id)).unwrap(), 1);
        assert_eq!(store.count_evaluations_for_team(other.id).unwrap(), 1);
        assert_eq!(purge_evaluations(&mut store, &admin(), None).unwrap(), 1);
        assert!(store.evaluations().unwrap().is_empty());
    }
}
