use super::types::{EvaluationInput, ValidEvaluation};
use crate::error::ValidationError;
use crate::scoring::ScoreModel;
use crate::teams::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    /// Judge-facing submission: the team must be active
    Judge,
    /// Admin edit: inactive teams are accepted
    Admin,
}

/// Check a submission against the score model and the team list.
///
/// Checks run in a fixed order and the first violation is returned:
/// judge name, team, presence of every declared field, ranges, then
/// undeclared fields.
pub fn validate_submission(
    input: &EvaluationInput,
    model: &ScoreModel,
    teams: &[Team],
    mode: SubmissionMode,
) -> Result<ValidEvaluation, ValidationError> {
    let participant_name = input.participant_name.trim();
    if participant_name.is_empty() {
        return Err(ValidationError::EmptyParticipantName);
    }

    let team = teams.iter().find(|t| t.id == input.team_id);
    match (team, mode) {
        (Some(team), SubmissionMode::Judge) if team.active => {}
        (Some(_), SubmissionMode::Admin) => {}
        _ => return Err(ValidationError::UnknownTeam(input.team_id)),
    }

    if let Some(missing) = model
        .fields()
        .iter()
        .find(|f| !input.scores.contains_key(&f.name))
    {
        return Err(ValidationError::MissingField(missing.name.clone()));
    }

    for field in model.fields() {
        let value = input.scores[&field.name];
        if value < field.min || value > field.max {
            return Err(ValidationError::ScoreOutOfRange {
                field: field.name.clone(),
                value,
                min: field.min,
                max: field.max,
            });
        }
    }

    if let Some(extra) = input.scores.keys().find(|k| model.field(k).is_err()) {
        return Err(ValidationError::UnknownField(extra.clone()));
    }

    let comments = input
        .comments
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Ok(ValidEvaluation {
        participant_name: participant_name.to_string(),
        team_id: input.team_id,
        scores: input.scores.clone(),
        comments,
    })
}
