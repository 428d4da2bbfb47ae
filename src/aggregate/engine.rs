use serde::Serialize;
use std::collections::HashMap;

use super::filter::{filter_evaluations, SummaryFilter};
use crate::evaluations::Evaluation;
use crate::scoring::{ScoreModel, Tier};
use crate::teams::{display_name, Team};

/// Label for teams without a location in grouped views.
pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionAverage {
    pub field: String,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BooleanPercentage {
    pub field: String,
    pub percentage: f64,
}

/// Aggregate view of one team's evaluations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub team_id: u64,
    pub display_name: String,
    pub location: Option<String>,
    pub evaluation_count: usize,
    /// One entry per non-boolean field, in model order, rounded to 2 decimals
    pub criterion_averages: Vec<CriterionAverage>,
    /// Mean of the per-field averages, rounded to 2 decimals
    pub overall_average: f64,
    /// Mean total score, rounded to 1 decimal
    pub total_score_average: f64,
    pub boolean_percentages: Vec<BooleanPercentage>,
    /// Classified on the rounded total-score average
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationGroup {
    pub location: String,
    pub summaries: Vec<TeamSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierGroup {
    pub tier: Tier,
    pub summaries: Vec<TeamSummary>,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// One summary per team that has at least one matching evaluation, in team
/// registry order. Evaluations whose team is no longer registered are kept,
/// grouped after the registered teams.
pub fn summarize(
    evaluations: &[Evaluation],
    teams: &[Team],
    model: &ScoreModel,
    filter: &SummaryFilter,
) -> Vec<TeamSummary> {
    let matching = filter_evaluations(evaluations, teams, filter);

    let mut by_team: HashMap<u64, Vec<&Evaluation>> = HashMap::new();
    let mut orphan_order = Vec::new();
    for evaluation in matching {
        let group = by_team.entry(evaluation.team_id).or_default();
        if group.is_empty() && !teams.iter().any(|t| t.id == evaluation.team_id) {
            orphan_order.push(evaluation.team_id);
        }
        group.push(evaluation);
    }

    let registered = teams
        .iter()
        .map(|t| (t.id, t.display_name(), t.location.clone()));
    let orphans = orphan_order
        .into_iter()
        .map(|id| (id, display_name(id, None, None), None));

    registered
        .chain(orphans)
        .filter_map(|(team_id, name, location)| {
            let group = by_team.remove(&team_id)?;
            Some(summarize_team(team_id, name, location, &group, model))
        })
        .collect()
}

fn summarize_team(
    team_id: u64,
    display_name: String,
    location: Option<String>,
    evaluations: &[&Evaluation],
    model: &ScoreModel,
) -> TeamSummary {
    let field_mean = |field: &str| {
        mean(
            evaluations
                .iter()
                .filter_map(|e| e.scores.get(field))
                .map(|v| *v as f64),
        )
        .unwrap_or(0.0)
    };

    let raw_averages: Vec<(String, f64)> = model
        .averaged_fields()
        .map(|f| (f.name.clone(), field_mean(&f.name)))
        .collect();
    let overall_average = round_to(
        mean(raw_averages.iter().map(|(_, avg)| *avg)).unwrap_or(0.0),
        2,
    );
    let criterion_averages = raw_averages
        .into_iter()
        .map(|(field, avg)| CriterionAverage {
            field,
            average: round_to(avg, 2),
        })
        .collect();

    let boolean_percentages = model
        .boolean_fields()
        .map(|f| BooleanPercentage {
            field: f.name.clone(),
            percentage: round_to(100.0 * field_mean(&f.name), 1),
        })
        .collect();

    let total_score_average = round_to(
        mean(evaluations.iter().map(|e| model.total_score(&e.scores) as f64)).unwrap_or(0.0),
        1,
    );

    TeamSummary {
        team_id,
        display_name,
        location,
        evaluation_count: evaluations.len(),
        criterion_averages,
        overall_average,
        total_score_average,
        boolean_percentages,
        tier: model.tiers().classify(total_score_average),
    }
}

/// Summaries sorted by total-score average, highest first. Ties keep team
/// registry order.
pub fn leaderboard(
    evaluations: &[Evaluation],
    teams: &[Team],
    model: &ScoreModel,
    filter: &SummaryFilter,
) -> Vec<TeamSummary> {
    let mut summaries = summarize(evaluations, teams, model, filter);
    summaries.sort_by(|a, b| b.total_score_average.total_cmp(&a.total_score_average));
    summaries
}

/// Split a leaderboard per location. Groups follow `locations` order, then
/// any location no longer configured, then teams without one. Each group keeps
/// the order it was given.
pub fn group_by_location(summaries: &[TeamSummary], locations: &[String]) -> Vec<LocationGroup> {
    let mut order: Vec<Option<&str>> = locations.iter().map(|l| Some(l.as_str())).collect();
    for summary in summaries {
        let location = summary.location.as_deref();
        if location.is_some() && !order.contains(&location) {
            order.push(location);
        }
    }
    order.push(None);

    order
        .into_iter()
        .filter_map(|key| {
            let members: Vec<TeamSummary> = summaries
                .iter()
                .filter(|s| s.location.as_deref() == key)
                .cloned()
                .collect();
            (!members.is_empty()).then(|| LocationGroup {
                location: key.unwrap_or(UNASSIGNED).to_string(),
                summaries: members,
            })
        })
        .collect()
}

/// Summaries grouped by tier, highest tier first. Empty tiers are left out.
pub fn group_by_tier(summaries: &[TeamSummary]) -> Vec<TierGroup> {
    Tier::DESCENDING
        .into_iter()
        .filter_map(|tier| {
            let members: Vec<TeamSummary> = summaries
                .iter()
                .filter(|s| s.tier == tier)
                .cloned()
                .collect();
            (!members.is_empty()).then(|| TierGroup {
                tier,
                summaries: members,
            })
        })
        .collect()
}

/// Number of teams in every tier, highest first, zero counts included.
pub fn tier_distribution(summaries: &[TeamSummary]) -> Vec<(Tier, usize)> {
    Tier::DESCENDING
        .into_iter()
        .map(|tier| (tier, summaries.iter().filter(|s| s.tier == tier).count()))
        .collect()
}
