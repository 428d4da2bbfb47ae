use std::collections::HashMap;

use crate::evaluations::Evaluation;
use crate::teams::Team;

/// Narrowing applied before aggregation. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryFilter {
    pub team_id: Option<u64>,
    /// Exact location of the evaluated team
    pub location: Option<String>,
    /// Case-insensitive substring of the judge's name
    pub participant: Option<String>,
}

impl SummaryFilter {
    pub fn is_empty(&self) -> bool {
        self.team_id.is_none() && self.location.is_none() && self.participant.is_none()
    }

    fn matches(&self, evaluation: &Evaluation, locations: &HashMap<u64, Option<&str>>) -> bool {
        if self.team_id.is_some_and(|id| id != evaluation.team_id) {
            return false;
        }
        if let Some(ref wanted) = self.location {
            // Evaluations of a team missing from the registry never match a location.
            let location = locations.get(&evaluation.team_id).copied().flatten();
            if location != Some(wanted.as_str()) {
                return false;
            }
        }
        if let Some(ref needle) = self.participant {
            let needle = needle.to_lowercase();
            if !evaluation.participant_name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Evaluations matching `filter`, in their original order.
pub fn filter_evaluations<'a>(
    evaluations: &'a [Evaluation],
    teams: &[Team],
    filter: &SummaryFilter,
) -> Vec<&'a Evaluation> {
    let locations: HashMap<u64, Option<&str>> = teams
        .iter()
        .map(|t| (t.id, t.location.as_deref()))
        .collect();

    evaluations
        .iter()
        .filter(|e| filter.matches(e, &locations))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn team(id: u64, location: Option<&str>) -> Team {
        Team {
            id,
            number: Some(id as u32),
            name: None,
            location: location.map(str::to_string),
            active: true,
            created_at: Utc::now(),
        }
    }

    fn evaluation(id: u64, team_id: u64, judge: &str) -> Evaluation {
        Evaluation {
            id,
            participant_name: judge.to_string(),
            team_id,
            scores: Default::default(),
            comments: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fixture() -> (Vec<Evaluation>, Vec<Team>) {
        let teams = vec![team(1, Some("North")), team(2, Some("South")), team(3, None)];
        let evaluations = vec![
            evaluation(1, 1, "Dana Scully"),
            evaluation(2, 2, "Fox Mulder"),
            evaluation(3, 1, "Walter Skinner"),
            evaluation(4, 3, "dana k"),
        ];
        (evaluations, teams)
    }

    fn ids(found: Vec<&Evaluation>) -> Vec<u64> {
        found.iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let (evaluations, teams) = fixture();
        let filter = SummaryFilter::default();
        assert!(filter.is_empty());
        assert_eq!(ids(filter_evaluations(&evaluations, &teams, &filter)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_filter_by_team() {
        let (evaluations, teams) = fixture();
        let filter = SummaryFilter {
            team_id: Some(1),
            ..Default::default()
        };
        assert_eq!(ids(filter_evaluations(&evaluations, &teams, &filter)), vec![1, 3]);
    }

    #[test]
    fn test_filter_unknown_team_is_empty() {
        let (evaluations, teams) = fixture();
        let filter = SummaryFilter {
            team_id: Some(42),
            ..Default::default()
        };
        assert!(filter_evaluations(&evaluations, &teams, &filter).is_empty());
    }

    #[test]
    fn test_filter_by_location_is_exact() {
        let (evaluations, teams) = fixture();
        let filter = SummaryFilter {
            location: Some("South".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(filter_evaluations(&evaluations, &teams, &filter)), vec![2]);

        let filter = SummaryFilter {
            location: Some("sou".to_string()),
            ..Default::default()
        };
        assert!(filter_evaluations(&evaluations, &teams, &filter).is_empty());
    }

    #[test]
    fn test_filter_by_participant_substring() {
        let (evaluations, teams) = fixture();
        let filter = SummaryFilter {
            participant: Some("DANA".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(filter_evaluations(&evaluations, &teams, &filter)), vec![1, 4]);
    }

    #[test]
    fn test_filters_combine() {
        let (evaluations, teams) = fixture();
        let filter = SummaryFilter {
            location: Some("North".to_string()),
            participant: Some("skinner".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(filter_evaluations(&evaluations, &teams, &filter)), vec![3]);
    }
}
