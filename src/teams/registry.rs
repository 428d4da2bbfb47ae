use chrono::Utc;
use tracing::{debug, info};

use super::types::{same_name, NewTeam, Team, TeamInput};
use crate::admin::AdminToken;
use crate::error::{ConflictField, Error, Result};
use crate::store::Store;

/// Owns team identity on top of a store: uniqueness, the delete guard and
/// the judge-facing team list.
pub struct TeamRegistry<'a, S: Store + ?Sized> {
    store: &'a mut S,
    locations: &'a [String],
}

impl<'a, S: Store + ?Sized> TeamRegistry<'a, S> {
    /// `locations` is the closed set of sites teams may be assigned to;
    /// an empty slice accepts any location.
    pub fn new(store: &'a mut S, locations: &'a [String]) -> Self {
        Self { store, locations }
    }

    pub fn create(&mut self, _admin: &AdminToken, input: &TeamInput) -> Result<Team> {
        let new = input.normalize(self.locations)?;
        let teams = self.store.teams()?;
        if let Some(conflict) = find_conflict(&teams, &new, None) {
            return Err(conflict);
        }

        let team = self.store.insert_team(new, Utc::now())?;
        info!(team_id = team.id, "Created team {}", team.display_name());
        Ok(team)
    }

    /// Replace a team's attributes. Uniqueness is checked against every
    /// other team, active or not.
    pub fn update(&mut self, _admin: &AdminToken, id: u64, input: &TeamInput) -> Result<Team> {
        let existing = self.resolve(id)?;
        let new = input.normalize(self.locations)?;
        let teams = self.store.teams()?;
        if let Some(conflict) = find_conflict(&teams, &new, Some(id)) {
            return Err(conflict);
        }

        let team = Team {
            id,
            number: new.number,
            name: new.name,
            location: new.location,
            active: new.active,
            created_at: existing.created_at,
        };
        self.store.update_team(&team)?;
        info!(team_id = id, "Updated team {}", team.display_name());
        Ok(team)
    }

    /// Delete a team with no evaluations. Dependent evaluations are never
    /// removed implicitly; the caller deletes them first.
    pub fn delete(&mut self, _admin: &AdminToken, id: u64) -> Result<()> {
        let team = self.resolve(id)?;
        let blocking_count = self.store.count_evaluations_for_team(id)?;
        if blocking_count > 0 {
            debug!(team_id = id, blocking_count, "Team delete blocked");
            return Err(Error::Dependency { blocking_count });
        }

        if !self.store.delete_team(id)? {
            return Err(Error::NotFound { entity: "team", id });
        }
        info!(team_id = id, "Deleted team {}", team.display_name());
        Ok(())
    }

    /// Teams judges may pick from.
    pub fn list_active(&self) -> Result<Vec<Team>> {
        Ok(self
            .store
            .teams()?
            .into_iter()
            .filter(|t| t.active)
            .collect())
    }

    /// Every team, including inactive ones kept for history.
    pub fn list_all(&self) -> Result<Vec<Team>> {
        Ok(self.store.teams()?)
    }

    pub fn resolve(&self, id: u64) -> Result<Team> {
        self.store
            .team(id)?
            .ok_or(Error::NotFound { entity: "team", id })
    }
}

fn find_conflict(teams: &[Team], new: &NewTeam, exclude: Option<u64>) -> Option<Error> {
    let others = || teams.iter().filter(move |t| Some(t.id) != exclude);

    if let Some(number) = new.number {
        if others().any(|t| t.number == Some(number)) {
            return Some(Error::Conflict {
                field: ConflictField::Number,
                value: number.to_string(),
            });
        }
    }
    if let Some(ref name) = new.name {
        if others().any(|t| t.name.as_deref().is_some_and(|n| same_name(n, name))) {
            return Some(Error::Conflict {
                field: ConflictField::Name,
                value: name.clone(),
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::unlock;
    use crate::error::ValidationError;
    use crate::store::{JsonStore, NewEvaluation};

    fn admin() -> AdminToken {
        unlock("secret", "secret").unwrap()
    }

    fn input(number: Option<i64>, name: Option<&str>) -> TeamInput {
        TeamInput {
            number,
            name: name.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_then_resolve_roundtrip() {
        let mut store = JsonStore::in_memory("likert5");
        let locations = vec!["Main Hall".to_string()];
        let mut registry = TeamRegistry::new(&mut store, &locations);
        let supplied = TeamInput {
            number: Some(12),
            name: Some("Alpha".to_string()),
            location: Some("Main Hall".to_string()),
            active: None,
        };

        let created = registry.create(&admin(), &supplied).unwrap();
        let resolved = registry.resolve(created.id).unwrap();

        assert_eq!(resolved, created);
        assert_eq!(resolved.number, Some(12));
        assert_eq!(resolved.name.as_deref(), Some("Alpha"));
        assert_eq!(resolved.location.as_deref(), Some("Main Hall"));
        assert!(resolved.active);
    }

    #[test]
    fn test_number_only_team_then_duplicate_number() {
        let mut store = JsonStore::in_memory("likert5");
        let mut registry = TeamRegistry::new(&mut store, &[]);

        let team = registry.create(&admin(), &input(Some(5), Some(""))).unwrap();
        assert_eq!(team.name, None);
        assert_eq!(team.display_name(), "Team 5");

        let err = registry.create(&admin(), &input(Some(5), Some("Other"))).unwrap_err();
        assert!(matches!(
            err,
            Error::Conflict {
                field: ConflictField::Number,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_name_is_case_insensitive() {
        let mut store = JsonStore::in_memory("likert5");
        let mut registry = TeamRegistry::new(&mut store, &[]);
        registry.create(&admin(), &input(None, Some("Alpha"))).unwrap();

        let err = registry.create(&admin(), &input(None, Some(" alpha "))).unwrap_err();
        assert_eq!(err.code(), "DuplicateName");
    }

    #[test]
    fn test_duplicate_name_folds_non_ascii() {
        let mut store = JsonStore::in_memory("likert5");
        let mut registry = TeamRegistry::new(&mut store, &[]);
        registry.create(&admin(), &input(None, Some("équipe"))).unwrap();

        let err = registry.create(&admin(), &input(None, Some("ÉQUIPE"))).unwrap_err();
        assert_eq!(err.code(), "DuplicateName");
        assert_eq!(registry.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_uniqueness_includes_inactive_teams() {
        let mut store = JsonStore::in_memory("likert5");
        let mut registry = TeamRegistry::new(&mut store, &[]);
        let retired = TeamInput {
            active: Some(false),
            ..input(Some(3), None)
        };
        registry.create(&admin(), &retired).unwrap();

        let err = registry.create(&admin(), &input(Some(3), None)).unwrap_err();
        assert_eq!(err.code(), "DuplicateNumber");
    }

    #[test]
    fn test_missing_identity_rejected() {
        let mut store = JsonStore::in_memory("likert5");
        let mut registry = TeamRegistry::new(&mut store, &[]);
        let err = registry.create(&admin(), &input(None, None)).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingIdentity)
        ));
    }

    #[test]
    fn test_update_excludes_self_from_uniqueness() {
        let mut store = JsonStore::in_memory("likert5");
        let mut registry = TeamRegistry::new(&mut store, &[]);
        let alpha = registry.create(&admin(), &input(Some(1), Some("Alpha"))).unwrap();
        registry.create(&admin(), &input(Some(2), Some("Beta"))).unwrap();

        let renamed = registry
            .update(&admin(), alpha.id, &input(Some(1), Some("ALPHA")))
            .unwrap();
        assert_eq!(renamed.name.as_deref(), Some("ALPHA"));
        assert_eq!(renamed.created_at, alpha.created_at);

        let err = registry
            .update(&admin(), alpha.id, &input(Some(2), Some("Alpha")))
            .unwrap_err();
        assert_eq!(err.code(), "DuplicateNumber");
    }

    #[test]
    fn test_update_unknown_team() {
        let mut store = JsonStore::in_memory("likert5");
        let mut registry = TeamRegistry::new(&mut store, &[]);
        let err = registry.update(&admin(), 7, &input(Some(1), None)).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "team", id: 7 }));
    }

    #[test]
    fn test_list_active_hides_inactive() {
        let mut store = JsonStore::in_memory("likert5");
        let mut registry = TeamRegistry::new(&mut store, &[]);
        registry.create(&admin(), &input(Some(1), None)).unwrap();
        let inactive = TeamInput {
            active: Some(false),
            ..input(Some(2), None)
        };
        registry.create(&admin(), &inactive).unwrap();

        assert_eq!(registry.list_active().unwrap().len(), 1);
        assert_eq!(registry.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_delete_blocked_by_evaluations() {
        let mut store = JsonStore::in_memory("likert5");
        let team = TeamRegistry::new(&mut store, &[])
            .create(&admin(), &input(Some(1), None))
            .unwrap();
        let evaluation_id = store
            .insert_evaluation(NewEvaluation {
                participant_name: "J".to_string(),
                team_id: team.id,
                comments: None,
                created_at: Utc::now(),
            })
            .unwrap();

        let err = TeamRegistry::new(&mut store, &[])
            .delete(&admin(), team.id)
            .unwrap_err();
        assert!(matches!(err, Error::Dependency { blocking_count: 1 }));

        store.delete_evaluation(evaluation_id).unwrap();
        TeamRegistry::new(&mut store, &[])
            .delete(&admin(), team.id)
            .unwrap();
        assert!(store.teams().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_unknown() {
        let mut store = JsonStore::in_memory("likert5");
        let registry = TeamRegistry::new(&mut store, &[]);
        assert_eq!(registry.resolve(99).unwrap_err().code(), "NotFound");
    }
}
