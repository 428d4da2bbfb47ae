use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Team {
    /// Name shown everywhere a team is listed: the name when set, else
    /// "Team {number}", else "Team #{id}".
    pub fn display_name(&self) -> String {
        display_name(self.id, self.number, self.name.as_deref())
    }
}

pub fn display_name(id: u64, number: Option<u32>, name: Option<&str>) -> String {
    match (name.map(str::trim).filter(|n| !n.is_empty()), number) {
        (Some(name), _) => name.to_string(),
        (None, Some(number)) => format!("Team {}", number),
        (None, None) => format!("Team #{}", id),
    }
}

/// Case-insensitive comparison used for team names and locations.
pub fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Team attributes as supplied by an admin or an import row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TeamInput {
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Defaults to active when absent
    #[serde(default)]
    pub active: Option<bool>,
}

impl From<&Team> for TeamInput {
    fn from(team: &Team) -> Self {
        Self {
            number: team.number.map(i64::from),
            name: team.name.clone(),
            location: team.location.clone(),
            active: Some(team.active),
        }
    }
}

/// Team attributes after trimming and checking, ready to store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTeam {
    pub number: Option<u32>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub active: bool,
}

impl TeamInput {
    /// Trim, drop empty strings and check the identity invariant.
    /// `locations` is the closed set of sites; empty means any location.
    pub fn normalize(&self, locations: &[String]) -> Result<NewTeam, ValidationError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let number = match self.number {
            None => None,
            Some(n) if n >= 1 && n <= u32::MAX as i64 => Some(n as u32),
            Some(_) => return Err(ValidationError::InvalidNumber),
        };

        if name.is_none() && number.is_none() {
            return Err(ValidationError::MissingIdentity);
        }

        let location = match self.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            None => None,
            Some(loc) if locations.is_empty() => Some(loc.to_string()),
            Some(loc) => Some(
                locations
                    .iter()
                    .find(|known| same_name(known, loc))
                    .cloned()
                    .ok_or_else(|| ValidationError::UnknownLocation(loc.to_string()))?,
            ),
        };

        Ok(NewTeam {
            number,
            name,
            location,
            active: self.active.unwrap_or(true),
        })
    }
}
