pub mod import;
pub mod registry;
pub mod types;

pub use import::{import_teams, read_team_rows, ImportReport, ParsedRow, RowError};
pub use registry::TeamRegistry;
pub use types::{display_name, same_name, NewTeam, Team, TeamInput};
