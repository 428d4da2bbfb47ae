use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scoring::ScoringConfig;

/// Contents of `config.yaml`. Every key is optional.
///
/// ```yaml
/// data_path: /srv/demo-day/tally.json
/// locations: [Main Hall, Lab 2]
/// scoring:
///   preset: ai_tools
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Data file location (default: ~/.config/judge-tally/tally.json)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,

    /// Sites teams can be assigned to. Empty means any location is accepted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,

    #[serde(default)]
    pub scoring: ScoringConfig,
}
