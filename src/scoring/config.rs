use serde::{Deserialize, Serialize};

/// Score model selection.
///
/// Either names a built-in preset or declares every field explicitly. When
/// `fields` is present it wins and `preset` is ignored.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   preset: likert5
/// ```
///
/// Or a custom model:
/// ```yaml
/// scoring:
///   name: pitch-night
///   fields:
///     - { name: story, question: "Was the pitch compelling?", max: 4 }
///     - { name: demo, question: "Did the demo work?", max: 4 }
///     - { name: live, question: "Was it shown live?", kind: boolean, max: 1 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Built-in preset name: "likert5" (default) or "ai_tools"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    /// Name recorded in the data file for a custom model (default: "custom")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Custom field list, in display order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<ScoreField>>,

    /// Explicit tier thresholds. Derived from the cumulative maximum when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiers: Option<TierConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Plain integer scale, labels optional
    #[default]
    Scale,
    /// Named levels; `labels[i]` names value `min + i`
    Categorical,
    /// Yes/no stored as 0/1, reported as a percentage
    Boolean,
}

/// One sub-score of an evaluation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoreField {
    pub name: String,

    /// Question shown to judges
    #[serde(default)]
    pub question: String,

    #[serde(default)]
    pub kind: FieldKind,

    #[serde(default)]
    pub min: i64,

    pub max: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    /// Whether the field is summed into the total score.
    /// Defaults to true for scale/categorical fields and false for booleans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_total: Option<bool>,
}

impl ScoreField {
    pub fn scale(name: &str, question: &str, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            question: question.to_string(),
            kind: FieldKind::Scale,
            min,
            max,
            labels: Vec::new(),
            in_total: None,
        }
    }

    pub fn categorical(name: &str, question: &str, min: i64, labels: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            question: question.to_string(),
            kind: FieldKind::Categorical,
            min,
            max: min + labels.len() as i64 - 1,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            in_total: None,
        }
    }

    pub fn boolean(name: &str, question: &str) -> Self {
        Self {
            name: name.to_string(),
            question: question.to_string(),
            kind: FieldKind::Boolean,
            min: 0,
            max: 1,
            labels: vec!["No".to_string(), "Yes".to_string()],
            in_total: None,
        }
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn excluded_from_total(mut self) -> Self {
        self.in_total = Some(false);
        self
    }

    pub fn counts_toward_total(&self) -> bool {
        self.in_total.unwrap_or(self.kind != FieldKind::Boolean)
    }

    pub fn is_boolean(&self) -> bool {
        self.kind == FieldKind::Boolean
    }
}

/// Minimum total-score average for each tier above the lowest.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    pub agentic_ace: f64,
    pub cognitive_crafter: f64,
    pub neural_novice: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scoring_config_parse() {
        let config: ScoringConfig = serde_saphyr::from_str("{}").unwrap();
        assert!(config.preset.is_none());
        assert!(config.fields.is_none());
        assert!(config.tiers.is_none());
    }

    #[test]
    fn test_preset_scoring_config_parse() {
        let config: ScoringConfig = serde_saphyr::from_str("preset: ai_tools\n").unwrap();
        assert_eq!(config.preset.as_deref(), Some("ai_tools"));
    }

    #[test]
    fn test_custom_fields_parse_with_defaults() {
        let yaml = r#"
name: pitch-night
fields:
  - name: story
    question: "Was the pitch compelling?"
    max: 4
  - name: depth
    kind: categorical
    max: 2
    labels: ["Low", "Mid", "High"]
  - name: live
    kind: boolean
    max: 1
"#;
        let config: ScoringConfig = serde_saphyr::from_str(yaml).unwrap();
        let fields = config.fields.unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].kind, FieldKind::Scale);
        assert_eq!(fields[0].min, 0);
        assert!(fields[0].counts_toward_total());
        assert_eq!(fields[1].labels.len(), 3);
        assert!(fields[2].is_boolean());
        assert!(!fields[2].counts_toward_total());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<ScoringConfig, _> = serde_saphyr::from_str("prest: likert5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_tiers_parse() {
        let yaml = r#"
tiers:
  agentic_ace: 26
  cognitive_crafter: 18
  neural_novice: 10
"#;
        let config: ScoringConfig = serde_saphyr::from_str(yaml).unwrap();
        let tiers = config.tiers.unwrap();
        assert_eq!(tiers.agentic_ace, 26.0);
        assert_eq!(tiers.neural_novice, 10.0);
    }

    #[test]
    fn test_categorical_builder_derives_max() {
        let field = ScoreField::categorical("x", "", 0, &["a", "b", "c", "d"]);
        assert_eq!(field.max, 3);
    }
}
