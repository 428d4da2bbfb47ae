use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::config::{ScoreField, ScoringConfig};
use super::tiers::TierThresholds;
use super::validation::validate_scoring;

pub const LIKERT5: &str = "likert5";
pub const AI_TOOLS: &str = "ai_tools";

/// Scores of one evaluation, keyed by field name.
pub type ScoreSet = BTreeMap<String, i64>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreModelError {
    UnknownField(String),
    OutOfRange { field: String, value: i64 },
    UnknownLabel { field: String, label: String },
}

impl fmt::Display for ScoreModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreModelError::UnknownField(field) => write!(f, "Unknown score field '{}'", field),
            ScoreModelError::OutOfRange { field, value } => {
                write!(f, "Value {} is out of range for '{}'", value, field)
            }
            ScoreModelError::UnknownLabel { field, label } => {
                write!(f, "'{}' is not a label of '{}'", label, field)
            }
        }
    }
}

impl std::error::Error for ScoreModelError {}

/// The evaluation schema in effect: which sub-scores exist, their closed
/// ranges, their labels and how they add up to a total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreModel {
    name: String,
    fields: Vec<ScoreField>,
    tiers: TierThresholds,
}

impl ScoreModel {
    /// Five Likert questions scored 0-4, cumulative maximum 20.
    pub fn likert5() -> Self {
        const AGREEMENT: [&str; 5] = [
            "Strongly disagree",
            "Disagree",
            "Neutral",
            "Agree",
            "Strongly agree",
        ];
        let fields = [
            ("problem_framing", "The team framed a real problem clearly"),
            ("ai_integration", "AI is integral to the solution, not bolted on"),
            ("prompt_craft", "Prompts and workflows show deliberate iteration"),
            ("demo_quality", "The demo worked and showed the core idea"),
            ("communication", "The presentation was clear and well paced"),
        ]
        .into_iter()
        .map(|(name, question)| ScoreField::scale(name, question, 0, 4).with_labels(&AGREEMENT))
        .collect();
        Self::assemble(LIKERT5.to_string(), fields)
    }

    /// Eleven AI-tool usage ratings (0-3, summed to a cumulative maximum of
    /// 33), two categorical criteria reported alongside, and one yes/no.
    pub fn ai_tools() -> Self {
        const USAGE: [&str; 4] = ["Not used", "Tried", "Applied", "Mastered"];
        const DEMONSTRATION: [&str; 4] = [
            "Did not demonstrate",
            "Basic",
            "Thoughtful",
            "Extraordinary",
        ];
        let mut fields: Vec<ScoreField> = [
            ("text_generation", "Text generation and drafting"),
            ("code_assistance", "Coding assistants"),
            ("image_generation", "Image generation"),
            ("audio_video", "Audio and video tools"),
            ("research", "Research and search assistants"),
            ("data_analysis", "Data analysis"),
            ("presentation_design", "Slide and presentation builders"),
            ("automation", "Workflow automation"),
            ("agents", "Autonomous agents"),
            ("prompt_engineering", "Prompt engineering"),
            ("other_tools", "Other AI tools"),
        ]
        .into_iter()
        .map(|(name, question)| ScoreField::scale(name, question, 0, 3).with_labels(&USAGE))
        .collect();
        fields.push(
            ScoreField::categorical(
                "creativity",
                "Creative use of AI in the solution",
                0,
                &DEMONSTRATION,
            )
            .excluded_from_total(),
        );
        fields.push(
            ScoreField::categorical(
                "problem_solving",
                "AI applied to solve the stated problem",
                0,
                &DEMONSTRATION,
            )
            .excluded_from_total(),
        );
        fields.push(ScoreField::boolean(
            "live_demo",
            "Did the team demonstrate an AI tool live?",
        ));
        Self::assemble(AI_TOOLS.to_string(), fields)
    }

    /// Build the model selected by configuration. Returns every problem found
    /// in the configuration at once.
    pub fn from_config(config: &ScoringConfig) -> Result<Self, Vec<String>> {
        validate_scoring(config)?;

        let model = match (&config.fields, config.preset.as_deref()) {
            (Some(fields), _) => Self::assemble(
                config.name.clone().unwrap_or_else(|| "custom".to_string()),
                fields.clone(),
            ),
            (None, None) | (None, Some(LIKERT5)) => Self::likert5(),
            (None, Some(AI_TOOLS)) => Self::ai_tools(),
            (None, Some(other)) => {
                return Err(vec![format!("scoring.preset: unknown preset '{}'", other)])
            }
        };

        Ok(match config.tiers {
            Some(tiers) => {
                let cumulative_max = model.total_max() as f64;
                Self {
                    tiers: TierThresholds::explicit(tiers, cumulative_max),
                    ..model
                }
            }
            None => model,
        })
    }

    fn assemble(name: String, fields: Vec<ScoreField>) -> Self {
        let total_max = fields
            .iter()
            .filter(|f| f.counts_toward_total())
            .map(|f| f.max)
            .sum::<i64>();
        Self {
            name,
            fields,
            tiers: TierThresholds::scaled_to(total_max as f64),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[ScoreField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Result<&ScoreField, ScoreModelError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ScoreModelError::UnknownField(name.to_string()))
    }

    /// Fields reported as averages (everything except booleans).
    pub fn averaged_fields(&self) -> impl Iterator<Item = &ScoreField> {
        self.fields.iter().filter(|f| !f.is_boolean())
    }

    pub fn boolean_fields(&self) -> impl Iterator<Item = &ScoreField> {
        self.fields.iter().filter(|f| f.is_boolean())
    }

    pub fn tiers(&self) -> &TierThresholds {
        &self.tiers
    }

    pub fn range_for(&self, field: &str) -> Result<(i64, i64), ScoreModelError> {
        self.field(field).map(|f| (f.min, f.max))
    }

    /// Label of `value` for `field`. Fields without labels render the number.
    pub fn label_for(&self, field: &str, value: i64) -> Result<String, ScoreModelError> {
        let def = self.field(field)?;
        if value < def.min || value > def.max {
            return Err(ScoreModelError::OutOfRange {
                field: field.to_string(),
                value,
            });
        }
        let label = def
            .labels
            .get((value - def.min) as usize)
            .cloned()
            .unwrap_or_else(|| value.to_string());
        Ok(label)
    }

    /// Numeric value of a label, matched case-insensitively. Plain integers
    /// are accepted for every field.
    pub fn value_for_label(&self, field: &str, label: &str) -> Result<i64, ScoreModelError> {
        let def = self.field(field)?;
        let label = label.trim();
        if let Ok(value) = label.parse::<i64>() {
            return Ok(value);
        }
        if def.is_boolean() {
            match label.to_ascii_lowercase().as_str() {
                "yes" | "true" | "y" => return Ok(1),
                "no" | "false" | "n" => return Ok(0),
                _ => {}
            }
        }
        def.labels
            .iter()
            .position(|l| l.eq_ignore_ascii_case(label))
            .map(|i| def.min + i as i64)
            .ok_or_else(|| ScoreModelError::UnknownLabel {
                field: field.to_string(),
                label: label.to_string(),
            })
    }

    /// Sum of the fields that count toward the total. All of them share one
    /// scale; mixed scales are rejected when the model is built.
    pub fn total_score(&self, scores: &ScoreSet) -> i64 {
        self.fields
            .iter()
            .filter(|f| f.counts_toward_total())
            .filter_map(|f| scores.get(&f.name))
            .sum()
    }

    /// Largest possible total score.
    pub fn total_max(&self) -> i64 {
        self.fields
            .iter()
            .filter(|f| f.counts_toward_total())
            .map(|f| f.max)
            .sum()
    }
}

impl Default for ScoreModel {
    fn default() -> Self {
        Self::likert5()
    }
}
