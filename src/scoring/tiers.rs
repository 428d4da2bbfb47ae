use serde::Serialize;
use std::fmt;

use super::config::TierConfig;

/// Cumulative maximum the stock thresholds are defined against (5 fields x 0-4).
pub const REFERENCE_MAX: f64 = 20.0;

const REFERENCE_ACE: f64 = 16.0;
const REFERENCE_CRAFTER: f64 = 11.0;
const REFERENCE_NOVICE: f64 = 6.0;

/// Proficiency tiers, lowest first so that the derived ordering follows rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Tier {
    BootingBot,
    NeuralNovice,
    CognitiveCrafter,
    AgenticAce,
}

impl Tier {
    /// Highest tier first.
    pub const DESCENDING: [Tier; 4] = [
        Tier::AgenticAce,
        Tier::CognitiveCrafter,
        Tier::NeuralNovice,
        Tier::BootingBot,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tier::AgenticAce => "Agentic Ace",
            Tier::CognitiveCrafter => "Cognitive Crafter",
            Tier::NeuralNovice => "Neural Novice",
            Tier::BootingBot => "Booting Bot",
        }
    }

    /// 0 for the lowest tier, 3 for the highest.
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lower bounds (inclusive) of each tier above Booting Bot, on the model's
/// cumulative scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierThresholds {
    pub cumulative_max: f64,
    pub agentic_ace: f64,
    pub cognitive_crafter: f64,
    pub neural_novice: f64,
}

impl TierThresholds {
    /// Stock thresholds rescaled proportionally to `cumulative_max`.
    pub fn scaled_to(cumulative_max: f64) -> Self {
        let scale = |reference: f64| reference * cumulative_max / REFERENCE_MAX;
        Self {
            cumulative_max,
            agentic_ace: scale(REFERENCE_ACE),
            cognitive_crafter: scale(REFERENCE_CRAFTER),
            neural_novice: scale(REFERENCE_NOVICE),
        }
    }

    /// Thresholds given explicitly in configuration.
    pub fn explicit(config: TierConfig, cumulative_max: f64) -> Self {
        Self {
            cumulative_max,
            agentic_ace: config.agentic_ace,
            cognitive_crafter: config.cognitive_crafter,
            neural_novice: config.neural_novice,
        }
    }

    /// Classify a total-score average. Total over every real number: anything
    /// below the lowest threshold, NaN included, is Booting Bot.
    pub fn classify(&self, total_score_average: f64) -> Tier {
        if total_score_average >= self.agentic_ace {
            Tier::AgenticAce
        } else if total_score_average >= self.cognitive_crafter {
            Tier::CognitiveCrafter
        } else if total_score_average >= self.neural_novice {
            Tier::NeuralNovice
        } else {
            Tier::BootingBot
        }
    }

    /// Inclusive lower bound of `tier`, None for the lowest tier.
    pub fn lower_bound(&self, tier: Tier) -> Option<f64> {
        match tier {
            Tier::AgenticAce => Some(self.agentic_ace),
            Tier::CognitiveCrafter => Some(self.cognitive_crafter),
            Tier::NeuralNovice => Some(self.neural_novice),
            Tier::BootingBot => None,
        }
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self::scaled_to(REFERENCE_MAX)
    }
}

/// Classify against the stock 0-20 thresholds.
pub fn classify(total_score_average: f64) -> Tier {
    TierThresholds::default().classify(total_score_average)
}
