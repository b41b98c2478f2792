//! English proficiency levels and the tutoring prompt built from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Proficiency level the tutor adapts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Business,
}

impl ProficiencyLevel {
    /// All levels, in menu order.
    pub fn all() -> [ProficiencyLevel; 4] {
        [
            ProficiencyLevel::Beginner,
            ProficiencyLevel::Intermediate,
            ProficiencyLevel::Advanced,
            ProficiencyLevel::Business,
        ]
    }

    /// Display name, also the value sent in the system instruction.
    pub fn label(&self) -> &'static str {
        match self {
            ProficiencyLevel::Beginner => "Beginner",
            ProficiencyLevel::Intermediate => "Intermediate",
            ProficiencyLevel::Advanced => "Advanced",
            ProficiencyLevel::Business => "Business",
        }
    }

    /// One-line description for the level menu.
    pub fn description(&self) -> &'static str {
        match self {
            ProficiencyLevel::Beginner => {
                "Slow pace, simple vocabulary, basic grammar corrections."
            }
            ProficiencyLevel::Intermediate => {
                "Natural pace, wider topics, focus on fluency and idioms."
            }
            ProficiencyLevel::Advanced => "Fast pace, complex discussions, nuanced feedback.",
            ProficiencyLevel::Business => {
                "Professional context, formal tone, negotiation & presentation skills."
            }
        }
    }

    /// Build the tutoring system instruction for this level.
    pub fn system_instruction(&self) -> String {
        format!(
            "You are a helpful and friendly English language tutor. \
             The user's proficiency level is {}. \
             Engage in a natural, spoken conversation. \
             If the user makes a significant mistake, gently correct them, but prioritize flow. \
             Be encouraging. Keep your responses relatively concise suitable for voice conversation.",
            self.label()
        )
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProficiencyLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(ProficiencyLevel::Beginner),
            "intermediate" => Ok(ProficiencyLevel::Intermediate),
            "advanced" => Ok(ProficiencyLevel::Advanced),
            "business" => Ok(ProficiencyLevel::Business),
            other => Err(format!(
                "unknown level '{}' (expected beginner, intermediate, advanced, or business)",
                other
            )),
        }
    }
}
