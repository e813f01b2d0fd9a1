//! Difficulty tiers, game variants, and level configuration.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::StarRule;

/// Ordered difficulty ladder shared by every problem-based mini-game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Tiers in unlock order, easiest first.
    pub const LADDER: [Self; 3] = [Self::Easy, Self::Intermediate, Self::Advanced];

    /// The tier that follows this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Easy => Some(Self::Intermediate),
            Self::Intermediate => Some(Self::Advanced),
            Self::Advanced => None,
        }
    }

    /// Position within the ladder, easiest = 0.
    #[must_use]
    pub const fn rank(self) -> usize {
        match self {
            Self::Easy => 0,
            Self::Intermediate => 1,
            Self::Advanced => 2,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// Shape of a generated question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    Addition,
    Subtraction,
    Counting,
}

/// Mini-game variants sharing this engine.
///
/// Each variant keeps the reward and rating behavior observed in its
/// stand-alone predecessor; the generation and progression machinery is
/// common.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Counting,
    FingerSum,
    FingerSubtraction,
    BugAddition,
    ClassifyAndCount,
}

impl GameKind {
    /// The question shape this variant generates, if its problems come from
    /// a difficulty config. Bug addition replays authored sets
    /// ([`crate::problem::AuthoredLevel`]) and classify-and-count runs
    /// through [`crate::classify`], so neither generates.
    #[must_use]
    pub const fn problem_kind(self) -> Option<ProblemKind> {
        match self {
            Self::Counting => Some(ProblemKind::Counting),
            Self::FingerSum => Some(ProblemKind::Addition),
            Self::FingerSubtraction => Some(ProblemKind::Subtraction),
            Self::BugAddition | Self::ClassifyAndCount => None,
        }
    }

    /// Points awarded per correct answer.
    #[must_use]
    pub const fn reward(self) -> i64 {
        match self {
            Self::Counting => 100,
            Self::FingerSum | Self::FingerSubtraction => 1,
            Self::BugAddition => 10,
            // Placement reward; the count quiz pays out separately.
            Self::ClassifyAndCount => crate::classify::PLACEMENT_REWARD,
        }
    }

    /// How a finished session converts into a star rating.
    #[must_use]
    pub const fn star_rule(self) -> StarRule {
        match self {
            Self::Counting => StarRule::Accuracy { strict: false },
            Self::FingerSum | Self::FingerSubtraction => StarRule::Accuracy { strict: true },
            Self::BugAddition => StarRule::Mistakes,
            Self::ClassifyAndCount => StarRule::Efficiency,
        }
    }
}

impl std::fmt::Display for GameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Counting => write!(f, "counting"),
            Self::FingerSum => write!(f, "finger_sum"),
            Self::FingerSubtraction => write!(f, "finger_subtraction"),
            Self::BugAddition => write!(f, "bug_addition"),
            Self::ClassifyAndCount => write!(f, "classify_and_count"),
        }
    }
}

/// Static per-tier level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    pub name: String,
    /// Number of questions in one session.
    pub questions: u32,
    /// Largest operand/result value a problem may use.
    pub max_number: i32,
}

impl DifficultyConfig {
    /// Smallest bound that still admits a two-operand problem (1 + 1).
    pub const MIN_BOUND: i32 = 2;

    /// The stock ladder: 5 questions to 10, 7 to 15, 10 to 20.
    #[must_use]
    pub fn for_tier(tier: Difficulty) -> Self {
        match tier {
            Difficulty::Easy => Self {
                name: "Easy".to_string(),
                questions: 5,
                max_number: 10,
            },
            Difficulty::Intermediate => Self {
                name: "Intermediate".to_string(),
                questions: 7,
                max_number: 15,
            },
            Difficulty::Advanced => Self {
                name: "Advanced".to_string(),
                questions: 10,
                max_number: 20,
            },
        }
    }

    /// Reject configurations that could only fail later inside the generator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the question count is zero or the numeric
    /// bound cannot admit two positive operands.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.questions == 0 {
            return Err(ConfigError::NoQuestions);
        }
        if self.max_number < Self::MIN_BOUND {
            return Err(ConfigError::BoundTooSmall {
                value: self.max_number,
                min: Self::MIN_BOUND,
            });
        }
        Ok(())
    }
}

/// Errors raised when level or template configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("level must have at least one question")]
    NoQuestions,
    #[error("max number {value} too small for a two-operand problem (minimum {min})")]
    BoundTooSmall { value: i32, min: i32 },
    #[error("game kind {0} does not generate problems from a difficulty config")]
    NotProblemBased(GameKind),
    #[error("classify category {category} has {size} objects (minimum {min})")]
    CategoryTooSmall {
        category: String,
        size: usize,
        min: usize,
    },
    #[error("classify object {object} references unknown category {category}")]
    UnknownCategory { object: String, category: String },
    #[error("no classify template for level {0}")]
    UnknownClassifyLevel(u32),
    #[error("no authored problem set for level {0}")]
    UnknownAuthoredLevel(u32),
    #[error("authored level {level} has non-positive operand {value}")]
    OperandOutOfRange { level: u32, value: i32 },
}
