//! Problem generation with bounded rejection sampling.
//!
//! Operand draws and distractor picks both retry a fixed number of times and
//! then fall back to a deterministic construction, so a pathological
//! configuration degrades to a duller problem instead of a stalled generator.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::{ConfigError, DifficultyConfig, ProblemKind};
use crate::rng::RngBundle;

/// Candidate answers presented for one problem.
pub type OptionSet = SmallVec<[i32; 4]>;

/// Options shown per problem: the correct answer plus two distractors.
pub const OPTION_COUNT: usize = 3;
/// Largest value any option may take, regardless of difficulty.
pub const OPTION_CEILING: i32 = 20;
/// Largest single operand, independent of the difficulty bound.
const MAX_OPERAND: i32 = 10;
/// Redraw budget for operand pairs whose sum overshoots the bound.
const MAX_REDRAWS: u32 = 32;
/// Roll budget for random distractor picks before the deterministic walk.
const MAX_DISTRACTOR_ROLLS: u32 = 24;

/// Operands for one question; the answer derives from these alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProblemBody {
    Addition { left: i32, right: i32 },
    Subtraction { minuend: i32, subtrahend: i32 },
    Counting { count: i32 },
}

impl ProblemBody {
    /// The one correct answer for this body.
    #[must_use]
    pub const fn answer(self) -> i32 {
        match self {
            Self::Addition { left, right } => left + right,
            Self::Subtraction {
                minuend,
                subtrahend,
            } => minuend - subtrahend,
            Self::Counting { count } => count,
        }
    }

    #[must_use]
    pub const fn kind(self) -> ProblemKind {
        match self {
            Self::Addition { .. } => ProblemKind::Addition,
            Self::Subtraction { .. } => ProblemKind::Subtraction,
            Self::Counting { .. } => ProblemKind::Counting,
        }
    }
}

/// One question instance: operands, derived answer, shuffled option set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub body: ProblemBody,
    pub answer: i32,
    pub options: OptionSet,
}

impl Problem {
    fn new(body: ProblemBody, options: OptionSet) -> Self {
        Self {
            body,
            answer: body.answer(),
            options,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ProblemKind {
        self.body.kind()
    }
}

/// Generate a full problem set for one session.
///
/// # Errors
///
/// Returns [`ConfigError`] when the configuration fails validation; after
/// that, generation itself cannot fail.
pub fn generate_problems(
    cfg: &DifficultyConfig,
    kind: ProblemKind,
    rng: &RngBundle,
) -> Result<Vec<Problem>, ConfigError> {
    cfg.validate()?;
    let problems = (0..cfg.questions)
        .map(|_| match kind {
            ProblemKind::Addition => addition_problem(cfg, rng),
            ProblemKind::Subtraction => subtraction_problem(cfg, rng),
            ProblemKind::Counting => counting_problem(cfg, rng),
        })
        .collect();
    Ok(problems)
}

fn addition_problem(cfg: &DifficultyConfig, rng: &RngBundle) -> Problem {
    let body = {
        let mut operand = rng.operand();
        addition_operands(cfg.max_number, &mut *operand)
    };
    let distractors = {
        let mut distractor = rng.distractor();
        pick_distractors(body.answer(), 4, 1, &mut *distractor)
    };
    let mut options = assemble_options(body.answer(), &distractors);
    options.shuffle(&mut *rng.shuffle());
    Problem::new(body, options)
}

fn subtraction_problem(cfg: &DifficultyConfig, rng: &RngBundle) -> Problem {
    let body = {
        let mut operand = rng.operand();
        subtraction_operands(cfg.max_number, &mut *operand)
    };
    let distractors = {
        let mut distractor = rng.distractor();
        pick_distractors(body.answer(), 3, 0, &mut *distractor)
    };
    let mut options = assemble_options(body.answer(), &distractors);
    options.shuffle(&mut *rng.shuffle());
    Problem::new(body, options)
}

fn counting_problem(cfg: &DifficultyConfig, rng: &RngBundle) -> Problem {
    let mut stream = rng.operand();
    let count = stream.gen_range(1..=cfg.max_number.min(MAX_OPERAND));
    let options = counting_window(count, &mut *stream);
    Problem::new(ProblemBody::Counting { count }, options)
}

/// Draw an addition pair with both operands positive and the sum within the
/// bound. Above 10 the draw is biased toward larger operands, which is what
/// makes the overshoot-and-redraw path reachable.
fn addition_operands(max_number: i32, rng: &mut impl Rng) -> ProblemBody {
    let max_left = MAX_OPERAND.min(max_number - 1);
    for _ in 0..MAX_REDRAWS {
        let mut left = rng.gen_range(1..=max_left);
        if max_number > MAX_OPERAND && rng.gen_bool(0.5) {
            left = rng.gen_range(6..=MAX_OPERAND);
        }
        let max_right = MAX_OPERAND.min(max_number - left);
        let mut right = rng.gen_range(1..=max_right.max(1));
        if max_number > MAX_OPERAND && left + right <= MAX_OPERAND && rng.gen_bool(0.5) {
            right = rng.gen_range(5..=MAX_OPERAND);
        }
        if left + right <= max_number {
            return ProblemBody::Addition { left, right };
        }
    }
    // Redraw budget exhausted: construct a valid pair directly.
    let left = (max_number / 2).clamp(1, max_left);
    let right = (max_number - left).clamp(1, MAX_OPERAND);
    ProblemBody::Addition { left, right }
}

/// Subtraction pairs are valid by construction: the subtrahend is always
/// strictly below the minuend, so answers stay positive.
fn subtraction_operands(max_number: i32, rng: &mut impl Rng) -> ProblemBody {
    let minuend = rng.gen_range(2..=max_number);
    let subtrahend = rng.gen_range(1..=(minuend - 1).min(MAX_OPERAND));
    ProblemBody::Subtraction {
        minuend,
        subtrahend,
    }
}

/// Pick two distractors near the answer. Random rolls are capped; if they
/// stall (tight clamps make collisions common near the floor), a
/// deterministic outward walk fills the remainder.
fn pick_distractors(answer: i32, spread: i32, floor: i32, rng: &mut impl Rng) -> SmallVec<[i32; 2]> {
    let mut picks: SmallVec<[i32; 2]> = SmallVec::new();
    let mut rolls = 0;
    while picks.len() < OPTION_COUNT - 1 && rolls < MAX_DISTRACTOR_ROLLS {
        rolls += 1;
        let variation = rng.gen_range(1..=spread);
        let candidate = if rng.gen_bool(0.5) {
            answer + variation
        } else {
            answer - variation
        };
        let candidate = candidate.clamp(floor, OPTION_CEILING);
        if candidate != answer && !picks.contains(&candidate) {
            picks.push(candidate);
        }
    }
    if picks.len() < OPTION_COUNT - 1 {
        for delta in 1..=OPTION_CEILING {
            for candidate in [answer - delta, answer + delta] {
                if (floor..=OPTION_CEILING).contains(&candidate)
                    && candidate != answer
                    && !picks.contains(&candidate)
                {
                    picks.push(candidate);
                    if picks.len() == OPTION_COUNT - 1 {
                        return picks;
                    }
                }
            }
        }
    }
    picks
}

fn assemble_options(answer: i32, distractors: &[i32]) -> OptionSet {
    let mut options: OptionSet = SmallVec::new();
    options.push(answer);
    options.extend_from_slice(distractors);
    options
}

/// Options shown per authored addition problem.
pub const AUTHORED_OPTION_COUNT: usize = 4;
/// Distractors for authored problems stay within this distance of the answer.
const AUTHORED_SPREAD: i32 = 2;

/// One authored bug-addition level: a fixed sequence of operand pairs played
/// in order rather than drawn from a difficulty config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredLevel {
    pub level: u32,
    pub pairs: Vec<(i32, i32)>,
}

impl AuthoredLevel {
    /// The four stock levels, sums climbing from 2 to 10.
    #[must_use]
    pub fn builtin() -> Vec<Self> {
        vec![
            Self {
                level: 1,
                pairs: vec![(1, 1), (2, 1), (1, 2), (3, 1), (2, 2)],
            },
            Self {
                level: 2,
                pairs: vec![(3, 2), (2, 4), (4, 1), (3, 3), (5, 1)],
            },
            Self {
                level: 3,
                pairs: vec![(4, 3), (5, 2), (3, 5), (6, 2), (4, 4)],
            },
            Self {
                level: 4,
                pairs: vec![(5, 4), (6, 3), (7, 2), (5, 5), (8, 2)],
            },
        ]
    }

    /// Look up a stock level by its number.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAuthoredLevel`] for levels without a
    /// problem set.
    pub fn stock(level: u32) -> Result<Self, ConfigError> {
        Self::builtin()
            .into_iter()
            .find(|l| l.level == level)
            .ok_or(ConfigError::UnknownAuthoredLevel(level))
    }

    /// Reject levels a session could not be played from.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the level is empty or an operand is not
    /// positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pairs.is_empty() {
            return Err(ConfigError::NoQuestions);
        }
        for &(left, right) in &self.pairs {
            let value = left.min(right);
            if value < 1 {
                return Err(ConfigError::OperandOutOfRange {
                    level: self.level,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Materialize the level into playable problems. Operands are fixed;
    /// only the option sets draw randomness.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the level fails validation.
    pub fn problems(&self, rng: &RngBundle) -> Result<Vec<Problem>, ConfigError> {
        self.validate()?;
        let mut distractor = rng.distractor();
        Ok(self
            .pairs
            .iter()
            .map(|&(left, right)| {
                let body = ProblemBody::Addition { left, right };
                let options = authored_options(body.answer(), &mut *distractor);
                Problem::new(body, options)
            })
            .collect())
    }
}

/// Authored options are every positive value within the spread of the
/// answer, trimmed at random to three distractors and presented sorted
/// ascending with the answer mixed in.
fn authored_options(answer: i32, rng: &mut impl Rng) -> OptionSet {
    let mut candidates: OptionSet = (-AUTHORED_SPREAD..=AUTHORED_SPREAD)
        .filter(|&delta| delta != 0)
        .map(|delta| answer + delta)
        .filter(|&value| value > 0)
        .collect();
    candidates.shuffle(rng);
    candidates.truncate(AUTHORED_OPTION_COUNT - 1);
    let mut options = candidates;
    options.push(answer);
    options.sort_unstable();
    options
}

/// Counting questions present a small ascending window of consecutive counts
/// containing the true one, mirroring the authored data of the predecessor.
fn counting_window(count: i32, rng: &mut impl Rng) -> OptionSet {
    let width = i32::try_from(OPTION_COUNT).unwrap_or(3);
    let offset = rng.gen_range(0..width);
    let start = (count - offset).max(1);
    (start..start + width).collect()
}
