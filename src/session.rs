//! Attempt sessions: submission, reveal, and the cancellable auto-advance.
use serde::{Deserialize, Serialize};

use crate::config::GameKind;
use crate::problem::Problem;
use crate::scoring::Stars;

/// Where a session is in its lifecycle. The surrounding menu state lives in
/// the UI; the engine only distinguishes playing from summarizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Active,
    Summarizing,
}

/// Outcome of one `submit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    /// False when the call was ignored (answer already locked in).
    pub accepted: bool,
    pub is_correct: bool,
    pub correct_answer: i32,
}

/// Token for a scheduled auto-advance. The UI holds it across its feedback
/// delay and fires it afterwards; a torn-down or already-advanced session
/// ignores stale tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceHandle {
    epoch: u64,
}

/// Summary of a finished session; the only part that outlives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelResult {
    pub completed: bool,
    pub stars: Stars,
    pub score: i64,
    pub correct: u32,
    pub total: u32,
    pub attempts: u32,
}

impl LevelResult {
    /// Fraction of questions answered correctly, the signal the unlock gate
    /// thresholds at 70%.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(self.total)
    }
}

/// Ephemeral per-playthrough state for problem-based games.
#[derive(Debug, Clone)]
pub struct AttemptSession {
    kind: GameKind,
    problems: Vec<Problem>,
    index: usize,
    score: i64,
    correct: u32,
    attempts: u32,
    selected: Option<i32>,
    revealed: bool,
    epoch: u64,
    phase: SessionPhase,
    abandoned: bool,
}

impl AttemptSession {
    #[must_use]
    pub fn new(kind: GameKind, problems: Vec<Problem>) -> Self {
        let phase = if problems.is_empty() {
            SessionPhase::Summarizing
        } else {
            SessionPhase::Active
        };
        Self {
            kind,
            problems,
            index: 0,
            score: 0,
            correct: 0,
            attempts: 0,
            selected: None,
            revealed: false,
            epoch: 0,
            phase,
            abandoned: false,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> GameKind {
        self.kind
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The problem currently awaiting an answer.
    #[must_use]
    pub fn current(&self) -> Option<&Problem> {
        match self.phase {
            SessionPhase::Active => self.problems.get(self.index),
            SessionPhase::Summarizing => None,
        }
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        u32::try_from(self.problems.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub const fn score(&self) -> i64 {
        self.score
    }

    #[must_use]
    pub const fn correct_count(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub const fn selected(&self) -> Option<i32> {
        self.selected
    }

    /// Whether feedback for the current problem is showing.
    #[must_use]
    pub const fn revealed(&self) -> bool {
        self.revealed
    }

    /// Judge an answer for the current problem. Exactly one submission per
    /// problem is scored; while an answer is locked in, further calls are
    /// no-ops reported as unaccepted.
    pub fn submit(&mut self, answer: i32) -> Submission {
        let Some(problem) = self.current() else {
            return Submission {
                accepted: false,
                is_correct: false,
                correct_answer: 0,
            };
        };
        let correct_answer = problem.answer;
        if self.selected.is_some() {
            return Submission {
                accepted: false,
                is_correct: answer == correct_answer,
                correct_answer,
            };
        }

        self.selected = Some(answer);
        self.revealed = true;
        self.attempts += 1;
        let is_correct = answer == correct_answer;
        if is_correct {
            self.score += self.kind.reward();
            self.correct += 1;
        }
        Submission {
            accepted: true,
            is_correct,
            correct_answer,
        }
    }

    /// Hand out a token for the post-feedback auto-advance. Only meaningful
    /// once the current answer is revealed.
    #[must_use]
    pub const fn schedule_advance(&self) -> Option<AdvanceHandle> {
        if self.revealed && matches!(self.phase, SessionPhase::Active) {
            Some(AdvanceHandle { epoch: self.epoch })
        } else {
            None
        }
    }

    /// Fire a previously scheduled advance. Returns false (and leaves the
    /// session untouched) when the token is stale.
    pub fn fire_advance(&mut self, handle: AdvanceHandle) -> bool {
        if handle.epoch != self.epoch || !matches!(self.phase, SessionPhase::Active) {
            return false;
        }
        self.advance();
        true
    }

    /// Step to the next problem, or into summarizing past the last one.
    /// Invalidates any outstanding advance token.
    pub fn advance(&mut self) {
        self.epoch += 1;
        self.selected = None;
        self.revealed = false;
        if self.index + 1 < self.problems.len() {
            self.index += 1;
        } else {
            self.phase = SessionPhase::Summarizing;
        }
    }

    /// Discard the playthrough. Pending advances become stale; the session
    /// reports as not completed.
    pub fn abandon(&mut self) {
        self.epoch += 1;
        self.selected = None;
        self.revealed = false;
        self.index = 0;
        self.phase = SessionPhase::Summarizing;
        self.abandoned = true;
    }

    /// Summarize the session. Only a session that consumed every problem
    /// counts as completed and earns stars.
    #[must_use]
    pub fn finish(&self) -> LevelResult {
        let total = self.total_questions();
        let completed = total > 0
            && matches!(self.phase, SessionPhase::Summarizing)
            && !self.abandoned
            && self.attempts >= total;
        let stars = if completed {
            self.kind.star_rule().rate(self.correct, total)
        } else {
            Stars::Zero
        };
        LevelResult {
            completed,
            stars,
            score: self.score,
            correct: self.correct,
            total,
            attempts: self.attempts,
        }
    }
}
