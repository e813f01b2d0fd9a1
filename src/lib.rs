//! Numerix Engine
//!
//! Platform-agnostic core logic for the Numerix math mini-games: problem
//! generation, attempt evaluation, star ratings, difficulty unlocking, and
//! per-profile progress persistence. The UI layer drives this crate through
//! [`GameEngine`] and renders whatever state it reads back; nothing here
//! touches the DOM, audio, or timers.

pub mod classify;
pub mod config;
pub mod problem;
pub mod progress;
pub mod progression;
pub mod rng;
pub mod scoring;
pub mod session;

// Re-export commonly used types
pub use classify::{
    ClassifyPhase, ClassifyRound, ClassifySession, ClassifyTemplate, PlacementOutcome,
    QuizQuestion,
};
pub use config::{ConfigError, Difficulty, DifficultyConfig, GameKind, ProblemKind};
pub use problem::{AuthoredLevel, OptionSet, Problem, ProblemBody, generate_problems};
pub use progress::{ProfileProgress, ProgressRecord, merge, record_key, total_stars, unlock_key};
pub use progression::{UNLOCK_RATIO, UnlockSet};
pub use rng::{RngBundle, StreamDomain, TracedRng};
pub use scoring::{
    CategoryMastery, StarRule, Stars, category_mastery, rollup_stars, stars_from_accuracy,
    stars_from_efficiency,
};
pub use session::{AdvanceHandle, AttemptSession, LevelResult, SessionPhase, Submission};

/// Trait for abstracting the key-value persistence substrate
/// (browser local storage on the web; anything string-keyed elsewhere).
/// Platform-specific implementations should provide this.
pub trait ProgressStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the raw value stored under a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Write a value under a key, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Remove a key if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be removed.
    fn remove(&mut self, key: &str) -> Result<(), Self::Error>;
}

/// HashMap-backed storage for hosts without a real substrate and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProgressStorage for MemoryStore {
    type Error = std::convert::Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Self::Error> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Main engine facade binding the mini-game logic to a storage backend and
/// an active profile. Reads degrade to "no progress yet" on any storage or
/// decode problem; writes without an active profile are no-ops so nothing
/// ever lands under a shared key.
pub struct GameEngine<S: ProgressStorage> {
    storage: S,
    active_profile: Option<String>,
}

impl<S: ProgressStorage> GameEngine<S> {
    /// Create an engine with no active profile selected.
    pub const fn new(storage: S) -> Self {
        Self {
            storage,
            active_profile: None,
        }
    }

    /// Switch profiles (or sign out with `None`). Progress keys are
    /// namespaced per profile, so switching never mixes records.
    pub fn set_active_profile(&mut self, profile_id: Option<String>) {
        self.active_profile = profile_id;
    }

    #[must_use]
    pub fn active_profile(&self) -> Option<&str> {
        self.active_profile.as_deref()
    }

    /// Generate the problem set for one level of a problem-based game.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for kinds whose problems are not generated
    /// from a difficulty config (bug addition, classify-and-count) or for an
    /// invalid configuration.
    pub fn generate_level(
        &self,
        kind: GameKind,
        tier: Difficulty,
        seed: u64,
    ) -> Result<Vec<Problem>, ConfigError> {
        let problem_kind = kind
            .problem_kind()
            .ok_or(ConfigError::NotProblemBased(kind))?;
        let cfg = DifficultyConfig::for_tier(tier);
        let bundle = RngBundle::from_user_seed(seed);
        generate_problems(&cfg, problem_kind, &bundle)
    }

    /// Start a session for one level of a problem-based game.
    ///
    /// # Errors
    ///
    /// Same conditions as [`GameEngine::generate_level`].
    pub fn start_session(
        &self,
        kind: GameKind,
        tier: Difficulty,
        seed: u64,
    ) -> Result<AttemptSession, ConfigError> {
        let problems = self.generate_level(kind, tier, seed)?;
        Ok(AttemptSession::new(kind, problems))
    }

    /// Start a bug-addition playthrough of a stock authored level. Operands
    /// are fixed per level; the seed only varies the option sets.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAuthoredLevel`] for levels without a
    /// problem set.
    pub fn start_authored_addition(
        &self,
        level: u32,
        seed: u64,
    ) -> Result<AttemptSession, ConfigError> {
        let authored = AuthoredLevel::stock(level)?;
        let problems = authored.problems(&RngBundle::from_user_seed(seed))?;
        Ok(AttemptSession::new(GameKind::BugAddition, problems))
    }

    /// Start a classify-and-count playthrough of a stock level.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownClassifyLevel`] for levels without a
    /// template.
    pub fn start_classify(&self, level: u32, seed: u64) -> Result<ClassifySession, ConfigError> {
        let template = ClassifyTemplate::stock(level)?;
        let bundle = RngBundle::from_user_seed(seed);
        let round = ClassifyRound::generate(&template, &mut *bundle.classify())?;
        Ok(ClassifySession::new(round))
    }

    /// Merge a finished result into the stored record for a lesson and
    /// persist it. Without an active profile this is a no-op returning
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the storage write fails; the merge itself
    /// cannot fail.
    pub fn record_progress(
        &mut self,
        lesson_id: &str,
        result: &LevelResult,
    ) -> Result<Option<ProgressRecord>, anyhow::Error> {
        let Some(profile) = self.active_profile.clone() else {
            return Ok(None);
        };
        let key = record_key(&profile, lesson_id);
        let existing = self.read_record(&key);
        let merged = merge(existing.as_ref(), result, &now_rfc3339());
        self.storage
            .set(&key, &progress::encode_record(&merged))
            .map_err(anyhow::Error::new)?;
        Ok(Some(merged))
    }

    /// Read the stored record for a lesson. Absent profile, missing key, and
    /// corrupt data all read as `None`.
    #[must_use]
    pub fn get_progress(&self, lesson_id: &str) -> Option<ProgressRecord> {
        let profile = self.active_profile.as_deref()?;
        self.read_record(&record_key(profile, lesson_id))
    }

    /// The difficulty tiers currently unlocked for a game. Defaults to just
    /// the easiest tier for new profiles, corrupt data, or no profile.
    #[must_use]
    pub fn unlocked_difficulties(&self, game_id: &str) -> UnlockSet {
        let Some(profile) = self.active_profile.as_deref() else {
            return UnlockSet::default();
        };
        let raw = match self.storage.get(&unlock_key(profile, game_id)) {
            Ok(Some(raw)) => raw,
            _ => return UnlockSet::default(),
        };
        let mut set: UnlockSet = serde_json::from_str(&raw).unwrap_or_default();
        set.sanitize();
        set
    }

    /// Run the unlock gate after finishing a tier and persist the grown set.
    /// Returns the set either way so the UI can re-render the ladder.
    ///
    /// # Errors
    ///
    /// Returns an error only when the storage write fails.
    pub fn unlock_next_if_eligible(
        &mut self,
        game_id: &str,
        finished: Difficulty,
        result: &LevelResult,
    ) -> Result<UnlockSet, anyhow::Error> {
        let Some(profile) = self.active_profile.clone() else {
            return Ok(UnlockSet::default());
        };
        let mut set = self.unlocked_difficulties(game_id);
        if set.maybe_unlock_next(finished, result).is_some() {
            let encoded = serde_json::to_string(&set).unwrap_or_default();
            self.storage
                .set(&unlock_key(&profile, game_id), &encoded)
                .map_err(anyhow::Error::new)?;
        }
        Ok(set)
    }

    /// Roll several tracked levels up into one lesson rating for the
    /// dashboard.
    #[must_use]
    pub fn lesson_rollup(&self, level_ids: &[&str]) -> Stars {
        rollup_stars(level_ids.iter().map(|id| {
            self.get_progress(id)
                .map_or((false, Stars::Zero), |r| (r.completed, r.stars))
        }))
    }

    /// Mastery tier for a category of lessons.
    #[must_use]
    pub fn category_mastery(&self, lesson_ids: &[&str]) -> CategoryMastery {
        category_mastery(lesson_ids.iter().map(|id| {
            self.get_progress(id)
                .map_or((false, Stars::Zero), |r| (r.completed, r.stars))
        }))
    }

    /// Total stars across the given lessons for the active profile.
    #[must_use]
    pub fn total_stars(&self, lesson_ids: &[&str]) -> u32 {
        lesson_ids
            .iter()
            .filter_map(|id| self.get_progress(id))
            .map(|r| u32::from(r.stars.count()))
            .sum()
    }

    fn read_record(&self, key: &str) -> Option<ProgressRecord> {
        match self.storage.get(key) {
            Ok(Some(raw)) => progress::decode_record(&raw),
            _ => None,
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_profile(profile: &str) -> GameEngine<MemoryStore> {
        let mut engine = GameEngine::new(MemoryStore::new());
        engine.set_active_profile(Some(profile.to_string()));
        engine
    }

    fn finished(stars: Stars, correct: u32, total: u32, score: i64) -> LevelResult {
        LevelResult {
            completed: true,
            stars,
            score,
            correct,
            total,
            attempts: total,
        }
    }

    #[test]
    fn record_and_read_back() {
        let mut engine = engine_with_profile("kid-1");
        let stored = engine
            .record_progress("count-to-10", &finished(Stars::Three, 5, 5, 500))
            .unwrap()
            .unwrap();
        assert!(stored.completed);
        assert_eq!(engine.get_progress("count-to-10"), Some(stored));
    }

    #[test]
    fn no_profile_is_a_noop() {
        let mut engine = GameEngine::new(MemoryStore::new());
        let outcome = engine
            .record_progress("count-to-10", &finished(Stars::Three, 5, 5, 500))
            .unwrap();
        assert!(outcome.is_none());
        assert!(engine.get_progress("count-to-10").is_none());
        // Nothing was written anywhere, shared key or otherwise.
        assert!(engine.storage.is_empty());
    }

    #[test]
    fn profiles_do_not_leak() {
        let mut engine = engine_with_profile("kid-1");
        engine
            .record_progress("count-to-10", &finished(Stars::Three, 5, 5, 500))
            .unwrap();
        engine.set_active_profile(Some("kid-2".to_string()));
        assert!(engine.get_progress("count-to-10").is_none());
        engine.set_active_profile(Some("kid-1".to_string()));
        assert!(engine.get_progress("count-to-10").is_some());
    }

    #[test]
    fn corrupt_stored_record_reads_as_absent_then_heals() {
        let mut engine = engine_with_profile("kid-1");
        let key = record_key("kid-1", "count-to-10");
        engine.storage.set(&key, "{broken").unwrap();
        assert!(engine.get_progress("count-to-10").is_none());

        let healed = engine
            .record_progress("count-to-10", &finished(Stars::Two, 4, 5, 400))
            .unwrap()
            .unwrap();
        assert_eq!(healed.stars, Stars::Two);
        assert_eq!(engine.get_progress("count-to-10"), Some(healed));
    }

    #[test]
    fn corrupt_unlock_data_reads_as_the_default_ladder() {
        let mut engine = engine_with_profile("kid-1");
        let key = unlock_key("kid-1", "counting");
        engine.storage.set(&key, "[\"nonsense\"]").unwrap();
        let set = engine.unlocked_difficulties("counting");
        assert!(set.contains(Difficulty::Easy));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn classify_session_starts_from_stock_levels() {
        let engine = engine_with_profile("kid-1");
        let session = engine.start_classify(2, 99).unwrap();
        assert_eq!(session.round().categories.len(), 3);
        assert!(engine.start_classify(9, 99).is_err());
    }

    #[test]
    fn generate_level_rejects_non_generated_kinds() {
        let engine = engine_with_profile("kid-1");
        let err = engine
            .generate_level(GameKind::ClassifyAndCount, Difficulty::Easy, 1)
            .unwrap_err();
        assert_eq!(err, ConfigError::NotProblemBased(GameKind::ClassifyAndCount));
        let err = engine
            .generate_level(GameKind::BugAddition, Difficulty::Easy, 1)
            .unwrap_err();
        assert_eq!(err, ConfigError::NotProblemBased(GameKind::BugAddition));
    }

    #[test]
    fn authored_addition_sessions_start_from_stock_levels() {
        let engine = engine_with_profile("kid-1");
        let session = engine.start_authored_addition(4, 31).unwrap();
        assert_eq!(session.kind(), GameKind::BugAddition);
        assert_eq!(session.total_questions(), 5);
        assert!(engine.start_authored_addition(5, 31).is_err());
    }

    #[test]
    fn rollup_and_mastery_read_from_store() {
        let mut engine = engine_with_profile("kid-1");
        engine
            .record_progress("level-1", &finished(Stars::Three, 5, 5, 5))
            .unwrap();
        engine
            .record_progress("level-2", &finished(Stars::Two, 4, 5, 4))
            .unwrap();
        assert_eq!(engine.lesson_rollup(&["level-1", "level-2"]), Stars::Two);
        assert_eq!(engine.lesson_rollup(&["level-1", "missing"]), Stars::One);
        assert_eq!(engine.lesson_rollup(&["missing"]), Stars::Zero);
        assert_eq!(
            engine.category_mastery(&["level-1", "missing"]),
            CategoryMastery::InProgress
        );
        assert_eq!(engine.total_stars(&["level-1", "level-2", "missing"]), 5);
    }
}
