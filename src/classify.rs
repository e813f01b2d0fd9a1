//! Classify-and-count rounds: templates, placement, and the count quiz.
//!
//! A template lists every object a level may show; each round draws a random
//! subset per category so replays differ. Placement is retry-until-correct,
//! then a short "how many" quiz runs over the same categories. Ratings come
//! from attempt efficiency rather than accuracy.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

use crate::config::ConfigError;
use crate::scoring::{Stars, stars_from_efficiency};
use crate::session::{LevelResult, Submission};

/// Points per correct placement.
pub const PLACEMENT_REWARD: i64 = 10;
/// Points per correct count-quiz answer.
pub const QUIZ_REWARD: i64 = 20;
/// Smallest per-category subset a round may draw.
pub const MIN_PER_CATEGORY: usize = 2;
/// Count options offered per quiz question.
const QUIZ_OPTION_COUNT: i32 = 3;

/// One classifiable object in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub id: String,
    pub label: String,
    /// Category id this object belongs to.
    pub category: String,
}

/// A target bucket objects get sorted into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub id: String,
    pub label: String,
}

/// Authored pool of objects and categories for one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyTemplate {
    pub level: u32,
    pub objects: Vec<ObjectSpec>,
    pub categories: Vec<CategorySpec>,
}

fn object(id: &str, label: &str, category: &str) -> ObjectSpec {
    ObjectSpec {
        id: id.to_string(),
        label: label.to_string(),
        category: category.to_string(),
    }
}

fn category(id: &str, label: &str) -> CategorySpec {
    CategorySpec {
        id: id.to_string(),
        label: label.to_string(),
    }
}

impl ClassifyTemplate {
    /// The three stock levels: two, three, then four categories.
    #[must_use]
    pub fn builtin() -> Vec<Self> {
        vec![
            Self {
                level: 1,
                objects: vec![
                    object("dog", "Dog", "animal"),
                    object("cat", "Cat", "animal"),
                    object("rabbit", "Rabbit", "animal"),
                    object("bird", "Bird", "animal"),
                    object("lion", "Lion", "animal"),
                    object("ball", "Ball", "toy"),
                    object("car", "Car", "toy"),
                    object("doll", "Doll", "toy"),
                    object("blocks", "Blocks", "toy"),
                    object("teddy", "Teddy bear", "toy"),
                ],
                categories: vec![category("animal", "Animals"), category("toy", "Toys")],
            },
            Self {
                level: 2,
                objects: vec![
                    object("lion", "Lion", "animal"),
                    object("elephant", "Elephant", "animal"),
                    object("fish", "Fish", "animal"),
                    object("frog", "Frog", "animal"),
                    object("teddy", "Teddy bear", "toy"),
                    object("puzzle", "Puzzle", "toy"),
                    object("kite", "Kite", "toy"),
                    object("robot", "Robot", "toy"),
                    object("apple", "Apple", "fruit"),
                    object("banana", "Banana", "fruit"),
                    object("orange", "Orange", "fruit"),
                    object("grapes", "Grapes", "fruit"),
                ],
                categories: vec![
                    category("animal", "Animals"),
                    category("toy", "Toys"),
                    category("fruit", "Fruits"),
                ],
            },
            Self {
                level: 3,
                objects: vec![
                    object("tiger", "Tiger", "animal"),
                    object("monkey", "Monkey", "animal"),
                    object("bear", "Bear", "animal"),
                    object("penguin", "Penguin", "animal"),
                    object("robot", "Robot", "toy"),
                    object("yoyo", "Yo-yo", "toy"),
                    object("dice", "Dice", "toy"),
                    object("teddy", "Teddy bear", "toy"),
                    object("pineapple", "Pineapple", "fruit"),
                    object("watermelon", "Watermelon", "fruit"),
                    object("peach", "Peach", "fruit"),
                    object("apple", "Apple", "fruit"),
                    object("bus", "Bus", "vehicle"),
                    object("airplane", "Airplane", "vehicle"),
                    object("boat", "Boat", "vehicle"),
                    object("bicycle", "Bicycle", "vehicle"),
                ],
                categories: vec![
                    category("animal", "Animals"),
                    category("toy", "Toys"),
                    category("fruit", "Fruits"),
                    category("vehicle", "Vehicles"),
                ],
            },
        ]
    }

    /// Look up a stock template by its level number.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownClassifyLevel`] for levels without a
    /// template.
    pub fn stock(level: u32) -> Result<Self, ConfigError> {
        Self::builtin()
            .into_iter()
            .find(|t| t.level == level)
            .ok_or(ConfigError::UnknownClassifyLevel(level))
    }

    /// Reject templates a round could not be drawn from.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an object references an unknown category
    /// or a category has fewer than [`MIN_PER_CATEGORY`] objects.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let known: HashSet<&str> = self.categories.iter().map(|c| c.id.as_str()).collect();
        for obj in &self.objects {
            if !known.contains(obj.category.as_str()) {
                return Err(ConfigError::UnknownCategory {
                    object: obj.id.clone(),
                    category: obj.category.clone(),
                });
            }
        }
        for cat in &self.categories {
            let size = self.objects.iter().filter(|o| o.category == cat.id).count();
            if size < MIN_PER_CATEGORY {
                return Err(ConfigError::CategoryTooSmall {
                    category: cat.id.clone(),
                    size,
                    min: MIN_PER_CATEGORY,
                });
            }
        }
        Ok(())
    }
}

/// Follow-up "how many" question for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub category: String,
    pub answer: i32,
    pub options: SmallVec<[i32; 4]>,
}

/// One playable draw from a template: a shuffled object subset plus the
/// per-category count quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyRound {
    pub level: u32,
    pub objects: Vec<ObjectSpec>,
    pub categories: Vec<CategorySpec>,
    pub quiz: Vec<QuizQuestion>,
}

impl ClassifyRound {
    /// Draw a round: per category a random subset of between
    /// [`MIN_PER_CATEGORY`] and all of its template objects, shuffled
    /// together for presentation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the template fails validation.
    pub fn generate(template: &ClassifyTemplate, rng: &mut impl Rng) -> Result<Self, ConfigError> {
        template.validate()?;
        let mut chosen: Vec<ObjectSpec> = Vec::new();
        let mut quiz: Vec<QuizQuestion> = Vec::new();
        for cat in &template.categories {
            let mut pool: Vec<&ObjectSpec> = template
                .objects
                .iter()
                .filter(|o| o.category == cat.id)
                .collect();
            pool.shuffle(rng);
            let take = rng.gen_range(MIN_PER_CATEGORY..=pool.len());
            chosen.extend(pool.into_iter().take(take).cloned());
            let count = i32::try_from(take).unwrap_or(i32::MAX);
            quiz.push(QuizQuestion {
                category: cat.id.clone(),
                answer: count,
                options: count_options(count, rng),
            });
        }
        chosen.shuffle(rng);
        Ok(Self {
            level: template.level,
            objects: chosen,
            categories: template.categories.clone(),
            quiz,
        })
    }

    /// One attempt per placement plus one per quiz question.
    #[must_use]
    pub fn ideal_attempts(&self) -> u32 {
        u32::try_from(self.objects.len() + self.quiz.len()).unwrap_or(u32::MAX)
    }

    /// True object count for a category in this round.
    #[must_use]
    pub fn count_for(&self, category_id: &str) -> usize {
        self.objects
            .iter()
            .filter(|o| o.category == category_id)
            .count()
    }
}

/// Ascending window of plausible counts containing the true one.
fn count_options(count: i32, rng: &mut impl Rng) -> SmallVec<[i32; 4]> {
    let offset = rng.gen_range(0..QUIZ_OPTION_COUNT);
    let start = (count - offset).max(1);
    (start..start + QUIZ_OPTION_COUNT).collect()
}

/// Result of one placement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Object landed in its category; flag reports whether that category is
    /// now fully sorted.
    Correct { category_complete: bool },
    /// Wrong bucket; the object stays available and can be retried.
    Incorrect,
    /// Ignored: unknown object, already placed, or wrong phase.
    Rejected,
}

/// Phase of a classify playthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifyPhase {
    Placing,
    Quiz,
    Summarizing,
}

/// Ephemeral state of one classify-and-count playthrough.
#[derive(Debug, Clone)]
pub struct ClassifySession {
    round: ClassifyRound,
    placed: HashMap<String, String>,
    score: i64,
    attempts: u32,
    quiz_index: usize,
    quiz_correct: u32,
    phase: ClassifyPhase,
    abandoned: bool,
}

impl ClassifySession {
    #[must_use]
    pub fn new(round: ClassifyRound) -> Self {
        Self {
            round,
            placed: HashMap::new(),
            score: 0,
            attempts: 0,
            quiz_index: 0,
            quiz_correct: 0,
            phase: ClassifyPhase::Placing,
            abandoned: false,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> ClassifyPhase {
        self.phase
    }

    #[must_use]
    pub const fn round(&self) -> &ClassifyRound {
        &self.round
    }

    #[must_use]
    pub const fn score(&self) -> i64 {
        self.score
    }

    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempts
    }

    /// Objects not yet sorted into their category.
    pub fn available_objects(&self) -> impl Iterator<Item = &ObjectSpec> {
        self.round
            .objects
            .iter()
            .filter(|o| !self.placed.contains_key(&o.id))
    }

    /// Whether every object of a category has been placed.
    #[must_use]
    pub fn is_category_complete(&self, category_id: &str) -> bool {
        self.round
            .objects
            .iter()
            .filter(|o| o.category == category_id)
            .all(|o| self.placed.contains_key(&o.id))
    }

    /// Try to drop an object into a category. Correct placements stick and
    /// score; wrong ones only cost an attempt.
    pub fn place(&mut self, object_id: &str, category_id: &str) -> PlacementOutcome {
        if !matches!(self.phase, ClassifyPhase::Placing) || self.placed.contains_key(object_id) {
            return PlacementOutcome::Rejected;
        }
        let Some(obj) = self.round.objects.iter().find(|o| o.id == object_id) else {
            return PlacementOutcome::Rejected;
        };
        self.attempts += 1;
        if obj.category != category_id {
            return PlacementOutcome::Incorrect;
        }
        let category = obj.category.clone();
        self.placed.insert(obj.id.clone(), category.clone());
        self.score += PLACEMENT_REWARD;
        if self.placed.len() == self.round.objects.len() {
            self.phase = ClassifyPhase::Quiz;
        }
        PlacementOutcome::Correct {
            category_complete: self.is_category_complete(&category),
        }
    }

    /// The quiz question currently awaiting an answer.
    #[must_use]
    pub fn quiz_question(&self) -> Option<&QuizQuestion> {
        match self.phase {
            ClassifyPhase::Quiz => self.round.quiz.get(self.quiz_index),
            _ => None,
        }
    }

    /// Answer the current count question. Wrong answers cost an attempt and
    /// leave the question open, matching placement semantics.
    pub fn answer_count(&mut self, value: i32) -> Submission {
        let Some(question) = self.quiz_question() else {
            return Submission {
                accepted: false,
                is_correct: false,
                correct_answer: 0,
            };
        };
        let correct_answer = question.answer;
        self.attempts += 1;
        let is_correct = value == correct_answer;
        if is_correct {
            self.score += QUIZ_REWARD;
            self.quiz_correct += 1;
            self.quiz_index += 1;
            if self.quiz_index >= self.round.quiz.len() {
                self.phase = ClassifyPhase::Summarizing;
            }
        }
        Submission {
            accepted: true,
            is_correct,
            correct_answer,
        }
    }

    /// Discard the playthrough without credit.
    pub fn abandon(&mut self) {
        self.phase = ClassifyPhase::Summarizing;
        self.abandoned = true;
    }

    /// Summarize the playthrough; stars come from attempt efficiency.
    #[must_use]
    pub fn finish(&self) -> LevelResult {
        let completed = matches!(self.phase, ClassifyPhase::Summarizing) && !self.abandoned;
        let ideal = self.round.ideal_attempts();
        let stars = if completed {
            stars_from_efficiency(ideal, self.attempts)
        } else {
            Stars::Zero
        };
        let placed = u32::try_from(self.placed.len()).unwrap_or(u32::MAX);
        LevelResult {
            completed,
            stars,
            score: self.score,
            correct: placed + self.quiz_correct,
            total: ideal,
            attempts: self.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn round(seed: u64, level: u32) -> ClassifyRound {
        let template = ClassifyTemplate::stock(level).unwrap();
        let mut rng = SmallRng::seed_from_u64(seed);
        ClassifyRound::generate(&template, &mut rng).unwrap()
    }

    fn play_perfectly(session: &mut ClassifySession) {
        let placements: Vec<(String, String)> = session
            .round()
            .objects
            .iter()
            .map(|o| (o.id.clone(), o.category.clone()))
            .collect();
        for (object, category) in placements {
            assert!(matches!(
                session.place(&object, &category),
                PlacementOutcome::Correct { .. }
            ));
        }
        while let Some(answer) = session.quiz_question().map(|q| q.answer) {
            assert!(session.answer_count(answer).is_correct);
        }
    }

    #[test]
    fn subset_sizes_respect_template_bounds() {
        for seed in 0..50 {
            let round = round(seed, 3);
            let template = ClassifyTemplate::stock(3).unwrap();
            for cat in &round.categories {
                let drawn = round.count_for(&cat.id);
                let pool = template
                    .objects
                    .iter()
                    .filter(|o| o.category == cat.id)
                    .count();
                assert!(drawn >= MIN_PER_CATEGORY && drawn <= pool);
            }
        }
    }

    #[test]
    fn quiz_options_contain_true_count() {
        for seed in 0..50 {
            let round = round(seed, 2);
            for question in &round.quiz {
                assert!(question.options.contains(&question.answer));
                assert!(question.options.iter().all(|o| *o >= 1));
                assert_eq!(
                    question.answer,
                    i32::try_from(round.count_for(&question.category)).unwrap()
                );
            }
        }
    }

    #[test]
    fn ideal_run_earns_three_stars() {
        let mut session = ClassifySession::new(round(7, 1));
        play_perfectly(&mut session);
        let result = session.finish();
        assert!(result.completed);
        assert_eq!(result.stars, Stars::Three);
        assert_eq!(result.attempts, session.round().ideal_attempts());
    }

    #[test]
    fn wrong_placement_costs_attempt_but_can_retry() {
        let mut session = ClassifySession::new(round(9, 1));
        let obj = session.round().objects[0].clone();
        let wrong = session
            .round()
            .categories
            .iter()
            .find(|c| c.id != obj.category)
            .unwrap()
            .id
            .clone();
        assert_eq!(session.place(&obj.id, &wrong), PlacementOutcome::Incorrect);
        assert!(matches!(
            session.place(&obj.id, &obj.category),
            PlacementOutcome::Correct { .. }
        ));
        assert_eq!(session.attempt_count(), 2);
    }

    #[test]
    fn replacing_a_sorted_object_is_rejected() {
        let mut session = ClassifySession::new(round(11, 1));
        let obj = session.round().objects[0].clone();
        session.place(&obj.id, &obj.category);
        assert_eq!(
            session.place(&obj.id, &obj.category),
            PlacementOutcome::Rejected
        );
    }

    #[test]
    fn quiz_locked_until_all_placed() {
        let mut session = ClassifySession::new(round(13, 1));
        assert!(session.quiz_question().is_none());
        assert!(!session.answer_count(2).accepted);
    }

    #[test]
    fn abandoned_session_earns_nothing() {
        let mut session = ClassifySession::new(round(15, 1));
        let obj = session.round().objects[0].clone();
        session.place(&obj.id, &obj.category);
        session.abandon();
        let result = session.finish();
        assert!(!result.completed);
        assert_eq!(result.stars, Stars::Zero);
    }

    #[test]
    fn invalid_template_rejected() {
        let template = ClassifyTemplate {
            level: 9,
            objects: vec![object("one", "One", "lonely")],
            categories: vec![category("lonely", "Lonely")],
        };
        let mut rng = SmallRng::seed_from_u64(1);
        let err = ClassifyRound::generate(&template, &mut rng).unwrap_err();
        assert_eq!(
            err,
            ConfigError::CategoryTooSmall {
                category: "lonely".to_string(),
                size: 1,
                min: MIN_PER_CATEGORY,
            }
        );
    }
}
