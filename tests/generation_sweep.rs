use numerix_engine::config::{Difficulty, DifficultyConfig, ProblemKind};
use numerix_engine::problem::{OPTION_CEILING, OPTION_COUNT, ProblemBody, generate_problems};
use numerix_engine::rng::RngBundle;
use std::collections::HashSet;

const SEED_SAMPLE: u64 = 250;

const ALL_KINDS: [ProblemKind; 3] = [
    ProblemKind::Addition,
    ProblemKind::Subtraction,
    ProblemKind::Counting,
];

fn every_config() -> impl Iterator<Item = DifficultyConfig> {
    Difficulty::LADDER.into_iter().map(DifficultyConfig::for_tier)
}

#[test]
fn option_sets_always_carry_the_answer_once() {
    for seed in 0..SEED_SAMPLE {
        for cfg in every_config() {
            for kind in ALL_KINDS {
                let rng = RngBundle::from_user_seed(seed);
                let problems = generate_problems(&cfg, kind, &rng).unwrap();
                assert_eq!(problems.len() as u32, cfg.questions);
                for p in &problems {
                    assert_eq!(p.options.len(), OPTION_COUNT);
                    let hits = p.options.iter().filter(|&&o| o == p.answer).count();
                    assert_eq!(hits, 1, "seed {seed} {kind:?}: options {:?}", p.options);
                    let distinct: HashSet<i32> = p.options.iter().copied().collect();
                    assert_eq!(distinct.len(), OPTION_COUNT, "duplicate options at {seed}");
                    for &opt in &p.options {
                        assert!(opt <= OPTION_CEILING, "option {opt} over ceiling");
                        assert!(opt >= 0, "negative option {opt}");
                    }
                }
            }
        }
    }
}

#[test]
fn operands_respect_the_difficulty_bound() {
    for seed in 0..SEED_SAMPLE {
        for cfg in every_config() {
            for kind in ALL_KINDS {
                let rng = RngBundle::from_user_seed(seed);
                for p in generate_problems(&cfg, kind, &rng).unwrap() {
                    match p.body {
                        ProblemBody::Addition { left, right } => {
                            assert!(left >= 1 && right >= 1);
                            assert!(left <= 10 && right <= 10);
                            assert!(left + right <= cfg.max_number);
                        }
                        ProblemBody::Subtraction {
                            minuend,
                            subtrahend,
                        } => {
                            assert!(minuend <= cfg.max_number);
                            assert!(subtrahend >= 1 && subtrahend <= 10);
                            assert!(minuend - subtrahend >= 1, "non-positive difference");
                        }
                        ProblemBody::Counting { count } => {
                            assert!(count >= 1 && count <= cfg.max_number.min(10));
                        }
                    }
                    assert_eq!(p.answer, p.body.answer());
                }
            }
        }
    }
}

#[test]
fn counting_options_are_consecutive_and_ascending() {
    for seed in 0..SEED_SAMPLE {
        let cfg = DifficultyConfig::for_tier(Difficulty::Easy);
        let rng = RngBundle::from_user_seed(seed);
        for p in generate_problems(&cfg, ProblemKind::Counting, &rng).unwrap() {
            for pair in p.options.windows(2) {
                assert_eq!(pair[1], pair[0] + 1, "window not consecutive: {:?}", p.options);
            }
            assert!(p.options[0] >= 1);
        }
    }
}

#[test]
fn the_same_seed_reproduces_the_level() {
    for seed in [0, 1, 42, 0xDEAD_BEEF] {
        for cfg in every_config() {
            for kind in ALL_KINDS {
                let first = generate_problems(&cfg, kind, &RngBundle::from_user_seed(seed));
                let second = generate_problems(&cfg, kind, &RngBundle::from_user_seed(seed));
                assert_eq!(first.unwrap(), second.unwrap());
            }
        }
    }
}

#[test]
fn different_seeds_diverge_somewhere() {
    let cfg = DifficultyConfig::for_tier(Difficulty::Advanced);
    let mut distinct = HashSet::new();
    for seed in 0..32u64 {
        let rng = RngBundle::from_user_seed(seed);
        let problems = generate_problems(&cfg, ProblemKind::Addition, &rng).unwrap();
        distinct.insert(format!("{problems:?}"));
    }
    assert!(distinct.len() > 1, "every seed produced an identical level");
}

#[test]
fn generation_terminates_with_bounded_draws() {
    // The redraw and distractor budgets cap the per-question draw count, so
    // even adversarial seeds stay well under this ceiling.
    for seed in 0..SEED_SAMPLE {
        for cfg in every_config() {
            for kind in ALL_KINDS {
                let rng = RngBundle::from_user_seed(seed);
                let problems = generate_problems(&cfg, kind, &rng).unwrap();
                let per_question = rng.total_draws() / u64::from(cfg.questions).max(1);
                assert!(
                    per_question < 512,
                    "seed {seed} {kind:?}: {per_question} draws per question"
                );
                assert!(!problems.is_empty());
            }
        }
    }
}

#[test]
fn invalid_configs_fail_before_generation() {
    let rng = RngBundle::from_user_seed(7);
    let no_questions = DifficultyConfig {
        name: "empty".to_string(),
        questions: 0,
        max_number: 10,
    };
    assert!(generate_problems(&no_questions, ProblemKind::Addition, &rng).is_err());

    let tiny_bound = DifficultyConfig {
        name: "tiny".to_string(),
        questions: 5,
        max_number: 1,
    };
    assert!(generate_problems(&tiny_bound, ProblemKind::Subtraction, &rng).is_err());
}
