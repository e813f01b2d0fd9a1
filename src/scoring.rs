//! Star ratings and mastery aggregation.
use serde::{Deserialize, Serialize};

/// Accuracy needed for three stars (non-strict variants).
pub const THREE_STAR_ACCURACY: f64 = 0.95;
/// Accuracy needed for two stars.
pub const TWO_STAR_ACCURACY: f64 = 0.80;
/// Efficiency needed for three stars.
pub const THREE_STAR_EFFICIENCY: f64 = 0.9;
/// Efficiency needed for two stars.
pub const TWO_STAR_EFFICIENCY: f64 = 0.7;
/// Average sub-level stars needed for gold mastery.
pub const GOLD_AVERAGE: f64 = 2.8;
/// Average sub-level stars needed for silver mastery.
pub const SILVER_AVERAGE: f64 = 1.8;

/// 0-3 mastery rating for a level. Serialized as a plain number so persisted
/// records keep the original storage shape.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", from = "u8")]
pub enum Stars {
    #[default]
    Zero,
    One,
    Two,
    Three,
}

impl Stars {
    #[must_use]
    pub const fn count(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

impl From<Stars> for u8 {
    fn from(value: Stars) -> Self {
        value.count()
    }
}

impl From<u8> for Stars {
    /// Out-of-range stored values clamp into 0-3 rather than failing a load.
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Two,
            _ => Self::Three,
        }
    }
}

/// How a finished session converts counts into a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarRule {
    /// Correct / total. `strict` demands a perfect run for three stars.
    Accuracy { strict: bool },
    /// Ideal attempts / actual attempts, capped at 1.0.
    Efficiency,
    /// Three stars minus one per wrong answer, floored at one.
    Mistakes,
}

impl StarRule {
    /// Rate a finished session. `correct`/`total` are answer counts for
    /// accuracy and mistake rules, ideal/actual attempt counts for the
    /// efficiency rule.
    #[must_use]
    pub fn rate(self, correct: u32, total: u32) -> Stars {
        match self {
            Self::Accuracy { strict } => stars_from_accuracy(correct, total, strict),
            Self::Efficiency => stars_from_efficiency(correct, total),
            Self::Mistakes => stars_from_mistakes(total.saturating_sub(correct)),
        }
    }
}

/// Accuracy rating: three stars at 95% (or only a perfect run when strict),
/// two at 80%, otherwise one. A finished level never rates below one star,
/// even with zero correct answers.
#[must_use]
pub fn stars_from_accuracy(correct: u32, total: u32, strict: bool) -> Stars {
    if total == 0 {
        return Stars::One;
    }
    let accuracy = f64::from(correct.min(total)) / f64::from(total);
    let three_cut = if strict { 1.0 } else { THREE_STAR_ACCURACY };
    if accuracy >= three_cut {
        Stars::Three
    } else if accuracy >= TWO_STAR_ACCURACY {
        Stars::Two
    } else {
        Stars::One
    }
}

/// Mistake rating: each wrong answer costs a star, but a finished level
/// never rates below one.
#[must_use]
pub fn stars_from_mistakes(mistakes: u32) -> Stars {
    match mistakes {
        0 => Stars::Three,
        1 => Stars::Two,
        _ => Stars::One,
    }
}

/// Efficiency rating: ideal attempts over actual attempts, capped at 1.0.
#[must_use]
pub fn stars_from_efficiency(ideal: u32, actual: u32) -> Stars {
    if ideal == 0 {
        return Stars::One;
    }
    // actual < ideal cannot happen in a completed round; the cap keeps the
    // ratio honest if a caller feeds partial numbers.
    let efficiency = f64::from(ideal) / f64::from(actual.max(ideal));
    if efficiency >= THREE_STAR_EFFICIENCY {
        Stars::Three
    } else if efficiency >= TWO_STAR_EFFICIENCY {
        Stars::Two
    } else {
        Stars::One
    }
}

/// Roll a lesson's sub-levels up into one rating: three when every sub-level
/// is perfect, two when all are completed, one when at least one is.
///
/// Zero completions rate zero stars. The predecessor floored this case at one
/// star; that floor was an accident of initialization and is dropped here.
pub fn rollup_stars<I>(sub_levels: I) -> Stars
where
    I: IntoIterator<Item = (bool, Stars)>,
{
    let mut seen = 0u32;
    let mut completed = 0u32;
    let mut perfect = 0u32;
    for (done, stars) in sub_levels {
        seen += 1;
        if done {
            completed += 1;
            if stars == Stars::Three {
                perfect += 1;
            }
        }
    }
    if seen == 0 || completed == 0 {
        Stars::Zero
    } else if perfect == seen {
        Stars::Three
    } else if completed == seen {
        Stars::Two
    } else {
        Stars::One
    }
}

/// Aggregate mastery tier for a lesson category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMastery {
    NotStarted,
    InProgress,
    Bronze,
    Silver,
    Gold,
}

/// Tier a category by its lessons' `(completed, stars)` pairs. Medal tiers
/// require every lesson completed; partial completion reports in-progress.
pub fn category_mastery<I>(lessons: I) -> CategoryMastery
where
    I: IntoIterator<Item = (bool, Stars)>,
{
    let mut total = 0u32;
    let mut completed = 0u32;
    let mut star_sum = 0u32;
    for (done, stars) in lessons {
        total += 1;
        if done {
            completed += 1;
        }
        star_sum += u32::from(stars.count());
    }
    if total == 0 || completed == 0 {
        return CategoryMastery::NotStarted;
    }
    if completed < total {
        return CategoryMastery::InProgress;
    }
    let average = f64::from(star_sum) / f64::from(total);
    if average >= GOLD_AVERAGE {
        CategoryMastery::Gold
    } else if average >= SILVER_AVERAGE {
        CategoryMastery::Silver
    } else {
        CategoryMastery::Bronze
    }
}
