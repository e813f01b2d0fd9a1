//! Persisted progress records and the never-regress merge.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::scoring::Stars;
use crate::session::LevelResult;

/// Namespace prefix for per-lesson progress records.
pub const PROGRESS_KEY_PREFIX: &str = "numerix_progress_";
/// Namespace prefix for per-game unlock sets.
pub const UNLOCK_KEY_PREFIX: &str = "numerix_unlocks_";

/// Storage key for one profile's record of one lesson or level. The key
/// construction rule lives here and nowhere else.
#[must_use]
pub fn record_key(profile_id: &str, lesson_id: &str) -> String {
    format!("{PROGRESS_KEY_PREFIX}{profile_id}_{lesson_id}")
}

/// Storage key for one profile's unlock set of one game.
#[must_use]
pub fn unlock_key(profile_id: &str, game_id: &str) -> String {
    format!("{UNLOCK_KEY_PREFIX}{profile_id}_{game_id}")
}

/// Best-ever progress for one `(profile, lesson)` key. Field names keep the
/// storage shape of the original web app so existing records load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub stars: Stars,
    #[serde(default)]
    pub score: i64,
    /// RFC 3339 timestamp of the most recent attempt, better or not.
    #[serde(default)]
    pub last_attempted_at: String,
}

/// Merge a fresh result into the stored record. Stars and score only move
/// up; `completed` is sticky; the timestamp always refreshes. With no prior
/// record the result is taken as-is.
#[must_use]
pub fn merge(existing: Option<&ProgressRecord>, result: &LevelResult, now: &str) -> ProgressRecord {
    match existing {
        None => ProgressRecord {
            completed: result.completed,
            stars: result.stars,
            score: result.score,
            last_attempted_at: now.to_string(),
        },
        Some(prev) => ProgressRecord {
            completed: prev.completed || result.completed,
            stars: prev.stars.max(result.stars),
            score: prev.score.max(result.score),
            last_attempted_at: now.to_string(),
        },
    }
}

/// Decode a stored record. Malformed data reads as "no progress yet" and
/// gets overwritten by the next successful merge.
#[must_use]
pub fn decode_record(raw: &str) -> Option<ProgressRecord> {
    serde_json::from_str(raw).ok()
}

/// Encode a record for the key-value substrate.
#[must_use]
pub fn encode_record(record: &ProgressRecord) -> String {
    serde_json::to_string(record).unwrap_or_default()
}

/// All of one profile's lesson records, keyed by lesson id.
pub type ProfileProgress = HashMap<String, ProgressRecord>;

/// Total stars across a profile's lessons, the dashboard headline number.
#[must_use]
pub fn total_stars(progress: &ProfileProgress) -> u32 {
    progress
        .values()
        .map(|record| u32::from(record.stars.count()))
        .sum()
}
