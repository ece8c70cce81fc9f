//! Task entity and its validated constructor.
//!
//! A [`Task`] can only be built from a [`TaskDraft`], which applies the
//! documented defaults once and rejects out-of-range input with a
//! [`ValidationError`]. Snapshots loaded from disk are trusted as-is; the
//! feature extractor tolerates out-of-range values found there.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Maximum title length, in characters.
pub const MAX_TITLE_CHARS: usize = 20;
/// Genre used when none is given.
pub const DEFAULT_GENRE: &str = "unspecified";
/// Difficulty used when none is given.
pub const DEFAULT_DIFFICULTY: u8 = 5;
/// Estimated duration used when none is given.
pub const DEFAULT_DURATION_MINUTES: f64 = 30.0;
/// Valid difficulty scale.
pub const DIFFICULTY_RANGE: std::ops::RangeInclusive<i64> = 1..=10;

/// A user-defined unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    title: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    deadline: Option<NaiveDate>,
    #[serde(default = "default_genre")]
    genre: String,
    #[serde(
        alias = "subjective",
        default = "default_difficulty",
        deserialize_with = "deserialize_stored_difficulty"
    )]
    subjective_difficulty: u8,
    #[serde(
        alias = "objective",
        default = "default_difficulty",
        deserialize_with = "deserialize_stored_difficulty"
    )]
    objective_difficulty: u8,
    #[serde(alias = "duration", default = "default_duration")]
    duration_minutes: f64,
}

impl Task {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn deadline(&self) -> Option<NaiveDate> {
        self.deadline
    }

    pub fn genre(&self) -> &str {
        &self.genre
    }

    pub fn subjective_difficulty(&self) -> u8 {
        self.subjective_difficulty
    }

    pub fn objective_difficulty(&self) -> u8 {
        self.objective_difficulty
    }

    /// Estimated duration in minutes. Never negative for validated tasks.
    pub fn duration_minutes(&self) -> f64 {
        self.duration_minutes
    }

    /// Whether the deadline falls on `date`.
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.deadline == Some(date)
    }
}

/// Raw task input as it arrives from a form or a command line.
///
/// Every field except the title is optional; [`TaskDraft::validate`] fills in
/// defaults and checks ranges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub deadline: Option<NaiveDate>,
    pub genre: Option<String>,
    pub subjective_difficulty: Option<i64>,
    pub objective_difficulty: Option<i64>,
    pub duration_minutes: Option<f64>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_subjective(mut self, difficulty: i64) -> Self {
        self.subjective_difficulty = Some(difficulty);
        self
    }

    pub fn with_objective(mut self, difficulty: i64) -> Self {
        self.objective_difficulty = Some(difficulty);
        self
    }

    pub fn with_duration(mut self, minutes: f64) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Build a [`Task`], applying defaults and rejecting invalid input.
    pub fn validate(self) -> Result<Task, ValidationError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let len = title.chars().count();
        if len > MAX_TITLE_CHARS {
            return Err(ValidationError::TitleTooLong {
                len,
                max: MAX_TITLE_CHARS,
            });
        }

        let subjective_difficulty = difficulty("subjective", self.subjective_difficulty)?;
        let objective_difficulty = difficulty("objective", self.objective_difficulty)?;
        let duration_minutes = match self.duration_minutes {
            Some(minutes) => validate_duration("duration", minutes)?,
            None => DEFAULT_DURATION_MINUTES,
        };

        let genre = self
            .genre
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(default_genre);

        Ok(Task {
            title,
            deadline: self.deadline,
            genre,
            subjective_difficulty,
            objective_difficulty,
            duration_minutes,
        })
    }
}

/// Check that a duration in minutes is finite and non-negative.
pub fn validate_duration(field: &'static str, minutes: f64) -> Result<f64, ValidationError> {
    if !minutes.is_finite() {
        return Err(ValidationError::InvalidDuration { field });
    }
    if minutes < 0.0 {
        return Err(ValidationError::NegativeDuration {
            field,
            value: minutes,
        });
    }
    Ok(minutes)
}

fn difficulty(field: &'static str, value: Option<i64>) -> Result<u8, ValidationError> {
    match value {
        None => Ok(DEFAULT_DIFFICULTY),
        Some(v) if DIFFICULTY_RANGE.contains(&v) => Ok(v as u8),
        Some(v) => Err(ValidationError::DifficultyOutOfRange { field, value: v }),
    }
}

fn default_genre() -> String {
    DEFAULT_GENRE.to_string()
}

fn default_difficulty() -> u8 {
    DEFAULT_DIFFICULTY
}

fn default_duration() -> f64 {
    DEFAULT_DURATION_MINUTES
}

/// Stored difficulty that cannot be represented; the feature extractor maps it to 0.0.
const UNREADABLE_DIFFICULTY: u8 = 0;

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDifficulty {
    Integer(i64),
    Fractional(f64),
    Other(serde::de::IgnoredAny),
}

/// Accepts any stored value. `null` means the default; fractional, negative or
/// oversized numbers and non-numbers become [`UNREADABLE_DIFFICULTY`].
fn deserialize_stored_difficulty<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<StoredDifficulty> = Option::deserialize(deserializer)?;
    Ok(match raw {
        None => DEFAULT_DIFFICULTY,
        Some(StoredDifficulty::Integer(v)) => u8::try_from(v).unwrap_or(UNREADABLE_DIFFICULTY),
        Some(StoredDifficulty::Fractional(_)) | Some(StoredDifficulty::Other(_)) => {
            UNREADABLE_DIFFICULTY
        }
    })
}

/// Accepts `null`, a missing field, `""` or an ISO date.
fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => {
            // Older snapshots stored datetime-local strings ("2025-01-31T09:00").
            let date_part = s.split('T').next().unwrap_or(s);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied_once() {
        let task = TaskDraft::new("Write report").validate().unwrap();
        assert_eq!(task.title(), "Write report");
        assert_eq!(task.genre(), DEFAULT_GENRE);
        assert_eq!(task.subjective_difficulty(), 5);
        assert_eq!(task.objective_difficulty(), 5);
        assert_eq!(task.duration_minutes(), 30.0);
        assert!(task.deadline().is_none());
    }

    #[test]
    fn stored_difficulty_outside_u8_is_tolerated() {
        let cases = [
            (r#"{"title":"x","subjective":-2}"#, 0),
            (r#"{"title":"x","subjective":7.5}"#, 0),
            (r#"{"title":"x","subjective":300}"#, 0),
            (r#"{"title":"x","subjective":"hard"}"#, 0),
            (r#"{"title":"x","subjective":null}"#, 5),
            (r#"{"title":"x","subjectiveDifficulty":7}"#, 7),
        ];
        for (json, expected) in cases {
            let task: Task = serde_json::from_str(json).unwrap();
            assert_eq!(task.subjective_difficulty(), expected, "{json}");
            assert_eq!(task.objective_difficulty(), DEFAULT_DIFFICULTY);
        }
    }

    #[test]
    fn title_is_trimmed_and_required() {
        assert_eq!(
            TaskDraft::new("   ").validate(),
            Err(ValidationError::EmptyTitle)
        );
        let task = TaskDraft::new("  gym  ").validate().unwrap();
        assert_eq!(task.title(), "gym");
    }

    #[test]
    fn title_length_counts_characters() {
        let twenty = "あ".repeat(20);
        assert!(TaskDraft::new(twenty).validate().is_ok());

        let err = TaskDraft::new("x".repeat(21)).validate().unwrap_err();
        assert_eq!(err, ValidationError::TitleTooLong { len: 21, max: 20 });
    }

    #[test]
    fn negative_duration_rejected() {
        let err = TaskDraft::new("run").with_duration(-1.0).validate().unwrap_err();
        assert!(matches!(err, ValidationError::NegativeDuration { .. }));

        let err = TaskDraft::new("run")
            .with_duration(f64::NAN)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDuration { .. }));
    }

    #[test]
    fn zero_duration_is_kept() {
        let task = TaskDraft::new("ping").with_duration(0.0).validate().unwrap();
        assert_eq!(task.duration_minutes(), 0.0);
    }

    #[test]
    fn difficulty_out_of_range_rejected() {
        let err = TaskDraft::new("run").with_subjective(11).validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::DifficultyOutOfRange {
                field: "subjective",
                value: 11
            }
        );
        assert!(TaskDraft::new("run").with_objective(0).validate().is_err());
    }

    #[test]
    fn blank_genre_falls_back() {
        let task = TaskDraft::new("read").with_genre("  ").validate().unwrap();
        assert_eq!(task.genre(), DEFAULT_GENRE);
        let task = TaskDraft::new("read").with_genre("study").validate().unwrap();
        assert_eq!(task.genre(), "study");
    }

    #[test]
    fn deserializes_legacy_field_names() {
        let json = r#"{"title":"old","deadline":"","genre":"misc","subjective":3,"objective":7,"duration":45}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.subjective_difficulty(), 3);
        assert_eq!(task.objective_difficulty(), 7);
        assert_eq!(task.duration_minutes(), 45.0);
        assert!(task.deadline().is_none());
    }

    #[test]
    fn deserializes_datetime_deadline_as_date() {
        let json = r#"{"title":"old","deadline":"2025-03-04T10:30"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.deadline(), NaiveDate::from_ymd_opt(2025, 3, 4));
        assert!(task.is_due_on(NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()));
    }
}
