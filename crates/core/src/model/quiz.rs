use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Share of the total (in tenths) a learner must reach to pass a quiz.
const PASS_TENTHS: u64 = 7;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz total must be greater than zero (got {total})")]
    NonPositiveTotal { total: i64 },

    #[error("quiz score cannot be negative (got {score})")]
    NegativeScore { score: i64 },

    #[error("quiz score {score} exceeds total {total}")]
    ScoreExceedsTotal { score: i64, total: i64 },

    #[error("quiz total {total} is larger than supported")]
    TotalTooLarge { total: i64 },
}

/// Minimum score needed to pass a quiz with `total` questions: `ceil(total * 0.7)`.
///
/// Computed in integer arithmetic so boundaries such as `total = 10` land exactly on 7.
#[must_use]
pub fn pass_mark(total: u32) -> u32 {
    let mark = (u64::from(total) * PASS_TENTHS).div_ceil(10);
    // mark <= total, so it always fits back into u32
    u32::try_from(mark).unwrap_or(total)
}

/// `score / total * 100`, rounded to one decimal place.
#[must_use]
pub fn percentage(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let tenths = (f64::from(score) * 1000.0 / f64::from(total)).round();
    tenths / 10.0
}

/// Latest graded attempt at a module's quiz.
///
/// `percentage` and `passed` are derived from `score`/`total` at construction and
/// cannot be set independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PersistedQuizResult")]
pub struct QuizResult {
    score: u32,
    total: u32,
    percentage: f64,
    passed: bool,
    #[serde(rename = "timestamp")]
    taken_at: DateTime<Utc>,
}

/// Raw persisted shape; derived fields are recomputed on load.
#[derive(Deserialize)]
struct PersistedQuizResult {
    score: i64,
    total: i64,
    #[serde(rename = "timestamp")]
    taken_at: DateTime<Utc>,
}

impl TryFrom<PersistedQuizResult> for QuizResult {
    type Error = QuizError;

    fn try_from(raw: PersistedQuizResult) -> Result<Self, Self::Error> {
        Self::new(raw.score, raw.total, raw.taken_at)
    }
}

impl QuizResult {
    /// Grade an attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NonPositiveTotal` if `total <= 0`,
    /// `QuizError::NegativeScore` if `score < 0`,
    /// `QuizError::ScoreExceedsTotal` if `score > total`,
    /// and `QuizError::TotalTooLarge` if `total` does not fit in a `u32`.
    pub fn new(score: i64, total: i64, taken_at: DateTime<Utc>) -> Result<Self, QuizError> {
        if total <= 0 {
            return Err(QuizError::NonPositiveTotal { total });
        }
        if score < 0 {
            return Err(QuizError::NegativeScore { score });
        }
        if score > total {
            return Err(QuizError::ScoreExceedsTotal { score, total });
        }
        let total_u32 = u32::try_from(total).map_err(|_| QuizError::TotalTooLarge { total })?;
        // score <= total, so this cannot fail once total fits
        let score_u32 = u32::try_from(score).unwrap_or(total_u32);

        Ok(Self {
            score: score_u32,
            total: total_u32,
            percentage: percentage(score_u32, total_u32),
            passed: score_u32 >= pass_mark(total_u32),
            taken_at,
        })
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn pass_mark_rounds_up() {
        assert_eq!(pass_mark(10), 7);
        assert_eq!(pass_mark(3), 3);
        assert_eq!(pass_mark(5), 4);
        assert_eq!(pass_mark(4), 3);
        assert_eq!(pass_mark(1), 1);
        assert_eq!(pass_mark(20), 14);
    }

    #[test]
    fn even_total_boundary() {
        let now = fixed_now();
        assert!(QuizResult::new(7, 10, now).unwrap().passed());
        assert!(!QuizResult::new(6, 10, now).unwrap().passed());
    }

    #[test]
    fn odd_total_boundary() {
        let now = fixed_now();
        assert!(!QuizResult::new(2, 3, now).unwrap().passed());
        assert!(QuizResult::new(3, 3, now).unwrap().passed());
        assert!(QuizResult::new(4, 5, now).unwrap().passed());
        assert!(!QuizResult::new(3, 5, now).unwrap().passed());
    }

    #[test]
    fn percentage_has_one_decimal() {
        let now = fixed_now();
        assert_eq!(QuizResult::new(4, 5, now).unwrap().percentage(), 80.0);
        assert_eq!(QuizResult::new(1, 3, now).unwrap().percentage(), 33.3);
        assert_eq!(QuizResult::new(2, 3, now).unwrap().percentage(), 66.7);
        assert_eq!(QuizResult::new(0, 7, now).unwrap().percentage(), 0.0);
    }

    #[test]
    fn rejects_invalid_scores() {
        let now = fixed_now();
        assert_eq!(
            QuizResult::new(1, 0, now),
            Err(QuizError::NonPositiveTotal { total: 0 })
        );
        assert_eq!(
            QuizResult::new(-1, 5, now),
            Err(QuizError::NegativeScore { score: -1 })
        );
        assert_eq!(
            QuizResult::new(6, 5, now),
            Err(QuizError::ScoreExceedsTotal { score: 6, total: 5 })
        );
    }

    #[test]
    fn oversized_total_is_reported_as_such() {
        let now = fixed_now();
        assert_eq!(
            QuizResult::new(1, 5_000_000_000, now),
            Err(QuizError::TotalTooLarge {
                total: 5_000_000_000
            })
        );
        let max = i64::from(u32::MAX);
        assert!(QuizResult::new(max, max, now).unwrap().passed());
    }

    #[test]
    fn deserialize_recomputes_derived_fields() {
        let json = r#"{"score":2,"total":3,"percentage":100.0,"passed":true,"timestamp":"2023-11-14T22:13:20Z"}"#;
        let result: QuizResult = serde_json::from_str(json).unwrap();
        assert!(!result.passed());
        assert_eq!(result.percentage(), 66.7);
        assert_eq!(result.taken_at(), fixed_now());
    }
}
