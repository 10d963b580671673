//! Weighted evaluation totals.

use crate::domain::models::{DbCriterion, ScoreMap};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScoringError {
    #[error("unknown criterion id {0}")]
    UnknownCriterion(i32),
    #[error("score {score} for criterion {criterion} is outside 0-100")]
    ScoreOutOfRange { criterion: i32, score: f64 },
    #[error("total score {0} is outside 0-100")]
    TotalOutOfRange(f64),
}

/// Weight-normalized weighted average of per-criterion scores, rounded to
/// two decimal places. Every key in `scores` must name a known criterion;
/// a zero total weight yields 0.
pub fn weighted_total(scores: &ScoreMap, criteria: &[DbCriterion]) -> Result<f64, ScoringError> {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0i64;

    for (&criterion_id, &score) in scores {
        let criterion = criteria
            .iter()
            .find(|c| c.id == criterion_id)
            .ok_or(ScoringError::UnknownCriterion(criterion_id))?;

        if !score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(ScoringError::ScoreOutOfRange {
                criterion: criterion_id,
                score,
            });
        }

        weighted_sum += score * f64::from(criterion.weight);
        total_weight += i64::from(criterion.weight);
    }

    if total_weight == 0 {
        return Ok(0.0);
    }

    let total = weighted_sum / total_weight as f64;
    let total = (total * 100.0).round() / 100.0;

    if !(MIN_SCORE..=MAX_SCORE).contains(&total) {
        return Err(ScoringError::TotalOutOfRange(total));
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn criterion(id: i32, name: &str, weight: i16) -> DbCriterion {
        DbCriterion {
            id,
            name: name.into(),
            description: String::new(),
            weight,
        }
    }

    fn default_criteria() -> Vec<DbCriterion> {
        vec![
            criterion(1, "Greeting", 10),
            criterion(2, "Problem Understanding", 20),
            criterion(3, "Solution Offering", 30),
            criterion(4, "Communication Skills", 25),
            criterion(5, "Closing", 15),
        ]
    }

    #[test]
    fn weighted_average_matches_hand_computed_total() {
        let scores: ScoreMap =
            BTreeMap::from([(1, 90.0), (2, 80.0), (3, 70.0), (4, 85.0), (5, 95.0)]);
        let total = weighted_total(&scores, &default_criteria()).unwrap();
        assert!((total - 81.0).abs() < 0.01);
    }

    #[test]
    fn partial_score_map_normalizes_over_present_weights() {
        let scores: ScoreMap = BTreeMap::from([(2, 60.0), (3, 90.0)]);
        let total = weighted_total(&scores, &default_criteria()).unwrap();
        // (60*20 + 90*30) / 50
        assert!((total - 78.0).abs() < 0.01);
    }

    #[test]
    fn empty_scores_total_zero() {
        let scores = ScoreMap::new();
        assert_eq!(weighted_total(&scores, &default_criteria()).unwrap(), 0.0);
    }

    #[test]
    fn unknown_criterion_rejected() {
        let scores: ScoreMap = BTreeMap::from([(99, 80.0)]);
        assert_eq!(
            weighted_total(&scores, &default_criteria()),
            Err(ScoringError::UnknownCriterion(99))
        );
    }

    #[test]
    fn out_of_range_score_rejected() {
        let scores: ScoreMap = BTreeMap::from([(1, 120.0)]);
        assert_eq!(
            weighted_total(&scores, &default_criteria()),
            Err(ScoringError::ScoreOutOfRange {
                criterion: 1,
                score: 120.0
            })
        );

        let scores: ScoreMap = BTreeMap::from([(1, -5.0)]);
        assert!(matches!(
            weighted_total(&scores, &default_criteria()),
            Err(ScoringError::ScoreOutOfRange { .. })
        ));
    }

    #[test]
    fn result_rounds_to_two_decimals() {
        let criteria = vec![criterion(1, "A", 3), criterion(2, "B", 3), criterion(3, "C", 3)];
        let scores: ScoreMap = BTreeMap::from([(1, 100.0), (2, 100.0), (3, 50.0)]);
        let total = weighted_total(&scores, &criteria).unwrap();
        // 250/3 = 83.333..., rounded
        assert_eq!(total, 83.33);
    }
}
