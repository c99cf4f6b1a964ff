use itertools::Itertools;
use log::trace;
use std::collections::{BTreeMap, HashMap};

use crate::data::{StudentId, StudentSubjectGrade, SubjectId, ThemeId, ThemeSubjectImportance};

/// Normalized 0..=100 suitability per (theme, student).
///
/// Only pairs where the student holds at least one grade in a subject weighted
/// for the theme are present; absent pairs are not zero, they are unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuitabilityScores {
    scores: BTreeMap<(ThemeId, StudentId), f64>,
}

impl SuitabilityScores {
    pub fn compute(
        importances: &[ThemeSubjectImportance],
        grades: &[StudentSubjectGrade],
        max_grade: f64,
    ) -> Self {
        // later facts overwrite earlier ones for the same key
        let mut theme_weights: BTreeMap<ThemeId, BTreeMap<SubjectId, f64>> = BTreeMap::new();
        for importance in importances {
            theme_weights
                .entry(importance.theme_id)
                .or_default()
                .insert(importance.subject_id, importance.weight);
        }

        let mut student_grades: BTreeMap<StudentId, HashMap<SubjectId, f64>> = BTreeMap::new();
        for record in grades {
            student_grades
                .entry(record.student_id)
                .or_default()
                .insert(record.subject_id, record.grade);
        }

        let mut scores = BTreeMap::new();
        for (theme_id, weights) in &theme_weights {
            // weights scaled to the heaviest and grades to max_grade keep every sum finite
            let heaviest = weights.values().copied().fold(0.0, f64::max);
            let scale = if heaviest > 0.0 { heaviest } else { 1.0 };
            let normalizer: f64 = weights.values().map(|w| w / scale).sum();

            for (student_id, graded) in &student_grades {
                let relevant = weights
                    .iter()
                    .filter_map(|(subject_id, weight)| {
                        graded.get(subject_id).map(|g| (weight / scale) * (g / max_grade))
                    })
                    .collect_vec();
                if relevant.is_empty() {
                    continue;
                }

                let raw: f64 = relevant.iter().sum();
                let score = if normalizer > 0.0 {
                    round_to_hundredths(100.0 * raw / normalizer)
                } else {
                    0.0
                };
                scores.insert((*theme_id, *student_id), score);
            }
        }

        trace!(
            "Computed {} suitability scores over {} weighted themes and {} graded students.",
            scores.len(),
            theme_weights.len(),
            student_grades.len()
        );

        Self { scores }
    }

    pub fn get(&self, theme_id: ThemeId, student_id: StudentId) -> Option<f64> {
        self.scores.get(&(theme_id, student_id)).copied()
    }

    /// Entries in (theme, student) order.
    pub fn iter(&self) -> impl Iterator<Item = (ThemeId, StudentId, f64)> + '_ {
        self.scores.iter().map(|(&(theme, student), &score)| (theme, student, score))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight(theme_id: ThemeId, subject_id: SubjectId, weight: f64) -> ThemeSubjectImportance {
        ThemeSubjectImportance { theme_id, subject_id, weight }
    }

    fn grade(student_id: StudentId, subject_id: SubjectId, grade: f64) -> StudentSubjectGrade {
        StudentSubjectGrade { student_id, subject_id, grade }
    }

    #[test]
    fn weighted_average_is_normalized_to_percent() {
        let scores = SuitabilityScores::compute(
            &[weight(1, 1, 0.8), weight(1, 2, 0.2)],
            &[grade(1, 1, 5.0), grade(1, 2, 4.0)],
            5.0,
        );
        // (0.8*5 + 0.2*4) / (1.0*5) = 0.96
        assert_eq!(scores.get(1, 1), Some(96.0));
    }

    #[test]
    fn missing_grades_count_as_zero_contribution() {
        let scores = SuitabilityScores::compute(
            &[weight(1, 1, 0.5), weight(1, 2, 0.5)],
            &[grade(7, 1, 5.0)],
            5.0,
        );
        assert_eq!(scores.get(1, 7), Some(50.0));
    }

    #[test]
    fn ungraded_student_gets_no_entry() {
        let scores = SuitabilityScores::compute(
            &[weight(1, 1, 1.0)],
            &[grade(7, 2, 5.0)],
            5.0,
        );
        assert_eq!(scores.get(1, 7), None);
        assert!(scores.is_empty());
    }

    #[test]
    fn zero_weights_yield_zero_score() {
        let scores = SuitabilityScores::compute(&[weight(3, 1, 0.0)], &[grade(2, 1, 4.0)], 5.0);
        assert_eq!(scores.get(3, 2), Some(0.0));
    }

    #[test]
    fn rounds_to_two_decimals() {
        let scores = SuitabilityScores::compute(
            &[weight(1, 1, 1.0), weight(1, 2, 2.0)],
            &[grade(1, 1, 4.0), grade(1, 2, 3.0)],
            5.0,
        );
        // (4 + 6) / 15 = 66.666..
        assert_eq!(scores.get(1, 1), Some(66.67));
    }

    #[test]
    fn huge_weights_still_give_finite_scores() {
        let scores = SuitabilityScores::compute(
            &[weight(1, 1, 1e308), weight(1, 2, 1e308)],
            &[grade(1, 1, 5.0), grade(1, 2, 5.0), grade(2, 1, 5.0)],
            5.0,
        );
        assert_eq!(scores.get(1, 1), Some(100.0));
        assert_eq!(scores.get(1, 2), Some(50.0));
    }

    #[test]
    fn last_duplicate_fact_wins() {
        let scores = SuitabilityScores::compute(
            &[weight(1, 1, 1.0)],
            &[grade(1, 1, 2.0), grade(1, 1, 5.0)],
            5.0,
        );
        assert_eq!(scores.get(1, 1), Some(100.0));
    }
}
