use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::SolverConfig;
use crate::error::SolverError;

// Type aliases for clarity
pub type StudentId = u32;
pub type AdviserId = u32;
pub type ThemeId = u32;
pub type SubjectId = u32;
pub type Rank = u32;

/// A member of the cohort. Everything else about a student lives outside the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Student {
    pub id: StudentId,
}

/// An adviser with the number of places offered for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Adviser {
    pub id: AdviserId,
    pub capacity: u32,
}

/// Eligibility link: the adviser may supervise the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviserTheme {
    pub adviser_id: AdviserId,
    pub theme_id: ThemeId,
}

/// How much a subject matters for a theme.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSubjectImportance {
    pub theme_id: ThemeId,
    pub subject_id: SubjectId,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubjectGrade {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub grade: f64,
}

/// A declared interest of a student in a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInterest {
    pub student_id: StudentId,
    pub theme_id: ThemeId,
    #[serde(alias = "interestLevel")]
    pub rank: Rank,
}

/// One immutable snapshot handed over by the storage boundary.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionInput {
    pub students: Vec<Student>,
    pub advisers: Vec<Adviser>,
    #[serde(default)]
    pub adviser_themes: Vec<AdviserTheme>,
    #[serde(default)]
    pub theme_subject_importances: Vec<ThemeSubjectImportance>,
    #[serde(default)]
    pub student_subject_grades: Vec<StudentSubjectGrade>,
    #[serde(default)]
    pub student_interests: Vec<StudentInterest>,
}

impl DistributionInput {
    /// Rejects snapshots the solver cannot trust. Themes without weights and
    /// students without relevant grades are tolerated and handled downstream.
    pub fn validate(&self, config: &SolverConfig) -> Result<(), SolverError> {
        if !config.max_grade.is_finite() || config.max_grade <= 0.0 {
            return Err(SolverError::InvalidMaxGrade(config.max_grade));
        }

        let students: BTreeSet<StudentId> = self.students.iter().map(|s| s.id).collect();

        let mut advisers = BTreeSet::new();
        for adviser in &self.advisers {
            if !advisers.insert(adviser.id) {
                return Err(SolverError::DuplicateAdviser(adviser.id));
            }
        }

        for link in &self.adviser_themes {
            if !advisers.contains(&link.adviser_id) {
                return Err(SolverError::UnknownLinkedAdviser {
                    adviser_id: link.adviser_id,
                    theme_id: link.theme_id,
                });
            }
        }

        for importance in &self.theme_subject_importances {
            if !importance.weight.is_finite() || importance.weight < 0.0 {
                return Err(SolverError::InvalidWeight {
                    theme_id: importance.theme_id,
                    subject_id: importance.subject_id,
                    weight: importance.weight,
                });
            }
        }

        for record in &self.student_subject_grades {
            if !students.contains(&record.student_id) {
                return Err(SolverError::UnknownStudent(record.student_id));
            }
            if !record.grade.is_finite() || record.grade < 0.0 || record.grade > config.max_grade {
                return Err(SolverError::InvalidGrade {
                    student_id: record.student_id,
                    subject_id: record.subject_id,
                    grade: record.grade,
                    max_grade: config.max_grade,
                });
            }
        }

        let mut declared = BTreeSet::new();
        let mut ranks = BTreeSet::new();
        for interest in &self.student_interests {
            if !students.contains(&interest.student_id) {
                return Err(SolverError::UnknownStudent(interest.student_id));
            }
            if interest.rank == 0 || interest.rank > config.max_rank {
                return Err(SolverError::RankOutOfRange {
                    student_id: interest.student_id,
                    theme_id: interest.theme_id,
                    rank: interest.rank,
                    max_rank: config.max_rank,
                });
            }
            if !declared.insert((interest.student_id, interest.theme_id)) {
                return Err(SolverError::DuplicateInterest {
                    student_id: interest.student_id,
                    theme_id: interest.theme_id,
                });
            }
            if !ranks.insert((interest.student_id, interest.rank)) {
                return Err(SolverError::DuplicateRank {
                    student_id: interest.student_id,
                    rank: interest.rank,
                });
            }
        }

        Ok(())
    }
}

/// Which part of the run produced an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlacementStage {
    /// Rank-ordered engine, possibly after evictions.
    Preference,
    /// Best effort over declared interests with spare capacity.
    Fallback,
    /// Any adviser with spare capacity, interest ignored.
    Overflow,
}

/// Represents a single (student, theme, adviser) assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub student_id: StudentId,
    pub theme_id: ThemeId,
    pub adviser_id: AdviserId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub interest_rank: Option<Rank>,
    pub stage: PlacementStage,
}

/// Why a student could not be placed, derived from the final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnassignedReason {
    NoDeclaredInterest,
    NoEligibleAdviser,
    AdvisersAtCapacity,
}

impl fmt::Display for UnassignedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnassignedReason::NoDeclaredInterest => write!(f, "no declared interest in any theme"),
            UnassignedReason::NoEligibleAdviser => {
                write!(f, "no adviser is eligible for any declared theme")
            }
            UnassignedReason::AdvisersAtCapacity => {
                write!(f, "every eligible adviser is at capacity")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignedStudent {
    pub student_id: StudentId,
    pub reason: UnassignedReason,
}

/// Remaining places of an adviser after the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviserCapacity {
    pub adviser_id: AdviserId,
    pub initial: u32,
    pub remaining: u32,
}

/// Per-student result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AssignmentOutcome {
    #[serde(rename_all = "camelCase")]
    Placed {
        theme_id: ThemeId,
        adviser_id: AdviserId,
        stage: PlacementStage,
    },
    Unassigned { reason: UnassignedReason },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSummary {
    pub total_students: usize,
    pub placed_by_preference: usize,
    pub placed_by_fallback: usize,
    pub placed_by_overflow: usize,
    pub unassigned: usize,
    pub evictions: usize,
    pub requeued: usize,
    /// Count of placements per satisfied interest rank.
    pub rank_histogram: BTreeMap<Rank, usize>,
}

/// The final output of the solver.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionOutput {
    pub assignments: Vec<Assignment>,
    pub unassigned: Vec<UnassignedStudent>,
    pub adviser_capacities: Vec<AdviserCapacity>,
    pub summary: DistributionSummary,
}

impl DistributionOutput {
    pub fn assignment_for(&self, student_id: StudentId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.student_id == student_id)
    }

    pub fn outcome_for(&self, student_id: StudentId) -> Option<AssignmentOutcome> {
        if let Some(assignment) = self.assignment_for(student_id) {
            return Some(AssignmentOutcome::Placed {
                theme_id: assignment.theme_id,
                adviser_id: assignment.adviser_id,
                stage: assignment.stage,
            });
        }
        self.unassigned
            .iter()
            .find(|u| u.student_id == student_id)
            .map(|u| AssignmentOutcome::Unassigned { reason: u.reason })
    }

    pub fn unassigned_ids(&self) -> BTreeSet<StudentId> {
        self.unassigned.iter().map(|u| u.student_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> DistributionInput {
        DistributionInput {
            students: vec![Student { id: 1 }, Student { id: 2 }],
            advisers: vec![Adviser { id: 10, capacity: 1 }],
            adviser_themes: vec![AdviserTheme { adviser_id: 10, theme_id: 100 }],
            theme_subject_importances: vec![ThemeSubjectImportance {
                theme_id: 100,
                subject_id: 7,
                weight: 0.5,
            }],
            student_subject_grades: vec![StudentSubjectGrade {
                student_id: 1,
                subject_id: 7,
                grade: 4.0,
            }],
            student_interests: vec![StudentInterest { student_id: 1, theme_id: 100, rank: 1 }],
        }
    }

    #[test]
    fn valid_snapshot_passes() {
        assert!(input().validate(&SolverConfig::default()).is_ok());
    }

    #[test]
    fn rejects_duplicate_adviser() {
        let mut input = input();
        input.advisers.push(Adviser { id: 10, capacity: 3 });
        assert!(matches!(
            input.validate(&SolverConfig::default()),
            Err(SolverError::DuplicateAdviser(10))
        ));
    }

    #[test]
    fn rejects_link_to_missing_adviser() {
        let mut input = input();
        input.adviser_themes.push(AdviserTheme { adviser_id: 11, theme_id: 100 });
        assert!(matches!(
            input.validate(&SolverConfig::default()),
            Err(SolverError::UnknownLinkedAdviser { adviser_id: 11, theme_id: 100 })
        ));
    }

    #[test]
    fn rejects_negative_weight_and_out_of_range_grade() {
        let mut negative = input();
        negative.theme_subject_importances[0].weight = -0.1;
        assert!(matches!(
            negative.validate(&SolverConfig::default()),
            Err(SolverError::InvalidWeight { .. })
        ));

        let mut high = input();
        high.student_subject_grades[0].grade = 5.5;
        assert!(matches!(
            high.validate(&SolverConfig::default()),
            Err(SolverError::InvalidGrade { .. })
        ));
    }

    #[test]
    fn rejects_rank_outside_bounds() {
        let mut input = input();
        input.student_interests[0].rank = 0;
        assert!(matches!(
            input.validate(&SolverConfig::default()),
            Err(SolverError::RankOutOfRange { rank: 0, .. })
        ));
        input.student_interests[0].rank = 6;
        assert!(matches!(
            input.validate(&SolverConfig::default()),
            Err(SolverError::RankOutOfRange { rank: 6, max_rank: 5, .. })
        ));
    }

    #[test]
    fn rejects_facts_about_students_outside_the_cohort() {
        let mut input = input();
        input.student_interests.push(StudentInterest { student_id: 9, theme_id: 100, rank: 2 });
        assert!(matches!(
            input.validate(&SolverConfig::default()),
            Err(SolverError::UnknownStudent(9))
        ));
    }

    #[test]
    fn rejects_repeated_interest_and_shared_rank() {
        let mut repeated = input();
        repeated.student_interests.push(StudentInterest { student_id: 1, theme_id: 100, rank: 2 });
        assert!(matches!(
            repeated.validate(&SolverConfig::default()),
            Err(SolverError::DuplicateInterest { student_id: 1, theme_id: 100 })
        ));

        let mut shared = input();
        shared.student_interests.push(StudentInterest { student_id: 1, theme_id: 200, rank: 1 });
        assert!(matches!(
            shared.validate(&SolverConfig::default()),
            Err(SolverError::DuplicateRank { student_id: 1, rank: 1 })
        ));

        // the same rank across different students is fine
        let mut other = input();
        other.student_interests.push(StudentInterest { student_id: 2, theme_id: 100, rank: 1 });
        assert!(other.validate(&SolverConfig::default()).is_ok());
    }

    #[test]
    fn rejects_unusable_max_grade() {
        let config = SolverConfig {
            max_grade: 0.0,
            ..SolverConfig::default()
        };
        assert!(matches!(input().validate(&config), Err(SolverError::InvalidMaxGrade(_))));
    }

    #[test]
    fn interest_level_alias_deserializes() {
        let interest: StudentInterest =
            serde_json::from_str(r#"{"studentId": 3, "themeId": 4, "interestLevel": 2}"#)
                .expect("alias accepted");
        assert_eq!(interest, StudentInterest { student_id: 3, theme_id: 4, rank: 2 });
    }

    #[test]
    fn outcome_is_tagged() {
        let outcome = AssignmentOutcome::Unassigned {
            reason: UnassignedReason::AdvisersAtCapacity,
        };
        let json = serde_json::to_value(outcome).expect("serializes");
        assert_eq!(json["kind"], "unassigned");
        assert_eq!(json["reason"], "advisersAtCapacity");
    }
}
