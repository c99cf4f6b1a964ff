use thiserror::Error;

use crate::config::ConfigError;
use crate::data::{AdviserId, Rank, StudentId, SubjectId, ThemeId};
use crate::repository::RepositoryError;

/// Errors raised by a distribution run.
///
/// Input variants reject a snapshot before any work is done; the remaining
/// variants are invariant violations and abort the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("adviser {0} appears more than once in the snapshot")]
    DuplicateAdviser(AdviserId),
    #[error("adviser {adviser_id} is linked to theme {theme_id} but missing from the snapshot")]
    UnknownLinkedAdviser {
        adviser_id: AdviserId,
        theme_id: ThemeId,
    },
    #[error("student {0} is referenced but missing from the cohort")]
    UnknownStudent(StudentId),
    #[error(
        "weight {weight} for theme {theme_id} and subject {subject_id} must be finite and non-negative"
    )]
    InvalidWeight {
        theme_id: ThemeId,
        subject_id: SubjectId,
        weight: f64,
    },
    #[error(
        "grade {grade} of student {student_id} in subject {subject_id} is outside 0..={max_grade}"
    )]
    InvalidGrade {
        student_id: StudentId,
        subject_id: SubjectId,
        grade: f64,
        max_grade: f64,
    },
    #[error("rank {rank} of student {student_id} for theme {theme_id} is outside 1..={max_rank}")]
    RankOutOfRange {
        student_id: StudentId,
        theme_id: ThemeId,
        rank: Rank,
        max_rank: Rank,
    },
    #[error("student {student_id} declares interest in theme {theme_id} more than once")]
    DuplicateInterest {
        student_id: StudentId,
        theme_id: ThemeId,
    },
    #[error("student {student_id} uses rank {rank} for more than one theme")]
    DuplicateRank { student_id: StudentId, rank: Rank },
    #[error("max grade {0} must be finite and positive")]
    InvalidMaxGrade(f64),
    #[error("adviser {0} is not present in the capacity ledger")]
    UnknownAdviser(AdviserId),
    #[error("adviser {0} has no remaining capacity to reserve")]
    CapacityExhausted(AdviserId),
    #[error("releasing a place of adviser {0} would exceed its initial capacity")]
    CapacityOverflow(AdviserId),
    #[error("student {student_id} holds a seat on theme {theme_id} without a matching placement")]
    OrphanedSeat {
        student_id: StudentId,
        theme_id: ThemeId,
    },
}

/// Top-level error of the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("solver error: {0}")]
    Solver(#[from] SolverError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
