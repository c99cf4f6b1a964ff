use log::warn;
use std::collections::{BTreeMap, BTreeSet};

use crate::capacity::CapacityLedger;
use crate::data::{
    Assignment, DistributionOutput, DistributionSummary, PlacementStage, StudentId,
    UnassignedReason, UnassignedStudent,
};
use crate::eligibility::EligibilityIndex;
use crate::engine::{EngineStats, Placement};
use crate::preference::DeclaredInterests;

/// Packages the end state of a run for the storage boundary.
pub struct ResultEmitter<'a> {
    eligibility: &'a EligibilityIndex,
    interests: &'a DeclaredInterests,
}

impl<'a> ResultEmitter<'a> {
    pub fn new(eligibility: &'a EligibilityIndex, interests: &'a DeclaredInterests) -> Self {
        Self {
            eligibility,
            interests,
        }
    }

    pub fn emit(
        &self,
        cohort: &BTreeSet<StudentId>,
        placements: &BTreeMap<StudentId, Placement>,
        late: Vec<Assignment>,
        ledger: &CapacityLedger,
        stats: &EngineStats,
    ) -> DistributionOutput {
        let mut assignments: Vec<Assignment> = placements
            .iter()
            .map(|(&student_id, placement)| Assignment {
                student_id,
                theme_id: placement.theme_id,
                adviser_id: placement.adviser_id,
                interest_rank: Some(placement.rank),
                stage: PlacementStage::Preference,
            })
            .chain(late)
            .collect();
        assignments.sort();

        let placed: BTreeSet<StudentId> = assignments.iter().map(|a| a.student_id).collect();
        let unassigned: Vec<UnassignedStudent> = cohort
            .iter()
            .copied()
            .filter(|student_id| !placed.contains(student_id))
            .map(|student_id| UnassignedStudent {
                student_id,
                reason: self.diagnose(student_id, ledger),
            })
            .collect();

        let mut summary = DistributionSummary {
            total_students: cohort.len(),
            unassigned: unassigned.len(),
            evictions: stats.evictions,
            requeued: stats.requeued,
            ..DistributionSummary::default()
        };
        for assignment in &assignments {
            match assignment.stage {
                PlacementStage::Preference => summary.placed_by_preference += 1,
                PlacementStage::Fallback => summary.placed_by_fallback += 1,
                PlacementStage::Overflow => summary.placed_by_overflow += 1,
            }
            if let Some(rank) = assignment.interest_rank {
                *summary.rank_histogram.entry(rank).or_insert(0) += 1;
            }
        }

        DistributionOutput {
            assignments,
            unassigned,
            adviser_capacities: ledger.snapshot(),
            summary,
        }
    }

    /// Re-derives why a student has no seat from eligibility and final capacities.
    pub fn diagnose(&self, student_id: StudentId, ledger: &CapacityLedger) -> UnassignedReason {
        if !self.interests.has_any(student_id) {
            return UnassignedReason::NoDeclaredInterest;
        }
        let eligible = self
            .interests
            .themes(student_id)
            .flat_map(|(theme_id, _)| self.eligibility.advisers_for(theme_id))
            .collect::<BTreeSet<_>>();
        if eligible.is_empty() {
            return UnassignedReason::NoEligibleAdviser;
        }
        if eligible.iter().any(|&adviser_id| ledger.has_room(adviser_id)) {
            warn!(
                "Student {} is unassigned although an eligible adviser has spare places.",
                student_id
            );
        }
        UnassignedReason::AdvisersAtCapacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Adviser, AdviserTheme, StudentInterest};

    #[test]
    fn emits_sorted_assignments_reasons_and_summary() {
        let mut ledger = CapacityLedger::from_advisers(&[
            Adviser { id: 1, capacity: 1 },
            Adviser { id: 2, capacity: 1 },
        ])
        .expect("ledger");
        let eligibility = EligibilityIndex::build(
            &[
                AdviserTheme { adviser_id: 1, theme_id: 10 },
                AdviserTheme { adviser_id: 2, theme_id: 20 },
            ],
            &ledger,
        )
        .expect("eligibility");
        let interests = DeclaredInterests::new(&[
            StudentInterest { student_id: 1, theme_id: 10, rank: 1 },
            StudentInterest { student_id: 2, theme_id: 20, rank: 2 },
            StudentInterest { student_id: 3, theme_id: 10, rank: 1 },
            StudentInterest { student_id: 4, theme_id: 99, rank: 1 },
        ]);
        ledger.reserve(1).expect("seat for 1");
        ledger.reserve(2).expect("seat for 2");

        let placements = BTreeMap::from([(
            1,
            Placement {
                theme_id: 10,
                adviser_id: 1,
                suitability: 80.0,
                rank: 1,
            },
        )]);
        let late = vec![Assignment {
            student_id: 2,
            theme_id: 20,
            adviser_id: 2,
            interest_rank: Some(2),
            stage: PlacementStage::Fallback,
        }];
        let cohort: BTreeSet<StudentId> = [1, 2, 3, 4, 5].into_iter().collect();
        let stats = EngineStats {
            evictions: 2,
            requeued: 2,
            ..EngineStats::default()
        };

        let output = ResultEmitter::new(&eligibility, &interests).emit(
            &cohort,
            &placements,
            late,
            &ledger,
            &stats,
        );

        assert_eq!(
            output.assignments.iter().map(|a| a.student_id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(
            output.unassigned,
            vec![
                UnassignedStudent { student_id: 3, reason: UnassignedReason::AdvisersAtCapacity },
                UnassignedStudent { student_id: 4, reason: UnassignedReason::NoEligibleAdviser },
                UnassignedStudent { student_id: 5, reason: UnassignedReason::NoDeclaredInterest },
            ]
        );
        assert_eq!(output.summary.total_students, 5);
        assert_eq!(output.summary.placed_by_preference, 1);
        assert_eq!(output.summary.placed_by_fallback, 1);
        assert_eq!(output.summary.unassigned, 3);
        assert_eq!(output.summary.evictions, 2);
        assert_eq!(output.summary.rank_histogram, BTreeMap::from([(1, 1), (2, 1)]));
        assert!(output.adviser_capacities.iter().all(|c| c.remaining == 0));
    }
}
