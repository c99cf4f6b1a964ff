use log::{debug, trace, warn};
use std::collections::BTreeSet;

use crate::capacity::CapacityLedger;
use crate::config::RankOrder;
use crate::data::{AdviserId, Assignment, PlacementStage, StudentId, ThemeId};
use crate::eligibility::EligibilityIndex;
use crate::error::SolverError;
use crate::preference::DeclaredInterests;

/// Best-effort placement of students the engine left without a seat.
///
/// Suitability plays no role here: a student may go to any adviser with
/// spare places who supervises one of the student's declared themes,
/// including themes the student was never graded for.
pub struct FallbackResolver<'a> {
    eligibility: &'a EligibilityIndex,
    interests: &'a DeclaredInterests,
    rank_order: RankOrder,
}

impl<'a> FallbackResolver<'a> {
    pub fn new(
        eligibility: &'a EligibilityIndex,
        interests: &'a DeclaredInterests,
        rank_order: RankOrder,
    ) -> Self {
        Self {
            eligibility,
            interests,
            rank_order,
        }
    }

    /// Places students in the given order; the ones missing from the result stay unassigned.
    pub fn resolve<I>(&self, students: I, ledger: &mut CapacityLedger) -> Result<Vec<Assignment>, SolverError>
    where
        I: IntoIterator<Item = StudentId>,
    {
        let mut placed = Vec::new();
        for student_id in students {
            let Some((adviser_id, theme_id)) = self.choose(student_id, ledger) else {
                trace!("No adviser with spare places for student {}.", student_id);
                continue;
            };
            ledger.reserve(adviser_id)?;
            debug!(
                "Fallback placed student {} on theme {} with adviser {}.",
                student_id, theme_id, adviser_id
            );
            placed.push(Assignment {
                student_id,
                theme_id,
                adviser_id,
                interest_rank: self.interests.rank(student_id, theme_id),
                stage: PlacementStage::Fallback,
            });
        }
        Ok(placed)
    }

    /// Places students with whichever adviser has the most spare places,
    /// on the lowest-id theme that adviser supervises. Declared interest is ignored.
    pub fn place_overflow<I>(
        &self,
        students: I,
        ledger: &mut CapacityLedger,
    ) -> Result<Vec<Assignment>, SolverError>
    where
        I: IntoIterator<Item = StudentId>,
    {
        let mut placed = Vec::new();
        for student_id in students {
            let choice = ledger.most_available().find_map(|(adviser_id, _)| {
                self.eligibility
                    .themes_of(adviser_id)
                    .next()
                    .map(|theme_id| (adviser_id, theme_id))
            });
            let Some((adviser_id, theme_id)) = choice else {
                warn!(
                    "Cannot place student {}: no adviser with a theme has spare places.",
                    student_id
                );
                continue;
            };
            ledger.reserve(adviser_id)?;
            debug!(
                "Overflow placed student {} on theme {} with adviser {}.",
                student_id, theme_id, adviser_id
            );
            placed.push(Assignment {
                student_id,
                theme_id,
                adviser_id,
                interest_rank: self.interests.rank(student_id, theme_id),
                stage: PlacementStage::Overflow,
            });
        }
        Ok(placed)
    }

    fn choose(&self, student_id: StudentId, ledger: &CapacityLedger) -> Option<(AdviserId, ThemeId)> {
        let advisers: BTreeSet<AdviserId> = self
            .interests
            .themes(student_id)
            .flat_map(|(theme_id, _)| self.eligibility.available_for(theme_id, ledger))
            .collect();

        // most spare places, ties by lowest id
        let adviser_id = advisers.into_iter().min_by(|&a, &b| {
            let spare = |id| ledger.remaining(id).unwrap_or(0);
            spare(b).cmp(&spare(a)).then(a.cmp(&b))
        })?;

        let theme_id = self
            .interests
            .themes(student_id)
            .filter(|&(theme_id, _)| self.eligibility.is_eligible(adviser_id, theme_id))
            .min_by(|a, b| self.rank_order.compare(a.1, b.1).then(a.0.cmp(&b.0)))
            .map(|(theme_id, _)| theme_id)?;

        Some((adviser_id, theme_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Adviser, AdviserTheme, StudentInterest};

    fn interests() -> DeclaredInterests {
        DeclaredInterests::new(&[
            StudentInterest { student_id: 1, theme_id: 10, rank: 2 },
            StudentInterest { student_id: 1, theme_id: 20, rank: 1 },
            StudentInterest { student_id: 2, theme_id: 30, rank: 1 },
            StudentInterest { student_id: 3, theme_id: 10, rank: 1 },
        ])
    }

    fn setup() -> (EligibilityIndex, CapacityLedger) {
        let ledger = CapacityLedger::from_advisers(&[
            Adviser { id: 1, capacity: 1 },
            Adviser { id: 2, capacity: 3 },
            Adviser { id: 3, capacity: 2 },
        ])
        .expect("ledger");
        let links = [
            AdviserTheme { adviser_id: 1, theme_id: 10 },
            AdviserTheme { adviser_id: 2, theme_id: 10 },
            AdviserTheme { adviser_id: 2, theme_id: 20 },
            AdviserTheme { adviser_id: 3, theme_id: 40 },
        ];
        let index = EligibilityIndex::build(&links, &ledger).expect("index");
        (index, ledger)
    }

    #[test]
    fn prefers_adviser_with_most_places_and_most_preferred_theme() {
        let (index, mut ledger) = setup();
        let interests = interests();
        let resolver = FallbackResolver::new(&index, &interests, RankOrder::Ascending);

        let placed = resolver.resolve([1], &mut ledger).expect("fallback");
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].adviser_id, 2);
        assert_eq!(placed[0].theme_id, 20);
        assert_eq!(placed[0].interest_rank, Some(1));
        assert_eq!(placed[0].stage, PlacementStage::Fallback);
        assert_eq!(ledger.remaining(2), Some(2));
    }

    #[test]
    fn leaves_students_without_eligible_advisers() {
        let (index, mut ledger) = setup();
        let interests = interests();
        let resolver = FallbackResolver::new(&index, &interests, RankOrder::Ascending);

        let placed = resolver.resolve([2, 4], &mut ledger).expect("fallback");
        assert!(placed.is_empty());
        assert_eq!(ledger.total_remaining(), 6);
    }

    #[test]
    fn same_state_gives_same_placements() {
        let (index, ledger) = setup();
        let interests = interests();
        let resolver = FallbackResolver::new(&index, &interests, RankOrder::Ascending);

        let mut first_ledger = ledger.clone();
        let mut second_ledger = ledger.clone();
        let first = resolver.resolve([1, 3], &mut first_ledger).expect("first");
        let second = resolver.resolve([1, 3], &mut second_ledger).expect("second");
        assert_eq!(first, second);
        assert_eq!(first_ledger, second_ledger);
    }

    #[test]
    fn overflow_ignores_declared_interest() {
        let (index, mut ledger) = setup();
        let interests = interests();
        let resolver = FallbackResolver::new(&index, &interests, RankOrder::Ascending);

        let placed = resolver.place_overflow([2], &mut ledger).expect("overflow");
        assert_eq!(placed[0].adviser_id, 2);
        assert_eq!(placed[0].theme_id, 10);
        assert_eq!(placed[0].interest_rank, None);
        assert_eq!(placed[0].stage, PlacementStage::Overflow);
    }

    #[test]
    fn overflow_stops_when_places_run_out() {
        let (index, mut ledger) = setup();
        let interests = interests();
        let resolver = FallbackResolver::new(&index, &interests, RankOrder::Ascending);

        let placed = resolver
            .place_overflow(1..=8, &mut ledger)
            .expect("overflow");
        assert_eq!(placed.len(), 6);
        assert_eq!(ledger.total_remaining(), 0);
    }
}
