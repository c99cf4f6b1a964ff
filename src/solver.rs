use itertools::Itertools;
use log::{info, trace};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::capacity::CapacityLedger;
use crate::config::{ProcessingOrder, SolverConfig};
use crate::data::{DistributionInput, DistributionOutput, StudentId};
use crate::eligibility::EligibilityIndex;
use crate::engine::AssignmentEngine;
use crate::error::SolverError;
use crate::fallback::FallbackResolver;
use crate::preference::{CandidateTable, DeclaredInterests};
use crate::report::ResultEmitter;
use crate::scoring::SuitabilityScores;

/// Distributes a cohort over (theme, adviser) pairs.
///
/// Pure and deterministic: the same snapshot and config always produce the
/// same output. Capacity exhaustion is not an error; students who cannot be
/// placed are reported with a reason.
pub fn solve(input: &DistributionInput, config: &SolverConfig) -> Result<DistributionOutput, SolverError> {
    let start_time = Instant::now();
    input.validate(config)?;

    info!(
        "Distributing {} students over {} advisers and {} eligibility links...",
        input.students.len(),
        input.advisers.len(),
        input.adviser_themes.len()
    );

    let scores = SuitabilityScores::compute(
        &input.theme_subject_importances,
        &input.student_subject_grades,
        config.max_grade,
    );
    let interests = DeclaredInterests::new(&input.student_interests);
    let candidates = CandidateTable::link(&scores, &interests, config.rank_order);
    trace!(
        "Linked {} of {} suitability scores with declared interests.",
        candidates.len(),
        scores.len()
    );

    let ledger = CapacityLedger::from_advisers(&input.advisers)?;
    let eligibility = EligibilityIndex::build(&input.adviser_themes, &ledger)?;
    info!("{} places offered in total.", ledger.total_remaining());

    let order = processing_order(input, &candidates, config.processing_order);
    let outcome = AssignmentEngine::new(&candidates, &eligibility, ledger, config.adviser_selection)
        .run(order)?;
    info!(
        "Engine placed {} students ({} evictions).",
        outcome.placements.len(),
        outcome.stats.evictions
    );

    let cohort: BTreeSet<StudentId> = input.students.iter().map(|s| s.id).collect();
    let leftovers = cohort
        .iter()
        .copied()
        .filter(|id| !outcome.placements.contains_key(id))
        .collect_vec();

    let mut ledger = outcome.ledger;
    let resolver = FallbackResolver::new(&eligibility, &interests, config.rank_order);
    let mut late = resolver.resolve(leftovers.iter().copied(), &mut ledger)?;
    if !late.is_empty() {
        info!("Fallback placed {} of {} leftover students.", late.len(), leftovers.len());
    }

    if config.place_overflow {
        let placed: BTreeSet<StudentId> = late.iter().map(|a| a.student_id).collect();
        let remaining = leftovers.into_iter().filter(|id| !placed.contains(id)).collect_vec();
        let overflow = resolver.place_overflow(remaining, &mut ledger)?;
        info!("Overflow placed {} students outside their declared themes.", overflow.len());
        late.extend(overflow);
    }

    let output = ResultEmitter::new(&eligibility, &interests).emit(
        &cohort,
        &outcome.placements,
        late,
        &ledger,
        &outcome.stats,
    );

    let duration = start_time.elapsed();
    info!(
        "Distribution finished in {:.2?}: {} assigned, {} unassigned.",
        duration,
        output.assignments.len(),
        output.unassigned.len()
    );
    Ok(output)
}

// students without candidates are skipped; the engine has nothing to try for them
fn processing_order(
    input: &DistributionInput,
    candidates: &CandidateTable,
    order: ProcessingOrder,
) -> Vec<StudentId> {
    match order {
        ProcessingOrder::StudentId => candidates.students().collect(),
        ProcessingOrder::Snapshot => input
            .students
            .iter()
            .map(|s| s.id)
            .unique()
            .filter(|&id| !candidates.candidates(id).is_empty())
            .collect(),
    }
}
