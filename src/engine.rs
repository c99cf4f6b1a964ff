use log::{debug, trace};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, VecDeque};

use crate::capacity::CapacityLedger;
use crate::config::AdviserSelection;
use crate::data::{AdviserId, Rank, StudentId, ThemeId};
use crate::eligibility::EligibilityIndex;
use crate::error::SolverError;
use crate::preference::{Candidate, CandidateTable};

/// A student holding a place on a theme.
///
/// Seats order by strength: higher suitability is stronger, and on equal
/// suitability the lower student id is stronger.
#[derive(Debug, Clone, Copy)]
pub struct Seat {
    pub student_id: StudentId,
    pub suitability: f64,
}

impl Ord for Seat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.suitability
            .total_cmp(&other.suitability)
            .then_with(|| other.student_id.cmp(&self.student_id))
    }
}

impl PartialOrd for Seat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Seat {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Seat {}

/// Seats held on one theme; the weakest one is always at hand.
#[derive(Debug, Clone, Default)]
pub struct ThemeQueue {
    seats: BinaryHeap<Reverse<Seat>>,
}

impl ThemeQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seats: BinaryHeap::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, seat: Seat) {
        self.seats.push(Reverse(seat));
    }

    pub fn pop_weakest(&mut self) -> Option<Seat> {
        self.seats.pop().map(|Reverse(seat)| seat)
    }

    pub fn weakest(&self) -> Option<&Seat> {
        self.seats.peek().map(|Reverse(seat)| seat)
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

/// Where the engine put a student.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub theme_id: ThemeId,
    pub adviser_id: AdviserId,
    pub suitability: f64,
    pub rank: Rank,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub evictions: usize,
    /// Requeue entries drained, including ones skipped as already placed.
    pub requeued: usize,
    pub evictions_by_student: BTreeMap<StudentId, usize>,
}

/// State left behind by a finished engine run.
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    pub placements: BTreeMap<StudentId, Placement>,
    pub ledger: CapacityLedger,
    pub queues: BTreeMap<ThemeId, ThemeQueue>,
    pub stats: EngineStats,
}

/// Greedy rank-ordered assignment with eviction on strict improvement.
pub struct AssignmentEngine<'a> {
    candidates: &'a CandidateTable,
    eligibility: &'a EligibilityIndex,
    selection: AdviserSelection,
    ledger: CapacityLedger,
    queues: BTreeMap<ThemeId, ThemeQueue>,
    placements: BTreeMap<StudentId, Placement>,
    requeue: VecDeque<StudentId>,
    stats: EngineStats,
}

impl<'a> AssignmentEngine<'a> {
    pub fn new(
        candidates: &'a CandidateTable,
        eligibility: &'a EligibilityIndex,
        ledger: CapacityLedger,
        selection: AdviserSelection,
    ) -> Self {
        Self {
            candidates,
            eligibility,
            selection,
            ledger,
            queues: BTreeMap::new(),
            placements: BTreeMap::new(),
            requeue: VecDeque::new(),
            stats: EngineStats::default(),
        }
    }

    /// Primary pass over `order`, then drains the requeue of displaced students.
    pub fn run<I>(mut self, order: I) -> Result<EngineOutcome, SolverError>
    where
        I: IntoIterator<Item = StudentId>,
    {
        for student_id in order {
            if self.placements.contains_key(&student_id) {
                continue;
            }
            if !self.place(student_id)? {
                trace!("Student {} found no seat in the primary pass.", student_id);
            }
        }
        debug!(
            "Primary pass placed {} students with {} evictions; {} queued for another try.",
            self.placements.len(),
            self.stats.evictions,
            self.requeue.len()
        );

        while let Some(student_id) = self.requeue.pop_front() {
            self.stats.requeued += 1;
            if self.placements.contains_key(&student_id) {
                continue;
            }
            if !self.place(student_id)? {
                trace!("Displaced student {} found no other seat.", student_id);
            }
        }

        Ok(EngineOutcome {
            placements: self.placements,
            ledger: self.ledger,
            queues: self.queues,
            stats: self.stats,
        })
    }

    // scans candidates most preferred first and stops at the first seat won
    fn place(&mut self, student_id: StudentId) -> Result<bool, SolverError> {
        let candidates = self.candidates;
        for candidate in candidates.candidates(student_id) {
            if self.try_assign(student_id, *candidate)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn try_assign(&mut self, student_id: StudentId, candidate: Candidate) -> Result<bool, SolverError> {
        let theme_id = candidate.theme_id;

        if let Some(adviser_id) = self.pick_adviser(theme_id) {
            self.ledger.reserve(adviser_id)?;
            self.seat(student_id, candidate, adviser_id);
            trace!(
                "Student {} takes theme {} with adviser {} (suitability {:.2}, rank {}).",
                student_id, theme_id, adviser_id, candidate.suitability, candidate.rank
            );
            return Ok(true);
        }

        let queue = self.queue(theme_id);
        let Some(&incumbent) = queue.weakest() else {
            return Ok(false);
        };
        // incomparable scores never evict
        if candidate.suitability.partial_cmp(&incumbent.suitability) != Some(Ordering::Greater) {
            return Ok(false);
        }
        queue.pop_weakest();

        let displaced = match self.placements.remove(&incumbent.student_id) {
            Some(placement) if placement.theme_id == theme_id => placement,
            _ => {
                return Err(SolverError::OrphanedSeat {
                    student_id: incumbent.student_id,
                    theme_id,
                });
            }
        };
        self.ledger.release(displaced.adviser_id)?;
        self.ledger.reserve(displaced.adviser_id)?;
        self.seat(student_id, candidate, displaced.adviser_id);

        self.stats.evictions += 1;
        *self
            .stats
            .evictions_by_student
            .entry(incumbent.student_id)
            .or_insert(0) += 1;
        self.requeue.push_back(incumbent.student_id);

        debug!(
            "Student {} ({:.2}) displaced student {} ({:.2}) on theme {} with adviser {}.",
            student_id,
            candidate.suitability,
            incumbent.student_id,
            incumbent.suitability,
            theme_id,
            displaced.adviser_id
        );
        Ok(true)
    }

    fn pick_adviser(&self, theme_id: ThemeId) -> Option<AdviserId> {
        let mut available = self.eligibility.available_for(theme_id, &self.ledger);
        match self.selection {
            AdviserSelection::LowestId => available.next(),
            AdviserSelection::LeastLoaded => {
                available.min_by_key(|&adviser_id| (self.ledger.load(adviser_id), adviser_id))
            }
        }
    }

    // a theme never seats more students than contend for it
    fn queue(&mut self, theme_id: ThemeId) -> &mut ThemeQueue {
        let candidates = self.candidates;
        self.queues
            .entry(theme_id)
            .or_insert_with(|| ThemeQueue::with_capacity(candidates.contenders(theme_id).len()))
    }

    fn seat(&mut self, student_id: StudentId, candidate: Candidate, adviser_id: AdviserId) {
        self.queue(candidate.theme_id).push(Seat {
            student_id,
            suitability: candidate.suitability,
        });
        self.placements.insert(
            student_id,
            Placement {
                theme_id: candidate.theme_id,
                adviser_id,
                suitability: candidate.suitability,
                rank: candidate.rank,
            },
        );
    }
}
