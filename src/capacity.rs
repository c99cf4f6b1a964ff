//! Capacity ledger
//! Run-owned copy of adviser places, mutated only through checked reserve/release.
use std::collections::BTreeMap;

use crate::data::{Adviser, AdviserCapacity, AdviserId};
use crate::error::SolverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Places {
    initial: u32,
    remaining: u32,
}

/// Keeps `0 <= remaining <= initial` for every adviser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapacityLedger {
    places: BTreeMap<AdviserId, Places>,
}

impl CapacityLedger {
    pub fn from_advisers(advisers: &[Adviser]) -> Result<Self, SolverError> {
        let mut places = BTreeMap::new();
        for adviser in advisers {
            let entry = Places {
                initial: adviser.capacity,
                remaining: adviser.capacity,
            };
            if places.insert(adviser.id, entry).is_some() {
                return Err(SolverError::DuplicateAdviser(adviser.id));
            }
        }
        Ok(Self { places })
    }

    pub fn contains(&self, adviser_id: AdviserId) -> bool {
        self.places.contains_key(&adviser_id)
    }

    pub fn remaining(&self, adviser_id: AdviserId) -> Option<u32> {
        self.places.get(&adviser_id).map(|p| p.remaining)
    }

    /// Seats already taken.
    pub fn load(&self, adviser_id: AdviserId) -> Option<u32> {
        self.places.get(&adviser_id).map(|p| p.initial - p.remaining)
    }

    pub fn has_room(&self, adviser_id: AdviserId) -> bool {
        self.remaining(adviser_id).is_some_and(|r| r > 0)
    }

    pub fn reserve(&mut self, adviser_id: AdviserId) -> Result<(), SolverError> {
        let places = self
            .places
            .get_mut(&adviser_id)
            .ok_or(SolverError::UnknownAdviser(adviser_id))?;
        if places.remaining == 0 {
            return Err(SolverError::CapacityExhausted(adviser_id));
        }
        places.remaining -= 1;
        Ok(())
    }

    pub fn release(&mut self, adviser_id: AdviserId) -> Result<(), SolverError> {
        let places = self
            .places
            .get_mut(&adviser_id)
            .ok_or(SolverError::UnknownAdviser(adviser_id))?;
        if places.remaining >= places.initial {
            return Err(SolverError::CapacityOverflow(adviser_id));
        }
        places.remaining += 1;
        Ok(())
    }

    /// Advisers with spare places, most remaining first, ties by lowest id.
    pub fn most_available(&self) -> impl Iterator<Item = (AdviserId, u32)> + '_ {
        let mut open: Vec<(AdviserId, u32)> = self
            .places
            .iter()
            .filter(|(_, p)| p.remaining > 0)
            .map(|(&id, p)| (id, p.remaining))
            .collect();
        open.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        open.into_iter()
    }

    pub fn total_remaining(&self) -> u64 {
        self.places.values().map(|p| u64::from(p.remaining)).sum()
    }

    pub fn snapshot(&self) -> Vec<AdviserCapacity> {
        self.places
            .iter()
            .map(|(&adviser_id, p)| AdviserCapacity {
                adviser_id,
                initial: p.initial,
                remaining: p.remaining,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> CapacityLedger {
        CapacityLedger::from_advisers(&[
            Adviser { id: 1, capacity: 2 },
            Adviser { id: 2, capacity: 0 },
            Adviser { id: 3, capacity: 2 },
        ])
        .expect("unique advisers")
    }

    #[test]
    fn reserve_and_release_stay_within_bounds() {
        let mut ledger = ledger();
        ledger.reserve(1).expect("first place");
        ledger.reserve(1).expect("second place");
        assert_eq!(ledger.reserve(1), Err(SolverError::CapacityExhausted(1)));
        assert_eq!(ledger.load(1), Some(2));

        ledger.release(1).expect("release one");
        ledger.release(1).expect("release two");
        assert_eq!(ledger.release(1), Err(SolverError::CapacityOverflow(1)));
        assert_eq!(ledger.remaining(1), Some(2));
    }

    #[test]
    fn unknown_adviser_is_an_error() {
        let mut ledger = ledger();
        assert_eq!(ledger.reserve(9), Err(SolverError::UnknownAdviser(9)));
        assert_eq!(ledger.release(9), Err(SolverError::UnknownAdviser(9)));
        assert!(!ledger.has_room(9));
    }

    #[test]
    fn most_available_orders_by_remaining_then_id() {
        let mut ledger = ledger();
        ledger.reserve(1).expect("place");
        let order: Vec<_> = ledger.most_available().collect();
        assert_eq!(order, vec![(3, 2), (1, 1)]);
    }

    #[test]
    fn total_remaining_does_not_overflow() {
        let ledger = CapacityLedger::from_advisers(&[
            Adviser { id: 1, capacity: u32::MAX },
            Adviser { id: 2, capacity: 1 },
        ])
        .expect("unique advisers");
        assert_eq!(ledger.total_remaining(), u64::from(u32::MAX) + 1);
    }

    #[test]
    fn duplicate_advisers_are_rejected() {
        let err = CapacityLedger::from_advisers(&[
            Adviser { id: 4, capacity: 1 },
            Adviser { id: 4, capacity: 1 },
        ])
        .expect_err("duplicate id");
        assert_eq!(err, SolverError::DuplicateAdviser(4));
    }
}
