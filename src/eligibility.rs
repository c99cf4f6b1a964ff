use std::collections::{BTreeMap, BTreeSet};

use crate::capacity::CapacityLedger;
use crate::data::{AdviserId, AdviserTheme, ThemeId};
use crate::error::SolverError;

/// Which advisers may supervise which themes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibilityIndex {
    advisers_by_theme: BTreeMap<ThemeId, BTreeSet<AdviserId>>,
    themes_by_adviser: BTreeMap<AdviserId, BTreeSet<ThemeId>>,
}

impl EligibilityIndex {
    /// Fails when a link points at an adviser the ledger does not know.
    pub fn build(links: &[AdviserTheme], ledger: &CapacityLedger) -> Result<Self, SolverError> {
        let mut index = Self::default();
        for link in links {
            if !ledger.contains(link.adviser_id) {
                return Err(SolverError::UnknownLinkedAdviser {
                    adviser_id: link.adviser_id,
                    theme_id: link.theme_id,
                });
            }
            index
                .advisers_by_theme
                .entry(link.theme_id)
                .or_default()
                .insert(link.adviser_id);
            index
                .themes_by_adviser
                .entry(link.adviser_id)
                .or_default()
                .insert(link.theme_id);
        }
        Ok(index)
    }

    pub fn is_eligible(&self, adviser_id: AdviserId, theme_id: ThemeId) -> bool {
        self.advisers_by_theme
            .get(&theme_id)
            .is_some_and(|advisers| advisers.contains(&adviser_id))
    }

    /// Eligible advisers of a theme in id order.
    pub fn advisers_for(&self, theme_id: ThemeId) -> impl Iterator<Item = AdviserId> + '_ {
        self.advisers_by_theme
            .get(&theme_id)
            .into_iter()
            .flat_map(|advisers| advisers.iter().copied())
    }

    /// Themes an adviser supervises in id order.
    pub fn themes_of(&self, adviser_id: AdviserId) -> impl Iterator<Item = ThemeId> + '_ {
        self.themes_by_adviser
            .get(&adviser_id)
            .into_iter()
            .flat_map(|themes| themes.iter().copied())
    }

    /// Eligible advisers of a theme that can still accept a student.
    pub fn available_for<'a>(
        &'a self,
        theme_id: ThemeId,
        ledger: &'a CapacityLedger,
    ) -> impl Iterator<Item = AdviserId> + 'a {
        self.advisers_for(theme_id)
            .filter(move |&adviser_id| ledger.has_room(adviser_id))
    }
}
