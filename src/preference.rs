use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};

use crate::config::RankOrder;
use crate::data::{Rank, StudentId, StudentInterest, ThemeId};
use crate::scoring::SuitabilityScores;

/// A theme a student both ranked and has a suitability score for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub theme_id: ThemeId,
    pub suitability: f64,
    pub rank: Rank,
}

/// Every declared interest, scored or not, keyed by student then theme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredInterests {
    by_student: BTreeMap<StudentId, BTreeMap<ThemeId, Rank>>,
}

impl DeclaredInterests {
    pub fn new(interests: &[StudentInterest]) -> Self {
        let mut by_student: BTreeMap<StudentId, BTreeMap<ThemeId, Rank>> = BTreeMap::new();
        for interest in interests {
            by_student
                .entry(interest.student_id)
                .or_default()
                .insert(interest.theme_id, interest.rank);
        }
        Self { by_student }
    }

    pub fn rank(&self, student_id: StudentId, theme_id: ThemeId) -> Option<Rank> {
        self.by_student.get(&student_id)?.get(&theme_id).copied()
    }

    /// Declared themes of a student in theme id order.
    pub fn themes(&self, student_id: StudentId) -> impl Iterator<Item = (ThemeId, Rank)> + '_ {
        self.by_student
            .get(&student_id)
            .into_iter()
            .flat_map(|themes| themes.iter().map(|(&theme, &rank)| (theme, rank)))
    }

    pub fn has_any(&self, student_id: StudentId) -> bool {
        self.by_student
            .get(&student_id)
            .is_some_and(|themes| !themes.is_empty())
    }
}

/// Candidates grouped per student in preference order, mirrored per theme.
#[derive(Debug, Clone, Default)]
pub struct CandidateTable {
    by_student: BTreeMap<StudentId, Vec<Candidate>>,
    by_theme: BTreeMap<ThemeId, Vec<(StudentId, f64)>>,
}

impl CandidateTable {
    /// Joins scores with declared ranks, dropping pairs without declared interest.
    ///
    /// Per student, candidates are ordered by rank (per `order`), then by
    /// suitability descending, then by theme id. Per theme, contenders are
    /// ordered by suitability descending, then by student id.
    pub fn link(scores: &SuitabilityScores, interests: &DeclaredInterests, order: RankOrder) -> Self {
        let linked = scores
            .iter()
            .filter_map(|(theme_id, student_id, suitability)| {
                interests.rank(student_id, theme_id).map(|rank| {
                    (
                        student_id,
                        Candidate {
                            theme_id,
                            suitability,
                            rank,
                        },
                    )
                })
            })
            .collect_vec();

        let by_theme = linked
            .iter()
            .map(|(student_id, c)| (c.theme_id, (*student_id, c.suitability)))
            .into_group_map()
            .into_iter()
            .map(|(theme_id, contenders)| {
                let contenders = contenders
                    .into_iter()
                    .sorted_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)))
                    .collect_vec();
                (theme_id, contenders)
            })
            .collect();

        let grouped: HashMap<StudentId, Vec<Candidate>> = linked.into_iter().into_group_map();
        let by_student = grouped
            .into_iter()
            .map(|(student_id, candidates)| {
                let candidates = candidates
                    .into_iter()
                    .sorted_by(|a, b| {
                        order
                            .compare(a.rank, b.rank)
                            .then(b.suitability.total_cmp(&a.suitability))
                            .then(a.theme_id.cmp(&b.theme_id))
                    })
                    .collect_vec();
                (student_id, candidates)
            })
            .collect();

        Self { by_student, by_theme }
    }

    /// Candidates of a student, most preferred first.
    pub fn candidates(&self, student_id: StudentId) -> &[Candidate] {
        self.by_student
            .get(&student_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Students interested in a theme, strongest first.
    pub fn contenders(&self, theme_id: ThemeId) -> &[(StudentId, f64)] {
        self.by_theme
            .get(&theme_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Students with at least one candidate, in id order.
    pub fn students(&self) -> impl Iterator<Item = StudentId> + '_ {
        self.by_student.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_student.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_student.is_empty()
    }
}
