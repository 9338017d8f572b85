use indexmap::IndexSet;
use pawmatch_catalog::CandidateId;

/// The candidates a user has marked for matching.
///
/// Membership is independent of the page currently displayed,
/// a favorite stays selected after paging away from it.
/// Identifiers are kept in the order they were first added,
/// which is the order they are submitted for matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoritesLedger {
    ids: IndexSet<CandidateId>,
}

impl FavoritesLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` if absent, remove it if present.
    ///
    /// Returns whether `id` is a favorite afterwards.
    pub fn toggle(&mut self, id: CandidateId) -> bool {
        if self.ids.shift_remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn is_favorite(&self, id: &CandidateId) -> bool {
        self.ids.contains(id)
    }

    /// All favorites in insertion order.
    pub fn all(&self) -> Vec<CandidateId> {
        self.ids.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
