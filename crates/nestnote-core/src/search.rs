//! Substring search over note content
//!
//! Results are computed from the store on every call. There is no
//! persisted index to fall out of date.

use crate::storage::{NoteStore, StorageResult};

/// Search view over a `NoteStore`
pub struct SearchIndex<'a> {
    store: &'a NoteStore,
}

impl<'a> SearchIndex<'a> {
    pub fn new(store: &'a NoteStore) -> Self {
        Self { store }
    }

    /// Titles of notes whose content contains `term`
    ///
    /// Matching is a case-sensitive literal substring test and results keep
    /// storage order. An empty term means no search was performed, so the
    /// full unfiltered listing is returned.
    pub fn search(&self, term: &str) -> StorageResult<Vec<String>> {
        if term.is_empty() {
            return self.store.list_titles();
        }

        let titles = self
            .store
            .entries()?
            .into_iter()
            .filter(|note| note.content.contains(term))
            .map(|note| note.title)
            .collect();
        Ok(titles)
    }
}
