//! Element registry: the keyed, draw-ordered element collection and the
//! selection set that refers into it.
//!
//! Both containers are private so the one invariant that matters here holds
//! at all times: every selected id names a registered element. Removal and
//! clearing prune the selection in the same call.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::element::{Element, ElementId};

/// Registered elements in draw order, plus the current selection.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    elements: IndexMap<ElementId, Element>,
    selection: HashSet<ElementId>,
}

impl ElementRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an element. A replaced element keeps its place in draw order.
    pub fn add(&mut self, element: Element) -> &Element {
        let (index, _) = self.elements.insert_full(element.id.clone(), element);
        &self.elements[index]
    }

    /// Remove an element by id, dropping it from the selection. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<Element> {
        self.selection.remove(id);
        self.elements.shift_remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    /// Remove every element and empty the selection.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.selection.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in draw order (bottom first). Reverse it for topmost-first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Element> + ExactSizeIterator {
        self.elements.values()
    }

    // --- Selection ---

    /// Add `id` to the selection. Returns `false` if no such element is registered.
    pub fn select(&mut self, id: &str) -> bool {
        match self.elements.get_key_value(id) {
            Some((key, _)) => {
                self.selection.insert(key.clone());
                true
            }
            None => false,
        }
    }

    /// Select every registered element.
    pub fn select_all(&mut self) {
        self.selection = self.elements.keys().cloned().collect();
    }

    /// Empty the selection. Returns whether anything was selected.
    pub fn clear_selection(&mut self) -> bool {
        let had_selection = !self.selection.is_empty();
        self.selection.clear();
        had_selection
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    #[must_use]
    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    /// Selected ids in draw order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<ElementId> {
        self.elements
            .keys()
            .filter(|id| self.selection.contains(*id))
            .cloned()
            .collect()
    }

    /// Selected elements in draw order.
    pub fn selected(&self) -> impl Iterator<Item = &Element> {
        self.elements
            .values()
            .filter(|element| self.selection.contains(&element.id))
    }
}
