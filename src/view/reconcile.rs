//! Incremental reconciliation of rendered lists against canonical entity lists.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// A rendered element built from an entity of type `Source`.
pub trait Element: Sized {
    type Key: Copy + Eq + Hash + fmt::Debug;
    type Source;

    fn source_key(source: &Self::Source) -> Self::Key;

    /// Build a fresh element. `serial` is unique within its list.
    fn build(source: &Self::Source, serial: u64) -> Self;

    fn key(&self) -> Self::Key;

    /// Copy the mutable display fields from `source`. Returns whether anything changed.
    fn patch(&mut self, source: &Self::Source) -> bool;
}

/// Display state of a rendered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum ListState {
    /// Nothing loaded yet.
    Loading,
    Ready,
    /// The canonical list is empty.
    Empty,
    /// Inline error shown in place of the list.
    Error(String),
}

/// What a reconciliation pass changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport<K> {
    pub created: Vec<K>,
    pub patched: Vec<K>,
    pub removed: Vec<K>,
    pub unchanged: usize,
    /// The list was built from scratch (first load or recovery from an error).
    pub rebuilt: bool,
}

impl<K> Default for ReconcileReport<K> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            patched: Vec::new(),
            removed: Vec::new(),
            unchanged: 0,
            rebuilt: false,
        }
    }
}

/// Ordered list of rendered elements.
#[derive(Debug)]
pub struct ElementList<E> {
    elements: Vec<E>,
    state: ListState,
    next_serial: u64,
}

impl<E: Element> Default for ElementList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element> ElementList<E> {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            state: ListState::Loading,
            next_serial: 1,
        }
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.elements.iter()
    }

    pub fn keys(&self) -> Vec<E::Key> {
        self.elements.iter().map(E::key).collect()
    }

    pub fn get(&self, key: E::Key) -> Option<&E> {
        self.elements.iter().find(|e| e.key() == key)
    }

    pub fn contains(&self, key: E::Key) -> bool {
        self.get(key).is_some()
    }

    /// Bring the list in line with `sources`.
    ///
    /// Elements whose key disappeared are passed to `on_remove` and then
    /// dropped, surviving elements are patched in place, and new keys are
    /// appended in source order. Only a list that is still loading or showing
    /// an error is rebuilt from scratch.
    pub fn reconcile<F>(&mut self, sources: &[E::Source], mut on_remove: F) -> ReconcileReport<E::Key>
    where
        F: FnMut(E::Key),
    {
        if matches!(self.state, ListState::Loading | ListState::Error(_)) {
            return self.rebuild(sources, on_remove);
        }

        let mut report = ReconcileReport::default();
        let mut wanted = HashSet::with_capacity(sources.len());
        for source in sources {
            wanted.insert(E::source_key(source));
        }

        self.elements.retain(|element| {
            let key = element.key();
            if wanted.contains(&key) {
                true
            } else {
                on_remove(key);
                report.removed.push(key);
                false
            }
        });

        let mut seen = HashSet::with_capacity(sources.len());
        for source in sources {
            let key = E::source_key(source);
            if !seen.insert(key) {
                continue;
            }

            match self.elements.iter_mut().find(|e| e.key() == key) {
                Some(element) => {
                    if element.patch(source) {
                        report.patched.push(key);
                    } else {
                        report.unchanged += 1;
                    }
                }
                None => {
                    let element = E::build(source, self.take_serial());
                    self.elements.push(element);
                    report.created.push(key);
                }
            }
        }

        self.settle_state();
        report
    }

    /// Replace the whole list, passing every existing key to `on_remove` first.
    pub fn rebuild<F>(&mut self, sources: &[E::Source], mut on_remove: F) -> ReconcileReport<E::Key>
    where
        F: FnMut(E::Key),
    {
        let mut report = ReconcileReport {
            rebuilt: true,
            ..Default::default()
        };

        for element in self.elements.drain(..) {
            let key = element.key();
            on_remove(key);
            report.removed.push(key);
        }

        let mut seen = HashSet::with_capacity(sources.len());
        for source in sources {
            let key = E::source_key(source);
            if seen.insert(key) {
                let element = E::build(source, self.take_serial());
                self.elements.push(element);
                report.created.push(key);
            }
        }

        self.settle_state();
        report
    }

    /// Remove one element, passing its key to `on_remove` first.
    pub fn remove<F>(&mut self, key: E::Key, on_remove: F) -> Option<E>
    where
        F: FnOnce(E::Key),
    {
        let index = self.elements.iter().position(|e| e.key() == key)?;
        on_remove(key);
        let element = self.elements.remove(index);
        self.settle_state();
        Some(element)
    }

    /// Remove every element, passing each key to `on_remove` first.
    pub fn clear<F>(&mut self, mut on_remove: F)
    where
        F: FnMut(E::Key),
    {
        for element in self.elements.drain(..) {
            on_remove(element.key());
        }
    }

    /// Record a failed listing.
    ///
    /// A list that already shows elements keeps them; otherwise the message
    /// replaces the list until the next successful pass.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.elements.is_empty() {
            self.state = ListState::Error(message.into());
        }
    }

    fn take_serial(&mut self) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        serial
    }

    fn settle_state(&mut self) {
        self.state = if self.elements.is_empty() {
            ListState::Empty
        } else {
            ListState::Ready
        };
    }
}
