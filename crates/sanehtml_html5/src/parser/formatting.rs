use crate::node::Namespace;
use crate::parser::tree_builder::TreeSink;
use log::trace;
use sanehtml_shared::node::NodeId;

/// An entry in the list of active formatting elements
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveElement {
    /// Scope boundary pushed by applet, object, marquee, template, td, th and caption
    Marker,
    Formatting(NodeId),
}

impl ActiveElement {
    #[must_use]
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            ActiveElement::Formatting(node_id) => Some(*node_id),
            ActiveElement::Marker => None,
        }
    }
}

/// List of active formatting elements.
///
/// Pushing an element evicts the earliest of three equivalent entries found within the last
/// `lookback` entries after the nearest marker (the Noah's Ark clause), so the list never holds
/// more than three equivalent elements in that window.
#[derive(Clone, Debug)]
pub struct ActiveFormattingElements {
    entries: Vec<ActiveElement>,
    lookback: usize,
}

impl ActiveFormattingElements {
    #[must_use]
    pub fn new(lookback: usize) -> Self {
        Self {
            entries: Vec::new(),
            lookback,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<ActiveElement> {
        self.entries.get(idx).copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<ActiveElement> {
        self.entries.last().copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ActiveElement> {
        self.entries.iter()
    }

    #[must_use]
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.position(node_id).is_some()
    }

    #[must_use]
    pub fn position(&self, node_id: NodeId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| *entry == ActiveElement::Formatting(node_id))
    }

    pub fn push_marker(&mut self) {
        self.entries.push(ActiveElement::Marker);
    }

    /// Appends an element after running the Noah's Ark check
    pub fn push<D: TreeSink>(&mut self, document: &D, node_id: NodeId) {
        self.check_equivalents(document, node_id);
        self.entries.push(ActiveElement::Formatting(node_id));
    }

    /// Inserts an element at `index` after running the Noah's Ark check. An index past the end
    /// appends.
    pub fn push_with_bookmark<D: TreeSink>(&mut self, document: &D, node_id: NodeId, index: usize) {
        self.check_equivalents(document, node_id);
        if index > self.entries.len() {
            self.entries.push(ActiveElement::Formatting(node_id));
        } else {
            self.entries.insert(index, ActiveElement::Formatting(node_id));
        }
    }

    fn check_equivalents<D: TreeSink>(&mut self, document: &D, node_id: NodeId) {
        let Some(last) = self.entries.len().checked_sub(1) else {
            return;
        };
        let floor = last.saturating_sub(self.lookback);

        let mut seen = 0;
        for idx in (floor..=last).rev() {
            let ActiveElement::Formatting(entry_id) = self.entries[idx] else {
                break;
            };

            if equivalent(document, entry_id, node_id) {
                seen += 1;
            }
            if seen == 3 {
                trace!("formatting list: evicting {entry_id} as a fourth equivalent arrives");
                self.entries.remove(idx);
                break;
            }
        }
    }

    /// Pops entries up to and including the last marker
    pub fn clear_to_last_marker(&mut self) {
        while let Some(entry) = self.entries.pop() {
            if entry == ActiveElement::Marker {
                break;
            }
        }
    }

    /// Removes the element from the list. Returns false when it was not present.
    pub fn remove(&mut self, node_id: NodeId) -> bool {
        match self.position(node_id) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn replace_at(&mut self, idx: usize, node_id: NodeId) {
        if let Some(entry) = self.entries.get_mut(idx) {
            *entry = ActiveElement::Formatting(node_id);
        }
    }

    /// Last html element with the given name between the end of the list and the last marker
    pub fn find_after_last_marker<D: TreeSink>(&self, document: &D, name: &str) -> Option<NodeId> {
        for entry in self.entries.iter().rev() {
            let ActiveElement::Formatting(node_id) = *entry else {
                return None;
            };
            if document.element_name(node_id) == Some(name)
                && document.element_namespace(node_id) == Some(Namespace::Html)
            {
                return Some(node_id);
            }
        }
        None
    }

    /// Index of the first entry that has to be recreated when reconstructing the active
    /// formatting elements, or None when there is nothing to do. `is_open` tells whether an
    /// element is still on the stack of open elements.
    ///
    /// The backward walk stops at a marker, at an open element, or once it has looked at
    /// `lookback` entries.
    pub fn reconstruct_start(&self, is_open: impl Fn(NodeId) -> bool) -> Option<usize> {
        let size = self.entries.len();
        let last = size.checked_sub(1)?;

        match self.entries[last] {
            ActiveElement::Marker => return None,
            ActiveElement::Formatting(node_id) if is_open(node_id) => return None,
            ActiveElement::Formatting(_) => {}
        }

        let ceil = size.saturating_sub(self.lookback + 1);
        let mut pos = last;
        loop {
            if pos == ceil {
                return Some(pos);
            }
            pos -= 1;
            match self.entries[pos] {
                ActiveElement::Marker => return Some(pos + 1),
                ActiveElement::Formatting(node_id) if is_open(node_id) => return Some(pos + 1),
                ActiveElement::Formatting(_) => {}
            }
        }
    }
}

fn equivalent<D: TreeSink>(document: &D, a: NodeId, b: NodeId) -> bool {
    document.element_name(a) == document.element_name(b)
        && document.element_namespace(a) == document.element_namespace(b)
        && document.attributes(a) == document.attributes(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use sanehtml_shared::location::Location;
    use std::collections::HashMap;

    fn element(doc: &mut Document, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attributes: HashMap<String, String> =
            attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        doc.create_element(name, Namespace::Html, &attributes, Location::default())
    }

    fn ids(list: &ActiveFormattingElements) -> Vec<Option<NodeId>> {
        list.iter().map(ActiveElement::node_id).collect()
    }

    #[test]
    fn noahs_ark_keeps_three() {
        let mut doc = Document::new();
        let mut list = ActiveFormattingElements::new(12);

        let b: Vec<NodeId> = (0..4).map(|_| element(&mut doc, "b", &[("class", "x")])).collect();
        for id in &b {
            list.push(&doc, *id);
        }

        assert_eq!(ids(&list), vec![Some(b[1]), Some(b[2]), Some(b[3])]);
    }

    #[test]
    fn noahs_ark_respects_attributes_and_markers() {
        let mut doc = Document::new();
        let mut list = ActiveFormattingElements::new(12);

        let first = element(&mut doc, "b", &[]);
        let second = element(&mut doc, "b", &[]);
        list.push(&doc, first);
        list.push(&doc, second);
        list.push_marker();
        for _ in 0..3 {
            let id = element(&mut doc, "b", &[]);
            list.push(&doc, id);
        }
        let other = element(&mut doc, "b", &[("id", "1")]);
        list.push(&doc, other);

        // The marker shields the first two, and a different attribute set is not equivalent
        assert_eq!(list.len(), 7);
        assert!(list.contains(first));
        assert!(list.contains(other));
    }

    #[test]
    fn noahs_ark_lookback_window() {
        let mut doc = Document::new();
        let mut list = ActiveFormattingElements::new(2);

        let first = element(&mut doc, "i", &[]);
        list.push(&doc, first);
        let second = element(&mut doc, "i", &[]);
        list.push(&doc, second);
        for _ in 0..2 {
            let id = element(&mut doc, "em", &[]);
            list.push(&doc, id);
        }
        let third = element(&mut doc, "i", &[]);
        list.push(&doc, third);
        let fourth = element(&mut doc, "i", &[]);
        list.push(&doc, fourth);

        // Only the last three entries are inspected, so the early ones survive
        assert!(list.contains(first));
        assert!(list.contains(second));
    }

    #[test]
    fn push_with_bookmark() {
        let mut doc = Document::new();
        let mut list = ActiveFormattingElements::new(12);
        let a = element(&mut doc, "a", &[]);
        let b = element(&mut doc, "b", &[]);
        let i = element(&mut doc, "i", &[]);
        let u = element(&mut doc, "u", &[]);

        list.push(&doc, a);
        list.push(&doc, b);
        list.push_with_bookmark(&doc, i, 1);
        list.push_with_bookmark(&doc, u, 99);

        assert_eq!(ids(&list), vec![Some(a), Some(i), Some(b), Some(u)]);
    }

    #[test]
    fn clear_to_last_marker_and_remove() {
        let mut doc = Document::new();
        let mut list = ActiveFormattingElements::new(12);
        let a = element(&mut doc, "a", &[]);
        let b = element(&mut doc, "b", &[]);

        list.push(&doc, a);
        list.push_marker();
        list.push(&doc, b);
        assert_eq!(list.find_after_last_marker(&doc, "b"), Some(b));
        assert_eq!(list.find_after_last_marker(&doc, "a"), None);

        list.clear_to_last_marker();
        assert_eq!(ids(&list), vec![Some(a)]);

        assert!(list.remove(a));
        assert!(!list.remove(a));
        assert!(list.is_empty());
    }

    #[test]
    fn reconstruct_start_positions() {
        let mut doc = Document::new();
        let mut list = ActiveFormattingElements::new(12);
        assert_eq!(list.reconstruct_start(|_| false), None);

        let a = element(&mut doc, "a", &[]);
        let b = element(&mut doc, "b", &[]);
        let i = element(&mut doc, "i", &[]);
        list.push(&doc, a);
        list.push_marker();
        list.push(&doc, b);
        list.push(&doc, i);

        // Nothing open: everything after the marker is recreated
        assert_eq!(list.reconstruct_start(|_| false), Some(2));
        // b still open: only i
        assert_eq!(list.reconstruct_start(|id| id == b), Some(3));
        // last entry open: nothing to do
        assert_eq!(list.reconstruct_start(|id| id == i), None);

        list.push_marker();
        assert_eq!(list.reconstruct_start(|_| false), None);
    }

    #[test]
    fn reconstruct_start_is_bounded() {
        let mut doc = Document::new();
        let mut list = ActiveFormattingElements::new(2);
        for name in ["a", "b", "i", "u", "s"] {
            let id = element(&mut doc, name, &[]);
            list.push(&doc, id);
        }

        assert_eq!(list.reconstruct_start(|_| false), Some(2));
    }
}
