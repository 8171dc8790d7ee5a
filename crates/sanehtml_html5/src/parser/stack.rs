use crate::node::Namespace;
use crate::parser::tree_builder::TreeSink;
use log::debug;
use sanehtml_shared::node::NodeId;

/// Scope queries never look further down the stack than this
pub const MAX_SCOPE_SEARCH_DEPTH: usize = 100;

const BASE_SCOPE_HTML: [&str; 9] = [
    "applet", "caption", "html", "marquee", "object", "table", "td", "template", "th",
];
const BASE_SCOPE_MATHML: [&str; 6] = ["annotation-xml", "mi", "mn", "mo", "ms", "mtext"];
const BASE_SCOPE_SVG: [&str; 3] = ["desc", "foreignObject", "title"];

const IMPLIED_END_TAGS: [&str; 10] = ["dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc"];
const IMPLIED_END_TAGS_THOROUGH: [&str; 8] = ["caption", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr"];

/// The different "has an element in ... scope" flavours
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Regular,
    ListItem,
    Button,
    Table,
    Select,
}

impl Scope {
    fn extra_stop_tags(self) -> &'static [&'static str] {
        match self {
            Scope::ListItem => &["ol", "ul"],
            Scope::Button => &["button"],
            _ => &[],
        }
    }
}

/// Stack of open elements.
///
/// Only node ids are stored; names and namespaces are looked up in the sink. The stack is
/// bounded: `prune_to_fit` drops entries from the top until a new element can be pushed without
/// exceeding `max_depth`. Lookups by name only scan the top `max_depth` entries.
#[derive(Clone, Debug)]
pub struct OpenElements {
    elements: Vec<NodeId>,
    max_depth: usize,
}

impl OpenElements {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            elements: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Pushes without any depth check. Callers run `prune_to_fit` first.
    pub fn push(&mut self, node_id: NodeId) {
        self.elements.push(node_id);
    }

    pub fn pop(&mut self) -> Option<NodeId> {
        self.elements.pop()
    }

    /// The current node
    #[must_use]
    pub fn current(&self) -> Option<NodeId> {
        self.elements.last().copied()
    }

    #[must_use]
    pub fn first(&self) -> Option<NodeId> {
        self.elements.first().copied()
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<NodeId> {
        self.elements.get(idx).copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &NodeId> {
        self.elements.iter()
    }

    #[must_use]
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.elements.contains(&node_id)
    }

    #[must_use]
    pub fn position(&self, node_id: NodeId) -> Option<usize> {
        self.elements.iter().rposition(|&id| id == node_id)
    }

    pub fn insert(&mut self, idx: usize, node_id: NodeId) {
        if idx >= self.elements.len() {
            self.elements.push(node_id);
        } else {
            self.elements.insert(idx, node_id);
        }
    }

    pub fn remove_at(&mut self, idx: usize) -> Option<NodeId> {
        (idx < self.elements.len()).then(|| self.elements.remove(idx))
    }

    /// Removes the given node from the stack. Does nothing when the node is not on it.
    pub fn remove(&mut self, node_id: NodeId) -> bool {
        match self.position(node_id) {
            Some(idx) => {
                self.elements.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn replace_at(&mut self, idx: usize, node_id: NodeId) {
        if let Some(entry) = self.elements.get_mut(idx) {
            *entry = node_id;
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.elements.truncate(len);
    }

    /// Pops entries from the top until one more element fits. Returns the popped entries in the
    /// order they were popped so the caller can clean up references to them.
    pub fn prune_to_fit(&mut self) -> Vec<NodeId> {
        let mut pruned = Vec::new();
        while self.elements.len() >= self.max_depth {
            match self.elements.pop() {
                Some(node_id) => pruned.push(node_id),
                None => break,
            }
        }

        if !pruned.is_empty() {
            debug!("open element stack at {} entries, pruned {}", self.max_depth, pruned.len());
        }
        pruned
    }

    /// Lowest index that bounded lookups still look at
    fn search_floor(&self) -> usize {
        let bottom = self.elements.len().saturating_sub(1);
        if bottom >= self.max_depth {
            bottom - self.max_depth
        } else {
            0
        }
    }

    /// Returns true when the given node is found within the search window
    #[must_use]
    pub fn on_stack(&self, node_id: NodeId) -> bool {
        let floor = self.search_floor();
        self.elements[floor..].iter().rev().any(|&id| id == node_id)
    }

    /// Nearest html element with the given name, within the search window
    pub fn get_from_stack<D: TreeSink>(&self, document: &D, name: &str) -> Option<NodeId> {
        let floor = self.search_floor();
        self.elements[floor..]
            .iter()
            .rev()
            .copied()
            .find(|&id| is_html_element(document, id, name))
    }

    pub fn has_element<D: TreeSink>(&self, document: &D, name: &str) -> bool {
        self.get_from_stack(document, name).is_some()
    }

    /// Returns true when the current node is the html element with the given name
    pub fn current_is<D: TreeSink>(&self, document: &D, name: &str) -> bool {
        self.current().is_some_and(|id| is_html_element(document, id, name))
    }

    pub fn current_is_any<D: TreeSink>(&self, document: &D, names: &[&str]) -> bool {
        self.current().is_some_and(|id| {
            document.element_namespace(id) == Some(Namespace::Html)
                && document.element_name(id).is_some_and(|n| names.contains(&n))
        })
    }

    /// Checks if the given html element is in the given scope
    pub fn in_scope<D: TreeSink>(&self, document: &D, target: &str, scope: Scope) -> bool {
        self.in_scope_any(document, &[target], scope)
    }

    pub fn in_scope_any<D: TreeSink>(&self, document: &D, targets: &[&str], scope: Scope) -> bool {
        if scope == Scope::Select {
            return self.in_select_scope(document, targets);
        }

        let Some(bottom) = self.elements.len().checked_sub(1) else {
            return false;
        };
        let top = bottom.saturating_sub(MAX_SCOPE_SEARCH_DEPTH);

        for idx in (top..=bottom).rev() {
            let node_id = self.elements[idx];
            let (Some(name), Some(namespace)) = (document.element_name(node_id), document.element_namespace(node_id))
            else {
                continue;
            };

            match namespace {
                Namespace::Html => {
                    if targets.contains(&name) {
                        return true;
                    }
                    let stops = if scope == Scope::Table {
                        ["html", "table"].contains(&name)
                    } else {
                        BASE_SCOPE_HTML.contains(&name) || scope.extra_stop_tags().contains(&name)
                    };
                    if stops {
                        return false;
                    }
                }
                Namespace::MathMl if scope != Scope::Table && BASE_SCOPE_MATHML.contains(&name) => return false,
                Namespace::Svg if scope != Scope::Table && BASE_SCOPE_SVG.contains(&name) => return false,
                _ => {}
            }
        }

        false
    }

    fn in_select_scope<D: TreeSink>(&self, document: &D, targets: &[&str]) -> bool {
        for &node_id in self.elements.iter().rev() {
            let name = document.element_name(node_id).unwrap_or_default();
            if targets.contains(&name) {
                return true;
            }
            if !["optgroup", "option"].contains(&name) {
                return false;
            }
        }

        false
    }

    /// Pops until an html element with the given name has been popped
    pub fn pop_until_named<D: TreeSink>(&mut self, document: &D, name: &str) {
        self.pop_until_any(document, &[name]);
    }

    /// Pops until an html element with any of the given names has been popped
    pub fn pop_until_any<D: TreeSink>(&mut self, document: &D, names: &[&str]) {
        while let Some(node_id) = self.elements.pop() {
            let is_html = document.element_namespace(node_id) == Some(Namespace::Html);
            if is_html && document.element_name(node_id).is_some_and(|n| names.contains(&n)) {
                break;
            }
        }
    }

    /// Pops until the current node is one of the given html elements, or the html element
    pub fn clear_to_context<D: TreeSink>(&mut self, document: &D, names: &[&str]) {
        while let Some(node_id) = self.current() {
            let is_html = document.element_namespace(node_id) == Some(Namespace::Html);
            let name = document.element_name(node_id).unwrap_or_default();
            if is_html && (name == "html" || names.contains(&name)) {
                return;
            }
            self.elements.pop();
        }
    }

    /// Pops elements that have an implied end tag. `except` stops the loop when it is the current
    /// node. `thorough` adds the table structure elements.
    pub fn generate_implied_end_tags<D: TreeSink>(&mut self, document: &D, except: Option<&str>, thorough: bool) {
        while let Some(node_id) = self.current() {
            let name = document.element_name(node_id).unwrap_or_default();
            if except.is_some_and(|e| e == name) {
                return;
            }

            let implied = if thorough {
                document.element_namespace(node_id) == Some(Namespace::Html)
                    && (IMPLIED_END_TAGS.contains(&name) || IMPLIED_END_TAGS_THOROUGH.contains(&name))
            } else {
                IMPLIED_END_TAGS.contains(&name)
            };
            if !implied {
                return;
            }

            self.elements.pop();
        }
    }
}

fn is_html_element<D: TreeSink>(document: &D, node_id: NodeId, name: &str) -> bool {
    document.element_namespace(node_id) == Some(Namespace::Html) && document.element_name(node_id) == Some(name)
}
