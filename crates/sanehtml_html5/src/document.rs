//! Arena backed document that the tree builder writes into
use crate::node::arena::NodeArena;
use crate::node::data::{ElementData, Node, NodeData};
use crate::node::Namespace;
use crate::parser::quirks::QuirksMode;
use crate::parser::tree_builder::TreeSink;
use sanehtml_shared::location::Location;
use sanehtml_shared::node::NodeId;
use std::collections::HashMap;

/// An html document: a tree of nodes stored in an arena, rooted at a document node
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    arena: NodeArena,
    root: NodeId,
    quirks_mode: QuirksMode,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        let mut arena = NodeArena::new();
        let root = arena.register_node(Node::new(NodeData::Document, Location::default()));

        Self {
            arena,
            root,
            quirks_mode: QuirksMode::NoQuirks,
        }
    }

    #[must_use]
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.arena.node(node_id)
    }

    #[must_use]
    pub fn element(&self, node_id: NodeId) -> Option<&ElementData> {
        self.arena.node(node_id).and_then(Node::element)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.arena.node_count()
    }

    /// Text content of the node and all its descendants
    #[must_use]
    pub fn text_content(&self, node_id: NodeId) -> String {
        let mut result = String::new();

        // Walked with an explicit stack; pruned documents can nest far deeper than the call stack
        let mut pending = vec![node_id];
        while let Some(current) = pending.pop() {
            let Some(node) = self.arena.node(current) else {
                continue;
            };
            if let NodeData::Text { value } = &node.data {
                result.push_str(value);
            }
            pending.extend(node.children.iter().rev());
        }

        result
    }

    fn register(&mut self, data: NodeData, location: Location) -> NodeId {
        self.arena.register_node(Node::new(data, location))
    }

    fn detach(&mut self, node_id: NodeId) {
        let Some(parent_id) = self.arena.node(node_id).and_then(|n| n.parent) else {
            return;
        };

        if let Some(parent) = self.arena.node_mut(parent_id) {
            parent.children.retain(|child| *child != node_id);
        }
        if let Some(node) = self.arena.node_mut(node_id) {
            node.parent = None;
        }
    }
}

impl TreeSink for Document {
    fn document_id(&self) -> NodeId {
        self.root
    }

    fn create_element(
        &mut self,
        name: &str,
        namespace: Namespace,
        attributes: &HashMap<String, String>,
        location: Location,
    ) -> NodeId {
        self.register(
            NodeData::Element(ElementData::new(name, namespace, attributes.clone())),
            location,
        )
    }

    fn create_text(&mut self, content: &str, location: Location) -> NodeId {
        self.register(
            NodeData::Text {
                value: content.to_string(),
            },
            location,
        )
    }

    fn create_comment(&mut self, content: &str, location: Location) -> NodeId {
        self.register(
            NodeData::Comment {
                value: content.to_string(),
            },
            location,
        )
    }

    fn create_doctype(&mut self, name: &str, pub_identifier: &str, sys_identifier: &str, location: Location) -> NodeId {
        self.register(
            NodeData::DocType {
                name: name.to_string(),
                pub_identifier: pub_identifier.to_string(),
                sys_identifier: sys_identifier.to_string(),
            },
            location,
        )
    }

    fn create_fragment(&mut self) -> NodeId {
        self.register(NodeData::DocumentFragment, Location::default())
    }

    fn append(&mut self, parent_id: NodeId, node_id: NodeId) {
        let index = self.arena.node(parent_id).map_or(0, |p| p.children.len());
        self.insert_at(parent_id, index, node_id);
    }

    fn insert_at(&mut self, parent_id: NodeId, index: usize, node_id: NodeId) {
        if parent_id == node_id || self.arena.node(node_id).is_none() {
            return;
        }

        // Moving a node inside the same parent shifts the index of everything after it
        let mut index = index;
        if let Some(old_index) = self
            .arena
            .node(node_id)
            .filter(|n| n.parent == Some(parent_id))
            .and_then(|_| self.arena.node(parent_id))
            .and_then(|p| p.children.iter().position(|c| *c == node_id))
        {
            if old_index < index {
                index -= 1;
            }
        }

        self.detach(node_id);

        let Some(parent) = self.arena.node_mut(parent_id) else {
            return;
        };
        let index = index.min(parent.children.len());
        parent.children.insert(index, node_id);

        if let Some(node) = self.arena.node_mut(node_id) {
            node.parent = Some(parent_id);
        }
    }

    fn remove(&mut self, node_id: NodeId) {
        self.detach(node_id);
    }

    fn replace(&mut self, old_id: NodeId, new_id: NodeId) {
        let Some(parent_id) = self.parent_of(old_id) else {
            return;
        };
        let Some(index) = self
            .arena
            .node(parent_id)
            .and_then(|p| p.children.iter().position(|c| *c == old_id))
        else {
            return;
        };

        self.detach(old_id);
        self.insert_at(parent_id, index, new_id);
    }

    fn parent_of(&self, node_id: NodeId) -> Option<NodeId> {
        self.arena.node(node_id).and_then(|n| n.parent)
    }

    fn children_of(&self, node_id: NodeId) -> &[NodeId] {
        self.arena.node(node_id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    fn element_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.name.as_str())
    }

    fn element_namespace(&self, node_id: NodeId) -> Option<Namespace> {
        self.element(node_id).map(|e| e.namespace)
    }

    fn attributes(&self, node_id: NodeId) -> Option<&HashMap<String, String>> {
        self.element(node_id).map(|e| &e.attributes)
    }

    fn add_attributes_if_missing(&mut self, node_id: NodeId, attributes: &HashMap<String, String>) {
        let Some(element) = self.arena.node_mut(node_id).and_then(Node::element_mut) else {
            return;
        };

        for (name, value) in attributes {
            element
                .attributes
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    fn append_text(&mut self, node_id: NodeId, content: &str) -> bool {
        match self.arena.node_mut(node_id).map(|n| &mut n.data) {
            Some(NodeData::Text { value }) => {
                value.push_str(content);
                true
            }
            _ => false,
        }
    }

    fn template_contents(&mut self, node_id: NodeId) -> Option<NodeId> {
        let existing = self.element(node_id)?;
        if !existing.is("template", Namespace::Html) {
            return None;
        }
        if let Some(contents) = existing.template_contents {
            return Some(contents);
        }

        let contents = self.create_fragment();
        if let Some(element) = self.arena.node_mut(node_id).and_then(Node::element_mut) {
            element.template_contents = Some(contents);
        }
        Some(contents)
    }

    fn set_quirks_mode(&mut self, quirks_mode: QuirksMode) {
        self.quirks_mode = quirks_mode;
    }

    fn quirks_mode(&self) -> QuirksMode {
        self.quirks_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &mut Document, name: &str) -> NodeId {
        doc.create_element(name, Namespace::Html, &HashMap::new(), Location::default())
    }

    #[test]
    fn append_and_insert() {
        let mut doc = Document::new();
        let root = doc.document_id();
        let html = element(&mut doc, "html");
        let a = element(&mut doc, "a");
        let b = element(&mut doc, "b");
        let c = element(&mut doc, "c");

        doc.append(root, html);
        doc.append(html, a);
        doc.append(html, c);
        doc.insert_at(html, 1, b);

        assert_eq!(doc.children_of(html), vec![a, b, c]);
        assert_eq!(doc.parent_of(b), Some(html));
        assert_eq!(doc.element_name(b), Some("b"));
        assert_eq!(doc.element_namespace(b), Some(Namespace::Html));
        assert_eq!(doc.element_name(root), None);
    }

    #[test]
    fn appending_moves_node() {
        let mut doc = Document::new();
        let p1 = element(&mut doc, "p");
        let p2 = element(&mut doc, "p");
        let child = element(&mut doc, "span");

        doc.append(p1, child);
        doc.append(p2, child);

        assert!(doc.children_of(p1).is_empty());
        assert_eq!(doc.children_of(p2), vec![child]);
    }

    #[test]
    fn moving_inside_same_parent() {
        let mut doc = Document::new();
        let parent = element(&mut doc, "div");
        let a = element(&mut doc, "a");
        let b = element(&mut doc, "b");
        let c = element(&mut doc, "c");
        doc.append(parent, a);
        doc.append(parent, b);
        doc.append(parent, c);

        // move a right before c
        doc.insert_at(parent, 2, a);
        assert_eq!(doc.children_of(parent), vec![b, a, c]);
    }

    #[test]
    fn remove_and_replace() {
        let mut doc = Document::new();
        let parent = element(&mut doc, "div");
        let a = element(&mut doc, "a");
        let b = element(&mut doc, "b");
        let c = element(&mut doc, "c");
        doc.append(parent, a);
        doc.append(parent, b);

        doc.replace(a, c);
        assert_eq!(doc.children_of(parent), vec![c, b]);
        assert_eq!(doc.parent_of(a), None);

        doc.remove(b);
        assert_eq!(doc.children_of(parent), vec![c]);
        assert!(doc.node(b).is_some());
    }

    #[test]
    fn text_merging() {
        let mut doc = Document::new();
        let text = doc.create_text("foo", Location::default());
        let div = element(&mut doc, "div");

        assert!(doc.append_text(text, "bar"));
        assert!(!doc.append_text(div, "bar"));
        doc.append(div, text);
        assert_eq!(doc.text_content(div), "foobar");
    }

    #[test]
    fn attributes_first_wins() {
        let mut doc = Document::new();
        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), "one".to_string());
        let body = doc.create_element("body", Namespace::Html, &attrs, Location::default());

        let mut more = HashMap::new();
        more.insert("id".to_string(), "two".to_string());
        more.insert("class".to_string(), "x".to_string());
        doc.add_attributes_if_missing(body, &more);

        let attributes = doc.attributes(body).unwrap();
        assert_eq!(attributes.get("id").map(String::as_str), Some("one"));
        assert_eq!(attributes.get("class").map(String::as_str), Some("x"));
    }

    #[test]
    fn template_contents_created_once() {
        let mut doc = Document::new();
        let template = element(&mut doc, "template");
        let div = element(&mut doc, "div");

        let contents = doc.template_contents(template);
        assert!(contents.is_some());
        assert_eq!(doc.template_contents(template), contents);
        assert_eq!(doc.template_contents(div), None);
    }
}
