use crate::node::Namespace;
use crate::parser::quirks::QuirksMode;
use sanehtml_shared::location::Location;
use sanehtml_shared::node::NodeId;
use std::collections::HashMap;

/// TreeSink is the interface the tree builder uses to modify the DOM.
///
/// The builder never owns nodes. Everything it keeps (the stack of open elements, the list of
/// active formatting elements, the head and form pointers) are plain `NodeId`s into the sink.
/// Nodes that are created are detached until they are appended or inserted somewhere.
pub trait TreeSink {
    /// The document node. Full document parses insert their top-level nodes here.
    fn document_id(&self) -> NodeId;

    /// Create a detached element node
    fn create_element(
        &mut self,
        name: &str,
        namespace: Namespace,
        attributes: &HashMap<String, String>,
        location: Location,
    ) -> NodeId;

    /// Create a detached text node
    fn create_text(&mut self, content: &str, location: Location) -> NodeId;

    /// Create a detached comment node
    fn create_comment(&mut self, content: &str, location: Location) -> NodeId;

    /// Create a detached doctype node
    fn create_doctype(&mut self, name: &str, pub_identifier: &str, sys_identifier: &str, location: Location) -> NodeId;

    /// Create a detached document fragment
    fn create_fragment(&mut self) -> NodeId;

    /// Append a node as the last child of parent. A node that is already attached elsewhere is moved.
    fn append(&mut self, parent_id: NodeId, node_id: NodeId);

    /// Insert a node at the given child index of parent. An index past the end appends.
    fn insert_at(&mut self, parent_id: NodeId, index: usize, node_id: NodeId);

    /// Detach a node (and its subtree) from its parent. The node itself stays valid.
    fn remove(&mut self, node_id: NodeId);

    /// Puts `new_id` at the place of `old_id` in the tree and detaches `old_id`
    fn replace(&mut self, old_id: NodeId, new_id: NodeId);

    fn parent_of(&self, node_id: NodeId) -> Option<NodeId>;

    fn children_of(&self, node_id: NodeId) -> &[NodeId];

    /// Name of the element, or None when the node is not an element
    fn element_name(&self, node_id: NodeId) -> Option<&str>;

    fn element_namespace(&self, node_id: NodeId) -> Option<Namespace>;

    fn attributes(&self, node_id: NodeId) -> Option<&HashMap<String, String>>;

    /// Adds the attributes that are not present on the element yet. Existing values are kept.
    fn add_attributes_if_missing(&mut self, node_id: NodeId, attributes: &HashMap<String, String>);

    /// Appends text to an existing text node. Returns false when the node is not a text node.
    fn append_text(&mut self, node_id: NodeId, content: &str) -> bool;

    /// Content fragment of a template element, created when first asked for
    fn template_contents(&mut self, node_id: NodeId) -> Option<NodeId>;

    fn set_quirks_mode(&mut self, quirks_mode: QuirksMode);

    fn quirks_mode(&self) -> QuirksMode;
}
