use crate::node::Namespace;
use crate::parser::errors::ParserError;
use crate::parser::formatting::ActiveElement;
use crate::parser::stack::Scope;
use crate::parser::tree_builder::TreeSink;
use crate::parser::Html5Parser;
use crate::tokenizer::state::State;
use crate::tokenizer::token::Token;
use crate::tokenizer::TokenSource;
use log::{debug, trace};
use sanehtml_shared::location::Location;
use sanehtml_shared::node::NodeId;
use std::collections::HashMap;

const ADOPTION_AGENCY_OUTER_LOOP_DEPTH: usize = 8;
const ADOPTION_AGENCY_INNER_LOOP_DEPTH: usize = 3;

const FOSTER_TARGETS: [&str; 5] = ["table", "tbody", "tfoot", "thead", "tr"];

/// Where a node should be placed in the tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertionPositionMode {
    LastChild { parent_id: NodeId },
    Sibling { parent_id: NodeId, before_id: NodeId },
}

enum BookMark {
    Replace(NodeId),
    InsertAfter(NodeId),
}

impl<T: TokenSource, D: TreeSink> Html5Parser<'_, T, D> {
    pub(crate) fn insert_element_helper(&mut self, node_id: NodeId, position: InsertionPositionMode) {
        match position {
            InsertionPositionMode::Sibling { parent_id, before_id } => {
                match self.document.children_of(parent_id).iter().position(|&id| id == before_id) {
                    Some(index) => self.document.insert_at(parent_id, index, node_id),
                    None => self.document.append(parent_id, node_id),
                }
            }
            InsertionPositionMode::LastChild { parent_id } => {
                self.document.append(parent_id, node_id);
            }
        }
    }

    /// Inserts text at the given position. When the node right before that position is a text
    /// node, the text is merged into it instead of creating a new node.
    fn insert_text_helper(&mut self, position: InsertionPositionMode, text: &str, location: Location) {
        let (parent_id, index) = match position {
            InsertionPositionMode::LastChild { parent_id } => (parent_id, self.document.children_of(parent_id).len()),
            InsertionPositionMode::Sibling { parent_id, before_id } => {
                let children = self.document.children_of(parent_id);
                let index = children.iter().position(|&id| id == before_id).unwrap_or(children.len());
                (parent_id, index)
            }
        };

        if let Some(previous) = index
            .checked_sub(1)
            .and_then(|idx| self.document.children_of(parent_id).get(idx).copied())
        {
            if self.document.append_text(previous, text) {
                return;
            }
        }

        let node_id = self.document.create_text(text, location);
        self.document.insert_at(parent_id, index, node_id);
    }

    /// Pushes an element on the stack of open elements, pruning the stack first when it is full
    pub(crate) fn push_element(&mut self, node_id: NodeId) {
        self.enforce_depth_limit();
        self.open_elements.push(node_id);
    }

    fn enforce_depth_limit(&mut self) {
        for node_id in self.open_elements.prune_to_fit() {
            self.on_stack_pruned(node_id);
        }
    }

    /// Drops every reference the builder keeps to an element that fell off the stack
    fn on_stack_pruned(&mut self, node_id: NodeId) {
        if self.head_element == Some(node_id) {
            self.head_element = None;
        }
        if self.form_element == Some(node_id) {
            self.form_element = None;
        }
        self.active_formatting_elements.remove(node_id);

        if self.is_html_element(node_id, "template") {
            self.active_formatting_elements.clear_to_last_marker();
            self.template_insertion_mode.pop();
            self.reset_insertion_mode();
        }
    }

    /// Creates an element, inserts it at the appropriate place and pushes it on the stack
    pub(crate) fn insert_element(
        &mut self,
        name: &str,
        namespace: Namespace,
        attributes: &HashMap<String, String>,
        location: Location,
    ) -> NodeId {
        let position = self.appropriate_place_insert(None);
        let node_id = self.document.create_element(name, namespace, attributes, location);
        self.insert_element_helper(node_id, position);
        self.push_element(node_id);
        node_id
    }

    /// Inserts an html element for the token. Void elements are popped right away. A self-closing
    /// flag on anything else sends the tokenizer back to the data state and queues the matching
    /// end tag.
    pub(crate) fn insert_html_element(&mut self, token: &Token) -> NodeId {
        let (name, attributes, is_self_closing, location) = match token {
            Token::StartTag {
                name,
                attributes,
                is_self_closing,
                location,
            } => (name.as_str(), attributes.clone(), *is_self_closing, *location),
            Token::EndTag { name, location, .. } => (name.as_str(), HashMap::new(), false, *location),
            _ => ("", HashMap::new(), false, token.get_location()),
        };

        let node_id = self.insert_element(name, Namespace::Html, &attributes, location);

        if self.tags.is_void(name) {
            self.open_elements.pop();
        } else if is_self_closing {
            if self.tags.is_known(name) {
                self.parse_error(ParserError::NonVoidHtmlElementStartTagWithTrailingSolidus.as_str());
            }
            self.tokenizer.set_state(State::Data);
            self.tokenizer.insert_tokens_at_queue_start(&[Token::EndTag {
                name: name.to_string(),
                is_self_closing: false,
                location,
            }]);
        }

        node_id
    }

    /// Inserts an html element that is created by the parser itself (html, head, body, tbody...)
    pub(crate) fn insert_implied_element(&mut self, name: &str) -> NodeId {
        let location = self.current_token.get_location();
        self.insert_element(name, Namespace::Html, &HashMap::new(), location)
    }

    pub(crate) fn insert_foreign_element(&mut self, token: &Token, namespace: Namespace) -> NodeId {
        match token {
            Token::StartTag {
                name,
                attributes,
                location,
                ..
            } => self.insert_element(name, namespace, attributes, *location),
            _ => self.insert_element("", namespace, &HashMap::new(), token.get_location()),
        }
    }

    /// Inserts the `html` element directly under the root
    pub(crate) fn insert_document_element(&mut self, attributes: &HashMap<String, String>) -> NodeId {
        let location = self.current_token.get_location();
        let node_id = self.document.create_element("html", Namespace::Html, attributes, location);
        self.document.append(self.root, node_id);
        self.push_element(node_id);
        node_id
    }

    pub(crate) fn insert_doctype_element(&mut self, token: &Token) {
        if let Token::DocType {
            name,
            pub_identifier,
            sys_identifier,
            location,
            ..
        } = token
        {
            let node_id = self.document.create_doctype(
                name.as_deref().unwrap_or_default(),
                pub_identifier.as_deref().unwrap_or_default(),
                sys_identifier.as_deref().unwrap_or_default(),
                *location,
            );
            self.document.append(self.root, node_id);
        }
    }

    /// Inserts a comment at the appropriate place, or as last child of `parent` when given
    pub(crate) fn insert_comment_element(&mut self, token: &Token, parent: Option<NodeId>) {
        let Token::Comment { comment, location } = token else {
            return;
        };

        let node_id = self.document.create_comment(comment, *location);
        match parent {
            Some(parent_id) => self.document.append(parent_id, node_id),
            None => {
                let position = self.appropriate_place_insert(None);
                self.insert_element_helper(node_id, position);
            }
        }
    }

    pub(crate) fn insert_text_element(&mut self, token: &Token) {
        if let Token::Text { text, location, .. } = token {
            self.insert_text(text, *location);
        }
    }

    pub(crate) fn insert_text(&mut self, text: &str, location: Location) {
        // Skip empty text nodes
        if text.is_empty() {
            return;
        }

        let position = self.appropriate_place_insert(None);
        if position == (InsertionPositionMode::LastChild { parent_id: self.root })
            && self.root == self.document.document_id()
        {
            // Text never goes directly under the document. A fragment root keeps it, the
            // fragment completion moves it into the container.
            return;
        }
        self.insert_text_helper(position, text, location);
    }

    /// Finds the place where a new node should be inserted, taking foster parenting and template
    /// contents into account
    pub(crate) fn appropriate_place_insert(&mut self, override_node: Option<NodeId>) -> InsertionPositionMode {
        let target_id = override_node.or(self.open_elements.current()).unwrap_or(self.root);

        let is_foster_target = self.document.element_namespace(target_id) == Some(Namespace::Html)
            && self
                .document
                .element_name(target_id)
                .is_some_and(|name| FOSTER_TARGETS.contains(&name));

        if !(self.foster_parenting && is_foster_target) {
            if self.is_html_element(target_id, "template") {
                if let Some(contents) = self.document.template_contents(target_id) {
                    return InsertionPositionMode::LastChild { parent_id: contents };
                }
            }
            return InsertionPositionMode::LastChild { parent_id: target_id };
        }

        let last_table = self.open_elements.get_from_stack(&*self.document, "table");
        let last_template = self.open_elements.get_from_stack(&*self.document, "template");

        if let Some(template_id) = last_template {
            let template_is_lower = match last_table {
                None => true,
                Some(table_id) => self.open_elements.position(template_id) > self.open_elements.position(table_id),
            };
            if template_is_lower {
                if let Some(contents) = self.document.template_contents(template_id) {
                    return InsertionPositionMode::LastChild { parent_id: contents };
                }
            }
        }

        let Some(table_id) = last_table else {
            // Fragment case without a table on the stack
            let parent_id = self.open_elements.first().unwrap_or(self.root);
            return InsertionPositionMode::LastChild { parent_id };
        };

        if let Some(parent_id) = self.document.parent_of(table_id) {
            return InsertionPositionMode::Sibling {
                parent_id,
                before_id: table_id,
            };
        }

        let parent_id = self
            .open_elements
            .position(table_id)
            .and_then(|idx| idx.checked_sub(1))
            .and_then(|idx| self.open_elements.get(idx))
            .unwrap_or(self.root);
        InsertionPositionMode::LastChild { parent_id }
    }

    /// Recreates formatting elements that were implicitly closed but are still active
    pub(crate) fn reconstruct_formatting(&mut self) {
        // A full stack would prune the clones right away
        if self.open_elements.len() >= self.open_elements.max_depth() {
            return;
        }

        let open_elements = &self.open_elements;
        let Some(start) = self
            .active_formatting_elements
            .reconstruct_start(|node_id| open_elements.on_stack(node_id))
        else {
            return;
        };

        let location = self.current_token.get_location();
        for idx in start..self.active_formatting_elements.len() {
            let Some(ActiveElement::Formatting(entry_id)) = self.active_formatting_elements.get(idx) else {
                continue;
            };

            let name = self.document.element_name(entry_id).unwrap_or_default().to_string();
            let namespace = self.document.element_namespace(entry_id).unwrap_or_default();
            let attributes = self.document.attributes(entry_id).cloned().unwrap_or_default();

            let new_node_id = self.insert_element(&name, namespace, &attributes, location);
            trace!("reconstructed formatting element {name} as {new_node_id}");
            self.active_formatting_elements.replace_at(idx, new_node_id);
        }
    }

    /// Creates a detached copy of an element: same name, namespace and attributes, no children
    fn clone_element(&mut self, node_id: NodeId) -> NodeId {
        let name = self.document.element_name(node_id).unwrap_or_default().to_string();
        let namespace = self.document.element_namespace(node_id).unwrap_or_default();
        let attributes = self.document.attributes(node_id).cloned().unwrap_or_default();

        self.document
            .create_element(&name, namespace, &attributes, self.current_token.get_location())
    }

    fn find_furthest_block(&self, format_elem_stack_idx: usize) -> Option<(usize, NodeId)> {
        self.open_elements
            .iter()
            .enumerate()
            .skip(format_elem_stack_idx + 1)
            .find(|(_, &node_id)| self.is_special(node_id))
            .map(|(idx, &node_id)| (idx, node_id))
    }

    /// Repairs misnested formatting elements for an end tag (or an `a`/`nobr` start tag) named
    /// `subject`
    pub(crate) fn adoption_agency_algorithm(&mut self, subject: &str) {
        // step 2
        if let Some(current_id) = self.open_elements.current() {
            if self.is_html_element(current_id, subject) && !self.active_formatting_elements.contains(current_id) {
                self.open_elements.pop();
                return;
            }
        }

        // step 3
        let mut outer_loop_counter = 0;

        // step 4
        loop {
            // step 4.1 / 4.2
            if outer_loop_counter >= ADOPTION_AGENCY_OUTER_LOOP_DEPTH {
                return;
            }
            outer_loop_counter += 1;

            // step 4.3
            let Some(format_elem_id) = self
                .active_formatting_elements
                .find_after_last_marker(&*self.document, subject)
            else {
                self.handle_in_body_any_other_end_tag(subject);
                return;
            };

            // step 4.4
            let Some(format_elem_stack_idx) = self.open_elements.position(format_elem_id) else {
                self.parse_error(ParserError::MisnestedFormattingElement.as_str());
                self.active_formatting_elements.remove(format_elem_id);
                return;
            };

            // step 4.5
            if !self.open_elements.in_scope(&*self.document, subject, Scope::Regular) {
                self.parse_error(ParserError::MisnestedFormattingElement.as_str());
                return;
            }

            // step 4.6
            if Some(format_elem_id) != self.open_elements.current() {
                self.parse_error(ParserError::MisnestedFormattingElement.as_str());
            }

            // step 4.7 / 4.8
            let Some((furthest_block_idx, furthest_block_id)) = self.find_furthest_block(format_elem_stack_idx) else {
                self.open_elements.truncate(format_elem_stack_idx);
                self.active_formatting_elements.remove(format_elem_id);
                return;
            };

            // step 4.9
            let Some(common_ancestor) = format_elem_stack_idx
                .checked_sub(1)
                .and_then(|idx| self.open_elements.get(idx))
            else {
                return;
            };

            // step 4.10
            let mut bookmark = BookMark::Replace(format_elem_id);

            // step 4.11
            let mut last_node_id = furthest_block_id;
            let mut node_idx = furthest_block_idx;

            // step 4.12
            let mut inner_loop_counter = 0;

            // step 4.13
            loop {
                inner_loop_counter += 1;

                node_idx -= 1;
                let Some(node_id) = self.open_elements.get(node_idx) else {
                    break;
                };

                if node_id == format_elem_id {
                    break;
                }

                // step 4.13.4
                if inner_loop_counter > ADOPTION_AGENCY_INNER_LOOP_DEPTH {
                    self.active_formatting_elements.remove(node_id);
                }

                // step 4.13.5
                let Some(node_list_idx) = self.active_formatting_elements.position(node_id) else {
                    self.open_elements.remove_at(node_idx);
                    continue;
                };

                // step 4.13.6
                let replacement_id = self.clone_element(node_id);
                self.active_formatting_elements.replace_at(node_list_idx, replacement_id);
                self.open_elements.replace_at(node_idx, replacement_id);

                // step 4.13.7
                if last_node_id == furthest_block_id {
                    bookmark = BookMark::InsertAfter(replacement_id);
                }

                // step 4.13.8
                self.document.append(replacement_id, last_node_id);

                // step 4.13.9
                last_node_id = replacement_id;
            }

            // step 4.14
            let position = self.appropriate_place_insert(Some(common_ancestor));
            self.insert_element_helper(last_node_id, position);

            // step 4.15
            let new_element_id = self.clone_element(format_elem_id);

            // step 4.16
            let children = self.document.children_of(furthest_block_id).to_vec();
            for child in children {
                self.document.append(new_element_id, child);
            }

            // step 4.17
            self.document.append(furthest_block_id, new_element_id);

            // step 4.18
            let bookmark_idx = match bookmark {
                BookMark::Replace(node_id) => {
                    let idx = self.active_formatting_elements.position(node_id);
                    self.active_formatting_elements.remove(format_elem_id);
                    idx
                }
                BookMark::InsertAfter(node_id) => {
                    self.active_formatting_elements.remove(format_elem_id);
                    self.active_formatting_elements.position(node_id).map(|idx| idx + 1)
                }
            };
            let bookmark_idx = bookmark_idx.unwrap_or(self.active_formatting_elements.len());
            self.active_formatting_elements
                .push_with_bookmark(&*self.document, new_element_id, bookmark_idx);

            // step 4.19
            self.open_elements.remove(format_elem_id);
            if let Some(idx) = self.open_elements.position(furthest_block_id) {
                self.open_elements.insert(idx + 1, new_element_id);
            }

            debug!("adoption agency moved {subject} below {furthest_block_id}");
        }
    }

    /// Closes the p element that may or may not be on the stack
    pub(crate) fn close_p_element(&mut self) {
        self.open_elements
            .generate_implied_end_tags(&*self.document, Some("p"), false);

        if !self.current_node_is("p") {
            self.parse_error("p element not at top of stack");
        }

        self.open_elements.pop_until_named(&*self.document, "p");
    }

    /// Closes a table cell and switches the insertion mode to InRow
    pub(crate) fn close_cell(&mut self) {
        self.open_elements
            .generate_implied_end_tags(&*self.document, None, false);

        if !self.open_elements.current_is_any(&*self.document, &["td", "th"]) {
            self.parse_error("current node should be td or th");
        }

        self.open_elements.pop_until_any(&*self.document, &["td", "th"]);
        self.active_formatting_elements.clear_to_last_marker();
        self.insertion_mode = crate::parser::InsertionMode::InRow;
    }

    /// Handles any other end tag in the "in body" insertion mode. Also used as fallback by the
    /// adoption agency algorithm.
    pub(crate) fn handle_in_body_any_other_end_tag(&mut self, tag_name: &str) {
        for idx in (0..self.open_elements.len()).rev() {
            let Some(node_id) = self.open_elements.get(idx) else {
                continue;
            };

            if self.is_html_element(node_id, tag_name) {
                self.open_elements
                    .generate_implied_end_tags(&*self.document, Some(tag_name), false);

                if self.open_elements.current() != Some(node_id) {
                    self.parse_error(ParserError::EndTagTooEarly.as_str());
                }

                while let Some(popped) = self.open_elements.pop() {
                    if popped == node_id {
                        break;
                    }
                }
                return;
            }

            if self.is_special(node_id) {
                self.ignore_token(ParserError::UnexpectedEndTag.as_str());
                return;
            }
        }
    }
}
