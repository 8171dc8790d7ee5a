//! Turning a document back into text
//!
//! [`TreeOutputGenerator`] produces the indented `| <html>` tree dump used by the html5lib tree
//! construction tests. [`DocumentWriter`] serializes a (sub)tree back to html.
//!
//! Both walk the tree with an explicit stack. The stack of open elements is capped while parsing
//! but the tree itself is not, so a document can nest deeper than the call stack allows.
use crate::document::Document;
use crate::node::data::NodeData;
use crate::node::elements::VOID_HTML_ELEMENTS;
use crate::node::Namespace;
use crate::parser::tree_builder::TreeSink;
use sanehtml_shared::node::NodeId;
use std::collections::HashMap;

/// Generates a tree output that can be used for matching with the expected output
pub struct TreeOutputGenerator<'a> {
    document: &'a Document,
}

impl<'a> TreeOutputGenerator<'a> {
    #[must_use]
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Generates the tree lines for the whole document
    #[must_use]
    pub fn generate(&self) -> Vec<String> {
        self.generate_children(self.document.document_id())
    }

    /// Generates the tree lines for the children of `node_id`, which itself is not part of the
    /// output. Used for fragment results.
    #[must_use]
    pub fn generate_children(&self, node_id: NodeId) -> Vec<String> {
        let mut output = Vec::new();

        let mut pending: Vec<(NodeId, usize)> = self
            .children(node_id)
            .iter()
            .rev()
            .map(|&child| (child, 0))
            .collect();

        while let Some((current, indent)) = pending.pop() {
            let Some(node) = self.document.node(current) else {
                continue;
            };
            let padding = "  ".repeat(indent);

            output.push(format!("| {padding}{}", Self::output_node(&node.data)));

            let mut child_indent = indent + 1;
            let mut children = node.children.as_slice();

            if let NodeData::Element(element) = &node.data {
                let mut sorted_attrs: Vec<_> = element.attributes.iter().collect();
                sorted_attrs.sort_by(|a, b| a.0.cmp(b.0));

                for (name, value) in sorted_attrs {
                    output.push(format!(r#"| {padding}  {name}="{value}""#));
                }

                // Template tags have an extra "content" node in the tree output
                if let Some(contents) = element.template_contents {
                    output.push(format!("| {padding}  content"));
                    child_indent += 1;
                    children = self.children(contents);
                }
            }

            pending.extend(children.iter().rev().map(|&child| (child, child_indent)));
        }

        output
    }

    fn children(&self, node_id: NodeId) -> &'a [NodeId] {
        self.document
            .node(node_id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Generate the output for a single node
    fn output_node(data: &NodeData) -> String {
        match data {
            NodeData::Element(element) => match element.namespace.prefix() {
                Some(prefix) => format!("<{prefix} {}>", element.name),
                None => format!("<{}>", element.name),
            },
            NodeData::Text { value } => format!(r#""{value}""#),
            NodeData::Comment { value } => format!("<!-- {value} -->"),
            NodeData::DocType {
                name,
                pub_identifier,
                sys_identifier,
            } => {
                if pub_identifier.is_empty() && sys_identifier.is_empty() {
                    format!("<!DOCTYPE {}>", name.trim())
                } else {
                    format!(r#"<!DOCTYPE {name} "{pub_identifier}" "{sys_identifier}">"#)
                }
            }
            NodeData::Document | NodeData::DocumentFragment => String::new(),
        }
    }
}

enum Step {
    Enter(NodeId),
    Leave(NodeId),
}

/// Writer to convert a document (or part of it) to html
pub struct DocumentWriter<'a> {
    document: &'a Document,
    buffer: String,
    /// Whether to include comments in the output
    comments: bool,
}

impl<'a> DocumentWriter<'a> {
    /// Serializes the node and everything below it
    #[must_use]
    pub fn write_from_node(document: &'a Document, node_id: NodeId) -> String {
        let mut writer = Self {
            document,
            buffer: String::new(),
            comments: true,
        };

        writer.write(node_id);
        writer.buffer
    }

    /// Serializes the node without any comments
    #[must_use]
    pub fn write_without_comments(document: &'a Document, node_id: NodeId) -> String {
        let mut writer = Self {
            document,
            buffer: String::new(),
            comments: false,
        };

        writer.write(node_id);
        writer.buffer
    }

    fn write(&mut self, node_id: NodeId) {
        let document = self.document;
        let mut steps = vec![Step::Enter(node_id)];

        while let Some(step) = steps.pop() {
            match step {
                Step::Enter(current) => {
                    let Some(node) = document.node(current) else {
                        continue;
                    };

                    let children = match &node.data {
                        NodeData::Element(element) => {
                            self.element_enter(&element.name, element.namespace, &element.attributes);
                            if element.namespace == Namespace::Html && VOID_HTML_ELEMENTS.contains(element.name.as_str()) {
                                continue;
                            }
                            steps.push(Step::Leave(current));

                            match element.template_contents.and_then(|id| document.node(id)) {
                                Some(contents) => contents.children.as_slice(),
                                None => node.children.as_slice(),
                            }
                        }
                        NodeData::Text { value } => {
                            self.text(current, value);
                            continue;
                        }
                        NodeData::Comment { value } => {
                            if self.comments {
                                self.buffer.push_str("<!--");
                                self.buffer.push_str(value);
                                self.buffer.push_str("-->");
                            }
                            continue;
                        }
                        NodeData::DocType { name, .. } => {
                            self.buffer.push_str("<!DOCTYPE ");
                            self.buffer.push_str(name);
                            self.buffer.push('>');
                            continue;
                        }
                        NodeData::Document | NodeData::DocumentFragment => node.children.as_slice(),
                    };

                    steps.extend(children.iter().rev().map(|&child| Step::Enter(child)));
                }
                Step::Leave(current) => {
                    if let Some(element) = document.element(current) {
                        self.buffer.push_str("</");
                        self.buffer.push_str(&element.name);
                        self.buffer.push('>');
                    }
                }
            }
        }
    }

    fn element_enter(
        &mut self,
        name: &str,
        namespace: Namespace,
        attributes: &HashMap<String, String>,
    ) {
        self.buffer.push('<');
        self.buffer.push_str(name);

        let mut sorted_attrs: Vec<_> = attributes.iter().collect();
        sorted_attrs.sort_by(|a, b| a.0.cmp(b.0));

        for (attr_name, value) in sorted_attrs {
            self.buffer.push(' ');
            if namespace == Namespace::Html {
                self.buffer.push_str(attr_name);
            } else {
                // foreign attributes are stored as "prefix local"
                self.buffer.push_str(&attr_name.replacen(' ', ":", 1));
            }
            self.buffer.push_str("=\"");
            self.buffer.push_str(&escape(value, true));
            self.buffer.push('"');
        }

        self.buffer.push('>');
    }

    fn text(&mut self, node_id: NodeId, value: &str) {
        let raw_parent = self
            .document
            .node(node_id)
            .and_then(|node| node.parent)
            .and_then(|parent| self.document.element(parent))
            .is_some_and(|parent| {
                parent.namespace == Namespace::Html
                    && [
                        "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
                    ]
                    .contains(&parent.name.as_str())
            });

        if raw_parent {
            self.buffer.push_str(value);
        } else {
            self.buffer.push_str(&escape(value, false));
        }
    }
}

fn escape(value: &str, in_attribute: bool) -> String {
    let mut result = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '\u{00A0}' => result.push_str("&nbsp;"),
            '"' if in_attribute => result.push_str("&quot;"),
            '<' if !in_attribute => result.push_str("&lt;"),
            '>' if !in_attribute => result.push_str("&gt;"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanehtml_shared::location::Location;

    fn element(doc: &mut Document, parent: NodeId, name: &str, namespace: Namespace) -> NodeId {
        let node_id = doc.create_element(name, namespace, &HashMap::new(), Location::default());
        doc.append(parent, node_id);
        node_id
    }

    fn text(doc: &mut Document, parent: NodeId, value: &str) {
        let node_id = doc.create_text(value, Location::default());
        doc.append(parent, node_id);
    }

    #[test]
    fn tree_dump() {
        let mut doc = Document::new();
        let root = doc.document_id();
        let doctype = doc.create_doctype("html", "", "", Location::default());
        doc.append(root, doctype);

        let html = element(&mut doc, root, "html", Namespace::Html);
        element(&mut doc, html, "head", Namespace::Html);
        let body = element(&mut doc, html, "body", Namespace::Html);

        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), "x".to_string());
        attrs.insert("class".to_string(), "y".to_string());
        let div = doc.create_element("div", Namespace::Html, &attrs, Location::default());
        doc.append(body, div);
        text(&mut doc, div, "hi");

        let svg = element(&mut doc, body, "svg", Namespace::Svg);
        element(&mut doc, svg, "foreignObject", Namespace::Svg);

        let comment = doc.create_comment("done", Location::default());
        doc.append(body, comment);

        let output = TreeOutputGenerator::new(&doc).generate();
        assert_eq!(
            output,
            vec![
                "| <!DOCTYPE html>",
                "| <html>",
                "|   <head>",
                "|   <body>",
                "|     <div>",
                r#"|       class="y""#,
                r#"|       id="x""#,
                r#"|       "hi""#,
                "|     <svg svg>",
                "|       <svg foreignObject>",
                "|     <!-- done -->",
            ]
        );
    }

    #[test]
    fn template_contents_are_dumped() {
        let mut doc = Document::new();
        let root = doc.document_id();
        let template = element(&mut doc, root, "template", Namespace::Html);
        let contents = doc.template_contents(template).unwrap();
        element(&mut doc, contents, "p", Namespace::Html);

        let output = TreeOutputGenerator::new(&doc).generate();
        assert_eq!(output, vec!["| <template>", "|   content", "|     <p>"]);

        assert_eq!(DocumentWriter::write_from_node(&doc, template), "<template><p></p></template>");
    }

    #[test]
    fn serialize_html() {
        let mut doc = Document::new();
        let root = doc.document_id();
        let body = element(&mut doc, root, "body", Namespace::Html);
        let p = element(&mut doc, body, "p", Namespace::Html);
        text(&mut doc, p, "a < b & c");
        element(&mut doc, p, "br", Namespace::Html);
        let script = element(&mut doc, body, "script", Namespace::Html);
        text(&mut doc, script, "if (a < b) {}");
        let comment = doc.create_comment("note", Location::default());
        doc.append(body, comment);

        assert_eq!(
            DocumentWriter::write_from_node(&doc, body),
            "<body><p>a &lt; b &amp; c<br></p><script>if (a < b) {}</script><!--note--></body>"
        );
        assert_eq!(
            DocumentWriter::write_without_comments(&doc, body),
            "<body><p>a &lt; b &amp; c<br></p><script>if (a < b) {}</script></body>"
        );
    }

    #[test]
    fn foreign_attributes_get_their_colon_back() {
        let mut doc = Document::new();
        let root = doc.document_id();
        let mut attrs = HashMap::new();
        attrs.insert("xlink href".to_string(), "#a".to_string());
        let svg = doc.create_element("use", Namespace::Svg, &attrs, Location::default());
        doc.append(root, svg);

        assert_eq!(DocumentWriter::write_from_node(&doc, svg), r##"<use xlink:href="#a"></use>"##);
    }

    #[test]
    fn deep_trees_do_not_overflow() {
        let mut doc = Document::new();
        let mut parent = doc.document_id();
        for _ in 0..100_000 {
            parent = element(&mut doc, parent, "div", Namespace::Html);
        }

        let html = DocumentWriter::write_from_node(&doc, doc.document_id());
        assert!(html.starts_with("<div><div>"));
        assert!(html.ends_with("</div></div>"));
        assert_eq!(html.len(), 100_000 * "<div></div>".len());
    }

    #[test]
    fn deep_tree_dump() {
        let mut doc = Document::new();
        let mut parent = doc.document_id();
        for _ in 0..2_000 {
            parent = element(&mut doc, parent, "div", Namespace::Html);
        }

        let output = TreeOutputGenerator::new(&doc).generate();
        assert_eq!(output.len(), 2_000);
        assert_eq!(output[1], "|   <div>");
    }
}
