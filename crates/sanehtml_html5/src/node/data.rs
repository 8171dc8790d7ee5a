use crate::node::elements::{
    is_html_integration_point, is_mathml_text_integration_point, is_special_element, FORMATTING_HTML_ELEMENTS,
};
use crate::node::Namespace;
use sanehtml_shared::location::Location;
use sanehtml_shared::node::NodeId;
use std::collections::HashMap;

/// Data that is specific to an element node
#[derive(Clone, Debug, PartialEq)]
pub struct ElementData {
    /// Name of the element (e.g., div)
    pub name: String,
    pub namespace: Namespace,
    /// Element's attributes stored as key-value pairs. Foreign attributes that are namespaced
    /// are stored as "prefix local" (`xlink href`).
    pub attributes: HashMap<String, String>,
    /// Content fragment of a `<template>` element, created on first use
    pub template_contents: Option<NodeId>,
}

impl ElementData {
    #[must_use]
    pub fn new(name: &str, namespace: Namespace, attributes: HashMap<String, String>) -> Self {
        Self {
            name: name.to_string(),
            namespace,
            attributes,
            template_contents: None,
        }
    }

    #[must_use]
    pub fn is(&self, name: &str, namespace: Namespace) -> bool {
        self.namespace == namespace && self.name == name
    }

    /// Compares tag, namespace and attributes. Attribute order does not matter.
    #[must_use]
    pub fn matches_tag_and_attrs_without_order(&self, other: &ElementData) -> bool {
        self.name == other.name && self.namespace == other.namespace && self.attributes == other.attributes
    }

    /// Returns true if the element is a mathml text integration point
    /// See: https://html.spec.whatwg.org/multipage/parsing.html#mathml-text-integration-point
    #[must_use]
    pub fn is_mathml_text_integration_point(&self) -> bool {
        is_mathml_text_integration_point(&self.name, self.namespace)
    }

    /// Returns true if the element is a html integration point
    /// See: https://html.spec.whatwg.org/multipage/parsing.html#html-integration-point
    #[must_use]
    pub fn is_html_integration_point(&self) -> bool {
        is_html_integration_point(&self.name, self.namespace, &self.attributes)
    }

    /// Returns true if the element is in the "special" category
    #[must_use]
    pub fn is_special(&self) -> bool {
        is_special_element(&self.name, self.namespace)
    }

    #[must_use]
    pub fn is_formatting(&self) -> bool {
        self.namespace == Namespace::Html && FORMATTING_HTML_ELEMENTS.contains(self.name.as_str())
    }
}

/// Different types of nodes and their data
#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    Document,
    /// Detached root used for fragment results and template contents
    DocumentFragment,
    DocType {
        name: String,
        pub_identifier: String,
        sys_identifier: String,
    },
    Text {
        value: String,
    },
    Comment {
        value: String,
    },
    Element(ElementData),
}

/// A single node in the arena
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
    pub location: Location,
}

impl Node {
    #[must_use]
    pub fn new(data: NodeData, location: Location) -> Self {
        Self {
            id: NodeId::default(),
            parent: None,
            children: Vec::new(),
            data,
            location,
        }
    }

    #[must_use]
    pub fn element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn element(name: &str, namespace: Namespace, attrs: &[(&str, &str)]) -> ElementData {
        let attributes = attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ElementData::new(name, namespace, attributes)
    }

    #[test_case("text/html", true)]
    #[test_case("TEXT/HTML", true)]
    #[test_case("application/xhtml+xml", true)]
    #[test_case("image/svg+xml", false)]
    fn annotation_xml_integration_point(encoding: &str, expected: bool) {
        let data = element("annotation-xml", Namespace::MathMl, &[("encoding", encoding)]);
        assert_eq!(data.is_html_integration_point(), expected);
        assert!(!data.is_mathml_text_integration_point());
    }

    #[test]
    fn svg_integration_points() {
        assert!(element("foreignObject", Namespace::Svg, &[]).is_html_integration_point());
        assert!(element("title", Namespace::Svg, &[]).is_html_integration_point());
        assert!(!element("title", Namespace::Html, &[]).is_html_integration_point());
        assert!(!element("path", Namespace::Svg, &[]).is_html_integration_point());
    }

    #[test]
    fn mathml_text_integration_points() {
        assert!(element("mi", Namespace::MathMl, &[]).is_mathml_text_integration_point());
        assert!(!element("mi", Namespace::Html, &[]).is_mathml_text_integration_point());
    }

    #[test]
    fn special_and_formatting() {
        assert!(element("div", Namespace::Html, &[]).is_special());
        assert!(!element("div", Namespace::Svg, &[]).is_special());
        assert!(element("desc", Namespace::Svg, &[]).is_special());
        assert!(element("b", Namespace::Html, &[]).is_formatting());
        assert!(!element("b", Namespace::MathMl, &[]).is_formatting());
    }

    #[test]
    fn attributes_compare_without_order() {
        let a = element("b", Namespace::Html, &[("id", "1"), ("class", "x")]);
        let b = element("b", Namespace::Html, &[("class", "x"), ("id", "1")]);
        let c = element("b", Namespace::Html, &[("class", "x")]);
        assert!(a.matches_tag_and_attrs_without_order(&b));
        assert!(!a.matches_tag_and_attrs_without_order(&c));
    }
}
