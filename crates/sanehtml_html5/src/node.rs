use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

pub mod arena;
pub mod data;
pub mod elements;

/// Element namespaces the tree builder can create elements in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    #[default]
    Html,
    MathMl,
    Svg,
}

impl Namespace {
    /// Returns the namespace URI
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Html => HTML_NAMESPACE,
            Namespace::MathMl => MATHML_NAMESPACE,
            Namespace::Svg => SVG_NAMESPACE,
        }
    }

    /// Short name as used in tree dumps (`svg path`, `math mi`)
    #[must_use]
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            Namespace::Html => None,
            Namespace::MathMl => Some("math"),
            Namespace::Svg => Some("svg"),
        }
    }

    /// Parses either a namespace URI or a short name (`html`, `math`, `svg`)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            HTML_NAMESPACE | "html" => Some(Namespace::Html),
            MATHML_NAMESPACE | "math" | "mathml" => Some(Namespace::MathMl),
            SVG_NAMESPACE | "svg" => Some(Namespace::Svg),
            _ => None,
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
