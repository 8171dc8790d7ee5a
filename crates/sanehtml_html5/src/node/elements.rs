use crate::node::Namespace;
use std::collections::HashMap;

pub static FORMATTING_HTML_ELEMENTS: phf::Set<&'static str> = phf::phf_set! {
    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong", "tt", "u",
};

pub static SPECIAL_HTML_ELEMENTS: phf::Set<&'static str> = phf::phf_set! {
    "address", "applet", "area", "article", "aside", "base", "basefont", "bgsound", "blockquote",
    "body", "br", "button", "caption", "center", "col", "colgroup", "dd", "details", "dir", "div",
    "dl", "dt", "embed", "fieldset", "figcaption", "figure", "footer", "form", "frame", "frameset",
    "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "iframe", "img",
    "input", "keygen", "li", "link", "listing", "main", "marquee", "menu", "meta", "nav", "noembed",
    "noframes", "noscript", "object", "ol", "p", "param", "plaintext", "pre", "script", "search",
    "section", "select", "source", "style", "summary", "table", "tbody", "td", "template",
    "textarea", "tfoot", "th", "thead", "title", "tr", "track", "ul", "wbr", "xmp",
};

pub static SPECIAL_MATHML_ELEMENTS: phf::Set<&'static str> = phf::phf_set! {
    "mi", "mo", "mn", "ms", "mtext", "annotation-xml",
};

pub static SPECIAL_SVG_ELEMENTS: phf::Set<&'static str> = phf::phf_set! {
    "foreignObject", "desc", "title",
};

/// Elements without content. These are never pushed onto the stack of open elements.
pub static VOID_HTML_ELEMENTS: phf::Set<&'static str> = phf::phf_set! {
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "image", "img",
    "input", "keygen", "link", "meta", "param", "source", "track", "wbr",
};

/// All standard html tag names, including obsolete ones that still have parsing rules
pub static KNOWN_HTML_ELEMENTS: phf::Set<&'static str> = phf::phf_set! {
    "a", "abbr", "acronym", "address", "applet", "area", "article", "aside", "audio", "b", "base",
    "basefont", "bdi", "bdo", "bgsound", "big", "blink", "blockquote", "body", "br", "button",
    "canvas", "caption", "center", "cite", "code", "col", "colgroup", "data", "datalist", "dd",
    "del", "details", "dfn", "dialog", "dir", "div", "dl", "dt", "em", "embed", "fieldset",
    "figcaption", "figure", "font", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4",
    "h5", "h6", "head", "header", "hgroup", "hr", "html", "i", "iframe", "image", "img", "input",
    "ins", "isindex", "kbd", "keygen", "label", "legend", "li", "link", "listing", "main", "map",
    "mark", "marquee", "menu", "menuitem", "meta", "meter", "nav", "nobr", "noembed", "noframes",
    "noscript", "object", "ol", "optgroup", "option", "output", "p", "param", "picture",
    "plaintext", "pre", "progress", "q", "rb", "rp", "rt", "rtc", "ruby", "s", "samp", "script",
    "search", "section", "select", "slot", "small", "source", "span", "strike", "strong", "style",
    "sub", "summary", "sup", "table", "tbody", "td", "template", "textarea", "tfoot", "th",
    "thead", "time", "title", "tr", "track", "tt", "u", "ul", "var", "video", "wbr", "xmp",
};

/// Returns true for the elements in the "special" category of their namespace
#[must_use]
pub fn is_special_element(name: &str, namespace: Namespace) -> bool {
    match namespace {
        Namespace::Html => SPECIAL_HTML_ELEMENTS.contains(name),
        Namespace::MathMl => SPECIAL_MATHML_ELEMENTS.contains(name),
        Namespace::Svg => SPECIAL_SVG_ELEMENTS.contains(name),
    }
}

#[must_use]
pub fn is_mathml_text_integration_point(name: &str, namespace: Namespace) -> bool {
    namespace == Namespace::MathMl && ["mi", "mo", "mn", "ms", "mtext"].contains(&name)
}

/// MathML `annotation-xml` with an html encoding, or one of the svg elements that embed html
#[must_use]
pub fn is_html_integration_point(name: &str, namespace: Namespace, attributes: &HashMap<String, String>) -> bool {
    match namespace {
        Namespace::MathMl if name == "annotation-xml" => attributes.get("encoding").is_some_and(|value| {
            value.eq_ignore_ascii_case("text/html") || value.eq_ignore_ascii_case("application/xhtml+xml")
        }),
        Namespace::Svg => ["foreignObject", "desc", "title"].contains(&name),
        _ => false,
    }
}

/// Tag name lookup: which html tags are known, and which are void.
///
/// Custom tags can be registered on top of the standard set. A registered void tag is treated
/// exactly like `<br>`: inserted without being pushed on the stack of open elements.
#[derive(Clone, Debug, Default)]
pub struct TagRegistry {
    custom: HashMap<String, bool>,
}

impl TagRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom tag (or overrides the void flag of a standard one)
    pub fn register(&mut self, name: &str, is_void: bool) {
        self.custom.insert(name.to_ascii_lowercase(), is_void);
    }

    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.custom.contains_key(name) || KNOWN_HTML_ELEMENTS.contains(name)
    }

    #[must_use]
    pub fn is_void(&self, name: &str) -> bool {
        match self.custom.get(name) {
            Some(is_void) => *is_void,
            None => VOID_HTML_ELEMENTS.contains(name),
        }
    }
}
