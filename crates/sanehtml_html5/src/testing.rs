//! Token builders
//!
//! Small constructors for [`Token`]s, used by unit tests, the integration tests and the benches to
//! write token streams without spelling out every field.
use crate::tokenizer::token::Token;
use sanehtml_shared::location::Location;
use std::collections::HashMap;

#[must_use]
pub fn start(name: &str) -> Token {
    start_with_attrs(name, &[])
}

/// Start tag with the given attributes. Later duplicates are dropped, like the lexer does.
#[must_use]
pub fn start_with_attrs(name: &str, attributes: &[(&str, &str)]) -> Token {
    let mut attrs = HashMap::new();
    for (key, value) in attributes {
        attrs.entry((*key).to_string()).or_insert_with(|| (*value).to_string());
    }

    Token::StartTag {
        name: name.to_string(),
        is_self_closing: false,
        attributes: attrs,
        location: Location::default(),
    }
}

/// Start tag with the self-closing flag set (`<br/>`)
#[must_use]
pub fn self_closing(name: &str) -> Token {
    Token::StartTag {
        name: name.to_string(),
        is_self_closing: true,
        attributes: HashMap::new(),
        location: Location::default(),
    }
}

#[must_use]
pub fn end(name: &str) -> Token {
    Token::EndTag {
        name: name.to_string(),
        is_self_closing: false,
        location: Location::default(),
    }
}

#[must_use]
pub fn text(value: &str) -> Token {
    Token::Text {
        text: value.to_string(),
        is_cdata: false,
        location: Location::default(),
    }
}

#[must_use]
pub fn comment(value: &str) -> Token {
    Token::Comment {
        comment: value.to_string(),
        location: Location::default(),
    }
}

/// `<!DOCTYPE name>` without public or system identifier
#[must_use]
pub fn doctype(name: &str) -> Token {
    Token::DocType {
        name: Some(name.to_string()),
        force_quirks: false,
        pub_identifier: None,
        sys_identifier: None,
        location: Location::default(),
    }
}

#[must_use]
pub fn eof() -> Token {
    Token::Eof {
        location: Location::default(),
    }
}
