use crate::tokenizer::CHAR_NUL;
use sanehtml_shared::location::Location;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The different token structures that can be emitted by the tokenizer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Token {
    DocType {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        force_quirks: bool,
        #[serde(default)]
        pub_identifier: Option<String>,
        #[serde(default)]
        sys_identifier: Option<String>,
        #[serde(default)]
        location: Location,
    },
    StartTag {
        name: String,
        #[serde(default)]
        is_self_closing: bool,
        #[serde(default)]
        attributes: HashMap<String, String>,
        #[serde(default)]
        location: Location,
    },
    EndTag {
        name: String,
        #[serde(default)]
        is_self_closing: bool,
        #[serde(default)]
        location: Location,
    },
    Comment {
        comment: String,
        #[serde(default)]
        location: Location,
    },
    Text {
        text: String,
        /// Text that came from a `<![CDATA[ ]]>` section in foreign content
        #[serde(default)]
        is_cdata: bool,
        #[serde(default)]
        location: Location,
    },
    Eof {
        #[serde(default)]
        location: Location,
    },
}

impl Token {
    /// Returns true when there is a mixture of white and non-white and \0 characters in the token
    pub(crate) fn is_mixed(&self) -> bool {
        if let Token::Text { text: value, .. } = self {
            let mut found = 0;

            if value.chars().any(|ch| ch.is_ascii_whitespace()) {
                found += 1;
            }
            if value.chars().any(|ch| ch == CHAR_NUL) {
                found += 1;
            }
            if value.chars().any(|ch| !ch.is_ascii_whitespace() && ch != CHAR_NUL) {
                found += 1;
            }
            found > 1
        } else {
            false
        }
    }

    /// Returns true when there is a mixture of \0 and non-\0 characters in the token
    pub(crate) fn is_mixed_null(&self) -> bool {
        if let Token::Text { text: value, .. } = self {
            value.chars().any(|ch| ch == CHAR_NUL) && value.chars().any(|ch| ch != CHAR_NUL)
        } else {
            false
        }
    }

    #[must_use]
    pub fn get_location(&self) -> Location {
        match self {
            Token::DocType { location, .. }
            | Token::StartTag { location, .. }
            | Token::EndTag { location, .. }
            | Token::Comment { location, .. }
            | Token::Text { location, .. }
            | Token::Eof { location } => *location,
        }
    }

    /// Returns true when any of the characters in the token are null
    #[must_use]
    pub fn is_null(&self) -> bool {
        if let Token::Text { text: value, .. } = self {
            value.chars().any(|ch| ch == CHAR_NUL)
        } else {
            false
        }
    }

    /// Returns true when the token is an EOF token
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof { .. })
    }

    /// Returns true if the text token is empty or only contains whitespace
    #[must_use]
    pub fn is_empty_or_white(&self) -> bool {
        if let Token::Text { text: value, .. } = self {
            value.chars().all(|ch| ch.is_ascii_whitespace())
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_start_tag(&self, wanted_name: &str) -> bool {
        if let Token::StartTag { name, .. } = self {
            name == wanted_name
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_end_tag(&self, wanted_name: &str) -> bool {
        if let Token::EndTag { name, .. } = self {
            name == wanted_name
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_any_start_tag(&self) -> bool {
        matches!(self, Token::StartTag { .. })
    }

    #[must_use]
    pub fn is_text_token(&self) -> bool {
        matches!(self, Token::Text { .. })
    }
}

// Each token can be displayed as a string
impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Token::DocType {
                name,
                pub_identifier,
                sys_identifier,
                ..
            } => {
                write!(f, "<!DOCTYPE {}", name.clone().unwrap_or_default())?;
                if let Some(pub_id) = pub_identifier {
                    write!(f, r#" PUBLIC "{pub_id}""#)?;
                }
                if let Some(sys_id) = sys_identifier {
                    write!(f, r#" SYSTEM "{sys_id}""#)?;
                }
                write!(f, " />")
            }
            Token::Comment { comment: value, .. } => write!(f, "<!-- {value} -->"),
            Token::Text { text: value, is_cdata, .. } => {
                if *is_cdata {
                    write!(f, "<![CDATA[{value}]]>")
                } else {
                    write!(f, "{value}")
                }
            }
            Token::StartTag {
                name,
                is_self_closing,
                attributes,
                ..
            } => {
                write!(f, "<{name}")?;
                let mut sorted: Vec<_> = attributes.iter().collect();
                sorted.sort();
                for (key, value) in sorted {
                    write!(f, r#" {key}="{value}""#)?;
                }
                if *is_self_closing {
                    write!(f, " /")?;
                }
                write!(f, ">")
            }
            Token::EndTag {
                name, is_self_closing, ..
            } => write!(f, "</{}{}>", name, if *is_self_closing { "/" } else { "" }),
            Token::Eof { .. } => write!(f, "EOF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn text(value: &str) -> Token {
        Token::Text {
            text: value.to_string(),
            is_cdata: false,
            location: Location::default(),
        }
    }

    #[test_case("Hello\0World", true ; "embedded null")]
    #[test_case("Hello World", false ; "no null")]
    fn token_is_null(value: &str, expected: bool) {
        assert_eq!(text(value).is_null(), expected);
    }

    #[test_case("  foo", true ; "whitespace and text")]
    #[test_case("foo\0", true ; "text and null")]
    #[test_case("   ", false ; "only whitespace")]
    #[test_case("foo", false ; "only text")]
    fn token_is_mixed(value: &str, expected: bool) {
        assert_eq!(text(value).is_mixed(), expected);
    }

    #[test]
    fn token_is_mixed_null() {
        assert!(text("a\0").is_mixed_null());
        assert!(!text("\0\0").is_mixed_null());
    }

    #[test]
    fn token_is_empty_or_white() {
        assert!(text(" \n\t").is_empty_or_white());
        assert!(text("").is_empty_or_white());
        assert!(!text(" x ").is_empty_or_white());
        assert!(!Token::Eof {
            location: Location::default()
        }
        .is_empty_or_white());
    }

    #[test]
    fn token_display() {
        let token = Token::DocType {
            name: Some("html".to_string()),
            force_quirks: false,
            pub_identifier: Some("foo".to_string()),
            sys_identifier: Some("bar".to_string()),
            location: Location::default(),
        };
        assert_eq!(format!("{token}"), r#"<!DOCTYPE html PUBLIC "foo" SYSTEM "bar" />"#);

        let mut attributes = HashMap::new();
        attributes.insert("id".to_string(), "x".to_string());
        attributes.insert("class".to_string(), "y".to_string());
        let token = Token::StartTag {
            name: "div".to_string(),
            is_self_closing: true,
            attributes,
            location: Location::default(),
        };
        assert_eq!(format!("{token}"), r#"<div class="y" id="x" />"#);

        let token = Token::Text {
            text: "x<y".to_string(),
            is_cdata: true,
            location: Location::default(),
        };
        assert_eq!(format!("{token}"), "<![CDATA[x<y]]>");
    }

    #[test]
    fn token_predicates() {
        let token = Token::StartTag {
            name: "div".to_string(),
            is_self_closing: false,
            attributes: HashMap::new(),
            location: Location::default(),
        };
        assert!(token.is_start_tag("div"));
        assert!(!token.is_start_tag("span"));
        assert!(token.is_any_start_tag());
        assert!(!token.is_text_token());
        assert!(!token.is_end_tag("div"));
    }

    #[test]
    fn token_from_json() {
        let json = r#"{"type": "start_tag", "name": "b", "attributes": {"id": "1"}}"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert!(token.is_start_tag("b"));
        assert_eq!(token.get_location(), Location::default());

        let json = r#"{"type": "text", "text": "hi"}"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token, text("hi"));
    }
}
