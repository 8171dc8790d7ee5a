use sanehtml_shared::location::Location;
use sanehtml_shared::types::ParseError;
use thiserror::Error;

/// Recurring tree construction errors
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("expected-doctype-but-got-chars")]
    ExpectedDocTypeButGotChars,
    #[error("expected-doctype-but-got-start-tag")]
    ExpectedDocTypeButGotStartTag,
    #[error("expected-doctype-but-got-end-tag")]
    ExpectedDocTypeButGotEndTag,
    #[error("expected-doctype-but-got-eof")]
    ExpectedDocTypeButGotEof,
    #[error("unexpected-doctype")]
    UnexpectedDocType,
    #[error("unexpected-null-character")]
    UnexpectedNullCharacter,
    #[error("unexpected-end-tag")]
    UnexpectedEndTag,
    #[error("end-tag-too-early")]
    EndTagTooEarly,
    #[error("eof-in-template")]
    EofInTemplate,
    #[error("Tag cannot be self closing; not a void tag")]
    NonVoidHtmlElementStartTagWithTrailingSolidus,
    #[error("foster-parented-content")]
    FosterParentedContent,
    #[error("misnested-formatting-element")]
    MisnestedFormattingElement,
}

impl ParserError {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserError::ExpectedDocTypeButGotChars => "expected-doctype-but-got-chars",
            ParserError::ExpectedDocTypeButGotStartTag => "expected-doctype-but-got-start-tag",
            ParserError::ExpectedDocTypeButGotEndTag => "expected-doctype-but-got-end-tag",
            ParserError::ExpectedDocTypeButGotEof => "expected-doctype-but-got-eof",
            ParserError::UnexpectedDocType => "unexpected-doctype",
            ParserError::UnexpectedNullCharacter => "unexpected-null-character",
            ParserError::UnexpectedEndTag => "unexpected-end-tag",
            ParserError::EndTagTooEarly => "end-tag-too-early",
            ParserError::EofInTemplate => "eof-in-template",
            ParserError::NonVoidHtmlElementStartTagWithTrailingSolidus => "Tag cannot be self closing; not a void tag",
            ParserError::FosterParentedContent => "foster-parented-content",
            ParserError::MisnestedFormattingElement => "misnested-formatting-element",
        }
    }
}

/// Collects parse errors from both the tokenizer and the tree builder.
///
/// The log is capped: once `max_errors` entries are stored, further errors are dropped. A cap of
/// zero disables tracking altogether. Errors with the same message at the same line and column
/// are only stored once.
#[derive(Clone, Debug)]
pub struct ErrorLogger {
    errors: Vec<ParseError>,
    max_errors: usize,
}

impl ErrorLogger {
    #[must_use]
    pub fn new(max_errors: usize) -> Self {
        Self {
            errors: Vec::new(),
            max_errors,
        }
    }

    /// Returns true when there is still room in the log
    #[must_use]
    pub fn can_add_error(&self) -> bool {
        self.errors.len() < self.max_errors
    }

    #[must_use]
    pub fn get_errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Adds a new error to the log, unless it is full or the same error was already reported
    pub fn add_error(&mut self, location: Location, message: &str) {
        if !self.can_add_error() {
            return;
        }

        if self.errors.iter().any(|err| {
            err.location.line == location.line && err.location.column == location.column && err.message == message
        }) {
            return;
        }

        self.errors.push(ParseError {
            message: message.to_string(),
            location,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_stored_once() {
        let mut logger = ErrorLogger::new(100);

        for _ in 0..5 {
            logger.add_error(Location::new(1, 1, 0), "test");
        }
        assert_eq!(logger.get_errors().len(), 1);
    }

    #[test]
    fn same_message_on_other_positions() {
        let mut logger = ErrorLogger::new(100);

        for col in 1..=5 {
            logger.add_error(Location::new(1, col, 0), "test");
            logger.add_error(Location::new(1, col, 0), "test");
        }
        logger.add_error(Location::new(1, 5, 0), "other");
        assert_eq!(logger.get_errors().len(), 6);
    }

    #[test]
    fn log_is_capped() {
        let mut logger = ErrorLogger::new(3);

        for col in 1..=10 {
            logger.add_error(Location::new(1, col, 0), "test");
        }
        assert_eq!(logger.get_errors().len(), 3);
        assert!(!logger.can_add_error());
        assert_eq!(logger.get_errors()[2].location.column, 3);
    }

    #[test]
    fn zero_cap_disables_tracking() {
        let mut logger = ErrorLogger::new(0);
        assert!(!logger.can_add_error());
        logger.add_error(Location::default(), "test");
        assert!(logger.get_errors().is_empty());
    }

    #[test]
    fn parser_error_strings() {
        assert_eq!(ParserError::ExpectedDocTypeButGotChars.as_str(), "expected-doctype-but-got-chars");
        assert_eq!(
            ParserError::NonVoidHtmlElementStartTagWithTrailingSolidus.to_string(),
            ParserError::NonVoidHtmlElementStartTagWithTrailingSolidus.as_str()
        );
    }
}
