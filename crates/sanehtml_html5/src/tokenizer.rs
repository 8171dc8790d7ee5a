//! Token source seam between the lexer and the tree builder
//!
//! The tree builder never reads characters itself. It pulls [`Token`]s through the
//! [`TokenSource`] trait, and talks back to the lexer through the same trait: switching the
//! lexer sub-state (for instance after `<textarea>` or `<script>`), pushing synthetic tokens in
//! front of the queue, and sharing the error logger so lexer and builder errors end up in one
//! capped log.
pub mod state;
pub mod token;

use crate::node::Namespace;
use crate::parser::errors::ErrorLogger;
use crate::tokenizer::state::State;
use crate::tokenizer::token::Token;
use log::trace;
use sanehtml_shared::location::Location;
use sanehtml_shared::types::{Error, ParseError, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub const CHAR_NUL: char = '\u{0000}';
pub const CHAR_REPLACEMENT: char = '\u{FFFD}';

/// Information the tokenizer needs from the tree builder for the next token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParserData {
    /// Namespace of the adjusted current node. CDATA sections are only allowed outside of html.
    pub adjusted_node_namespace: Namespace,
}

impl Default for ParserData {
    fn default() -> Self {
        Self {
            adjusted_node_namespace: Namespace::Html,
        }
    }
}

/// Anything that can feed tokens to the tree builder
pub trait TokenSource {
    /// Returns the next token. Once the input is exhausted this keeps returning `Token::Eof`.
    fn next_token(&mut self, parser_data: ParserData) -> Result<Token>;

    /// Switches the lexer into the given sub-state
    fn set_state(&mut self, state: State);

    /// Inserts tokens at the front of the queue so they are returned before anything else
    fn insert_tokens_at_queue_start(&mut self, tokens: &[Token]);

    /// Current position in the input
    fn get_location(&self) -> Location;

    /// Shares the error logger of the tree builder so lexer errors are reported in the same log
    fn attach_error_logger(&mut self, _error_logger: Rc<RefCell<ErrorLogger>>) {}
}

/// An already lexed token stream held in memory
pub struct TokenQueue {
    tokens: VecDeque<Token>,
    state: State,
    last_location: Location,
    /// Lexer errors that were recorded together with the tokens
    pending_errors: Vec<ParseError>,
    error_logger: Option<Rc<RefCell<ErrorLogger>>>,
}

impl TokenQueue {
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into(),
            state: State::Data,
            last_location: Location::default(),
            pending_errors: Vec::new(),
            error_logger: None,
        }
    }

    /// Adds lexer errors that will be reported once an error logger is attached
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ParseError>) -> Self {
        self.pending_errors = errors;
        self
    }

    /// Reads a JSON array of tokens
    pub fn from_json(json: &str) -> Result<Self> {
        let tokens: Vec<Token> =
            serde_json::from_str(json).map_err(|e| Error::TokenSource(format!("invalid token stream: {e}")))?;
        Ok(Self::new(tokens))
    }

    /// The sub-state the builder last requested
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Number of tokens that have not been consumed yet
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }

    fn flush_pending_errors(&mut self) {
        let Some(logger) = &self.error_logger else {
            return;
        };

        for error in self.pending_errors.drain(..) {
            logger.borrow_mut().add_error(error.location, &error.message);
        }
    }
}

impl TokenSource for TokenQueue {
    fn next_token(&mut self, _parser_data: ParserData) -> Result<Token> {
        self.flush_pending_errors();

        match self.tokens.pop_front() {
            Some(token) => {
                self.last_location = token.get_location();
                Ok(token)
            }
            None => Ok(Token::Eof {
                location: self.last_location,
            }),
        }
    }

    fn set_state(&mut self, state: State) {
        trace!("tokenizer state: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn insert_tokens_at_queue_start(&mut self, tokens: &[Token]) {
        for token in tokens.iter().rev() {
            self.tokens.push_front(token.clone());
        }
    }

    fn get_location(&self) -> Location {
        self.last_location
    }

    fn attach_error_logger(&mut self, error_logger: Rc<RefCell<ErrorLogger>>) {
        self.error_logger = Some(error_logger);
        self.flush_pending_errors();
    }
}
