//! HTML5 tree construction
//!
//! The tree builder takes a stream of tokens and turns it into a tree, repairing malformed markup
//! the way browsers do. Lexing is not part of this crate: tokens come in through the
//! [`tokenizer::TokenSource`] trait, and the tree goes out through the
//! [`parser::tree_builder::TreeSink`] trait, which [`document::Document`] implements.
use crate::document::Document;
use crate::parser::{Html5Parser, Html5ParserOptions};
use crate::tokenizer::token::Token;
use crate::tokenizer::TokenQueue;
use sanehtml_shared::types::{ParseError, Result};

pub mod document;
pub mod node;
pub mod parser;
pub mod testing;
pub mod tokenizer;
pub mod writer;

/// Builds a document from an already lexed token stream
pub fn build_document(tokens: Vec<Token>, options: Option<Html5ParserOptions>) -> Result<(Document, Vec<ParseError>)> {
    let mut queue = TokenQueue::new(tokens);
    let mut document = Document::new();

    let errors = Html5Parser::parse_document(&mut queue, &mut document, options)?;

    Ok((document, errors))
}
