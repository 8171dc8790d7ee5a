//! HTML5 tree construction
//!
//! The [`Html5Parser`] consumes [`Token`]s from a [`TokenSource`] and builds a tree inside a
//! [`TreeSink`]. It never fails on malformed markup: anything unexpected is written to the
//! (capped) error log and repaired the way the html5 tree construction rules describe.
//!
//! The amount of work per token is bounded, even for hostile input. The stack of open elements
//! tracks at most `max_stack_depth` elements (when it is full, the newest entries are pruned from
//! the stack but stay in the tree), and the list of active formatting elements only ever looks back
//! `max_formatting_lookback` entries.
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::node::elements::{
    is_html_integration_point, is_mathml_text_integration_point, is_special_element, TagRegistry,
};
use crate::node::Namespace;
use crate::parser::attr_replacements::{
    MATHML_ADJUSTMENTS, SVG_ADJUSTMENTS_ATTRIBUTES, SVG_ADJUSTMENTS_TAGS, XML_ADJUSTMENTS,
};
use crate::parser::errors::{ErrorLogger, ParserError};
use crate::parser::formatting::ActiveFormattingElements;
use crate::parser::quirks::{identify_quirks_mode, QuirksMode};
use crate::parser::stack::{OpenElements, Scope};
use crate::parser::tree_builder::TreeSink;
use crate::tokenizer::state::State;
use crate::tokenizer::token::Token;
use crate::tokenizer::{ParserData, TokenSource, CHAR_NUL, CHAR_REPLACEMENT};
use log::debug;
use sanehtml_shared::location::Location;
use sanehtml_shared::node::NodeId;
use sanehtml_shared::types::{ParseError, Result};
use serde::{Deserialize, Serialize};

mod attr_replacements;
pub mod errors;
pub mod formatting;
mod helper;
pub mod quirks;
pub mod stack;
pub mod tree_builder;

/// Insertion modes as defined in 13.2.4.1
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    Text,
    InTable,
    InTableText,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InTemplate,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
}

/// Decides per token whether the insertion mode handles it, or the rules for foreign content
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DispatcherMode {
    Foreign,
    Html,
}

const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Start tags that break out of foreign content back into html
const FOREIGN_BREAKOUT_TAGS: [&str; 44] = [
    "b", "big", "blockquote", "body", "br", "center", "code", "dd", "div", "dl", "dt", "em", "embed", "h1", "h2",
    "h3", "h4", "h5", "h6", "head", "hr", "i", "img", "li", "listing", "menu", "meta", "nobr", "ol", "p", "pre",
    "ruby", "s", "small", "span", "strong", "strike", "sub", "sup", "table", "tt", "u", "ul", "var",
];

/// Options that change the behaviour of the tree builder
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Html5ParserOptions {
    /// Parse `<noscript>` as raw text (scripting enabled) or as markup
    pub scripting_enabled: bool,
    /// Maximum number of parse errors kept. 0 disables error tracking.
    pub max_errors: usize,
    /// Maximum number of elements tracked on the stack of open elements
    pub max_stack_depth: usize,
    /// Number of entries the list of active formatting elements looks back when deduplicating
    /// and reconstructing
    pub max_formatting_lookback: usize,
    /// Extra tag names that are handled like void elements (`<br>`, `<img>`)
    pub custom_void_tags: Vec<String>,
}

impl Default for Html5ParserOptions {
    fn default() -> Self {
        Self {
            scripting_enabled: true,
            max_errors: 100,
            max_stack_depth: 256,
            max_formatting_lookback: 12,
            custom_void_tags: Vec::new(),
        }
    }
}

/// Result of a fragment parse
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentResult {
    /// Node that holds the parsed nodes
    pub root: NodeId,
    /// The parsed top-level nodes, in order
    pub nodes: Vec<NodeId>,
    pub errors: Vec<ParseError>,
}

/// The html5 tree builder
pub struct Html5Parser<'a, T: TokenSource, D: TreeSink> {
    /// Source of the tokens
    tokenizer: &'a mut T,
    /// Sink that receives the tree
    document: &'a mut D,
    options: Html5ParserOptions,
    /// Known and void tag names
    tags: TagRegistry,
    /// Node under which top-level nodes are inserted: the document, or a fragment root
    root: NodeId,

    insertion_mode: InsertionMode,
    /// Single slot used by the text and table text modes to return to the previous mode
    original_insertion_mode: InsertionMode,
    template_insertion_mode: Vec<InsertionMode>,

    current_token: Token,
    reprocess_token: bool,
    /// False when the current token was ignored
    token_handled: bool,
    /// Tokens split off a text token, processed before the next token is fetched
    token_queue: VecDeque<Token>,

    pub(crate) open_elements: OpenElements,
    pub(crate) active_formatting_elements: ActiveFormattingElements,
    head_element: Option<NodeId>,
    form_element: Option<NodeId>,

    frameset_ok: bool,
    foster_parenting: bool,
    pending_table_character_tokens: String,
    /// Drop a leading newline of the next text token (after `<pre>`, `<listing>`, `<textarea>`)
    ignore_lf: bool,
    parser_finished: bool,

    is_fragment_case: bool,
    context_node_id: Option<NodeId>,
    /// Element standing in for the context element at the bottom of the stack
    fragment_seed: Option<NodeId>,

    error_logger: Rc<RefCell<ErrorLogger>>,
}

impl<'a, T: TokenSource, D: TreeSink> Html5Parser<'a, T, D> {
    /// Creates a parser that builds a full document under the document node of the sink
    pub fn new(tokenizer: &'a mut T, document: &'a mut D, options: Html5ParserOptions) -> Self {
        let root = document.document_id();
        Self::with_root(tokenizer, document, root, options)
    }

    fn with_root(tokenizer: &'a mut T, document: &'a mut D, root: NodeId, options: Html5ParserOptions) -> Self {
        let error_logger = Rc::new(RefCell::new(ErrorLogger::new(options.max_errors)));
        tokenizer.attach_error_logger(error_logger.clone());

        let mut tags = TagRegistry::new();
        for name in &options.custom_void_tags {
            tags.register(name, true);
        }

        Self {
            tokenizer,
            document,
            tags,
            root,
            insertion_mode: InsertionMode::Initial,
            original_insertion_mode: InsertionMode::Initial,
            template_insertion_mode: Vec::new(),
            current_token: Token::Eof {
                location: Location::default(),
            },
            reprocess_token: false,
            token_handled: true,
            token_queue: VecDeque::new(),
            open_elements: OpenElements::new(options.max_stack_depth),
            active_formatting_elements: ActiveFormattingElements::new(options.max_formatting_lookback),
            head_element: None,
            form_element: None,
            frameset_ok: true,
            foster_parenting: false,
            pending_table_character_tokens: String::new(),
            ignore_lf: false,
            parser_finished: false,
            is_fragment_case: false,
            context_node_id: None,
            fragment_seed: None,
            error_logger,
            options,
        }
    }

    /// Creates a parser for a fragment that is parsed as if it were the content of `context`.
    /// The context element must live in the same sink. The resulting nodes are collected by
    /// [`Html5Parser::complete_fragment`].
    pub fn new_fragment(
        tokenizer: &'a mut T,
        document: &'a mut D,
        context: NodeId,
        options: Html5ParserOptions,
    ) -> Self {
        let root = document.create_fragment();
        let mut parser = Self::with_root(tokenizer, document, root, options);
        parser.initialize_fragment_case(context);
        parser
    }

    /// Parses a complete document from the tokenizer into the document sink
    pub fn parse_document(
        tokenizer: &'a mut T,
        document: &'a mut D,
        options: Option<Html5ParserOptions>,
    ) -> Result<Vec<ParseError>> {
        let mut parser = Self::new(tokenizer, document, options.unwrap_or_default());
        parser.run()?;

        Ok(parser.get_parse_errors())
    }

    /// Parses a fragment. With a context element the tokens are parsed as the content of that
    /// element, without one they are parsed as a full document into a fresh fragment root.
    pub fn parse_fragment(
        tokenizer: &'a mut T,
        document: &'a mut D,
        context: Option<NodeId>,
        options: Option<Html5ParserOptions>,
    ) -> Result<FragmentResult> {
        let options = options.unwrap_or_default();

        let mut parser = match context {
            Some(context_id) => Self::new_fragment(tokenizer, document, context_id, options),
            None => {
                let root = document.create_fragment();
                Self::with_root(tokenizer, document, root, options)
            }
        };
        parser.run()?;

        Ok(parser.complete_fragment())
    }

    /// Collects the result of a fragment parse. Nodes that ended up next to the fragment's
    /// container (through foster parenting) are moved into it first.
    pub fn complete_fragment(&mut self) -> FragmentResult {
        let container = match self.fragment_seed {
            Some(seed) if self.is_html_element(seed, "template") => {
                self.document.template_contents(seed).unwrap_or(seed)
            }
            Some(seed) => seed,
            None => self.root,
        };

        if let Some(seed) = self.fragment_seed {
            let siblings = self.document.children_of(self.root).to_vec();
            let seed_idx = siblings.iter().position(|&id| id == seed).unwrap_or(siblings.len());

            // Foster parented nodes land in front of the seed, nodes inserted after the seed was
            // popped land behind it
            for (idx, &node_id) in siblings[..seed_idx].iter().enumerate() {
                self.document.insert_at(container, idx, node_id);
            }
            for &node_id in siblings.iter().skip(seed_idx + 1) {
                self.document.append(container, node_id);
            }
        }

        FragmentResult {
            root: container,
            nodes: self.document.children_of(container).to_vec(),
            errors: self.get_parse_errors(),
        }
    }

    /// Pulls tokens from the tokenizer until the end of the input has been processed
    fn run(&mut self) -> Result<()> {
        while !self.parser_finished {
            let token = self.tokenizer.next_token(self.parser_data())?;
            let is_eof = token.is_eof();

            self.process_token(token);

            if is_eof {
                self.stop_parsing();
            }
        }

        Ok(())
    }

    /// Processes a single token. Returns false when the token was ignored.
    pub fn process_token(&mut self, token: Token) -> bool {
        let mut handled = self.process_one(token);

        while let Some(token) = self.token_queue.pop_front() {
            handled &= self.process_one(token);
        }

        handled
    }

    fn process_one(&mut self, token: Token) -> bool {
        self.current_token = token;

        loop {
            self.reprocess_token = false;
            self.token_handled = true;

            // The dispatcher is evaluated again for a reprocessed token: the mode that asked
            // for reprocessing may have changed the adjusted current node.
            match self.select_dispatch_mode() {
                DispatcherMode::Foreign => self.process_foreign_content(),
                DispatcherMode::Html => self.process_html_content(),
            }

            #[cfg(feature = "debug_parser")]
            self.display_debug_info();

            if !self.reprocess_token {
                return self.token_handled;
            }
        }
    }

    /// Returns all parse errors reported so far, from both the tokenizer and the tree builder
    pub fn get_parse_errors(&self) -> Vec<ParseError> {
        self.error_logger.borrow().get_errors().to_vec()
    }

    #[must_use]
    pub fn insertion_mode(&self) -> InsertionMode {
        self.insertion_mode
    }

    #[must_use]
    pub fn open_elements(&self) -> &OpenElements {
        &self.open_elements
    }

    #[must_use]
    pub fn active_formatting_elements(&self) -> &ActiveFormattingElements {
        &self.active_formatting_elements
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.parser_finished
    }

    /// Stops the parser. Everything but the bottom element is popped off the stack.
    fn stop_parsing(&mut self) {
        self.open_elements.truncate(1);
        self.parser_finished = true;
    }

    fn parse_error(&self, message: &str) {
        self.error_logger
            .borrow_mut()
            .add_error(self.current_token.get_location(), message);
    }

    /// Reports a parse error and drops the current token
    fn ignore_token(&mut self, message: &str) {
        self.parse_error(message);
        self.token_handled = false;
    }

    /// Queues tokens so they are processed right after the current one, before anything new is
    /// pulled from the tokenizer
    fn queue_tokens(&mut self, tokens: Vec<Token>) {
        for token in tokens.into_iter().rev() {
            self.token_queue.push_front(token);
        }
    }

    fn is_html_element(&self, node_id: NodeId, name: &str) -> bool {
        self.document.element_namespace(node_id) == Some(Namespace::Html)
            && self.document.element_name(node_id) == Some(name)
    }

    fn is_special(&self, node_id: NodeId) -> bool {
        match (self.document.element_name(node_id), self.document.element_namespace(node_id)) {
            (Some(name), Some(namespace)) => is_special_element(name, namespace),
            _ => false,
        }
    }

    fn current_node_is(&self, name: &str) -> bool {
        self.open_elements.current_is(&*self.document, name)
    }

    /// Pops the current node and reports an error when it is not the expected element
    fn pop_check(&mut self, name: &str) {
        match self.open_elements.pop() {
            Some(node_id) if self.is_html_element(node_id, name) => {}
            _ => self.parse_error(&format!("expected {name} at the top of the stack")),
        }
    }

    fn adjusted_current_node(&self) -> Option<NodeId> {
        if self.is_fragment_case && self.open_elements.len() == 1 {
            return self.context_node_id;
        }

        self.open_elements.current()
    }

    fn parser_data(&self) -> ParserData {
        ParserData {
            adjusted_node_namespace: self
                .adjusted_current_node()
                .and_then(|node_id| self.document.element_namespace(node_id))
                .unwrap_or(Namespace::Html),
        }
    }

    /// Checks the current token and the adjusted current node to see if the token is handled by
    /// the insertion mode or by the rules for foreign content.
    fn select_dispatch_mode(&self) -> DispatcherMode {
        let Some(acn) = self.adjusted_current_node() else {
            return DispatcherMode::Html;
        };
        let (Some(name), Some(namespace)) = (self.document.element_name(acn), self.document.element_namespace(acn))
        else {
            return DispatcherMode::Html;
        };

        if namespace == Namespace::Html {
            return DispatcherMode::Html;
        }

        let token = &self.current_token;
        if is_mathml_text_integration_point(name, namespace)
            && ((token.is_any_start_tag() && !token.is_start_tag("mglyph") && !token.is_start_tag("malignmark"))
                || token.is_text_token())
        {
            return DispatcherMode::Html;
        }

        if namespace == Namespace::MathMl && name == "annotation-xml" && token.is_start_tag("svg") {
            return DispatcherMode::Html;
        }

        let attributes = self.document.attributes(acn);
        let is_html_ip = attributes.is_some_and(|attrs| is_html_integration_point(name, namespace, attrs));
        if is_html_ip && (token.is_any_start_tag() || token.is_text_token()) {
            return DispatcherMode::Html;
        }

        if token.is_eof() {
            return DispatcherMode::Html;
        }

        DispatcherMode::Foreign
    }

    /// Process token in foreign content (svg, mathml)
    fn process_foreign_content(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Text { text: value, .. } if token.is_mixed_null() => {
                let tokens = self.split_mixed_token_null(value);
                self.queue_tokens(tokens);
            }
            Token::Text { text: value, location, .. } if token.is_null() => {
                self.parse_error(ParserError::UnexpectedNullCharacter.as_str());
                let replacement = CHAR_REPLACEMENT.to_string().repeat(value.chars().count());
                self.insert_text(&replacement, *location);
            }
            Token::Text { text: value, location, .. } => {
                self.insert_text(value, *location);

                if !token.is_empty_or_white() {
                    self.frameset_ok = false;
                }
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.ignore_token("doctype not allowed in foreign content");
            }
            Token::StartTag { name, .. } if FOREIGN_BREAKOUT_TAGS.contains(&name.as_str()) => {
                self.process_unexpected_html_tag();
            }
            Token::StartTag { name, attributes, .. }
                if name == "font"
                    && (attributes.contains_key("color")
                        || attributes.contains_key("face")
                        || attributes.contains_key("size")) =>
            {
                self.process_unexpected_html_tag();
            }
            Token::EndTag { name, .. } if name == "br" || name == "p" => {
                self.process_unexpected_html_tag();
            }
            Token::StartTag { is_self_closing, .. } => {
                let namespace = self
                    .adjusted_current_node()
                    .and_then(|node_id| self.document.element_namespace(node_id))
                    .unwrap_or(Namespace::Html);

                let mut adjusted = token.clone();
                match namespace {
                    Namespace::MathMl => adjust_mathml_attributes(&mut adjusted),
                    Namespace::Svg => {
                        adjust_svg_tag_names(&mut adjusted);
                        adjust_svg_attributes(&mut adjusted);
                    }
                    Namespace::Html => {}
                }
                adjust_foreign_attributes(&mut adjusted);

                self.insert_foreign_element(&adjusted, namespace);

                if *is_self_closing {
                    self.open_elements.pop();
                }
            }
            Token::EndTag { name, .. } => self.process_foreign_end_tag(name),
            Token::Eof { .. } => {
                // The dispatcher sends end-of-file to the insertion mode
                self.process_html_content();
            }
        }
    }

    fn process_foreign_end_tag(&mut self, name: &str) {
        let Some(mut idx) = self.open_elements.len().checked_sub(1) else {
            return;
        };

        let matches = |parser: &Self, idx: usize| {
            parser
                .open_elements
                .get(idx)
                .and_then(|node_id| parser.document.element_name(node_id))
                .is_some_and(|node_name| node_name.eq_ignore_ascii_case(name))
        };

        if !matches(self, idx) {
            self.parse_error("end tag does not match current node");
        }

        loop {
            // Fragment case: never pop the bottom element
            if idx == 0 {
                return;
            }

            if matches(self, idx) {
                self.open_elements.truncate(idx);
                return;
            }

            idx -= 1;
            let Some(node_id) = self.open_elements.get(idx) else {
                return;
            };

            if self.document.element_namespace(node_id) == Some(Namespace::Html) {
                self.process_html_content();
                return;
            }
        }
    }

    /// Pops foreign elements until an integration point or html element is current, then lets
    /// the insertion mode handle the token.
    fn process_unexpected_html_tag(&mut self) {
        self.parse_error("html tag in foreign content");

        while let Some(node_id) = self.open_elements.current() {
            let (Some(name), Some(namespace)) =
                (self.document.element_name(node_id), self.document.element_namespace(node_id))
            else {
                break;
            };
            let attributes = self.document.attributes(node_id);

            if namespace == Namespace::Html
                || is_mathml_text_integration_point(name, namespace)
                || attributes.is_some_and(|attrs| is_html_integration_point(name, namespace, attrs))
            {
                break;
            }

            self.open_elements.pop();
        }

        self.process_html_content();
    }

    /// Process a token in HTML content
    fn process_html_content(&mut self) {
        if self.ignore_lf {
            self.ignore_lf = false;

            if let Token::Text {
                text: value,
                is_cdata,
                location,
            } = &self.current_token
            {
                if let Some(rest) = value.strip_prefix('\n') {
                    if rest.is_empty() {
                        return;
                    }
                    self.current_token = Token::Text {
                        text: rest.to_string(),
                        is_cdata: *is_cdata,
                        location: *location,
                    };
                }
            }
        }

        match self.insertion_mode {
            InsertionMode::Initial => self.handle_initial(),
            InsertionMode::BeforeHtml => self.handle_before_html(),
            InsertionMode::BeforeHead => self.handle_before_head(),
            InsertionMode::InHead => self.handle_in_head(),
            InsertionMode::InHeadNoscript => self.handle_in_head_noscript(),
            InsertionMode::AfterHead => self.handle_after_head(),
            InsertionMode::InBody => self.handle_in_body(),
            InsertionMode::Text => self.handle_text(),
            InsertionMode::InTable => self.handle_in_table(),
            InsertionMode::InTableText => self.handle_in_table_text(),
            InsertionMode::InCaption => self.handle_in_caption(),
            InsertionMode::InColumnGroup => self.handle_in_column_group(),
            InsertionMode::InTableBody => self.handle_in_table_body(),
            InsertionMode::InRow => self.handle_in_row(),
            InsertionMode::InCell => self.handle_in_cell(),
            InsertionMode::InSelect => self.handle_in_select(),
            InsertionMode::InSelectInTable => self.handle_in_select_in_table(),
            InsertionMode::InTemplate => self.handle_in_template(),
            InsertionMode::AfterBody => self.handle_after_body(),
            InsertionMode::InFrameset => self.handle_in_frameset(),
            InsertionMode::AfterFrameset => self.handle_after_frameset(),
            InsertionMode::AfterAfterBody => self.handle_after_after_body(),
            InsertionMode::AfterAfterFrameset => self.handle_after_after_frameset(),
        }
    }

    fn switch_mode(&mut self, mode: InsertionMode) {
        debug!("insertion mode: {:?} -> {:?}", self.insertion_mode, mode);
        self.insertion_mode = mode;
    }

    fn reprocess_in(&mut self, mode: InsertionMode) {
        self.switch_mode(mode);
        self.reprocess_token = true;
    }

    fn handle_initial(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;

        match &token {
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                // ignore token
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, Some(self.root));
            }
            Token::DocType {
                name,
                pub_identifier,
                sys_identifier,
                force_quirks,
                ..
            } => {
                if name.as_deref() != Some("html")
                    || pub_identifier.is_some()
                    || sys_identifier
                        .as_deref()
                        .is_some_and(|sys_id| sys_id != "about:legacy-compat")
                {
                    self.parse_error("doctype not allowed in initial insertion mode");
                }

                self.insert_doctype_element(&token);

                let quirks_mode = identify_quirks_mode(
                    name.as_deref(),
                    pub_identifier.as_deref(),
                    sys_identifier.as_deref(),
                    *force_quirks,
                );
                self.document.set_quirks_mode(quirks_mode);

                self.switch_mode(InsertionMode::BeforeHtml);
            }
            Token::StartTag { .. } => {
                self.parse_error(ParserError::ExpectedDocTypeButGotStartTag.as_str());
                anything_else = true;
            }
            Token::EndTag { .. } => {
                self.parse_error(ParserError::ExpectedDocTypeButGotEndTag.as_str());
                anything_else = true;
            }
            Token::Text { .. } => {
                self.parse_error(ParserError::ExpectedDocTypeButGotChars.as_str());
                anything_else = true;
            }
            Token::Eof { .. } => {
                self.parse_error(ParserError::ExpectedDocTypeButGotEof.as_str());
                anything_else = true;
            }
        }

        if anything_else {
            self.document.set_quirks_mode(QuirksMode::Quirks);
            self.reprocess_in(InsertionMode::BeforeHtml);
        }
    }

    fn handle_before_html(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;

        match &token {
            Token::DocType { .. } => {
                self.ignore_token("doctype not allowed in before html insertion mode");
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, Some(self.root));
            }
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                // ignore token
            }
            Token::StartTag { name, attributes, .. } if name == "html" => {
                self.insert_document_element(attributes);
                self.switch_mode(InsertionMode::BeforeHead);
            }
            Token::EndTag { name, .. } if ["head", "body", "html", "br"].contains(&name.as_str()) => {
                anything_else = true;
            }
            Token::EndTag { .. } => {
                self.ignore_token("end tag not allowed in before html insertion mode");
            }
            _ => {
                anything_else = true;
            }
        }

        if anything_else {
            self.insert_document_element(&HashMap::new());
            self.reprocess_in(InsertionMode::BeforeHead);
        }
    }

    fn handle_before_head(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;

        match &token {
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                // ignore token
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.ignore_token("doctype not allowed in before head insertion mode");
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::StartTag { name, .. } if name == "head" => {
                let node_id = self.insert_html_element(&token);
                self.head_element = Some(node_id);
                self.switch_mode(InsertionMode::InHead);
            }
            Token::EndTag { name, .. } if ["head", "body", "html", "br"].contains(&name.as_str()) => {
                anything_else = true;
            }
            Token::EndTag { .. } => {
                self.ignore_token("end tag not allowed in before head insertion mode");
            }
            _ => {
                anything_else = true;
            }
        }

        if anything_else {
            let node_id = self.insert_implied_element("head");
            self.head_element = Some(node_id);
            self.reprocess_in(InsertionMode::InHead);
        }
    }

    /// Handle insertion mode "in_head"
    fn handle_in_head(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;

        match &token {
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                self.insert_text_element(&token);
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.ignore_token("doctype not allowed in in head insertion mode");
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::StartTag { name, .. } if ["base", "basefont", "bgsound", "link", "meta"].contains(&name.as_str()) => {
                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "title" => {
                self.parse_rcdata();
            }
            Token::StartTag { name, .. } if name == "noscript" && self.options.scripting_enabled => {
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "noframes" || name == "style" => {
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "noscript" => {
                self.insert_html_element(&token);
                self.switch_mode(InsertionMode::InHeadNoscript);
            }
            Token::StartTag { name, .. } if name == "script" => {
                self.tokenizer.set_state(State::ScriptData);
                self.original_insertion_mode = self.insertion_mode;
                self.switch_mode(InsertionMode::Text);

                self.insert_html_element(&token);
            }
            Token::EndTag { name, .. } if name == "head" => {
                self.pop_check("head");
                self.switch_mode(InsertionMode::AfterHead);
            }
            Token::EndTag { name, .. } if ["body", "html", "br"].contains(&name.as_str()) => {
                anything_else = true;
            }
            Token::StartTag { name, .. } if name == "template" => {
                self.insert_html_element(&token);

                self.active_formatting_elements.push_marker();
                self.frameset_ok = false;
                self.switch_mode(InsertionMode::InTemplate);
                self.template_insertion_mode.push(InsertionMode::InTemplate);
            }
            Token::EndTag { name, .. } if name == "template" => {
                if !self.open_elements.has_element(&*self.document, "template") {
                    self.ignore_token("could not find template tag in open element stack");
                    return;
                }

                self.open_elements
                    .generate_implied_end_tags(&*self.document, None, true);

                if !self.current_node_is("template") {
                    self.parse_error("template end tag not at top of stack");
                }

                self.open_elements.pop_until_named(&*self.document, "template");
                self.active_formatting_elements.clear_to_last_marker();
                self.template_insertion_mode.pop();
                self.reset_insertion_mode();
            }
            Token::StartTag { name, .. } if name == "head" => {
                self.ignore_token("head tag not allowed in in head insertion mode");
            }
            Token::EndTag { .. } => {
                self.ignore_token("end tag not allowed in in head insertion mode");
            }
            _ => {
                anything_else = true;
            }
        }

        if anything_else {
            self.pop_check("head");
            self.reprocess_in(InsertionMode::AfterHead);
        }
    }

    fn handle_in_head_noscript(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;

        match &token {
            Token::DocType { .. } => {
                self.ignore_token("doctype not allowed in 'head no script' insertion mode");
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::EndTag { name, .. } if name == "noscript" => {
                self.pop_check("noscript");
                self.switch_mode(InsertionMode::InHead);
            }
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                self.handle_in_head();
            }
            Token::Comment { .. } => {
                self.handle_in_head();
            }
            Token::StartTag { name, .. }
                if ["basefont", "bgsound", "link", "meta", "noframes", "style"].contains(&name.as_str()) =>
            {
                self.handle_in_head();
            }
            Token::EndTag { name, .. } if name == "br" => {
                anything_else = true;
            }
            Token::StartTag { name, .. } if name == "head" || name == "noscript" => {
                self.ignore_token("head or noscript tag not allowed in in head noscript insertion mode");
            }
            Token::EndTag { .. } => {
                self.ignore_token("end tag not allowed in in head noscript insertion mode");
            }
            _ => {
                anything_else = true;
            }
        }

        if anything_else {
            self.parse_error("anything else not allowed in in head noscript insertion mode");
            self.pop_check("noscript");
            self.reprocess_in(InsertionMode::InHead);
        }
    }

    fn handle_after_head(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;

        match &token {
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                self.insert_text_element(&token);
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.ignore_token("doctype not allowed in after head insertion mode");
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::StartTag { name, .. } if name == "body" => {
                self.insert_html_element(&token);

                self.frameset_ok = false;
                self.switch_mode(InsertionMode::InBody);
            }
            Token::StartTag { name, .. } if name == "frameset" => {
                self.insert_html_element(&token);
                self.switch_mode(InsertionMode::InFrameset);
            }
            Token::StartTag { name, .. }
                if [
                    "base", "basefont", "bgsound", "link", "meta", "noframes", "script", "style", "template", "title",
                ]
                .contains(&name.as_str()) =>
            {
                self.parse_error("invalid start tag in after head insertion mode");

                let head_element = self.head_element;
                if let Some(node_id) = head_element {
                    self.push_element(node_id);
                }

                self.handle_in_head();

                // The head element might not be the current node anymore at this point
                if let Some(node_id) = head_element {
                    self.open_elements.remove(node_id);
                }
            }
            Token::EndTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::EndTag { name, .. } if ["body", "html", "br"].contains(&name.as_str()) => {
                anything_else = true;
            }
            Token::StartTag { name, .. } if name == "head" => {
                self.ignore_token("head tag not allowed in after head insertion mode");
            }
            Token::EndTag { .. } => {
                self.ignore_token("end tag not allowed in after head insertion mode");
            }
            _ => {
                anything_else = true;
            }
        }

        if anything_else {
            self.insert_implied_element("body");
            self.reprocess_in(InsertionMode::InBody);
        }
    }

    fn handle_text(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Text { .. } => {
                self.insert_text_element(&token);
            }
            Token::Eof { .. } => {
                self.parse_error("eof not allowed in text insertion mode");

                self.open_elements.pop();
                self.reprocess_in(self.original_insertion_mode);
            }
            Token::EndTag { .. } => {
                self.open_elements.pop();
                self.switch_mode(self.original_insertion_mode);
            }
            _ => {
                self.ignore_token("unexpected token in text insertion mode");
            }
        }
    }

    /// Handle insertion mode "in_table"
    fn handle_in_table(&mut self) {
        let token = self.current_token.clone();
        let mut anything_else = false;

        match &token {
            Token::Text { .. }
                if self
                    .open_elements
                    .current_is_any(&*self.document, &["table", "tbody", "template", "tfoot", "thead", "tr"]) =>
            {
                self.pending_table_character_tokens.clear();
                self.original_insertion_mode = self.insertion_mode;
                self.reprocess_in(InsertionMode::InTableText);
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.ignore_token("doctype not allowed in in table insertion mode");
            }
            Token::StartTag { name, .. } if name == "caption" => {
                self.open_elements.clear_to_context(&*self.document, &["table", "template"]);
                self.active_formatting_elements.push_marker();
                self.insert_html_element(&token);
                self.switch_mode(InsertionMode::InCaption);
            }
            Token::StartTag { name, .. } if name == "colgroup" => {
                self.open_elements.clear_to_context(&*self.document, &["table", "template"]);
                self.insert_html_element(&token);
                self.switch_mode(InsertionMode::InColumnGroup);
            }
            Token::StartTag { name, .. } if name == "col" => {
                self.open_elements.clear_to_context(&*self.document, &["table", "template"]);
                self.insert_implied_element("colgroup");
                self.reprocess_in(InsertionMode::InColumnGroup);
            }
            Token::StartTag { name, .. } if ["tbody", "tfoot", "thead"].contains(&name.as_str()) => {
                self.open_elements.clear_to_context(&*self.document, &["table", "template"]);
                self.insert_html_element(&token);
                self.switch_mode(InsertionMode::InTableBody);
            }
            Token::StartTag { name, .. } if ["td", "th", "tr"].contains(&name.as_str()) => {
                self.open_elements.clear_to_context(&*self.document, &["table", "template"]);
                self.insert_implied_element("tbody");
                self.reprocess_in(InsertionMode::InTableBody);
            }
            Token::StartTag { name, .. } if name == "table" => {
                self.parse_error("table tag not allowed in in table insertion mode");

                if !self.open_elements.in_scope(&*self.document, "table", Scope::Table) {
                    self.token_handled = false;
                    return;
                }

                self.open_elements.pop_until_named(&*self.document, "table");
                self.reset_insertion_mode();
                self.reprocess_token = true;
            }
            Token::EndTag { name, .. } if name == "table" => {
                if !self.open_elements.in_scope(&*self.document, "table", Scope::Table) {
                    self.ignore_token("table end tag not allowed in in table insertion mode");
                    return;
                }

                self.open_elements.pop_until_named(&*self.document, "table");
                self.reset_insertion_mode();
            }
            Token::EndTag { name, .. }
                if [
                    "body", "caption", "col", "colgroup", "html", "tbody", "td", "tfoot", "th", "thead", "tr",
                ]
                .contains(&name.as_str()) =>
            {
                self.ignore_token("end tag not allowed in in table insertion mode");
            }
            Token::StartTag { name, .. } if ["style", "script", "template"].contains(&name.as_str()) => {
                self.handle_in_head();
            }
            Token::EndTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::StartTag { name, attributes, .. } if name == "input" => {
                if !attributes
                    .get("type")
                    .is_some_and(|value| value.eq_ignore_ascii_case("hidden"))
                {
                    anything_else = true;
                } else {
                    self.parse_error("input tag not allowed in in table insertion mode");
                    self.insert_html_element(&token);
                }
            }
            Token::StartTag { name, .. } if name == "form" => {
                self.parse_error("form tag not allowed in in table insertion mode");

                if self.open_elements.has_element(&*self.document, "template") || self.form_element.is_some() {
                    self.token_handled = false;
                    return;
                }

                let node_id = self.insert_html_element(&token);
                self.form_element = Some(node_id);

                self.pop_check("form");
            }
            Token::Eof { .. } => {
                self.handle_in_body();
            }
            _ => anything_else = true,
        }

        if anything_else {
            self.parse_error(ParserError::FosterParentedContent.as_str());

            self.foster_parenting = true;
            self.handle_in_body();
            self.foster_parenting = false;
        }
    }

    fn handle_in_table_text(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Text { text: value, .. } if token.is_mixed_null() => {
                let tokens = self.split_mixed_token_null(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_null() => {
                self.ignore_token(ParserError::UnexpectedNullCharacter.as_str());
            }
            Token::Text { text: value, .. } => {
                self.pending_table_character_tokens.push_str(value);
            }
            _ => {
                let pending = std::mem::take(&mut self.pending_table_character_tokens);

                if pending.chars().any(|ch| !ch.is_ascii_whitespace()) {
                    self.parse_error(ParserError::FosterParentedContent.as_str());

                    self.current_token = Token::Text {
                        text: pending,
                        is_cdata: false,
                        location: token.get_location(),
                    };
                    self.foster_parenting = true;
                    self.handle_in_body();
                    self.foster_parenting = false;
                    self.current_token = token;
                } else {
                    self.insert_text(&pending, token.get_location());
                }

                self.reprocess_in(self.original_insertion_mode);
            }
        }
    }

    fn handle_in_caption(&mut self) {
        let token = self.current_token.clone();
        let mut close_caption = false;
        let mut reprocess = false;

        match &token {
            Token::EndTag { name, .. } if name == "caption" => {
                close_caption = true;
            }
            Token::StartTag { name, .. }
                if ["caption", "col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr"]
                    .contains(&name.as_str()) =>
            {
                close_caption = true;
                reprocess = true;
            }
            Token::EndTag { name, .. } if name == "table" => {
                close_caption = true;
                reprocess = true;
            }
            Token::EndTag { name, .. }
                if ["body", "col", "colgroup", "html", "tbody", "td", "tfoot", "th", "thead", "tr"]
                    .contains(&name.as_str()) =>
            {
                self.ignore_token("end tag not allowed in in caption insertion mode");
            }
            _ => self.handle_in_body(),
        }

        if !close_caption {
            return;
        }

        if !self.open_elements.in_scope(&*self.document, "caption", Scope::Table) {
            // fragment case
            self.ignore_token("caption not in table scope");
            return;
        }

        self.open_elements
            .generate_implied_end_tags(&*self.document, None, false);

        if !self.current_node_is("caption") {
            self.parse_error("caption end tag not at top of stack");
        }

        self.open_elements.pop_until_named(&*self.document, "caption");
        self.active_formatting_elements.clear_to_last_marker();

        self.switch_mode(InsertionMode::InTable);
        self.reprocess_token = reprocess;
    }

    fn handle_in_column_group(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                self.insert_text_element(&token);
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.ignore_token("doctype not allowed in column group insertion mode");
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::StartTag { name, .. } if name == "col" => {
                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::EndTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::Eof { .. } => {
                self.handle_in_body();
            }
            Token::EndTag { name, .. } if name == "colgroup" => {
                if !self.current_node_is("colgroup") {
                    self.ignore_token("colgroup end tag not at top of stack");
                    return;
                }

                self.open_elements.pop();
                self.switch_mode(InsertionMode::InTable);
            }
            Token::EndTag { name, .. } if name == "col" => {
                self.ignore_token("col end tag not allowed in column group insertion mode");
            }
            _ => {
                if !self.current_node_is("colgroup") {
                    self.ignore_token("colgroup not at top of stack");
                    return;
                }

                self.open_elements.pop();
                self.reprocess_in(InsertionMode::InTable);
            }
        }
    }

    fn handle_in_table_body(&mut self) {
        let token = self.current_token.clone();
        let body_context = ["tbody", "tfoot", "thead", "template"];

        match &token {
            Token::StartTag { name, .. } if name == "tr" => {
                self.open_elements.clear_to_context(&*self.document, &body_context);
                self.insert_html_element(&token);
                self.switch_mode(InsertionMode::InRow);
            }
            Token::StartTag { name, .. } if name == "th" || name == "td" => {
                self.parse_error("th or td tag not allowed in in table body insertion mode");

                self.open_elements.clear_to_context(&*self.document, &body_context);
                self.insert_implied_element("tr");
                self.reprocess_in(InsertionMode::InRow);
            }
            Token::EndTag { name, .. } if ["tbody", "tfoot", "thead"].contains(&name.as_str()) => {
                if !self.open_elements.in_scope(&*self.document, name, Scope::Table) {
                    self.ignore_token("table section end tag not in table scope");
                    return;
                }

                self.open_elements.clear_to_context(&*self.document, &body_context);
                self.open_elements.pop();
                self.switch_mode(InsertionMode::InTable);
            }
            Token::StartTag { name, .. }
                if ["caption", "col", "colgroup", "tbody", "tfoot", "thead"].contains(&name.as_str()) =>
            {
                self.close_table_body();
            }
            Token::EndTag { name, .. } if name == "table" => {
                self.close_table_body();
            }
            Token::EndTag { name, .. }
                if ["body", "caption", "col", "colgroup", "html", "td", "th", "tr"].contains(&name.as_str()) =>
            {
                self.ignore_token("end tag not allowed in in table body insertion mode");
            }
            _ => self.handle_in_table(),
        }
    }

    /// Closes the current table section and reprocesses the token in the table
    fn close_table_body(&mut self) {
        if !self
            .open_elements
            .in_scope_any(&*self.document, &["tbody", "tfoot", "thead"], Scope::Table)
        {
            self.ignore_token("no table section in table scope");
            return;
        }

        self.open_elements
            .clear_to_context(&*self.document, &["tbody", "tfoot", "thead", "template"]);
        self.open_elements.pop();
        self.reprocess_in(InsertionMode::InTable);
    }

    fn handle_in_row(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::StartTag { name, .. } if name == "th" || name == "td" => {
                self.open_elements.clear_to_context(&*self.document, &["tr", "template"]);
                self.insert_html_element(&token);
                self.switch_mode(InsertionMode::InCell);
                self.active_formatting_elements.push_marker();
            }
            Token::EndTag { name, .. } if name == "tr" => {
                if !self.open_elements.in_scope(&*self.document, "tr", Scope::Table) {
                    self.ignore_token("tr not in table scope");
                    return;
                }

                self.open_elements.clear_to_context(&*self.document, &["tr", "template"]);
                self.pop_check("tr");
                self.switch_mode(InsertionMode::InTableBody);
            }
            Token::StartTag { name, .. }
                if ["caption", "col", "colgroup", "tbody", "tfoot", "thead", "tr"].contains(&name.as_str()) =>
            {
                self.close_row();
            }
            Token::EndTag { name, .. } if name == "table" => {
                self.close_row();
            }
            Token::EndTag { name, .. } if ["tbody", "tfoot", "thead"].contains(&name.as_str()) => {
                if !self.open_elements.in_scope(&*self.document, name, Scope::Table) {
                    self.ignore_token("table section end tag not in table scope");
                    return;
                }

                self.close_row();
            }
            Token::EndTag { name, .. }
                if ["body", "caption", "col", "colgroup", "html", "td", "th"].contains(&name.as_str()) =>
            {
                self.ignore_token("end tag not allowed in in row insertion mode");
            }
            _ => self.handle_in_table(),
        }
    }

    /// Closes the current row and reprocesses the token in the table body
    fn close_row(&mut self) {
        if !self.open_elements.in_scope(&*self.document, "tr", Scope::Table) {
            self.ignore_token("tr not in table scope");
            return;
        }

        self.open_elements.clear_to_context(&*self.document, &["tr", "template"]);
        self.pop_check("tr");
        self.reprocess_in(InsertionMode::InTableBody);
    }

    fn handle_in_cell(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::EndTag { name, .. } if name == "th" || name == "td" => {
                if !self.open_elements.in_scope(&*self.document, name, Scope::Table) {
                    self.ignore_token("cell end tag not in table scope");
                    return;
                }

                self.open_elements
                    .generate_implied_end_tags(&*self.document, None, false);

                if !self.current_node_is(name) {
                    self.parse_error("current node should be th or td");
                }

                self.open_elements.pop_until_named(&*self.document, name);
                self.active_formatting_elements.clear_to_last_marker();
                self.switch_mode(InsertionMode::InRow);
            }
            Token::StartTag { name, .. }
                if ["caption", "col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr"]
                    .contains(&name.as_str()) =>
            {
                if !self
                    .open_elements
                    .in_scope_any(&*self.document, &["td", "th"], Scope::Table)
                {
                    // fragment case
                    self.ignore_token("no cell in table scope");
                    return;
                }

                self.close_cell();
                self.reprocess_token = true;
            }
            Token::EndTag { name, .. } if ["body", "caption", "col", "colgroup", "html"].contains(&name.as_str()) => {
                self.ignore_token("end tag not allowed in in cell insertion mode");
            }
            Token::EndTag { name, .. } if ["table", "tbody", "tfoot", "thead", "tr"].contains(&name.as_str()) => {
                if !self.open_elements.in_scope(&*self.document, name, Scope::Table) {
                    self.ignore_token("end tag not in table scope");
                    return;
                }

                self.close_cell();
                self.reprocess_token = true;
            }
            _ => self.handle_in_body(),
        }
    }

    /// Handle insertion mode "in_body"
    fn handle_in_body(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Text { text: value, .. } if token.is_mixed_null() => {
                let tokens = self.split_mixed_token_null(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_null() => {
                self.ignore_token(ParserError::UnexpectedNullCharacter.as_str());
            }
            Token::Text { .. } => {
                self.reconstruct_formatting();
                self.insert_text_element(&token);

                if !token.is_empty_or_white() {
                    self.frameset_ok = false;
                }
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.ignore_token(ParserError::UnexpectedDocType.as_str());
            }
            Token::StartTag { name, attributes, .. } if name == "html" => {
                self.parse_error("html tag not allowed in in body insertion mode");

                if self.open_elements.has_element(&*self.document, "template") {
                    self.token_handled = false;
                    return;
                }

                if let Some(html_id) = self.open_elements.first() {
                    self.document.add_attributes_if_missing(html_id, attributes);
                }
            }
            Token::StartTag { name, .. }
                if [
                    "base", "basefont", "bgsound", "link", "meta", "noframes", "script", "style", "template", "title",
                ]
                .contains(&name.as_str()) =>
            {
                self.handle_in_head();
            }
            Token::EndTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::StartTag { name, attributes, .. } if name == "body" => {
                self.parse_error("body tag not allowed in in body insertion mode");

                let body_id = self
                    .open_elements
                    .get(1)
                    .filter(|&node_id| self.is_html_element(node_id, "body"));
                let Some(body_id) = body_id else {
                    // fragment case
                    self.token_handled = false;
                    return;
                };
                if self.open_elements.has_element(&*self.document, "template") {
                    self.token_handled = false;
                    return;
                }

                self.frameset_ok = false;
                self.document.add_attributes_if_missing(body_id, attributes);
            }
            Token::StartTag { name, .. } if name == "frameset" => {
                self.parse_error("frameset tag not allowed in in body insertion mode");

                let body_id = self
                    .open_elements
                    .get(1)
                    .filter(|&node_id| self.is_html_element(node_id, "body"));
                let Some(body_id) = body_id else {
                    self.token_handled = false;
                    return;
                };
                if !self.frameset_ok {
                    self.token_handled = false;
                    return;
                }

                self.document.remove(body_id);

                while let Some(node_id) = self.open_elements.current() {
                    if self.is_html_element(node_id, "html") || self.open_elements.len() == 1 {
                        break;
                    }
                    self.open_elements.pop();
                }

                self.insert_html_element(&token);
                self.switch_mode(InsertionMode::InFrameset);
            }
            Token::Eof { .. } => {
                if !self.template_insertion_mode.is_empty() {
                    self.handle_in_template();
                    return;
                }

                let unclosed = self.open_elements.iter().any(|&node_id| {
                    !self.document.element_name(node_id).is_some_and(|name| {
                        [
                            "dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc", "tbody", "td",
                            "tfoot", "th", "thead", "tr", "body", "html",
                        ]
                        .contains(&name)
                    })
                });
                if unclosed {
                    self.parse_error("eof with unclosed elements");
                }

                self.stop_parsing();
            }
            Token::EndTag { name, .. } if name == "body" || name == "html" => {
                if !self.open_elements.in_scope(&*self.document, "body", Scope::Regular) {
                    self.ignore_token("body end tag not in scope");
                    return;
                }

                self.switch_mode(InsertionMode::AfterBody);
                self.reprocess_token = name == "html";
            }
            Token::StartTag { name, .. }
                if [
                    "address", "article", "aside", "blockquote", "center", "details", "dialog", "dir", "div", "dl",
                    "fieldset", "figcaption", "figure", "footer", "header", "hgroup", "main", "menu", "nav", "ol", "p",
                    "search", "section", "summary", "ul",
                ]
                .contains(&name.as_str()) =>
            {
                if self.open_elements.in_scope(&*self.document, "p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if HEADINGS.contains(&name.as_str()) => {
                if self.open_elements.in_scope(&*self.document, "p", Scope::Button) {
                    self.close_p_element();
                }

                if self.open_elements.current_is_any(&*self.document, &HEADINGS) {
                    self.parse_error("heading nested in another heading");
                    self.open_elements.pop();
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "pre" || name == "listing" => {
                if self.open_elements.in_scope(&*self.document, "p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);

                self.ignore_lf = true;
                self.frameset_ok = false;
            }
            Token::StartTag { name, .. } if name == "form" => {
                let in_template = self.open_elements.has_element(&*self.document, "template");
                if self.form_element.is_some() && !in_template {
                    self.ignore_token("nested form element");
                    return;
                }

                if self.open_elements.in_scope(&*self.document, "p", Scope::Button) {
                    self.close_p_element();
                }

                let node_id = self.insert_html_element(&token);
                if !in_template {
                    self.form_element = Some(node_id);
                }
            }
            Token::StartTag { name, .. } if name == "li" => {
                self.frameset_ok = false;
                self.close_list_item(&["li"]);

                if self.open_elements.in_scope(&*self.document, "p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "dd" || name == "dt" => {
                self.frameset_ok = false;
                self.close_list_item(&["dd", "dt"]);

                if self.open_elements.in_scope(&*self.document, "p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "plaintext" => {
                if self.open_elements.in_scope(&*self.document, "p", Scope::Button) {
                    self.close_p_element();
                }

                self.tokenizer.set_state(State::PlainText);
                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "button" => {
                if self.open_elements.in_scope(&*self.document, "button", Scope::Regular) {
                    self.parse_error("nested button element");
                    self.open_elements
                        .generate_implied_end_tags(&*self.document, None, false);
                    self.open_elements.pop_until_named(&*self.document, "button");
                }

                self.reconstruct_formatting();
                self.insert_html_element(&token);
                self.frameset_ok = false;
            }
            Token::EndTag { name, .. }
                if [
                    "address", "article", "aside", "blockquote", "button", "center", "details", "dialog", "dir", "div",
                    "dl", "fieldset", "figcaption", "figure", "footer", "header", "hgroup", "listing", "main", "menu",
                    "nav", "ol", "pre", "search", "section", "summary", "ul",
                ]
                .contains(&name.as_str()) =>
            {
                if !self.open_elements.in_scope(&*self.document, name, Scope::Regular) {
                    self.ignore_token("end tag not in scope");
                    return;
                }

                self.open_elements
                    .generate_implied_end_tags(&*self.document, None, false);

                if !self.current_node_is(name) {
                    self.parse_error("end tag not at top of stack");
                }

                self.open_elements.pop_until_named(&*self.document, name);
            }
            Token::EndTag { name, .. } if name == "form" => {
                if self.open_elements.has_element(&*self.document, "template") {
                    if !self.open_elements.in_scope(&*self.document, "form", Scope::Regular) {
                        self.ignore_token("form end tag not in scope");
                        return;
                    }

                    self.open_elements
                        .generate_implied_end_tags(&*self.document, None, false);

                    if !self.current_node_is("form") {
                        self.parse_error("end tag not at top of stack");
                    }

                    self.open_elements.pop_until_named(&*self.document, "form");
                    return;
                }

                let form_id = self.form_element.take();
                let Some(form_id) = form_id.filter(|_| self.open_elements.in_scope(&*self.document, "form", Scope::Regular))
                else {
                    self.ignore_token("form end tag not in scope");
                    return;
                };

                self.open_elements
                    .generate_implied_end_tags(&*self.document, None, false);

                if self.open_elements.current() != Some(form_id) {
                    self.parse_error("end tag not at top of stack");
                }

                self.open_elements.remove(form_id);
            }
            Token::EndTag { name, .. } if name == "p" => {
                if !self.open_elements.in_scope(&*self.document, "p", Scope::Button) {
                    self.parse_error("p end tag without open p element");
                    self.insert_implied_element("p");
                }

                self.close_p_element();
            }
            Token::EndTag { name, .. } if name == "li" => {
                if !self.open_elements.in_scope(&*self.document, "li", Scope::ListItem) {
                    self.ignore_token("li end tag not in scope");
                    return;
                }

                self.open_elements
                    .generate_implied_end_tags(&*self.document, Some("li"), false);

                if !self.current_node_is("li") {
                    self.parse_error("end tag not at top of stack");
                }

                self.open_elements.pop_until_named(&*self.document, "li");
            }
            Token::EndTag { name, .. } if name == "dd" || name == "dt" => {
                if !self.open_elements.in_scope(&*self.document, name, Scope::Regular) {
                    self.ignore_token("end tag not in scope");
                    return;
                }

                self.open_elements
                    .generate_implied_end_tags(&*self.document, Some(name), false);

                if !self.current_node_is(name) {
                    self.parse_error("end tag not at top of stack");
                }

                self.open_elements.pop_until_named(&*self.document, name);
            }
            Token::EndTag { name, .. } if HEADINGS.contains(&name.as_str()) => {
                if !self
                    .open_elements
                    .in_scope_any(&*self.document, &HEADINGS, Scope::Regular)
                {
                    self.ignore_token("heading end tag not in scope");
                    return;
                }

                self.open_elements
                    .generate_implied_end_tags(&*self.document, Some(name), false);

                if !self.current_node_is(name) {
                    self.parse_error("end tag not at top of stack");
                }

                self.open_elements.pop_until_any(&*self.document, &HEADINGS);
            }
            Token::StartTag { name, .. } if name == "a" => {
                if let Some(node_id) = self
                    .active_formatting_elements
                    .find_after_last_marker(&*self.document, "a")
                {
                    self.parse_error(ParserError::MisnestedFormattingElement.as_str());
                    self.adoption_agency_algorithm("a");

                    // The adoption agency may have left the old element behind
                    self.open_elements.remove(node_id);
                    self.active_formatting_elements.remove(node_id);
                }

                self.reconstruct_formatting();

                let node_id = self.insert_html_element(&token);
                self.active_formatting_elements.push(&*self.document, node_id);
            }
            Token::StartTag { name, .. }
                if ["b", "big", "code", "em", "font", "i", "s", "small", "strike", "strong", "tt", "u"]
                    .contains(&name.as_str()) =>
            {
                self.reconstruct_formatting();

                let node_id = self.insert_html_element(&token);
                self.active_formatting_elements.push(&*self.document, node_id);
            }
            Token::StartTag { name, .. } if name == "nobr" => {
                self.reconstruct_formatting();

                if self.open_elements.in_scope(&*self.document, "nobr", Scope::Regular) {
                    self.parse_error(ParserError::MisnestedFormattingElement.as_str());
                    self.adoption_agency_algorithm("nobr");
                    self.reconstruct_formatting();
                }

                let node_id = self.insert_html_element(&token);
                self.active_formatting_elements.push(&*self.document, node_id);
            }
            Token::EndTag { name, .. }
                if [
                    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong", "tt", "u",
                ]
                .contains(&name.as_str()) =>
            {
                self.adoption_agency_algorithm(name);
            }
            Token::StartTag { name, .. } if ["applet", "marquee", "object"].contains(&name.as_str()) => {
                self.reconstruct_formatting();
                self.insert_html_element(&token);

                self.active_formatting_elements.push_marker();
                self.frameset_ok = false;
            }
            Token::EndTag { name, .. } if ["applet", "marquee", "object"].contains(&name.as_str()) => {
                if !self.open_elements.in_scope(&*self.document, name, Scope::Regular) {
                    self.ignore_token("end tag not in scope");
                    return;
                }

                self.open_elements
                    .generate_implied_end_tags(&*self.document, None, false);

                if !self.current_node_is(name) {
                    self.parse_error("end tag not at top of stack");
                }

                self.open_elements.pop_until_named(&*self.document, name);
                self.active_formatting_elements.clear_to_last_marker();
            }
            Token::StartTag { name, .. } if name == "table" => {
                if self.document.quirks_mode() != QuirksMode::Quirks
                    && self.open_elements.in_scope(&*self.document, "p", Scope::Button)
                {
                    self.close_p_element();
                }

                self.insert_html_element(&token);

                self.frameset_ok = false;
                self.switch_mode(InsertionMode::InTable);
            }
            Token::EndTag { name, location, .. } if name == "br" => {
                self.parse_error("br end tag not allowed");

                // Handled as a <br> start tag without attributes
                let br = Token::StartTag {
                    name: "br".to_string(),
                    is_self_closing: false,
                    attributes: HashMap::new(),
                    location: *location,
                };
                self.reconstruct_formatting();
                self.insert_html_element(&br);
                self.frameset_ok = false;
            }
            Token::StartTag { name, .. } if ["area", "br", "embed", "img", "keygen", "wbr"].contains(&name.as_str()) => {
                self.reconstruct_formatting();
                self.insert_html_element(&token);
                self.frameset_ok = false;
            }
            Token::StartTag { name, attributes, .. } if name == "input" => {
                self.reconstruct_formatting();
                self.insert_html_element(&token);

                if !attributes
                    .get("type")
                    .is_some_and(|value| value.eq_ignore_ascii_case("hidden"))
                {
                    self.frameset_ok = false;
                }
            }
            Token::StartTag { name, .. } if ["param", "source", "track"].contains(&name.as_str()) => {
                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "hr" => {
                if self.open_elements.in_scope(&*self.document, "p", Scope::Button) {
                    self.close_p_element();
                }

                self.insert_html_element(&token);
                self.frameset_ok = false;
            }
            Token::StartTag {
                name,
                is_self_closing,
                attributes,
                location,
            } if name == "image" => {
                self.parse_error("image tag not allowed");
                self.current_token = Token::StartTag {
                    name: "img".to_string(),
                    is_self_closing: *is_self_closing,
                    attributes: attributes.clone(),
                    location: *location,
                };
                self.reprocess_token = true;
            }
            Token::StartTag { name, .. } if name == "textarea" => {
                self.tokenizer.set_state(State::RcData);
                self.insert_html_element(&token);

                self.ignore_lf = true;
                self.frameset_ok = false;
                self.original_insertion_mode = self.insertion_mode;
                self.switch_mode(InsertionMode::Text);
            }
            Token::StartTag { name, .. } if name == "xmp" => {
                if self.open_elements.in_scope(&*self.document, "p", Scope::Button) {
                    self.close_p_element();
                }

                self.reconstruct_formatting();

                self.frameset_ok = false;
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "iframe" => {
                self.frameset_ok = false;
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "noembed" => {
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "noscript" && self.options.scripting_enabled => {
                self.parse_raw_data();
            }
            Token::StartTag { name, .. } if name == "select" => {
                self.reconstruct_formatting();
                self.insert_html_element(&token);
                self.frameset_ok = false;

                let in_table = [
                    InsertionMode::InTable,
                    InsertionMode::InCaption,
                    InsertionMode::InTableBody,
                    InsertionMode::InRow,
                    InsertionMode::InCell,
                ]
                .contains(&self.insertion_mode);
                if in_table {
                    self.switch_mode(InsertionMode::InSelectInTable);
                } else {
                    self.switch_mode(InsertionMode::InSelect);
                }
            }
            Token::StartTag { name, .. } if name == "optgroup" || name == "option" => {
                if self.current_node_is("option") {
                    self.open_elements.pop();
                }

                self.reconstruct_formatting();
                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "rb" || name == "rtc" => {
                if self.open_elements.in_scope(&*self.document, "ruby", Scope::Regular) {
                    self.open_elements
                        .generate_implied_end_tags(&*self.document, None, false);
                }

                if !self.current_node_is("ruby") {
                    self.parse_error("rb or rtc not in ruby");
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "rp" || name == "rt" => {
                if self.open_elements.in_scope(&*self.document, "ruby", Scope::Regular) {
                    self.open_elements
                        .generate_implied_end_tags(&*self.document, Some("rtc"), false);
                }

                if !self.open_elements.current_is_any(&*self.document, &["rtc", "ruby"]) {
                    self.parse_error("rp or rt not in ruby");
                }

                self.insert_html_element(&token);
            }
            Token::StartTag {
                name, is_self_closing, ..
            } if name == "math" || name == "svg" => {
                self.reconstruct_formatting();

                let mut adjusted = token.clone();
                let namespace = if name == "math" {
                    adjust_mathml_attributes(&mut adjusted);
                    Namespace::MathMl
                } else {
                    adjust_svg_attributes(&mut adjusted);
                    Namespace::Svg
                };
                adjust_foreign_attributes(&mut adjusted);

                self.insert_foreign_element(&adjusted, namespace);

                if *is_self_closing {
                    self.open_elements.pop();
                }
            }
            Token::StartTag { name, .. }
                if [
                    "caption", "col", "colgroup", "frame", "head", "tbody", "td", "tfoot", "th", "thead", "tr",
                ]
                .contains(&name.as_str()) =>
            {
                self.ignore_token("tag not allowed in in body insertion mode");
            }
            Token::StartTag { .. } => {
                self.reconstruct_formatting();
                self.insert_html_element(&token);
            }
            Token::EndTag { name, .. } => {
                self.handle_in_body_any_other_end_tag(name);
            }
        }
    }

    /// Closes an open `li` (or `dd`/`dt`) before a new one is started
    fn close_list_item(&mut self, names: &[&str]) {
        for idx in (0..self.open_elements.len()).rev() {
            let Some(node_id) = self.open_elements.get(idx) else {
                continue;
            };

            if let Some(name) = names.iter().copied().find(|&name| self.is_html_element(node_id, name)) {
                self.open_elements
                    .generate_implied_end_tags(&*self.document, Some(name), false);

                if !self.current_node_is(name) {
                    self.parse_error("list item not at top of stack");
                }

                self.open_elements.pop_until_named(&*self.document, name);
                return;
            }

            let is_exception = ["address", "div", "p"]
                .iter()
                .any(|&name| self.is_html_element(node_id, name));
            if self.is_special(node_id) && !is_exception {
                return;
            }
        }
    }

    /// Handle insertion mode "in_select"
    fn handle_in_select(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Text { text: value, .. } if token.is_mixed_null() => {
                let tokens = self.split_mixed_token_null(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_null() => {
                self.ignore_token(ParserError::UnexpectedNullCharacter.as_str());
            }
            Token::Text { .. } => {
                self.insert_text_element(&token);
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.ignore_token(ParserError::UnexpectedDocType.as_str());
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::StartTag { name, .. } if name == "option" => {
                if self.current_node_is("option") {
                    self.open_elements.pop();
                }

                self.insert_html_element(&token);
            }
            Token::StartTag { name, .. } if name == "optgroup" || name == "hr" => {
                if self.current_node_is("option") {
                    self.open_elements.pop();
                }
                if self.current_node_is("optgroup") {
                    self.open_elements.pop();
                }

                self.insert_html_element(&token);
            }
            Token::EndTag { name, .. } if name == "optgroup" => {
                let below_is_optgroup = self
                    .open_elements
                    .len()
                    .checked_sub(2)
                    .and_then(|idx| self.open_elements.get(idx))
                    .is_some_and(|node_id| self.is_html_element(node_id, "optgroup"));
                if self.current_node_is("option") && below_is_optgroup {
                    self.open_elements.pop();
                }

                if self.current_node_is("optgroup") {
                    self.open_elements.pop();
                } else {
                    self.ignore_token("optgroup end tag without open optgroup");
                }
            }
            Token::EndTag { name, .. } if name == "option" => {
                if self.current_node_is("option") {
                    self.open_elements.pop();
                } else {
                    self.ignore_token("option end tag without open option");
                }
            }
            Token::EndTag { name, .. } if name == "select" => {
                if !self.open_elements.in_scope(&*self.document, "select", Scope::Select) {
                    // fragment case
                    self.ignore_token("select end tag not in select scope");
                    return;
                }

                self.open_elements.pop_until_named(&*self.document, "select");
                self.reset_insertion_mode();
            }
            Token::StartTag { name, .. } if name == "select" => {
                self.parse_error("select tag not allowed in in select insertion mode");

                if !self.open_elements.in_scope(&*self.document, "select", Scope::Select) {
                    // fragment case
                    self.token_handled = false;
                    return;
                }

                self.open_elements.pop_until_named(&*self.document, "select");
                self.reset_insertion_mode();
            }
            Token::StartTag { name, .. } if ["input", "keygen", "textarea"].contains(&name.as_str()) => {
                self.parse_error("input, keygen or textarea tag not allowed in in select insertion mode");

                if !self.open_elements.in_scope(&*self.document, "select", Scope::Select) {
                    // fragment case
                    self.token_handled = false;
                    return;
                }

                self.open_elements.pop_until_named(&*self.document, "select");
                self.reset_insertion_mode();
                self.reprocess_token = true;
            }
            Token::StartTag { name, .. } if name == "script" || name == "template" => {
                self.handle_in_head();
            }
            Token::EndTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::Eof { .. } => {
                self.handle_in_body();
            }
            _ => {
                self.ignore_token("token not allowed in in select insertion mode");
            }
        }
    }

    fn handle_in_select_in_table(&mut self) {
        const TABLE_TAGS: [&str; 8] = ["caption", "table", "tbody", "tfoot", "thead", "tr", "td", "th"];

        let token = self.current_token.clone();

        match &token {
            Token::StartTag { name, .. } if TABLE_TAGS.contains(&name.as_str()) => {
                self.parse_error("table tag inside select");

                self.open_elements.pop_until_named(&*self.document, "select");
                self.reset_insertion_mode();
                self.reprocess_token = true;
            }
            Token::EndTag { name, .. } if TABLE_TAGS.contains(&name.as_str()) => {
                self.parse_error("table end tag inside select");

                if !self.open_elements.in_scope(&*self.document, name, Scope::Table) {
                    self.token_handled = false;
                    return;
                }

                self.open_elements.pop_until_named(&*self.document, "select");
                self.reset_insertion_mode();
                self.reprocess_token = true;
            }
            _ => self.handle_in_select(),
        }
    }

    /// Handle insertion mode "in_template"
    fn handle_in_template(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Text { .. } | Token::Comment { .. } | Token::DocType { .. } => {
                self.handle_in_body();
            }
            Token::StartTag { name, .. }
                if [
                    "base", "basefont", "bgsound", "link", "meta", "noframes", "script", "style", "template", "title",
                ]
                .contains(&name.as_str()) =>
            {
                self.handle_in_head();
            }
            Token::EndTag { name, .. } if name == "template" => {
                self.handle_in_head();
            }
            Token::StartTag { name, .. } => {
                let mode = match name.as_str() {
                    "caption" | "colgroup" | "tbody" | "tfoot" | "thead" => InsertionMode::InTable,
                    "col" => InsertionMode::InColumnGroup,
                    "tr" => InsertionMode::InTableBody,
                    "td" | "th" => InsertionMode::InRow,
                    _ => InsertionMode::InBody,
                };

                self.template_insertion_mode.pop();
                self.template_insertion_mode.push(mode);
                self.reprocess_in(mode);
            }
            Token::EndTag { .. } => {
                self.ignore_token("end tag not allowed in in template insertion mode");
            }
            Token::Eof { .. } => {
                if !self.open_elements.has_element(&*self.document, "template") {
                    // fragment case
                    self.stop_parsing();
                    return;
                }

                self.parse_error(ParserError::EofInTemplate.as_str());

                self.open_elements.pop_until_named(&*self.document, "template");
                self.active_formatting_elements.clear_to_last_marker();
                self.template_insertion_mode.pop();
                self.reset_insertion_mode();
                self.reprocess_token = true;
            }
        }
    }

    fn handle_after_body(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                self.handle_in_body();
            }
            Token::Comment { .. } => {
                let html_id = self.open_elements.first().unwrap_or(self.root);
                self.insert_comment_element(&token, Some(html_id));
            }
            Token::DocType { .. } => {
                self.ignore_token(ParserError::UnexpectedDocType.as_str());
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::EndTag { name, .. } if name == "html" => {
                if self.is_fragment_case {
                    self.ignore_token("html end tag not allowed in fragment");
                    return;
                }
                self.switch_mode(InsertionMode::AfterAfterBody);
            }
            Token::Eof { .. } => {
                self.stop_parsing();
            }
            _ => {
                self.parse_error("content after body");
                self.reprocess_in(InsertionMode::InBody);
            }
        }
    }

    fn handle_in_frameset(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                self.insert_text_element(&token);
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.ignore_token(ParserError::UnexpectedDocType.as_str());
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::StartTag { name, .. } if name == "frameset" || name == "frame" => {
                self.insert_html_element(&token);
            }
            Token::EndTag { name, .. } if name == "frameset" => {
                if self.current_node_is("html") || self.open_elements.len() <= 1 {
                    // fragment case
                    self.ignore_token("frameset end tag without open frameset");
                    return;
                }

                self.open_elements.pop();

                if !self.is_fragment_case && !self.current_node_is("frameset") {
                    self.switch_mode(InsertionMode::AfterFrameset);
                }
            }
            Token::StartTag { name, .. } if name == "noframes" => {
                self.handle_in_head();
            }
            Token::Eof { .. } => {
                if !self.current_node_is("html") {
                    self.parse_error("eof in frameset");
                }
                self.stop_parsing();
            }
            _ => {
                self.ignore_token("token not allowed in frameset insertion mode");
            }
        }
    }

    fn handle_after_frameset(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                self.insert_text_element(&token);
            }
            Token::Comment { .. } => {
                self.insert_comment_element(&token, None);
            }
            Token::DocType { .. } => {
                self.ignore_token(ParserError::UnexpectedDocType.as_str());
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::EndTag { name, .. } if name == "html" => {
                self.switch_mode(InsertionMode::AfterAfterFrameset);
            }
            Token::StartTag { name, .. } if name == "noframes" => {
                self.handle_in_head();
            }
            Token::Eof { .. } => {
                self.stop_parsing();
            }
            _ => {
                self.ignore_token("token not allowed in after frameset insertion mode");
            }
        }
    }

    fn handle_after_after_body(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Comment { .. } => {
                self.insert_comment_element(&token, Some(self.root));
            }
            Token::DocType { .. } => {
                self.handle_in_body();
            }
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                self.handle_in_body();
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::Eof { .. } => {
                self.stop_parsing();
            }
            _ => {
                self.parse_error("content after html");
                self.reprocess_in(InsertionMode::InBody);
            }
        }
    }

    fn handle_after_after_frameset(&mut self) {
        let token = self.current_token.clone();

        match &token {
            Token::Comment { .. } => {
                self.insert_comment_element(&token, Some(self.root));
            }
            Token::DocType { .. } => {
                self.handle_in_body();
            }
            Token::Text { text: value, .. } if token.is_mixed() => {
                let tokens = self.split_mixed_token(value);
                self.queue_tokens(tokens);
            }
            Token::Text { .. } if token.is_empty_or_white() => {
                self.handle_in_body();
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.handle_in_body();
            }
            Token::StartTag { name, .. } if name == "noframes" => {
                self.handle_in_head();
            }
            Token::Eof { .. } => {
                self.stop_parsing();
            }
            _ => {
                self.ignore_token("token not allowed in after after frameset insertion mode");
            }
        }
    }

    /// Sets up the parser for parsing the content of `context`
    fn initialize_fragment_case(&mut self, context: NodeId) {
        self.is_fragment_case = true;
        self.context_node_id = Some(context);

        let name = self.document.element_name(context).unwrap_or_default().to_string();
        let namespace = self.document.element_namespace(context).unwrap_or_default();

        self.tokenizer.set_state(find_initial_state_for_context(
            &name,
            namespace,
            self.options.scripting_enabled,
        ));

        // The seed only carries the name of the context, never its attributes
        let seed = self
            .document
            .create_element(&name, namespace, &HashMap::new(), Location::default());
        self.document.append(self.root, seed);
        self.fragment_seed = Some(seed);
        self.push_element(seed);

        if namespace == Namespace::Html && name == "template" {
            self.template_insertion_mode.push(InsertionMode::InTemplate);
        }

        self.reset_insertion_mode();

        let mut ancestor = Some(context);
        while let Some(node_id) = ancestor {
            if self.is_html_element(node_id, "form") {
                self.form_element = Some(node_id);
                break;
            }
            ancestor = self.document.parent_of(node_id);
        }
    }

    /// Picks a new insertion mode from the stack of open elements. Returns true when the
    /// insertion mode changed.
    pub(crate) fn reset_insertion_mode(&mut self) -> bool {
        let mode = self.compute_reset_mode();
        if mode == self.insertion_mode {
            return false;
        }

        self.switch_mode(mode);
        true
    }

    #[allow(clippy::panic)]
    fn compute_reset_mode(&self) -> InsertionMode {
        let Some(bottom) = self.open_elements.len().checked_sub(1) else {
            return InsertionMode::InBody;
        };
        let upper = bottom.saturating_sub(self.open_elements.max_depth());

        for idx in (upper..=bottom).rev() {
            let last = idx == 0;

            let Some(mut node_id) = self.open_elements.get(idx) else {
                continue;
            };
            if last && self.is_fragment_case {
                if let Some(context_id) = self.context_node_id {
                    node_id = context_id;
                }
            }

            if self.document.element_namespace(node_id) != Some(Namespace::Html) {
                if last {
                    return InsertionMode::InBody;
                }
                continue;
            }

            let mode = match self.document.element_name(node_id).unwrap_or_default() {
                "select" => Some(InsertionMode::InSelect),
                "td" | "th" if !last => Some(InsertionMode::InCell),
                "tr" => Some(InsertionMode::InRow),
                "tbody" | "thead" | "tfoot" => Some(InsertionMode::InTableBody),
                "caption" => Some(InsertionMode::InCaption),
                "colgroup" => Some(InsertionMode::InColumnGroup),
                "table" => Some(InsertionMode::InTable),
                "template" => match self.template_insertion_mode.last() {
                    Some(mode) => Some(*mode),
                    None => panic!("template element on the stack without a template insertion mode"),
                },
                "head" if !last => Some(InsertionMode::InHead),
                "body" => Some(InsertionMode::InBody),
                "frameset" => Some(InsertionMode::InFrameset),
                "html" if self.head_element.is_none() => Some(InsertionMode::BeforeHead),
                "html" => Some(InsertionMode::AfterHead),
                _ => None,
            };

            if let Some(mode) = mode {
                return mode;
            }
        }

        InsertionMode::InBody
    }

    /// Inserts the current (raw text) element and switches the tokenizer to raw text
    fn parse_raw_data(&mut self) {
        self.switch_to_text_mode(State::RawText);
    }

    /// Inserts the current (rcdata) element and switches the tokenizer to rcdata
    fn parse_rcdata(&mut self) {
        self.switch_to_text_mode(State::RcData);
    }

    fn switch_to_text_mode(&mut self, state: State) {
        // The tokenizer state goes first: a self-closing tag switches it back to data
        self.tokenizer.set_state(state);
        self.insert_html_element(&self.current_token.clone());

        self.original_insertion_mode = self.insertion_mode;
        self.switch_mode(InsertionMode::Text);
    }

    /// Splits a text token into runs of whitespace, null and other characters.
    ///
    /// The tokenizer does not know the context of the text it emits, so it emits text as
    /// greedily as possible. Only the modes that treat whitespace differently split it up, so
    /// large blobs of text stay a single token everywhere else.
    fn split_mixed_token(&self, text: &str) -> Vec<Token> {
        self.split_text_by(text, |ch| {
            if ch == CHAR_NUL {
                0
            } else if ch.is_ascii_whitespace() {
                1
            } else {
                2
            }
        })
    }

    /// Splits a text token into runs of null and non-null characters
    fn split_mixed_token_null(&self, text: &str) -> Vec<Token> {
        self.split_text_by(text, |ch| u8::from(ch == CHAR_NUL))
    }

    fn split_text_by(&self, text: &str, group_of: impl Fn(char) -> u8) -> Vec<Token> {
        let location = self.current_token.get_location();
        let mut tokens = vec![];
        let mut last_group = None;
        let mut found = String::new();

        for ch in text.chars() {
            let group = group_of(ch);

            if last_group != Some(group) && !found.is_empty() {
                tokens.push(Token::Text {
                    text: std::mem::take(&mut found),
                    is_cdata: false,
                    location,
                });
            }

            found.push(ch);
            last_group = Some(group);
        }

        if !found.is_empty() {
            tokens.push(Token::Text {
                text: found,
                is_cdata: false,
                location,
            });
        }

        tokens
    }

    #[cfg(feature = "debug_parser")]
    fn display_debug_info(&self) {
        use crate::parser::formatting::ActiveElement;

        let name_of = |node_id: NodeId| {
            format!(
                "({node_id}) {}",
                self.document.element_name(node_id).unwrap_or_default()
            )
        };

        let open: Vec<String> = self.open_elements.iter().map(|&node_id| name_of(node_id)).collect();
        let active: Vec<String> = self
            .active_formatting_elements
            .iter()
            .map(|entry| match entry {
                ActiveElement::Marker => "marker".to_string(),
                ActiveElement::Formatting(node_id) => name_of(*node_id),
            })
            .collect();

        debug!("-----------------------------------------");
        debug!("current token   : {:?}", self.current_token);
        debug!("insertion mode  : {:?}", self.insertion_mode);
        debug!("open elements   : [ {} ]", open.join(", "));
        debug!("active elements : [ {} ]", active.join(", "));
    }
}

/// Tokenizer state for the content of a fragment context element
fn find_initial_state_for_context(name: &str, namespace: Namespace, scripting_enabled: bool) -> State {
    if namespace != Namespace::Html {
        return State::Data;
    }

    match name {
        "title" | "textarea" => State::RcData,
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => State::RawText,
        "script" => State::ScriptData,
        "noscript" if scripting_enabled => State::RawText,
        "plaintext" => State::PlainText,
        _ => State::Data,
    }
}

/// Adjusts attribute names in the given token for SVG
fn adjust_svg_attributes(token: &mut Token) {
    if let Token::StartTag { attributes, .. } = token {
        *attributes = std::mem::take(attributes)
            .into_iter()
            .map(|(name, value)| match SVG_ADJUSTMENTS_ATTRIBUTES.get(name.as_str()) {
                Some(&adjusted) => (adjusted.to_string(), value),
                None => (name, value),
            })
            .collect();
    }
}

/// Adjusts the tag name in the given token for SVG
fn adjust_svg_tag_names(token: &mut Token) {
    if let Token::StartTag { name, .. } = token {
        if let Some(&adjusted) = SVG_ADJUSTMENTS_TAGS.get(name.as_str()) {
            *name = adjusted.to_string();
        }
    }
}

/// Adjusts attribute names in the given token for MathML
fn adjust_mathml_attributes(token: &mut Token) {
    if let Token::StartTag { attributes, .. } = token {
        *attributes = std::mem::take(attributes)
            .into_iter()
            .map(|(name, value)| match MATHML_ADJUSTMENTS.get(name.as_str()) {
                Some(&adjusted) => (adjusted.to_string(), value),
                None => (name, value),
            })
            .collect();
    }
}

/// Namespaces `xlink:*`, `xml:*` and `xmlns*` attributes. The stored name is the prefix and the
/// local name separated by a space.
fn adjust_foreign_attributes(token: &mut Token) {
    if let Token::StartTag { attributes, .. } = token {
        *attributes = std::mem::take(attributes)
            .into_iter()
            .map(|(name, value)| match XML_ADJUSTMENTS.get(name.as_str()) {
                Some(&("", local)) => (local.to_string(), value),
                Some(&(prefix, local)) => (format!("{prefix} {local}"), value),
                None => (name, value),
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::helper::InsertionPositionMode;
    use super::*;
    use crate::document::Document;
    use crate::testing::{comment, doctype, end, eof, self_closing, start, start_with_attrs, text};
    use crate::tokenizer::TokenQueue;
    use crate::writer::TreeOutputGenerator;
    use test_case::test_case;

    fn parse_with(tokens: Vec<Token>, options: Html5ParserOptions) -> (Document, Vec<ParseError>) {
        let mut queue = TokenQueue::new(tokens);
        let mut document = Document::new();
        let errors = Html5Parser::parse_document(&mut queue, &mut document, Some(options)).unwrap();
        (document, errors)
    }

    fn parse(tokens: Vec<Token>) -> (Document, Vec<ParseError>) {
        parse_with(tokens, Html5ParserOptions::default())
    }

    fn dump(document: &Document) -> Vec<String> {
        TreeOutputGenerator::new(document).generate()
    }

    fn has_error(errors: &[ParseError], message: &str) -> bool {
        errors.iter().any(|e| e.message == message)
    }

    #[test]
    fn implied_html_head_and_body() {
        let (document, errors) = parse(vec![doctype("html"), start("p"), text("hello")]);

        assert_eq!(
            dump(&document),
            vec!["| <!DOCTYPE html>", "| <html>", "|   <head>", "|   <body>", "|     <p>", r#"|       "hello""#]
        );
        assert!(errors.is_empty());
        assert_eq!(document.quirks_mode(), QuirksMode::NoQuirks);
    }

    #[test]
    fn missing_doctype_is_quirks() {
        let (document, errors) = parse(vec![start("p")]);

        assert_eq!(document.quirks_mode(), QuirksMode::Quirks);
        assert!(has_error(&errors, ParserError::ExpectedDocTypeButGotStartTag.as_str()));
    }

    #[test]
    fn reset_picks_cell_and_row() {
        let mut queue = TokenQueue::new(vec![]);
        let mut document = Document::new();
        let mut parser = Html5Parser::new(&mut queue, &mut document, Html5ParserOptions::default());

        for name in ["html", "body", "table", "tbody", "tr", "td"] {
            parser.process_token(start(name));
        }
        assert_eq!(parser.open_elements().len(), 6);

        parser.insertion_mode = InsertionMode::InBody;
        assert!(parser.reset_insertion_mode());
        assert_eq!(parser.insertion_mode(), InsertionMode::InCell);
        assert!(!parser.reset_insertion_mode());

        parser.open_elements.pop();
        assert!(parser.reset_insertion_mode());
        assert_eq!(parser.insertion_mode(), InsertionMode::InRow);
    }

    #[test]
    fn reset_on_empty_stack_is_in_body() {
        let mut queue = TokenQueue::new(vec![]);
        let mut document = Document::new();
        let mut parser = Html5Parser::new(&mut queue, &mut document, Html5ParserOptions::default());

        assert!(parser.reset_insertion_mode());
        assert_eq!(parser.insertion_mode(), InsertionMode::InBody);
    }

    #[test]
    fn noahs_ark_limits_identical_formatting_elements() {
        let mut queue = TokenQueue::new(vec![]);
        let mut document = Document::new();
        let mut parser = Html5Parser::new(&mut queue, &mut document, Html5ParserOptions::default());

        parser.process_token(start("html"));
        parser.process_token(start("body"));
        for _ in 0..4 {
            parser.process_token(start("b"));
        }

        assert_eq!(parser.active_formatting_elements().len(), 3);
        // html, body and all four b elements
        assert_eq!(parser.open_elements().len(), 6);
    }

    #[test]
    fn deep_nesting_keeps_stack_bounded() {
        let mut queue = TokenQueue::new(vec![]);
        let mut document = Document::new();
        let mut parser = Html5Parser::new(&mut queue, &mut document, Html5ParserOptions::default());

        for _ in 0..100_000 {
            parser.process_token(start("div"));
            assert!(parser.open_elements().len() <= 256);
        }

        assert_eq!(parser.open_elements().len(), 256);
        assert_eq!(parser.insertion_mode(), InsertionMode::InBody);
    }

    #[test]
    fn pruned_head_is_forgotten() {
        let mut queue = TokenQueue::new(vec![]);
        let mut document = Document::new();
        let options = Html5ParserOptions {
            max_stack_depth: 2,
            ..Html5ParserOptions::default()
        };
        let mut parser = Html5Parser::new(&mut queue, &mut document, options);

        parser.process_token(start("html"));
        parser.process_token(start("head"));
        assert!(parser.head_element.is_some());

        parser.process_token(start("noscript"));
        assert!(parser.open_elements().len() <= 2);
        assert!(parser.head_element.is_none());
    }

    #[test_case("select", InsertionMode::InSelect ; "select")]
    #[test_case("tr", InsertionMode::InRow ; "row")]
    #[test_case("td", InsertionMode::InBody ; "cell is last candidate")]
    #[test_case("table", InsertionMode::InTable ; "table")]
    #[test_case("html", InsertionMode::BeforeHead ; "html")]
    #[test_case("template", InsertionMode::InTemplate ; "template")]
    #[test_case("div", InsertionMode::InBody ; "anything else")]
    fn fragment_starting_mode(context: &str, expected: InsertionMode) {
        let mut document = Document::new();
        let root = document.document_id();
        let context_id = document.create_element(context, Namespace::Html, &HashMap::new(), Location::default());
        document.append(root, context_id);

        let mut queue = TokenQueue::new(vec![]);
        let parser = Html5Parser::new_fragment(&mut queue, &mut document, context_id, Html5ParserOptions::default());

        assert_eq!(parser.insertion_mode(), expected);
        assert_eq!(parser.open_elements().len(), 1);
    }

    #[test]
    fn fragment_in_foreign_context_starts_in_body() {
        let mut document = Document::new();
        let context_id = document.create_element("svg", Namespace::Svg, &HashMap::new(), Location::default());

        let mut queue = TokenQueue::new(vec![]);
        let parser = Html5Parser::new_fragment(&mut queue, &mut document, context_id, Html5ParserOptions::default());

        assert_eq!(parser.insertion_mode(), InsertionMode::InBody);
    }

    #[test_case("title", State::RcData ; "title")]
    #[test_case("textarea", State::RcData ; "textarea")]
    #[test_case("style", State::RawText ; "style")]
    #[test_case("script", State::ScriptData ; "script")]
    #[test_case("plaintext", State::PlainText ; "plaintext")]
    #[test_case("noscript", State::RawText ; "noscript")]
    #[test_case("div", State::Data ; "div")]
    fn fragment_tokenizer_state(context: &str, expected: State) {
        let mut document = Document::new();
        let context_id = document.create_element(context, Namespace::Html, &HashMap::new(), Location::default());

        let mut queue = TokenQueue::new(vec![]);
        let _parser = Html5Parser::new_fragment(&mut queue, &mut document, context_id, Html5ParserOptions::default());

        assert_eq!(queue.state(), expected);
    }

    #[test]
    fn fragment_finds_enclosing_form() {
        let mut document = Document::new();
        let root = document.document_id();
        let form = document.create_element("form", Namespace::Html, &HashMap::new(), Location::default());
        let div = document.create_element("div", Namespace::Html, &HashMap::new(), Location::default());
        document.append(root, form);
        document.append(form, div);

        let mut queue = TokenQueue::new(vec![]);
        let parser = Html5Parser::new_fragment(&mut queue, &mut document, div, Html5ParserOptions::default());

        assert_eq!(parser.form_element, Some(form));
    }

    #[test]
    fn fragment_in_select_context() {
        let mut document = Document::new();
        let select = document.create_element("select", Namespace::Html, &HashMap::new(), Location::default());

        let mut queue = TokenQueue::new(vec![start("option"), text("one"), start("option"), text("two")]);
        let result = Html5Parser::parse_fragment(&mut queue, &mut document, Some(select), None).unwrap();

        assert_eq!(result.nodes.len(), 2);
        assert!(result
            .nodes
            .iter()
            .all(|&id| document.element_name(id) == Some("option")));
        assert_eq!(document.text_content(result.root), "onetwo");
    }

    #[test]
    fn foster_parenting_moves_content_before_table() {
        let (document, errors) = parse(vec![
            doctype("html"),
            start("table"),
            start("div"),
            text("A"),
            end("div"),
            end("table"),
        ]);

        assert_eq!(
            dump(&document),
            vec![
                "| <!DOCTYPE html>",
                "| <html>",
                "|   <head>",
                "|   <body>",
                "|     <div>",
                r#"|       "A""#,
                "|     <table>",
            ]
        );
        assert!(has_error(&errors, ParserError::FosterParentedContent.as_str()));
    }

    #[test]
    fn table_text_is_foster_parented() {
        let (document, _) = parse(vec![doctype("html"), start("table"), text("x"), start("tr"), end("table")]);

        assert_eq!(
            dump(&document),
            vec![
                "| <!DOCTYPE html>",
                "| <html>",
                "|   <head>",
                "|   <body>",
                r#"|     "x""#,
                "|     <table>",
                "|       <tbody>",
                "|         <tr>",
            ]
        );
    }

    #[test]
    fn table_whitespace_stays_in_table() {
        let (document, errors) = parse(vec![doctype("html"), start("table"), text("  "), start("tr"), end("table")]);

        assert_eq!(
            dump(&document),
            vec![
                "| <!DOCTYPE html>",
                "| <html>",
                "|   <head>",
                "|   <body>",
                "|     <table>",
                r#"|       "  ""#,
                "|       <tbody>",
                "|         <tr>",
            ]
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn self_closing_non_void_element() {
        let mut queue = TokenQueue::new(vec![doctype("html"), self_closing("div"), text("x")]);
        let mut document = Document::new();
        let errors = Html5Parser::parse_document(&mut queue, &mut document, None).unwrap();

        assert_eq!(
            dump(&document),
            vec!["| <!DOCTYPE html>", "| <html>", "|   <head>", "|   <body>", "|     <div>", r#"|     "x""#]
        );
        assert!(has_error(&errors, "Tag cannot be self closing; not a void tag"));
        assert_eq!(queue.state(), State::Data);
    }

    #[test]
    fn self_closing_unknown_element_has_no_error() {
        let (document, errors) = parse(vec![doctype("html"), self_closing("widget"), text("x")]);

        assert_eq!(
            dump(&document),
            vec!["| <!DOCTYPE html>", "| <html>", "|   <head>", "|   <body>", "|     <widget>", r#"|     "x""#]
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn custom_void_tags() {
        let tokens = vec![doctype("html"), start("widget"), text("x")];

        let (document, _) = parse(tokens.clone());
        assert_eq!(dump(&document)[5], r#"|       "x""#);

        let options = Html5ParserOptions {
            custom_void_tags: vec!["widget".to_string()],
            ..Html5ParserOptions::default()
        };
        let (document, _) = parse_with(tokens, options);
        assert_eq!(dump(&document)[4..], [r"|     <widget>".to_string(), r#"|     "x""#.to_string()]);
    }

    #[test]
    fn void_elements_are_not_pushed() {
        let (document, _) = parse(vec![doctype("html"), start("br"), start("img"), text("x")]);

        assert_eq!(
            dump(&document)[4..],
            ["|     <br>", "|     <img>", r#"|     "x""#].map(String::from)
        );
    }

    #[test]
    fn error_log_is_capped() {
        let mut tokens = vec![doctype("html"), start("body")];
        for i in 0..10 {
            tokens.push(Token::EndTag {
                name: "nonexistent".to_string(),
                is_self_closing: false,
                location: Location::new(1, i + 1, i),
            });
        }

        let options = Html5ParserOptions {
            max_errors: 2,
            ..Html5ParserOptions::default()
        };
        let (_, errors) = parse_with(tokens.clone(), options);
        assert_eq!(errors.len(), 2);

        let options = Html5ParserOptions {
            max_errors: 0,
            ..Html5ParserOptions::default()
        };
        let (_, errors) = parse_with(tokens, options);
        assert!(errors.is_empty());
    }

    #[test]
    fn formatting_is_reconstructed() {
        let (document, _) = parse(vec![
            doctype("html"),
            start("p"),
            start("b"),
            text("x"),
            end("p"),
            start("p"),
            text("y"),
        ]);

        assert_eq!(
            dump(&document)[4..],
            [
                "|     <p>",
                "|       <b>",
                r#"|         "x""#,
                "|     <p>",
                "|       <b>",
                r#"|         "y""#,
            ]
            .map(String::from)
        );
    }

    #[test]
    fn misnested_formatting_is_adopted() {
        let (document, errors) = parse(vec![
            doctype("html"),
            start("b"),
            start("p"),
            text("x"),
            end("b"),
            text("y"),
            end("p"),
        ]);

        assert_eq!(
            dump(&document)[4..],
            [
                "|     <b>",
                "|     <p>",
                "|       <b>",
                r#"|         "x""#,
                r#"|       "y""#,
            ]
            .map(String::from)
        );
        assert!(has_error(&errors, ParserError::MisnestedFormattingElement.as_str()));
    }

    #[test]
    fn svg_names_and_attributes_are_adjusted() {
        let (document, _) = parse(vec![
            doctype("html"),
            start("svg"),
            start_with_attrs("foreignobject", &[("viewbox", "0 0 1 1"), ("xlink:href", "#a")]),
            start("div"),
            end("div"),
            end("foreignobject"),
            end("svg"),
            text("after"),
        ]);

        assert_eq!(
            dump(&document)[4..],
            [
                "|     <svg svg>",
                "|       <svg foreignObject>",
                r#"|         viewBox="0 0 1 1""#,
                r##"|         xlink href="#a""##,
                "|         <div>",
                r#"|     "after""#,
            ]
            .map(String::from)
        );
    }

    #[test]
    fn breakout_tag_leaves_foreign_content() {
        let (document, _) = parse(vec![doctype("html"), start("math"), start("mi"), end("mi"), start("p")]);

        assert_eq!(
            dump(&document)[4..],
            ["|     <math math>", "|       <math mi>", "|     <p>"].map(String::from)
        );
    }

    #[test]
    fn template_contents_and_mode_stack() {
        let mut queue = TokenQueue::new(vec![]);
        let mut document = Document::new();
        let mut parser = Html5Parser::new(&mut queue, &mut document, Html5ParserOptions::default());

        parser.process_token(doctype("html"));
        parser.process_token(start("template"));
        assert_eq!(parser.insertion_mode(), InsertionMode::InTemplate);
        parser.process_token(start("tr"));
        assert_eq!(parser.template_insertion_mode, vec![InsertionMode::InTableBody]);
        parser.process_token(end("tr"));
        parser.process_token(end("template"));
        assert!(parser.template_insertion_mode.is_empty());
        assert_eq!(parser.insertion_mode(), InsertionMode::InHead);
        parser.process_token(eof());

        drop(parser);
        assert_eq!(
            dump(&document),
            [
                "| <!DOCTYPE html>",
                "| <html>",
                "|   <head>",
                "|     <template>",
                "|       content",
                "|         <tr>",
                "|   <body>",
            ]
            .map(String::from)
        );
    }

    #[test]
    fn mixed_text_is_split_in_head() {
        let (document, _) = parse(vec![doctype("html"), start("head"), text(" \nx")]);

        assert_eq!(
            dump(&document)[2..],
            ["|   <head>", "|     \" \n\"", "|   <body>", r#"|     "x""#].map(String::from)
        );
    }

    #[test]
    fn comments_after_html_go_to_the_document() {
        let (document, _) = parse(vec![doctype("html"), start("p"), end("body"), end("html"), comment("bye")]);

        assert_eq!(dump(&document).last().map(String::as_str), Some("| <!-- bye -->"));
    }

    #[test]
    fn leading_newline_of_pre_is_dropped() {
        let (document, _) = parse(vec![doctype("html"), start("pre"), text("\nx")]);

        assert_eq!(dump(&document)[4..], ["|     <pre>", r#"|       "x""#].map(String::from));
    }

    #[test]
    fn stray_br_end_tag_becomes_br() {
        let (document, errors) = parse(vec![doctype("html"), start("p"), end("br")]);

        assert_eq!(dump(&document)[4..], ["|     <p>", "|       <br>"].map(String::from));
        assert!(has_error(&errors, "br end tag not allowed"));
    }

    #[test]
    fn processing_reports_ignored_tokens() {
        let mut queue = TokenQueue::new(vec![]);
        let mut document = Document::new();
        let mut parser = Html5Parser::new(&mut queue, &mut document, Html5ParserOptions::default());

        assert!(parser.process_token(doctype("html")));
        assert!(!parser.process_token(doctype("html")));
        assert!(parser.process_token(start("div")));
        assert!(!parser.process_token(end("span")));
    }

    #[test]
    fn eof_stops_the_parser() {
        let mut queue = TokenQueue::new(vec![doctype("html"), start("div"), start("span")]);
        let mut document = Document::new();
        let mut parser = Html5Parser::new(&mut queue, &mut document, Html5ParserOptions::default());

        parser.run().unwrap();

        assert!(parser.is_finished());
        assert_eq!(parser.open_elements().len(), 1);
    }

    fn depth_options(max_stack_depth: usize) -> Html5ParserOptions {
        Html5ParserOptions {
            max_stack_depth,
            ..Html5ParserOptions::default()
        }
    }

    #[test]
    fn pruned_form_is_forgotten() {
        let mut queue = TokenQueue::new(vec![]);
        let mut document = Document::new();
        let mut parser = Html5Parser::new(&mut queue, &mut document, depth_options(3));

        for name in ["html", "body", "form"] {
            parser.process_token(start(name));
        }
        assert!(parser.form_element.is_some());

        parser.process_token(start("div"));
        assert!(parser.form_element.is_none());
        assert_eq!(parser.open_elements().len(), 3);
    }

    #[test]
    fn pruned_formatting_element_leaves_the_list() {
        let mut queue = TokenQueue::new(vec![]);
        let mut document = Document::new();
        let mut parser = Html5Parser::new(&mut queue, &mut document, depth_options(3));

        for name in ["html", "body", "b"] {
            parser.process_token(start(name));
        }
        let b = parser.open_elements().current();
        assert_eq!(parser.active_formatting_elements().len(), 1);

        parser.process_token(start("div"));
        assert!(b.is_some_and(|b| !parser.active_formatting_elements().contains(b)));
        assert!(parser.active_formatting_elements().is_empty());
    }

    #[test]
    fn pruned_template_unwinds_its_state() {
        let mut queue = TokenQueue::new(vec![]);
        let mut document = Document::new();
        let mut parser = Html5Parser::new(&mut queue, &mut document, depth_options(4));

        for name in ["html", "body", "b", "template"] {
            parser.process_token(start(name));
        }
        assert_eq!(parser.insertion_mode(), InsertionMode::InTemplate);
        // b and the template marker
        assert_eq!(parser.active_formatting_elements().len(), 2);

        parser.process_token(start("div"));

        assert!(parser.template_insertion_mode.is_empty());
        assert_eq!(parser.active_formatting_elements().len(), 1);
        assert_eq!(parser.insertion_mode(), InsertionMode::InBody);
        assert_eq!(parser.open_elements().len(), 4);
        assert!(!parser
            .open_elements()
            .iter()
            .any(|&id| parser.document.element_name(id) == Some("template")));
    }

    #[test]
    fn foster_parent_without_table_parent_uses_element_below() {
        let mut queue = TokenQueue::new(vec![]);
        let mut document = Document::new();
        let mut parser = Html5Parser::new(&mut queue, &mut document, Html5ParserOptions::default());

        for name in ["html", "body", "table"] {
            parser.process_token(start(name));
        }
        let body = parser.open_elements().get(1).unwrap();
        let table = parser.open_elements().current().unwrap();
        parser.document.remove(table);

        parser.foster_parenting = true;
        assert_eq!(
            parser.appropriate_place_insert(None),
            InsertionPositionMode::LastChild { parent_id: body }
        );

        parser.insert_text("x", Location::default());
        assert_eq!(parser.document.text_content(body), "x");
    }

    #[test]
    fn formatting_is_not_reconstructed_on_a_full_stack() {
        let tokens = vec![
            doctype("html"),
            start("p"),
            start("b"),
            text("x"),
            end("p"),
            start("div"),
            start("div"),
            text("y"),
        ];

        let (document, _) = parse(tokens.clone());
        assert_eq!(
            dump(&document)[7..],
            ["|     <div>", "|       <div>", "|         <b>", r#"|           "y""#].map(String::from)
        );

        let (document, _) = parse_with(tokens, depth_options(4));
        assert_eq!(
            dump(&document)[7..],
            ["|     <div>", "|       <div>", r#"|         "y""#].map(String::from)
        );
    }
}
