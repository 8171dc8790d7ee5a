use sanehtml_bin::build_document;
use sanehtml_bin::html5::document::Document;
use sanehtml_bin::html5::node::Namespace;
use sanehtml_bin::html5::parser::tree_builder::TreeSink;
use sanehtml_bin::html5::parser::{Html5Parser, Html5ParserOptions};
use sanehtml_bin::html5::testing::{doctype, end, start, start_with_attrs, text};
use sanehtml_bin::html5::tokenizer::token::Token;
use sanehtml_bin::html5::tokenizer::TokenQueue;
use sanehtml_bin::html5::writer::{DocumentWriter, TreeOutputGenerator};
use sanehtml_bin::shared::location::Location;
use std::collections::HashMap;
use test_case::test_case;

fn tree(tokens: Vec<Token>) -> String {
    let (document, _) = build_document(tokens, None).unwrap();
    TreeOutputGenerator::new(&document).generate().join("\n")
}

fn fragment_tree(context: &str, namespace: Namespace, tokens: Vec<Token>) -> String {
    let mut document = Document::new();
    let context_id = document.create_element(context, namespace, &HashMap::new(), Location::default());

    let mut queue = TokenQueue::new(tokens);
    let result = Html5Parser::parse_fragment(&mut queue, &mut document, Some(context_id), None).unwrap();

    TreeOutputGenerator::new(&document)
        .generate_children(result.root)
        .join("\n")
}

fn body_of(document: &Document) -> String {
    let html = document.children_of(document.document_id())[1];
    let body = document.children_of(html)[1];
    DocumentWriter::write_from_node(document, body)
}

#[test_case(
    vec![doctype("html"), start("p"), text("One"), start("p"), text("Two")],
    "| <!DOCTYPE html>\n| <html>\n|   <head>\n|   <body>\n|     <p>\n|       \"One\"\n|     <p>\n|       \"Two\""
    ; "paragraphs close each other"
)]
#[test_case(
    vec![doctype("html"), start("ul"), start("li"), text("a"), start("li"), text("b"), end("ul")],
    "| <!DOCTYPE html>\n| <html>\n|   <head>\n|   <body>\n|     <ul>\n|       <li>\n|         \"a\"\n|       <li>\n|         \"b\""
    ; "list items close each other"
)]
#[test_case(
    vec![doctype("html"), start("h1"), text("a"), start("h2"), text("b")],
    "| <!DOCTYPE html>\n| <html>\n|   <head>\n|   <body>\n|     <h1>\n|       \"a\"\n|     <h2>\n|       \"b\""
    ; "headings do not nest"
)]
#[test_case(
    vec![doctype("html"), start("table"), start("td"), text("x")],
    "| <!DOCTYPE html>\n| <html>\n|   <head>\n|   <body>\n|     <table>\n|       <tbody>\n|         <tr>\n|           <td>\n|             \"x\""
    ; "implied table sections"
)]
#[test_case(
    vec![doctype("html"), start("b"), start("p"), text("x"), end("b"), text("y")],
    "| <!DOCTYPE html>\n| <html>\n|   <head>\n|   <body>\n|     <b>\n|     <p>\n|       <b>\n|         \"x\"\n|       \"y\""
    ; "adoption agency"
)]
#[test_case(
    vec![doctype("html"), start("table"), text("x"), end("table")],
    "| <!DOCTYPE html>\n| <html>\n|   <head>\n|   <body>\n|     \"x\"\n|     <table>"
    ; "foster parented text"
)]
fn documents(tokens: Vec<Token>, expected: &str) {
    assert_eq!(tree(tokens), expected);
}

#[test_case("td", Namespace::Html, vec![start("p"), text("x")], "| <p>\n|   \"x\"" ; "cell context")]
#[test_case("template", Namespace::Html, vec![start("tr"), start("td")], "| <tr>\n|   <td>" ; "template context")]
#[test_case("select", Namespace::Html, vec![start("option"), text("a"), start("div")], "| <option>\n|   \"a\"" ; "select context")]
#[test_case("title", Namespace::Html, vec![text("<b>")], "| \"<b>\"" ; "rcdata context")]
#[test_case("p", Namespace::Html, vec![end("p"), text("x")], "| \"x\"" ; "text after the context is closed")]
#[test_case(
    "div",
    Namespace::Html,
    vec![end("div"), text("y"), start("span"), text("z")],
    "| \"y\"\n| <span>\n|   \"z\"" ;
    "content after the context is closed"
)]
#[test_case("tbody", Namespace::Html, vec![text("x"), start("tr")], "| \"x\"\n| <tr>" ; "fostered into the context without a table")]
#[test_case(
    "table",
    Namespace::Html,
    vec![text("x"), start("tr")],
    "| \"x\"\n| <tbody>\n|   <tr>" ;
    "fostered in front of the table context"
)]
fn fragments(context: &str, namespace: Namespace, tokens: Vec<Token>, expected: &str) {
    assert_eq!(fragment_tree(context, namespace, tokens), expected);
}

#[test]
fn formatting_reconstruction_is_limited_by_noahs_ark() {
    let mut tokens = vec![doctype("html"), start("p")];
    tokens.extend((0..4).map(|_| start("b")));
    tokens.extend([text("x"), end("p"), start("p"), text("y")]);

    let (document, _) = build_document(tokens, None).unwrap();

    assert_eq!(
        body_of(&document),
        "<body><p><b><b><b><b>x</b></b></b></b></p><p><b><b><b>y</b></b></b></p></body>"
    );
}

#[test]
fn deeply_nested_input_is_bounded() {
    let mut tokens = vec![doctype("html")];
    tokens.extend((0..50_000).map(|_| start("div")));
    tokens.push(text("deep"));

    let (document, errors) = build_document(tokens, None).unwrap();

    assert_eq!(document.text_content(document.document_id()), "deep");
    assert!(errors.len() <= 100);

    let serialized = DocumentWriter::write_without_comments(&document, document.document_id());
    assert!(serialized.contains("deep"));
}

#[test]
fn json_token_stream() {
    let json = r#"[
        {"type": "doc_type", "name": "html"},
        {"type": "start_tag", "name": "a", "attributes": {"href": "/x"}},
        {"type": "text", "text": "link"},
        {"type": "end_tag", "name": "a"},
        {"type": "comment", "comment": "done"}
    ]"#;

    let mut queue = TokenQueue::from_json(json).unwrap();
    let mut document = Document::new();
    let errors = Html5Parser::parse_document(&mut queue, &mut document, None).unwrap();

    assert!(errors.is_empty());
    assert_eq!(body_of(&document), r#"<body><a href="/x">link</a><!--done--></body>"#);
}

#[test]
fn attributes_are_merged_into_html() {
    let tokens = vec![
        doctype("html"),
        start_with_attrs("html", &[("lang", "en")]),
        start("body"),
        start_with_attrs("html", &[("lang", "nl"), ("dir", "ltr")]),
    ];

    let (document, errors) = build_document(tokens, None).unwrap();
    let html = document.children_of(document.document_id())[1];
    let attributes = document.attributes(html).unwrap();

    assert_eq!(attributes.get("lang").map(String::as_str), Some("en"));
    assert_eq!(attributes.get("dir").map(String::as_str), Some("ltr"));
    assert_eq!(errors.len(), 1);
}

#[test]
fn options_are_read_from_json() {
    let options: Html5ParserOptions = serde_json::from_str(r#"{"max_stack_depth": 16}"#).unwrap();

    assert_eq!(options.max_stack_depth, 16);
    assert_eq!(options.max_errors, 100);
    assert!(options.scripting_enabled);
}
