use anyhow::{anyhow, Result};
use log::debug;
use sanehtml_bin::html5::document::Document;
use sanehtml_bin::html5::node::Namespace;
use sanehtml_bin::html5::parser::tree_builder::TreeSink;
use sanehtml_bin::html5::parser::{Html5Parser, Html5ParserOptions};
use sanehtml_bin::html5::tokenizer::TokenQueue;
use sanehtml_bin::html5::writer::TreeOutputGenerator;
use sanehtml_bin::shared::location::Location;
use sanehtml_bin::types::ParseError;
use simple_logger::SimpleLogger;
use std::collections::HashMap;
use std::fs;

fn main() -> Result<()> {
    let matches = clap::Command::new("Sanehtml tree builder")
        .version("0.1.0")
        .arg(
            clap::Arg::new("tokens")
                .help("JSON file with the token stream to build a tree from")
                .required(true)
                .index(1),
        )
        .arg(
            clap::Arg::new("context")
                .help("Parse the tokens as the content of this element")
                .long("context"),
        )
        .arg(
            clap::Arg::new("context-namespace")
                .help("Namespace of the context element (html, svg or math)")
                .long("context-namespace")
                .default_value("html"),
        )
        .arg(
            clap::Arg::new("options")
                .help("JSON file with parser options")
                .long("options"),
        )
        .arg(
            clap::Arg::new("verbose")
                .help("Enable debug logging")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("verbose") {
        SimpleLogger::new().init()?;
    }

    let tokens_path = matches
        .get_one::<String>("tokens")
        .ok_or_else(|| anyhow!("no token file given"))?;
    let mut queue = TokenQueue::from_json(&fs::read_to_string(tokens_path)?)?;

    let options = match matches.get_one::<String>("options") {
        Some(path) => Some(serde_json::from_str::<Html5ParserOptions>(&fs::read_to_string(path)?)?),
        None => None,
    };

    let mut document = Document::new();

    let (output, errors) = match matches.get_one::<String>("context") {
        Some(context) => {
            let namespace_name = matches
                .get_one::<String>("context-namespace")
                .map_or("html", String::as_str);
            let namespace =
                Namespace::from_name(namespace_name).ok_or_else(|| anyhow!("unknown namespace: {namespace_name}"))?;

            let context_id = document.create_element(context, namespace, &HashMap::new(), Location::default());
            let result = Html5Parser::parse_fragment(&mut queue, &mut document, Some(context_id), options)?;

            (TreeOutputGenerator::new(&document).generate_children(result.root), result.errors)
        }
        None => {
            let errors = Html5Parser::parse_document(&mut queue, &mut document, options)?;
            (TreeOutputGenerator::new(&document).generate(), errors)
        }
    };

    debug!("tree has {} lines, {} parse errors", output.len(), errors.len());

    for line in output {
        println!("{line}");
    }

    print_errors(&errors);

    Ok(())
}

fn print_errors(errors: &[ParseError]) {
    if errors.is_empty() {
        return;
    }

    println!();
    println!("{} parse error(s):", errors.len());
    for error in errors {
        println!("  ({}:{}) {}", error.location.line, error.location.column, error.message);
    }
}
