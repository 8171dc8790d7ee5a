use criterion::{criterion_group, criterion_main, Criterion};
use sanehtml_html5::build_document;
use sanehtml_html5::testing::{doctype, end, start, text};
use sanehtml_html5::tokenizer::token::Token;

fn nested_divs(depth: usize) -> Vec<Token> {
    let mut tokens = vec![doctype("html")];
    tokens.extend((0..depth).map(|_| start("div")));
    tokens.push(text("deep"));
    tokens
}

fn repeated_formatting(count: usize) -> Vec<Token> {
    let mut tokens = vec![doctype("html"), start("p")];
    for _ in 0..count {
        tokens.push(start("b"));
        tokens.push(start("i"));
        tokens.push(text("x"));
        tokens.push(end("p"));
        tokens.push(start("p"));
    }
    tokens
}

fn table_soup(rows: usize) -> Vec<Token> {
    let mut tokens = vec![doctype("html"), start("table")];
    for _ in 0..rows {
        tokens.push(start("tr"));
        tokens.push(start("td"));
        tokens.push(text("cell"));
        tokens.push(start("div"));
        tokens.push(end("table"));
    }
    tokens
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Tree construction");
    group.significance_level(0.1).sample_size(50);

    // Token streams are built up front, only the tree building is measured
    let deep = nested_divs(10_000);
    let formatting = repeated_formatting(2_000);
    let tables = table_soup(2_000);

    group.bench_function("nested divs", |b| {
        b.iter(|| build_document(deep.clone(), None));
    });
    group.bench_function("repeated formatting", |b| {
        b.iter(|| build_document(formatting.clone(), None));
    });
    group.bench_function("table soup", |b| {
        b.iter(|| build_document(tables.clone(), None));
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
