mod grammar;

use std::sync::Arc;

use criterion::{black_box, criterion_group, Criterion};
use grammar::{block_grammar, document};
use log::trace;
use scopeline::prelude::sl::{Buffer, Expr, Parser};

pub fn bench_parse(c: &mut Criterion) {
    let grammar = match block_grammar() {
        Ok(g) => Arc::new(g),
        Err(e) => panic!("bench grammar: {e}"),
    };
    let buf = Buffer::from_lines(document(50));
    c.bench_function("parse_blocks", |b| {
        b.iter(|| {
            let mut parser = Parser::new(Arc::clone(&grammar));
            parser.parse_buffer(black_box(&buf))
        })
    });
}

pub fn bench_find(c: &mut Criterion) {
    let word = match Expr::regex(r"[A-Za-z]+") {
        Ok(e) => e.one_or_more(),
        Err(e) => panic!("bench expr: {e}"),
    };
    let buf = Buffer::from_lines(document(50));
    c.bench_function("find_words", |b| {
        b.iter(|| word.find_iter(&mut buf.cursor()).count())
    });
}

criterion_group!(benches, bench_parse, bench_find);
// criterion_main!(benches);

fn main() {
    env_logger::init();
    trace!(target:"sl" ,"Logging enabled");
    benches();
    Criterion::default().configure_from_args().final_summary();
}
