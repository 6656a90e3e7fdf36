use criterion::{Criterion, black_box, criterion_group, criterion_main};
use prodgen::{Context, Grammar, Registry};

const SQL: &str = include_str!("../grammars/select.prod");

fn bench_parse(c: &mut Criterion) {
    let registry = Registry::with_defaults();
    c.bench_function("parse select grammar", |b| {
        b.iter(|| Grammar::parse(black_box(SQL), &registry).unwrap())
    });
}

fn bench_generate(c: &mut Criterion) {
    let grammar: Grammar = SQL.parse().unwrap();
    let mut ctx = Context::seeded(1);
    c.bench_function("generate select", |b| {
        b.iter(|| grammar.generate(black_box(&mut ctx)).unwrap())
    });
}

criterion_group!(benches, bench_parse, bench_generate);
criterion_main!(benches);
