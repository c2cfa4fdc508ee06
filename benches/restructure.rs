#![allow(unused)]
extern crate regionize;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use regionize::{restructure, Scfg};
use std::hint::black_box;

/// Straight chain of `n` blocks.
fn linear_chain(n: usize) -> Scfg {
    let mut builder = Scfg::builder();
    for i in 0..n {
        builder.block(format!("b{i}"));
    }
    for i in 0..n - 1 {
        builder.unconditional(format!("b{i}"), format!("b{}", i + 1));
    }
    builder.entry("b0").exit(format!("b{}", n - 1));
    builder.build().expect("valid chain")
}

/// `n` diamonds in sequence: each merge is the next head.
fn diamond_ladder(n: usize) -> Scfg {
    let mut builder = Scfg::builder();
    for i in 0..=n {
        builder.block(format!("h{i}"));
    }
    for i in 0..n {
        builder.block(format!("l{i}")).block(format!("r{i}"));
        builder.case(format!("h{i}"), format!("l{i}"), 0);
        builder.case(format!("h{i}"), format!("r{i}"), 1);
        builder.unconditional(format!("l{i}"), format!("h{}", i + 1));
        builder.unconditional(format!("r{i}"), format!("h{}", i + 1));
    }
    builder.entry("h0").exit(format!("h{n}"));
    builder.build().expect("valid ladder")
}

/// `depth` while-loops nested inside each other.
fn nested_loops(depth: usize) -> Scfg {
    let mut builder = Scfg::builder();
    builder.block("entry").block("exit");
    for i in 0..depth {
        builder.block(format!("h{i}"));
    }
    builder.unconditional("entry", "h0");
    for i in 0..depth {
        // exit edge: innermost loop returns to the enclosing header,
        // the outermost leaves the function
        let out = if i == 0 {
            "exit".to_string()
        } else {
            format!("h{}", i - 1)
        };
        builder.case(format!("h{i}"), out, 0);
        // body edge: descend, or back-edge to self at the innermost level
        let inner = if i + 1 < depth {
            format!("h{}", i + 1)
        } else {
            format!("h{i}")
        };
        builder.case(format!("h{i}"), inner, 1);
    }
    builder.entry("entry").exit("exit");
    builder.build().expect("valid nest")
}

fn bench_linear_chain(c: &mut Criterion) {
    let scfg = linear_chain(1_000);
    let mut group = c.benchmark_group("linear_chain");
    group.throughput(Throughput::Elements(scfg.block_count() as u64));
    group.bench_function("restructure_1000", |b| {
        b.iter(|| {
            let tree = restructure(black_box(&scfg)).expect("restructures");
            black_box(tree)
        });
    });
    group.finish();
}

fn bench_diamond_ladder(c: &mut Criterion) {
    let scfg = diamond_ladder(200);
    let mut group = c.benchmark_group("diamond_ladder");
    group.throughput(Throughput::Elements(scfg.block_count() as u64));
    group.bench_function("restructure_200", |b| {
        b.iter(|| {
            let tree = restructure(black_box(&scfg)).expect("restructures");
            black_box(tree)
        });
    });
    group.finish();
}

fn bench_nested_loops(c: &mut Criterion) {
    let scfg = nested_loops(50);
    let mut group = c.benchmark_group("nested_loops");
    group.throughput(Throughput::Elements(scfg.block_count() as u64));
    group.bench_function("restructure_depth_50", |b| {
        b.iter(|| {
            let tree = restructure(black_box(&scfg)).expect("restructures");
            black_box(tree)
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_linear_chain,
    bench_diamond_ladder,
    bench_nested_loops
);
criterion_main!(benches);
