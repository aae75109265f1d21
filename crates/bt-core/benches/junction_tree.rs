//! Criterion benchmarks for junction-tree compilation and queries.
//!
//! Networks are synthesized from generated rows so the benchmarks are
//! deterministic.

use bt_core::inference::JunctionTree;
use bt_core::{
    build_cpts, build_structure, fit, BowtieRow, EngineConfig, Evidence, FittedNetwork, NodeId,
    NodeType,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// `width` parallel chains into one central problem.
fn network(width: usize) -> FittedNetwork {
    let rows: Vec<BowtieRow> = (0..width)
        .map(|i| {
            BowtieRow::chain(
                &format!("Activity {i}"),
                &format!("Pressure {}", i / 2),
                "Water Pollution",
                &format!("Consequence {}", i % 3),
            )
            .with_control(&format!("Control {i}"))
            .with_mitigation(&format!("Mitigation {}", i % 2))
        })
        .collect();
    let s = build_structure(&rows, None);
    let cpts = build_cpts(&s, &rows, false, &EngineConfig::default()).expect("default cpts");
    fit(&s, cpts).expect("fit")
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("junction_tree_compile");
    for width in [2usize, 4, 8] {
        let net = network(width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &net, |b, net| {
            b.iter(|| JunctionTree::compile(black_box(net), 1 << 22).expect("compile"))
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("junction_tree_query");
    for width in [2usize, 4, 8] {
        let net = network(width);
        let tree = JunctionTree::compile(&net, 1 << 22).expect("compile");
        let mut evidence = Evidence::new();
        evidence.insert(NodeId::derive(NodeType::Control, "Control 0"), "Failed".into());
        group.bench_with_input(BenchmarkId::from_parameter(width), &evidence, |b, ev| {
            b.iter(|| tree.query(black_box(ev), None).expect("query"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_query);
criterion_main!(benches);
