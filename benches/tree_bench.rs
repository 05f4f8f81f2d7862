#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xmlgrove::events::{EventBuffer, EventRecorder};
use xmlgrove::notify::ChangePhase;
use xmlgrove::{LoadOptions, NodeId, SaveOptions, Tree};

// ---------------------------------------------------------------------------
// Tree generators
// ---------------------------------------------------------------------------

/// Builds a catalog with `n` items, each with two attributes and a title.
fn make_catalog(tree: &mut Tree, n: usize) -> NodeId {
    let root = tree.new_element("catalog").unwrap();
    for i in 0..n {
        let item = tree.new_element("item").unwrap();
        tree.set_attribute_value(item, "id", Some(&i.to_string())).unwrap();
        tree.set_attribute_value(item, "kind", Some("book")).unwrap();
        tree.set_element_value(item, "title", Some("Value")).unwrap();
        tree.add(root, item).unwrap();
    }
    root
}

fn record(tree: &Tree, root: NodeId) -> EventRecorder {
    let mut recorder = EventRecorder::new();
    tree.write_to(root, &mut recorder, &SaveOptions::default()).unwrap();
    recorder
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_build(c: &mut Criterion) {
    c.bench_function("build_1000_unobserved", |b| {
        b.iter(|| {
            let mut tree = Tree::new();
            black_box(make_catalog(&mut tree, 1000));
        });
    });

    c.bench_function("build_1000_observed", |b| {
        b.iter(|| {
            let mut tree = Tree::new();
            let root = tree.new_element("catalog").unwrap();
            tree.observe(root, ChangePhase::Changed, |_, _| Ok(()));
            for _ in 0..1000 {
                let item = tree.new_element("item").unwrap();
                tree.add(root, item).unwrap();
            }
            black_box(root);
        });
    });
}

fn bench_remove(c: &mut Criterion) {
    c.bench_function("remove_nodes_1000", |b| {
        b.iter_batched(
            || {
                let mut tree = Tree::new();
                let root = make_catalog(&mut tree, 1000);
                (tree, root)
            },
            |(mut tree, root)| {
                tree.remove_nodes(root).unwrap();
                black_box(tree);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_compare(c: &mut Criterion) {
    let mut tree = Tree::new();
    let a = make_catalog(&mut tree, 1000);
    let b = make_catalog(&mut tree, 1000);

    c.bench_function("deep_equals_1000", |bench| {
        bench.iter(|| black_box(tree.deep_equals(a, b)));
    });
    c.bench_function("deep_hash_1000", |bench| {
        bench.iter(|| black_box(tree.deep_hash(a)));
    });
}

fn bench_events(c: &mut Criterion) {
    let mut tree = Tree::new();
    let root = make_catalog(&mut tree, 1000);
    let events = record(&tree, root).into_events();

    c.bench_function("save_events_1000", |b| {
        b.iter(|| black_box(record(&tree, root)));
    });
    c.bench_function("load_events_1000", |b| {
        b.iter(|| {
            let mut target = Tree::new();
            let mut source = EventBuffer::new(events.clone());
            black_box(target.load_element(&mut source, &LoadOptions::default()).unwrap());
        });
    });
    c.bench_function("to_xml_string_1000", |b| {
        b.iter(|| black_box(tree.to_xml_string(root, &SaveOptions::default()).unwrap()));
    });
}

criterion_group!(benches, bench_build, bench_remove, bench_compare, bench_events);
criterion_main!(benches);
