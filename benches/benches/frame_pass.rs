// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Size, Vec2};
use understory_element_tree::{Anchors, CanvasConfig, HitMode, NodeId, Offsets, Tree};

fn canvas(tree: &mut Tree) -> NodeId {
    let size = Size::new(1920.0, 1080.0);
    tree.create_canvas(
        "bench",
        CanvasConfig {
            authored_size: size,
            target_size: size,
            ..CanvasConfig::default()
        },
    )
}

/// An `n`×`n` grid of 10×10 cells under one stretched panel.
fn grid(n: usize) -> (Tree, NodeId, Vec<NodeId>) {
    let mut tree = Tree::new();
    let root = canvas(&mut tree);
    let panel = tree.create_child(root, "panel").unwrap();
    tree.set_anchors(panel, Anchors::STRETCH, false, false);
    tree.set_offsets(panel, Offsets::ZERO);
    let mut cells = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let cell = tree.create_child(panel, format!("cell_{x}_{y}")).unwrap();
            let (x0, y0) = (x as f64 * 10.0, y as f64 * 10.0);
            tree.set_anchors(cell, Anchors::TOP_LEFT, false, false);
            tree.set_offsets(cell, Offsets::new(x0, y0, x0 + 10.0, y0 + 10.0));
            cells.push(cell);
        }
    }
    let _ = tree.commit(root);
    tree.drain_notifications();
    (tree, root, cells)
}

/// A single chain of `depth` nested elements.
fn chain(depth: usize) -> (Tree, NodeId, NodeId) {
    let mut tree = Tree::new();
    let root = canvas(&mut tree);
    let mut leaf = root;
    for i in 0..depth {
        leaf = tree.create_child(leaf, format!("link_{i}")).unwrap();
        tree.set_rotation(leaf, 1.0);
    }
    let _ = tree.commit(root);
    tree.drain_notifications();
    (tree, root, leaf)
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");
    for &n in &[16usize, 32, 64] {
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_function(format!("move_all_n{n}"), |b| {
            b.iter_batched(
                || grid(n),
                |(mut tree, root, cells)| {
                    for &cell in &cells {
                        tree.move_local_position_by(cell, Vec2::new(1.0, 0.0));
                    }
                    black_box(tree.commit(root).changes.len());
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("rotate_panel_n{n}"), |b| {
            b.iter_batched(
                || grid(n),
                |(mut tree, root, _)| {
                    let panel = tree.children(root)[0];
                    tree.set_rotation(panel, 15.0);
                    black_box(tree.commit(root).resolved);
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_lazy_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("lazy_resolve");
    for &depth in &[8usize, 32, 128] {
        group.bench_function(format!("chain_depth{depth}"), |b| {
            b.iter_batched(
                || {
                    let (mut tree, root, leaf) = chain(depth);
                    let first = tree.children(root)[0];
                    tree.move_local_position_by(first, Vec2::new(1.0, 1.0));
                    (tree, leaf)
                },
                |(mut tree, leaf)| {
                    black_box(tree.resolve_viewport_transform(leaf));
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    for &n in &[16usize, 64] {
        let (mut tree, root, _) = grid(n);
        let far = n as f64 * 10.0 - 5.0;
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_function(format!("frontmost_n{n}"), |b| {
            b.iter(|| {
                black_box(tree.find_frontmost_child_containing_point(
                    root,
                    Point::new(far, far),
                    HitMode::Game,
                ))
            });
        });

        group.bench_function(format!("intersecting_n{n}"), |b| {
            b.iter(|| {
                black_box(
                    tree.find_children_intersecting_rect(
                        root,
                        Point::new(0.0, 0.0),
                        Point::new(100.0, 100.0),
                        HitMode::Game,
                    )
                    .len(),
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_commit, bench_lazy_resolve, bench_queries);
criterion_main!(benches);
