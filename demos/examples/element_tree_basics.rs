// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element tree basics.
//!
//! Build a canvas with a panel and two buttons, move and rotate things,
//! commit each frame and hit-test.
//!
//! Run:
//! - `cargo run -p understory_demos --example element_tree_basics`

use kurbo::{Point, Size, Vec2};
use understory_element_tree::{Anchors, CanvasConfig, HitMode, Offsets, Tree, TreeResult};

fn main() -> TreeResult<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let mut tree = Tree::new();
    let size = Size::new(800.0, 600.0);
    let canvas = tree.create_canvas(
        "menu",
        CanvasConfig {
            authored_size: size,
            target_size: size,
            ..CanvasConfig::default()
        },
    );

    // A panel stretched over the bottom third with a 10px margin.
    let panel = tree.create_child(canvas, "panel")?;
    tree.set_anchors(panel, Anchors::new(0.0, 2.0 / 3.0, 1.0, 1.0), false, false);
    tree.set_offsets(panel, Offsets::new(10.0, 10.0, -10.0, -10.0));

    // Two fixed-size buttons centered in the panel.
    let ok = tree.create_child(panel, "ok")?;
    let cancel = tree.create_child(panel, "cancel")?;
    tree.set_local_position(ok, Vec2::new(-60.0, 0.0));
    tree.set_local_position(cancel, Vec2::new(60.0, 0.0));

    let frame = tree.commit(canvas);
    for change in &frame.changes {
        println!(
            "{:>8}: {:?} -> {:?}",
            tree.name(change.node).unwrap_or("?"),
            change.old,
            change.new
        );
    }

    // Next frame: tilt the panel; only transforms change, so no rect is reported.
    tree.set_rotation(panel, 10.0);
    let frame = tree.commit(canvas);
    println!("after rotation: {} rect changes, {} resolved", frame.changes.len(), frame.resolved);

    let center = tree.viewport_position(cancel);
    let hit = tree.find_frontmost_child_containing_point(canvas, center, HitMode::Game);
    println!("hit at {center:?}: {:?}", hit.and_then(|h| tree.name(h)));
    assert_eq!(hit, Some(cancel), "the cancel button's pivot should hit the button");

    let corner = Point::new(0.0, 0.0);
    assert_eq!(
        tree.find_frontmost_child_containing_point(canvas, corner, HitMode::Game),
        None,
        "nothing covers the top-left corner"
    );
    Ok(())
}
