// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Save and load.
//!
//! Save a canvas to JSON, load it into a fresh tree and compare.
//!
//! Run:
//! - `cargo run -p understory_demos --example save_load`

use understory_element_tree::{CanvasConfig, SavedCanvas, Tree};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let mut tree = Tree::new();
    let canvas = tree.create_canvas("settings", CanvasConfig::default());
    let list = tree.create_child(canvas, "list")?;
    for name in ["audio", "video", "controls"] {
        tree.create_child(list, name)?;
    }
    tree.set_rotation(list, 5.0);

    let json = serde_json::to_string_pretty(&tree.save_canvas(canvas)?)?;
    println!("{json}");

    let saved: SavedCanvas = serde_json::from_str(&json)?;
    let mut copy = Tree::new();
    let loaded = copy.load_canvas(saved)?;

    for original in tree.descendants(canvas) {
        let Some(entity) = tree.entity(original) else {
            continue;
        };
        let Some(twin) = copy.node_of(entity) else {
            continue;
        };
        assert_eq!(tree.resolve_rect(original), copy.resolve_rect(twin));
        let rect = copy.resolve_rect(twin);
        println!("{:>8}: {:?}", copy.name(twin).unwrap_or("?"), rect);
    }
    println!("loaded {} elements", copy.descendants(loaded).len() + 1);
    Ok(())
}
