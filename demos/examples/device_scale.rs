// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device scale.
//!
//! Show a canvas authored at 1280×720 on a 2560×1440 display and let a logo
//! follow the device scale, then list device scale warnings.
//!
//! Run:
//! - `cargo run -p understory_demos --example device_scale`

use kurbo::Size;
use understory_element_tree::{Anchors, CanvasConfig, DeviceScaleMode, Notification, Tree, TreeResult};

fn main() -> TreeResult<()> {
    tracing_subscriber::fmt().init();

    let mut tree = Tree::new();
    let canvas = tree.create_canvas("hud", CanvasConfig::default());
    let logo = tree.create_child(canvas, "logo")?;
    tree.set_anchors(logo, Anchors::TOP_LEFT, true, false);
    tree.set_device_scale_mode(logo, DeviceScaleMode::UniformScaleToFit);

    let badge = tree.create_child(logo, "badge")?;
    tree.set_device_scale_mode(badge, DeviceScaleMode::ScaleXOnly);

    let bar = tree.create_child(canvas, "bar")?;
    tree.set_anchors(bar, Anchors::new(0.0, 0.0, 1.0, 0.0), true, false);
    tree.set_device_scale_mode(bar, DeviceScaleMode::NonUniformScale);
    tree.commit(canvas);
    tree.drain_notifications();

    tree.set_target_canvas_size(canvas, Size::new(2560.0, 1440.0), true)?;
    for note in tree.drain_notifications() {
        if let Notification::CanvasSizeOrScaleChanged { .. } = note {
            println!("canvas size: {:?}", tree.canvas_size(canvas));
            println!("device scale: {:?}", tree.device_scale(canvas));
        }
    }
    tree.commit(canvas);

    let points = tree.viewport_space_points(logo);
    println!("logo corners on screen: {:?}", points.corners);

    for node in [logo, badge, bar] {
        println!(
            "{:>5}: {:?}",
            tree.name(node).unwrap_or("?"),
            tree.device_scale_warning(node)
        );
    }
    Ok(())
}
