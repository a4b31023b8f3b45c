use bevy::prelude::*;
use bevy::window::{CompositeAlphaMode, PresentMode};

/// The canvas is layered over the page's `<video>` element, so it must be
/// transparent and track its parent's size.
pub fn create_window_config() -> Window {
    Window {
        title: "AR Anchor Engine".to_string(),
        canvas: Some("#bevy-canvas".to_string()),
        fit_canvas_to_parent: true,
        prevent_default_event_handling: false,
        transparent: true,
        composite_alpha_mode: CompositeAlphaMode::PreMultiplied,
        present_mode: PresentMode::AutoVsync,
        ..default()
    }
}
