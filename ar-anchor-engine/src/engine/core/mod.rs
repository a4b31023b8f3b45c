//! Core application setup and state management.
//!
//! Handles application lifecycle, window configuration, runtime settings
//! and the AR / 3D browsing view mode for both native and WASM targets.

/// Application setup and plugin configuration for the Bevy engine.
///
/// Creates the main app with the tracking pipeline, content loading and the
/// web bridge wired together.
pub mod app_setup;

/// View mode state machine and its transition system.
pub mod app_state;

/// Runtime configuration with compiled defaults.
pub mod settings;

/// Canvas configuration for the transparent overlay on the camera feed.
pub mod window_config;
