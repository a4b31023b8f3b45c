//! JSON-RPC 2.0 communication layer between the canvas and its host page.
//!
//! The page owns the camera stream and the image-target tracking engine; the
//! engine owns the scene. Everything crosses the iframe boundary as
//! postMessage strings.
//!
//! ## Message Flow
//!
//! ```text
//! Host page (camera + tracker)  <──postMessage──>  Bevy (iframe)
//!        │                                              │
//!        │ <──────────── tracker_command (notification) ┤
//!        ├─ tracker_targets_loaded / tracker_warmup_done >
//!        ├─ tracker_update (every processed frame) ───> │
//!        │                                              ├─ reconcile anchors
//!        │ <──────────── target_found / target_lost ────┤
//! ```
//!
//! ## Incoming Methods
//!
//! ### Camera
//! - `camera_ready`: stream attached, params `{elementId, width, height}`
//! - `camera_failed`: permission denied or no device, params `{reason?}`
//! - `switch_camera`: flip between front and rear camera
//!
//! ### Tracker replies
//! - `tracker_update`: raw `onUpdate` payload
//! - `tracker_targets_loaded`: `{generation?, dimensions}` or `{generation?, error}`
//! - `tracker_warmup_done`: `{generation?, projectionMatrix?, error?}`
//!
//! ### View
//! - `set_view_mode`: `{mode: "ar" | "3d"}`
//! - `get_tracking_state`: phase, view mode and per-target visibility
//!
//! ## Outgoing Notifications
//! - `tracker_command`, `target_found`, `target_lost`, `session_phase`
//! - `fatal_error`, `content_error`, `reload`
//!
//! ## Error Handling
//!
//! Standard JSON-RPC 2.0 error codes:
//! - `-32600`: Invalid request
//! - `-32601`: Method not found
//! - `-32602`: Invalid params

/// Tracker implementation that drives the page-side engine through
/// `tracker_command` notifications.
pub mod tracker_bridge;

/// JSON-RPC 2.0 bidirectional communication system and WASM message listener.
pub mod web_rpc;
