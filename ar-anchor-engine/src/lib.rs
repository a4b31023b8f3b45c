//! Image-target AR engine.
//!
//! Anchors content to printed targets recognised in the camera feed, keeps
//! each anchor's visibility in step with the tracker, and lets the user
//! freeze the scene for 3D browsing. The camera and the tracking engine
//! live in the host page and are reached over [`rpc`].

pub mod content;
pub mod engine;
pub mod rpc;
