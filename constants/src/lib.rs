//! Compile-time configuration shared by the AR engine crates.

pub mod camera;
pub mod content;
pub mod session;
pub mod tracking;
