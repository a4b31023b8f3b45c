pub mod anchors;
pub mod core;
pub mod systems;
pub mod tracking;
