//! Remote content configuration.
//!
//! An experience is fetched as a JSON asset named by the URL fragment,
//! resolved into anchored scenes, and replaced by the bundled demo when it
//! cannot be fetched or is misconfigured.

pub mod demo;
pub mod experience;
pub mod loader;
pub mod resolver;
pub mod transform;

pub use loader::{ActiveExperience, ContentConfigError, ContentPlugin, ExperienceReady};
