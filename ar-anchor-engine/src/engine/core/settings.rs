use bevy::prelude::*;
use constants::content::DEFAULT_API_BASE;
use constants::session::ERROR_RELOAD_COUNTDOWN_SECS;
use serde::{Deserialize, Serialize};

use crate::engine::tracking::tracker::TrackerOptions;

/// Runtime configuration. Every field falls back to the compiled defaults,
/// so a host page only needs to send what it overrides.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArSettings {
    #[serde(flatten)]
    pub tracker: TrackerOptions,
    /// Fixed target descriptor. When unset the active experience decides.
    pub target_url: Option<String>,
    pub api_base: String,
    pub reload_countdown_secs: f32,
}

impl Default for ArSettings {
    fn default() -> Self {
        Self {
            tracker: TrackerOptions::default(),
            target_url: None,
            api_base: DEFAULT_API_BASE.to_string(),
            reload_countdown_secs: ERROR_RELOAD_COUNTDOWN_SECS,
        }
    }
}
