//! Image-target tracking: the session that owns the external tracker, the
//! channel its callbacks write through, and the per-target pose store.
//!
//! Data flows one way. The tracker pushes `updateMatrix` results into
//! [`channel::TrackingChannel`], [`channel::apply_tracker_updates`] folds them
//! into [`anchor_state::AnchorStateStore`] once per frame, and anchors read
//! a snapshot of that store when they reconcile.

use bevy::prelude::*;

pub mod anchor_state;
pub mod channel;
pub mod driver;
pub mod matrix;
pub mod session;
pub mod tracker;

#[cfg(test)]
pub mod testing;

/// Per-frame ordering of the tracking pipeline.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackingSystems {
    /// Session requests, camera events and start polling.
    Session,
    /// Tracker results into the store.
    Ingest,
    /// Anchors against the latest snapshot.
    Reconcile,
    /// Outbound notifications about what changed.
    Notify,
}
