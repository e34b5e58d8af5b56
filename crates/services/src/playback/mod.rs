//! Live watch-position tracking for a single player.

mod tracker;

pub use tracker::{
    CompletionCallback, DEFAULT_SAVE_INTERVAL, PlaybackSnapshot, PlaybackTracker, TrackerConfig,
};
