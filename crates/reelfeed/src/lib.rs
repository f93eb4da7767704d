//! Playback and prefetch engine for short-form property video feeds.
//!
//! The engine is a set of independently constructed services:
//!
//! - [`FeedCache`] and [`FeedPreloader`] load and warm the first feed page
//! - [`PlayerPool`] and [`PlaybackRegistry`] own native player handles
//! - [`ConnectionWarmup`] opens connections and decodes first frames early
//! - [`SubtitleResolver`] turns an HLS master playlist into WebVTT cues
//! - [`EngagementStore`] and [`PropertyLikeStore`] keep like state
//!
//! Collaborators that touch the outside world (feed source, engagement
//! backend, key/value storage, player factory) are traits, with reqwest and
//! file-backed implementations provided.

pub mod config;
pub mod engagement;
pub mod error;
pub mod feed;
pub mod player;
pub mod subtitle;
pub mod warmup;

#[cfg(test)]
mod test_support;

pub use config::ReelConfig;
pub use engagement::{
    EngagementBackend, EngagementStore, FileStore, HttpEngagementBackend, KeyValueStore, MemoryStore,
    PropertyLikeStore, ToggleOutcome,
};
pub use error::{PlayerError, ReelError, Result};
pub use feed::{FeedCache, FeedItem, FeedPreloader, FeedSource, HttpFeedSource, PageQuery, PreloadOutcome};
pub use player::{PlaybackOwner, PlaybackRegistry, PlayerFactory, PlayerHandle, PlayerPool, SharedPlayer};
pub use subtitle::SubtitleResolver;
pub use warmup::{ConnectionWarmup, PlayerWarmupOptions, WarmupOptions, WarmupSummary};

// Subtitle parsing lives in its own crate.
pub use reel_subs::{SubtitleTrack, VttCue, find_active_cue, parse_hls_subtitle_tracks, parse_vtt};
