// Subtitle handling for HLS video feeds: track discovery in master playlists,
// segment listing in subtitle playlists and WebVTT cue lookup.
pub mod master;
pub mod media;
pub mod uri;
pub mod vtt;

// Export common types for ease of use
pub use master::{SubtitleTrack, find_track, parse_attribute_list, parse_hls_subtitle_tracks};
pub use media::parse_segment_uris;
pub use uri::resolve_uri;
pub use vtt::{VttCue, find_active_cue, parse_timestamp, parse_vtt};
