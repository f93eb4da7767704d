//! Network side of subtitle loading: fetch the master playlist, pick the
//! track for a language, list its WebVTT segments and parse them into cues.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use moka::future::Cache;
use reel_subs::{SubtitleTrack, VttCue, find_track, parse_hls_subtitle_tracks, parse_segment_uris, parse_vtt};
use reqwest::Client;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::SubtitleConfig;
use crate::error::{ReelError, Result};

/// Segments fetched concurrently for one track
const SEGMENT_CONCURRENCY: usize = 4;

pub struct SubtitleResolver {
    client: Client,
    config: SubtitleConfig,
    playlists: Cache<String, Arc<str>>,
}

impl SubtitleResolver {
    pub fn new(client: Client, config: SubtitleConfig) -> Self {
        let playlists = Cache::builder()
            .max_capacity(config.playlist_cache_capacity)
            .time_to_live(config.playlist_cache_ttl())
            .build();
        Self {
            client,
            config,
            playlists,
        }
    }

    /// All subtitle tracks declared by the master playlist at `master_url`.
    pub async fn fetch_tracks(&self, master_url: &str) -> Result<Vec<SubtitleTrack>> {
        let manifest = self.fetch_playlist(master_url).await?;
        Ok(parse_hls_subtitle_tracks(&manifest, master_url))
    }

    /// Absolute URI of the subtitle playlist for `language`, if the master
    /// declares one. Language matching is case-insensitive and exact.
    pub async fn resolve_subtitle_track(
        &self,
        master_url: &str,
        language: &str,
    ) -> Result<Option<String>> {
        let tracks = self.fetch_tracks(master_url).await?;
        Ok(find_track(&tracks, language).map(|track| track.uri.clone()))
    }

    /// Absolute URIs of every segment listed in a subtitle playlist.
    pub async fn fetch_subtitle_segment_uris(&self, playlist_url: &str) -> Result<Vec<String>> {
        let playlist = self.fetch_playlist(playlist_url).await?;
        Ok(parse_segment_uris(&playlist, playlist_url))
    }

    /// Cues for `language`, or an empty list if anything along the way fails.
    pub async fn load_cues(&self, master_url: &str, language: &str) -> Vec<VttCue> {
        match self.try_load_cues(master_url, language).await {
            Ok(cues) => cues,
            Err(e) => {
                warn!(
                    master_url = %master_url,
                    language = %language,
                    error = %e,
                    "Subtitle load failed, continuing without subtitles"
                );
                Vec::new()
            }
        }
    }

    pub async fn try_load_cues(&self, master_url: &str, language: &str) -> Result<Vec<VttCue>> {
        let Some(track_uri) = self.resolve_subtitle_track(master_url, language).await? else {
            debug!(master_url = %master_url, language = %language, "No subtitle track for language");
            return Ok(Vec::new());
        };

        let mut segments = if is_vtt_uri(&track_uri) {
            vec![track_uri]
        } else {
            self.fetch_subtitle_segment_uris(&track_uri).await?
        };

        if segments.len() > self.config.max_segments {
            debug!(
                total = segments.len(),
                limit = self.config.max_segments,
                "Truncating subtitle segment list"
            );
            segments.truncate(self.config.max_segments);
        }

        let bodies: Vec<String> = stream::iter(segments.iter())
            .map(|uri| self.fetch_text(uri))
            .buffered(SEGMENT_CONCURRENCY)
            .try_collect()
            .await?;

        let cues = parse_vtt(&bodies.join("\n\n"));
        debug!(
            language = %language,
            segments = segments.len(),
            cues = cues.len(),
            "Loaded subtitle cues"
        );
        Ok(cues)
    }

    /// Drop every cached playlist body.
    pub fn invalidate(&self) {
        self.playlists.invalidate_all();
    }

    async fn fetch_playlist(&self, url: &str) -> Result<Arc<str>> {
        if let Some(body) = self.playlists.get(url).await {
            trace!(url = %url, "Playlist cache hit");
            return Ok(body);
        }

        let body: Arc<str> = self.fetch_text(url).await?.into();
        self.playlists.insert(url.to_string(), body.clone()).await;
        Ok(body)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url).map_err(|e| ReelError::invalid_url(url, e.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReelError::http_status(response.status(), url, "subtitle fetch"));
        }
        Ok(response.text().await?)
    }
}

/// Whether the URI points straight at a WebVTT file rather than a playlist.
fn is_vtt_uri(uri: &str) -> bool {
    let path = match Url::parse(uri) {
        Ok(url) => url.path().to_string(),
        Err(_) => uri.split(['?', '#']).next().unwrap_or(uri).to_string(),
    };
    path.to_ascii_lowercase().ends_with(".vtt")
}
