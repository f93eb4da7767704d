//! Connection and player warm-up for the first items of the feed.
//!
//! A warm-up never fails from the caller's point of view: every request or
//! player call is best-effort and failures end up in the debug log.

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, trace};

use crate::config::WarmupConfig;
use crate::player::{PlayerFactory, PlayerPool, SharedPlayer, same_player, teardown};

#[derive(Debug, Clone, Copy)]
pub struct WarmupOptions {
    /// Length of the ranged request
    pub bytes: u64,
    pub timeout: Duration,
}

impl From<&WarmupConfig> for WarmupOptions {
    fn from(config: &WarmupConfig) -> Self {
        Self {
            bytes: config.range_bytes,
            timeout: config.timeout(),
        }
    }
}

impl WarmupOptions {
    /// `bytes=0-<N-1>`, never asking for less than one byte.
    pub fn range_header(&self) -> String {
        format!("bytes=0-{}", self.bytes.max(1) - 1)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerWarmupOptions {
    pub play_window: Duration,
    /// Pool newly created handles instead of releasing them afterwards
    pub keep_in_pool: bool,
}

impl From<&WarmupConfig> for PlayerWarmupOptions {
    fn from(config: &WarmupConfig) -> Self {
        Self {
            play_window: config.play_window(),
            keep_in_pool: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmupSummary {
    pub attempted: usize,
    pub completed: usize,
}

pub struct ConnectionWarmup {
    client: Client,
    max_urls: usize,
}

impl ConnectionWarmup {
    pub fn new(client: Client, config: &WarmupConfig) -> Self {
        Self {
            client,
            max_urls: config.max_urls,
        }
    }

    /// Trimmed, de-duplicated, non-blank URLs, capped at the warm-up limit.
    pub fn select_urls<S: AsRef<str>>(&self, urls: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        urls.iter()
            .map(|url| url.as_ref().trim())
            .filter(|url| !url.is_empty() && seen.insert(*url))
            .take(self.max_urls)
            .map(str::to_string)
            .collect()
    }

    /// Issue a small ranged GET per URL so DNS, TCP and TLS are already set
    /// up by the time the player asks for the same host.
    pub async fn warm_up_video_urls<S: AsRef<str>>(
        &self,
        urls: &[S],
        options: WarmupOptions,
    ) -> WarmupSummary {
        let selected = self.select_urls(urls);
        if selected.is_empty() {
            return WarmupSummary::default();
        }

        let results = join_all(
            selected
                .iter()
                .map(|url| self.warm_up_connection(url, options)),
        )
        .await;

        let summary = WarmupSummary {
            attempted: selected.len(),
            completed: results.into_iter().filter(|ok| *ok).count(),
        };
        debug!(
            attempted = summary.attempted,
            completed = summary.completed,
            "Connection warm-up finished"
        );
        summary
    }

    async fn warm_up_connection(&self, url: &str, options: WarmupOptions) -> bool {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::RANGE, options.range_header())
            .timeout(options.timeout)
            .send()
            .await;

        match response {
            Ok(mut response) => {
                let status = response.status();
                // Read at most the requested range. A server that ignores
                // `Range` and streams the whole file is cut off there.
                let limit = options.bytes.max(1);
                let mut read = 0u64;
                while read < limit {
                    match response.chunk().await {
                        Ok(Some(chunk)) => read += chunk.len() as u64,
                        Ok(None) => break,
                        Err(e) => {
                            debug!(url = %url, error = %e, "Warm-up body read failed");
                            return false;
                        }
                    }
                }
                trace!(url = %url, status = %status, read, "Warmed connection");
                true
            }
            Err(e) => {
                debug!(
                    url = %url,
                    timeout = e.is_timeout(),
                    error = %e,
                    "Warm-up request failed"
                );
                false
            }
        }
    }

    /// Briefly play each URL muted on a real player so the first frames are
    /// decoded before the item scrolls into view.
    ///
    /// Pooled handles are reused and left in the pool. Newly created handles
    /// are pooled when `keep_in_pool` is set and released otherwise.
    pub async fn warm_up_players<S: AsRef<str>>(
        &self,
        urls: &[S],
        pool: &PlayerPool,
        factory: &dyn PlayerFactory,
        options: PlayerWarmupOptions,
    ) -> WarmupSummary {
        let selected = self.select_urls(urls);
        if selected.is_empty() {
            return WarmupSummary::default();
        }

        let results = join_all(
            selected
                .iter()
                .map(|url| warm_up_player(url, pool, factory, options)),
        )
        .await;

        let summary = WarmupSummary {
            attempted: selected.len(),
            completed: results.into_iter().filter(|ok| *ok).count(),
        };
        debug!(
            attempted = summary.attempted,
            completed = summary.completed,
            keep_in_pool = options.keep_in_pool,
            "Player warm-up finished"
        );
        summary
    }
}

async fn warm_up_player(
    url: &str,
    pool: &PlayerPool,
    factory: &dyn PlayerFactory,
    options: PlayerWarmupOptions,
) -> bool {
    let (handle, created) = match pool.get(url) {
        Some(existing) => (existing, false),
        None => match factory.create(url) {
            Ok(handle) => (handle, true),
            Err(e) => {
                debug!(url = %url, error = %e, "Warm-up player creation failed");
                return false;
            }
        },
    };

    if let Err(e) = handle.set_volume(0.0) {
        trace!(url = %url, error = %e, "Warm-up mute failed");
    }
    let played = match handle.play() {
        Ok(()) => {
            tokio::time::sleep(options.play_window).await;
            true
        }
        Err(e) => {
            debug!(url = %url, error = %e, "Warm-up play failed");
            false
        }
    };
    if let Err(e) = handle.pause() {
        trace!(url = %url, error = %e, "Warm-up pause failed");
    }

    if created {
        settle_created(url, handle, pool, options.keep_in_pool);
    }
    played
}

fn settle_created(url: &str, handle: SharedPlayer, pool: &PlayerPool, keep_in_pool: bool) {
    if !keep_in_pool {
        teardown(handle.as_ref());
        return;
    }
    if let Some(replaced) = pool.upsert(url, handle.clone())
        && !same_player(&replaced, &handle)
    {
        teardown(replaced.as_ref());
    }
}
