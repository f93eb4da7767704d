//! Warm the first feed page ahead of navigation.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::{FeedConfig, WarmupConfig};
use crate::error::Result;
use crate::feed::cache::{FeedCache, FeedItems, WarmOptions};
use crate::feed::model::{FeedKey, PageQuery};
use crate::player::{PlayerFactory, PlayerPool};
use crate::warmup::{ConnectionWarmup, PlayerWarmupOptions, WarmupOptions, WarmupSummary};

/// What the background warm-up of a preload did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimeSummary {
    pub connections: WarmupSummary,
    /// Present when players were warmed
    pub players: Option<WarmupSummary>,
    /// Pooled players released because they are not among the primed items
    pub released: usize,
}

pub struct PreloadOutcome {
    pub items: FeedItems,
    /// URLs of the leading items handed to warm-up
    pub primed_urls: Vec<String>,
    /// Background warm-up, absent when there was nothing to prime
    pub warmup: Option<JoinHandle<PrimeSummary>>,
}

pub struct FeedPreloader {
    cache: Arc<FeedCache>,
    warmup: Arc<ConnectionWarmup>,
    pool: Arc<PlayerPool>,
    factory: Option<Arc<dyn PlayerFactory>>,
    feed: FeedConfig,
    warmup_config: WarmupConfig,
}

impl FeedPreloader {
    pub fn new(
        cache: Arc<FeedCache>,
        warmup: Arc<ConnectionWarmup>,
        pool: Arc<PlayerPool>,
        feed: FeedConfig,
        warmup_config: WarmupConfig,
    ) -> Self {
        Self {
            cache,
            warmup,
            pool,
            factory: None,
            feed,
            warmup_config,
        }
    }

    /// Also warm real players for the primed items.
    pub fn with_player_factory(mut self, factory: Arc<dyn PlayerFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn key(&self) -> FeedKey {
        PageQuery::first(self.feed.per_page)
    }

    /// Last-known first page, without waiting.
    pub fn cached_items(&self) -> Option<FeedItems> {
        self.cache.peek(self.key())
    }

    pub fn is_stale(&self) -> bool {
        self.cache.is_stale(self.key(), self.feed.max_age())
    }

    /// Load the first page and start warming its leading items.
    ///
    /// Returns as soon as the page is available; warm-up continues on a
    /// spawned task whose handle is part of the outcome.
    pub async fn preload(&self, force: bool) -> Result<PreloadOutcome> {
        let key = self.key();
        let items = self.cache.warm(key, WarmOptions { force }).await?;

        let primed_urls: Vec<String> = items
            .iter()
            .take(self.feed.prime_count)
            .map(|item| item.video_url.clone())
            .collect();

        info!(
            key = %key,
            items = items.len(),
            primed = primed_urls.len(),
            force,
            "Feed preloaded"
        );

        let warmup = (!primed_urls.is_empty()).then(|| self.spawn_warmup(primed_urls.clone()));

        Ok(PreloadOutcome {
            items,
            primed_urls,
            warmup,
        })
    }

    fn spawn_warmup(&self, urls: Vec<String>) -> JoinHandle<PrimeSummary> {
        let warmup = self.warmup.clone();
        let pool = self.pool.clone();
        let factory = self.factory.clone();
        let connection_options = WarmupOptions::from(&self.warmup_config);
        let player_options = PlayerWarmupOptions {
            keep_in_pool: true,
            ..PlayerWarmupOptions::from(&self.warmup_config)
        };

        tokio::spawn(async move {
            let connections = warmup.warm_up_video_urls(&urls, connection_options);
            let players = async {
                let factory = factory?;
                let summary = warmup
                    .warm_up_players(&urls, &pool, factory.as_ref(), player_options)
                    .await;
                let released = pool.release_except(&urls);
                Some((summary, released))
            };

            let (connections, players) = tokio::join!(connections, players);
            let summary = PrimeSummary {
                connections,
                players: players.map(|(summary, _)| summary),
                released: players.map(|(_, released)| released).unwrap_or(0),
            };
            debug!(?summary, "Preload warm-up finished");
            summary
        })
    }
}
