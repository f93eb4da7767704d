use std::sync::Arc;
use std::time::Duration;

use reelfeed_engine::{
    ConnectionWarmup, EngagementStore, FeedCache, FeedPreloader, FileStore, HttpEngagementBackend,
    HttpFeedSource, KeyValueStore, MemoryStore, PlayerPool, PropertyLikeStore, ReelConfig,
    SubtitleResolver, WarmupOptions, find_active_cue,
};
use reqwest::Client;
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::error::{AppError, Result};

pub struct CommandExecutor {
    config: ReelConfig,
    client: Client,
}

impl CommandExecutor {
    pub fn new(config: ReelConfig) -> Result<Self> {
        let client = config.http.build_client()?;
        Ok(Self { config, client })
    }

    fn storage(&self) -> Arc<dyn KeyValueStore> {
        match &self.config.storage_dir {
            Some(dir) => Arc::new(FileStore::new(dir)),
            None => Arc::new(MemoryStore::new()),
        }
    }

    fn backend(&self) -> Arc<HttpEngagementBackend> {
        Arc::new(HttpEngagementBackend::new(
            self.client.clone(),
            &self.config.http.api_base,
            self.config.http.auth_token.clone(),
        ))
    }

    pub async fn feed(&self, force: bool, per_page: Option<u32>, output: OutputFormat) -> Result<()> {
        let mut feed_config = self.config.feed.clone();
        if let Some(per_page) = per_page {
            feed_config.per_page = per_page;
        }

        let source = Arc::new(HttpFeedSource::new(self.client.clone(), &self.config.http.api_base));
        let preloader = FeedPreloader::new(
            Arc::new(FeedCache::new(source)),
            Arc::new(ConnectionWarmup::new(self.client.clone(), &self.config.warmup)),
            Arc::new(PlayerPool::new(self.config.pool.clone())),
            feed_config,
            self.config.warmup.clone(),
        );

        let outcome = preloader.preload(force).await?;
        let summary = match outcome.warmup {
            Some(handle) => Some(handle.await?),
            None => None,
        };

        match output {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "items": outcome.items.as_slice(),
                    "primed_urls": outcome.primed_urls,
                    "warmed": summary.map(|s| s.connections.completed),
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Pretty => {
                for (index, item) in outcome.items.iter().enumerate() {
                    let price = item.price_label.as_deref().unwrap_or("-");
                    let location = item.location.as_deref().unwrap_or("-");
                    println!("{:>3}. [{}] {} | {} | {}", index + 1, item.id, item.title, price, location);
                    println!("     {}", item.video_url);
                }
                if let Some(summary) = summary {
                    println!(
                        "Warmed {}/{} connections",
                        summary.connections.completed, summary.connections.attempted
                    );
                }
            }
        }
        Ok(())
    }

    pub async fn warmup(&self, urls: &[String], bytes: Option<u64>, timeout_ms: Option<u64>) -> Result<()> {
        let mut options = WarmupOptions::from(&self.config.warmup);
        if let Some(bytes) = bytes {
            options.bytes = bytes;
        }
        if let Some(timeout_ms) = timeout_ms {
            options.timeout = Duration::from_millis(timeout_ms);
        }

        let warmup = ConnectionWarmup::new(self.client.clone(), &self.config.warmup);
        let selected = warmup.select_urls(urls);
        if selected.len() < urls.len() {
            info!(
                requested = urls.len(),
                selected = selected.len(),
                "Only the first {} distinct URLs are warmed",
                self.config.warmup.max_urls
            );
        }

        let summary = warmup.warm_up_video_urls(&selected, options).await;
        println!("Warmed {}/{} connections", summary.completed, summary.attempted);
        Ok(())
    }

    pub async fn subtitles(
        &self,
        master_url: &str,
        language: Option<&str>,
        at: Option<f64>,
        output: OutputFormat,
    ) -> Result<()> {
        let resolver = SubtitleResolver::new(self.client.clone(), self.config.subtitles.clone());

        let Some(language) = language else {
            let tracks = resolver.fetch_tracks(master_url).await?;
            if tracks.is_empty() {
                println!("No subtitle tracks declared");
            }
            for track in tracks {
                println!(
                    "{:<6} {:<20} {}{}",
                    track.language.as_deref().unwrap_or("?"),
                    track.name.as_deref().unwrap_or(""),
                    track.uri,
                    if track.is_default { " (default)" } else { "" }
                );
            }
            return Ok(());
        };

        let cues = resolver.try_load_cues(master_url, language).await?;
        debug!(language, cues = cues.len(), "Cues loaded");

        if let Some(at) = at {
            if !at.is_finite() || at < 0.0 {
                return Err(AppError::InvalidInput(format!("invalid position {at}")));
            }
            println!("{}", find_active_cue(&cues, at));
            return Ok(());
        }

        match output {
            OutputFormat::Json => {
                let json: Vec<_> = cues
                    .iter()
                    .map(|cue| serde_json::json!({"start": cue.start, "end": cue.end, "text": cue.text}))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Pretty => {
                for cue in &cues {
                    println!("{:>9.3} --> {:>9.3}  {}", cue.start, cue.end, cue.text.replace('\n', " / "));
                }
            }
        }
        Ok(())
    }

    pub async fn like(&self, id: &str, property: bool) -> Result<()> {
        let storage = self.storage();

        if property {
            let store = PropertyLikeStore::new(storage);
            let liked = store.toggle_like(id).await?;
            store.flush().await;
            println!("{} {}", if liked { "Liked" } else { "Unliked" }, id.trim());
            return Ok(());
        }

        let store = EngagementStore::new(storage, self.backend());
        let result = store.toggle_like(id).await;
        // Persist the optimistic state or its rollback before exiting.
        store.flush().await;

        let outcome = result?;
        match outcome.likes_count {
            Some(count) => println!(
                "{} {} ({count} likes)",
                if outcome.liked { "Liked" } else { "Unliked" },
                id.trim()
            ),
            None => println!("{} {}", if outcome.liked { "Liked" } else { "Unliked" }, id.trim()),
        }
        Ok(())
    }

    pub async fn likes(&self) -> Result<()> {
        let storage = self.storage();

        let videos = EngagementStore::new(storage.clone(), self.backend());
        let properties = PropertyLikeStore::new(storage);
        videos.hydrate().await;
        properties.hydrate().await;

        println!("videos:     {}", videos.liked_ids().join(", "));
        println!("properties: {}", properties.liked_refs().join(", "));
        Ok(())
    }
}
