//! Bounded pool of reusable player handles, keyed by source URL.
//!
//! Entries are removed from the map before their handles are paused and
//! released, so a reader never gets a handle that is being torn down.
//!
//! With a [`PlaybackRegistry`] attached, handles that a surface still has
//! registered are never chosen for eviction or released by
//! `release_except`. They stay pooled until the surface unregisters them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::PlayerPoolConfig;
use crate::error::PlayerError;
use crate::player::handle::{PlayerFactory, SharedPlayer, same_player, teardown};
use crate::player::registry::PlaybackRegistry;

/// A pooled handle.
#[derive(Clone)]
pub struct PoolEntry {
    pub url: String,
    pub handle: SharedPlayer,
    pub created_at: Instant,
    seq: u64,
}

#[derive(Default)]
struct PoolState {
    entries: HashMap<String, PoolEntry>,
    next_seq: u64,
}

fn is_in_use(handle: &SharedPlayer, in_use: &[SharedPlayer]) -> bool {
    in_use.iter().any(|used| same_player(used, handle))
}

impl PoolState {
    fn oldest_evictable(&self, in_use: &[SharedPlayer]) -> Option<String> {
        self.entries
            .values()
            .filter(|entry| !is_in_use(&entry.handle, in_use))
            .min_by_key(|entry| entry.seq)
            .map(|entry| entry.url.clone())
    }
}

pub struct PlayerPool {
    config: PlayerPoolConfig,
    state: Mutex<PoolState>,
    registry: Option<Arc<PlaybackRegistry>>,
}

impl PlayerPool {
    pub fn new(config: PlayerPoolConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PoolState::default()),
            registry: None,
        }
    }

    /// Spare handles registered in `registry` from eviction and
    /// `release_except`.
    pub fn with_registry(mut self, registry: Arc<PlaybackRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    // Snapshot taken before the pool lock so the two locks never nest.
    fn in_use(&self) -> Vec<SharedPlayer> {
        self.registry
            .as_ref()
            .map(|registry| registry.registered_handles())
            .unwrap_or_default()
    }

    pub fn capacity(&self) -> usize {
        self.config.max_players.max(1)
    }

    pub fn get(&self, url: &str) -> Option<SharedPlayer> {
        self.state
            .lock()
            .entries
            .get(url)
            .map(|entry| entry.handle.clone())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.state.lock().entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn urls(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut entries: Vec<&PoolEntry> = state.entries.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.url.clone()).collect()
    }

    /// Store `handle` under `url`.
    ///
    /// An existing handle for the same URL is replaced and returned to the
    /// caller, unreleased. Inserting a new URL into a full pool evicts and
    /// releases the oldest entry that is not registered for playback. When
    /// every entry is registered the pool grows past its capacity instead.
    pub fn upsert(&self, url: &str, handle: SharedPlayer) -> Option<SharedPlayer> {
        let in_use = self.in_use();
        let (replaced, evicted, overflow) = {
            let mut state = self.state.lock();
            let mut evicted = None;
            let mut overflow = false;

            if !state.entries.contains_key(url) && state.entries.len() >= self.capacity() {
                match state.oldest_evictable(&in_use) {
                    Some(oldest) => evicted = state.entries.remove(&oldest),
                    None => overflow = true,
                }
            }

            let seq = state.next_seq;
            state.next_seq += 1;
            let replaced = state.entries.insert(
                url.to_string(),
                PoolEntry {
                    url: url.to_string(),
                    handle,
                    created_at: Instant::now(),
                    seq,
                },
            );
            (replaced.map(|entry| entry.handle), evicted, overflow)
        };

        if overflow {
            debug!(
                url = %url,
                capacity = self.capacity(),
                "Every pooled player is registered, growing past capacity"
            );
        }
        if let Some(entry) = evicted {
            debug!(url = %entry.url, capacity = self.capacity(), "Evicting oldest pooled player");
            teardown(entry.handle.as_ref());
        }

        replaced
    }

    /// Reuse the pooled handle for `url` or create and pool a new one.
    ///
    /// Returns the handle and whether it was newly created.
    pub fn get_or_create(
        &self,
        url: &str,
        factory: &dyn PlayerFactory,
    ) -> Result<(SharedPlayer, bool), PlayerError> {
        if let Some(existing) = self.get(url) {
            return Ok((existing, false));
        }

        let created = factory.create(url)?;

        // Someone may have pooled a handle while we were creating ours.
        if let Some(existing) = self.get(url) {
            teardown(created.as_ref());
            return Ok((existing, false));
        }

        if let Some(replaced) = self.upsert(url, created.clone())
            && !same_player(&replaced, &created)
        {
            teardown(replaced.as_ref());
        }
        Ok((created, true))
    }

    /// Release every pooled handle whose URL is not in `keep_urls`.
    /// Handles registered for playback are kept as well.
    ///
    /// Returns how many handles were released.
    pub fn release_except<S: AsRef<str>>(&self, keep_urls: &[S]) -> usize {
        let keep: HashSet<&str> = keep_urls.iter().map(AsRef::as_ref).collect();
        let in_use = self.in_use();

        let removed: Vec<PoolEntry> = {
            let mut state = self.state.lock();
            let doomed: Vec<String> = state
                .entries
                .values()
                .filter(|entry| {
                    !keep.contains(entry.url.as_str()) && !is_in_use(&entry.handle, &in_use)
                })
                .map(|entry| entry.url.clone())
                .collect();
            doomed
                .iter()
                .filter_map(|url| state.entries.remove(url))
                .collect()
        };

        Self::teardown_entries(removed, "release_except")
    }

    /// Release everything, e.g. on shutdown.
    pub fn release_all(&self) -> usize {
        let removed: Vec<PoolEntry> = {
            let mut state = self.state.lock();
            state.entries.drain().map(|(_, entry)| entry).collect()
        };

        Self::teardown_entries(removed, "release_all")
    }

    fn teardown_entries(entries: Vec<PoolEntry>, reason: &'static str) -> usize {
        for entry in &entries {
            teardown(entry.handle.as_ref());
        }
        if !entries.is_empty() {
            debug!(released = entries.len(), reason, "Released pooled players");
        }
        entries.len()
    }
}

impl Default for PlayerPool {
    fn default() -> Self {
        Self::new(PlayerPoolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::handle::testing::{Call, FakeFactory, FakePlayer};
    use crate::player::registry::PlaybackOwner;

    #[test]
    fn test_second_upsert_wins_and_release_except_releases_current_handle() {
        let pool = PlayerPool::default();
        let h1 = FakePlayer::new("u");
        let h2 = FakePlayer::new("u");

        assert!(pool.upsert("u", h1.clone()).is_none());
        let replaced = pool.upsert("u", h2.clone());

        let current = pool.get("u").unwrap();
        let expected: SharedPlayer = h2.clone();
        assert!(same_player(&current, &expected));
        assert!(replaced.is_some());
        // Replacement does not release the old handle implicitly.
        assert!(!h1.is_released());

        let empty: [&str; 0] = [];
        assert_eq!(pool.release_except(&empty), 1);
        assert!(h2.is_released());
        assert_eq!(h2.calls(), vec![Call::Pause, Call::Release]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_release_except_keeps_listed_urls() {
        let pool = PlayerPool::default();
        let a = FakePlayer::new("a");
        let b = FakePlayer::new("b");
        let c = FakePlayer::new("c");
        pool.upsert("a", a.clone());
        pool.upsert("b", b.clone());
        pool.upsert("c", c.clone());

        assert_eq!(pool.release_except(&["b"]), 2);
        assert!(a.is_released());
        assert!(!b.is_released());
        assert!(c.is_released());
        assert_eq!(pool.urls(), vec!["b".to_string()]);
    }

    #[test]
    fn test_failing_handle_does_not_block_batch_cleanup() {
        let pool = PlayerPool::default();
        let bad = FakePlayer::failing("bad");
        let good = FakePlayer::new("good");
        pool.upsert("bad", bad.clone());
        pool.upsert("good", good.clone());

        assert_eq!(pool.release_all(), 2);
        assert!(bad.is_released());
        assert!(good.is_released());
        assert!(pool.get("bad").is_none());
    }

    #[test]
    fn test_full_pool_evicts_oldest() {
        let pool = PlayerPool::new(PlayerPoolConfig { max_players: 2 });
        let a = FakePlayer::new("a");
        let b = FakePlayer::new("b");
        let c = FakePlayer::new("c");
        pool.upsert("a", a.clone());
        pool.upsert("b", b.clone());
        pool.upsert("c", c.clone());

        assert!(a.is_released());
        assert_eq!(pool.urls(), vec!["b".to_string(), "c".to_string()]);

        // Replacing an existing URL never evicts.
        pool.upsert("b", FakePlayer::new("b"));
        assert!(!c.is_released());
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_eviction_skips_registered_handles() {
        let registry = Arc::new(PlaybackRegistry::new());
        let pool =
            PlayerPool::new(PlayerPoolConfig { max_players: 2 }).with_registry(registry.clone());
        let a = FakePlayer::new("a");
        let b = FakePlayer::new("b");
        pool.upsert("a", a.clone());
        pool.upsert("b", b.clone());
        registry.register(PlaybackOwner::Feed, "a", a.clone());

        // "a" is the oldest but still on screen, so "b" goes.
        pool.upsert("c", FakePlayer::new("c"));
        assert!(!a.is_released());
        assert!(b.is_released());
        assert_eq!(pool.urls(), vec!["a".to_string(), "c".to_string()]);

        // With every entry registered the pool grows instead of releasing.
        let c = pool.get("c").unwrap();
        registry.register(PlaybackOwner::Reels, "c", c);
        let d = FakePlayer::new("d");
        pool.upsert("d", d.clone());
        assert_eq!(pool.len(), 3);
        assert!(!a.is_released());

        // Once unregistered, "a" is the first to go.
        registry.unregister(PlaybackOwner::Feed, "a", None);
        pool.upsert("e", FakePlayer::new("e"));
        assert!(a.is_released());
        assert!(!d.is_released());
        assert_eq!(pool.urls(), vec!["c".to_string(), "d".to_string(), "e".to_string()]);
    }

    #[test]
    fn test_release_except_spares_registered_handles() {
        let registry = Arc::new(PlaybackRegistry::new());
        let pool = PlayerPool::default().with_registry(registry.clone());
        let playing = FakePlayer::new("playing");
        let idle = FakePlayer::new("idle");
        pool.upsert("playing", playing.clone());
        pool.upsert("idle", idle.clone());
        registry.register(PlaybackOwner::Detail, "playing", playing.clone());

        let empty: [&str; 0] = [];
        assert_eq!(pool.release_except(&empty), 1);
        assert!(idle.is_released());
        assert!(playing.calls().is_empty());
        assert_eq!(pool.urls(), vec!["playing".to_string()]);

        // Shutdown still releases everything.
        assert_eq!(pool.release_all(), 1);
        assert!(playing.is_released());
    }

    #[test]
    fn test_get_or_create_reuses_pooled_handle() {
        let pool = PlayerPool::default();
        let factory = FakeFactory::default();

        let (first, created) = pool.get_or_create("u", &factory).unwrap();
        assert!(created);
        let (second, created_again) = pool.get_or_create("u", &factory).unwrap();
        assert!(!created_again);
        assert!(same_player(&first, &second));
        assert_eq!(factory.creations(), 1);

        assert!(pool.get_or_create("https://v/broken.m3u8", &factory).is_err());
        assert_eq!(pool.len(), 1);
    }
}
