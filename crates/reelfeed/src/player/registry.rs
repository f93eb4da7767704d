//! Playback ownership across feed surfaces.
//!
//! Every visible player is registered under the surface that shows it. Pause
//! operations are scoped to one owner, so the main feed and the reels screen
//! can both hold live players without silencing each other.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, trace};

use crate::player::handle::{SharedPlayer, same_player, silence};

/// A feed surface that owns players.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlaybackOwner {
    /// The primary vertical feed
    Feed,
    /// The full-screen reels surface
    Reels,
    /// A single listing's detail screen
    Detail,
}

#[derive(Clone)]
pub struct RegistryEntry {
    pub owner: PlaybackOwner,
    pub url: String,
    pub handle: SharedPlayer,
    pub created_at: Instant,
}

type RegistryKey = (PlaybackOwner, String);

#[derive(Default)]
pub struct PlaybackRegistry {
    entries: Mutex<HashMap<RegistryKey, RegistryEntry>>,
}

impl PlaybackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` for `(owner, url)`. The latest registration wins.
    pub fn register(&self, owner: PlaybackOwner, url: &str, handle: SharedPlayer) {
        let previous = self.entries.lock().insert(
            (owner, url.to_string()),
            RegistryEntry {
                owner,
                url: url.to_string(),
                handle,
                created_at: Instant::now(),
            },
        );
        if previous.is_some() {
            trace!(%owner, url = %url, "Replaced registered player");
        }
    }

    /// Remove the registration for `(owner, url)`.
    ///
    /// When `handle` is given, the entry is only removed if it still holds
    /// that exact handle, so a late unregister from a replaced player cannot
    /// evict the newer registration. Returns whether an entry was removed.
    pub fn unregister(&self, owner: PlaybackOwner, url: &str, handle: Option<&SharedPlayer>) -> bool {
        let mut entries = self.entries.lock();
        let key = (owner, url.to_string());

        let matches = match (entries.get(&key), handle) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(entry), Some(handle)) => same_player(&entry.handle, handle),
        };

        if matches {
            entries.remove(&key);
        } else if entries.contains_key(&key) {
            trace!(%owner, url = %url, "Ignoring stale unregister");
        }
        matches
    }

    /// Mute and pause every registered player, or only those of `owner`.
    pub fn pause_all(&self, owner: Option<PlaybackOwner>) -> usize {
        let targets: Vec<SharedPlayer> = self
            .entries
            .lock()
            .values()
            .filter(|entry| owner.is_none_or(|owner| entry.owner == owner))
            .map(|entry| entry.handle.clone())
            .collect();

        for handle in &targets {
            silence(handle.as_ref());
        }
        targets.len()
    }

    /// Mute and pause every player of `owner` whose URL is not in
    /// `keep_urls`. Players of other owners are left alone.
    pub fn pause_all_except<S: AsRef<str>>(&self, owner: PlaybackOwner, keep_urls: &[S]) -> usize {
        let keep: HashSet<&str> = keep_urls.iter().map(AsRef::as_ref).collect();

        let targets: Vec<SharedPlayer> = self
            .entries
            .lock()
            .values()
            .filter(|entry| entry.owner == owner && !keep.contains(entry.url.as_str()))
            .map(|entry| entry.handle.clone())
            .collect();

        for handle in &targets {
            silence(handle.as_ref());
        }
        if !targets.is_empty() {
            debug!(%owner, paused = targets.len(), kept = keep.len(), "Paused off-screen players");
        }
        targets.len()
    }

    /// Make `url` the only audible player of `owner`: silence the owner's
    /// other players, then unmute and play the target.
    ///
    /// Returns false if nothing is registered for `(owner, url)`.
    pub fn activate(&self, owner: PlaybackOwner, url: &str) -> bool {
        let Some(target) = self.handle(owner, url) else {
            return false;
        };

        self.pause_all_except(owner, &[url]);

        if let Err(e) = target.set_volume(1.0) {
            trace!(%owner, url = %url, error = %e, "Unmute failed");
        }
        if let Err(e) = target.play() {
            debug!(%owner, url = %url, error = %e, "Play failed");
        }
        true
    }

    pub fn handle(&self, owner: PlaybackOwner, url: &str) -> Option<SharedPlayer> {
        self.entries
            .lock()
            .get(&(owner, url.to_string()))
            .map(|entry| entry.handle.clone())
    }

    /// Entries registered for `owner`, oldest first.
    pub fn handles(&self, owner: PlaybackOwner) -> Vec<RegistryEntry> {
        let mut entries: Vec<RegistryEntry> = self
            .entries
            .lock()
            .values()
            .filter(|entry| entry.owner == owner)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.created_at);
        entries
    }

    /// URLs currently registered for `owner`, sorted.
    pub fn urls(&self, owner: PlaybackOwner) -> Vec<String> {
        let mut urls: Vec<String> = self
            .handles(owner)
            .into_iter()
            .map(|entry| entry.url)
            .collect();
        urls.sort();
        urls
    }

    /// Every registered handle, across owners.
    pub fn registered_handles(&self) -> Vec<SharedPlayer> {
        self.entries
            .lock()
            .values()
            .map(|entry| entry.handle.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::handle::testing::{Call, FakePlayer};

    #[test]
    fn test_pause_all_except_is_scoped_to_owner() {
        let registry = PlaybackRegistry::new();
        let feed = FakePlayer::new("u");
        let reels = FakePlayer::new("u");
        registry.register(PlaybackOwner::Feed, "u", feed.clone());
        registry.register(PlaybackOwner::Reels, "u", reels.clone());
        assert_eq!(registry.len(), 2);

        let empty: [&str; 0] = [];
        assert_eq!(registry.pause_all_except(PlaybackOwner::Feed, &empty), 1);

        assert_eq!(feed.calls(), vec![Call::Volume(0), Call::Pause]);
        assert!(reels.calls().is_empty());
    }

    #[test]
    fn test_pause_all_except_keeps_listed_urls() {
        let registry = PlaybackRegistry::new();
        let a = FakePlayer::new("a");
        let b = FakePlayer::new("b");
        registry.register(PlaybackOwner::Feed, "a", a.clone());
        registry.register(PlaybackOwner::Feed, "b", b.clone());

        registry.pause_all_except(PlaybackOwner::Feed, &["b"]);
        assert!(a.is_muted());
        assert!(b.calls().is_empty());
    }

    #[test]
    fn test_stale_unregister_keeps_newer_registration() {
        let registry = PlaybackRegistry::new();
        let old: SharedPlayer = FakePlayer::new("u");
        let new: SharedPlayer = FakePlayer::new("u");

        registry.register(PlaybackOwner::Feed, "u", old.clone());
        registry.register(PlaybackOwner::Feed, "u", new.clone());

        assert!(!registry.unregister(PlaybackOwner::Feed, "u", Some(&old)));
        let current = registry.handle(PlaybackOwner::Feed, "u").unwrap();
        assert!(same_player(&current, &new));

        assert!(registry.unregister(PlaybackOwner::Feed, "u", Some(&new)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_without_handle_removes_unconditionally() {
        let registry = PlaybackRegistry::new();
        registry.register(PlaybackOwner::Reels, "u", FakePlayer::new("u"));

        assert!(!registry.unregister(PlaybackOwner::Feed, "u", None));
        assert!(registry.unregister(PlaybackOwner::Reels, "u", None));
        assert!(!registry.unregister(PlaybackOwner::Reels, "u", None));
    }

    #[test]
    fn test_handles_are_listed_per_owner() {
        let registry = PlaybackRegistry::new();
        registry.register(PlaybackOwner::Feed, "b", FakePlayer::new("b"));
        registry.register(PlaybackOwner::Feed, "a", FakePlayer::new("a"));
        registry.register(PlaybackOwner::Detail, "c", FakePlayer::new("c"));

        assert_eq!(registry.handles(PlaybackOwner::Feed).len(), 2);
        assert_eq!(registry.urls(PlaybackOwner::Feed), vec!["a", "b"]);
        assert!(registry.handles(PlaybackOwner::Reels).is_empty());
    }

    #[test]
    fn test_pause_all_with_and_without_owner() {
        let registry = PlaybackRegistry::new();
        let feed = FakePlayer::new("a");
        let detail = FakePlayer::new("b");
        registry.register(PlaybackOwner::Feed, "a", feed.clone());
        registry.register(PlaybackOwner::Detail, "b", detail.clone());

        assert_eq!(registry.pause_all(Some(PlaybackOwner::Detail)), 1);
        assert!(feed.calls().is_empty());
        assert!(detail.is_muted());

        assert_eq!(registry.pause_all(None), 2);
        assert!(feed.is_muted());
    }

    #[test]
    fn test_mute_failure_still_pauses() {
        let registry = PlaybackRegistry::new();
        let player = FakePlayer::failing("u");
        registry.register(PlaybackOwner::Feed, "u", player.clone());

        // Both calls fail; the batch still completes.
        assert_eq!(registry.pause_all(None), 1);
    }

    #[test]
    fn test_activate_silences_siblings_and_plays_target() {
        let registry = PlaybackRegistry::new();
        let a = FakePlayer::new("a");
        let b = FakePlayer::new("b");
        let other = FakePlayer::new("a");
        registry.register(PlaybackOwner::Feed, "a", a.clone());
        registry.register(PlaybackOwner::Feed, "b", b.clone());
        registry.register(PlaybackOwner::Reels, "a", other.clone());

        assert!(registry.activate(PlaybackOwner::Feed, "b"));
        assert_eq!(a.calls(), vec![Call::Volume(0), Call::Pause]);
        assert_eq!(b.calls(), vec![Call::Volume(100), Call::Play]);
        assert!(other.calls().is_empty());

        assert!(!registry.activate(PlaybackOwner::Feed, "missing"));
    }

    #[test]
    fn test_owner_display() {
        assert_eq!(PlaybackOwner::Reels.to_string(), "reels");
        assert_eq!("detail".parse::<PlaybackOwner>().unwrap(), PlaybackOwner::Detail);
    }
}
