//! Local-first like state.
//!
//! Toggles are applied in memory first and persisted in the background. For
//! video likes the backend is the commit point: a failed call puts the id
//! back the way it was and persists that again.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::config::{LIKED_PROPERTIES_KEY, LIKED_VIDEOS_KEY};
use crate::engagement::backend::EngagementBackend;
use crate::engagement::storage::KeyValueStore;
use crate::error::{ReelError, Result};

fn normalize_id(id: &str) -> Option<String> {
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

#[derive(Default)]
struct LikeState {
    ids: BTreeSet<String>,
    hydrated: bool,
}

/// A persisted set of liked identifiers under one storage key.
struct LikeSet {
    key: &'static str,
    storage: Arc<dyn KeyValueStore>,
    state: Arc<Mutex<LikeState>>,
    hydration: OnceCell<()>,
    writes: TaskTracker,
    write_gate: Arc<tokio::sync::Mutex<()>>,
    flush_gate: tokio::sync::Mutex<()>,
}

impl LikeSet {
    fn new(key: &'static str, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            key,
            storage,
            state: Arc::new(Mutex::new(LikeState::default())),
            hydration: OnceCell::new(),
            writes: TaskTracker::new(),
            write_gate: Arc::new(tokio::sync::Mutex::new(())),
            flush_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Load the persisted set once. Ids toggled before hydration are kept.
    async fn hydrate(&self) {
        self.hydration
            .get_or_init(|| async {
                let persisted = match self.storage.get(self.key).await {
                    Ok(Some(raw)) => decode_ids(self.key, &raw),
                    Ok(None) => Vec::new(),
                    Err(e) => {
                        warn!(key = self.key, error = %e, "Failed to read liked ids");
                        Vec::new()
                    }
                };

                let mut state = self.state.lock();
                let count = persisted.len();
                state.ids.extend(persisted);
                state.hydrated = true;
                debug!(key = self.key, persisted = count, total = state.ids.len(), "Hydrated likes");
            })
            .await;
    }

    fn is_hydrated(&self) -> bool {
        self.state.lock().hydrated
    }

    fn contains(&self, id: &str) -> bool {
        self.state.lock().ids.contains(id)
    }

    fn set(&self, id: &str, liked: bool) {
        let mut state = self.state.lock();
        if liked {
            state.ids.insert(id.to_string());
        } else {
            state.ids.remove(id);
        }
    }

    fn ids(&self) -> Vec<String> {
        self.state.lock().ids.iter().cloned().collect()
    }

    /// Write the current set in the background.
    ///
    /// Writes run one at a time and each one snapshots the set when it gets
    /// its turn, so the last write always carries the latest state.
    fn schedule_persist(&self) {
        let key = self.key;
        let storage = self.storage.clone();
        let state = self.state.clone();
        let gate = self.write_gate.clone();

        self.writes.spawn(async move {
            let _turn = gate.lock().await;
            let snapshot: Vec<String> = state.lock().ids.iter().cloned().collect();

            let encoded = match serde_json::to_string(&snapshot) {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!(key, error = %e, "Failed to encode liked ids");
                    return;
                }
            };
            if let Err(e) = storage.set(key, &encoded).await {
                warn!(key, error = %e, "Failed to persist liked ids");
            }
        });
    }

    /// Wait for every write scheduled so far.
    async fn flush(&self) {
        let _flush = self.flush_gate.lock().await;
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }
}

fn decode_ids(key: &str, raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(values) => values
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::String(s) => normalize_id(&s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Err(e) => {
            warn!(key, error = %e, "Ignoring malformed persisted likes");
            Vec::new()
        }
    }
}

/// Result of a committed toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub liked: bool,
    /// Count reported by the backend, when it sent one
    pub likes_count: Option<u64>,
}

/// Video likes, committed through an [`EngagementBackend`].
pub struct EngagementStore {
    likes: LikeSet,
    backend: Arc<dyn EngagementBackend>,
    toggles: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl EngagementStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, backend: Arc<dyn EngagementBackend>) -> Self {
        Self {
            likes: LikeSet::new(LIKED_VIDEOS_KEY, storage),
            backend,
            toggles: DashMap::new(),
        }
    }

    pub async fn hydrate(&self) {
        self.likes.hydrate().await;
    }

    pub fn is_hydrated(&self) -> bool {
        self.likes.is_hydrated()
    }

    pub fn is_liked(&self, video_id: &str) -> bool {
        self.likes.contains(video_id.trim())
    }

    pub fn liked_ids(&self) -> Vec<String> {
        self.likes.ids()
    }

    /// Flip the like state of `video_id`.
    ///
    /// The new state is visible through [`Self::is_liked`] immediately. If
    /// the backend rejects it the previous state is restored and the error
    /// is returned. Toggles of the same id run one after another.
    pub async fn toggle_like(&self, video_id: &str) -> Result<ToggleOutcome> {
        let id = normalize_id(video_id)
            .ok_or_else(|| ReelError::invalid_argument("video id must not be empty"))?;

        self.likes.hydrate().await;

        let lock = self
            .toggles
            .entry(id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let result = {
            let _turn = lock.lock().await;
            self.toggle_locked(&id).await
        };

        drop(lock);
        self.toggles.remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn toggle_locked(&self, id: &str) -> Result<ToggleOutcome> {
        let was_liked = self.likes.contains(id);
        let liked = !was_liked;

        self.likes.set(id, liked);
        self.likes.schedule_persist();

        match self.backend.set_like(id, liked).await {
            Ok(response) => {
                let likes_count = response.likes_count();
                debug!(video_id = %id, liked, ?likes_count, "Like committed");
                Ok(ToggleOutcome { liked, likes_count })
            }
            Err(e) => {
                warn!(video_id = %id, liked, error = %e, "Like rejected, rolling back");
                self.likes.set(id, was_liked);
                self.likes.schedule_persist();
                Err(e)
            }
        }
    }

    /// Wait for pending persistence writes.
    pub async fn flush(&self) {
        self.likes.flush().await;
    }
}

/// Liked property references. Local only, no backend commit.
pub struct PropertyLikeStore {
    likes: LikeSet,
}

impl PropertyLikeStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            likes: LikeSet::new(LIKED_PROPERTIES_KEY, storage),
        }
    }

    pub async fn hydrate(&self) {
        self.likes.hydrate().await;
    }

    pub fn is_liked(&self, reference: &str) -> bool {
        self.likes.contains(reference.trim())
    }

    pub fn liked_refs(&self) -> Vec<String> {
        self.likes.ids()
    }

    /// Flip and persist; returns the new state.
    pub async fn toggle_like(&self, reference: &str) -> Result<bool> {
        let reference = normalize_id(reference)
            .ok_or_else(|| ReelError::invalid_argument("property reference must not be empty"))?;

        self.likes.hydrate().await;

        let liked = !self.likes.contains(&reference);
        self.likes.set(&reference, liked);
        self.likes.schedule_persist();
        debug!(reference = %reference, liked, "Property like toggled");
        Ok(liked)
    }

    pub async fn flush(&self) {
        self.likes.flush().await;
    }
}
