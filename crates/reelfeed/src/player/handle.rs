//! Native player handle abstraction.

use std::sync::Arc;

use tracing::trace;

use crate::error::PlayerError;

/// A native video player bound to one source URL.
///
/// Implementations wrap a platform resource that is not reclaimed on drop:
/// it must be released explicitly through [`PlayerHandle::release`].
/// `release` must be idempotent; calls on a released handle may fail and
/// callers tolerate that.
pub trait PlayerHandle: Send + Sync {
    fn url(&self) -> &str;

    fn play(&self) -> Result<(), PlayerError>;

    fn pause(&self) -> Result<(), PlayerError>;

    /// 0.0 is muted, 1.0 is full volume.
    fn set_volume(&self, volume: f32) -> Result<(), PlayerError>;

    fn release(&self) -> Result<(), PlayerError>;
}

pub type SharedPlayer = Arc<dyn PlayerHandle>;

/// Creates player handles for a URL.
pub trait PlayerFactory: Send + Sync {
    fn create(&self, url: &str) -> Result<SharedPlayer, PlayerError>;
}

/// Mute, then pause. Each step runs even if the previous one failed.
pub fn silence(player: &dyn PlayerHandle) {
    if let Err(e) = player.set_volume(0.0) {
        trace!(url = %player.url(), error = %e, "Mute failed");
    }
    if let Err(e) = player.pause() {
        trace!(url = %player.url(), error = %e, "Pause failed");
    }
}

/// Pause, then release. A failed pause does not prevent the release.
pub fn teardown(player: &dyn PlayerHandle) {
    if let Err(e) = player.pause() {
        trace!(url = %player.url(), error = %e, "Pause before release failed");
    }
    if let Err(e) = player.release() {
        trace!(url = %player.url(), error = %e, "Release failed");
    }
}

/// Identity of a handle, regardless of which `Arc` points at it.
pub fn same_player(a: &SharedPlayer, b: &SharedPlayer) -> bool {
    Arc::ptr_eq(a, b)
}
