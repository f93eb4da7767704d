// Native player handles: pooling and per-surface ownership

mod handle;
mod pool;
mod registry;

pub use handle::{PlayerFactory, PlayerHandle, SharedPlayer, same_player, silence, teardown};
pub use pool::{PlayerPool, PoolEntry};
pub use registry::{PlaybackOwner, PlaybackRegistry, RegistryEntry};

#[cfg(test)]
pub(crate) use handle::testing;
