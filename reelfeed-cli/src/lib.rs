//! Library target for the `reelfeed` package.
//!
//! The primary deliverable of this package is the `reelfeed` CLI binary
//! (`src/main.rs`). This library exists so CI can run `cargo test -p reelfeed --doc`
//! for feature/doctype validation.

#[doc(hidden)]
pub use reelfeed_engine;
