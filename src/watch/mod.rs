// src/watch/mod.rs

//! File watching for pchdeps.
//!
//! Only the files collected build dependencies actually consumed are
//! watched; a change drops their cached timestamps and resubmits the
//! project parts that depend on them.

pub mod watcher;

pub use watcher::IncludeWatcher;
