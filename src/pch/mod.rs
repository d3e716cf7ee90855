// src/pch/mod.rs

//! From build dependencies to deduplicated PCH tasks.
//!
//! [`generator`] splits each project part into a system and a project task;
//! [`merger`] folds tasks with equal merge keys together and forwards the
//! changes to a [`PchTaskSink`].

pub mod generator;
pub mod merger;

pub use generator::{generate_tasks, PchTaskGenerator};
pub use merger::{PchTaskSink, PchTasksMerger, TaskMerger};
