// src/exec/mod.rs

//! Execution layer for pchdeps.
//!
//! Responsibilities:
//! - turning a claimed [`PchTask`](crate::model::PchTask) into a compiler job
//! - reusing artifacts whose inputs did not change
//! - spawning the compiler and reporting success or failure
//! - recording which PCH each project part should use

pub mod backend;
pub mod task_runner;

pub use backend::{PchArtifact, PchBuilder, PchJob, ProcessPchBuilder};
pub use task_runner::{BuildOutcome, PchTaskRunner, SharedArtifactStore};
