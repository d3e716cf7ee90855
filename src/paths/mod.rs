// src/paths/mod.rs

//! File path identity.
//!
//! - [`cache`] interns paths into small integer [`FileId`](crate::model::FileId)s.
//! - [`normalize`] turns paths into the host's canonical spelling before
//!   they are interned or compared.

pub mod cache;
pub mod normalize;

pub use cache::FilePathCache;
pub use normalize::{comparison_key, normalize_path};
