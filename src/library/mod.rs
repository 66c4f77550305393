//! The reading library: storage, statistics, caching, and prompt rendering.

pub mod backend;
pub mod cache;
pub mod render;
pub mod stats;
pub mod store;
pub mod types;
