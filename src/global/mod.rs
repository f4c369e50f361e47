//! Per-user state shared across invocations: config and cache locations.

pub mod cache;
pub mod dirs;
