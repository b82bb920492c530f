//! In-memory caches

pub mod catalog;
pub mod roster;
