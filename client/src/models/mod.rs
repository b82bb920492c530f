//! Domain models

pub mod task;
pub mod template;
