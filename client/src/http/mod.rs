//! Backend HTTP API

pub mod apps;
pub mod client;
pub mod courses;
pub mod deployments;
pub mod tasks;
