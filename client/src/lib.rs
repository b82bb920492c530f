//! VM Lab client library
//!
//! Deployment wizard, submission pipeline and task status tracking for the
//! VM Lab backend.

pub mod app;
pub mod authn;
pub mod cache;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod storage;
pub mod tasks;
pub mod utils;
pub mod wizard;
pub mod workers;
