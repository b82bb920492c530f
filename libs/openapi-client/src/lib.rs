//! Wire models for the lab deployment backend API

pub mod models;

pub use models::*;
