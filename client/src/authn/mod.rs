//! Authentication against the backend

pub mod token;
pub mod token_mngr;
