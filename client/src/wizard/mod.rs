pub mod draft;
pub mod partition;
pub mod plan;
pub mod session;
pub mod steps;
pub mod submission;
pub mod variables;
