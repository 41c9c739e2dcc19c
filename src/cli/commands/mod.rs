//! Command implementations.

pub mod chain;
pub mod issues;
pub mod projects;
pub mod serve;
pub mod version;
