//! Infrastructure layer module
//!
//! Process-level concerns that are not part of the engine itself:
//! configuration loading and logging setup.

pub mod config;
pub mod logging;
