//! Logging infrastructure
//!
//! Structured diagnostic logging using tracing and tracing-subscriber, with
//! optional JSON file output through tracing-appender.

pub mod logger;

pub use logger::LoggerImpl;
