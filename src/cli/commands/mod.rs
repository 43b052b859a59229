//! CLI command implementations.

pub mod directory;
pub mod form;
pub mod init;
pub mod request;
pub mod template;
