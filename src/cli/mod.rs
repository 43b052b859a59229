//! Command-line interface for the approval engine.

pub mod commands;
pub mod context;
pub mod output;
pub mod types;

pub use context::AppContext;
pub use types::{Cli, Commands};

/// Print a failed command's error and exit with status 1.
///
/// In JSON mode the error goes to stdout as `{"error": "..."}` so scripts
/// parsing stdout always receive a JSON document.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        println!("{body}");
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
