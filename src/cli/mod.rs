//! CLI command handling module
//!
//! Handles all CLI subcommands except `serve`.

mod commands;
mod logging;
mod version;

pub use commands::{ConfigSubcommand, ask, handle_config_command, prompt, snapshot};
pub use logging::{filter_directive, init_logging};
pub use version::display_version;
