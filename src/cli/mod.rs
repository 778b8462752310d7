//! CLI module for devicedb
//!
//! Provides command-line interface for:
//! - init: Create an empty database
//! - search: Print matching devices
//! - add / edit / delete: Maintain entries
//! - audit: Run checks over devices

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    add, audit, delete, edit, init, list_checks, load_config, run_command, search,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{
    parse_search_term, parse_search_terms, parse_term, parse_terms, write_json, write_line,
    SearchTerm,
};

use crate::observability;

/// Parse arguments, set up logging, run one command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let config = load_config(&cli)?;
    observability::init(config.log_format, &config.log_level);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_command(&cli, &config, &mut out)
}
