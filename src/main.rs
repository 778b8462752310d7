//! devicedb CLI entry point
//!
//! Parsing, configuration and dispatch all live in `cli::run`; this only
//! reports the error and sets the exit code.

use devicedb::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
