//! CLI argument definitions using clap
//!
//! Commands:
//! - devicedb init
//! - devicedb search [field=value..] [--id ID]
//! - devicedb add ID [field=value..] [--container NAME]
//! - devicedb edit ID field=value..
//! - devicedb delete ID
//! - devicedb audit [--check NAME].. [--list] [field=value..]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::container::DEFAULT_CONTAINER;

/// devicedb - a JSON file catalog of device descriptions
#[derive(Parser, Debug)]
#[command(name = "devicedb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file; overrides the configured path
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new, empty database
    Init,

    /// Print devices matching every search term
    Search {
        /// Only consider the device with this id
        #[arg(long)]
        id: Option<String>,

        /// field=regex terms, or field=start,stop for a numeric range
        terms: Vec<String>,
    },

    /// Add a device
    Add {
        id: String,

        /// Container the device is validated against
        #[arg(long, default_value = DEFAULT_CONTAINER)]
        container: String,

        terms: Vec<String>,
    },

    /// Update fields of an existing device
    Edit {
        id: String,

        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Remove a device
    Delete { id: String },

    /// Run checks against matching devices
    Audit {
        /// Run only the named check; repeatable
        #[arg(long = "check", value_name = "NAME")]
        checks: Vec<String>,

        /// List the available checks and exit
        #[arg(long)]
        list: bool,

        /// Search terms selecting the devices to audit
        terms: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
