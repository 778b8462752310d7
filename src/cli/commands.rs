//! CLI command implementations
//!
//! Commands are thin: they parse terms, call the client, and print. Every
//! command re-reads the database file, so nothing is cached between runs.

use std::io::Write;

use serde_json::Value;
use tracing::info;

use crate::check::{checks, find_check, verify_all, Check, Record};
use crate::client::Client;
use crate::config::{self, CatalogConfig};
use crate::observability::ObservationScope;
use crate::store::Query;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{parse_search_terms, parse_terms, write_json, write_line};

/// Resolves the configuration for this invocation.
///
/// `--path` overrides the configured database, and is enough on its own
/// when no configuration file is found. `--verbose` forces debug logging.
pub fn load_config(cli: &Cli) -> CliResult<CatalogConfig> {
    let mut config = match config::locate(cli.config.as_deref()) {
        Some(path) => CatalogConfig::load(&path)?,
        None => match &cli.path {
            Some(path) => CatalogConfig::for_path(path.to_string_lossy()),
            None => return Err(CliError::no_database()),
        },
    };

    if let Some(path) = &cli.path {
        config.path = path.to_string_lossy().into_owned();
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    Ok(config)
}

/// Dispatch a parsed command
pub fn run_command(cli: &Cli, config: &CatalogConfig, out: &mut dyn Write) -> CliResult<()> {
    let client = Client::from_config(config)?;

    match &cli.command {
        Command::Init => init(&client, out),
        Command::Search { id, terms } => search(&client, id.as_deref(), terms, out),
        Command::Add {
            id,
            container,
            terms,
        } => add(&client, id, container, terms, out),
        Command::Edit { id, terms } => edit(&client, id, terms, out),
        Command::Delete { id } => delete(&client, id, out),
        Command::Audit {
            checks,
            list,
            terms,
        } => {
            if *list {
                list_checks(out)
            } else {
                audit(&client, checks, terms, out)
            }
        }
    }
}

/// Create an empty database file
pub fn init(client: &Client, out: &mut dyn Write) -> CliResult<()> {
    client.store().initialize()?;
    write_line(
        out,
        &format!(
            "Initialized empty database at {}",
            client.store().path().display()
        ),
    )
}

/// Print matching documents as a JSON array
pub fn search(
    client: &Client,
    id: Option<&str>,
    terms: &[String],
    out: &mut dyn Write,
) -> CliResult<()> {
    let mut query = parse_search_terms(terms)?;
    if let Some(id) = id {
        query = query.id(id);
    }

    let docs = client.store().find_many(&query)?;
    if docs.is_empty() {
        return Err(CliError::not_found("No devices found"));
    }

    let docs: Vec<Value> = docs.into_iter().map(Value::Object).collect();
    write_json(out, &Value::Array(docs))
}

pub fn add(
    client: &Client,
    id: &str,
    container: &str,
    terms: &[String],
    out: &mut dyn Write,
) -> CliResult<()> {
    client.add_document(id, container, parse_terms(terms)?)?;
    write_line(out, &format!("Added {}", id))
}

pub fn edit(client: &Client, id: &str, terms: &[String], out: &mut dyn Write) -> CliResult<()> {
    let fields = parse_terms(terms)?;
    if fields.is_empty() {
        return Err(CliError::usage_error("Nothing to edit"));
    }
    client.edit_document(id, fields)?;
    write_line(out, &format!("Updated {}", id))
}

pub fn delete(client: &Client, id: &str, out: &mut dyn Write) -> CliResult<()> {
    let existed = client.store().find_one(&Query::by_id(id))?.is_some();
    client.remove_document(id)?;
    if existed {
        write_line(out, &format!("Removed {}", id))
    } else {
        write_line(out, &format!("{} not found; nothing removed", id))
    }
}

pub fn list_checks(out: &mut dyn Write) -> CliResult<()> {
    for check in checks() {
        write_line(out, check.name())?;
    }
    Ok(())
}

fn select_checks(names: &[String]) -> CliResult<Vec<Check>> {
    if names.is_empty() {
        return Ok(checks().to_vec());
    }
    names
        .iter()
        .map(|name| {
            find_check(name).copied().ok_or_else(|| {
                CliError::usage_error(format!(
                    "Unknown check '{}'. Use --list to see available checks.",
                    name
                ))
            })
        })
        .collect()
}

/// Run checks over every matching device and print the failures.
///
/// Ends with a `# devices failed: N / M` summary line. Failed checks do not
/// make the command fail.
pub fn audit(
    client: &Client,
    names: &[String],
    terms: &[String],
    out: &mut dyn Write,
) -> CliResult<()> {
    let selected = select_checks(names)?;
    let query = parse_search_terms(terms)?;

    let scope = ObservationScope::new("audit");
    let records = client.search_query(&query)?;

    let mut failed = 0;
    for record in &records {
        let id = record.id().unwrap_or("<no _id>");
        let failures: Vec<_> = verify_all(record, &selected)
            .into_iter()
            .filter(|result| !result.success)
            .collect();

        if failures.is_empty() {
            continue;
        }
        failed += 1;
        for result in failures {
            write_line(
                out,
                &format!("{}: {}: {}", id, result.check_name, result.message),
            )?;
        }
    }

    write_line(
        out,
        &format!("# devices failed: {} / {}", failed, records.len()),
    )?;
    info!(
        target: "devicedb::check",
        devices = records.len(),
        failed = failed,
        checks = selected.len(),
        "Audit finished"
    );
    scope.complete();
    Ok(())
}
