//! Output and term parsing for the CLI
//!
//! - Command results go to the supplied writer (stdout in practice)
//! - JSON output is pretty-printed, one document per invocation
//! - UTF-8 only

use std::io::Write;

use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::store::{Document, NumericRange, Pattern, Query};

/// Parses one `field=value` term.
///
/// The value is read as JSON when it parses, so `z=3.5` is a number and
/// `active=false` a boolean; anything else is kept as a string.
pub fn parse_term(term: &str) -> CliResult<(String, Value)> {
    let (field, raw) = split_term(term)?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((field.to_string(), value))
}

/// Parses every term into one document; later terms win
pub fn parse_terms(terms: &[String]) -> CliResult<Document> {
    terms.iter().map(|term| parse_term(term)).collect()
}

fn split_term(term: &str) -> CliResult<(&str, &str)> {
    let (field, raw) = term.split_once('=').ok_or_else(|| {
        CliError::usage_error(format!("Expected field=value, got '{}'", term))
    })?;

    let field = field.trim();
    if field.is_empty() {
        return Err(CliError::usage_error(format!(
            "Missing field name in '{}'",
            term
        )));
    }
    Ok((field, raw))
}

/// One search criterion from the command line
#[derive(Debug, Clone, PartialEq)]
pub enum SearchTerm {
    /// `field=start,stop` with both bounds numeric (`stop` may be empty)
    Range(String, NumericRange),
    /// Anything else: a case-insensitive expression for the whole value
    Pattern(String, Pattern),
}

/// Parses one search term.
///
/// `z=3.0,6.0` selects `3.0 <= z < 6.0`; `name=tst_.*` is a regular
/// expression. A range whose start is not below its stop is a usage error.
pub fn parse_search_term(term: &str) -> CliResult<SearchTerm> {
    let (field, raw) = split_term(term)?;
    if let Some(range) = parse_range(raw)? {
        return Ok(SearchTerm::Range(field.to_string(), range));
    }
    let pattern = Pattern::new(raw).map_err(|e| CliError::usage_error(e.to_string()))?;
    Ok(SearchTerm::Pattern(field.to_string(), pattern))
}

/// `None` when `raw` is not a pair of numbers
fn parse_range(raw: &str) -> CliResult<Option<NumericRange>> {
    let (start, stop) = match raw.split_once(',') {
        Some(bounds) => bounds,
        None => return Ok(None),
    };
    let start: f64 = match start.trim().parse() {
        Ok(start) => start,
        Err(_) => return Ok(None),
    };
    let stop = match stop.trim() {
        "" => None,
        stop => match stop.parse::<f64>() {
            Ok(stop) => Some(stop),
            Err(_) => return Ok(None),
        },
    };

    NumericRange::new(start, stop)
        .map(Some)
        .map_err(|_| CliError::usage_error("Invalid range, make sure start < stop"))
}

/// Builds a multi-result query from search terms; every term must hold
pub fn parse_search_terms(terms: &[String]) -> CliResult<Query> {
    let mut query = Query::new().multiples(true);
    for term in terms {
        query = match parse_search_term(term)? {
            SearchTerm::Range(field, range) => query.range(field, range),
            SearchTerm::Pattern(field, pattern) => query.pattern(field, pattern),
        };
    }
    Ok(query)
}

/// Write a JSON value followed by a newline
pub fn write_json(out: &mut dyn Write, value: &Value) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write one line of text
pub fn write_line(out: &mut dyn Write, line: &str) -> CliResult<()> {
    writeln!(out, "{}", line)?;
    Ok(())
}
