//! CLI Command Tests
//!
//! Drives parsed command lines through `run_command` against a temporary
//! database and inspects what would have been printed.

use clap::Parser;
use devicedb::cli::{load_config, run_command, Cli, CliErrorCode, CliResult};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

struct Harness {
    temp_dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn db_path(&self) -> String {
        self.temp_dir.path().join("db.json").display().to_string()
    }

    fn run(&self, args: &[&str]) -> CliResult<String> {
        let db = self.db_path();
        let mut argv = vec!["devicedb", "--path", db.as_str()];
        argv.extend_from_slice(args);

        let cli = Cli::try_parse_from(argv).expect("arguments must parse");
        let config = load_config(&cli)?;
        let mut out = Vec::new();
        run_command(&cli, &config, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }
}

// =============================================================================
// Maintenance Commands
// =============================================================================

#[test]
fn test_init_twice_is_refused() {
    let h = Harness::new();
    let out = h.run(&["init"]).unwrap();
    assert!(out.starts_with("Initialized empty database"));

    h.run(&["add", "m1", "name=m1"]).unwrap();
    let err = h.run(&["init"]).unwrap_err();
    assert_eq!(err.code_str(), "CATALOG_PERMISSION_DENIED");
}

#[test]
fn test_add_search_edit_delete() {
    let h = Harness::new();
    h.run(&["add", "m1", "name=m1", "device_class=X", "z=3.5"])
        .unwrap();

    let out = h.run(&["search", "name=m1"]).unwrap();
    let found: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(found[0]["_id"], "m1");
    assert_eq!(found[0]["z"], 3.5);
    assert_eq!(found[0]["type"], "Device");

    h.run(&["edit", "m1", "z=4"]).unwrap();
    let out = h.run(&["search", "--id", "m1"]).unwrap();
    let found: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(found[0]["z"], 4);

    assert_eq!(h.run(&["delete", "m1"]).unwrap(), "Removed m1\n");
    let err = h.run(&["search", "--id", "m1"]).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::NotFound);
}

#[test]
fn test_duplicate_add_is_reported() {
    let h = Harness::new();
    h.run(&["add", "m1", "name=m1"]).unwrap();
    let err = h.run(&["add", "m1", "name=m1"]).unwrap_err();
    assert_eq!(err.code_str(), "CATALOG_DUPLICATE");
}

#[test]
fn test_delete_absent_is_not_an_error() {
    let h = Harness::new();
    let out = h.run(&["delete", "ghost"]).unwrap();
    assert!(out.contains("nothing removed"));
}

#[test]
fn test_malformed_term_is_usage_error() {
    let h = Harness::new();
    let err = h.run(&["add", "m1", "name"]).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::UsageError);
}

// =============================================================================
// Search Terms
// =============================================================================

fn found_ids(out: &str) -> Vec<String> {
    let found: Value = serde_json::from_str(out).unwrap();
    found
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["_id"].as_str().unwrap().to_string())
        .collect()
}

fn add_positioned(h: &Harness) {
    for (id, z) in [("tst_base_pim", "3.0"), ("tst_base_pim2", "6.0"), ("tst_yag", "4.5")] {
        let name = format!("name={}", id);
        let z = format!("z={}", z);
        h.run(&["add", id, name.as_str(), "device_class=X", z.as_str()])
            .unwrap();
    }
}

#[test]
fn test_search_numeric_range() {
    let h = Harness::new();
    add_positioned(&h);

    let out = h.run(&["search", "z=3.0,6.0"]).unwrap();
    assert_eq!(found_ids(&out), vec!["tst_base_pim", "tst_yag"]);
}

#[test]
fn test_search_reversed_range_is_rejected() {
    let h = Harness::new();
    add_positioned(&h);

    let err = h.run(&["search", "z=6.0,3.0"]).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::UsageError);
    assert_eq!(err.message(), "Invalid range, make sure start < stop");
}

#[test]
fn test_search_pattern_and_range_together() {
    let h = Harness::new();
    add_positioned(&h);

    let out = h
        .run(&["search", "name=TST_BASE_PIM2", "z=3.0,7.0"])
        .unwrap();
    assert_eq!(found_ids(&out), vec!["tst_base_pim2"]);

    let out = h.run(&["search", "name=tst_base.*"]).unwrap();
    assert_eq!(found_ids(&out), vec!["tst_base_pim", "tst_base_pim2"]);

    let out = h.run(&["search", "z=6.0"]).unwrap();
    assert_eq!(found_ids(&out), vec!["tst_base_pim2"]);
}

// =============================================================================
// Audit
// =============================================================================

#[test]
fn test_audit_summary() {
    let h = Harness::new();
    h.run(&["add", "good", "name=good", "device_class=X"]).unwrap();
    h.run(&["add", "bad", "name=other", "device_class=X"]).unwrap();

    let out = h
        .run(&["audit", "--check", "check_name_match_id"])
        .unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "bad: check_name_match_id: id: bad != name: other",
            "# devices failed: 1 / 2",
        ]
    );
}

#[test]
fn test_audit_filters_devices() {
    let h = Harness::new();
    h.run(&["add", "a", "name=a", "device_class=X"]).unwrap();
    h.run(&["add", "b", "name=b", "device_class=Y"]).unwrap();

    let out = h
        .run(&["audit", "--check", "check_instantiation", "device_class=Y"])
        .unwrap();
    assert_eq!(out, "# devices failed: 0 / 1\n");
}

#[test]
fn test_audit_list_and_unknown_check() {
    let h = Harness::new();
    let out = h.run(&["audit", "--list"]).unwrap();
    assert_eq!(out.lines().count(), 6);
    assert!(out.starts_with("check_instantiation\n"));

    let err = h.run(&["audit", "--check", "check_everything"]).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::UsageError);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_file_and_path_override() {
    let h = Harness::new();
    let cfg = h.temp_dir.path().join("devicedb.json");
    fs::write(
        &cfg,
        r#"{"path": "/nonexistent/db.json", "log_level": "warn"}"#,
    )
    .unwrap();

    let db = h.db_path();
    let cli = Cli::try_parse_from([
        "devicedb",
        "--config",
        cfg.to_str().unwrap(),
        "--path",
        db.as_str(),
        "-v",
        "init",
    ])
    .unwrap();

    let config = load_config(&cli).unwrap();
    assert_eq!(config.path, db);
    assert_eq!(config.log_level, "debug");
}

#[test]
fn test_missing_explicit_config_is_config_error() {
    let h = Harness::new();
    let cfg = h.temp_dir.path().join("missing.json");
    let cli = Cli::try_parse_from(["devicedb", "--config", cfg.to_str().unwrap(), "init"]).unwrap();

    let err = load_config(&cli).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::ConfigError);
}
