//! Integration tests for loading schema files and parsing through them.

use std::fs;

use argmatch::schema::{SchemaError, SchemaFile};
use argmatch::ParseError;
use serde_json::{json, Value};
use tempfile::TempDir;

const SCHEMA: &str = r#"
name = "deploy"
description = "Ship a build"

[[options]]
names = "-v,--verbose"
kind = "flag"

[[options]]
names = "-e,--env"
choices = ["staging", "production"]
loose_choices = true
default = "staging"

[[options]]
names = "--retries"
range = [0, 5]

[[options]]
names = "--tags"
kind = "list"
delimiter = ","

[[options]]
names = "--dry-run"
kind = "flag"
excludes = ["--force"]

[[options]]
names = "--force"
kind = "flag"

[[subcommands]]
name = "rollback"

[[subcommands.options]]
names = "release"
required = true
"#;

fn write_schema(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("schema.toml");
    fs::write(&path, content).unwrap();
    path
}

// =============================================================================
// LOADING
// =============================================================================

#[test]
fn loads_and_validates_file() {
    let dir = TempDir::new().unwrap();
    let schema = SchemaFile::load_from(&write_schema(&dir, SCHEMA)).unwrap();

    assert_eq!(schema.command.name, "deploy");
    assert_eq!(schema.command.options.len(), 6);
    assert_eq!(schema.command.subcommands[0].name, "rollback");
}

#[test]
fn missing_command_name_fails_validation() {
    let dir = TempDir::new().unwrap();
    let path = write_schema(&dir, "[[options]]\nnames = \"-v\"\n");

    let err = SchemaFile::load_from(&path).unwrap_err();
    assert!(matches!(err, SchemaError::ValidationError { .. }));
    assert!(err.to_string().starts_with("Schema validation failed"));
}

#[test]
fn parse_error_names_the_file() {
    let dir = TempDir::new().unwrap();
    let path = write_schema(&dir, "name = \"x\"\n[[options]\n");

    let err = SchemaFile::load_from(&path).unwrap_err();
    assert!(matches!(err, SchemaError::ParseError { .. }));
    assert!(err.to_string().contains("schema.toml"));
}

#[test]
fn unknown_policy_is_rejected() {
    let content = "name = \"x\"\n[[options]]\nnames = \"--a\"\npolicy = \"take_middle\"\n";
    assert!(SchemaFile::from_toml(content).is_err());
}

#[test]
fn duplicate_names_surface_as_construction_errors() {
    let content = "name = \"x\"\n[[options]]\nnames = \"-a\"\n[[options]]\nnames = \"-a,--all\"\n";
    let err = SchemaFile::from_toml(content).unwrap().build().err().unwrap();
    assert!(matches!(
        err,
        SchemaError::Construction(ParseError::IncorrectConstruction { .. })
    ));
}

// =============================================================================
// PARSING THROUGH A SCHEMA
// =============================================================================

#[test]
fn report_holds_bound_values() {
    let (mut app, bound) = SchemaFile::from_toml(SCHEMA).unwrap().build().unwrap();

    app.parse(["-vv", "--env", "PRODUCTION", "--tags", "a,b", "--tags", "c", "--retries=3"])
        .unwrap();
    let report = serde_json::to_value(bound.report(&app)).unwrap();

    assert_eq!(report["command"], "deploy");
    assert_eq!(report["values"]["--verbose"], 2);
    assert_eq!(report["values"]["--env"], "production");
    assert_eq!(report["values"]["--tags"], json!(["a", "b", "c"]));
    assert_eq!(report["values"]["--retries"], "3");
    assert_eq!(report["remaining"], json!([]));
    assert!(report.get("subcommand").is_none());
}

#[test]
fn default_fills_absent_value() {
    let (mut app, bound) = SchemaFile::from_toml(SCHEMA).unwrap().build().unwrap();
    app.parse(Vec::<String>::new()).unwrap();

    let report = bound.report(&app);
    assert_eq!(report.values["--env"], Value::from("staging"));
    assert_eq!(report.values["--retries"], Value::Null);
}

#[test]
fn schema_checks_are_enforced() {
    let (mut app, _) = SchemaFile::from_toml(SCHEMA).unwrap().build().unwrap();

    assert!(matches!(app.parse(["--env", "dev"]), Err(ParseError::Conversion { .. })));
    assert!(matches!(app.parse(["--retries", "9"]), Err(ParseError::Validation { .. })));
    assert!(matches!(
        app.parse(["--dry-run", "--force"]),
        Err(ParseError::Excludes { .. })
    ));
}

#[test]
fn subcommand_requirements_come_from_schema() {
    let (mut app, bound) = SchemaFile::from_toml(SCHEMA).unwrap().build().unwrap();

    assert!(matches!(app.parse(["rollback"]), Err(ParseError::Required { .. })));

    app.parse(["rollback", "v1.2"]).unwrap();
    let report = bound.report(&app);
    let sub = report.subcommand.unwrap();
    assert_eq!(sub.command, "rollback");
    assert_eq!(sub.values["release"], Value::from("v1.2"));
}
