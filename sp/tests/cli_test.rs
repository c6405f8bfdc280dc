//! CLI tests for the `sp` binary
//!
//! Each test runs in its own temp directory with HOME and the XDG dirs
//! pointed inside it, so no user config or log file is touched.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use specplan::domain::Workflow;
use tempfile::TempDir;

fn sp(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sp").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("NO_COLOR", "1")
        .env_remove("OPENROUTER_API_KEY");
    cmd
}

fn write(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

const EVENT_SPEC: &str = "We are organizing a two day conference for 300 attendees. \
    The event needs a venue near the airport, a keynote meeting room and catering.";

#[test]
fn test_templates_lists_builtin_ids() {
    let temp = TempDir::new().unwrap();
    sp(temp.path())
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("software_development"))
        .stdout(predicate::str::contains("research_project"))
        .stdout(predicate::str::contains("marketing_campaign"))
        .stdout(predicate::str::contains("event_planning"))
        .stdout(predicate::str::contains("business_strategy"));
}

#[test]
fn test_suggest_prints_matching_template() {
    let temp = TempDir::new().unwrap();
    let spec = write(temp.path(), "event.md", EVENT_SPEC);

    sp(temp.path())
        .arg("suggest")
        .arg(&spec)
        .assert()
        .success()
        .stdout(predicate::str::contains("event_planning"));
}

#[test]
fn test_suggest_rejects_short_document() {
    let temp = TempDir::new().unwrap();
    let spec = write(temp.path(), "short.md", "A conference.");

    sp(temp.path())
        .arg("suggest")
        .arg(&spec)
        .assert()
        .failure()
        .stderr(predicate::str::contains("too short"));
}

#[test]
fn test_export_writes_workflow_json() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("plans").join("software.json");

    sp(temp.path())
        .args(["export", "software_development", "-o"])
        .arg(&out)
        .assert()
        .success();

    let workflow = Workflow::import(&out).unwrap();
    assert_eq!(workflow.workflow_name, "Software Development Planning Workflow");
    assert_eq!(workflow.len(), 7);
}

#[test]
fn test_export_to_stdout() {
    let temp = TempDir::new().unwrap();
    sp(temp.path())
        .args(["export", "event_planning"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"workflow_name\""))
        .stdout(predicate::str::contains("\"output_format\""));
}

#[test]
fn test_export_unknown_template_fails() {
    let temp = TempDir::new().unwrap();
    sp(temp.path())
        .args(["export", "gardening"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gardening"))
        .stderr(predicate::str::contains("sp templates"));
}

#[test]
fn test_run_rejects_short_document_before_inference() {
    let temp = TempDir::new().unwrap();
    let spec = write(temp.path(), "short.md", "Build an app.");

    sp(temp.path())
        .args(["run", "--auto"])
        .arg(&spec)
        .assert()
        .failure()
        .stderr(predicate::str::contains("too short"));

    assert!(!temp.path().join("history").exists());
}

#[test]
fn test_run_without_api_key_fails() {
    let temp = TempDir::new().unwrap();
    let spec = write(temp.path(), "event.md", EVENT_SPEC);

    sp(temp.path())
        .args(["run", "--auto"])
        .arg(&spec)
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENROUTER_API_KEY"));
}

#[test]
fn test_run_rejects_unsupported_provider() {
    let temp = TempDir::new().unwrap();
    let spec = write(temp.path(), "event.md", EVENT_SPEC);
    let config = write(temp.path(), "specplan.yml", "llm:\n  provider: carrier-pigeon\n");

    sp(temp.path())
        .arg("-c")
        .arg(&config)
        .args(["run", "--template", "event_planning"])
        .arg(&spec)
        .assert()
        .failure()
        .stderr(predicate::str::contains("carrier-pigeon"));
}

#[test]
fn test_history_empty() {
    let temp = TempDir::new().unwrap();
    sp(temp.path())
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No runs recorded"));
}

#[test]
fn test_invalid_config_fails_before_reading_documents() {
    let temp = TempDir::new().unwrap();
    let short = write(temp.path(), "short.md", "Tiny.");
    let config = write(
        temp.path(),
        "specplan.yml",
        "chunking:\n  chunk-size: 100\n  chunk-overlap: 100\n",
    );

    sp(temp.path())
        .arg("-c")
        .arg(&config)
        .args(["run", "--auto"])
        .arg(&short)
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk-overlap"))
        .stderr(predicate::str::contains("too short").not());

    sp(temp.path())
        .arg("-c")
        .arg(&config)
        .arg("templates")
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk-overlap"));
}
