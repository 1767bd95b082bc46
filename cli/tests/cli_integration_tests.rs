//! End-to-end tests for the `sonobat` CLI binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const FFUF_SAMPLE: &str = r#"{
    "commandline": "ffuf -u http://10.0.0.1/FUZZ -w words.txt",
    "config": {"url": "http://10.0.0.1/admin", "method": "GET"},
    "results": [
        {"url": "http://10.0.0.1/admin?id=1", "status": 200},
        {"url": "http://10.0.0.1/admin?id=2", "status": 200}
    ]
}"#;

fn cmd_in(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("sonobat").unwrap();
    cmd.current_dir(dir);
    cmd.env("SONOBAT_DB_PATH", dir.join("sonobat.db"));
    cmd
}

#[test]
fn version_flag_reports_the_binary_name() {
    let mut cmd = Command::cargo_bin("sonobat").unwrap();
    cmd.arg("--version").assert().success().stdout(predicate::str::contains("sonobat"));
}

#[test]
fn help_lists_every_subcommand() {
    let mut cmd = Command::cargo_bin("sonobat").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ingest"))
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("list-facts"))
        .stdout(predicate::str::contains("presets"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn presets_lists_the_compiled_in_presets() {
    let dir = tempdir().unwrap();
    cmd_in(dir.path())
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("Compiled-in presets"));
}

#[test]
fn validate_reports_counts_for_a_well_formed_ffuf_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fuzz.json");
    std::fs::write(&path, FFUF_SAMPLE).unwrap();

    cmd_in(dir.path())
        .arg("validate")
        .arg("ffuf")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("File is valid"))
        .stdout(predicate::str::contains("Hosts: 1"));
}

#[test]
fn validate_rejects_an_unknown_tool_name() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fuzz.json");
    std::fs::write(&path, FFUF_SAMPLE).unwrap();

    cmd_in(dir.path())
        .arg("validate")
        .arg("not-a-real-tool")
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn validate_reports_malformed_json_as_invalid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fuzz.json");
    std::fs::write(&path, "not json at all").unwrap();

    cmd_in(dir.path())
        .arg("validate")
        .arg("ffuf")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("File is invalid"));
}

#[test]
fn ingest_then_list_facts_round_trips_through_the_persisted_db() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fuzz.json");
    std::fs::write(&path, FFUF_SAMPLE).unwrap();

    cmd_in(dir.path())
        .arg("ingest")
        .arg("ffuf")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Hosts created: 1"));

    assert!(dir.path().join("sonobat.db").exists());

    cmd_in(dir.path())
        .arg("list-facts")
        .arg("--predicate")
        .arg("host")
        .assert()
        .success()
        .stdout(predicate::str::contains("host("));
}

#[test]
fn ingesting_the_same_file_twice_does_not_duplicate_the_host() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fuzz.json");
    std::fs::write(&path, FFUF_SAMPLE).unwrap();

    for _ in 0..2 {
        cmd_in(dir.path()).arg("ingest").arg("ffuf").arg(&path).assert().success();
    }

    cmd_in(dir.path())
        .arg("list-facts")
        .arg("--predicate")
        .arg("host")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 facts"));
}

#[test]
fn query_with_a_preset_name_runs_against_the_ingested_graph() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fuzz.json");
    std::fs::write(&path, FFUF_SAMPLE).unwrap();

    cmd_in(dir.path()).arg("ingest").arg("ffuf").arg(&path).assert().success();

    cmd_in(dir.path())
        .arg("query")
        .arg("--name")
        .arg("attack_surface")
        .assert()
        .success()
        .stdout(predicate::str::contains("Query Result"));
}

#[test]
fn query_json_format_emits_parseable_json() {
    let dir = tempdir().unwrap();
    let program_path = dir.path().join("query.dl");
    std::fs::write(&program_path, "?- host(I,A,K).").unwrap();

    cmd_in(dir.path())
        .arg("query")
        .arg("--file")
        .arg(&program_path)
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"goal\""));
}

#[test]
fn query_requires_exactly_one_of_name_or_file() {
    let dir = tempdir().unwrap();
    cmd_in(dir.path()).arg("query").assert().failure();
}

#[test]
fn ingest_with_missing_file_fails() {
    let dir = tempdir().unwrap();
    cmd_in(dir.path())
        .arg("ingest")
        .arg("ffuf")
        .arg("/nonexistent/fuzz.json")
        .assert()
        .failure();
}

#[test]
fn unknown_subcommand_is_rejected() {
    let dir = tempdir().unwrap();
    cmd_in(dir.path()).arg("not-a-subcommand").assert().failure();
}
