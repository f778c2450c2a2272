//! Integration tests for opflow
//!
//! These tests drive the binary against order record files in a temp directory.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

/// Helper to create an opflow Command
fn opflow() -> Command {
    cargo_bin_cmd!("opflow")
}

/// Helper to create an opflow Command rooted in `dir`
fn opflow_in(dir: &TempDir) -> Command {
    let mut cmd = opflow();
    cmd.current_dir(dir.path()).env_remove("OPFLOW_LOG");
    cmd
}

fn write_order(dir: &TempDir, order: &str, records: Value) {
    fs::write(
        dir.path().join(format!("{}.json", order)),
        serde_json::to_string_pretty(&records).unwrap(),
    )
    .unwrap();
}

/// Body runs Activation -> Cut -> Sew -> QC -> Pack, with a second Sew
/// sequence that skips QC.
fn garment_records() -> Value {
    json!([
        {"operation": "Activation", "component": "Body", "next_operation": "Cut", "sequence_no": 1},
        {"operation": "Cut", "component": "Body", "next_operation": "Sew", "sequence_no": 1},
        {"operation": "Sew", "component": "Body", "next_operation": "QC", "sequence_no": 1},
        {"operation": "Sew", "component": "Body", "next_operation": "Pack", "sequence_no": 2},
        {"operation": "QC", "component": "Body", "next_operation": "Pack", "sequence_no": 1},
        {"operation": "Pack", "component": "Body", "next_operation": null, "sequence_no": 1}
    ])
}

fn cyclic_records() -> Value {
    json!([
        {"operation": "Cut", "component": "Body", "next_operation": "Sew"},
        {"operation": "Sew", "component": "Body", "next_operation": "Pack"},
        {"operation": "Pack", "component": "Body", "next_operation": "Cut"}
    ])
}

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_order(&dir, "TRK-1", garment_records());
    write_order(&dir, "TRK-BAD", cyclic_records());
    dir
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_opflow_help() {
        opflow()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("skipped"));
    }

    #[test]
    fn test_opflow_version() {
        opflow().arg("--version").assert().success();
    }

    #[test]
    fn test_missing_order_fails() {
        let dir = setup();
        opflow_in(&dir)
            .args(["next", "TRK-404", "-o", "Cut", "-c", "Body"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("TRK-404"));
    }

    #[test]
    fn test_data_dir_flag() {
        let data = setup();
        let elsewhere = TempDir::new().unwrap();
        opflow_in(&elsewhere)
            .arg("--data-dir")
            .arg(data.path())
            .args(["is-final", "TRK-1", "-o", "Pack", "-c", "Body"])
            .assert()
            .success()
            .stdout("true\n");
    }
}

// =============================================================================
// Validation
// =============================================================================

mod validate {
    use super::*;

    #[test]
    fn test_valid_order() {
        let dir = setup();
        opflow_in(&dir)
            .args(["validate", "TRK-1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Order TRK-1: 6 operations"))
            .stdout(predicate::str::contains("Operation map is valid."));
    }

    #[test]
    fn test_cyclic_order_fails_with_errors() {
        let dir = setup();
        opflow_in(&dir)
            .args(["validate", "TRK-BAD"])
            .assert()
            .failure()
            .stdout(predicate::str::contains(
                "Cycle detected in operation flow: Pack(Body) -> Cut(Body)",
            ))
            .stdout(predicate::str::contains("No final operation found"))
            .stderr(predicate::str::contains("is invalid"));
    }

    #[test]
    fn test_missing_activation_is_a_warning() {
        let dir = setup();
        write_order(
            &dir,
            "TRK-2",
            json!([
                {"operation": "Cut", "component": "Body", "next_operation": "Pack"},
                {"operation": "Pack", "component": "Body", "next_operation": ""}
            ]),
        );
        opflow_in(&dir)
            .args(["validate", "TRK-2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Warnings:"))
            .stdout(predicate::str::contains("No activation operations found"));
    }

    #[test]
    fn test_queries_refuse_invalid_order() {
        let dir = setup();
        opflow_in(&dir)
            .args(["next", "TRK-BAD", "-o", "Cut", "-c", "Body"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid operation map for order TRK-BAD"));
    }
}

// =============================================================================
// Queries
// =============================================================================

mod queries {
    use super::*;

    #[test]
    fn test_next_and_previous() {
        let dir = setup();
        opflow_in(&dir)
            .args(["next", "TRK-1", "-o", "Cut", "-c", "Body"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Sew(Body)\tseq 1"))
            .stdout(predicate::str::contains("Sew(Body)\tseq 2"));

        opflow_in(&dir)
            .args(["previous", "TRK-1", "-o", "Pack", "-c", "Body"])
            .assert()
            .success()
            .stdout(predicate::str::contains("QC(Body)"))
            .stdout(predicate::str::contains("Sew(Body)\tseq 2"));
    }

    #[test]
    fn test_next_of_unknown_operation_is_empty() {
        let dir = setup();
        opflow_in(&dir)
            .args(["next", "TRK-1", "-o", "Weld", "-c", "Body"])
            .assert()
            .success()
            .stdout("");
    }

    #[test]
    fn test_history() {
        let dir = setup();
        opflow_in(&dir)
            .args(["history", "TRK-1", "-o", "QC", "-c", "Body"])
            .assert()
            .success()
            .stdout("Sew\nCut\nActivation\n");
    }

    #[test]
    fn test_is_final() {
        let dir = setup();
        opflow_in(&dir)
            .args(["is-final", "TRK-1", "-o", "Pack", "-c", "Body"])
            .assert()
            .success()
            .stdout("true\n");
        opflow_in(&dir)
            .args(["is-final", "TRK-1", "-o", "QC", "-c", "Body"])
            .assert()
            .success()
            .stdout("false\n");
    }

    #[test]
    fn test_skipped() {
        let dir = setup();
        opflow_in(&dir)
            .args(["skipped", "TRK-1", "-c", "Body", "--last", "Activation", "--current", "QC"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cut(Body)"))
            .stdout(predicate::str::contains("Sew(Body)"))
            .stdout(predicate::str::contains("QC(Body)").not());
    }

    #[test]
    fn test_final_production() {
        let dir = setup();
        opflow_in(&dir)
            .args(["final-production", "TRK-1"])
            .assert()
            .success()
            .stdout("Pack\n");
    }

    #[test]
    fn test_final_production_reports_predecessor_of_release_step() {
        let dir = setup();
        write_order(
            &dir,
            "TRK-3",
            json!([
                {"operation": "Activation", "component": "Body", "next_operation": "Pack"},
                {"operation": "Pack", "component": "Body", "next_operation": "Tag Release"},
                {"operation": "Tag Release", "component": "Body", "next_operation": null}
            ]),
        );
        fs::write(
            dir.path().join("opflow.toml"),
            r#"
[classification]
rules = [
  { kind = "activation", keywords = ["activation"] },
  { kind = "unlink", keywords = ["release"] },
]
"#,
        )
        .unwrap();

        opflow_in(&dir)
            .args(["final-production", "TRK-3"])
            .assert()
            .success()
            .stdout("Pack\n");
    }

    #[test]
    fn test_flows() {
        let dir = setup();
        opflow_in(&dir)
            .args(["flows", "TRK-1", "-c", "Body"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Activation -> Cut -> Sew -> Pack"));
    }

    #[test]
    fn test_status() {
        let dir = setup();
        let output = opflow_in(&dir)
            .args(["status", "TRK-1", "-c", "Body", "--last", "QC"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let status: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(status["component"], "Body");
        assert_eq!(status["next_operations"], json!(["Pack"]));
        assert_eq!(status["is_completed"], false);
    }

    #[test]
    fn test_by_kind() {
        let dir = setup();
        opflow_in(&dir)
            .args(["by-kind", "TRK-1", "qc"])
            .assert()
            .success()
            .stdout("QC(Body)\tseq 1\n");

        opflow_in(&dir)
            .args(["by-kind", "TRK-1", "welding"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid operation kind"));
    }
}

// =============================================================================
// Export and statistics
// =============================================================================

mod export {
    use super::*;

    #[test]
    fn test_export_json() {
        let dir = setup();
        let output = opflow_in(&dir)
            .args(["export", "TRK-1"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let export: Value = serde_json::from_slice(&output).unwrap();

        assert_eq!(export["order_id"], "TRK-1");
        assert_eq!(export["components"], json!(["Body"]));
        assert_eq!(export["nodes"].as_array().unwrap().len(), 6);
        assert_eq!(export["validation"]["is_valid"], true);
    }

    #[test]
    fn test_stats_json() {
        let dir = setup();
        let output = opflow_in(&dir)
            .args(["stats", "TRK-1"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let stats: Value = serde_json::from_slice(&output).unwrap();

        assert_eq!(stats["total_operations"], 6);
        assert_eq!(stats["total_components"], 1);
        assert_eq!(stats["has_activation"], true);
        assert_eq!(stats["has_unlink_operations"], false);
        assert_eq!(stats["operation_kinds"]["QC"], 1);
    }
}

// =============================================================================
// Process map conversion
// =============================================================================

mod convert {
    use super::*;

    fn process_map() -> Value {
        json!({
            "name": "Shirt",
            "nodes": [
                {"id": "n1", "label": "Cut"},
                {"id": "n2", "label": "Sew"},
                {"id": "n3", "label": "Pack"}
            ],
            "edges": [
                {"source": "n1", "target": "n2", "components": ["Body", "Sleeve"]},
                {"source": "n2", "target": "n3", "components": ["Body"]}
            ]
        })
    }

    #[test]
    fn test_convert_to_file_then_validate() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("shirt.json"), process_map().to_string()).unwrap();

        opflow_in(&dir)
            .args(["convert", "shirt.json", "-o", "TRK-9.json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Wrote 5 edge records"));

        let records: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("TRK-9.json")).unwrap())
                .unwrap();
        assert_eq!(records.as_array().unwrap().len(), 5);

        // Body ends at Pack and Sleeve ends at Sew: two terminal components
        opflow_in(&dir)
            .args(["validate", "TRK-9"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Multiple final components found: Body, Sleeve"));
    }

    #[test]
    fn test_convert_to_stdout() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("shirt.json"), process_map().to_string()).unwrap();

        opflow_in(&dir)
            .args(["convert", "shirt.json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"next_operation\": \"Sew\""));
    }

    #[test]
    fn test_convert_missing_file() {
        let dir = TempDir::new().unwrap();
        opflow_in(&dir)
            .args(["convert", "missing.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read process map"));
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = TempDir::new().unwrap();
        opflow_in(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No opflow.toml found"))
            .stdout(predicate::str::contains("multiple_terminal_components = \"error\""));
    }

    #[test]
    fn test_config_init_then_validate() {
        let dir = TempDir::new().unwrap();
        opflow_in(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created opflow.toml"));
        assert!(dir.path().join("opflow.toml").exists());

        opflow_in(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        opflow_in(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("opflow.toml"),
            "[classification]\nrules = []\n",
        )
        .unwrap();

        opflow_in(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("no rules"));
    }

    #[test]
    fn test_lenient_terminal_policy_from_config() {
        let dir = TempDir::new().unwrap();
        write_order(
            &dir,
            "TRK-5",
            json!([
                {"operation": "Activation", "component": "Body", "next_operation": "Pack"},
                {"operation": "Pack", "component": "Body", "next_operation": null},
                {"operation": "Activation", "component": "Sleeve", "next_operation": "Hem"},
                {"operation": "Hem", "component": "Sleeve", "next_operation": null}
            ]),
        );

        opflow_in(&dir)
            .args(["validate", "TRK-5"])
            .assert()
            .failure();

        fs::write(
            dir.path().join("custom.toml"),
            "[terminal]\nmultiple_terminal_components = \"warning\"\n",
        )
        .unwrap();

        opflow_in(&dir)
            .args(["--config", "custom.toml", "validate", "TRK-5"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Multiple final components found: Body, Sleeve"));
    }
}
