use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fiscai(config_dir: &TempDir) -> Command {
    let config = config_dir.path().join("config.json");
    if !config.exists() {
        fs::write(&config, "{}").unwrap();
    }
    let mut cmd = Command::cargo_bin("fiscai").unwrap();
    cmd.arg("-c").arg(config);
    cmd
}

/// Copy the named fixtures into a fresh directory and return a glob over it.
fn fixture_dir(names: &[&str]) -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    for name in names {
        fs::copy(fixture(name), dir.path().join(name)).unwrap();
    }
    let pattern = format!("{}/*.xml", dir.path().display());
    (dir, pattern)
}

#[test]
fn test_analyze_text_report() {
    let config = TempDir::new().unwrap();
    fiscai(&config)
        .arg("analyze")
        .arg(fixture("nfe_internet_6102.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("CFOP: 6102"))
        .stdout(predicate::str::contains("NFe35240112345678000199550010000010011000010010"))
        .stdout(predicate::str::contains("non-presential operation, internet"))
        .stdout(predicate::str::contains("MUST BE REVIEWED"));
}

#[test]
fn test_analyze_json_output() {
    let config = TempDir::new().unwrap();
    let output = fiscai(&config)
        .args(["analyze", "--format", "json"])
        .arg(fixture("nfe_presencial_6108.xml"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "nfe_presencial_6108.xml");
    assert_eq!(json["fields"]["cfop"], "6108");
    assert_eq!(json["fields"]["cnpj"], "12345678000199");
    assert_eq!(json["classification"]["status"], "correct");
    assert_eq!(json["classification"]["presence"], "in_person");
    assert_eq!(json["classification"]["is_correct"], true);
}

#[test]
fn test_analyze_csv_output() {
    let config = TempDir::new().unwrap();
    fiscai(&config)
        .args(["analyze", "-f", "csv"])
        .arg(fixture("nfe_internet_5102.xml"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("filename,id,cnpj"))
        .stdout(predicate::str::contains("nfe_internet_5102.xml"))
        .stdout(predicate::str::contains("correct"));
}

#[test]
fn test_analyze_exports_canonical_json() {
    let config = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let export = out.path().join("tree.json");

    fiscai(&config)
        .arg("analyze")
        .arg(fixture("nfe_internet_6102.xml"))
        .arg("--export-json")
        .arg(&export)
        .assert()
        .success();

    let tree: Value = serde_json::from_str(&fs::read_to_string(&export).unwrap()).unwrap();
    let inf = &tree["NFe"]["infNFe"];
    assert_eq!(inf["@attributes"]["versao"], "4.00");
    assert_eq!(inf["det"].as_array().unwrap().len(), 2);
    assert_eq!(inf["det"][1]["prod"]["CFOP"], "6102");
    assert_eq!(inf["infAdic"]["infCpl"], "Pedido 4521 & entrega agendada");
    assert_eq!(tree["@attributes"]["versao"], "4.00");
}

#[test]
fn test_analyze_missing_file() {
    let config = TempDir::new().unwrap();
    fiscai(&config)
        .args(["analyze", "does-not-exist.xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_analyze_malformed_file() {
    let config = TempDir::new().unwrap();
    fiscai(&config)
        .arg("analyze")
        .arg(fixture("broken.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse broken.xml"));
}

#[test]
fn test_analyze_respects_config() {
    let config = TempDir::new().unwrap();
    fs::write(
        config.path().join("config.json"),
        r#"{"classification": {"sensitive_cfops": []}}"#,
    )
    .unwrap();

    fiscai(&config)
        .arg("analyze")
        .arg(fixture("nfe_internet_6102.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: CORRECT"));
}

#[test]
fn test_batch_json_counts_skip_failures() {
    let config = TempDir::new().unwrap();
    let (_dir, pattern) = fixture_dir(&[
        "nfe_internet_6102.xml",
        "nfe_presencial_6108.xml",
        "nfe_internet_5102.xml",
        "broken.xml",
    ]);

    let output = fiscai(&config)
        .args(["batch", &pattern, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["documents"].as_array().unwrap().len(), 3);
    assert_eq!(report["failures"].as_array().unwrap().len(), 1);
    assert_eq!(report["failures"][0]["name"], "broken.xml");

    let cfop_total: u64 = report["cfop_counts"]
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(cfop_total, 3);
    assert_eq!(report["classification_counts"]["non-presential operation, internet"], 2);
    assert_eq!(report["classification_counts"]["in-person operation"], 1);
}

#[test]
fn test_batch_text_report() {
    let config = TempDir::new().unwrap();
    let (_dir, pattern) = fixture_dir(&[
        "nfe_internet_6102.xml",
        "nfe_presencial_6108.xml",
        "broken.xml",
    ]);

    fiscai(&config)
        .args(["batch", &pattern])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 3 files to process"))
        .stdout(predicate::str::contains("nfe_internet_6102.xml (must be reviewed)"))
        .stdout(predicate::str::contains("CFOP 6102: 1"))
        .stdout(predicate::str::contains("Showing documents 1 to 2 of 2 (page 1/1)"))
        .stdout(predicate::str::contains("Failed files:"))
        .stdout(predicate::str::contains("broken.xml"));
}

#[test]
fn test_batch_filter_and_pagination() {
    let config = TempDir::new().unwrap();
    let (_dir, pattern) = fixture_dir(&[
        "nfe_internet_6102.xml",
        "nfe_presencial_6108.xml",
        "nfe_internet_5102.xml",
    ]);

    fiscai(&config)
        .args(["batch", &pattern, "--filter", "incorrect"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nfe_internet_6102.xml (must be reviewed)"))
        .stdout(predicate::str::contains("nfe_presencial_6108.xml (correct)").not());

    // files are processed in path order: 5102, 6102, 6108
    fiscai(&config)
        .args(["batch", &pattern, "--page", "2", "--page-size", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nfe_presencial_6108.xml (correct)"))
        .stdout(predicate::str::contains("nfe_internet_5102.xml").not())
        .stdout(predicate::str::contains("Showing documents 3 to 3 of 3 (page 2/2)"));
}

#[test]
fn test_batch_writes_exports_and_summary() {
    let config = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let (_dir, pattern) = fixture_dir(&["nfe_internet_6102.xml", "broken.xml"]);

    fiscai(&config)
        .args(["batch", &pattern, "--summary", "-o"])
        .arg(out.path())
        .assert()
        .success();

    assert!(out.path().join("nfe_internet_6102.json").exists());
    assert!(!out.path().join("broken.json").exists());

    let summary = fs::read_to_string(out.path().join("summary.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("filename,status,id"));
    assert!(summary.contains("nfe_internet_6102.xml,success"));
    assert!(summary.contains("broken.xml,error"));
}

#[test]
fn test_batch_fail_fast() {
    let config = TempDir::new().unwrap();
    let (_dir, pattern) = fixture_dir(&["broken.xml", "nfe_internet_6102.xml"]);

    fiscai(&config)
        .args(["batch", &pattern, "--fail-fast"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn test_batch_no_matches() {
    let config = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let pattern = format!("{}/*.xml", dir.path().display());

    fiscai(&config)
        .args(["batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files found"));
}

#[test]
fn test_config_uses_global_config_flag() {
    let config = TempDir::new().unwrap();

    fiscai(&config)
        .args(["config", "set", "report.items_per_page", "5"])
        .assert()
        .success();

    let saved: Value =
        serde_json::from_str(&fs::read_to_string(config.path().join("config.json")).unwrap())
            .unwrap();
    assert_eq!(saved["report"]["items_per_page"], 5);

    fiscai(&config)
        .args(["config", "get", "report.items_per_page"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5"));

    fiscai(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(config.path().join("config.json").display().to_string()));
}
