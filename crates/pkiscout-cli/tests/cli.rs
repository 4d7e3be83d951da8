//! End-to-end tests for the `pkiscout` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RSA_FP: &str = "952679f858cfdb1f477a1c19b9ddab21b60941ff4e7e973f503526a5c8e33299";

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../pkiscout/testdata")
        .join(name)
}

fn place(dir: &Path, rel: &str, name: &str) {
    let dest = dir.join(rel);
    fs::create_dir_all(dest.parent().unwrap()).unwrap();
    fs::copy(fixture(name), dest).unwrap();
}

/// A binary that cannot see the user's config or search path.
fn pkiscout(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pkiscout").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("PKISCOUT_PATH")
        .env_remove("PKISCOUT_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn list_pairs_key_and_certificate() {
    let home = TempDir::new().unwrap();
    let tree = TempDir::new().unwrap();
    place(tree.path(), "tls/server.key", "rsa.key");
    place(tree.path(), "tls/server.crt", "rsa.crt");

    let output = pkiscout(&home)
        .args(["-o", "json", "list", "-r"])
        .arg(tree.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["outcome"], "complete");
    assert_eq!(report["count"], 1);
    let identity = &report["identities"][0];
    assert_eq!(identity["fingerprint"], RSA_FP);
    assert_eq!(identity["matched_by"], "derived");
    assert_eq!(identity["algorithm"], "RSA");
    assert_eq!(identity["certificate_details"].as_array().unwrap().len(), 1);
}

#[test]
fn scan_reads_search_path() {
    let home = TempDir::new().unwrap();
    let tree = TempDir::new().unwrap();
    place(tree.path(), "ec.pub", "ec.pub");
    place(tree.path(), "rsa.crt", "rsa.crt");

    pkiscout(&home)
        .args(["-o", "json", "scan", "-t", "public key"])
        .env("PKISCOUT_PATH", tree.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 1"))
        .stdout(predicate::str::contains("ec.pub"))
        .stdout(predicate::str::contains("rsa.crt").not());
}

#[test]
fn scan_without_roots_fails() {
    let home = TempDir::new().unwrap();

    pkiscout(&home)
        .arg("scan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No search roots"));
}

#[test]
fn find_prints_first_match() {
    let home = TempDir::new().unwrap();
    let tree = TempDir::new().unwrap();
    place(tree.path(), "a/b/server.pem", "bundle.pem");

    pkiscout(&home)
        .args(["find", "b/server.pem", "--recursive"])
        .arg(tree.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("server.pem"));

    pkiscout(&home)
        .args(["find", "missing.pem", "-r"])
        .arg(tree.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn config_file_supplies_roots() {
    let home = TempDir::new().unwrap();
    let tree = TempDir::new().unwrap();
    place(tree.path(), "ec.key", "ec.key");

    let config = home.path().join("pkiscout.toml");
    fs::write(
        &config,
        format!("roots = [{:?}]\noutput_format = \"json\"\n", tree.path()),
    )
    .unwrap();

    pkiscout(&home)
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"matched_by\": \"derived\""));
}
