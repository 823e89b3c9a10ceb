// tests/cli_test.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("sharrd").unwrap();
    cmd.arg("--version").assert().success().stdout(predicate::str::contains("sharrd"));
}

#[test]
fn test_split_help() {
    let mut cmd = Command::cargo_bin("sharrd").unwrap();
    cmd.arg("split").arg("--help").assert().success();
}

#[test]
fn test_init_writes_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");

    Command::cargo_bin("sharrd")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written"));

    let contents = fs::read_to_string(&config).unwrap();
    assert!(contents.contains("block_size"));
}

#[test]
fn test_split_and_combine_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{ "block_size": 100 }"#).unwrap();

    let input = dir.path().join("data.bin");
    let data: Vec<u8> = (0..250u32).map(|i| (i * 7 % 256) as u8).collect();
    fs::write(&input, &data).unwrap();
    let prefix = dir.path().join("data-").display().to_string();

    Command::cargo_bin("sharrd")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "split"])
        .arg(&input)
        .args(["--prefix", &prefix, "-n", "5", "-t", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 blocks"));

    let output = dir.path().join("restored.bin");
    Command::cargo_bin("sharrd")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "combine"])
        .arg(dir.path().join("data-2of5.json"))
        .arg(dir.path().join("data-4of5.json"))
        .arg(dir.path().join("data-5of5.json"))
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    assert_eq!(fs::read(&output).unwrap(), data);

    // Two parts are not enough for a 3-of-5 split
    Command::cargo_bin("sharrd")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "combine"])
        .arg(dir.path().join("data-1of5.json"))
        .arg(dir.path().join("data-2of5.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("need 3 input files"));
}

#[test]
fn test_split_key_and_combine_key() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    let prefix = dir.path().join("key-").display().to_string();

    Command::cargo_bin("sharrd")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "split-key"])
        .args(["--prefix", &prefix, "-n", "3", "-t", "2"])
        .write_stdin("correct horse battery staple")
        .assert()
        .success();

    Command::cargo_bin("sharrd")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "combine-key"])
        .arg(dir.path().join("key-1of3.json"))
        .arg(dir.path().join("key-3of3.json"))
        .assert()
        .success()
        .stdout("correct horse battery staple");
}
