use predicates::prelude::*;

use super::harness::{demo_server, export_cmd, BIN};

#[test]
fn missing_project_is_rejected() {
  let td = test_support::tempdir();
  test_support::cmd_bin(BIN)
    .current_dir(td.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("project"));
}

#[test]
fn start_after_end_is_rejected() {
  let td = test_support::tempdir();
  test_support::cmd_bin(BIN)
    .current_dir(td.path())
    .args(["demo", "--start-at", "5", "--end-at", "2"])
    .assert()
    .failure();
}

#[test]
fn unknown_config_key_is_rejected() {
  let td = test_support::tempdir();
  let config = td.path().join("config.toml");
  std::fs::write(&config, "[google]\nproject = \"demo\"\nbogus = 1\n").unwrap();
  test_support::cmd_bin(BIN)
    .current_dir(td.path())
    .arg("--config")
    .arg(&config)
    .assert()
    .failure();
}

#[test]
fn summary_fetch_failure_exits_non_zero() {
  let server = test_support::FakeServer::start(vec![]);
  let td = test_support::tempdir();
  export_cmd(&server, td.path()).assert().failure().stderr(predicate::str::contains("fetching issue summaries"));
  assert!(!td.path().join("issues/1.json").exists());
}

#[test]
fn project_can_come_from_config_file() {
  let server = demo_server();
  let td = test_support::tempdir();
  std::fs::write(td.path().join("config.toml"), "[google]\nproject = \"demo\"\nend-at = 1\n").unwrap();

  test_support::cmd_bin(BIN)
    .current_dir(td.path())
    .env("GITHUB_TOKEN", "test-token")
    .arg("--source-base-url")
    .arg(server.url())
    .arg("--gist-api-url")
    .arg(server.url())
    .arg("--out-dir")
    .arg(td.path())
    .assert()
    .success();

  assert!(td.path().join("issues/1.json").exists());
  assert!(!td.path().join("issues/2.json").exists());
}
