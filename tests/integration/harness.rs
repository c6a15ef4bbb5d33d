use std::path::Path;

use test_support::{read_fixture_text, FakeServer, Route};

pub const BIN: &str = "gcode-issue-export";

pub const GIST_RESPONSE: &str = r#"{
  "html_url": "https://gist.github.com/abc123",
  "files": { "notes.txt": { "raw_url": "https://gist.githubusercontent.com/acme/abc123/raw/notes.txt" } }
}"#;

/// Tracker and Gist API for the `demo` project served from one fake host.
pub fn demo_server() -> FakeServer {
  FakeServer::start(vec![
    Route::get("/p/demo/issues/csv", "text/csv", read_fixture_text("demo/issues.csv")),
    Route::get("/p/demo/issues/detail?id=1", "text/html", read_fixture_text("demo/detail-1.html")),
    Route::get("/p/demo/issues/detail?id=2", "text/html", read_fixture_text("demo/detail-2.html")),
    Route::get("/files/notes.txt", "text/plain", "stack trace goes here\n"),
    Route::post("/gists", 201, GIST_RESPONSE),
  ])
}

/// Export command pointed at `server`, writing into `out`.
pub fn export_cmd(server: &FakeServer, out: &Path) -> assert_cmd::Command {
  let mut cmd = test_support::cmd_bin(BIN);
  cmd
    .current_dir(out)
    .env("GITHUB_TOKEN", "test-token")
    .env_remove("GH_TOKEN")
    .env_remove("RUST_LOG")
    .arg("demo")
    .args(["--github-repo", "acme/demo"])
    .args(["--export-date", "2015-03-12T00:00:00Z"])
    .arg("--source-base-url")
    .arg(server.url())
    .arg("--gist-api-url")
    .arg(server.url())
    .arg("--out-dir")
    .arg(out);
  cmd
}

pub fn read_json(path: &Path) -> serde_json::Value {
  let text = std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
  serde_json::from_str(&text).expect("valid JSON")
}
