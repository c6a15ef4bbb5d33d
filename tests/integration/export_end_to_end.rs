use super::harness::{demo_server, export_cmd, read_json};
use test_support::fixtures_dir;

#[test]
fn exports_issues_comments_and_milestones() {
  let server = demo_server();
  let td = test_support::tempdir();
  let out = td.path();

  export_cmd(&server, out)
    .arg("--authors-json")
    .arg(fixtures_dir().join("demo/authors.json"))
    .assert()
    .success();

  let first = read_json(&out.join("issues/1.json"));
  assert_eq!(first["number"], 1);
  assert_eq!(first["title"], "Crash on startup");
  assert_eq!(first["state"], "closed");
  assert_eq!(first["user"], "rep-gh");
  assert_eq!(first["created_at"], "2009-04-29T10:13:20Z");
  assert_eq!(first["milestone"], 1);
  let body = first["body"].as_str().unwrap();
  assert!(body.contains("same as #2"), "body: {body}");
  assert!(body.contains("on Gist](https://gist.github.com/abc123)"), "body: {body}");

  let comments = read_json(&out.join("issues/1.comments.json"));
  assert_eq!(comments.as_array().unwrap().len(), 1);
  assert_eq!(comments[0]["created_at"], "2009-04-21T10:02:01Z");
  assert_eq!(comments[0]["user"], "rep-gh");
  assert!(comments[0]["body"].as_str().unwrap().contains("Still happens on the nightly build."));

  let second = read_json(&out.join("issues/2.json"));
  assert_eq!(second["state"], "open");
  assert_eq!(second["title"], "Support 50&#37; zoom");
  assert!(second["user"].is_null());
  assert!(second.get("milestone").is_none());
  assert_eq!(read_json(&out.join("issues/2.comments.json")), serde_json::json!([]));

  let milestone = read_json(&out.join("milestones/1.json"));
  assert_eq!(milestone["title"], "1.0");
  assert_eq!(milestone["state"], "closed");
}

#[test]
fn attachments_are_posted_once_with_token_and_cached() {
  let server = demo_server();
  let td = test_support::tempdir();

  export_cmd(&server, td.path()).assert().success();
  assert_eq!(server.count("POST", "/gists"), 1);
  assert_eq!(server.count("GET", "/files/notes.txt"), 1);

  let post = server.requests().into_iter().find(|r| r.method == "POST").unwrap();
  assert_eq!(post.header("Authorization"), Some("Bearer test-token"));
  let payload: serde_json::Value = serde_json::from_str(&post.body).unwrap();
  assert_eq!(payload["public"], false);
  assert_eq!(payload["files"]["notes.txt"]["content"], "stack trace goes here\n");
  assert!(payload["description"].as_str().unwrap().contains("acme/demo#1"));

  let cache = read_json(&td.path().join(".attachments-cache.json"));
  assert!(cache.to_string().contains("https://gist.github.com/abc123"));

  export_cmd(&server, td.path()).assert().success();
  assert_eq!(server.count("POST", "/gists"), 1);
  assert_eq!(server.count("GET", "/files/notes.txt"), 1);
}

#[test]
fn disabled_attachment_cache_republishes_and_writes_nothing() {
  let server = demo_server();
  let td = test_support::tempdir();

  for _ in 0..2 {
    export_cmd(&server, td.path()).arg("--no-cache-attachments").assert().success();
  }
  assert_eq!(server.count("POST", "/gists"), 2);
  assert!(!td.path().join(".attachments-cache.json").exists());
}

#[test]
fn skip_closed_and_offsets_shape_output() {
  let server = demo_server();
  let td = test_support::tempdir();

  export_cmd(&server, td.path())
    .args(["--skip-closed", "--issues-start-from", "100"])
    .assert()
    .success();

  assert!(!td.path().join("issues/100.json").exists());
  let second = read_json(&td.path().join("issues/101.json"));
  assert_eq!(second["number"], 101);
}

#[test]
fn messages_output_lists_rendered_messages() {
  let server = demo_server();
  let td = test_support::tempdir();
  let dump = td.path().join("messages.txt");

  export_cmd(&server, td.path()).arg("--messages-output").arg(&dump).assert().success();

  let text = std::fs::read_to_string(&dump).unwrap();
  assert!(text.contains("https://code.google.com/p/demo/issues/detail?id=1"));
  assert!(text.contains("https://code.google.com/p/demo/issues/detail?id=2"));
}
