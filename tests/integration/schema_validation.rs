use jsonschema::validator_for;

use super::harness::{demo_server, export_cmd, read_json};

fn compile_schema(name: &str) -> jsonschema::Validator {
  let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
  let path = manifest_dir.join("tests").join("schemas").join(name);
  let data = std::fs::read(&path).expect("schema file");
  let schema: serde_json::Value = serde_json::from_slice(&data).expect("valid schema JSON");
  validator_for(&schema).expect("compile schema")
}

#[test]
fn exported_records_conform_to_import_schemas() {
  let server = demo_server();
  let td = test_support::tempdir();
  export_cmd(&server, td.path()).assert().success();

  let issue = compile_schema("issue.schema.json");
  let comments = compile_schema("comments.schema.json");
  let milestone = compile_schema("milestone.schema.json");

  for n in [1, 2] {
    let dir = td.path().join("issues");
    issue.validate(&read_json(&dir.join(format!("{n}.json")))).expect("issue record");
    comments.validate(&read_json(&dir.join(format!("{n}.comments.json")))).expect("comment records");
  }
  milestone.validate(&read_json(&td.path().join("milestones/1.json"))).expect("milestone record");
}

#[test]
fn schemas_reject_malformed_records() {
  let issue = compile_schema("issue.schema.json");
  assert!(!issue.is_valid(&serde_json::json!({ "number": 1, "title": "x" })));
  assert!(!issue.is_valid(&serde_json::json!({
    "number": 1, "title": "x", "state": "pending", "closed_at": null,
    "created_at": "2009-04-29T10:13:20Z", "updated_at": "2009-04-29T10:13:20Z",
    "user": null, "assignee": null, "labels": [], "body": ""
  })));
}
