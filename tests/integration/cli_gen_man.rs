use super::harness::BIN;

#[test]
fn gen_man_outputs_troff() {
  let out = test_support::cmd_bin(BIN).args(["--gen-man"]).output().unwrap();
  assert!(out.status.success());
  let text = String::from_utf8_lossy(&out.stdout);
  assert!(text.starts_with(".TH"), "expected troff man header");
  assert!(text.contains("gcode-issue-export"));
}
