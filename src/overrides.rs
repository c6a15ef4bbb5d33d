// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Read and write the hand-editable message override file (`<!-- id checksum -->` delimited blocks)
// role: io/overrides
// inputs: Override file path; link-keyed message bodies
// outputs: Ordered map link → body text
// side_effects: write_messages renames an existing file to `<file>-old` before writing
// invariants:
// - A header line is exactly four whitespace-separated fields `<!--`, id, hex sha256(id), `-->`
// - Lines that are not valid headers (including bad checksums) belong to the current body
// - Text before the first header is discarded
// - Bodies round-trip exactly; the blank line written after each body is dropped on read
// errors: IO failures propagate with the file path in context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};

pub fn message_checksum(msg_id: &str) -> String {
  let mut h = Sha256::new();
  h.update(msg_id.as_bytes());
  hex::encode(h.finalize())
}

fn header_id(line: &str) -> Option<&str> {
  let frags: Vec<&str> = line.split_whitespace().collect();
  match frags.as_slice() {
    ["<!--", id, checksum, "-->"] if *checksum == message_checksum(id) => Some(*id),
    _ => None,
  }
}

pub fn parse_messages(text: &str) -> IndexMap<String, String> {
  let mut messages: IndexMap<String, String> = IndexMap::new();
  let mut current: Option<String> = None;

  for line in text.split_inclusive('\n') {
    if let Some(id) = header_id(line) {
      messages.entry(id.to_string()).or_default();
      current = Some(id.to_string());
      continue;
    }
    if let Some(id) = &current {
      messages.entry(id.clone()).or_default().push_str(line);
    }
  }

  // render_messages appends one blank line after every body
  for body in messages.values_mut() {
    if body.ends_with("\n\n") {
      body.truncate(body.len() - 2);
    }
  }
  messages
}

pub fn read_messages(path: &Path) -> Result<IndexMap<String, String>> {
  let text = std::fs::read_to_string(path).with_context(|| format!("reading message overrides {}", path.display()))?;
  let messages = parse_messages(&text);
  tracing::info!("Read {} overrides from {}", messages.len(), path.display());
  Ok(messages)
}

pub fn render_messages(messages: &IndexMap<String, String>) -> String {
  let mut out = String::new();
  for (id, body) in messages {
    let _ = writeln!(out, "<!--  {}   {}  -->", id, message_checksum(id));
    out.push_str(body);
    out.push_str("\n\n");
  }
  out
}

pub fn write_messages(messages: &IndexMap<String, String>, path: &Path) -> Result<()> {
  if path.exists() {
    let mut old = path.as_os_str().to_owned();
    old.push("-old");
    let old = PathBuf::from(old);
    std::fs::rename(path, &old).with_context(|| format!("renaming {} to {}", path.display(), old.display()))?;
  }
  std::fs::write(path, render_messages(messages)).with_context(|| format!("writing message overrides {}", path.display()))?;
  tracing::info!("Wrote {} messages to {}", messages.len(), path.display());
  Ok(())
}
