// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for JSON artifact writing, source-tracker date handling, indentation, and man page rendering
// role: utilities/helpers
// inputs: Serializable values and paths; raw date strings and epoch seconds; clap CommandFactory
// outputs: Key-sorted 4-space JSON files, ISO-8601 `Z` timestamps, output directories, man page text
// side_effects: write_json and prepare_out_dir touch the filesystem
// invariants:
// - write_json output is key-sorted at every depth, 4-space indented, newline-terminated
// - parse_gcode_date never fails; unparsable input is returned unchanged
// errors: IO and serialization errors bubble with the offending path in context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use clap::CommandFactory;
use serde::Serialize;
use serde_json::Value;

const GCODE_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Recursively rebuild objects so keys come out in sorted order regardless of
/// how serde_json's map type is configured.
pub fn sort_keys(v: Value) -> Value {
  match v {
    Value::Object(map) => {
      let sorted: BTreeMap<String, Value> = map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
      Value::Object(sorted.into_iter().collect())
    }
    Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
    other => other,
  }
}

pub fn to_json_string<T: Serialize + ?Sized>(obj: &T) -> Result<String> {
  let value = sort_keys(serde_json::to_value(obj)?);
  let mut buf = Vec::new();
  let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
  let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
  value.serialize(&mut ser)?;
  buf.push(b'\n');
  Ok(String::from_utf8(buf)?)
}

pub fn write_json<T: Serialize + ?Sized>(obj: &T, path: &Path) -> Result<()> {
  let text = to_json_string(obj)?;
  std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

/// `Tue Apr 21 10:02:01 2009` → `2009-04-21T10:02:01Z`; anything else is returned as-is.
pub fn parse_gcode_date(date_text: &str) -> String {
  match NaiveDateTime::parse_from_str(date_text.trim(), GCODE_DATE_FORMAT) {
    Ok(dt) => format!("{}Z", dt.format("%Y-%m-%dT%H:%M:%S")),
    Err(_) => date_text.to_string(),
  }
}

pub fn timestamp_to_date(epoch: i64) -> Option<String> {
  DateTime::<Utc>::from_timestamp(epoch, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Parse the `...Z` timestamps this crate produces.
pub fn parse_iso(dt_str: &str) -> Option<NaiveDateTime> {
  NaiveDateTime::parse_from_str(dt_str.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S").ok()
}

pub fn now_iso() -> String {
  Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn reindent(s: &str, n: usize) -> String {
  let pad = " ".repeat(n);
  s.lines().map(|l| format!("{}{}", pad, l)).collect::<Vec<_>>().join("\n")
}

/// Join items with `sep`, formatting each through `fmt`.
pub fn format_list<I, S>(items: I, fmt: impl Fn(&str) -> String, sep: &str) -> String
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  items.into_iter().map(|s| fmt(s.as_ref())).collect::<Vec<_>>().join(sep)
}

/// Ensure `<out>/issues` and `<out>/milestones` exist; returns the output root.
pub fn prepare_out_dir(out: &Path) -> Result<PathBuf> {
  let root = out.to_path_buf();
  for sub in ["issues", "milestones"] {
    let dir = root.join(sub);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
  }
  Ok(root)
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
