// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Label mapping buckets, closed-status set, and the lazily grown milestone table
// role: mapping/labels
// inputs: Label mapping TOML ([open], [closed], [labels]); milestone prefix, numbering start, and date format
// outputs: LabelMap lookups; MilestoneTable entries ready for persistence
// invariants:
// - Milestone numbers are assigned sequentially from `start_from` in creation order
// - A milestone is open iff some open issue referenced it; otherwise closed
// - Milestone labels are removed from the label map once extracted
// errors: Unparsable milestone labels and dates become diagnostics; unreadable mapping files are fatal
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::diag::{DiagnosticKind, Diagnostics};
use crate::model::Milestone;

static DUE_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[([^\]]+)\]\s*").unwrap());

/// On-disk label mapping. Keys are source labels (or statuses), values the target label.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
  pub open: IndexMap<String, String>,
  pub closed: IndexMap<String, String>,
  pub labels: IndexMap<String, String>,
}

impl LabelConfig {
  pub fn load(path: &Path) -> Result<Self> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading label map {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing label map {}", path.display()))
  }
}

#[derive(Debug, Default)]
pub struct LabelMap {
  map: IndexMap<String, String>,
  closed: IndexSet<String>,
}

impl LabelMap {
  pub fn from_config(cfg: LabelConfig) -> Self {
    let closed: IndexSet<String> = cfg.closed.keys().cloned().collect();
    let mut map = IndexMap::new();
    for section in [cfg.open, cfg.closed, cfg.labels] {
      map.extend(section);
    }
    Self { map, closed }
  }

  /// Mapped label; unmapped labels map to themselves. An empty result means "drop".
  pub fn map_label<'a>(&'a self, label: &'a str) -> &'a str {
    self.map.get(label).map(String::as_str).unwrap_or(label)
  }

  pub fn is_closed_status(&self, status: &str) -> bool {
    self.closed.contains(status)
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }
}

#[derive(Debug)]
pub struct MilestoneTable {
  prefix: String,
  start_from: u64,
  entries: IndexMap<String, Milestone>,
}

impl MilestoneTable {
  pub fn new(prefix: &str, start_from: u64) -> Self {
    Self { prefix: prefix.to_string(), start_from, entries: IndexMap::new() }
  }

  /// Value part of a milestone label (`Milestone-1.0` → `1.0`), if `label` carries the prefix.
  fn milestone_value<'a>(&self, label: &'a str) -> Option<&'a str> {
    let (kind, value) = label.split_once('-').unwrap_or((label, ""));
    (kind == self.prefix).then_some(value)
  }

  pub fn is_milestone_label(&self, label: &str) -> bool {
    self.milestone_value(label).is_some()
  }

  /// Look up or lazily create the milestone for `label`. Returns its key in the table.
  pub fn get_or_create(&mut self, label: &str, warn_duplicate: bool, diag: &mut Diagnostics) -> Option<String> {
    let value = self.milestone_value(label)?;
    if value.is_empty() {
      diag.report(DiagnosticKind::Milestone, format!("unable to parse milestone name: '{}'", label));
      return None;
    }

    if self.entries.contains_key(value) {
      if warn_duplicate {
        diag.report(DiagnosticKind::Milestone, format!("duplicate milestone: '{}'", value));
      }
    } else {
      let number = self.entries.len() as u64 + self.start_from;
      tracing::debug!(number, title = value, "new milestone");
      self.entries.insert(
        value.to_string(),
        Milestone {
          number,
          title: value.to_string(),
          state: "closed".to_string(),
          due_on: None,
          description: None,
          created_at: None,
        },
      );
    }
    Some(value.to_string())
  }

  pub fn get(&self, key: &str) -> Option<&Milestone> {
    self.entries.get(key)
  }

  pub fn get_mut(&mut self, key: &str) -> Option<&mut Milestone> {
    self.entries.get_mut(key)
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Milestone> {
    self.entries.values()
  }

  /// Record that an issue referenced milestone `key`.
  pub fn note_issue(&mut self, key: &str, issue_created_at: &str, issue_open: bool) -> Option<u64> {
    let m = self.entries.get_mut(key)?;
    if m.created_at.is_none() {
      m.created_at = Some(issue_created_at.to_string());
    }
    if issue_open {
      m.state = "open".to_string();
    }
    Some(m.number)
  }

  /// Move milestone-prefixed entries out of `labels` into this table.
  ///
  /// Values may start with `[date]` (parsed with `date_format`) which becomes
  /// `due_on`; the remainder becomes the description.
  pub fn extract_from(&mut self, labels: &mut LabelMap, date_format: &str, diag: &mut Diagnostics) {
    let keys: Vec<String> = labels.map.keys().cloned().collect();

    for label in keys {
      let description = labels.map.get(&label).cloned().unwrap_or_default();
      let Some(key) = self.get_or_create(&label, true, diag) else {
        if description.split_whitespace().count() > 1 {
          diag.report(
            DiagnosticKind::Label,
            format!("non-single-word GitHub issue label: '{}'", description),
          );
        }
        continue;
      };
      labels.map.shift_remove(&label);

      let mut rest = description.as_str();
      let mut due_on = None;
      if let Some(caps) = DUE_DATE_RE.captures(rest) {
        let date_text = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        match parse_due_date(date_text, date_format) {
          Some(d) => due_on = Some(d),
          None => diag.report(
            DiagnosticKind::Milestone,
            format!("unable to parse milestone date '{}' with format '{}'", date_text, date_format),
          ),
        }
        rest = &rest[caps.get(0).map(|m| m.end()).unwrap_or(0)..];
      }

      if let Some(m) = self.get_mut(&key) {
        m.state = "closed".to_string();
        if due_on.is_some() {
          m.due_on = due_on;
        }
        if !rest.is_empty() {
          m.description = Some(rest.to_string());
        }
      }
    }
  }
}

/// Route a source label either to a milestone (returning its key) or through
/// the label map into `labels_to_add`, skipping empty and repeated labels.
/// A milestone label with no usable value is kept as a plain label.
pub fn add_label_or_milestone(
  label: &str,
  labels_to_add: &mut Vec<String>,
  label_map: &LabelMap,
  milestones: &mut MilestoneTable,
  diag: &mut Diagnostics,
) -> Option<String> {
  if milestones.is_milestone_label(label) {
    if let Some(key) = milestones.get_or_create(label, false, diag) {
      return Some(key);
    }
  }

  let mapped = label_map.map_label(label);
  if !mapped.is_empty() && !labels_to_add.iter().any(|l| l == mapped) {
    labels_to_add.push(mapped.to_string());
  }
  None
}

fn parse_due_date(text: &str, format: &str) -> Option<String> {
  let dt = NaiveDateTime::parse_from_str(text, format)
    .ok()
    .or_else(|| NaiveDate::parse_from_str(text, format).ok().and_then(|d| d.and_hms_opt(0, 0, 0)))?;
  Some(format!("{}Z", dt.format("%Y-%m-%dT%H:%M:%S")))
}
