// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn a comment's "issue updated" box into an UpdateEvent and render it as quoted Markdown lines
// role: translation/updates
// inputs: (key, value) paragraphs from the update box; author map, label map, milestone table, issue offset
// outputs: UpdateEvent; `> `-prefixed annotation lines
// invariants:
// - Ids/labels present in both the added and removed side of one field are elided from both
// - Equal old/new milestones leave both unset
// - Render order: assignment, close/reopen, merge target, merged-from, milestone, blocking, blocked-on, labels
// errors: Non-numeric issue tokens become diagnostics and are skipped
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use crate::authors::AuthorMap;
use crate::diag::{DiagnosticKind, Diagnostics};
use crate::labels::{add_label_or_milestone, LabelMap, MilestoneTable};
use crate::paragraphs::Paragraph;
use crate::util::format_list;

const UNASSIGNED: &str = "---";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OwnerChange {
  Unassigned,
  Assigned { orig: String, login: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeTarget {
  Unmerged,
  Issue(u64),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateEvent {
  pub owner: Option<OwnerChange>,
  pub status: Option<String>,
  pub merged_into: Option<MergeTarget>,
  pub old_milestone: Option<String>,
  pub new_milestone: Option<String>,
  pub new_blocked_on: Vec<u64>,
  pub old_blocked_on: Vec<u64>,
  pub new_blocking: Vec<u64>,
  pub old_blocking: Vec<u64>,
  pub new_labels: Vec<String>,
  pub old_labels: Vec<String>,
  /// Set from the "#N has been merged into this issue." comment text.
  pub merged_issue: Option<u64>,
  /// Set from the "This issue was closed by <hash>." comment text.
  pub close_commit: Option<String>,
}

/// Borrowed session state needed while translating one update box.
pub struct UpdateTranslator<'a> {
  pub authors: &'a AuthorMap,
  pub labels: &'a LabelMap,
  pub milestones: &'a mut MilestoneTable,
  pub issues_start_from: u64,
  pub diag: &'a mut Diagnostics,
}

impl<'a> UpdateTranslator<'a> {
  pub fn translate(&mut self, pairs: &[Paragraph]) -> UpdateEvent {
    let mut u = UpdateEvent::default();

    for pair in pairs {
      let key = pair.title.split(':').next().unwrap_or("");
      let value = pair.body.as_str();

      match key {
        "Blockedon" => {
          self.issue_list(value, &mut u.new_blocked_on, &mut u.old_blocked_on);
          elide_common(&mut u.new_blocked_on, &mut u.old_blocked_on);
        }
        "Blocking" => {
          self.issue_list(value, &mut u.new_blocking, &mut u.old_blocking);
          elide_common(&mut u.new_blocking, &mut u.old_blocking);
        }
        "Labels" => {
          self.label_list(value, &mut u);
          elide_common(&mut u.new_labels, &mut u.old_labels);
        }
        "Owner" => {
          u.owner = match value {
            UNASSIGNED => Some(OwnerChange::Unassigned),
            "" => None,
            orig => {
              let mapped = self.authors.map_author(orig, "owner", true, self.diag);
              Some(OwnerChange::Assigned { orig: orig.to_string(), login: mapped.login })
            }
          };
        }
        "Status" => u.status = Some(value.to_string()).filter(|s| !s.is_empty()),
        "Mergedinto" => {
          let ref_text = value.rsplit(':').next().unwrap_or("");
          u.merged_into = if ref_text.is_empty() {
            Some(MergeTarget::Unmerged)
          } else {
            self.issue_number(ref_text).map(MergeTarget::Issue)
          };
        }
        other => tracing::debug!(key = other, "ignoring update field"),
      }
    }

    if u.old_milestone.is_some() && u.old_milestone == u.new_milestone {
      u.old_milestone = None;
      u.new_milestone = None;
    }

    u
  }

  fn issue_number(&mut self, text: &str) -> Option<u64> {
    match text.trim().parse::<u64>() {
      Ok(n) => Some(n + (self.issues_start_from.max(1) - 1)),
      Err(_) => {
        self
          .diag
          .report(DiagnosticKind::UnresolvedReference, format!("unparsable issue reference '{}'", text));
        None
      }
    }
  }

  fn issue_list(&mut self, value: &str, added: &mut Vec<u64>, removed: &mut Vec<u64>) {
    for word in value.split_whitespace() {
      let (word, target) = match word.strip_prefix('-') {
        Some(w) => (w, &mut *removed),
        None => (word, &mut *added),
      };
      let ref_text = word.rsplit(':').next().unwrap_or("");
      if let Some(n) = self.issue_number(ref_text) {
        if !target.contains(&n) {
          target.push(n);
        }
      }
    }
  }

  fn label_list(&mut self, value: &str, u: &mut UpdateEvent) {
    for word in value.split_whitespace() {
      let (word, is_removed) = match word.strip_prefix('-') {
        Some(w) => (w, true),
        None => (word, false),
      };
      let target = if is_removed { &mut u.old_labels } else { &mut u.new_labels };
      if let Some(key) = add_label_or_milestone(word, target, self.labels, self.milestones, self.diag) {
        let title = self.milestones.get(&key).map(|m| m.title.clone());
        if is_removed {
          u.old_milestone = title;
        } else {
          u.new_milestone = title;
        }
      }
    }
  }
}

fn elide_common<T: PartialEq + Clone>(added: &mut Vec<T>, removed: &mut Vec<T>) {
  let common: Vec<T> = removed.iter().filter(|x| added.contains(x)).cloned().collect();
  added.retain(|x| !common.contains(x));
  removed.retain(|x| !common.contains(x));
}

/// `**local**@domain` for users without a target login.
pub fn format_orig_user(orig: &str) -> String {
  match orig.split_once('@') {
    Some((local, domain)) => format!("**{}**@{}", local, domain),
    None => format!("**{}**", orig),
  }
}

/// Render an UpdateEvent as `> `-prefixed lines; empty when nothing changed.
pub fn render_updates(u: &UpdateEvent, labels: &LabelMap) -> String {
  let mut lines: Vec<String> = Vec::new();
  let issue_list = |ids: &[u64]| format_list(ids.iter().map(|n| n.to_string()), |s| format!("**#{}**", s), ", ");

  match &u.owner {
    Some(OwnerChange::Unassigned) => lines.push("Unassigned".into()),
    Some(OwnerChange::Assigned { orig, login }) => {
      let who = match login {
        Some(l) => format!("@{}", l),
        None => format_orig_user(orig),
      };
      lines.push(format!("Assigned to {}", who));
    }
    None => {}
  }

  if let Some(status) = &u.status {
    if labels.is_closed_status(status) {
      match &u.close_commit {
        Some(commit) => lines.push(format!("Closed in **{}**", commit)),
        None => lines.push(format!("Closed with status **{}**", status)),
      }
    } else {
      lines.push(format!("Reopened, status set to **{}**", status));
    }
  }

  match &u.merged_into {
    Some(MergeTarget::Unmerged) => lines.push("Unmerged".into()),
    Some(MergeTarget::Issue(n)) => lines.push(format!("Merged into **#{}**", n)),
    None => {}
  }

  if let Some(n) = u.merged_issue {
    lines.push(format!("Issue **#{}** has been merged into this issue", n));
  }

  match (&u.old_milestone, &u.new_milestone) {
    (Some(old), Some(new)) => lines.push(format!("Moved from the **{}** milestone to **{}**", old, new)),
    (Some(old), None) => lines.push(format!("Removed from the **{}** milestone", old)),
    (None, Some(new)) => lines.push(format!("Added to the **{}** milestone", new)),
    (None, None) => {}
  }

  if !u.old_blocking.is_empty() {
    lines.push(format!("No more blocking {}", issue_list(&u.old_blocking)));
  }
  if !u.new_blocking.is_empty() {
    lines.push(format!("Blocking {}", issue_list(&u.new_blocking)));
  }
  if !u.old_blocked_on.is_empty() {
    lines.push(format!("No more blocked on {}", issue_list(&u.old_blocked_on)));
  }
  if !u.new_blocked_on.is_empty() {
    lines.push(format!("Blocked on {}", issue_list(&u.new_blocked_on)));
  }

  let label_list = |ls: &[String]| format_list(ls, |s| format!("**`{}`**", s), ", ");
  let plural = if u.new_labels.len() + u.old_labels.len() > 1 { "s" } else { "" };
  match (u.new_labels.is_empty(), u.old_labels.is_empty()) {
    (false, false) => lines.push(format!(
      "Added {} and removed {} labels",
      label_list(&u.new_labels),
      label_list(&u.old_labels)
    )),
    (false, true) => lines.push(format!("Added {} label{}", label_list(&u.new_labels), plural)),
    (true, false) => lines.push(format!("Removed {} label{}", label_list(&u.old_labels), plural)),
    (true, true) => {}
  }

  lines.iter().map(|l| format!("> {}", l)).collect::<Vec<_>>().join("\n")
}
