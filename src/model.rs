// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the persisted GitHub import records plus the per-message working state that never reaches JSON
// role: model/types
// outputs: IssueRecord, CommentRecord, Milestone, AttachmentBundle; Issue/Comment pairing record + extra; Message view
// invariants:
// - Only *Record and Milestone types are serialized into issue/comment/milestone files
// - Extra state is composed 1:1 with its record and dropped after persistence
// - `milestone` is omitted from issue JSON when unset; nullable user/assignee/closed_at are kept as null
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::paragraphs::Paragraph;
use crate::updates::UpdateEvent;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct IssueRecord {
  pub number: u64,
  pub title: String,
  pub state: String,
  pub closed_at: Option<String>,
  pub created_at: String,
  pub updated_at: String,
  pub user: Option<String>,
  pub assignee: Option<String>,
  pub labels: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub milestone: Option<u64>,
  pub body: String,
}

impl IssueRecord {
  pub fn is_closed(&self) -> bool {
    self.state == "closed"
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CommentRecord {
  pub created_at: String,
  pub updated_at: String,
  pub user: Option<String>,
  pub body: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Milestone {
  pub number: u64,
  pub title: String,
  pub state: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_on: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
}

/// Re-hosted attachment files: the Gist page plus raw URLs keyed by file name.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AttachmentBundle {
  pub url: String,
  pub files: IndexMap<String, String>,
}

/// Working state shared by issues and comments.
#[derive(Debug, Clone, Default)]
pub struct MessageExtra {
  /// Canonical permalink on the source tracker; the cache key for bodies and attachments.
  pub link: String,
  pub issue_number: u64,
  pub orig_user: String,
  /// True when `orig_user` resolved through the author map (not via fallback).
  pub user_mapped: bool,
  pub paragraphs: Vec<Paragraph>,
  pub refs: IndexSet<String>,
  pub attachments: Option<AttachmentBundle>,
}

#[derive(Debug, Clone, Default)]
pub struct IssueExtra {
  pub message: MessageExtra,
  pub orig_owner: String,
  pub owner_mapped: bool,
  pub cc: Vec<String>,
  pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentExtra {
  pub message: MessageExtra,
  /// 1-based position among the issue's comments.
  pub nr: usize,
  pub updates: UpdateEvent,
}

#[derive(Debug, Clone, Default)]
pub struct Issue {
  pub record: IssueRecord,
  pub extra: IssueExtra,
}

#[derive(Debug, Clone, Default)]
pub struct Comment {
  pub record: CommentRecord,
  pub extra: CommentExtra,
}

impl Issue {
  pub fn comment_records(&self) -> Vec<CommentRecord> {
    self.extra.comments.iter().map(|c| c.record.clone()).collect()
  }
}

/// Borrowed view over either message kind so rendering has one entry point.
#[derive(Clone, Copy, Debug)]
pub enum Message<'a> {
  Issue(&'a Issue),
  Comment(&'a Comment),
}

impl<'a> Message<'a> {
  pub fn extra(&self) -> &'a MessageExtra {
    match self {
      Message::Issue(i) => &i.extra.message,
      Message::Comment(c) => &c.extra.message,
    }
  }

  pub fn created_at(&self) -> &'a str {
    match self {
      Message::Issue(i) => &i.record.created_at,
      Message::Comment(c) => &c.record.created_at,
    }
  }

  pub fn link(&self) -> &'a str {
    &self.extra().link
  }

  pub fn is_issue(&self) -> bool {
    matches!(self, Message::Issue(_))
  }

  /// Short label for log lines: `issue 12` or `comment 3 of issue 12`.
  pub fn describe(&self) -> String {
    match self {
      Message::Issue(i) => format!("issue {}", i.record.number),
      Message::Comment(c) => format!("comment {} of issue {}", c.extra.nr, c.extra.message.issue_number),
    }
  }
}
