// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Split rendered legacy markup into (title, body) paragraphs and peel off tracker control sentences
// role: parsing/paragraphs
// inputs: Direct content nodes of a `pre` block or update box; the title tag name
// outputs: Ordered Paragraph list; ControlSentences captured from single-paragraph comments
// invariants:
// - Adjacent runs of the same class are merged before emission
// - Non-whitespace content is preserved in order
// - Text runs are skipped only when empty; element runs when their trimmed leading text is empty
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;

use crate::html::ContentNode;

pub const TITLE_TAG: &str = "b";
pub const NO_COMMENT_SENTINEL: &str = "(No comment was entered for this change.)";

static CLOSED_BY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^This issue was closed by ([0-9a-f]+)\.").unwrap());
static MERGED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#(\d+) has been merged into this issue\.").unwrap());
const REVIEW_STATUS_PREFIX: &str = "Set review issue status to:";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Paragraph {
  pub title: String,
  pub body: String,
}

impl Paragraph {
  pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
    Self { title: title.into(), body: body.into() }
  }
}

/// Side-channel facts carried by tracker-generated comment text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlSentences {
  pub close_commit: Option<String>,
  pub merged_issue: Option<u64>,
}

pub fn split_into_paragraphs(nodes: &[ContentNode], title_tag: &str) -> Vec<Paragraph> {
  let mut out = Vec::new();
  let mut was_title: Option<bool> = None;
  let mut title = String::new();
  let mut accum = String::new();

  for node in nodes {
    let (text, is_title) = match node {
      ContentNode::Text(t) => (t.as_str(), false),
      ContentNode::Element { tag, text } => (text.trim(), tag == title_tag),
    };
    if text.is_empty() {
      continue;
    }
    if was_title == Some(is_title) {
      accum.push_str(text);
      continue;
    }

    if let Some(prev_title) = was_title {
      let finished = accum.trim().to_string();
      if prev_title {
        title = finished;
      } else {
        out.push(Paragraph::new(std::mem::take(&mut title), finished));
      }
    }
    accum = text.to_string();
    was_title = Some(is_title);
  }

  match was_title {
    Some(true) => out.push(Paragraph::new(accum.trim(), "")),
    Some(false) => out.push(Paragraph::new(title, accum.trim())),
    None => {}
  }

  out
}

/// Plain body text: `title\nbody` blocks separated by blank lines.
pub fn join_paragraphs(paragraphs: &[Paragraph]) -> String {
  paragraphs
    .iter()
    .map(|p| format!("{}\n{}", p.title, p.body))
    .collect::<Vec<_>>()
    .join("\n\n")
    .trim()
    .to_string()
}

/// Remove tracker boilerplate from already-rewritten paragraphs.
///
/// Control sentences are recognized only on single-paragraph comments; the
/// no-comment sentinel is dropped from any message.
pub fn strip_control_sentences(paragraphs: &mut Vec<Paragraph>, is_comment: bool) -> ControlSentences {
  let mut control = ControlSentences::default();

  if is_comment && paragraphs.len() == 1 {
    let body = paragraphs[0].body.clone();
    if body == NO_COMMENT_SENTINEL || body.starts_with(REVIEW_STATUS_PREFIX) {
      paragraphs.clear();
    } else if let Some(caps) = CLOSED_BY_RE.captures(&body) {
      control.close_commit = Some(caps[1].to_string());
      paragraphs.clear();
    } else if let Some(caps) = MERGED_RE.captures(&body) {
      control.merged_issue = caps[1].parse().ok();
      paragraphs.clear();
    }
  }

  if paragraphs.len() == 1 && paragraphs[0].body == NO_COMMENT_SENTINEL {
    paragraphs.clear();
  }

  control
}
