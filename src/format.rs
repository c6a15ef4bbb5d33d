// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Render issues and comments into final GitHub body text (Markdown or Textile) with a link-keyed body cache
// role: rendering/messages
// inputs: Message view (record + extra), target repo, absolute-links flag, label map, message cache
// outputs: Final body text; cache entries for every rendered link
// invariants:
// - Messages created at or after 2009-04-20T19:00:00Z render as Markdown; earlier ones as Textile; unparsable dates as Markdown
// - The cache holds Markdown bodies only; a hit is used verbatim, header and footer are always rendered around it
// - Textile messages bypass the cache
// - Results of 65534 chars or more collapse to a fixed placeholder with exactly one diagnostic
// errors: None raised; fenced bodies and oversized results become diagnostics
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::diag::{DiagnosticKind, Diagnostics};
use crate::labels::LabelMap;
use crate::model::{AttachmentBundle, Message};
use crate::paragraphs::{join_paragraphs, Paragraph};
use crate::refs::GITHUB_URL;
use crate::updates::{format_orig_user, render_updates};
use crate::util::{format_list, parse_iso, reindent};

pub const MAX_BODY_CHARS: usize = 65534;
pub const TOO_LONG_PLACEHOLDER: &str = "FIXME: too long issue body";

static MARKDOWN_CUTOVER: Lazy<NaiveDateTime> = Lazy::new(|| parse_iso("2009-04-20T19:00:00Z").unwrap_or_default());

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dialect {
  Markdown,
  Textile,
}

pub fn dialect_for(created_at: &str) -> Dialect {
  match parse_iso(created_at) {
    Some(dt) if dt < *MARKDOWN_CUTOVER => Dialect::Textile,
    _ => Dialect::Markdown,
  }
}

/// Canonical link → Markdown body (without header and footer). Preloaded entries (overrides) win over rendering.
#[derive(Debug, Default)]
pub struct MessageCache {
  entries: IndexMap<String, String>,
}

impl MessageCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_entries(entries: IndexMap<String, String>) -> Self {
    Self { entries }
  }

  pub fn get(&self, link: &str) -> Option<&str> {
    self.entries.get(link).map(String::as_str)
  }

  pub fn insert(&mut self, link: &str, body: String) {
    self.entries.insert(link.to_string(), body);
  }

  pub fn entries(&self) -> &IndexMap<String, String> {
    &self.entries
  }
}

pub struct Formatter<'a> {
  pub github_repo: &'a str,
  pub absolute_links: bool,
  pub labels: &'a LabelMap,
}

impl<'a> Formatter<'a> {
  pub fn format(&self, m: Message<'_>, cache: &mut MessageCache, diag: &mut Diagnostics) -> String {
    let text = match dialect_for(m.created_at()) {
      Dialect::Markdown => self.markdown(m, cache, diag),
      Dialect::Textile => self.textile(m),
    };

    if text.chars().count() >= MAX_BODY_CHARS {
      diag.report(DiagnosticKind::OversizedBody, format!("too long {} body", m.describe()));
      return TOO_LONG_PLACEHOLDER.to_string();
    }
    text
  }

  fn markdown(&self, m: Message<'_>, cache: &mut MessageCache, diag: &mut Diagnostics) -> String {
    let extra = m.extra();
    let mut blocks: Vec<String> = Vec::new();

    if !extra.user_mapped {
      let kind = if m.is_issue() { "Reported" } else { "Comment" };
      blocks.push(format!("<sup>{} by {}</sup>\n", kind, format_orig_user(&extra.orig_user)));
    }

    let body = match cache.get(m.link()) {
      Some(hit) => {
        tracing::debug!(link = m.link(), "using cached message body");
        hit.to_string()
      }
      None => {
        let rendered = markdown_body(&extra.paragraphs, &m.describe(), diag);
        cache.insert(m.link(), rendered.clone());
        rendered
      }
    };
    if !body.is_empty() {
      blocks.push(body);
    }

    let mut footer = String::new();
    match m {
      Message::Issue(issue) => {
        if !issue.extra.cc.is_empty() {
          footer.push_str(&format!("Cc: {}", format_list(&issue.extra.cc, |s| format!("@{}", s), ", ")));
        }
        if !issue.extra.owner_mapped && !issue.extra.orig_owner.is_empty() {
          if !footer.is_empty() {
            footer.push('\n');
          }
          footer.push_str(&format!("> Originally assigned to {}", format_orig_user(&issue.extra.orig_owner)));
        }
      }
      Message::Comment(comment) => footer = render_updates(&comment.extra.updates, self.labels),
    }

    if let Some(bundle) = &extra.attachments {
      if !footer.is_empty() {
        footer.push_str("\n>\n");
      }
      footer.push_str(&attachments_line(bundle));
    }
    if !footer.is_empty() {
      blocks.push(footer);
    }

    blocks.join("\n")
  }

  fn issue_ref(&self, n: &str) -> String {
    if self.absolute_links {
      format!("\"#{}\":{}/{}/issues/{}", n, GITHUB_URL, self.github_repo, n)
    } else {
      format!("\"#{}\"", n)
    }
  }

  fn textile(&self, m: Message<'_>) -> String {
    let extra = m.extra();
    let quoted = |s: &str| format!("\"{}\":{}", s, s);
    let mut body = format!("bc.. {}\n", join_paragraphs(&extra.paragraphs));

    if let Message::Issue(issue) = m {
      body.push_str(&format!(
        "\np. Original issue for {}: {}\n\np. Original author: {}\n",
        self.issue_ref(&issue.record.number.to_string()),
        quoted(&extra.link),
        quoted(&extra.orig_user)
      ));
    }

    let issue_refs: Vec<String> =
      extra.refs.iter().filter_map(|r| r.strip_prefix('#')).map(|n| self.issue_ref(n)).collect();
    if !issue_refs.is_empty() {
      body.push_str(&format!("\np. Referenced issues: {}\n", issue_refs.join(", ")));
    }

    match m {
      Message::Issue(issue) => {
        if !issue.extra.orig_owner.is_empty() {
          body.push_str(&format!("\np. Original owner: {}\n", quoted(&issue.extra.orig_owner)));
        }
      }
      Message::Comment(_) => {
        body.push_str(&format!("\np. Original comment: {}\n", quoted(&extra.link)));
        body.push_str(&format!("\np. Original author: {}\n", quoted(&extra.orig_user)));
      }
    }

    body
  }
}

/// Markdown body: `##### ` headings for titles, fenced code blocks for bodies.
pub fn markdown_body(paragraphs: &[Paragraph], what: &str, diag: &mut Diagnostics) -> String {
  let mut lines: Vec<String> = Vec::new();

  for p in paragraphs {
    for line in p.title.lines() {
      lines.push(format!("\n##### {}", line));
    }
    if !p.body.is_empty() {
      if p.body.contains("```") {
        diag.report(DiagnosticKind::FencedBody, format!("triple quotes in {} body", what));
        lines.push(reindent(&p.body, 4));
      } else {
        lines.push(format!("```\n{}\n```", p.body));
      }
    }
  }

  lines.join("\n").trim().to_string()
}

fn attachments_line(bundle: &AttachmentBundle) -> String {
  let files = bundle.files.iter().map(|(name, url)| format!("[**`{}`**]({})", name, url)).collect::<Vec<_>>();
  let all = if bundle.files.len() > 1 { " all" } else { "" };
  format!("Attached {} ([view{} on Gist]({}))", files.join(", "), all, bundle.url)
}
