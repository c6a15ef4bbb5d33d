// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Recognize issue/revision/source-browse references in free text and rewrite them to GitHub targets
// role: rewriting/references
// inputs: Text, project name, target repo, issue offset, ordered revision tables
// outputs: Rewritten text plus the ordered list of produced reference strings
// invariants:
// - Matches never overlap; scanning resumes after each match
// - GitHub blob links for the target repo are never rescanned, so rewriting is idempotent
// - Unresolvable or value-less matches pass through byte-for-byte
// - Issue ids are shifted by (issues_start_from - 1)
// - Revision tables are queried most-recently-loaded first
// errors: Unresolved revisions become diagnostics, never Err
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::Regex;

use crate::diag::{DiagnosticKind, Diagnostics};

pub const GITHUB_URL: &str = "https://github.com";

/// A recognized pointer inside message text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reference {
  Issue { id: u64 },
  Revision { token: String },
  SourceLink {
    path: String,
    revision: Option<String>,
    line: Option<String>,
  },
}

/// One occurrence found by the scanner. `reference` is `None` for keyword-only
/// matches like "the issue is", which are consumed but never rewritten.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefMatch {
  pub start: usize,
  pub end: usize,
  pub reference: Option<Reference>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum HeadKind {
  Issue,
  Revision,
  Link,
}

/// Ordered revision translation tables. Index 0 is queried first.
#[derive(Clone, Debug, Default)]
pub struct RevisionMap {
  tables: Vec<IndexMap<String, String>>,
}

impl RevisionMap {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a table loaded after the existing ones; it takes priority.
  pub fn push_table(&mut self, table: IndexMap<String, String>) {
    self.tables.insert(0, table);
  }

  pub fn load_file(&mut self, path: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading commits map {}", path.display()))?;
    let table = parse_table(&text);
    let n = table.len();
    self.push_table(table);
    Ok(n)
  }

  pub fn is_empty(&self) -> bool {
    self.tables.iter().all(|t| t.is_empty())
  }

  /// A numeric token also matches an `r`-prefixed key (`123` finds `r123`).
  pub fn lookup(&self, token: &str) -> Option<&str> {
    let prefixed = if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
      Some(format!("r{}", token))
    } else {
      None
    };

    for table in &self.tables {
      if let Some(v) = table.get(token) {
        return Some(v.as_str());
      }
      if let Some(v) = prefixed.as_ref().and_then(|k| table.get(k)) {
        return Some(v.as_str());
      }
    }
    None
  }
}

/// Parse `key value` lines; blank lines and key-only lines are ignored.
pub fn parse_table(text: &str) -> IndexMap<String, String> {
  let mut out = IndexMap::new();

  for line in text.lines() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let key = parts.next().unwrap_or("").trim();
    let value = parts.next().unwrap_or("").trim();
    if key.is_empty() || value.is_empty() {
      continue;
    }
    out.insert(key.to_string(), value.to_string());
  }

  out
}

struct RefPatterns {
  issue_url: Regex,
  revision_url: Regex,
  browse_url: Regex,
  rewritten_url: Regex,
}

impl RefPatterns {
  fn compile(project: &str, github_repo: &str) -> Result<Self> {
    let p = regex::escape(project);
    let host = r"(?:https?://)?code\.google\.com/p/";

    Ok(Self {
      issue_url: Regex::new(&format!(r"^{host}{p}/issues/detail\?")).context("compiling issue url pattern")?,
      revision_url: Regex::new(&format!(r"^{host}{p}/source/detail\?")).context("compiling revision url pattern")?,
      browse_url: Regex::new(&format!(r#"^{host}{p}/source/browse/([\w\-.~%!'"@/]*)(\?)?"#))
        .context("compiling source browse pattern")?,
      rewritten_url: Regex::new(&format!(
        r#"^{}/{}/blob/[\w\-.~%!'"@/]*(?:#L\d+)?"#,
        regex::escape(GITHUB_URL),
        regex::escape(github_repo)
      ))
      .context("compiling rewritten link pattern")?,
    })
  }
}

pub struct RefRewriter {
  patterns: RefPatterns,
  project: String,
  github_repo: String,
  issues_start_from: u64,
  revisions: RevisionMap,
}

impl RefRewriter {
  pub fn new(project: &str, github_repo: &str, issues_start_from: u64, revisions: RevisionMap) -> Result<Self> {
    Ok(Self {
      patterns: RefPatterns::compile(project, github_repo)?,
      project: project.to_string(),
      github_repo: github_repo.to_string(),
      issues_start_from: issues_start_from.max(1),
      revisions,
    })
  }

  pub fn translate_issue(&self, id: u64) -> u64 {
    id + (self.issues_start_from - 1)
  }

  pub fn revisions(&self) -> &RevisionMap {
    &self.revisions
  }

  /// Rewrite every resolvable reference in `text`, appending each produced
  /// target to `refs` in order of appearance.
  pub fn rewrite(&self, text: &str, refs: &mut Vec<String>, diag: &mut Diagnostics) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;

    for m in self.scan(text) {
      let Some(target) = m.reference.as_ref().and_then(|r| self.resolve(r, diag)) else {
        continue;
      };
      tracing::trace!(">>> {:>50}  {}", target, &text[m.start..m.end]);
      out.push_str(&text[copied..m.start]);
      out.push_str(&target);
      refs.push(target);
      copied = m.end;
    }

    out.push_str(&text[copied..]);
    out
  }

  /// Find all non-overlapping reference occurrences, left to right.
  /// Blob links this rewriter already produced are skipped whole.
  pub fn scan(&self, text: &str) -> Vec<RefMatch> {
    let mut found = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
      if let Some(m) = self.patterns.rewritten_url.find(&text[pos..]) {
        pos += m.end();
        continue;
      }
      if let Some(m) = self.match_at(text, pos) {
        pos = m.end;
        found.push(m);
        continue;
      }
      pos += text[pos..].chars().next().map(char::len_utf8).unwrap_or(1);
    }

    found
  }

  pub fn resolve(&self, reference: &Reference, diag: &mut Diagnostics) -> Option<String> {
    match reference {
      Reference::Issue { id } => Some(format!("#{}", self.translate_issue(*id))),
      Reference::Revision { token } => self.lookup_revision(token, diag).map(str::to_string),
      Reference::SourceLink { path, revision, line } => {
        if path.is_empty() {
          return None;
        }
        let (branch, rel_path) = split_source_path(path, &self.project);
        let target_ref = match revision {
          Some(token) => self.lookup_revision(token, diag).unwrap_or(token).to_string(),
          None => branch,
        };
        let mut url = format!("{}/{}/blob/{}/{}", GITHUB_URL, self.github_repo, target_ref, rel_path);
        if let Some(l) = line {
          url.push_str("#L");
          url.push_str(l);
        }
        Some(url)
      }
    }
  }

  fn lookup_revision<'a>(&'a self, token: &str, diag: &mut Diagnostics) -> Option<&'a str> {
    let found = self.revisions.lookup(token);
    if found.is_none() && !self.revisions.is_empty() {
      diag.report(
        DiagnosticKind::UnresolvedReference,
        format!("rev {} not found in commit map", token),
      );
    }
    found
  }

  fn match_at(&self, text: &str, pos: usize) -> Option<RefMatch> {
    let first = text.as_bytes()[pos];
    if !matches!(first, b'i' | b'I' | b'r' | b'R' | b'c' | b'C' | b'h') {
      return None;
    }

    let mut file: Option<&str> = None;
    let (kind, head_end) = if let Some(end) = self.issue_head(text, pos) {
      (HeadKind::Issue, end)
    } else if let Some(end) = self.revision_head(text, pos) {
      (HeadKind::Revision, end)
    } else if let Some(caps) = self.patterns.browse_url.captures(&text[pos..]) {
      file = caps.get(1).map(|m| m.as_str());
      (HeadKind::Link, pos + caps.get(0).map(|m| m.end()).unwrap_or(0))
    } else {
      return None;
    };

    let issue = kind == HeadKind::Issue;
    let after_query = text[..head_end].ends_with('?');
    let mut end = head_end;
    let mut value: Option<&str> = None;

    if after_query {
      let key = if issue { "id=" } else { "r=" };
      let mut p = head_end;
      loop {
        if is_boundary(text, p) && text[p..].starts_with(key) {
          if let Some(v_end) = match_value(text, p + key.len(), issue) {
            value = Some(&text[p + key.len()..v_end]);
            end = v_end;
            break;
          }
        }
        match text[p..].chars().next() {
          Some(c) if is_query_char(c) => p += c.len_utf8(),
          _ => break,
        }
      }
      end = skip_while(text, end, is_query_char);
    } else if let Some(v_end) = match_value(text, head_end, issue) {
      value = Some(&text[head_end..v_end]);
      end = v_end;
    }

    let mut line: Option<&str> = None;
    if kind == HeadKind::Link && text[end..].starts_with('#') {
      let digits_end = skip_while(text, end + 1, |c| c.is_ascii_digit());
      if digits_end > end + 1 {
        line = Some(&text[end + 1..digits_end]);
        end = digits_end;
      }
    }

    let reference = match kind {
      HeadKind::Issue => value.and_then(|v| v.parse::<u64>().ok()).map(|id| Reference::Issue { id }),
      HeadKind::Revision => value.map(|v| Reference::Revision { token: v.to_string() }),
      HeadKind::Link => Some(Reference::SourceLink {
        path: file.unwrap_or("").to_string(),
        revision: value.map(str::to_string),
        line: line.map(str::to_string),
      }),
    };

    Some(RefMatch { start: pos, end, reference })
  }

  /// One or more issue keywords / issue-detail URLs.
  fn issue_head(&self, text: &str, pos: usize) -> Option<usize> {
    let mut end = pos;
    loop {
      if let Some(e) = issue_keyword(text, end) {
        end = e;
      } else if let Some(m) = self.patterns.issue_url.find(&text[end..]) {
        end += m.end();
      } else {
        break;
      }
    }
    (end > pos).then_some(end)
  }

  /// One or more revision keywords, bare `r` prefixes, or revision-detail URLs.
  fn revision_head(&self, text: &str, pos: usize) -> Option<usize> {
    let mut end = pos;
    loop {
      if let Some(e) = revision_keyword(text, end) {
        end = e;
      } else if let Some(e) = bare_r(text, end) {
        end = e;
      } else if let Some(m) = self.patterns.revision_url.find(&text[end..]) {
        end += m.end();
      } else {
        break;
      }
    }
    (end > pos).then_some(end)
  }
}

/// Split a browse path into (branch, path-within-branch).
pub fn split_source_path(path: &str, project: &str) -> (String, String) {
  let mut frags: Vec<&str> = path.split('/').collect();
  let mut branch = "master".to_string();

  if frags.first() == Some(&"trunk") {
    frags.remove(0);
    if frags.first() == Some(&project) {
      frags.remove(0);
    }
  } else if frags.len() > 1 && matches!(frags[0], "branches" | "tags") {
    branch = frags[1].to_string();
    frags.drain(..2);
  }

  (branch, frags.join("/"))
}

fn is_word(c: char) -> bool {
  c.is_alphanumeric() || c == '_'
}

fn is_query_char(c: char) -> bool {
  is_word(c) || matches!(c, '&' | '-' | '=' | '%')
}

fn prev_char(text: &str, pos: usize) -> Option<char> {
  text[..pos].chars().next_back()
}

fn next_char(text: &str, pos: usize) -> Option<char> {
  text[pos..].chars().next()
}

fn is_boundary(text: &str, pos: usize) -> bool {
  prev_char(text, pos).map(is_word).unwrap_or(false) != next_char(text, pos).map(is_word).unwrap_or(false)
}

fn skip_while(text: &str, pos: usize, pred: impl Fn(char) -> bool) -> usize {
  let mut end = pos;
  for c in text[pos..].chars() {
    if !pred(c) {
      break;
    }
    end += c.len_utf8();
  }
  end
}

/// Keyword lookahead: optional digits, then a word boundary.
fn keyword_ok(text: &str, kw_end: usize) -> bool {
  let digits_end = skip_while(text, kw_end, |c| c.is_ascii_digit());
  !next_char(text, digits_end).map(is_word).unwrap_or(false)
}

fn skip_separators(text: &str, pos: usize) -> usize {
  skip_while(text, pos, |c| matches!(c, ' ' | '\t' | '#' | '-'))
}

fn starts_word(text: &str, pos: usize) -> bool {
  !prev_char(text, pos).map(is_word).unwrap_or(false)
}

fn issue_keyword(text: &str, pos: usize) -> Option<usize> {
  let b = text.as_bytes().get(pos..pos + 5)?;
  let shape = matches!(b[0], b'I' | b'i') && b[1] == b's' && matches!(b[2], b's' | b'u') && matches!(b[3], b's' | b'u') && b[4] == b'e';
  if !shape || !starts_word(text, pos) || matches!(prev_char(text, pos), Some('?') | Some('-')) {
    return None;
  }
  let kw_end = pos + 5;
  keyword_ok(text, kw_end).then(|| skip_separators(text, kw_end))
}

fn revision_keyword(text: &str, pos: usize) -> Option<usize> {
  if !starts_word(text, pos) {
    return None;
  }
  let rest = &text[pos..];
  let candidates: &[&str] = match rest.as_bytes().first()? {
    b'R' | b'r' => &["evision", "ev"],
    b'C' | b'c' => &["ommit"],
    _ => return None,
  };
  for tail in candidates {
    if rest[1..].starts_with(tail) {
      let kw_end = pos + 1 + tail.len();
      if keyword_ok(text, kw_end) {
        return Some(skip_separators(text, kw_end));
      }
    }
  }
  None
}

/// `r` directly followed by two or more digits; consumes only the `r`.
fn bare_r(text: &str, pos: usize) -> Option<usize> {
  if text.as_bytes().get(pos) != Some(&b'r') || !starts_word(text, pos) {
    return None;
  }
  let digits_end = skip_while(text, pos + 1, |c| c.is_ascii_digit());
  let ok = digits_end - (pos + 1) >= 2 && !next_char(text, digits_end).map(is_word).unwrap_or(false);
  ok.then_some(pos + 1)
}

/// Match a reference value at `pos`: digits for issues, digits or a 7-40 char
/// hex id for revisions. Values end on a word boundary and are not followed by `=`.
fn match_value(text: &str, pos: usize, issue: bool) -> Option<usize> {
  let ends_cleanly = |end: usize| match next_char(text, end) {
    Some(c) => !is_word(c) && c != '=',
    None => true,
  };

  let digits_end = skip_while(text, pos, |c| c.is_ascii_digit());
  if digits_end > pos && ends_cleanly(digits_end) {
    return Some(digits_end);
  }
  if issue || !starts_word(text, pos) {
    return None;
  }

  let hex_end = skip_while(text, pos, |c| matches!(c, '0'..='9' | 'a'..='f'));
  let len = hex_end - pos;
  ((7..=40).contains(&len) && ends_cleanly(hex_end)).then_some(hex_end)
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn table(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  fn rewriter(offset: u64, pairs: &[(&str, &str)]) -> RefRewriter {
    let mut revs = RevisionMap::new();
    if !pairs.is_empty() {
      revs.push_table(table(pairs));
    }
    RefRewriter::new("demo", "acme/demo", offset, revs).unwrap()
  }

  fn run(rw: &RefRewriter, text: &str) -> (String, Vec<String>, Diagnostics) {
    let mut refs = Vec::new();
    let mut diag = Diagnostics::new();
    let out = rw.rewrite(text, &mut refs, &mut diag);
    (out, refs, diag)
  }

  #[test]
  fn revision_keyword_and_value_coalesce() {
    let rw = rewriter(1, &[("r123", "abcd123")]);
    let (out, refs, diag) = run(&rw, "Fixed in revision 123");
    insta::assert_snapshot!(out, @"Fixed in abcd123");
    assert_eq!(refs, vec!["abcd123".to_string()]);
    assert!(diag.is_empty());
  }

  #[test]
  fn issue_ids_shift_by_start_offset() {
    let rw = rewriter(100, &[]);
    let (out, refs, _) = run(&rw, "Duplicate of issue 5, see also Issue #12.");
    assert_eq!(out, "Duplicate of #104, see also #111.");
    assert_eq!(refs, vec!["#104", "#111"]);
    assert_eq!(rw.translate_issue(1), 100);
  }

  #[test]
  fn repeated_keywords_form_a_single_match() {
    let rw = rewriter(1, &[]);
    let (out, refs, _) = run(&rw, "see issue issue 5");
    assert_eq!(out, "see #5");
    assert_eq!(refs.len(), 1);
  }

  #[test]
  fn source_browse_link_with_revision_and_line() {
    let rw = rewriter(1, &[("42", "abcd042")]);
    let (out, _, _) = run(&rw, "See http://code.google.com/p/demo/source/browse/trunk/foo/bar.c?r=42#17 now");
    insta::assert_snapshot!(out, @"See https://github.com/acme/demo/blob/abcd042/foo/bar.c#L17 now");
  }

  #[test]
  fn source_browse_link_keeps_raw_revision_when_untranslated() {
    let rw = rewriter(1, &[]);
    let (out, refs, diag) = run(&rw, "code.google.com/p/demo/source/browse/trunk/demo/foo/bar.c?r=42#17");
    assert_eq!(out, "https://github.com/acme/demo/blob/42/foo/bar.c#L17");
    assert_eq!(refs.len(), 1);
    assert!(diag.is_empty());
  }

  #[test]
  fn source_browse_link_on_branch_uses_branch_name() {
    let rw = rewriter(1, &[]);
    let (out, _, _) = run(&rw, "https://code.google.com/p/demo/source/browse/branches/stable/src/x.c");
    assert_eq!(out, "https://github.com/acme/demo/blob/stable/src/x.c");
    let (out, _, _) = run(&rw, "https://code.google.com/p/demo/source/browse/tags/v1.0/README");
    assert_eq!(out, "https://github.com/acme/demo/blob/v1.0/README");
  }

  #[test]
  fn rewritten_blob_links_are_not_rescanned() {
    let rw = rewriter(1, &[("r2010", "abc2010")]);
    let text = "see http://code.google.com/p/demo/source/browse/trunk/tests/issue-123/r2010/t.c#4 and issue 9";
    let (once, refs, _) = run(&rw, text);
    assert_eq!(once, "see https://github.com/acme/demo/blob/master/tests/issue-123/r2010/t.c#L4 and #9");
    assert_eq!(refs.len(), 2);

    let (twice, refs, _) = run(&rw, &once);
    assert_eq!(twice, once);
    assert!(refs.is_empty());
  }

  #[test]
  fn issue_detail_url_skips_other_query_params() {
    let rw = rewriter(1, &[]);
    let (out, _, _) = run(&rw, "(https://code.google.com/p/demo/issues/detail?can=1&id=7&q=x)");
    assert_eq!(out, "(#7)");
  }

  #[test]
  fn revision_detail_url_and_hex_tokens_resolve() {
    let rw = rewriter(1, &[("r55", "0f0f0f0"), ("deadbeef", "cafe123")]);
    let (out, _, _) = run(&rw, "code.google.com/p/demo/source/detail?r=55 and commit deadbeef");
    assert_eq!(out, "0f0f0f0 and cafe123");
  }

  #[test]
  fn bare_r_requires_two_digits() {
    let rw = rewriter(1, &[("r1", "aaaaaaa"), ("r12", "bbbbbbb")]);
    let (out, _, _) = run(&rw, "r1 and r12");
    assert_eq!(out, "r1 and bbbbbbb");
  }

  #[test]
  fn words_that_merely_contain_keywords_are_left_alone() {
    let rw = rewriter(1, &[("r12", "bbbbbbb")]);
    let text = "issues 5, tissue 5, reviewed 12, commits 12, x?issue=5, a-issue 5";
    let (out, refs, _) = run(&rw, text);
    assert_eq!(out, text);
    assert!(refs.is_empty());
  }

  #[test]
  fn unresolved_revision_passes_through_with_diagnostic() {
    let rw = rewriter(1, &[("r1", "aaaaaaa")]);
    let (out, refs, diag) = run(&rw, "broken since r999");
    assert_eq!(out, "broken since r999");
    assert!(refs.is_empty());
    assert_eq!(diag.count(DiagnosticKind::UnresolvedReference), 1);
  }

  #[test]
  fn keyword_without_value_is_unchanged() {
    let rw = rewriter(1, &[]);
    let (out, refs, _) = run(&rw, "The issue is that revision numbers are missing");
    assert_eq!(out, "The issue is that revision numbers are missing");
    assert!(refs.is_empty());
  }

  #[test]
  fn collector_keeps_order_and_duplicates() {
    let rw = rewriter(1, &[]);
    let (_, refs, _) = run(&rw, "issue 3, issue 2, issue 3");
    assert_eq!(refs, vec!["#3", "#2", "#3"]);
  }

  #[test]
  fn later_tables_take_priority() {
    let mut revs = RevisionMap::new();
    revs.push_table(table(&[("r7", "old0007"), ("r8", "old0008")]));
    revs.push_table(table(&[("r7", "new0007")]));
    assert_eq!(revs.lookup("7"), Some("new0007"));
    assert_eq!(revs.lookup("8"), Some("old0008"));
    assert_eq!(revs.lookup("9"), None);
  }

  #[test]
  fn parse_table_skips_blank_and_partial_lines() {
    let t = parse_table("r1 abc\n\n  r2   def  \nlonely\n");
    assert_eq!(t.len(), 2);
    assert_eq!(t["r2"], "def");
  }

  #[test]
  fn scan_reports_typed_references() {
    let rw = rewriter(1, &[]);
    let found = rw.scan("issue 4 r77 code.google.com/p/demo/source/browse/trunk/a.c#3");
    let refs: Vec<_> = found.into_iter().filter_map(|m| m.reference).collect();
    assert_eq!(
      refs,
      vec![
        Reference::Issue { id: 4 },
        Reference::Revision { token: "77".into() },
        Reference::SourceLink { path: "trunk/a.c".into(), revision: None, line: Some("3".into()) },
      ]
    );
  }

  fn phrase() -> impl Strategy<Value = String> {
    let n = 10u64..400;
    prop_oneof![
      Just("fixed".to_string()),
      Just("see the".to_string()),
      Just("and".to_string()),
      n.clone().prop_map(|n| format!("issue {}", n)),
      n.clone().prop_map(|n| format!("Issue #{}", n)),
      n.clone().prop_map(|n| format!("revision {}", n)),
      n.clone().prop_map(|n| format!("r{}", n)),
      n.clone().prop_map(|n| format!("commit {}", n)),
      n.clone().prop_map(|n| format!("https://code.google.com/p/demo/issues/detail?id={}", n)),
      (n.clone(), 1u32..300).prop_map(|(n, l)| format!("http://code.google.com/p/demo/source/browse/trunk/src/main.c?r={}#{}", n, l)),
      n.clone().prop_map(|n| format!("http://code.google.com/p/demo/source/browse/trunk/tests/issue-{}/t.c", n)),
      n.clone().prop_map(|n| format!("code.google.com/p/demo/source/browse/branches/r{}/commit-{}/x.c", n, n)),
      n.prop_map(|n| format!("https://code.google.com/p/demo/source/browse/trunk/demo/revision_{}/r{}.txt?r={}", n, n, n)),
    ]
  }

  proptest! {
    #[test]
    fn rewriting_is_idempotent(phrases in proptest::collection::vec(phrase(), 0..12), offset in 1u64..50) {
      let pairs: Vec<(String, String)> = (10..400).step_by(3).map(|n| (format!("r{}", n), format!("a{:06x}", n))).collect();
      let pairs_ref: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
      let rw = rewriter(offset, &pairs_ref);

      let text = phrases.join(" ");
      let (once, _, _) = run(&rw, &text);
      let (twice, refs, _) = run(&rw, &once);
      prop_assert_eq!(&once, &twice);
      prop_assert!(refs.is_empty());
    }
  }
}
