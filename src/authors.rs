// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Map source-tracker user ids (possibly truncated emails) to target logins
// role: mapping/authors
// inputs: Author map JSON object {email: login}; optional fallback login
// outputs: MappedUser carrying the resolved login and whether the map itself matched
// invariants:
// - A bare id is treated as `<id>@gmail.com`
// - A `...@` truncation matches any `[\w.]+@` local part; matching is a case-insensitive prefix match
// - More than one candidate is never tie-broken; the user counts as unmapped
// errors: Unreadable or malformed author map files are fatal at load time
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::Regex;

use crate::diag::{DiagnosticKind, Diagnostics};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MappedUser {
  pub login: Option<String>,
  pub mapped: bool,
}

#[derive(Clone, Debug, Default)]
pub struct AuthorMap {
  entries: IndexMap<String, String>,
  fallback_user: Option<String>,
}

impl AuthorMap {
  pub fn new(entries: IndexMap<String, String>, fallback_user: Option<String>) -> Self {
    Self { entries, fallback_user }
  }

  pub fn load(path: &Path, fallback_user: Option<String>) -> Result<Self> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading author map {}", path.display()))?;
    let entries: IndexMap<String, String> =
      serde_json::from_str(&text).with_context(|| format!("parsing author map {}", path.display()))?;
    tracing::info!(count = entries.len(), path = %path.display(), "loaded author map");
    Ok(Self::new(entries, fallback_user))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Resolve `uid`; `kind` only labels log lines (reporter, owner, cc, ...).
  pub fn map_author(&self, uid: &str, kind: &str, allow_fallback: bool, diag: &mut Diagnostics) -> MappedUser {
    let candidates = self.candidates(uid);

    match candidates.as_slice() {
      [(email, login)] => {
        tracing::trace!("{:<10}    {:>22} -> {:>32}:   {:<16}", kind, uid, email, login);
        return MappedUser { login: Some(login.to_string()), mapped: true };
      }
      [] => diag.report(DiagnosticKind::UnmappedAuthor, format!("{} {} has no mapping", kind, uid)),
      many => {
        let emails: Vec<&str> = many.iter().map(|(e, _)| *e).collect();
        diag.report(
          DiagnosticKind::AmbiguousAuthor,
          format!("multiple matches for {}: {}", uid, emails.join(", ")),
        );
      }
    }

    let login = if allow_fallback { self.fallback_user.clone() } else { None };
    MappedUser { login, mapped: false }
  }

  fn candidates(&self, uid: &str) -> Vec<(&str, &str)> {
    let Some(re) = email_pattern(uid) else {
      return Vec::new();
    };
    self
      .entries
      .iter()
      .filter(|(email, _)| re.is_match(email))
      .map(|(e, l)| (e.as_str(), l.as_str()))
      .collect()
  }
}

fn email_pattern(uid: &str) -> Option<Regex> {
  let mut email = uid.to_string();
  if !email.contains('@') {
    email.push_str("@gmail.com");
  }
  let pat = regex::escape(&email).replace(r"\.\.\.@", r"[\w.]+@");
  Regex::new(&format!("(?i)^{}", pat)).ok()
}
