// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Re-host message attachments as a private Gist, reusing bundles from a persistent link-keyed cache
// role: migration/attachments
// inputs: Message element (its `.attachments > table` entries), canonical link, target issue number
// outputs: Optional AttachmentBundle (Gist URL + per-file raw URLs); updated cache entries
// side_effects: Downloads attachment files; POSTs Gists; reads/writes `.attachments-cache.json`
// invariants:
// - A cache hit never touches the network
// - Binary (non UTF-8) files and failed downloads are skipped, never fatal
// - At most one Gist is published per message; a failed publish yields no bundle
// errors: All network failures become diagnostics; only cache file IO errors propagate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::diag::{DiagnosticKind, Diagnostics};
use crate::ext::serde_json::JsonFetch;
use crate::html::Element;
use crate::model::AttachmentBundle;
use crate::refs::GITHUB_URL;
use crate::remote::{GistApi, IssueSource};
use crate::util::write_json;

pub const CACHE_FILE: &str = ".attachments-cache.json";

#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentEntry {
  pub name: String,
  pub url: String,
}

/// Attachment tables under `.attachments`; entries without a `Download` link are ignored.
pub fn attachment_entries(message: &Element) -> Vec<AttachmentEntry> {
  message
    .direct_children_of_class("attachments", "table")
    .into_iter()
    .filter_map(|table| {
      let link = table.by_tag("a").into_iter().find(|a| a.text() == "Download")?;
      let url = link.attr("href")?.to_string();
      let name = table.by_tag("b").first().map(|b| b.text()).unwrap_or_default();
      Some(AttachmentEntry { name, url })
    })
    .collect()
}

/// Canonical link → bundle, persisted between runs.
#[derive(Debug, Default)]
pub struct AttachmentCache {
  path: PathBuf,
  enabled: bool,
  entries: IndexMap<String, AttachmentBundle>,
  dirty: bool,
}

impl AttachmentCache {
  /// Load `path` when caching is enabled; a missing or unreadable file starts empty.
  pub fn load(path: &Path, enabled: bool) -> Self {
    let mut cache = Self { path: path.to_path_buf(), enabled, ..Default::default() };
    if !enabled {
      return cache;
    }

    match std::fs::read_to_string(path) {
      Ok(text) => match serde_json::from_str::<IndexMap<String, AttachmentBundle>>(&text) {
        Ok(entries) => {
          tracing::info!("Loaded {} cached attachment bundles from {}", entries.len(), path.display());
          cache.entries = entries;
        }
        Err(e) => tracing::warn!("ignoring unreadable attachments cache {}: {}", path.display(), e),
      },
      Err(_) => tracing::debug!("no attachments cache at {}", path.display()),
    }
    cache
  }

  pub fn get(&self, link: &str) -> Option<&AttachmentBundle> {
    if !self.enabled {
      return None;
    }
    self.entries.get(link)
  }

  pub fn insert(&mut self, link: &str, bundle: AttachmentBundle) {
    if !self.enabled {
      return;
    }
    self.entries.insert(link.to_string(), bundle);
    self.dirty = true;
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  /// Persist when something changed since the last flush.
  pub fn flush(&mut self) -> Result<()> {
    if !self.enabled || !self.dirty {
      return Ok(());
    }
    write_json(&self.entries, &self.path).with_context(|| format!("saving attachments cache {}", self.path.display()))?;
    self.dirty = false;
    tracing::debug!("Saved {} attachment bundles", self.entries.len());
    Ok(())
  }
}

pub struct AttachmentMigrator<'a> {
  pub source: &'a dyn IssueSource,
  pub gists: &'a dyn GistApi,
  pub github_repo: &'a str,
}

impl<'a> AttachmentMigrator<'a> {
  /// Produce (or reuse) the bundle for the message at `link`.
  pub fn resolve(
    &self,
    message: &Element,
    link: &str,
    issue_number: u64,
    cache: &mut AttachmentCache,
    diag: &mut Diagnostics,
  ) -> Option<AttachmentBundle> {
    if let Some(hit) = cache.get(link) {
      tracing::info!("Gist attachments URL (from cache): {}", hit.url);
      return Some(hit.clone());
    }

    let mut files = Map::new();
    for entry in attachment_entries(message) {
      tracing::debug!("Downloading attachment '{}'", entry.name);
      let bytes = match self.source.download(&entry.url) {
        Ok(b) => b,
        Err(e) => {
          diag.report(
            DiagnosticKind::AttachmentFetch,
            format!("unable to get attachment file '{}' from '{}': {:#}", entry.name, entry.url, e),
          );
          continue;
        }
      };
      match String::from_utf8(bytes) {
        Ok(content) => {
          files.insert(entry.name, json!({ "content": content }));
        }
        Err(_) => diag.report(DiagnosticKind::AttachmentBinary, format!("skipping binary file '{}'", entry.name)),
      }
    }

    if files.is_empty() {
      return None;
    }

    let payload = json!({
      "description": format!(
        "Issue attachments for {repo}#{n}: {gh}/{repo}/issues/{n}",
        repo = self.github_repo,
        n = issue_number,
        gh = GITHUB_URL
      ),
      "files": Value::Object(files),
      "public": false,
    });

    let response = match self.gists.create_gist(&payload) {
      Ok(v) => v,
      Err(e) => {
        diag.report(DiagnosticKind::AttachmentPublish, format!("unable to post attachments of {} to Gist: {:#}", link, e));
        return None;
      }
    };

    let Some(url) = response.fetch("html_url").str() else {
      diag.report(DiagnosticKind::AttachmentPublish, format!("Gist response for {} has no html_url", link));
      return None;
    };
    let files: IndexMap<String, String> = response
      .fetch("files")
      .entries()
      .into_iter()
      .filter_map(|(name, f)| f.fetch("raw_url").str().map(|raw| (name.to_string(), raw.to_string())))
      .collect();

    let bundle = AttachmentBundle { url: url.to_string(), files };
    tracing::info!("Gist attachments URL: {}", bundle.url);
    cache.insert(link, bundle.clone());
    Some(bundle)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::html::parse;
  use std::cell::RefCell;

  const LINK: &str = "https://code.google.com/p/demo/issues/detail?id=3";

  const PAGE: &str = r#"<div class="issuedescription"><pre>text</pre>
    <div class="attachments">
      <table><tr><td><b>notes.txt</b> 12 bytes <a href="http://src/notes.txt">View</a> <a href="http://src/notes.txt">Download</a></td></tr></table>
      <table><tr><td><b>shot.png</b> <a href="http://src/shot.png">Download</a></td></tr></table>
      <table><tr><td><b>gone.log</b> <a href="http://src/gone.log">Download</a></td></tr></table>
      <table><tr><td><b>inline.txt</b> <a href="http://src/inline.txt">View</a></td></tr></table>
    </div></div>"#;

  struct FakeSource;

  impl IssueSource for FakeSource {
    fn summary_page(&self, _start: usize, _num: usize) -> Result<String> {
      anyhow::bail!("not used")
    }
    fn issue_page(&self, _id: u64) -> Result<(String, String)> {
      anyhow::bail!("not used")
    }
    fn download(&self, url: &str) -> Result<Vec<u8>> {
      match url {
        "http://src/notes.txt" => Ok(b"some notes".to_vec()),
        "http://src/shot.png" => Ok(vec![0x89, 0x50, 0xff, 0xfe]),
        _ => anyhow::bail!("404 for {}", url),
      }
    }
  }

  #[derive(Default)]
  struct RecordingGists {
    payloads: RefCell<Vec<Value>>,
    fail: bool,
  }

  impl GistApi for RecordingGists {
    fn create_gist(&self, payload: &Value) -> Result<Value> {
      self.payloads.borrow_mut().push(payload.clone());
      if self.fail {
        anyhow::bail!("422 Unprocessable Entity");
      }
      Ok(json!({
        "html_url": "https://gist.github.com/g1",
        "files": { "notes.txt": { "raw_url": "https://gist.githubusercontent.com/raw/notes.txt" } }
      }))
    }
  }

  #[test]
  fn entries_require_a_download_link() {
    let doc = parse(PAGE);
    let names: Vec<String> = attachment_entries(&doc).into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["notes.txt", "shot.png", "gone.log"]);
  }

  #[test]
  fn publishes_text_files_and_reports_skips() {
    let doc = parse(PAGE);
    let gists = RecordingGists::default();
    let m = AttachmentMigrator { source: &FakeSource, gists: &gists, github_repo: "acme/demo" };
    let td = tempfile::TempDir::new().unwrap();
    let mut cache = AttachmentCache::load(&td.path().join(CACHE_FILE), true);
    let mut diag = Diagnostics::new();

    let bundle = m.resolve(&doc, LINK, 3, &mut cache, &mut diag).unwrap();
    assert_eq!(bundle.url, "https://gist.github.com/g1");
    assert_eq!(bundle.files["notes.txt"], "https://gist.githubusercontent.com/raw/notes.txt");
    assert_eq!(diag.count(DiagnosticKind::AttachmentBinary), 1);
    assert_eq!(diag.count(DiagnosticKind::AttachmentFetch), 1);

    let sent = &gists.payloads.borrow()[0];
    assert_eq!(
      sent.fetch("description").str(),
      Some("Issue attachments for acme/demo#3: https://github.com/acme/demo/issues/3")
    );
    assert_eq!(sent.fetch("public").to::<bool>(), Some(false));
    assert_eq!(sent.fetch("files").entries().len(), 1);
    assert!(cache.is_dirty());
  }

  #[test]
  fn cache_hit_skips_network_and_survives_reload() {
    let doc = parse(PAGE);
    let td = tempfile::TempDir::new().unwrap();
    let path = td.path().join(CACHE_FILE);
    let gists = RecordingGists::default();
    let m = AttachmentMigrator { source: &FakeSource, gists: &gists, github_repo: "acme/demo" };
    let mut diag = Diagnostics::new();

    let mut cache = AttachmentCache::load(&path, true);
    let first = m.resolve(&doc, LINK, 3, &mut cache, &mut diag);
    cache.flush().unwrap();
    assert!(!cache.is_dirty());

    let mut reloaded = AttachmentCache::load(&path, true);
    assert_eq!(reloaded.len(), 1);
    let second = m.resolve(&doc, LINK, 3, &mut reloaded, &mut diag);
    assert_eq!(first, second);
    assert_eq!(gists.payloads.borrow().len(), 1);
  }

  #[test]
  fn publish_failure_yields_no_bundle() {
    let doc = parse(PAGE);
    let gists = RecordingGists { fail: true, ..Default::default() };
    let m = AttachmentMigrator { source: &FakeSource, gists: &gists, github_repo: "acme/demo" };
    let td = tempfile::TempDir::new().unwrap();
    let mut cache = AttachmentCache::load(&td.path().join(CACHE_FILE), true);
    let mut diag = Diagnostics::new();

    assert!(m.resolve(&doc, LINK, 3, &mut cache, &mut diag).is_none());
    assert_eq!(diag.count(DiagnosticKind::AttachmentPublish), 1);
    assert!(cache.is_empty());
  }

  #[test]
  fn disabled_cache_is_neither_read_nor_written() {
    let td = tempfile::TempDir::new().unwrap();
    let path = td.path().join(CACHE_FILE);
    std::fs::write(&path, r#"{"x": {"url": "u", "files": {}}}"#).unwrap();

    let mut cache = AttachmentCache::load(&path, false);
    assert!(cache.get("x").is_none());
    cache.insert("y", AttachmentBundle { url: "v".into(), files: IndexMap::new() });
    cache.flush().unwrap();
    assert!(std::fs::read_to_string(&path).unwrap().contains("\"x\""));
    assert!(cache.is_empty());
  }
}
