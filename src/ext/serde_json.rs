// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Dotted-path lookups into API responses (Gist html_url, files.<name>.raw_url) with typed extraction
// role: extension/serde_json
// outputs: JsonFetch trait and JsonFetched wrapper (typed value, string, object entries)
// invariants: No panics; missing paths yield None or an empty entry list
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::de::DeserializeOwned;

/// A location inside a JSON document, possibly absent.
pub struct JsonFetched<'a> {
  inner: Option<&'a serde_json::Value>,
}

impl<'a> JsonFetched<'a> {
  pub fn to<T>(&self) -> Option<T>
  where
    T: DeserializeOwned,
  {
    self.inner.and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
  }

  /// Borrow the location as a string; non-strings yield None.
  pub fn str(&self) -> Option<&'a str> {
    self.inner.and_then(|v| v.as_str())
  }

  /// Key/value pairs when the location is an object, in document order.
  pub fn entries(&self) -> Vec<(&'a str, &'a serde_json::Value)> {
    match self.inner.and_then(|v| v.as_object()) {
      Some(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
      None => Vec::new(),
    }
  }
}

/// Fetch nested values via dotted paths like "owner.login".
/// Keys that themselves contain '.' (file names) are reached through `entries`.
pub trait JsonFetch {
  fn fetch(&self, path: &str) -> JsonFetched<'_>;
}

impl JsonFetch for serde_json::Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched { inner: Some(self) };
    }

    let mut cur = self;
    for key in path.split('.') {
      match cur.get(key) {
        Some(next) => cur = next,
        None => return JsonFetched { inner: None },
      }
    }

    JsonFetched { inner: Some(cur) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gist() -> serde_json::Value {
    serde_json::json!({
      "html_url": "https://gist.github.com/0123",
      "owner": { "login": "octocat" },
      "files": {
        "log.txt": { "raw_url": "https://gist.githubusercontent.com/raw/log.txt" },
        "patch.diff": { "raw_url": "https://gist.githubusercontent.com/raw/patch.diff" }
      }
    })
  }

  #[test]
  fn fetches_top_level_and_nested_strings() {
    let v = gist();
    assert_eq!(v.fetch("html_url").str(), Some("https://gist.github.com/0123"));
    assert_eq!(v.fetch("owner.login").to::<String>().as_deref(), Some("octocat"));
    assert_eq!(v.fetch("owner.missing").str(), None);
    assert!(v.fetch("").to::<serde_json::Value>().is_some());
  }

  #[test]
  fn entries_walk_object_members_with_dotted_keys() {
    let v = gist();
    let raw: Vec<(String, Option<&str>)> = v
      .fetch("files")
      .entries()
      .into_iter()
      .map(|(name, f)| (name.to_string(), f.fetch("raw_url").str()))
      .collect();
    assert_eq!(raw.len(), 2);
    assert!(raw.contains(&("log.txt".to_string(), Some("https://gist.githubusercontent.com/raw/log.txt"))));
    assert!(v.fetch("html_url").entries().is_empty());
    assert!(v.fetch("nope").entries().is_empty());
  }
}
