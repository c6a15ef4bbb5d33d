// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: GitHub helpers used for attachment re-hosting (token discovery, Gist creation)
// role: remote/github-api
// inputs: Gist payload JSON; env GITHUB_TOKEN / GH_TOKEN; optional `gh` CLI for token fallback
// outputs: Gist API response JSON
// side_effects: POSTs to <api>/gists; spawns `gh` subprocess when no token env var is set
// invariants:
// - Token discovery prefers GITHUB_TOKEN, then GH_TOKEN, then `gh auth token`
// - Requests are sent without Authorization when no token is available
// errors: HTTP failures propagate as Err with the URL in context; callers turn them into diagnostics
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use super::USER_AGENT;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Discover a GitHub token: env vars first, then `gh auth token` if available.
pub fn get_github_token() -> Option<String> {
  for key in ["GITHUB_TOKEN", "GH_TOKEN"] {
    if let Ok(t) = std::env::var(key) {
      if !t.trim().is_empty() {
        return Some(t.trim().to_string());
      }
    }
  }

  if let Ok(output) = std::process::Command::new("gh").args(["auth", "token"]).output() {
    if output.status.success() {
      let t = String::from_utf8_lossy(&output.stdout).trim().to_string();

      if !t.is_empty() {
        return Some(t);
      }
    }
  }

  None
}

// --- Trait seam for Gist publication ---
pub trait GistApi {
  fn create_gist(&self, payload: &Value) -> Result<Value>;
}

pub struct GistHttpApi {
  agent: ureq::Agent,
  api_url: String,
  token: Option<String>,
}

impl GistHttpApi {
  pub fn new(api_url: &str, token: Option<String>) -> Self {
    let agent = ureq::AgentBuilder::new()
      .user_agent(USER_AGENT)
      .timeout(Duration::from_secs(60))
      .build();
    Self { agent, api_url: api_url.trim_end_matches('/').to_string(), token }
  }
}

impl GistApi for GistHttpApi {
  fn create_gist(&self, payload: &Value) -> Result<Value> {
    let url = format!("{}/gists", self.api_url);
    let mut req = self
      .agent
      .post(&url)
      .set("Accept", "application/vnd.github+json")
      .set("Content-Type", "application/json");
    if let Some(t) = &self.token {
      req = req.set("Authorization", &format!("Bearer {}", t));
    }

    let resp = req.send_json(payload).with_context(|| format!("POST {}", url))?;
    resp.into_json::<Value>().with_context(|| format!("decoding response of {}", url))
  }
}
