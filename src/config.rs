// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Optional TOML defaults file ([google], [github], [include], [misc]) layered under CLI flags
// role: config/file
// inputs: Path given by --config, else ./config.toml when present
// outputs: FileConfig with every value optional
// invariants:
// - Keys are kebab-case and mirror the long CLI option names
// - A missing default file is not an error; a missing explicit file is
// errors: Unreadable or malformed TOML propagates with the file path in context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
  pub google: GoogleSection,
  pub github: GithubSection,
  pub include: IncludeSection,
  pub misc: MiscSection,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct GoogleSection {
  pub project: Option<String>,
  pub start_at: Option<u64>,
  pub end_at: Option<u64>,
  pub skip_closed: Option<bool>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct GithubSection {
  pub repo: Option<String>,
  pub fallback_user: Option<String>,
  pub absolute_links: Option<bool>,
  pub issues_start_from: Option<u64>,
  pub milestones_start_from: Option<u64>,
  pub export_date: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct IncludeSection {
  pub authors_json: Option<PathBuf>,
  pub labels_file: Option<PathBuf>,
  pub commits_maps: Vec<PathBuf>,
  pub messages_input: Option<PathBuf>,
  pub messages_output: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct MiscSection {
  pub imported_label: Option<String>,
  pub milestone_label_prefix: Option<String>,
  pub milestone_label_date_format: Option<String>,
  pub cache_attachments: Option<bool>,
}

impl FileConfig {
  pub fn parse(text: &str) -> Result<Self> {
    Ok(toml::from_str(text)?)
  }

  /// Read `explicit` if given, otherwise `config.toml` in the working directory when it exists.
  pub fn load(explicit: Option<&Path>) -> Result<Self> {
    let path = match explicit {
      Some(p) => p.to_path_buf(),
      None => {
        let p = PathBuf::from(DEFAULT_CONFIG_FILE);
        if !p.exists() {
          return Ok(Self::default());
        }
        p
      }
    };

    let text = std::fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
    let cfg = Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;
    tracing::info!("Loaded configuration from {}", path.display());
    Ok(cfg)
  }
}
