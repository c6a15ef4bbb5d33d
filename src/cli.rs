use anyhow::{bail, Result};
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::FileConfig;
use crate::remote::github_api::DEFAULT_API_URL;
use crate::remote::google_code::DEFAULT_BASE_URL;
use crate::util;

#[derive(Parser, Debug)]
#[command(
    name = "gcode-issue-export",
    version,
    about = "Export all issues from a Google Code project as GitHub issue-import JSON",
    long_about = None
)]
pub struct Cli {
  /// Google Code project name (falls back to `project` in the config file)
  pub project: Option<String>,

  /// Start at the given Google Code issue number
  #[arg(long, help_heading = "Google Code options")]
  pub start_at: Option<u64>,

  /// End at the given Google Code issue number
  #[arg(long, help_heading = "Google Code options")]
  pub end_at: Option<u64>,

  /// Skip all closed issues
  #[arg(long, help_heading = "Google Code options")]
  pub skip_closed: bool,

  /// Target repository `owner/name` (default: `<project>/<project>`)
  #[arg(long, help_heading = "GitHub options")]
  pub github_repo: Option<String>,

  /// Login used for authors missing from the author map (e.g. a bot account)
  #[arg(long, help_heading = "GitHub options")]
  pub fallback_user: Option<String>,

  /// Absolute URLs in links to issues
  #[arg(long, help_heading = "GitHub options")]
  pub absolute_links: bool,

  /// First issue number on the target tracker
  #[arg(long, help_heading = "GitHub options")]
  pub issues_start_from: Option<u64>,

  /// First milestone number on the target tracker
  #[arg(long, help_heading = "GitHub options")]
  pub milestones_start_from: Option<u64>,

  /// `updated_at` stamped on every exported record (default: now)
  #[arg(long, help_heading = "GitHub options")]
  pub export_date: Option<String>,

  /// JSON mapping of Google Code emails to GitHub logins
  #[arg(long, help_heading = "Included files")]
  pub authors_json: Option<PathBuf>,

  /// TOML mapping of Google Code labels/statuses to GitHub labels
  #[arg(long, help_heading = "Included files")]
  pub labels_file: Option<PathBuf>,

  /// Revision map file(s) (`old new` per line); later files take priority
  #[arg(long = "commits-map", action = ArgAction::Append, help_heading = "Included files")]
  pub commits_maps: Vec<PathBuf>,

  /// Override message bodies with text taken from this file
  #[arg(long, help_heading = "Included files")]
  pub messages_input: Option<PathBuf>,

  /// Dump final message bodies into this file for review
  #[arg(long, help_heading = "Included files")]
  pub messages_output: Option<PathBuf>,

  /// Label marking every imported issue (empty to disable)
  #[arg(long, help_heading = "Misc options")]
  pub imported_label: Option<String>,

  /// Label prefix recognized as a milestone
  #[arg(long, help_heading = "Misc options")]
  pub milestone_label_prefix: Option<String>,

  /// Format of the `[date]` prefix in milestone descriptions
  #[arg(long, help_heading = "Misc options")]
  pub milestone_label_date_format: Option<String>,

  /// Download all attachments and create new Gists from scratch
  #[arg(long, help_heading = "Misc options")]
  pub no_cache_attachments: bool,

  /// Directory receiving issues/, milestones/ and the attachments cache
  #[arg(long, default_value = ".", help_heading = "Misc options")]
  pub out_dir: PathBuf,

  /// TOML config file (default: ./config.toml when present)
  #[arg(long, help_heading = "Misc options")]
  pub config: Option<PathBuf>,

  /// Verbosity level (-v to -vvv)
  #[arg(short, long, action = ArgAction::Count)]
  pub verbose: u8,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Tracker base URL (hidden; tests only)
  #[arg(long, hide = true)]
  pub source_base_url: Option<String>,

  /// GitHub API base URL for Gist uploads (hidden; tests only)
  #[arg(long, hide = true)]
  pub gist_api_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EffectiveConfig {
  pub project: String,
  pub start_at: Option<u64>,
  pub end_at: Option<u64>,
  pub skip_closed: bool,
  pub github_repo: String,
  pub fallback_user: Option<String>,
  pub absolute_links: bool,
  pub issues_start_from: u64,
  pub milestones_start_from: u64,
  pub export_date: String,
  pub authors_json: Option<PathBuf>,
  pub labels_file: Option<PathBuf>,
  pub commits_maps: Vec<PathBuf>,
  pub messages_input: Option<PathBuf>,
  pub messages_output: Option<PathBuf>,
  pub imported_label: Option<String>,
  pub milestone_label_prefix: String,
  pub milestone_label_date_format: String,
  pub cache_attachments: bool,
  pub out_dir: PathBuf,
  pub source_base_url: String,
  pub gist_api_url: String,
}

/// Merge CLI flags over the config file over built-in defaults.
pub fn normalize(cli: Cli, file: FileConfig) -> Result<EffectiveConfig> {
  let FileConfig { google, github, include, misc } = file;

  let project = match cli.project.or(google.project) {
    Some(p) if !p.trim().is_empty() => p.trim().to_string(),
    _ => bail!("No Google Code project name given"),
  };

  let issues_start_from = cli.issues_start_from.or(github.issues_start_from).unwrap_or(1);
  let milestones_start_from = cli.milestones_start_from.or(github.milestones_start_from).unwrap_or(1);
  if issues_start_from < 1 || milestones_start_from < 1 {
    bail!("--issues-start-from and --milestones-start-from must be at least 1");
  }

  let start_at = cli.start_at.or(google.start_at);
  let end_at = cli.end_at.or(google.end_at);
  if let (Some(s), Some(e)) = (start_at, end_at) {
    if s > e {
      bail!("--start-at ({}) is after --end-at ({})", s, e);
    }
  }

  let absolute_links = cli.absolute_links || github.absolute_links.unwrap_or(false);
  let github_repo = match cli.github_repo.or(github.repo) {
    Some(r) => r,
    None => {
      let r = format!("{0}/{0}", project);
      if absolute_links {
        tracing::warn!("GitHub repo name is set to '{}'", r);
      }
      r
    }
  };

  // CLI maps are appended after file maps, so they take priority.
  let mut commits_maps = include.commits_maps;
  commits_maps.extend(cli.commits_maps);

  let imported_label = cli
    .imported_label
    .or(misc.imported_label)
    .unwrap_or_else(|| "imported".to_string());

  Ok(EffectiveConfig {
    project,
    start_at,
    end_at,
    skip_closed: cli.skip_closed || google.skip_closed.unwrap_or(false),
    github_repo,
    fallback_user: cli.fallback_user.or(github.fallback_user).filter(|u| !u.is_empty()),
    absolute_links,
    issues_start_from,
    milestones_start_from,
    export_date: cli.export_date.or(github.export_date).unwrap_or_else(util::now_iso),
    authors_json: cli.authors_json.or(include.authors_json),
    labels_file: cli.labels_file.or(include.labels_file),
    commits_maps,
    messages_input: cli.messages_input.or(include.messages_input),
    messages_output: cli.messages_output.or(include.messages_output),
    imported_label: Some(imported_label).filter(|l| !l.is_empty()),
    milestone_label_prefix: cli
      .milestone_label_prefix
      .or(misc.milestone_label_prefix)
      .unwrap_or_else(|| "Milestone".to_string()),
    milestone_label_date_format: cli
      .milestone_label_date_format
      .or(misc.milestone_label_date_format)
      .unwrap_or_else(|| "%Y-%m-%d".to_string()),
    cache_attachments: !cli.no_cache_attachments && misc.cache_attachments.unwrap_or(true),
    out_dir: cli.out_dir,
    source_base_url: cli.source_base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
    gist_api_url: cli.gist_api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
  })
}
