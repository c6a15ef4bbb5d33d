// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Drive the export: fetch summaries, filter the id range, extract/format/persist each issue, then milestones
// role: processing/orchestrator
// inputs: EffectiveConfig, IssueSource, GistApi, MigrationSession
// outputs: <out>/issues/<n>.json, <out>/issues/<n>.comments.json, <out>/milestones/<n>.json
// side_effects: Creates output directories; writes JSON records, the attachments cache and the messages output file
// invariants:
// - Issues are processed strictly one at a time in summary order
// - Milestones are written once, after the last issue
// - The attachments cache and messages output are written even when a fetch error aborts the run
// errors: Summary and detail page fetch failures are fatal and returned after caches are flushed
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::EffectiveConfig;
use crate::diag::Diagnostics;
use crate::format::{Formatter, MessageCache};
use crate::issue::IssueExtractor;
use crate::model::{Issue, Message};
use crate::overrides::write_messages;
use crate::remote::github_api::get_github_token;
use crate::remote::google_code::fetch_summaries;
use crate::remote::{GistApi, GistHttpApi, GoogleCodeHttp, IssueSource, SummaryRow};
use crate::session::MigrationSession;
use crate::util;

/// Entry point used by `main`: real HTTP clients, session loaded from the included files.
pub fn run(cfg: &EffectiveConfig) -> Result<()> {
  let out = util::prepare_out_dir(&cfg.out_dir)?;
  let mut session = MigrationSession::new(cfg)?;
  let source = GoogleCodeHttp::new(&cfg.source_base_url, &cfg.project);
  let gists = GistHttpApi::new(&cfg.gist_api_url, get_github_token());

  run_with(cfg, &out, &source, &gists, &mut session).map(|_| ())
}

/// Run the export against the given clients; returns the number of issues written.
pub fn run_with(
  cfg: &EffectiveConfig,
  out: &Path,
  source: &dyn IssueSource,
  gists: &dyn GistApi,
  session: &mut MigrationSession,
) -> Result<usize> {
  let result = process_issues(cfg, out, source, gists, session);

  if let Err(e) = session.attachments.flush() {
    tracing::warn!("unable to save attachments cache: {:#}", e);
  }
  if let Some(path) = &cfg.messages_output {
    let written = write_messages(session.messages.entries(), path);
    match (&result, written) {
      (Ok(_), Err(e)) => return Err(e),
      (Err(_), Err(e)) => tracing::warn!("unable to save messages output: {:#}", e),
      _ => {}
    }
  }
  session.diag.log_summary();

  result
}

/// Keep rows whose id lies within `[start_at, end_at]`; rows without a numeric id are dropped.
pub fn select_range(rows: Vec<SummaryRow>, start_at: Option<u64>, end_at: Option<u64>) -> Vec<(u64, SummaryRow)> {
  if let Some(s) = start_at {
    tracing::info!("Starting at issue {}", s);
  }
  if let Some(e) = end_at {
    tracing::info!("End at issue {}", e);
  }

  rows
    .into_iter()
    .filter_map(|row| match row.number() {
      Some(id) => Some((id, row)),
      None => {
        tracing::warn!("skipping summary row with non-numeric id '{}'", row.id);
        None
      }
    })
    .filter(|(id, _)| start_at.map(|s| *id >= s).unwrap_or(true))
    .filter(|(id, _)| end_at.map(|e| *id <= e).unwrap_or(true))
    .collect()
}

fn process_issues(
  cfg: &EffectiveConfig,
  out: &Path,
  source: &dyn IssueSource,
  gists: &dyn GistApi,
  session: &mut MigrationSession,
) -> Result<usize> {
  let summaries = fetch_summaries(source).context("fetching issue summaries")?;
  let selected = select_range(summaries, cfg.start_at, cfg.end_at);
  let extractor = IssueExtractor { cfg, source, gists };
  let mut written = 0;

  for (id, summary) in &selected {
    let mut issue = extractor.extract(summary, *id, session)?;
    if session.attachments.is_dirty() {
      session.attachments.flush()?;
    }

    if cfg.skip_closed && issue.record.is_closed() {
      tracing::debug!("skipping closed issue {}", id);
      continue;
    }

    let formatter = Formatter { github_repo: &cfg.github_repo, absolute_links: cfg.absolute_links, labels: &session.labels };
    format_issue(&mut issue, &formatter, &mut session.messages, &mut session.diag);
    save_issue(&issue, out)?;
    written += 1;
  }

  for m in session.milestones.iter() {
    tracing::info!("Adding milestone {}", m.number);
    util::write_json(m, &out.join("milestones").join(format!("{}.json", m.number)))?;
  }

  tracing::info!("Exported {} issues", written);
  Ok(written)
}

fn format_issue(issue: &mut Issue, formatter: &Formatter<'_>, messages: &mut MessageCache, diag: &mut Diagnostics) {
  let body = formatter.format(Message::Issue(&*issue), messages, diag);
  issue.record.body = body;

  for i in 0..issue.extra.comments.len() {
    let body = formatter.format(Message::Comment(&issue.extra.comments[i]), messages, diag);
    issue.extra.comments[i].record.body = body;
  }
}

fn save_issue(issue: &Issue, out: &Path) -> Result<()> {
  let n = issue.record.number;
  tracing::info!("Exporting issue {}", n);
  let dir = out.join("issues");
  util::write_json(&issue.record, &dir.join(format!("{}.json", n)))?;
  util::write_json(&issue.comment_records(), &dir.join(format!("{}.comments.json", n)))
}
