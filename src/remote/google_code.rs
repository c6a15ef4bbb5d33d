// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Source-tracker access: paged CSV issue summaries, issue detail pages, and attachment downloads
// role: remote/google-code
// inputs: Base URL (defaults to https://code.google.com), project name
// outputs: SummaryRow list across all pages; detail page HTML with its fetch URL; raw attachment bytes
// side_effects: Blocking HTTP GETs through a shared ureq agent
// invariants:
// - Pages are requested with num=1000 and start = rows collected so far
// - A trailing row whose ID mentions `truncated` is dropped and triggers another page
// - A page shorter than the page size, or an empty page, ends paging
// - Canonical issue links always use code.google.com regardless of the fetch base URL
// errors: HTTP and CSV failures propagate with the URL in context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::USER_AGENT;

pub const DEFAULT_BASE_URL: &str = "https://code.google.com";
pub const PAGE_SIZE: usize = 1000;
const CSV_COLUMNS: &[&str] = &["ID", "Type", "Status", "Owner", "Summary", "Opened", "Closed", "Reporter", "Cc"];

/// One row of the issues CSV export. Columns missing from a row default to empty.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummaryRow {
  #[serde(rename = "ID")]
  pub id: String,
  #[serde(rename = "Type")]
  pub kind: String,
  #[serde(rename = "Status")]
  pub status: String,
  #[serde(rename = "Owner")]
  pub owner: String,
  #[serde(rename = "Summary")]
  pub summary: String,
  #[serde(rename = "Opened")]
  pub opened: String,
  #[serde(rename = "Closed")]
  pub closed: String,
  #[serde(rename = "Reporter")]
  pub reporter: String,
  #[serde(rename = "Cc")]
  pub cc: String,
  #[serde(rename = "AllLabels")]
  pub all_labels: String,
  #[serde(rename = "OpenedTimestamp")]
  pub opened_timestamp: String,
  #[serde(rename = "ClosedTimestamp")]
  pub closed_timestamp: String,
}

impl SummaryRow {
  pub fn number(&self) -> Option<u64> {
    self.id.trim().parse().ok()
  }

  fn is_truncation_marker(&self) -> bool {
    self.id.contains("truncated")
  }
}

pub fn issue_link(project: &str, id: u64) -> String {
  format!("{}/p/{}/issues/detail?id={}", DEFAULT_BASE_URL, project, id)
}

pub trait IssueSource {
  /// Raw CSV text for one summary page.
  fn summary_page(&self, start: usize, num: usize) -> Result<String>;
  /// Detail page HTML plus the URL it was fetched from (for resolving relative links).
  fn issue_page(&self, id: u64) -> Result<(String, String)>;
  fn download(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct GoogleCodeHttp {
  agent: ureq::Agent,
  base_url: String,
  project: String,
}

impl GoogleCodeHttp {
  pub fn new(base_url: &str, project: &str) -> Self {
    let agent = ureq::AgentBuilder::new()
      .user_agent(USER_AGENT)
      .timeout(Duration::from_secs(60))
      .build();
    Self { agent, base_url: base_url.trim_end_matches('/').to_string(), project: project.to_string() }
  }

  fn issues_url(&self) -> String {
    format!("{}/p/{}/issues", self.base_url, self.project)
  }

  pub fn csv_url(&self, start: usize, num: usize) -> String {
    format!(
      "{}/csv?can=1&num={}&start={}&sort=id&colspec={}",
      self.issues_url(),
      num,
      start,
      CSV_COLUMNS.join("%20")
    )
  }

  pub fn detail_url(&self, id: u64) -> String {
    format!("{}/detail?id={}", self.issues_url(), id)
  }

  fn get_text(&self, url: &str) -> Result<String> {
    let resp = self.agent.get(url).call().with_context(|| format!("GET {}", url))?;
    resp.into_string().with_context(|| format!("reading body of {}", url))
  }
}

impl IssueSource for GoogleCodeHttp {
  fn summary_page(&self, start: usize, num: usize) -> Result<String> {
    self.get_text(&self.csv_url(start, num))
  }

  fn issue_page(&self, id: u64) -> Result<(String, String)> {
    let url = self.detail_url(id);
    let html = self.get_text(&url)?;
    Ok((html, url))
  }

  fn download(&self, url: &str) -> Result<Vec<u8>> {
    let resp = self.agent.get(url).call().with_context(|| format!("GET {}", url))?;
    let mut buf = Vec::new();
    resp.into_reader().read_to_end(&mut buf).with_context(|| format!("reading body of {}", url))?;
    Ok(buf)
  }
}

pub fn parse_summary_csv(text: &str) -> Result<Vec<SummaryRow>> {
  let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(text.as_bytes());
  let mut rows = Vec::new();
  for rec in rdr.deserialize::<SummaryRow>() {
    rows.push(rec.context("parsing issue summary CSV")?);
  }
  Ok(rows)
}

/// Collect every summary row across pages.
pub fn fetch_summaries(source: &dyn IssueSource) -> Result<Vec<SummaryRow>> {
  let mut rows: Vec<SummaryRow> = Vec::new();

  loop {
    let text = source.summary_page(rows.len(), PAGE_SIZE)?;
    let mut page = parse_summary_csv(&text)?;
    if page.is_empty() {
      break;
    }

    let truncated = page.last().map(SummaryRow::is_truncation_marker).unwrap_or(false);
    if truncated {
      page.pop();
    }
    let page_len = page.len();
    rows.extend(page);
    tracing::debug!(page_len, total = rows.len(), truncated, "fetched summary page");

    if truncated {
      if page_len == 0 {
        break;
      }
      continue;
    }
    if page_len < PAGE_SIZE {
      break;
    }
  }

  tracing::info!("Fetched summaries for {} issues", rows.len());
  Ok(rows)
}
