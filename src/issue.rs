// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Build an Issue (with its Comments) from one summary row plus the parsed detail page
// role: extraction/issue
// inputs: SummaryRow, detail page HTML and URL, EffectiveConfig, MigrationSession
// outputs: Issue with record fields populated and plain (unformatted) bodies; milestone table updated
// side_effects: Detail page fetch; attachment downloads and Gist uploads through AttachmentMigrator
// invariants:
// - Persisted number = source id + (issues_start_from - 1)
// - Labels are ordered: imported label, AllLabels in CSV order, then Status; duplicates and empty mappings dropped
// - Comments without a `.date` (sign-in prompts) and deleted comments (`delcom`) are skipped
// - Every paragraph title and body passes through the reference rewriter before control sentences are stripped
// errors: Detail page fetch failures propagate; malformed fields become diagnostics
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{Context, Result};
use indexmap::IndexSet;
use url::Url;

use crate::attachments::AttachmentMigrator;
use crate::cli::EffectiveConfig;
use crate::diag::{DiagnosticKind, Diagnostics};
use crate::html::{self, ContentNode, Element};
use crate::labels::add_label_or_milestone;
use crate::model::{Comment, CommentExtra, CommentRecord, Issue, IssueExtra, IssueRecord, MessageExtra};
use crate::paragraphs::{join_paragraphs, split_into_paragraphs, strip_control_sentences, ControlSentences, Paragraph, TITLE_TAG};
use crate::remote::google_code::issue_link;
use crate::remote::{GistApi, IssueSource, SummaryRow};
use crate::session::MigrationSession;
use crate::updates::UpdateTranslator;
use crate::util::{parse_gcode_date, parse_iso, timestamp_to_date};

const EMPTY_TITLE: &str = "FIXME: empty title";

pub struct IssueExtractor<'a> {
  pub cfg: &'a EffectiveConfig,
  pub source: &'a dyn IssueSource,
  pub gists: &'a dyn GistApi,
}

/// Content runs of every `<pre>` under `el`, in document order.
fn pre_content(el: &Element) -> Vec<ContentNode> {
  el.by_tag("pre").into_iter().flat_map(|p| p.content_nodes()).collect()
}

fn epoch_to_date(value: &str, what: &str, fallback: &str, diag: &mut Diagnostics) -> String {
  match value.trim().parse::<i64>().ok().and_then(timestamp_to_date) {
    Some(d) => d,
    None => {
      diag.report(DiagnosticKind::Timestamp, format!("invalid {} timestamp '{}'", what, value));
      fallback.to_string()
    }
  }
}

impl<'a> IssueExtractor<'a> {
  pub fn extract(&self, summary: &SummaryRow, id: u64, session: &mut MigrationSession) -> Result<Issue> {
    tracing::info!("Importing issue {}", id);
    let cfg = self.cfg;
    let number = session.refs.translate_issue(id);

    let mut title = summary.summary.replace('%', "&#37;").trim().to_string();
    if title.is_empty() {
      session.diag.report(DiagnosticKind::EmptyTitle, format!("empty title for issue {}", id));
      title = EMPTY_TITLE.to_string();
    }

    let closed = !summary.closed.is_empty();
    let created_at = epoch_to_date(&summary.opened_timestamp, "opened", &cfg.export_date, &mut session.diag);
    let closed_at = closed
      .then(|| epoch_to_date(&summary.closed_timestamp, "closed", &cfg.export_date, &mut session.diag));

    let reporter = session.authors.map_author(&summary.reporter, "reporter", true, &mut session.diag);
    let (assignee, owner_mapped) = if summary.owner.is_empty() {
      (None, false)
    } else {
      let owner = session.authors.map_author(&summary.owner, "owner", true, &mut session.diag);
      (owner.login, owner.mapped)
    };
    let cc: Vec<String> = summary
      .cc
      .split(", ")
      .filter(|s| !s.is_empty())
      .filter_map(|c| session.authors.map_author(c, "cc", false, &mut session.diag).login)
      .collect();

    let mut labels: Vec<String> = cfg.imported_label.iter().cloned().collect();
    let mut milestone = None;
    let source_labels = summary.all_labels.split(", ").chain(std::iter::once(summary.status.as_str()));
    for label in source_labels.filter(|l| !l.is_empty()) {
      let key = add_label_or_milestone(label, &mut labels, &session.labels, &mut session.milestones, &mut session.diag);
      if let Some(key) = key {
        milestone = session.milestones.note_issue(&key, &created_at, !closed).or(milestone);
      }
    }

    let link = issue_link(&cfg.project, id);
    let (page, page_url) = self.source.issue_page(id).with_context(|| format!("fetching issue {}", id))?;
    let mut doc = html::parse(&page);
    match Url::parse(&page_url) {
      Ok(base) => doc.absolutize_links(&base),
      Err(e) => tracing::warn!("not absolutizing links of {}: {}", page_url, e),
    }

    let empty = Element::default();
    let description = doc.nested_class("issuedescription", "issuedescription").into_iter().next().unwrap_or(&empty);
    let (message, _) = self.build_message(description, link.clone(), number, session, false);

    let mut issue = Issue {
      record: IssueRecord {
        number,
        title,
        state: if closed { "closed" } else { "open" }.to_string(),
        closed_at,
        created_at,
        updated_at: cfg.export_date.clone(),
        user: reporter.login,
        assignee,
        labels,
        milestone,
        body: join_paragraphs(&message.paragraphs),
      },
      extra: IssueExtra {
        message: MessageExtra { orig_user: summary.reporter.clone(), user_mapped: reporter.mapped, ..message },
        orig_owner: summary.owner.clone(),
        owner_mapped,
        cc,
        comments: Vec::new(),
      },
    };

    for comment_el in doc.by_class("issuecomment") {
      if comment_el.by_class("date").is_empty() {
        continue;
      }
      if comment_el.has_class("delcom") {
        continue;
      }
      let nr = issue.extra.comments.len() + 1;
      let comment = self.extract_comment(comment_el, &link, number, nr, session);
      issue.extra.comments.push(comment);
    }

    Ok(issue)
  }

  fn extract_comment(&self, el: &Element, issue_url: &str, number: u64, nr: usize, session: &mut MigrationSession) -> Comment {
    let date_text = el.by_class("date").first().and_then(|d| d.attr("title")).unwrap_or("").to_string();
    let created_at = parse_gcode_date(&date_text);
    if parse_iso(&created_at).is_none() {
      session.diag.report(DiagnosticKind::Timestamp, format!("unparsable date '{}' in comment {} of issue {}", date_text, nr, number));
    }

    let anchor = match el.find_first(|e| e.name == "a" && e.attr("name").is_some()).and_then(|a| a.attr("name")) {
      Some(name) => name.to_string(),
      None => format!("c{}", nr),
    };
    let link = format!("{}#{}", issue_url, anchor);

    let update_nodes: Vec<ContentNode> =
      el.nested_class("updates", "box-inner").into_iter().flat_map(|b| b.content_nodes()).collect();
    let mut updates = UpdateTranslator {
      authors: &session.authors,
      labels: &session.labels,
      milestones: &mut session.milestones,
      issues_start_from: self.cfg.issues_start_from,
      diag: &mut session.diag,
    }
    .translate(&split_into_paragraphs(&update_nodes, TITLE_TAG));

    let (message, control) = self.build_message(el, link.clone(), number, session, true);
    updates.close_commit = control.close_commit;
    updates.merged_issue = control.merged_issue;

    let ps = &message.paragraphs;
    if ps.len() > 1 || ps.first().map(|p| !p.title.is_empty()).unwrap_or(false) {
      session.diag.report(DiagnosticKind::UnexpectedParagraphs, format!("unexpected paragraph structure in {}", link));
    }

    let orig_user = el.by_class("userlink").first().map(|u| u.text()).unwrap_or_default();
    let user = session.authors.map_author(&orig_user, "comment", true, &mut session.diag);

    Comment {
      record: CommentRecord {
        created_at,
        updated_at: self.cfg.export_date.clone(),
        user: user.login,
        body: join_paragraphs(&message.paragraphs),
      },
      extra: CommentExtra { message: MessageExtra { orig_user, user_mapped: user.mapped, ..message }, nr, updates },
    }
  }

  /// Segment, rewrite and strip the message under `el`, then resolve its attachments.
  fn build_message(
    &self,
    el: &Element,
    link: String,
    issue_number: u64,
    session: &mut MigrationSession,
    is_comment: bool,
  ) -> (MessageExtra, ControlSentences) {
    let mut collected: Vec<String> = Vec::new();
    let mut paragraphs: Vec<Paragraph> = split_into_paragraphs(&pre_content(el), TITLE_TAG)
      .into_iter()
      .map(|p| Paragraph {
        title: session.refs.rewrite(&p.title, &mut collected, &mut session.diag),
        body: session.refs.rewrite(&p.body, &mut collected, &mut session.diag),
      })
      .collect();
    let control = strip_control_sentences(&mut paragraphs, is_comment);

    let migrator = AttachmentMigrator { source: self.source, gists: self.gists, github_repo: &self.cfg.github_repo };
    let attachments = migrator.resolve(el, &link, issue_number, &mut session.attachments, &mut session.diag);

    let refs: IndexSet<String> = collected.into_iter().collect();
    let extra = MessageExtra { link, issue_number, paragraphs, refs, attachments, ..Default::default() };
    (extra, control)
  }
}
