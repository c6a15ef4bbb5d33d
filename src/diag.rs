// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Leveled diagnostic stream for recoverable migration problems (never raised to callers)
// role: diagnostics/collector
// outputs: Per-kind counts plus a bounded sample of entries; every report is also logged via tracing
// invariants:
// - report() bumps exactly one count and emits exactly one log event
// - At most SAMPLES_PER_KIND entries are retained per kind
// - recoverable problems never turn into Err values
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticKind {
  UnresolvedReference,
  UnmappedAuthor,
  AmbiguousAuthor,
  OversizedBody,
  FencedBody,
  AttachmentFetch,
  AttachmentBinary,
  AttachmentPublish,
  UnexpectedParagraphs,
  EmptyTitle,
  Milestone,
  Label,
  Timestamp,
}

impl DiagnosticKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      DiagnosticKind::UnresolvedReference => "unresolved-reference",
      DiagnosticKind::UnmappedAuthor => "unmapped-author",
      DiagnosticKind::AmbiguousAuthor => "ambiguous-author",
      DiagnosticKind::OversizedBody => "oversized-body",
      DiagnosticKind::FencedBody => "fenced-body",
      DiagnosticKind::AttachmentFetch => "attachment-fetch",
      DiagnosticKind::AttachmentBinary => "attachment-binary",
      DiagnosticKind::AttachmentPublish => "attachment-publish",
      DiagnosticKind::UnexpectedParagraphs => "unexpected-paragraphs",
      DiagnosticKind::EmptyTitle => "empty-title",
      DiagnosticKind::Milestone => "milestone",
      DiagnosticKind::Label => "label",
      DiagnosticKind::Timestamp => "timestamp",
    }
  }

  /// Unmapped authors and skipped binaries are routine; they stay below warn.
  fn is_routine(&self) -> bool {
    matches!(self, DiagnosticKind::UnmappedAuthor | DiagnosticKind::AttachmentBinary)
  }
}

impl fmt::Display for DiagnosticKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Debug)]
pub struct Diagnostic {
  pub kind: DiagnosticKind,
  pub message: String,
}

/// Diagnostics kept per kind for inspection; further reports are only counted.
pub const SAMPLES_PER_KIND: usize = 5;

#[derive(Debug, Default)]
pub struct Diagnostics {
  counts: BTreeMap<DiagnosticKind, usize>,
  samples: Vec<Diagnostic>,
}

impl Diagnostics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
    let message = message.into();

    if kind.is_routine() {
      tracing::debug!(kind = %kind, "{}", message);
    } else {
      tracing::warn!(kind = %kind, "FIXME: {}", message);
    }

    let seen = self.counts.entry(kind).or_insert(0);
    *seen += 1;
    if *seen <= SAMPLES_PER_KIND {
      self.samples.push(Diagnostic { kind, message });
    }
  }

  /// The first few diagnostics of each kind, in report order.
  pub fn samples(&self) -> &[Diagnostic] {
    &self.samples
  }

  pub fn len(&self) -> usize {
    self.counts.values().sum()
  }

  pub fn is_empty(&self) -> bool {
    self.counts.is_empty()
  }

  pub fn count(&self, kind: DiagnosticKind) -> usize {
    self.counts.get(&kind).copied().unwrap_or(0)
  }

  pub fn counts(&self) -> &BTreeMap<DiagnosticKind, usize> {
    &self.counts
  }

  /// Log one line per diagnostic kind seen during the run.
  pub fn log_summary(&self) {
    if self.is_empty() {
      tracing::info!("no diagnostics");
      return;
    }
    tracing::info!(total = self.len(), "diagnostics reported");
    for (kind, n) in self.counts() {
      let example = self.samples().iter().find(|d| d.kind == *kind).map(|d| d.message.as_str()).unwrap_or("");
      tracing::info!(kind = %kind, count = n, example, "diagnostics summary");
    }
  }
}
