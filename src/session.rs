// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Own every piece of mutable migration state for one run (maps, tables, caches, diagnostics)
// role: state/session
// inputs: EffectiveConfig (included file paths, numbering, prefixes)
// outputs: MigrationSession ready for the orchestrator
// side_effects: Reads author/label/commit map files, the overrides file, and the attachments cache
// invariants:
// - Milestone labels are moved out of the label map before any issue is processed
// - Commit maps given later take priority over earlier ones
// - Override bodies preload the message cache
// errors: Unreadable included files are fatal with the path in context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::Result;

use crate::attachments::{AttachmentCache, CACHE_FILE};
use crate::authors::AuthorMap;
use crate::cli::EffectiveConfig;
use crate::diag::Diagnostics;
use crate::format::MessageCache;
use crate::labels::{LabelConfig, LabelMap, MilestoneTable};
use crate::overrides::read_messages;
use crate::refs::{RefRewriter, RevisionMap};

pub struct MigrationSession {
  pub refs: RefRewriter,
  pub authors: AuthorMap,
  pub labels: LabelMap,
  pub milestones: MilestoneTable,
  pub messages: MessageCache,
  pub attachments: AttachmentCache,
  pub diag: Diagnostics,
}

impl MigrationSession {
  pub fn new(cfg: &EffectiveConfig) -> Result<Self> {
    let mut diag = Diagnostics::new();

    let authors = match &cfg.authors_json {
      Some(p) => AuthorMap::load(p, cfg.fallback_user.clone())?,
      None => AuthorMap::new(Default::default(), cfg.fallback_user.clone()),
    };

    let mut labels = match &cfg.labels_file {
      Some(p) => LabelMap::from_config(LabelConfig::load(p)?),
      None => LabelMap::default(),
    };
    let mut milestones = MilestoneTable::new(&cfg.milestone_label_prefix, cfg.milestones_start_from);
    milestones.extract_from(&mut labels, &cfg.milestone_label_date_format, &mut diag);

    let mut revisions = RevisionMap::new();
    for path in &cfg.commits_maps {
      let n = revisions.load_file(path)?;
      tracing::info!("Loaded {} revision mappings from {}", n, path.display());
    }
    let refs = RefRewriter::new(&cfg.project, &cfg.github_repo, cfg.issues_start_from, revisions)?;

    let messages = match &cfg.messages_input {
      Some(p) => MessageCache::from_entries(read_messages(p)?),
      None => MessageCache::new(),
    };

    let attachments = AttachmentCache::load(&cfg.out_dir.join(CACHE_FILE), cfg.cache_attachments);

    Ok(Self { refs, authors, labels, milestones, messages, attachments, diag })
  }
}
