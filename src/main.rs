use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod attachments;
mod authors;
mod cli;
mod config;
mod diag;
mod ext;
mod format;
mod html;
mod issue;
mod labels;
mod migrate;
mod model;
mod overrides;
mod paragraphs;
mod refs;
mod remote;
mod session;
mod updates;
mod util;

use crate::cli::{normalize, Cli};
use crate::config::FileConfig;

fn init_tracing(verbose: u8) {
  let default_level = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  init_tracing(cli.verbose);

  // Phase 1: merge config file and CLI
  let file = FileConfig::load(cli.config.as_deref())?;
  let cfg = normalize(cli, file)?;

  // Phase 2: export
  migrate::run(&cfg)
}
