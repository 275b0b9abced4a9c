pub mod app;
pub mod bus;
pub mod cli;
pub mod config;
pub mod datetime;
pub mod i18n;
pub mod intent;
pub mod markup;
pub mod render;
pub mod repository;
pub mod resolver;
pub mod state;
pub mod storage;
pub mod task;
pub mod transfer;
pub mod transform;
pub mod view;

use std::ffi::OsString;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting todo CLI"
  );

  let mut cfg = config::Config::load(
    cli.todorc.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );
  debug!(files = ?cfg.loaded_files, "configuration loaded");

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    storage::FileStore::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open task store \
           at {}",
          data_dir.display()
        )
      })?;

  let mut app = app::App::new(
    store,
    cfg.app_options()?,
    Rc::new(datetime::SystemClock)
  );
  let mut renderer =
    render::Renderer::new(&cfg)?;

  let command =
    cli.command.unwrap_or_else(|| {
      cli::TodoCommand::List(
        cli::ListArgs::default()
      )
    });

  cli::execute(
    &mut app,
    &mut renderer,
    command
  )?;

  info!("done");
  Ok(())
}
