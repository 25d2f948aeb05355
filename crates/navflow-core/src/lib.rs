pub mod api;
pub mod board;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod datetime;
pub mod directory;
pub mod notice;
pub mod render;
pub mod session;
pub mod tasklist;
pub mod ticker;

use std::ffi::OsString;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use parking_lot::Mutex;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting navflow CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.navflowrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );
  if let Some(url) = &cli.base_url {
    cfg.set("api.base_url", url.as_str());
  }

  let zone = datetime::Zone::resolve(
    cfg.get("timezone").as_deref()
  );

  let session = if cli.ephemeral {
    debug!("using in-memory credentials");
    session::Session::ephemeral()
  } else {
    let data_dir =
      config::resolve_data_dir(
        &cfg,
        cli.data.as_deref()
      )
      .context(
        "failed to resolve data \
         directory"
      )?;
    session::Session::load(Box::new(
      session::FileCredentialStore::new(
        &data_dir
      )
    ))
    .with_context(|| {
      format!(
        "failed to read credentials in \
         {}",
        data_dir.display()
      )
    })?
  };

  let api = api::ApiClient::new(
    &cfg.base_url(),
    cfg.http_timeout()?,
    Arc::new(Mutex::new(session))
  )?;
  info!(base_url = %api.base_url(), "api client ready");

  let renderer =
    render::Renderer::new(&cfg, zone)?;
  let ctx = commands::Context {
    api,
    cfg,
    renderer,
    zone
  };

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;
  runtime.block_on(commands::dispatch(
    &ctx,
    cli.command
  ))?;

  info!("done");
  Ok(())
}
