use std::{env, path::PathBuf, thread};

use anyhow::Context;

use tgb_core::{
    config::Config,
    dispatch::{DispatchOptions, Dispatched},
    session::BotSession,
};
use tgb_http::HttpBotApi;

fn config_path() -> PathBuf {
    env::args_os()
        .nth(1)
        .or_else(|| env::var_os("TGB_CONFIG"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

fn main() -> anyhow::Result<()> {
    tgb_core::logging::init("tgb")?;

    let path = config_path();
    let cfg = Config::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;

    let api = HttpBotApi::from_config(&cfg).context("building http client")?;
    let mut session = BotSession::new(&cfg, api);

    let opts = DispatchOptions {
        download_dir: cfg.download_dir.clone(),
        download_media: cfg.download_media,
    };
    if !opts.download_dir.is_dir() {
        tracing::warn!(
            "Download folder {} does not exist; media downloads will fail",
            opts.download_dir.display()
        );
    }

    tracing::info!("Polling every {:?}", cfg.poll_interval);
    loop {
        if session.check_new_message() {
            let kind = session.classify_message();
            match session.dispatch(&kind, &opts) {
                Dispatched::Sent => tracing::info!("Echoed {} message", kind.label()),
                Dispatched::Downloaded(path) => {
                    tracing::info!("Stored {} at {}", kind.label(), path.display())
                }
                Dispatched::Skipped => {}
                Dispatched::Failed => tracing::warn!("Failed to handle {} message", kind.label()),
            }
        }
        thread::sleep(cfg.poll_interval);
    }
}
