//! Blocking HTTP adapter for the Telegram Bot API.
//!
//! Implements the `tgb-core` `BotApi` port over `reqwest::blocking`.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde_json::Value;

use tgb_core::{config::Config, errors::Error, ports::BotApi, Result};

const FALLBACK_FILE_NAME: &str = "download";

#[derive(Clone, Debug)]
pub struct HttpBotApi {
    http: reqwest::blocking::Client,
}

impl HttpBotApi {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(map_err)?;
        Ok(Self { http })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.request_timeout)
    }
}

impl BotApi for HttpBotApi {
    fn post_form(&self, url: &str, params: &[(&str, String)]) -> Result<Value> {
        let resp = self.http.post(url).form(params).send().map_err(map_err)?;

        // Telegram answers API errors with 4xx plus a JSON body carrying
        // `ok: false`; keep the body so callers see the API verdict.
        let status = resp.status();
        let body = resp.text().map_err(map_err)?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(
                "non-json reply ({status}): {}",
                body.chars().take(200).collect::<String>()
            );
            Error::Json(e)
        })
    }

    fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let resp = self.http.get(url).send().map_err(map_err)?;

        if !resp.status().is_success() {
            return Err(Error::Http(format!(
                "file download failed: {}",
                resp.status()
            )));
        }

        let bytes = resp.bytes().map_err(map_err)?;
        let path = dest_dir.join(file_name_from_url(url));
        fs::write(&path, &bytes)?;
        tracing::info!("Downloaded {} bytes into {}", bytes.len(), path.display());

        Ok(path)
    }
}

/// Last non-empty path segment of `url`, ignoring any query string.
fn file_name_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .filter(|s| !s.contains(':'))
        .unwrap_or(FALLBACK_FILE_NAME)
}

// Strip the URL: it embeds the bot token.
fn map_err(e: reqwest::Error) -> Error {
    Error::Http(format!("telegram request error: {}", e.without_url()))
}
