use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{errors::Error, Result};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Typed configuration for the bot client.
///
/// Sources, lowest precedence first: TOML file, `.env`, process environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,

    // Runtime constants
    pub request_timeout: Duration,
    pub poll_interval: Duration,

    // Media handling
    pub download_dir: PathBuf,
    pub download_media: bool,

    // Behavior flags
    pub skip_stale_messages: bool,
}

/// On-disk shape. Keys are upper-case (`API_KEY = "..."`); lower-case aliases accepted.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(rename = "API_KEY", alias = "api_key")]
    api_key: Option<String>,
    #[serde(rename = "API_BASE", alias = "api_base")]
    api_base: Option<String>,
    #[serde(rename = "TIMEOUT_SECS", alias = "timeout_secs")]
    timeout_secs: Option<u64>,
    #[serde(rename = "POLL_INTERVAL_MS", alias = "poll_interval_ms")]
    poll_interval_ms: Option<u64>,
    #[serde(rename = "DOWNLOAD_DIR", alias = "download_dir")]
    download_dir: Option<PathBuf>,
    #[serde(rename = "DOWNLOAD_MEDIA", alias = "download_media")]
    download_media: Option<bool>,
    #[serde(rename = "SKIP_STALE_MESSAGES", alias = "skip_stale_messages")]
    skip_stale_messages: Option<bool>,
}

impl Config {
    /// Load from a TOML file plus environment.
    ///
    /// A missing file is not fatal on its own (the key may come from the
    /// environment), but a missing API key is.
    pub fn load(path: &Path) -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        let contents = read_config_file(path)?;
        Self::from_sources(contents.as_deref(), env_str)
    }

    /// Build from raw TOML text and an environment lookup.
    pub fn from_sources(
        toml_text: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file: FileConfig = match toml_text {
            Some(text) => toml::from_str(text)?,
            None => FileConfig::default(),
        };

        let api_key = env("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .or_else(|| file.api_key.and_then(non_empty))
            .ok_or_else(|| {
                Error::Config(
                    "API_KEY is required (config file or TELEGRAM_BOT_TOKEN)".to_string(),
                )
            })?;

        let api_base = env("TELEGRAM_API_BASE")
            .and_then(non_empty)
            .or(file.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let request_timeout = Duration::from_secs(
            env_parse(&env, "TIMEOUT_SECS")
                .or(file.timeout_secs)
                .unwrap_or(10),
        );
        let poll_interval = Duration::from_millis(
            env_parse(&env, "POLL_INTERVAL_MS")
                .or(file.poll_interval_ms)
                .unwrap_or(1000),
        );

        let download_dir = env("DOWNLOAD_DIR")
            .and_then(non_empty)
            .map(PathBuf::from)
            .or(file.download_dir)
            .unwrap_or_else(|| PathBuf::from("download/"));
        let download_media = env_bool(&env, "DOWNLOAD_MEDIA")
            .or(file.download_media)
            .unwrap_or(false);

        let skip_stale_messages = env_bool(&env, "SKIP_STALE_MESSAGES")
            .or(file.skip_stale_messages)
            .unwrap_or(false);

        Ok(Self {
            api_key,
            api_base,
            request_timeout,
            poll_interval,
            download_dir,
            download_media,
            skip_stale_messages,
        })
    }

    /// Minimal config around a bare token; everything else defaulted.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(1000),
            download_dir: PathBuf::from("download/"),
            download_media: false,
            skip_stale_messages: false,
        }
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Read the TOML file; `None` (logged) when it does not exist.
fn read_config_file(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::error!("Configuration file {} not found", path.display());
            Ok(None)
        }
        Err(e) => Err(Error::Io(e)),
    }
}

// Existing process variables win over `.env` entries.
fn load_dotenv_if_present(path: &Path) {
    if let Err(e) = dotenvy::from_path(path) {
        if !e.not_found() {
            tracing::warn!("Ignoring {}: {e}", path.display());
        }
    }
}

fn env_bool(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    env(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_parse(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    env(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn reads_api_key_from_toml() {
        let cfg = Config::from_sources(Some("API_KEY = \"TEST_API_KEY\"\n"), no_env).unwrap();
        assert_eq!(cfg.api_key, "TEST_API_KEY");
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.download_dir, PathBuf::from("download/"));
        assert!(!cfg.skip_stale_messages);
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = Config::from_sources(None, no_env).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_sources(Some("API_KEY = \"  \""), no_env).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_file() {
        let vars: HashMap<&str, &str> = [
            ("TELEGRAM_BOT_TOKEN", "ENV_KEY"),
            ("TELEGRAM_API_BASE", "http://127.0.0.1:9999/"),
            ("SKIP_STALE_MESSAGES", "yes"),
            ("POLL_INTERVAL_MS", "250"),
        ]
        .into_iter()
        .collect();
        let env = |k: &str| vars.get(k).map(|v| v.to_string());

        let cfg = Config::from_sources(
            Some("API_KEY = \"FILE_KEY\"\nSKIP_STALE_MESSAGES = false\n"),
            env,
        )
        .unwrap();
        assert_eq!(cfg.api_key, "ENV_KEY");
        assert_eq!(cfg.api_base, "http://127.0.0.1:9999");
        assert!(cfg.skip_stale_messages);
        assert_eq!(cfg.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn lower_case_keys_are_accepted() {
        let cfg = Config::from_sources(
            Some("api_key = \"k\"\ndownload_dir = \"/tmp/media\"\ndownload_media = true\n"),
            no_env,
        )
        .unwrap();
        assert_eq!(cfg.api_key, "k");
        assert_eq!(cfg.download_dir, PathBuf::from("/tmp/media"));
        assert!(cfg.download_media);
    }

    #[test]
    fn invalid_toml_is_reported() {
        let err = Config::from_sources(Some("API_KEY = "), no_env).unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn file_on_disk_feeds_the_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "API_KEY = \"TEST_API_KEY\"\nTIMEOUT_SECS = 3\n").unwrap();

        let contents = read_config_file(&path).unwrap();
        let cfg = Config::from_sources(contents.as_deref(), no_env).unwrap();
        assert_eq!(cfg.api_key, "TEST_API_KEY");
        assert_eq!(cfg.request_timeout, Duration::from_secs(3));

        assert_eq!(read_config_file(&dir.path().join("missing.toml")).unwrap(), None);
    }

    #[test]
    fn load_without_file_or_env_key_fails() {
        if env_str("TELEGRAM_BOT_TOKEN").is_some() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("invalid_config.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn dotenv_strips_quotes_comments_and_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "TGB_DOTENV_QUOTED=\"abc\" # bot token\nexport TGB_DOTENV_EXPORTED=xyz\n",
        )
        .unwrap();

        load_dotenv_if_present(&path);
        assert_eq!(env_str("TGB_DOTENV_QUOTED").as_deref(), Some("abc"));
        assert_eq!(env_str("TGB_DOTENV_EXPORTED").as_deref(), Some("xyz"));
        assert_eq!(env_str("export TGB_DOTENV_EXPORTED"), None);
    }

    #[test]
    fn dotenv_does_not_override_existing_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "PATH=/nowhere\n").unwrap();

        let before = env_str("PATH");
        load_dotenv_if_present(&path);
        assert_eq!(env_str("PATH"), before);
    }

    #[test]
    fn missing_dotenv_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        load_dotenv_if_present(&dir.path().join(".env"));
    }
}
