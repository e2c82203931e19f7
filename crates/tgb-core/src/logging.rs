use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize logging/tracing for the bot.
pub fn init(service_name: &str) -> Result<()> {
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(service_name)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::Config(format!("logging init failed: {e}")))
}

fn default_filter(service_name: &str) -> String {
    format!("info,tgb=info,tgb_core=info,tgb_http=info,{service_name}=info")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_info() {
        let f = default_filter("tgb");
        assert!(f.starts_with("info,tgb=info,tgb_core=info,tgb_http=info"));
        assert!(EnvFilter::try_new(&f).is_ok());
    }
}
