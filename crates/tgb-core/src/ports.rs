use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::Result;

/// Hexagonal port for the Telegram Bot HTTP API.
///
/// Synchronous on purpose: the session is driven by a single blocking poll
/// loop. `tgb-http` implements this over `reqwest::blocking`; tests use fakes.
pub trait BotApi {
    /// POST `params` as a form to `url` and return the parsed JSON body.
    ///
    /// Only transport and decode failures are errors; an API-level
    /// `{"ok": false}` is a successful call.
    fn post_form(&self, url: &str, params: &[(&str, String)]) -> Result<Value>;

    /// Fetch `url` and write it into `dest_dir`, returning the written path.
    fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// View over a Bot API JSON reply (`{"ok": ..., "result": ...}`).
#[derive(Clone, Copy, Debug)]
pub struct ApiReply<'a>(pub &'a Value);

impl<'a> ApiReply<'a> {
    /// The single success convention used for every endpoint: `ok` is truthy.
    pub fn is_ok(&self) -> bool {
        self.0.get("ok").is_some_and(is_truthy)
    }

    pub fn result(&self) -> Option<&'a Value> {
        self.0.get("result")
    }

    pub fn description(&self) -> Option<&'a str> {
        self.0.get("description").and_then(Value::as_str)
    }
}

/// JSON truthiness: `true`, non-zero numbers, non-empty strings/arrays/objects.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
