use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    config::Config,
    domain::{ChatId, FileId, MessageId},
    errors::Error,
    message::{Media, MediaLabel, Message, MessageKind},
    ports::{ApiReply, BotApi},
    Result,
};

/// Outbound media endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendKind {
    Photo,
    Audio,
    Video,
}

impl SendKind {
    pub fn method(self) -> &'static str {
        match self {
            SendKind::Photo => "sendPhoto",
            SendKind::Audio => "sendAudio",
            SendKind::Video => "sendVideo",
        }
    }

    /// Form field carrying the file id.
    pub fn field(self) -> &'static str {
        match self {
            SendKind::Photo => "photo",
            SendKind::Audio => "audio",
            SendKind::Video => "video",
        }
    }
}

/// Polling session against one bot token.
///
/// Owns all mutable state exclusively; one session drives one poll loop.
/// Every public operation degrades failures to `false`/`None` (logged), so a
/// single bad cycle never stops the caller's loop.
pub struct BotSession<A: BotApi> {
    api: A,
    api_key: String,
    base_url: String,
    file_base_url: String,

    chat_id: Option<ChatId>,
    last_message_id: MessageId,
    current_message: Message,

    // Set only when stale-message filtering is enabled.
    reference_time: Option<DateTime<Utc>>,
}

impl<A: BotApi> BotSession<A> {
    pub fn new(cfg: &Config, api: A) -> Self {
        tracing::info!("Starting bot session");
        let api_base = cfg.api_base.trim_end_matches('/');
        let reference_time = cfg.skip_stale_messages.then(Utc::now);

        Self {
            api,
            api_key: cfg.api_key.clone(),
            base_url: format!("{api_base}/bot{}/", cfg.api_key),
            file_base_url: format!("{api_base}/file/bot{}/", cfg.api_key),
            chat_id: None,
            last_message_id: MessageId::default(),
            current_message: Message::default(),
            reference_time,
        }
    }

    /// Replace the staleness reference applied by `poll()`/`check_new_message()`.
    pub fn with_reference_time(mut self, reference: Option<DateTime<Utc>>) -> Self {
        self.reference_time = reference;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn file_base_url(&self) -> &str {
        &self.file_base_url
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        self.chat_id
    }

    pub fn last_message_id(&self) -> MessageId {
        self.last_message_id
    }

    pub fn current_message(&self) -> &Message {
        &self.current_message
    }

    pub fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.reference_time
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}{method}", self.base_url)
    }

    // ============== Polling ==============

    /// Fetch the most recent update and make it the current message.
    ///
    /// Returns `false` (state untouched) on transport failure, `ok` not
    /// truthy, an empty/missing `result`, or a stale message.
    pub fn poll(&mut self) -> bool {
        self.poll_with(self.reference_time)
    }

    /// `poll()` with an explicit staleness reference.
    pub fn poll_since(&mut self, reference: DateTime<Utc>) -> bool {
        self.poll_with(Some(reference))
    }

    fn poll_with(&mut self, reference: Option<DateTime<Utc>>) -> bool {
        let (chat_id, message) = match self.fetch_latest() {
            Ok(Some(latest)) => latest,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!("getUpdates failed: {e}");
                return false;
            }
        };

        if let Some(reference) = reference {
            if is_stale(&message, reference) {
                tracing::debug!(
                    "Ignoring stale message {:?} (date {:?})",
                    message.message_id(),
                    message.date()
                );
                return false;
            }
        }

        self.chat_id = Some(chat_id);
        self.current_message = message;
        true
    }

    fn fetch_latest(&self) -> Result<Option<(ChatId, Message)>> {
        let resp = self
            .api
            .post_form(&self.method_url("getUpdates"), &[("offset", "-1".to_string())])?;
        tracing::debug!("Incoming data: {resp}");

        let reply = ApiReply(&resp);
        if !reply.is_ok() {
            return Err(api_error("getUpdates", reply));
        }

        // Telegram keeps updates for 24h; with none pending it answers
        // {"ok":true,"result":[]}.
        let Some(last) = reply
            .result()
            .and_then(Value::as_array)
            .and_then(|updates| updates.last())
        else {
            return Ok(None);
        };

        let Some(message) = last.get("message").cloned().and_then(Message::from_value) else {
            tracing::debug!("Latest update carries no message");
            return Ok(None);
        };
        let Some(chat_id) = message.chat_id() else {
            tracing::warn!("Latest message has no chat id");
            return Ok(None);
        };

        Ok(Some((chat_id, message)))
    }

    /// Poll, and report whether the latest message differs from the last one seen.
    ///
    /// Only the single last acknowledged id is remembered: several messages
    /// arriving between two polls collapse to the newest one.
    pub fn check_new_message(&mut self) -> bool {
        self.poll() && self.acknowledge_if_new()
    }

    /// `check_new_message()` with an explicit staleness reference.
    pub fn check_new_message_since(&mut self, reference: DateTime<Utc>) -> bool {
        self.poll_since(reference) && self.acknowledge_if_new()
    }

    fn acknowledge_if_new(&mut self) -> bool {
        let Some(message_id) = self.current_message.message_id() else {
            return false;
        };
        if message_id == self.last_message_id {
            return false;
        }
        self.last_message_id = message_id;
        true
    }

    // ============== Classification ==============

    pub fn classify_message(&self) -> MessageKind {
        tracing::debug!("Message info {:?}", self.current_message);
        let kind = self.current_message.classify();
        if kind == MessageKind::Unrecognized {
            tracing::error!("None accepted type detected");
        }
        kind
    }

    pub fn extract_text(&self) -> Option<String> {
        let text = self.current_message.text_lossy()?;
        tracing::info!("Detected text message: {text}");
        Some(text)
    }

    pub fn extract_media(&self, label: MediaLabel) -> Option<Media> {
        let media = self.current_message.media(label)?;
        tracing::info!("Detected {} file: {}", label.key(), media.file_id);
        Some(media)
    }

    /// `extract_media()`, downloading the file into `dest_dir` first.
    ///
    /// Returns `None` if the download fails.
    pub fn extract_media_and_download(&self, label: MediaLabel, dest_dir: &Path) -> Option<Media> {
        let media = self.extract_media(label)?;
        self.download(&media.file_id, dest_dir)?;
        Some(media)
    }

    // ============== Sending ==============

    /// Send a text message to the current chat.
    ///
    /// Transport failures and `{"ok": false}` both yield `false`.
    pub fn send_text(&self, text: &str) -> bool {
        let Some(chat_id) = self.require_chat("sendMessage") else {
            return false;
        };
        tracing::info!("Sending message {text} to {chat_id}");
        self.post_ok(
            "sendMessage",
            &[("chat_id", chat_id.to_string()), ("text", text.to_string())],
        )
    }

    /// Re-send media already stored on Telegram's servers to the current chat.
    pub fn send_media(&self, kind: SendKind, file_id: &FileId) -> bool {
        let method = kind.method();
        let Some(chat_id) = self.require_chat(method) else {
            return false;
        };
        tracing::info!("Sending {} {file_id} to {chat_id}", kind.field());
        self.post_ok(
            method,
            &[
                ("chat_id", chat_id.to_string()),
                (kind.field(), file_id.to_string()),
            ],
        )
    }

    pub fn send_photo(&self, file_id: &FileId) -> bool {
        self.send_media(SendKind::Photo, file_id)
    }

    pub fn send_audio(&self, file_id: &FileId) -> bool {
        self.send_media(SendKind::Audio, file_id)
    }

    pub fn send_video(&self, file_id: &FileId) -> bool {
        self.send_media(SendKind::Video, file_id)
    }

    fn require_chat(&self, method: &str) -> Option<ChatId> {
        if self.chat_id.is_none() {
            tracing::warn!("{method}: no chat id yet (no update received)");
        }
        self.chat_id
    }

    fn post_ok(&self, method: &str, params: &[(&str, String)]) -> bool {
        match self.api.post_form(&self.method_url(method), params) {
            Ok(resp) => {
                let reply = ApiReply(&resp);
                if !reply.is_ok() {
                    tracing::warn!("{}", api_error(method, reply));
                }
                reply.is_ok()
            }
            Err(e) => {
                tracing::error!("{method} failed: {e}");
                false
            }
        }
    }

    // ============== Download ==============

    /// Download the file behind `file_id` into an existing directory.
    ///
    /// No request is issued when `dest_dir` is not a directory.
    pub fn download(&self, file_id: &FileId, dest_dir: &Path) -> Option<PathBuf> {
        match self.try_download(file_id, dest_dir) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!("Download of {file_id} failed: {e}");
                None
            }
        }
    }

    fn try_download(&self, file_id: &FileId, dest_dir: &Path) -> Result<PathBuf> {
        if !dest_dir.is_dir() {
            return Err(Error::InvalidPath {
                path: dest_dir.to_path_buf(),
                reason: "folder not found".to_string(),
            });
        }

        let url = self.method_url("getFile");
        tracing::info!("Trying to download {file_id}");
        let resp = self
            .api
            .post_form(&url, &[("file_id", file_id.to_string())])?;
        tracing::debug!("Download file response: {resp}");

        let reply = ApiReply(&resp);
        if !reply.is_ok() {
            return Err(api_error("getFile", reply));
        }
        let file_path = reply
            .result()
            .and_then(|r| r.get("file_path"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Api("getFile: response without file_path".to_string()))?;

        let download_url = format!("{}{file_path}", self.file_base_url);
        tracing::info!("Trying to download {file_path}");
        self.api.download(&download_url, dest_dir)
    }
}

fn is_stale(message: &Message, reference: DateTime<Utc>) -> bool {
    message
        .date()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .is_some_and(|sent| sent < reference)
}

fn api_error(method: &str, reply: ApiReply<'_>) -> Error {
    Error::Api(format!(
        "{method}: {}",
        reply.description().unwrap_or("request not ok")
    ))
}
