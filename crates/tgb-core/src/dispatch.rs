//! `Classified -> Dispatched`: the follow-up request sent for each message kind.

use std::path::{Path, PathBuf};

use crate::{
    message::{Media, MessageKind},
    ports::BotApi,
    session::{BotSession, SendKind},
};

#[derive(Clone, Debug)]
pub struct DispatchOptions {
    pub download_dir: PathBuf,
    /// Also download photo/voice/video before echoing them back.
    pub download_media: bool,
}

impl DispatchOptions {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            download_media: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatched {
    Sent,
    Downloaded(PathBuf),
    Skipped,
    Failed,
}

impl<A: BotApi> BotSession<A> {
    /// Echo text and media back to the chat; store documents locally.
    pub fn dispatch(&self, kind: &MessageKind, opts: &DispatchOptions) -> Dispatched {
        match kind {
            MessageKind::Text(text) => sent(self.send_text(text)),
            MessageKind::Photo(media) => self.echo_media(SendKind::Photo, media, opts),
            MessageKind::Voice(media) => self.echo_media(SendKind::Audio, media, opts),
            MessageKind::Video(media) => self.echo_media(SendKind::Video, media, opts),
            MessageKind::Document(media) => {
                match self.download(&media.file_id, &opts.download_dir) {
                    Some(path) => Dispatched::Downloaded(path),
                    None => Dispatched::Failed,
                }
            }
            MessageKind::Unrecognized => Dispatched::Skipped,
        }
    }

    fn echo_media(&self, kind: SendKind, media: &Media, opts: &DispatchOptions) -> Dispatched {
        if opts.download_media && !self.fetch_copy(media, &opts.download_dir) {
            return Dispatched::Failed;
        }
        sent(self.send_media(kind, &media.file_id))
    }

    fn fetch_copy(&self, media: &Media, dir: &Path) -> bool {
        self.download(&media.file_id, dir).is_some()
    }
}

fn sent(ok: bool) -> Dispatched {
    if ok {
        Dispatched::Sent
    } else {
        Dispatched::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::FileId,
        session::tests::{session, updates},
    };
    use serde_json::json;

    fn media(id: &str) -> Media {
        Media {
            file_id: FileId::from(id),
            caption: None,
        }
    }

    #[test]
    fn text_is_echoed() {
        let mut s = session();
        s.api().json(
            "getUpdates",
            updates(json!({"message_id": 1, "chat": {"id": 3}, "text": "Hi"})),
        );
        assert!(s.check_new_message());
        s.api().json("sendMessage", json!({"ok": true}));

        let kind = s.classify_message();
        assert_eq!(
            s.dispatch(&kind, &DispatchOptions::new("download/")),
            Dispatched::Sent
        );
        assert_eq!(s.api().methods(), vec!["getUpdates", "sendMessage"]);
    }

    #[test]
    fn voice_is_sent_back_as_audio() {
        let mut s = session();
        s.api().json(
            "getUpdates",
            updates(json!({"message_id": 1, "chat": {"id": 3}, "voice": {"file_id": "v1"}})),
        );
        assert!(s.poll());
        s.api().json("sendAudio", json!({"ok": true}));

        let out = s.dispatch(&MessageKind::Voice(media("v1")), &DispatchOptions::new("x"));
        assert_eq!(out, Dispatched::Sent);
        assert_eq!(s.api().methods().last().map(String::as_str), Some("sendAudio"));
    }

    #[test]
    fn document_is_downloaded() {
        let s = session();
        let dir = tempfile::tempdir().unwrap();
        s.api().json(
            "getFile",
            json!({"ok": true, "result": {"file_path": "documents/file_3.csv"}}),
        );

        let out = s.dispatch(
            &MessageKind::Document(media("document.csv")),
            &DispatchOptions::new(dir.path()),
        );
        assert_eq!(out, Dispatched::Downloaded(dir.path().join("file_3.csv")));
    }

    #[test]
    fn media_download_failure_skips_the_echo() {
        let mut s = session();
        s.api().json(
            "getUpdates",
            updates(json!({"message_id": 1, "chat": {"id": 3}, "text": "x"})),
        );
        assert!(s.poll());
        s.api().json("sendPhoto", json!({"ok": true}));

        let dir = tempfile::tempdir().unwrap();
        let opts = DispatchOptions {
            download_dir: dir.path().join("missing"),
            download_media: true,
        };
        assert_eq!(
            s.dispatch(&MessageKind::Photo(media("p")), &opts),
            Dispatched::Failed
        );
        assert!(!s.api().methods().iter().any(|m| m == "sendPhoto"));
    }

    #[test]
    fn unrecognized_is_skipped() {
        let s = session();
        assert_eq!(
            s.dispatch(&MessageKind::Unrecognized, &DispatchOptions::new("x")),
            Dispatched::Skipped
        );
        assert!(s.api().calls().is_empty());
    }
}
