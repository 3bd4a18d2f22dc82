//! Outbound player messaging seam.
//!
//! Diplomacy needs to mail alliance members and post server-wide notices;
//! delivery belongs to the session layer, so the core talks to this trait.

use std::sync::Mutex;

use spitfire_protocol::ClientId;

pub trait Notifier: Send + Sync {
    /// In-game mail delivered to each recipient.
    fn alliance_message(&self, recipients: &[ClientId], message: &str);

    /// Server-wide system notice.
    fn broadcast(&self, message: &str);
}

/// Drops every notification; for tools and offline maintenance paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn alliance_message(&self, _recipients: &[ClientId], _message: &str) {}

    fn broadcast(&self, _message: &str) {}
}

/// Captures notifications for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub alliance_messages: Mutex<Vec<(Vec<ClientId>, String)>>,
    pub broadcasts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().expect("notifier lock").len()
    }
}

impl Notifier for RecordingNotifier {
    fn alliance_message(&self, recipients: &[ClientId], message: &str) {
        self.alliance_messages
            .lock()
            .expect("notifier lock")
            .push((recipients.to_vec(), message.to_string()));
    }

    fn broadcast(&self, message: &str) {
        self.broadcasts
            .lock()
            .expect("notifier lock")
            .push(message.to_string());
    }
}
