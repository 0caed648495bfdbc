// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared between the dispatch, compose, and member-list crates.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Authoritative identifier for a message, assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        MessageId(value.to_string())
    }
}

/// Client-generated temporary identifier for a not-yet-confirmed message.
///
/// Nonces are produced by the nonce generator in `parley-compose`; this type
/// only carries the encoded token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nonce(String);

impl Nonce {
    /// Wraps an already-encoded nonce token.
    pub fn new(token: impl Into<String>) -> Self {
        Nonce(token.into())
    }

    /// Returns the encoded token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a message author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// A file selected for attachment to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    /// Display name (usually the file name).
    pub name: String,
    /// Source handle the backend reads from.
    pub path: PathBuf,
    /// Total size in bytes, used for progress fractions.
    pub size: u64,
}

/// Progress notification emitted by a backend while it uploads one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// `n` more bytes were transmitted.
    Advanced(u64),
    /// The upload finished successfully.
    Completed,
    /// The upload failed with the given reason.
    Failed(String),
}

/// Thread-safe progress handle given to the backend for one attachment.
///
/// Cloning is cheap; every clone reports into the same upload task.
#[derive(Clone)]
pub struct UploadProgress(Arc<dyn Fn(ProgressEvent) + Send + Sync>);

impl UploadProgress {
    /// Creates a progress handle that forwards every event to `sink`.
    pub fn new(sink: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        UploadProgress(Arc::new(sink))
    }

    /// A handle that discards all events.
    pub fn noop() -> Self {
        UploadProgress::new(|_| {})
    }

    /// Reports `bytes` more bytes transmitted.
    pub fn advance(&self, bytes: u64) {
        (self.0)(ProgressEvent::Advanced(bytes));
    }

    /// Reports successful completion.
    pub fn complete(&self) {
        (self.0)(ProgressEvent::Completed);
    }

    /// Reports failure.
    pub fn fail(&self, reason: impl Into<String>) {
        (self.0)(ProgressEvent::Failed(reason.into()));
    }
}

impl fmt::Debug for UploadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadProgress").finish_non_exhaustive()
    }
}

/// Everything the user composed for one send attempt.
///
/// Created synchronously on the send action. The nonce is its identity key
/// until the backend assigns a [`MessageId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresendMessage {
    pub nonce: Nonce,
    pub time: DateTime<Utc>,
    pub content: String,
    pub author: Author,
    pub reply_to: Option<MessageId>,
    pub files: Vec<AttachmentFile>,
}

/// One attachment as handed to the backend, with its progress handle.
#[derive(Debug, Clone)]
pub struct SendableAttachment {
    pub file: AttachmentFile,
    pub progress: UploadProgress,
}

/// The message as handed to the sender capability.
#[derive(Debug, Clone)]
pub struct SendableMessage {
    pub nonce: Nonce,
    pub time: DateTime<Utc>,
    pub content: String,
    pub author: Author,
    pub reply_to: Option<MessageId>,
    pub attachments: Vec<SendableAttachment>,
}

/// Presence status of a listed member.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum MemberStatus {
    Online,
    Busy,
    Idle,
    Offline,
    #[default]
    Unknown,
}

/// A section header in a member list (e.g. a role group).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSection {
    pub id: String,
    pub name: String,
    /// Total member count reported by the backend; `0` hides the count.
    pub total: usize,
}

/// One entry in a member list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMember {
    pub id: String,
    pub name: String,
    pub status: MemberStatus,
    /// Secondary line (activity, bot tag).
    pub secondary: Option<String>,
    /// Mention target shown in the member's popover, if the backend has one.
    pub mention: Option<String>,
}
