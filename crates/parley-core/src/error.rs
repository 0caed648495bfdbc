// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley chat client core.

use thiserror::Error;

/// The primary error type used across backend capabilities and core operations.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Configuration errors surfaced at runtime (invalid values, missing identity).
    #[error("configuration error: {0}")]
    Config(String),

    /// Sending a message to the backend failed.
    #[error("failed to send message: {message}")]
    Send {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Editing a previously committed message failed.
    #[error("failed to edit message: {message}")]
    Edit {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Fetching raw message content (for editing) failed.
    #[error("failed to get message content: {message}")]
    Fetch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Listing members failed.
    #[error("failed to list members: {message}")]
    MemberList {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An attachment upload failed.
    #[error("failed to upload {file}: {message}")]
    Upload { file: String, message: String },

    /// The UI loop has shut down and can no longer accept work.
    #[error("ui loop closed")]
    Closed,

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Shorthand for a send failure without an underlying source.
    pub fn send(message: impl Into<String>) -> Self {
        ParleyError::Send {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for an edit failure without an underlying source.
    pub fn edit(message: impl Into<String>) -> Self {
        ParleyError::Edit {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a content fetch failure without an underlying source.
    pub fn fetch(message: impl Into<String>) -> Self {
        ParleyError::Fetch {
            message: message.into(),
            source: None,
        }
    }

    /// Renders the error as a single line suitable for inline display.
    ///
    /// The innermost cause is preferred because it usually carries the
    /// backend's own wording ("rate limited", "connection reset").
    pub fn humanize(&self) -> String {
        use std::error::Error as _;

        let text = match self.source() {
            Some(mut cause) => {
                while let Some(next) = cause.source() {
                    cause = next;
                }
                cause.to_string()
            }
            None => match self {
                ParleyError::Send { message, .. }
                | ParleyError::Edit { message, .. }
                | ParleyError::Fetch { message, .. }
                | ParleyError::MemberList { message, .. } => message.clone(),
                ParleyError::Upload { file, message } => format!("{file}: {message}"),
                other => other.to_string(),
            },
        };

        let mut chars = text.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => text,
        }
    }
}
