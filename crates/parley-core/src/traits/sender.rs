// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender capability set for posting and editing messages.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::members::MemberLister;
use crate::types::{MessageId, SendableMessage};

/// A backend destination that accepts outbound messages.
///
/// Optional capabilities are discovered through the `as_*` queries instead
/// of type inspection. A `None` answer is not an error.
#[async_trait]
pub trait MessageSender: Send + Sync + 'static {
    /// Sends a message and returns the authoritative id assigned to it.
    ///
    /// May block on network I/O; it is only ever awaited off the UI context.
    async fn send(&self, msg: SendableMessage) -> Result<MessageId, ParleyError>;

    /// Returns the edit capability, if this sender supports editing.
    fn as_editor(&self) -> Option<Arc<dyn MessageEditor>> {
        None
    }

    /// Returns the member-listing capability, if this sender has one.
    fn as_member_lister(&self) -> Option<Arc<dyn MemberLister>> {
        None
    }
}

/// Edit capability of a sender.
#[async_trait]
pub trait MessageEditor: Send + Sync + 'static {
    /// Whether the message with the given id may be edited by the current user.
    ///
    /// Called on the UI context, so it must answer from local state.
    fn message_editable(&self, id: &MessageId) -> bool;

    /// Fetches the unrendered content of a message for editing.
    async fn raw_message_content(&self, id: &MessageId) -> Result<String, ParleyError>;

    /// Replaces the content of a message.
    async fn edit(&self, id: &MessageId, content: String) -> Result<(), ParleyError>;
}
