// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley chat client.
//!
//! This crate provides the error taxonomy, shared value types, and the
//! interfaces the coordination core consumes from the backend (sender,
//! editor, member lister) and exposes to the presentation layer
//! (presend placeholders and their controller).

pub mod error;
pub mod markup;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParleyError;
pub use types::{
    AttachmentFile, Author, ListMember, MemberSection, MemberStatus, MessageId, Nonce,
    PresendMessage, ProgressEvent, SendableAttachment, SendableMessage, UploadProgress,
};

pub use traits::{
    MemberListSink, MemberLister, MessageEditor, MessageSender, PresendContainer,
    PresendController,
};
