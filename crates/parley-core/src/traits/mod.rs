// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces the core consumes from the backend and exposes to the
//! presentation layer.
//!
//! Backend capabilities use `#[async_trait]` so they can be held as
//! `Arc<dyn ...>` and copied into background work. Presentation traits are
//! synchronous and only ever called on the UI-owning context.

pub mod members;
pub mod presentation;
pub mod sender;

pub use members::{MemberListSink, MemberLister};
pub use presentation::{PresendContainer, PresendController};
pub use sender::{MessageEditor, MessageSender};
