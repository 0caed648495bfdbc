// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Member-list capability and the sink it streams updates into.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ParleyError;
use crate::types::{ListMember, MemberSection};

/// Receives incremental member-list updates from a background producer.
///
/// Implementations must be callable from any thread; they are expected to
/// forward each update onto the UI-owning context in call order.
pub trait MemberListSink: Send + Sync + 'static {
    /// Replaces the full set of sections.
    fn set_sections(&self, sections: Vec<MemberSection>);

    /// Inserts or updates a member in a section.
    fn set_member(&self, section_id: &str, member: ListMember);

    /// Removes a member from a section.
    fn remove_member(&self, section_id: &str, member_id: &str);
}

/// Member-listing capability of a sender.
#[async_trait]
pub trait MemberLister: Send + Sync + 'static {
    /// Starts streaming the member list into `sink`.
    ///
    /// Returns a token that stops the stream when cancelled.
    async fn list_members(
        &self,
        sink: Arc<dyn MemberListSink>,
    ) -> Result<CancellationToken, ParleyError>;
}
