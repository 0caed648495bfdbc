// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock member lister that replays a fixed roster into the sink.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use parley_core::{ListMember, MemberListSink, MemberLister, MemberSection, ParleyError};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct MockMemberLister {
    sections: Vec<MemberSection>,
    members: Vec<(String, ListMember)>,
    fail: bool,
    calls: AtomicUsize,
    tokens: Mutex<Vec<CancellationToken>>,
    sinks: Mutex<Vec<Arc<dyn MemberListSink>>>,
}

impl std::fmt::Debug for MockMemberLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockMemberLister")
            .field("sections", &self.sections.len())
            .field("members", &self.members.len())
            .field("fail", &self.fail)
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

impl MockMemberLister {
    pub fn new(sections: Vec<MemberSection>, members: Vec<(String, ListMember)>) -> Self {
        Self {
            sections,
            members,
            ..Self::default()
        }
    }

    /// A lister whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tokens handed out so far, one per successful call.
    pub fn tokens(&self) -> Vec<CancellationToken> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The sink given to the latest successful call, for pushing live updates.
    pub fn last_sink(&self) -> Option<Arc<dyn MemberListSink>> {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

#[async_trait]
impl MemberLister for MockMemberLister {
    async fn list_members(
        &self,
        sink: Arc<dyn MemberListSink>,
    ) -> Result<CancellationToken, ParleyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ParleyError::MemberList {
                message: "member list unavailable".into(),
                source: None,
            });
        }

        sink.set_sections(self.sections.clone());
        for (section, member) in &self.members {
            sink.set_member(section, member.clone());
        }

        let token = CancellationToken::new();
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(token.clone());
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
        Ok(token)
    }
}
