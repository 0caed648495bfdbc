// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process backend for the demo session.
//!
//! Sends succeed after a short delay, except every `fail_every`-th call,
//! which is refused. Attachments upload in chunks. Committed messages can
//! be edited. The member lister publishes a small roster and then flips
//! presence on a timer until its listing is cancelled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use parley_core::{
    ListMember, MemberListSink, MemberLister, MemberSection, MemberStatus, MessageEditor,
    MessageId, MessageSender, ParleyError, SendableMessage,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const UPLOAD_CHUNKS: u64 = 4;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Committed message contents, shared by the sender and the editor.
#[derive(Debug, Default)]
pub struct Store {
    messages: Mutex<HashMap<MessageId, String>>,
}

impl Store {
    pub fn content(&self, id: &MessageId) -> Option<String> {
        lock(&self.messages).get(id).cloned()
    }
}

#[async_trait]
impl MessageEditor for Store {
    fn message_editable(&self, id: &MessageId) -> bool {
        lock(&self.messages).contains_key(id)
    }

    async fn raw_message_content(&self, id: &MessageId) -> Result<String, ParleyError> {
        self.content(id)
            .ok_or_else(|| ParleyError::fetch(format!("no message {id}")))
    }

    async fn edit(&self, id: &MessageId, content: String) -> Result<(), ParleyError> {
        match lock(&self.messages).get_mut(id) {
            Some(stored) => {
                *stored = content;
                debug!(id = %id, "loopback edited message");
                Ok(())
            }
            None => Err(ParleyError::edit(format!("no message {id}"))),
        }
    }
}

#[derive(Debug)]
pub struct LoopbackSender {
    calls: AtomicU64,
    fail_every: u64,
    latency: Duration,
    store: Arc<Store>,
    members: Arc<LoopbackMembers>,
}

impl LoopbackSender {
    /// `fail_every == 0` never fails.
    pub fn new(fail_every: u64, latency: Duration) -> Self {
        Self {
            calls: AtomicU64::new(0),
            fail_every,
            latency,
            store: Arc::new(Store::default()),
            members: Arc::new(LoopbackMembers::new(latency * 4)),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSender for LoopbackSender {
    async fn send(&self, msg: SendableMessage) -> Result<MessageId, ParleyError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.latency).await;

        for attachment in &msg.attachments {
            let chunk = attachment.file.size.div_ceil(UPLOAD_CHUNKS);
            let mut left = attachment.file.size;
            while left > 0 {
                let step = chunk.min(left);
                tokio::time::sleep(self.latency / UPLOAD_CHUNKS as u32).await;
                attachment.progress.advance(step);
                left -= step;
            }
            attachment.progress.complete();
        }

        if self.fail_every > 0 && call % self.fail_every == 0 {
            info!(call, nonce = %msg.nonce, "loopback refusing send");
            return Err(ParleyError::send(format!("loopback refused send #{call}")));
        }

        let id = MessageId(format!("loop-{}", uuid::Uuid::new_v4()));
        lock(&self.store.messages).insert(id.clone(), msg.content);
        Ok(id)
    }

    fn as_editor(&self) -> Option<Arc<dyn MessageEditor>> {
        Some(Arc::clone(&self.store) as Arc<dyn MessageEditor>)
    }

    fn as_member_lister(&self) -> Option<Arc<dyn MemberLister>> {
        Some(Arc::clone(&self.members) as Arc<dyn MemberLister>)
    }
}

#[derive(Debug)]
pub struct LoopbackMembers {
    presence_interval: Duration,
}

impl LoopbackMembers {
    fn new(presence_interval: Duration) -> Self {
        Self { presence_interval }
    }

    fn roster() -> Vec<(&'static str, ListMember)> {
        let member = |id: &str, name: &str, status, mention: Option<&str>| ListMember {
            id: id.into(),
            name: name.into(),
            status,
            secondary: None,
            mention: mention.map(str::to_string),
        };
        vec![
            ("online", member("m-1", "mara", MemberStatus::Online, Some("@mara"))),
            ("online", member("m-2", "ines", MemberStatus::Busy, Some("@ines"))),
            ("online", member("m-3", "theo", MemberStatus::Idle, None)),
            ("offline", member("m-4", "oskar", MemberStatus::Offline, Some("@oskar"))),
        ]
    }
}

#[async_trait]
impl MemberLister for LoopbackMembers {
    async fn list_members(
        &self,
        sink: Arc<dyn MemberListSink>,
    ) -> Result<CancellationToken, ParleyError> {
        let roster = Self::roster();
        sink.set_sections(vec![
            MemberSection {
                id: "online".into(),
                name: "Online".into(),
                total: 3,
            },
            MemberSection {
                id: "offline".into(),
                name: "Offline".into(),
                total: 0,
            },
        ]);
        for (section, member) in &roster {
            sink.set_member(section, member.clone());
        }

        let stop = CancellationToken::new();
        let token = stop.clone();
        let interval = self.presence_interval;
        tokio::spawn(async move {
            let (_, mut theo) = roster[2].clone();
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        theo.status = match theo.status {
                            MemberStatus::Idle => MemberStatus::Online,
                            _ => MemberStatus::Idle,
                        };
                        sink.set_member("online", theo.clone());
                    }
                }
            }
            debug!("loopback presence updates stopped");
        });
        Ok(stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{AttachmentFile, Author, Nonce, ProgressEvent, SendableAttachment, UploadProgress};

    fn message(content: &str, attachments: Vec<SendableAttachment>) -> SendableMessage {
        SendableMessage {
            nonce: Nonce::new("n"),
            time: Default::default(),
            content: content.into(),
            author: Author {
                id: "u".into(),
                name: "u".into(),
                avatar_url: None,
            },
            reply_to: None,
            attachments,
        }
    }

    #[tokio::test]
    async fn every_kth_send_fails() {
        let sender = LoopbackSender::new(2, Duration::ZERO);
        assert!(sender.send(message("a", Vec::new())).await.is_ok());
        assert!(sender.send(message("b", Vec::new())).await.is_err());
        assert!(sender.send(message("c", Vec::new())).await.is_ok());
        assert_eq!(sender.calls(), 3);
    }

    #[tokio::test]
    async fn uploads_report_every_byte() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let attachment = SendableAttachment {
            file: AttachmentFile {
                name: "a.bin".into(),
                path: "/tmp/a.bin".into(),
                size: 10,
            },
            progress: UploadProgress::new(move |event| sink.lock().unwrap().push(event)),
        };
        let sender = LoopbackSender::new(0, Duration::ZERO);
        sender.send(message("a", vec![attachment])).await.unwrap();

        let events = events.lock().unwrap();
        let sent: u64 = events
            .iter()
            .map(|event| match event {
                ProgressEvent::Advanced(n) => *n,
                _ => 0,
            })
            .sum();
        assert_eq!(sent, 10);
        assert_eq!(events.last(), Some(&ProgressEvent::Completed));
    }

    #[tokio::test]
    async fn committed_messages_are_editable() {
        let sender = LoopbackSender::new(0, Duration::ZERO);
        let id = sender.send(message("first", Vec::new())).await.unwrap();
        let editor = sender.as_editor().unwrap();

        assert!(editor.message_editable(&id));
        assert_eq!(editor.raw_message_content(&id).await.unwrap(), "first");
        editor.edit(&id, "second".into()).await.unwrap();
        assert_eq!(sender.store().content(&id).as_deref(), Some("second"));
        assert!(!editor.message_editable(&MessageId::from("other")));
    }
}
