// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock backend capabilities for deterministic testing.
//!
//! `MockSender` captures every message it is asked to send, answers from a
//! script of outcomes (success by default), and drives the upload progress
//! handles of each attachment. Edit support is opt-in through `MockEditor`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use parley_core::{
    MemberLister, MessageEditor, MessageId, MessageSender, ParleyError, SendableMessage,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted result of one `send` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Succeed,
    Fail(String),
}

/// A mock sender for testing.
#[derive(Default)]
pub struct MockSender {
    sent: Mutex<Vec<SendableMessage>>,
    script: Mutex<VecDeque<SendOutcome>>,
    failing_uploads: Mutex<HashSet<String>>,
    silent_uploads: bool,
    latency: Option<Duration>,
    editor: Option<Arc<MockEditor>>,
    members: Option<Arc<dyn MemberLister>>,
}

impl MockSender {
    /// A sender that accepts every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposes edit support through `editor`.
    pub fn with_editor(mut self, editor: Arc<MockEditor>) -> Self {
        self.editor = Some(editor);
        self
    }

    /// Exposes member listing through `lister`.
    pub fn with_member_lister(mut self, lister: Arc<dyn MemberLister>) -> Self {
        self.members = Some(lister);
        self
    }

    /// Delays every send by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes uploads of the attachment named `file` fail.
    pub fn fail_upload(self, file: &str) -> Self {
        lock(&self.failing_uploads).insert(file.to_string());
        self
    }

    /// Leaves every progress handle untouched, like a backend that uploads
    /// attachments inline with the message.
    pub fn with_silent_uploads(mut self) -> Self {
        self.silent_uploads = true;
        self
    }

    /// Queues the outcome of a future `send` call.
    pub fn script(&self, outcome: SendOutcome) {
        lock(&self.script).push_back(outcome);
    }

    /// Makes the next `send` call fail with `message`.
    pub fn fail_next(&self, message: &str) {
        self.script(SendOutcome::Fail(message.to_string()));
    }

    /// Every message passed to `send`, in call order.
    pub fn sent(&self) -> Vec<SendableMessage> {
        lock(&self.sent).clone()
    }

    pub fn sent_count(&self) -> usize {
        lock(&self.sent).len()
    }
}

#[async_trait]
impl MessageSender for MockSender {
    async fn send(&self, msg: SendableMessage) -> Result<MessageId, ParleyError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failing = lock(&self.failing_uploads).clone();
        let reported = if self.silent_uploads { &[][..] } else { &msg.attachments[..] };
        for attachment in reported {
            if failing.contains(&attachment.file.name) {
                attachment.progress.advance(attachment.file.size / 2);
                attachment.progress.fail("upload rejected");
            } else {
                attachment.progress.advance(attachment.file.size);
                attachment.progress.complete();
            }
        }

        let outcome = lock(&self.script)
            .pop_front()
            .unwrap_or(SendOutcome::Succeed);
        lock(&self.sent).push(msg);

        match outcome {
            SendOutcome::Succeed => Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4()))),
            SendOutcome::Fail(message) => Err(ParleyError::send(message)),
        }
    }

    fn as_editor(&self) -> Option<Arc<dyn MessageEditor>> {
        self.editor
            .clone()
            .map(|editor| editor as Arc<dyn MessageEditor>)
    }

    fn as_member_lister(&self) -> Option<Arc<dyn MemberLister>> {
        self.members.clone()
    }
}

/// A mock editor holding the raw content of editable messages.
#[derive(Debug, Default)]
pub struct MockEditor {
    contents: Mutex<HashMap<MessageId, String>>,
    editable: Mutex<HashSet<MessageId>>,
    fail_fetch: AtomicBool,
    fail_edit: AtomicBool,
    edits: Mutex<Vec<(MessageId, String)>>,
}

impl MockEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an editable message.
    pub fn with_message(self, id: &str, content: &str) -> Self {
        let id = MessageId::from(id);
        lock(&self.contents).insert(id.clone(), content.to_string());
        lock(&self.editable).insert(id);
        self
    }

    /// Adds a message the backend refuses to edit.
    pub fn with_readonly_message(self, id: &str, content: &str) -> Self {
        lock(&self.contents).insert(MessageId::from(id), content.to_string());
        self
    }

    /// Grants or revokes edit permission for `id`.
    pub fn set_editable(&self, id: &str, editable: bool) {
        let id = MessageId::from(id);
        let mut allowed = lock(&self.editable);
        if editable {
            allowed.insert(id);
        } else {
            allowed.remove(&id);
        }
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_edit(&self, fail: bool) {
        self.fail_edit.store(fail, Ordering::SeqCst);
    }

    /// Every edit request, in call order.
    pub fn edits(&self) -> Vec<(MessageId, String)> {
        lock(&self.edits).clone()
    }

    pub fn content(&self, id: &str) -> Option<String> {
        lock(&self.contents).get(&MessageId::from(id)).cloned()
    }
}

#[async_trait]
impl MessageEditor for MockEditor {
    fn message_editable(&self, id: &MessageId) -> bool {
        lock(&self.editable).contains(id)
    }

    async fn raw_message_content(&self, id: &MessageId) -> Result<String, ParleyError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ParleyError::fetch("message unavailable"));
        }
        lock(&self.contents)
            .get(id)
            .cloned()
            .ok_or_else(|| ParleyError::fetch(format!("unknown message {id}")))
    }

    async fn edit(&self, id: &MessageId, content: String) -> Result<(), ParleyError> {
        lock(&self.edits).push((id.clone(), content.clone()));
        if self.fail_edit.load(Ordering::SeqCst) {
            return Err(ParleyError::edit("edit rejected"));
        }
        lock(&self.contents).insert(id.clone(), content);
        Ok(())
    }
}
