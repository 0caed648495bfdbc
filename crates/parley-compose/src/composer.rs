// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The compose input and the lifecycle of every message it sends.
//!
//! A send moves through `Sending` to either committed (removed from the
//! registry after `set_done`) or `Failed` (kept for a manual retry or
//! discard). A send is finalized only once the backend confirmed it and
//! every attachment upload has settled; a failed upload fails the send.
//!
//! All state here lives on the UI loop. Background work only ever holds
//! copies (the sender handle, the message) and reports back through the
//! composer's [`Scoped`] dispatcher.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use parley_config::model::{ComposeConfig, IdentityConfig};
use parley_core::{
    AttachmentFile, Author, MessageEditor, MessageId, MessageSender, Nonce, ParleyError,
    PresendContainer, PresendController, PresendMessage, ProgressEvent, SendableAttachment,
    SendableMessage, UploadProgress,
};
use parley_dispatch::{Scoped, scoped_job};
use tracing::{debug, info, warn};

use crate::nonce::NonceGenerator;
use crate::upload::UploadCoordinator;

/// Where a pending send stands. Committed sends leave the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendState {
    /// In flight. `confirmed` holds the backend id once the send call
    /// returned.
    Sending { confirmed: Option<MessageId> },
    Failed { reason: String },
}

impl fmt::Display for SendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendState::Sending { confirmed: None } => write!(f, "sending"),
            SendState::Sending { confirmed: Some(_) } => write!(f, "uploading"),
            SendState::Failed { .. } => write!(f, "failed"),
        }
    }
}

/// One outbound message attempt, keyed by its nonce.
pub struct PendingSend {
    message: PresendMessage,
    state: SendState,
    container: Box<dyn PresendContainer>,
    uploads: UploadCoordinator,
}

impl PendingSend {
    pub fn message(&self) -> &PresendMessage {
        &self.message
    }

    pub fn state(&self) -> &SendState {
        &self.state
    }

    pub fn uploads(&self) -> &UploadCoordinator {
        &self.uploads
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, SendState::Failed { .. })
    }
}

impl fmt::Debug for PendingSend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSend")
            .field("nonce", &self.message.nonce)
            .field("state", &self.state)
            .field("uploads", &self.uploads.len())
            .finish_non_exhaustive()
    }
}

/// What `send_input` submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Sent(Nonce),
    Edited(MessageId),
}

/// Fallback author fields, used when the controller has no authoritative
/// record for the current user.
#[derive(Debug, Clone)]
struct LocalProfile {
    display_name: String,
    avatar_url: Option<String>,
}

pub struct Composer<S: 'static> {
    scope: Scoped<S, Composer<S>>,
    controller: Box<dyn PresendController>,
    nonces: Arc<NonceGenerator>,
    config: ComposeConfig,

    user_id: String,
    profile: LocalProfile,
    sender: Option<Arc<dyn MessageSender>>,
    editor: Option<Arc<dyn MessageEditor>>,

    text: String,
    attachments: Vec<AttachmentFile>,
    reply_to: Option<MessageId>,
    editing: Option<MessageId>,

    sendings: HashMap<Nonce, PendingSend>,
}

impl<S: 'static> fmt::Debug for Composer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("user_id", &self.user_id)
            .field("has_sender", &self.sender.is_some())
            .field("editing", &self.editing)
            .field("pending", &self.sendings.len())
            .finish_non_exhaustive()
    }
}

impl<S: 'static> Composer<S> {
    pub fn new(
        scope: Scoped<S, Composer<S>>,
        controller: Box<dyn PresendController>,
        nonces: Arc<NonceGenerator>,
        identity: &IdentityConfig,
        config: &ComposeConfig,
    ) -> Self {
        Self {
            scope,
            controller,
            nonces,
            config: config.clone(),
            user_id: identity.user_id.clone(),
            profile: LocalProfile {
                display_name: identity.display_name.clone(),
                avatar_url: identity.avatar_url.clone(),
            },
            sender: None,
            editor: None,
            text: String::new(),
            attachments: Vec::new(),
            reply_to: None,
            editing: None,
            sendings: HashMap::new(),
        }
    }

    /// Swaps the backend. Clears the input and recomputes edit support.
    pub fn set_sender(&mut self, user_id: impl Into<String>, sender: Option<Arc<dyn MessageSender>>) {
        self.reset();
        self.user_id = user_id.into();
        self.editor = sender.as_ref().and_then(|s| s.as_editor());
        debug!(
            user_id = %self.user_id,
            has_sender = sender.is_some(),
            can_edit = self.editor.is_some(),
            "composer sender changed"
        );
        self.sender = sender;
    }

    /// Clears the input and leaves editing. In-flight sends are unaffected.
    pub fn reset(&mut self) {
        self.text.clear();
        self.attachments.clear();
        self.reply_to = None;
        self.editing = None;
    }

    /// The input only accepts sends while a sender is present.
    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn attachments(&self) -> &[AttachmentFile] {
        &self.attachments
    }

    pub fn add_attachment(&mut self, file: AttachmentFile) {
        self.attachments.push(file);
    }

    pub fn reply_to(&self) -> Option<&MessageId> {
        self.reply_to.as_ref()
    }

    pub fn set_reply_to(&mut self, id: Option<MessageId>) {
        self.reply_to = id;
    }

    pub fn editing(&self) -> Option<&MessageId> {
        self.editing.as_ref()
    }

    pub fn pending(&self, nonce: &Nonce) -> Option<&PendingSend> {
        self.sendings.get(nonce)
    }

    pub fn pending_count(&self) -> usize {
        self.sendings.len()
    }

    /// Nonces of sends currently in the failed state.
    pub fn failed(&self) -> Vec<Nonce> {
        let mut failed: Vec<Nonce> = self
            .sendings
            .iter()
            .filter(|(_, p)| p.is_failed())
            .map(|(n, _)| n.clone())
            .collect();
        failed.sort();
        failed
    }

    /// Submits the input: an edit while editing, otherwise a new message.
    ///
    /// Does nothing without a sender, or when there is neither text nor an
    /// attachment to send.
    pub fn send_input(&mut self) -> Option<Submission> {
        self.sender.as_ref()?;

        if let Some(id) = self.editing.clone() {
            let Some(editor) = self.editor_for(&id) else {
                warn!(id = %id, "message no longer editable, keeping draft");
                self.scope
                    .report(ParleyError::edit("message can no longer be edited"));
                return None;
            };
            self.editing = None;
            let draft = std::mem::take(&mut self.text);
            self.submit_edit(editor, id.clone(), draft);
            return Some(Submission::Edited(id));
        }

        if self.text.is_empty() && self.attachments.is_empty() {
            return None;
        }

        let author = self
            .controller
            .author(&self.user_id)
            .unwrap_or_else(|| self.local_author());

        let message = PresendMessage {
            nonce: self.nonces.next(&self.user_id),
            time: Utc::now(),
            content: self.text.clone(),
            author,
            reply_to: self.reply_to.clone(),
            files: self.attachments.clone(),
        };

        let nonce = self.send_message(message)?;
        self.text.clear();
        self.attachments.clear();
        self.reply_to = None;
        Some(Submission::Sent(nonce))
    }

    /// Registers a placeholder for `message` and sends it in the background.
    ///
    /// Returns the nonce the send is tracked under, or `None` when there is
    /// no sender or the message was rejected before sending.
    pub fn send_message(&mut self, message: PresendMessage) -> Option<Nonce> {
        let Some(sender) = self.sender.clone() else {
            debug!("no sender, ignoring send");
            return None;
        };

        if message.files.len() > self.config.max_attachments {
            self.scope.report(ParleyError::send(format!(
                "too many attachments ({} > {})",
                message.files.len(),
                self.config.max_attachments
            )));
            return None;
        }

        let nonce = message.nonce.clone();
        if self.sendings.contains_key(&nonce) {
            warn!(nonce = %nonce, "nonce already pending, ignoring duplicate send");
            return None;
        }

        let mut container = self.controller.add_presend_message(&message);
        container.set_loading();

        let sendable = SendableMessage {
            nonce: nonce.clone(),
            time: message.time,
            content: message.content.clone(),
            author: message.author.clone(),
            reply_to: message.reply_to.clone(),
            attachments: message
                .files
                .iter()
                .enumerate()
                .map(|(index, file)| SendableAttachment {
                    file: file.clone(),
                    progress: self.progress_handle(nonce.clone(), index),
                })
                .collect(),
        };

        info!(nonce = %nonce, attachments = message.files.len(), "sending message");
        self.sendings.insert(
            nonce.clone(),
            PendingSend {
                uploads: UploadCoordinator::new(&message.files),
                message,
                state: SendState::Sending { confirmed: None },
                container,
            },
        );

        let tracked = nonce.clone();
        self.scope.run_async(async move {
            let outcome = sender.send(sendable).await;
            Ok(Some(scoped_job(move |composer: &mut Composer<S>| {
                match outcome {
                    Ok(id) => composer.on_sent(&tracked, id),
                    Err(err) => composer.fail(&tracked, err),
                }
            })))
        });

        Some(nonce)
    }

    /// Re-sends a failed message under a fresh nonce.
    pub fn retry(&mut self, nonce: &Nonce) -> Option<Nonce> {
        if self.sender.is_none() || !self.sendings.get(nonce)?.is_failed() {
            return None;
        }
        let failed = self.sendings.remove(nonce)?;
        self.controller.remove_presend_message(nonce);

        let message = PresendMessage {
            nonce: self.nonces.next(&self.user_id),
            time: Utc::now(),
            ..failed.message
        };
        info!(previous = %nonce, nonce = %message.nonce, "retrying failed send");
        self.send_message(message)
    }

    /// Drops a failed message and its placeholder.
    pub fn discard(&mut self, nonce: &Nonce) -> bool {
        match self.sendings.get(nonce) {
            Some(pending) if pending.is_failed() => {
                self.sendings.remove(nonce);
                self.controller.remove_presend_message(nonce);
                debug!(nonce = %nonce, "discarded failed send");
                true
            }
            _ => false,
        }
    }

    /// Whether the current backend allows editing `id`.
    pub fn editable(&self, id: &MessageId) -> bool {
        self.editor_for(id).is_some()
    }

    fn editor_for(&self, id: &MessageId) -> Option<Arc<dyn MessageEditor>> {
        self.editor
            .as_ref()
            .filter(|editor| editor.message_editable(id))
            .map(Arc::clone)
    }

    /// Starts editing `id` once its raw content has been fetched.
    ///
    /// Returns `false`, touching nothing, when `id` is not editable. A fetch
    /// failure is reported and leaves the input as it was.
    pub fn start_editing(&mut self, id: MessageId) -> bool {
        let Some(editor) = self.editor_for(&id) else {
            debug!(id = %id, "message not editable");
            return false;
        };

        self.scope.run_async(async move {
            let content = editor.raw_message_content(&id).await?;
            Ok(Some(scoped_job(move |composer: &mut Composer<S>| {
                composer.enter_editing(id, content)
            })))
        });
        true
    }

    /// Leaves editing and clears the draft. Returns whether it was editing.
    pub fn stop_editing(&mut self) -> bool {
        if self.editing.take().is_some() {
            self.text.clear();
            true
        } else {
            false
        }
    }

    fn enter_editing(&mut self, id: MessageId, content: String) {
        debug!(id = %id, "editing message");
        self.editing = Some(id);
        self.text = content;
    }

    fn submit_edit(&self, editor: Arc<dyn MessageEditor>, id: MessageId, draft: String) {
        self.scope.run_async(async move {
            match editor.edit(&id, draft.clone()).await {
                Ok(()) => Ok(None),
                Err(err) => Ok(Some(scoped_job(move |composer: &mut Composer<S>| {
                    composer.on_edit_failed(id, draft, err)
                }))),
            }
        });
    }

    fn on_edit_failed(&mut self, id: MessageId, draft: String, err: ParleyError) {
        let idle = self.editing.is_none() && self.text.is_empty();
        if self.config.restore_draft_on_edit_failure && idle {
            info!(id = %id, "edit failed, restoring draft");
            self.editing = Some(id);
            self.text = draft;
        }
        self.scope.dispatcher().reporter().report(&err);
    }

    fn local_author(&self) -> Author {
        Author {
            id: self.user_id.clone(),
            name: self.profile.display_name.clone(),
            avatar_url: self.profile.avatar_url.clone(),
        }
    }

    fn progress_handle(&self, nonce: Nonce, index: usize) -> UploadProgress {
        let scope = self.scope.clone();
        UploadProgress::new(move |event| {
            let nonce = nonce.clone();
            scope.post(move |composer: &mut Composer<S>| {
                composer.on_upload_event(&nonce, index, event)
            });
        })
    }

    /// Confirms a send. Uploads the backend never reported on are settled
    /// as done, since progress events it did emit were queued ahead of this.
    fn on_sent(&mut self, nonce: &Nonce, id: MessageId) {
        match self.sendings.get_mut(nonce) {
            Some(pending) if !pending.is_failed() => {
                debug!(nonce = %nonce, id = %id, "send confirmed");
                for index in pending.uploads.settle() {
                    debug!(nonce = %nonce, index, "upload unreported at confirmation");
                    pending.container.set_upload_progress(index, 1.0);
                }
                pending.state = SendState::Sending {
                    confirmed: Some(id),
                };
            }
            _ => {
                debug!(nonce = %nonce, "late send result, discarding");
                return;
            }
        }
        self.try_finalize(nonce);
    }

    fn on_upload_event(&mut self, nonce: &Nonce, index: usize, event: ProgressEvent) {
        let Some(pending) = self.sendings.get_mut(nonce) else {
            debug!(nonce = %nonce, index, "upload progress for unknown send");
            return;
        };
        if pending.is_failed() || !pending.uploads.apply(index, event) {
            return;
        }
        if let Some(task) = pending.uploads.progress(index) {
            pending.container.set_upload_progress(index, task.fraction());
        }

        let failure = pending.uploads.errors().first().map(|(file, reason)| {
            ParleyError::Upload {
                file: file.name.clone(),
                message: (*reason).to_string(),
            }
        });
        match failure {
            Some(err) => self.fail(nonce, err),
            None => self.try_finalize(nonce),
        }
    }

    fn try_finalize(&mut self, nonce: &Nonce) {
        let ready = self.sendings.get(nonce).is_some_and(|pending| {
            matches!(pending.state, SendState::Sending { confirmed: Some(_) })
                && pending.uploads.is_complete()
                && !pending.uploads.has_error()
        });
        if !ready {
            return;
        }
        if let Some(mut pending) = self.sendings.remove(nonce)
            && let SendState::Sending {
                confirmed: Some(id),
            } = &pending.state
        {
            pending.container.set_done(id);
            info!(nonce = %nonce, id = %id, "message committed");
        }
    }

    /// Moves a send to `Failed`, at most once.
    fn fail(&mut self, nonce: &Nonce, err: ParleyError) {
        let Some(pending) = self.sendings.get_mut(nonce) else {
            debug!(nonce = %nonce, "failure for unknown send, discarding");
            return;
        };
        if pending.is_failed() {
            debug!(nonce = %nonce, "send already failed, discarding");
            return;
        }
        warn!(nonce = %nonce, error = %err, "send failed");
        pending.state = SendState::Failed {
            reason: err.humanize(),
        };
        pending.container.set_sent_error(&err);
        self.scope.dispatcher().reporter().report(&err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presend::{PresendBoard, PresendPhase};
    use parley_test_utils::{
        MockEditor, MockSender, PresendEvent, RecordingController, UiHarness,
    };
    use std::path::PathBuf;
    use std::time::Duration;
    use tracing_test::traced_test;

    struct App {
        composer: Composer<App>,
    }

    fn composer_of(app: &mut App) -> Option<&mut Composer<App>> {
        Some(&mut app.composer)
    }

    fn harness_with(
        controller: impl PresendController + 'static,
        sender: Option<Arc<MockSender>>,
        config: ComposeConfig,
    ) -> UiHarness<App> {
        UiHarness::new(move |dispatcher| {
            let mut composer = Composer::new(
                Scoped::new(dispatcher.clone(), "composer", composer_of),
                Box::new(controller),
                Arc::new(NonceGenerator::new()),
                &IdentityConfig::default(),
                &config,
            );
            if let Some(sender) = sender {
                composer.set_sender("u-1", Some(sender as Arc<dyn MessageSender>));
            }
            App { composer }
        })
    }

    fn harness(
        controller: impl PresendController + 'static,
        sender: Arc<MockSender>,
    ) -> UiHarness<App> {
        harness_with(controller, Some(sender), ComposeConfig::default())
    }

    fn file(name: &str) -> AttachmentFile {
        AttachmentFile {
            name: name.into(),
            path: PathBuf::from(format!("/tmp/{name}")),
            size: 64,
        }
    }

    fn sent_nonce(submission: Option<Submission>) -> Nonce {
        match submission {
            Some(Submission::Sent(nonce)) => nonce,
            other => panic!("expected a send, got {other:?}"),
        }
    }

    #[test]
    fn hello_is_shown_disabled_then_committed() {
        let board = PresendBoard::new();
        let sender = Arc::new(MockSender::new());
        let mut h = harness(board.clone(), Arc::clone(&sender));

        h.state_mut().composer.set_text("hello");
        let nonce = sent_nonce(h.state_mut().composer.send_input());

        let view = board.view(&nonce).expect("placeholder registered");
        assert_eq!(view.content(), "hello");
        assert_eq!(view.phase(), PresendPhase::Loading);
        assert!(!view.is_sensitive());
        assert_eq!(h.state().composer.text(), "");
        assert_eq!(h.state().composer.pending_count(), 1);

        assert!(h.settle_until(|app| app.composer.pending_count() == 0));

        let view = board.view(&nonce).expect("placeholder kept for reconciliation");
        assert_eq!(view.phase(), PresendPhase::Done);
        assert!(view.is_sensitive());
        assert_eq!(view.content(), "hello");
        assert!(view.id().is_some_and(|id| id.0.starts_with("mock-msg-")));
        assert_eq!(sender.sent()[0].content, "hello");
        assert!(h.reporter().is_empty());
    }

    #[test]
    fn failed_send_fails_once_and_stays_interactive() {
        let recorder = RecordingController::new();
        let sender = Arc::new(MockSender::new());
        sender.fail_next("rate limited");
        let mut h = harness(recorder.clone(), sender);

        h.state_mut().composer.set_text("hello");
        let nonce = sent_nonce(h.state_mut().composer.send_input());
        assert!(h.settle_until(|app| !app.composer.failed().is_empty()));
        h.settle_for(Duration::from_millis(50));

        assert_eq!(recorder.errors_for(&nonce), 1);
        assert!(recorder.done_for(&nonce).is_none());
        assert_eq!(
            h.state().composer.pending(&nonce).map(PendingSend::state),
            Some(&SendState::Failed {
                reason: "Rate limited".into()
            })
        );
        assert_eq!(h.reporter().reports(), vec!["Rate limited".to_string()]);
    }

    #[test]
    #[traced_test]
    fn failed_upload_fails_send_and_keeps_other_progress() {
        let recorder = RecordingController::new();
        let sender = Arc::new(MockSender::new().fail_upload("b.png"));
        let mut h = harness(recorder.clone(), sender);

        let composer = &mut h.state_mut().composer;
        composer.add_attachment(file("a.png"));
        composer.add_attachment(file("b.png"));
        let nonce = sent_nonce(composer.send_input());

        assert!(h.settle_until(|app| !app.composer.failed().is_empty()));
        // The send call itself succeeds after the upload failed.
        h.settle_for(Duration::from_millis(50));

        let pending = h.state().composer.pending(&nonce).expect("failed send kept");
        assert!(pending.uploads().has_error());
        assert_eq!(pending.uploads().progress(0).unwrap().fraction(), 1.0);
        assert_eq!(pending.uploads().progress(1).unwrap().sent_bytes(), 32);
        assert_eq!(recorder.errors_for(&nonce), 1);
        assert!(recorder.done_for(&nonce).is_none());
        assert!(
            recorder
                .events_for(&nonce)
                .contains(&PresendEvent::Progress(nonce.clone(), 0, 1.0))
        );
        assert_eq!(h.reporter().reports(), vec!["B.png: upload rejected".to_string()]);
        assert!(logs_contain("late send result, discarding"));
    }

    #[test]
    fn confirmed_send_settles_unreported_uploads() {
        let recorder = RecordingController::new();
        let sender = Arc::new(MockSender::new().with_silent_uploads());
        let mut h = harness(recorder.clone(), sender);

        let composer = &mut h.state_mut().composer;
        composer.add_attachment(file("inline.png"));
        let nonce = sent_nonce(composer.send_input());

        assert!(h.settle_until(|app| app.composer.pending_count() == 0));
        let events = recorder.events_for(&nonce);
        let progress = PresendEvent::Progress(nonce.clone(), 0, 1.0);
        let settled = events.iter().position(|e| *e == progress).expect("bar filled");
        let done = events
            .iter()
            .position(|e| matches!(e, PresendEvent::Done(..)))
            .expect("committed");
        assert!(settled < done);
        assert_eq!(recorder.errors_for(&nonce), 0);
        assert!(h.reporter().is_empty());
    }

    #[test]
    fn retry_resends_under_fresh_nonce() {
        let recorder = RecordingController::new();
        let sender = Arc::new(MockSender::new());
        sender.fail_next("offline");
        let mut h = harness(recorder.clone(), Arc::clone(&sender));

        h.state_mut().composer.set_text("again");
        h.state_mut().composer.set_reply_to(Some(MessageId::from("m-7")));
        let first = sent_nonce(h.state_mut().composer.send_input());
        assert!(h.settle_until(|app| !app.composer.failed().is_empty()));

        let second = h
            .state_mut()
            .composer
            .retry(&first)
            .expect("failed send can be retried");
        assert_ne!(first, second);
        assert!(recorder.events().contains(&PresendEvent::Removed(first.clone())));

        assert!(h.settle_until(|app| app.composer.pending_count() == 0));
        assert!(recorder.done_for(&second).is_some());
        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].content, "again");
        assert_eq!(sent[1].reply_to, Some(MessageId::from("m-7")));
        assert_eq!(sent[1].nonce, second);
    }

    #[test]
    fn discard_only_applies_to_failed_sends() {
        let recorder = RecordingController::new();
        let sender = Arc::new(MockSender::new());
        sender.fail_next("offline");
        let mut h = harness(recorder.clone(), sender);

        h.state_mut().composer.set_text("one");
        let nonce = sent_nonce(h.state_mut().composer.send_input());
        // Still in flight.
        assert!(!h.state_mut().composer.discard(&nonce));
        assert!(h.state_mut().composer.retry(&nonce).is_none());

        assert!(h.settle_until(|app| !app.composer.failed().is_empty()));
        assert!(h.state_mut().composer.discard(&nonce));
        assert_eq!(h.state().composer.pending_count(), 0);
        assert!(recorder.events().contains(&PresendEvent::Removed(nonce.clone())));
        assert!(!h.state_mut().composer.discard(&nonce));
    }

    #[test]
    fn empty_input_sends_nothing() {
        let recorder = RecordingController::new();
        let sender = Arc::new(MockSender::new());
        let mut h = harness(recorder.clone(), Arc::clone(&sender));

        assert_eq!(h.state_mut().composer.send_input(), None);
        h.settle_for(Duration::from_millis(20));
        assert_eq!(sender.sent_count(), 0);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn input_is_disabled_without_sender() {
        let mut h = harness_with(RecordingController::new(), None, ComposeConfig::default());
        assert!(!h.state().composer.is_enabled());
        h.state_mut().composer.set_text("hello");
        assert_eq!(h.state_mut().composer.send_input(), None);
        assert_eq!(h.state().composer.text(), "hello");
    }

    #[test]
    fn attachments_only_message_is_sent() {
        let board = PresendBoard::new();
        let sender = Arc::new(MockSender::new());
        let mut h = harness(board.clone(), Arc::clone(&sender));

        h.state_mut().composer.add_attachment(file("cat.png"));
        let nonce = sent_nonce(h.state_mut().composer.send_input());
        assert_eq!(
            board.view(&nonce).unwrap().markup(),
            crate::presend::EMPTY_CONTENT_PLACEHOLDER
        );
        assert!(h.state().composer.attachments().is_empty());
        assert!(h.settle_until(|app| app.composer.pending_count() == 0));
        assert_eq!(sender.sent()[0].attachments.len(), 1);
    }

    #[test]
    fn too_many_attachments_are_rejected_without_placeholder() {
        let recorder = RecordingController::new();
        let sender = Arc::new(MockSender::new());
        let config = ComposeConfig {
            max_attachments: 1,
            ..ComposeConfig::default()
        };
        let mut h = harness_with(recorder.clone(), Some(Arc::clone(&sender)), config);

        h.state_mut().composer.add_attachment(file("a.png"));
        h.state_mut().composer.add_attachment(file("b.png"));
        assert_eq!(h.state_mut().composer.send_input(), None);
        let reporter = h.reporter().clone();
        assert!(h.settle_until(move |_| !reporter.is_empty()));

        assert!(recorder.events().is_empty());
        assert_eq!(h.state().composer.attachments().len(), 2);
        assert_eq!(
            h.reporter().reports(),
            vec!["Too many attachments (2 > 1)".to_string()]
        );
        assert_eq!(sender.sent_count(), 0);
    }

    #[test]
    fn authoritative_author_is_preferred() {
        let recorder = RecordingController::new().with_author(Author {
            id: "u-1".into(),
            name: "Mara".into(),
            avatar_url: None,
        });
        let sender = Arc::new(MockSender::new());
        let mut h = harness(recorder, Arc::clone(&sender));
        h.state_mut().composer.set_text("hi");
        h.state_mut().composer.send_input();
        assert!(h.settle_until(|app| app.composer.pending_count() == 0));
        assert_eq!(sender.sent()[0].author.name, "Mara");
    }

    #[test]
    fn local_author_is_the_fallback() {
        let sender = Arc::new(MockSender::new());
        let mut h = harness(RecordingController::new(), Arc::clone(&sender));
        h.state_mut().composer.set_text("hi");
        h.state_mut().composer.send_input();
        assert!(h.settle_until(|app| app.composer.pending_count() == 0));

        let author = &sender.sent()[0].author;
        assert_eq!(author.id, "u-1");
        assert_eq!(author.name, IdentityConfig::default().display_name);
    }

    #[test]
    fn editing_requires_edit_capability() {
        let editor = Arc::new(MockEditor::new().with_readonly_message("m-2", "fixed"));
        let sender = Arc::new(MockSender::new().with_editor(editor));
        let mut h = harness(RecordingController::new(), sender);

        h.state_mut().composer.set_text("draft");
        assert!(!h.state().composer.editable(&MessageId::from("m-2")));
        assert!(!h.state_mut().composer.start_editing(MessageId::from("m-2")));
        h.settle_for(Duration::from_millis(20));
        assert_eq!(h.state().composer.text(), "draft");
        assert!(h.state().composer.editing().is_none());

        let mut plain = harness(RecordingController::new(), Arc::new(MockSender::new()));
        assert!(!plain.state_mut().composer.start_editing(MessageId::from("m-2")));
    }

    #[test]
    fn edit_round_trip() {
        let editor = Arc::new(MockEditor::new().with_message("m-1", "raw text"));
        let sender = Arc::new(MockSender::new().with_editor(Arc::clone(&editor)));
        let mut h = harness(RecordingController::new(), sender);

        assert!(h.state_mut().composer.start_editing(MessageId::from("m-1")));
        assert!(h.settle_until(|app| app.composer.editing().is_some()));
        assert_eq!(h.state().composer.text(), "raw text");

        h.state_mut().composer.set_text("new text");
        assert_eq!(
            h.state_mut().composer.send_input(),
            Some(Submission::Edited(MessageId::from("m-1")))
        );
        assert!(h.state().composer.editing().is_none());
        assert_eq!(h.state().composer.text(), "");

        let watched = Arc::clone(&editor);
        assert!(h.settle_until(move |_| watched.edits().len() == 1));
        assert_eq!(editor.content("m-1").as_deref(), Some("new text"));
    }

    #[test]
    fn revoked_edit_keeps_draft_and_reports() {
        let editor = Arc::new(MockEditor::new().with_message("m-1", "raw"));
        let sender = Arc::new(MockSender::new().with_editor(Arc::clone(&editor)));
        let mut h = harness(RecordingController::new(), sender);

        assert!(h.state_mut().composer.start_editing(MessageId::from("m-1")));
        assert!(h.settle_until(|app| app.composer.editing().is_some()));
        h.state_mut().composer.set_text("long careful rewrite");
        editor.set_editable("m-1", false);

        assert_eq!(h.state_mut().composer.send_input(), None);
        assert_eq!(h.state().composer.editing(), Some(&MessageId::from("m-1")));
        assert_eq!(h.state().composer.text(), "long careful rewrite");

        let reporter = h.reporter().clone();
        assert!(h.settle_until(move |_| !reporter.is_empty()));
        assert_eq!(
            h.reporter().reports(),
            vec!["Message can no longer be edited".to_string()]
        );
        assert!(editor.edits().is_empty());
    }

    #[test]
    fn fetch_failure_leaves_input_untouched() {
        let editor = Arc::new(MockEditor::new().with_message("m-1", "raw"));
        editor.set_fail_fetch(true);
        let sender = Arc::new(MockSender::new().with_editor(editor));
        let mut h = harness(RecordingController::new(), sender);

        h.state_mut().composer.set_text("draft");
        assert!(h.state_mut().composer.start_editing(MessageId::from("m-1")));
        let reporter = h.reporter().clone();
        assert!(h.settle_until(move |_| !reporter.is_empty()));

        assert!(h.state().composer.editing().is_none());
        assert_eq!(h.state().composer.text(), "draft");
        assert_eq!(h.reporter().reports(), vec!["Message unavailable".to_string()]);
    }

    #[test]
    fn edit_failure_restores_draft_when_idle() {
        let editor = Arc::new(MockEditor::new().with_message("m-1", "raw"));
        editor.set_fail_edit(true);
        let sender = Arc::new(MockSender::new().with_editor(editor));
        let mut h = harness(RecordingController::new(), sender);

        assert!(h.state_mut().composer.start_editing(MessageId::from("m-1")));
        assert!(h.settle_until(|app| app.composer.editing().is_some()));
        h.state_mut().composer.set_text("fixed typo");
        h.state_mut().composer.send_input();

        let reporter = h.reporter().clone();
        assert!(h.settle_until(move |_| !reporter.is_empty()));
        assert_eq!(h.state().composer.editing(), Some(&MessageId::from("m-1")));
        assert_eq!(h.state().composer.text(), "fixed typo");
        assert_eq!(h.reporter().reports(), vec!["Edit rejected".to_string()]);
    }

    #[test]
    fn edit_failure_only_reports_when_restore_disabled() {
        let editor = Arc::new(MockEditor::new().with_message("m-1", "raw"));
        editor.set_fail_edit(true);
        let sender = Arc::new(MockSender::new().with_editor(editor));
        let config = ComposeConfig {
            restore_draft_on_edit_failure: false,
            ..ComposeConfig::default()
        };
        let mut h = harness_with(RecordingController::new(), Some(sender), config);

        assert!(h.state_mut().composer.start_editing(MessageId::from("m-1")));
        assert!(h.settle_until(|app| app.composer.editing().is_some()));
        h.state_mut().composer.send_input();

        let reporter = h.reporter().clone();
        assert!(h.settle_until(move |_| !reporter.is_empty()));
        assert!(h.state().composer.editing().is_none());
        assert_eq!(h.state().composer.text(), "");
    }

    #[test]
    fn stop_editing_clears_draft() {
        let editor = Arc::new(MockEditor::new().with_message("m-1", "raw"));
        let sender = Arc::new(MockSender::new().with_editor(editor));
        let mut h = harness(RecordingController::new(), sender);

        assert!(h.state_mut().composer.start_editing(MessageId::from("m-1")));
        assert!(h.settle_until(|app| app.composer.editing().is_some()));
        assert!(h.state_mut().composer.stop_editing());
        assert_eq!(h.state().composer.text(), "");
        assert!(!h.state_mut().composer.stop_editing());
    }

    #[test]
    fn set_sender_resets_input_and_edit_support() {
        let editor = Arc::new(MockEditor::new().with_message("m-1", "raw"));
        let sender = Arc::new(MockSender::new().with_editor(editor));
        let mut h = harness(RecordingController::new(), sender);

        let composer = &mut h.state_mut().composer;
        assert!(composer.editable(&MessageId::from("m-1")));
        composer.set_text("draft");
        composer.add_attachment(file("a.png"));
        composer.set_reply_to(Some(MessageId::from("m-3")));

        composer.set_sender("u-2", Some(Arc::new(MockSender::new()) as Arc<dyn MessageSender>));
        assert_eq!(composer.user_id(), "u-2");
        assert_eq!(composer.text(), "");
        assert!(composer.attachments().is_empty());
        assert!(composer.reply_to().is_none());
        assert!(!composer.editable(&MessageId::from("m-1")));

        composer.set_sender("u-2", None);
        assert!(!composer.is_enabled());
    }
}
