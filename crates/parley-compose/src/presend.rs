// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Headless presend placeholders.
//!
//! [`PresendView`] is the display state of one optimistic message: what a
//! widget would render for it while it is loading, after it is confirmed,
//! or after it failed. [`PresendBoard`] is a presentation controller that
//! keeps these views, usable wherever no real widget tree exists.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
pub use parley_core::markup::escape_markup;
use parley_core::{
    Author, MessageId, Nonce, ParleyError, PresendContainer, PresendController, PresendMessage,
};

/// Markup shown in place of an empty message body.
pub const EMPTY_CONTENT_PLACEHOLDER: &str = r#"<span alpha="25%">&lt;empty&gt;</span>"#;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadBar {
    pub name: String,
    pub fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresendPhase {
    Loading,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PresendView {
    nonce: Option<Nonce>,
    id: Option<MessageId>,
    author: Author,
    time: DateTime<Utc>,
    content: String,
    markup: String,
    phase: PresendPhase,
    sensitive: bool,
    tooltip: Option<String>,
    error_line: Option<String>,
    uploads: Vec<UploadBar>,
}

impl PresendView {
    /// Creates the view for `msg` in the loading phase.
    pub fn new(msg: &PresendMessage) -> Self {
        let mut view = Self {
            nonce: Some(msg.nonce.clone()),
            id: None,
            author: msg.author.clone(),
            time: msg.time,
            content: msg.content.clone(),
            markup: String::new(),
            phase: PresendPhase::Loading,
            sensitive: false,
            tooltip: None,
            error_line: None,
            uploads: msg
                .files
                .iter()
                .map(|f| UploadBar {
                    name: f.name.clone(),
                    fraction: 0.0,
                })
                .collect(),
        };
        view.set_loading();
        view
    }

    fn body_markup(&self) -> String {
        if self.content.is_empty() {
            EMPTY_CONTENT_PLACEHOLDER.to_string()
        } else {
            escape_markup(&self.content)
        }
    }

    /// The nonce while pending; cleared once the backend assigned an id.
    pub fn nonce(&self) -> Option<&Nonce> {
        self.nonce.as_ref()
    }

    pub fn id(&self) -> Option<&MessageId> {
        self.id.as_ref()
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn phase(&self) -> PresendPhase {
        self.phase
    }

    /// Whether the placeholder accepts interaction.
    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    /// The small inline error label, when failed.
    pub fn error_line(&self) -> Option<&str> {
        self.error_line.as_deref()
    }

    /// Progress bars, shown only while loading.
    pub fn uploads(&self) -> &[UploadBar] {
        &self.uploads
    }
}

impl PresendContainer for PresendView {
    fn set_done(&mut self, id: &MessageId) {
        self.id = Some(id.clone());
        self.nonce = None;
        self.phase = PresendPhase::Done;
        self.tooltip = None;
        self.error_line = None;
        self.uploads.clear();
        self.markup = self.body_markup();
        self.sensitive = true;
    }

    fn set_loading(&mut self) {
        self.phase = PresendPhase::Loading;
        self.sensitive = false;
        self.tooltip = None;
        self.error_line = None;
        self.markup = self.body_markup();
    }

    fn set_sent_error(&mut self, err: &ParleyError) {
        self.phase = PresendPhase::Failed;
        self.sensitive = true;
        self.tooltip = Some(err.to_string());
        self.uploads.clear();
        self.markup = format!(r#"<span color="red">{}</span>"#, self.body_markup());
        self.error_line = Some(format!(
            r#"<span size="small" color="red"><b>Error:</b> {}</span>"#,
            escape_markup(&err.humanize())
        ));
    }

    fn set_upload_progress(&mut self, index: usize, fraction: f64) {
        if let Some(bar) = self.uploads.get_mut(index) {
            bar.fraction = fraction.clamp(0.0, 1.0);
        }
    }
}

type Views = BTreeMap<Nonce, Arc<Mutex<PresendView>>>;

/// A presentation controller that keeps headless [`PresendView`]s.
///
/// Clones share the same views, so a handle kept outside the UI state can
/// inspect what the lifecycle did.
#[derive(Debug, Clone, Default)]
pub struct PresendBoard {
    views: Arc<Mutex<Views>>,
    authors: Arc<Mutex<BTreeMap<String, Author>>>,
}

impl PresendBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the authoritative author for a user, as a message list would
    /// once it has seen that user's messages.
    pub fn remember_author(&self, author: Author) {
        lock(&self.authors).insert(author.id.clone(), author);
    }

    /// A snapshot of the view registered under `nonce`.
    pub fn view(&self, nonce: &Nonce) -> Option<PresendView> {
        lock(&self.views)
            .get(nonce)
            .map(|view| lock(view).clone())
    }

    pub fn views(&self) -> Vec<PresendView> {
        lock(&self.views).values().map(|view| lock(view).clone()).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.views).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.views).is_empty()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SharedView(Arc<Mutex<PresendView>>);

impl PresendContainer for SharedView {
    fn set_done(&mut self, id: &MessageId) {
        lock(&self.0).set_done(id);
    }

    fn set_loading(&mut self) {
        lock(&self.0).set_loading();
    }

    fn set_sent_error(&mut self, err: &ParleyError) {
        lock(&self.0).set_sent_error(err);
    }

    fn set_upload_progress(&mut self, index: usize, fraction: f64) {
        lock(&self.0).set_upload_progress(index, fraction);
    }
}

impl PresendController for PresendBoard {
    fn add_presend_message(&mut self, msg: &PresendMessage) -> Box<dyn PresendContainer> {
        let view = Arc::new(Mutex::new(PresendView::new(msg)));
        lock(&self.views).insert(msg.nonce.clone(), Arc::clone(&view));
        Box::new(SharedView(view))
    }

    fn remove_presend_message(&mut self, nonce: &Nonce) {
        lock(&self.views).remove(nonce);
    }

    fn author(&self, user_id: &str) -> Option<Author> {
        lock(&self.authors).get(user_id).cloned()
    }
}
