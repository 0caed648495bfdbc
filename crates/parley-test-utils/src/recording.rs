// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording stand-ins for the presentation layer and the error reporter.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_core::{
    Author, MessageId, Nonce, ParleyError, PresendContainer, PresendController, PresendMessage,
};
use parley_dispatch::ErrorReporter;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One call the lifecycle made into the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PresendEvent {
    Added { nonce: Nonce, content: String },
    Loading(Nonce),
    Done(Nonce, MessageId),
    Error(Nonce, String),
    Progress(Nonce, usize, f64),
    Removed(Nonce),
}

/// A presentation controller that records every call in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingController {
    events: Arc<Mutex<Vec<PresendEvent>>>,
    author: Option<Author>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `author` lookups with `author`.
    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    pub fn events(&self) -> Vec<PresendEvent> {
        lock(&self.events).clone()
    }

    /// Events concerning `nonce`, in order.
    pub fn events_for(&self, nonce: &Nonce) -> Vec<PresendEvent> {
        lock(&self.events)
            .iter()
            .filter(|event| match event {
                PresendEvent::Added { nonce: n, .. }
                | PresendEvent::Loading(n)
                | PresendEvent::Done(n, _)
                | PresendEvent::Error(n, _)
                | PresendEvent::Progress(n, _, _)
                | PresendEvent::Removed(n) => n == nonce,
            })
            .cloned()
            .collect()
    }

    pub fn errors_for(&self, nonce: &Nonce) -> usize {
        self.events_for(nonce)
            .iter()
            .filter(|event| matches!(event, PresendEvent::Error(..)))
            .count()
    }

    pub fn done_for(&self, nonce: &Nonce) -> Option<MessageId> {
        self.events_for(nonce).into_iter().find_map(|event| match event {
            PresendEvent::Done(_, id) => Some(id),
            _ => None,
        })
    }
}

struct RecordingContainer {
    nonce: Nonce,
    events: Arc<Mutex<Vec<PresendEvent>>>,
}

impl RecordingContainer {
    fn record(&self, event: PresendEvent) {
        lock(&self.events).push(event);
    }
}

impl PresendContainer for RecordingContainer {
    fn set_done(&mut self, id: &MessageId) {
        self.record(PresendEvent::Done(self.nonce.clone(), id.clone()));
    }

    fn set_loading(&mut self) {
        self.record(PresendEvent::Loading(self.nonce.clone()));
    }

    fn set_sent_error(&mut self, err: &ParleyError) {
        self.record(PresendEvent::Error(self.nonce.clone(), err.humanize()));
    }

    fn set_upload_progress(&mut self, index: usize, fraction: f64) {
        self.record(PresendEvent::Progress(self.nonce.clone(), index, fraction));
    }
}

impl PresendController for RecordingController {
    fn add_presend_message(&mut self, msg: &PresendMessage) -> Box<dyn PresendContainer> {
        lock(&self.events).push(PresendEvent::Added {
            nonce: msg.nonce.clone(),
            content: msg.content.clone(),
        });
        Box::new(RecordingContainer {
            nonce: msg.nonce.clone(),
            events: Arc::clone(&self.events),
        })
    }

    fn remove_presend_message(&mut self, nonce: &Nonce) {
        lock(&self.events).push(PresendEvent::Removed(nonce.clone()));
    }

    fn author(&self, user_id: &str) -> Option<Author> {
        self.author.clone().filter(|author| author.id == user_id)
    }
}

/// An error reporter that keeps the humanized text of every report.
#[derive(Debug, Clone, Default)]
pub struct CapturingReporter {
    reports: Arc<Mutex<Vec<String>>>,
}

impl CapturingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<String> {
        lock(&self.reports).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.reports).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.reports).is_empty()
    }
}

impl ErrorReporter for CapturingReporter {
    fn report(&self, err: &ParleyError) {
        lock(&self.reports).push(err.humanize());
    }
}
