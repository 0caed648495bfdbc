// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-attachment upload tracking for one outbound message.
//!
//! The coordinator only records progress. It never gates the send call;
//! the lifecycle asks it whether every upload has settled before it
//! finalizes a send.

use parley_core::{AttachmentFile, ProgressEvent};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Uploading,
    Done,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct UploadTask {
    file: AttachmentFile,
    sent_bytes: u64,
    state: UploadState,
}

impl UploadTask {
    fn new(file: AttachmentFile) -> Self {
        Self {
            file,
            sent_bytes: 0,
            state: UploadState::Pending,
        }
    }

    pub fn file(&self) -> &AttachmentFile {
        &self.file
    }

    pub fn sent_bytes(&self) -> u64 {
        self.sent_bytes
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, UploadState::Done | UploadState::Failed(_))
    }

    /// Progress in `0.0..=1.0`. Empty files count as done once completed.
    pub fn fraction(&self) -> f64 {
        if self.file.size == 0 {
            return if self.state == UploadState::Done { 1.0 } else { 0.0 };
        }
        (self.sent_bytes as f64 / self.file.size as f64).min(1.0)
    }

    fn apply(&mut self, event: ProgressEvent) -> bool {
        if self.is_terminal() {
            return false;
        }
        match event {
            ProgressEvent::Advanced(bytes) => {
                self.sent_bytes = self.sent_bytes.saturating_add(bytes).min(self.file.size);
                self.state = UploadState::Uploading;
            }
            ProgressEvent::Completed => {
                self.sent_bytes = self.file.size;
                self.state = UploadState::Done;
            }
            ProgressEvent::Failed(reason) => {
                self.state = UploadState::Failed(reason);
            }
        }
        true
    }
}

/// Upload tasks for the attachments of one pending send.
#[derive(Debug, Clone, Default)]
pub struct UploadCoordinator {
    tasks: Vec<UploadTask>,
}

impl UploadCoordinator {
    pub fn new(files: &[AttachmentFile]) -> Self {
        Self {
            tasks: files.iter().cloned().map(UploadTask::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn progress(&self, index: usize) -> Option<&UploadTask> {
        self.tasks.get(index)
    }

    pub fn tasks(&self) -> &[UploadTask] {
        &self.tasks
    }

    /// Applies a progress event to task `index`. Events for unknown or
    /// settled tasks are ignored; returns whether anything changed.
    pub fn apply(&mut self, index: usize, event: ProgressEvent) -> bool {
        match self.tasks.get_mut(index) {
            Some(task) => {
                let changed = task.apply(event);
                trace!(index, changed, state = ?task.state, "upload progress");
                changed
            }
            None => false,
        }
    }

    /// Marks every unsettled task done and returns their indices.
    pub fn settle(&mut self) -> Vec<usize> {
        self.tasks
            .iter_mut()
            .enumerate()
            .filter(|(_, task)| !task.is_terminal())
            .map(|(index, task)| {
                task.sent_bytes = task.file.size;
                task.state = UploadState::Done;
                index
            })
            .collect()
    }

    /// Aggregate byte progress across all tasks.
    pub fn fraction(&self) -> f64 {
        if self.tasks.is_empty() {
            return 1.0;
        }
        let total: u64 = self.tasks.iter().map(|t| t.file.size).sum();
        if total == 0 {
            let settled = self.tasks.iter().filter(|t| t.is_terminal()).count();
            return settled as f64 / self.tasks.len() as f64;
        }
        let sent: u64 = self.tasks.iter().map(|t| t.sent_bytes).sum();
        sent as f64 / total as f64
    }

    /// Every task has settled, successfully or not.
    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(UploadTask::is_terminal)
    }

    pub fn has_error(&self) -> bool {
        self.tasks
            .iter()
            .any(|t| matches!(t.state, UploadState::Failed(_)))
    }

    /// Failed files with their reasons, in attachment order.
    pub fn errors(&self) -> Vec<(&AttachmentFile, &str)> {
        self.tasks
            .iter()
            .filter_map(|t| match &t.state {
                UploadState::Failed(reason) => Some((&t.file, reason.as_str())),
                _ => None,
            })
            .collect()
    }
}
