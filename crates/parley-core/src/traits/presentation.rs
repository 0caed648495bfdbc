// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presentation reconciliation contract for optimistic placeholders.

use crate::error::ParleyError;
use crate::types::{Author, MessageId, Nonce, PresendMessage};

/// The observable states of a presend placeholder.
///
/// All methods are called on the UI-owning context.
pub trait PresendContainer {
    /// The backend confirmed the message; swap the nonce for `id` and drop
    /// all presend state.
    fn set_done(&mut self, id: &MessageId);

    /// The message is in flight: disabled, loading indicator and upload
    /// progress visible.
    fn set_loading(&mut self);

    /// Sending failed: re-enable interaction and show `err` inline.
    fn set_sent_error(&mut self, err: &ParleyError);

    /// Reports upload progress for attachment `index` as a 0.0..=1.0 fraction.
    fn set_upload_progress(&mut self, index: usize, fraction: f64) {
        let _ = (index, fraction);
    }
}

/// The message view the lifecycle registers placeholders with.
pub trait PresendController {
    /// Registers a new placeholder and returns the container that will
    /// receive its state transitions.
    fn add_presend_message(&mut self, msg: &PresendMessage) -> Box<dyn PresendContainer>;

    /// Removes a placeholder that the user discarded after a failure.
    fn remove_presend_message(&mut self, nonce: &Nonce);

    /// Returns the authoritative author record for `user_id`, if the view
    /// has already seen one.
    fn author(&self, user_id: &str) -> Option<Author> {
        let _ = user_id;
        None
    }
}
