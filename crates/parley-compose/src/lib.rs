// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound messages for the Parley chat client.
//!
//! - [`Composer`]: the compose input plus the lifecycle of every message
//!   sent from it (placeholder, in flight, committed or failed, editing).
//! - [`NonceGenerator`]: identifiers for messages the backend has not
//!   confirmed yet.
//! - [`UploadCoordinator`]: per-attachment upload progress for one send.
//! - [`PresendView`] / [`PresendBoard`]: headless placeholder rendering.

pub mod composer;
pub mod nonce;
pub mod presend;
pub mod upload;

pub use composer::{Composer, PendingSend, SendState, Submission};
pub use nonce::{NONCE_LEN, NonceGenerator};
pub use presend::{PresendBoard, PresendPhase, PresendView};
pub use upload::{UploadCoordinator, UploadState, UploadTask};
