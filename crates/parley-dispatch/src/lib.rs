// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrency plumbing for the Parley chat client.
//!
//! All UI state lives on one thread. Backend calls run on a tokio runtime.
//! This crate connects the two:
//!
//! - [`UiLoop`] / [`Dispatcher`]: post jobs to the UI thread, run futures in
//!   the background with UI continuations, or post and wait for completion.
//! - [`Scoped`]: dispatch aimed at one component of the UI state.
//! - [`EventQueue`]: ordered per-component mutations that respect open
//!   overlays.
//! - [`ErrorReporter`]: where background failures end up.

pub mod bridge;
pub mod event_queue;
pub mod reporter;
pub mod scoped;
pub mod signal;

pub use bridge::{Dispatcher, UiJob, UiLoop, UiLoopBuilder, ui_job};
pub use event_queue::{EventQueue, EventQueueBuilder, Mutation, OverlayGuard};
pub use reporter::{ErrorReporter, LogReporter};
pub use scoped::{Lens, Scoped, ScopedJob, scoped_job};
pub use signal::{CompletionSignal, PoolStats, SignalPool};
