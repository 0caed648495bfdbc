// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock backends and a UI-loop harness for fast, deterministic,
//! CI-runnable tests without a real chat service.
//!
//! # Components
//!
//! - [`MockSender`] / [`MockEditor`] - Scripted send and edit capabilities
//! - [`MockMemberLister`] - Replays a fixed roster into a member list sink
//! - [`RecordingController`] - Presentation controller that records calls
//! - [`CapturingReporter`] - Error reporter that keeps what it was given
//! - [`UiHarness`] - UI loop driven on the test thread plus a worker runtime

pub mod harness;
pub mod mock_members;
pub mod mock_sender;
pub mod recording;

pub use harness::UiHarness;
pub use mock_members::MockMemberLister;
pub use mock_sender::{MockEditor, MockSender, SendOutcome};
pub use recording::{CapturingReporter, PresendEvent, RecordingController};
