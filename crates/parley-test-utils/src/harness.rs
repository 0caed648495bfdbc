// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness that drives a UI loop on the test thread.
//!
//! `UiHarness` owns a multi-threaded tokio runtime for background work and
//! a `UiLoop` whose jobs run on whichever thread calls the `run_*` methods,
//! normally the test thread itself.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_config::model::DispatchConfig;
use parley_dispatch::{Dispatcher, UiLoop, UiLoopBuilder};
use tracing::warn;

use crate::recording::CapturingReporter;

/// How long `settle_until` waits before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// Conditions on state outside the loop (mock backends) only change without
// a job arriving, so the loop is re-checked at this interval.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct UiHarness<S: 'static> {
    // Declared first so the loop, and every dispatcher it owns, is dropped
    // before the runtime shuts down.
    ui: UiLoop<S>,
    reporter: CapturingReporter,
    runtime: tokio::runtime::Runtime,
}

impl<S: 'static> UiHarness<S> {
    /// Builds the harness with default dispatch settings.
    pub fn new(init: impl FnOnce(&Dispatcher<S>) -> S) -> Self {
        Self::with_config(&DispatchConfig::default(), init)
    }

    pub fn with_config(config: &DispatchConfig, init: impl FnOnce(&Dispatcher<S>) -> S) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .enable_all()
            .build()
            .expect("failed to build test runtime");
        let reporter = CapturingReporter::new();
        let ui = UiLoopBuilder::new(runtime.handle().clone())
            .config(config)
            .reporter(Arc::new(reporter.clone()))
            .build(init);
        Self {
            ui,
            reporter,
            runtime,
        }
    }

    pub fn dispatcher(&self) -> Dispatcher<S> {
        self.ui.dispatcher()
    }

    pub fn state(&self) -> &S {
        self.ui.state()
    }

    pub fn state_mut(&mut self) -> &mut S {
        self.ui.state_mut()
    }

    /// Errors delivered to the reporter so far, humanized.
    pub fn reporter(&self) -> &CapturingReporter {
        &self.reporter
    }

    pub fn runtime(&self) -> &tokio::runtime::Runtime {
        &self.runtime
    }

    /// Runs whatever is queued right now.
    pub fn run_until_idle(&mut self) -> usize {
        self.ui.run_until_idle()
    }

    /// Drives the loop until `done` holds, for up to [`DEFAULT_TIMEOUT`].
    pub fn settle_until(&mut self, mut done: impl FnMut(&S) -> bool) -> bool {
        let deadline = Instant::now() + DEFAULT_TIMEOUT;
        while Instant::now() < deadline {
            if self.ui.run_until(POLL_INTERVAL, &mut done) {
                return true;
            }
            if self.ui.is_stopped() {
                warn!("ui loop stopped before the condition held");
                return false;
            }
        }
        warn!(timeout = ?DEFAULT_TIMEOUT, "condition not reached in test harness");
        false
    }

    /// Drives the loop for `period`, for asserting that nothing more arrives.
    pub fn settle_for(&mut self, period: Duration) {
        self.ui.run_until(period, |_| false);
    }
}
