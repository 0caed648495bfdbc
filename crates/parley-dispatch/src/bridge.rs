// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bridge between background work and the single UI thread.
//!
//! [`UiLoop`] owns the UI state and executes queued jobs one at a time, in
//! submission order. [`Dispatcher`] is the cloneable handle every other
//! thread uses to reach it: post a job, run a future on the worker runtime
//! and hand its continuation back, or post and block until the job ran.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use futures::FutureExt;
use parley_config::model::DispatchConfig;
use parley_core::ParleyError;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::reporter::{ErrorReporter, LogReporter};
use crate::signal::{CompletionSignal, SignalPool};

/// A unit of work executed on the UI thread with exclusive access to the state.
pub type UiJob<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Boxes a closure as a [`UiJob`], letting the compiler infer its argument type.
pub fn ui_job<S, F>(f: F) -> UiJob<S>
where
    F: FnOnce(&mut S) + Send + 'static,
{
    Box::new(f)
}

enum UiCommand<S> {
    Run(UiJob<S>),
    Stop,
}

/// Identity of the thread driving the loop, set when the loop first runs.
#[derive(Debug, Clone, Default)]
pub(crate) struct UiThread(Arc<OnceLock<ThreadId>>);

impl UiThread {
    pub(crate) fn unclaimed() -> Self {
        Self::default()
    }

    pub(crate) fn is_current(&self) -> bool {
        self.0.get() == Some(&thread::current().id())
    }

    fn claim(&self) {
        let current = thread::current().id();
        let owner = *self.0.get_or_init(|| current);
        assert_eq!(
            owner, current,
            "UiLoop driven from a second thread; the UI context is single-threaded"
        );
    }
}

#[derive(Debug)]
struct Shared {
    ui_thread: UiThread,
    depth: AtomicUsize,
    warn_depth: usize,
    closed: AtomicBool,
}

/// Cloneable handle for scheduling work onto the UI loop.
pub struct Dispatcher<S> {
    tx: Sender<UiCommand<S>>,
    runtime: Handle,
    reporter: Arc<dyn ErrorReporter>,
    signals: SignalPool,
    shared: Arc<Shared>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            runtime: self.runtime.clone(),
            reporter: Arc::clone(&self.reporter),
            signals: self.signals.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queued", &self.shared.depth.load(Ordering::Relaxed))
            .field("closed", &self.shared.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<S: 'static> Dispatcher<S> {
    /// Schedules `f` to run on the UI loop after everything already queued.
    ///
    /// Fire and forget: if the loop has shut down the job is dropped with a
    /// warning.
    pub fn post<F>(&self, f: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.enqueue(Box::new(f));
    }

    /// Runs `work` on the worker runtime.
    ///
    /// A returned continuation is posted to the UI loop. An error is routed
    /// to the [`ErrorReporter`] on the UI loop instead, and a panic inside
    /// `work` is converted to [`ParleyError::Internal`] and reported the same
    /// way.
    pub fn run_async<Fut>(&self, work: Fut)
    where
        Fut: Future<Output = Result<Option<UiJob<S>>, ParleyError>> + Send + 'static,
    {
        let dispatcher = self.clone();
        self.runtime.spawn(async move {
            match AssertUnwindSafe(work).catch_unwind().await {
                Ok(Ok(Some(continuation))) => dispatcher.enqueue(continuation),
                Ok(Ok(None)) => {}
                Ok(Err(err)) => dispatcher.report(err),
                Err(panic) => {
                    let detail = panic_message(panic.as_ref());
                    warn!(detail = %detail, "background task panicked");
                    dispatcher.report(ParleyError::Internal(format!(
                        "background task panicked: {detail}"
                    )));
                }
            }
        });
    }

    /// Posts `f` and returns a signal that fires once `f` has finished.
    ///
    /// Waiting on the signal from the UI thread panics.
    pub fn run_on_ui_and_wait<F>(&self, f: F) -> CompletionSignal
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        let (signal, trigger) = self.signals.acquire(self.shared.ui_thread.clone());
        self.enqueue(Box::new(move |state| {
            f(state);
            trigger.fire();
        }));
        signal
    }

    /// Delivers `err` to the reporter on the UI loop.
    pub fn report(&self, err: ParleyError) {
        let reporter = Arc::clone(&self.reporter);
        self.enqueue(Box::new(move |_| reporter.report(&err)));
    }

    /// The reporter, for continuations already running on the UI loop.
    pub fn reporter(&self) -> Arc<dyn ErrorReporter> {
        Arc::clone(&self.reporter)
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn signal_pool(&self) -> &SignalPool {
        &self.signals
    }

    /// Whether the caller is running on the UI thread.
    pub fn on_ui_thread(&self) -> bool {
        self.shared.ui_thread.is_current()
    }

    /// Jobs queued and not yet executed.
    pub fn queued(&self) -> usize {
        self.shared.depth.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Asks the loop to stop after the jobs queued before this call.
    pub fn shutdown(&self) {
        if self.tx.send(UiCommand::Stop).is_err() {
            debug!("ui loop already gone");
        }
    }

    fn enqueue(&self, job: UiJob<S>) {
        if self.is_closed() {
            warn!("ui loop closed, dropping job");
            return;
        }
        let depth = self.shared.depth.fetch_add(1, Ordering::Relaxed) + 1;
        if depth == self.shared.warn_depth {
            warn!(depth, "ui queue backlog is growing");
        }
        if self.tx.send(UiCommand::Run(job)).is_err() {
            self.shared.depth.fetch_sub(1, Ordering::Relaxed);
            warn!("ui loop closed, dropping job");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Builder for [`UiLoop`].
pub struct UiLoopBuilder {
    runtime: Handle,
    reporter: Arc<dyn ErrorReporter>,
    signal_pool_capacity: usize,
    warn_depth: usize,
}

impl UiLoopBuilder {
    /// Starts building a loop whose background work runs on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        let defaults = DispatchConfig::default();
        Self {
            runtime,
            reporter: Arc::new(LogReporter),
            signal_pool_capacity: defaults.signal_pool_capacity,
            warn_depth: defaults.ui_queue_warn_depth,
        }
    }

    /// Applies pool and backlog settings from the `[dispatch]` section.
    pub fn config(mut self, config: &DispatchConfig) -> Self {
        self.signal_pool_capacity = config.signal_pool_capacity;
        self.warn_depth = config.ui_queue_warn_depth;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Creates the loop. `init` receives the dispatcher so state that
    /// schedules its own work can hold a handle to it.
    pub fn build<S, F>(self, init: F) -> UiLoop<S>
    where
        S: 'static,
        F: FnOnce(&Dispatcher<S>) -> S,
    {
        let (tx, rx) = mpsc::channel();
        let dispatcher = Dispatcher {
            tx,
            runtime: self.runtime,
            reporter: self.reporter,
            signals: SignalPool::new(self.signal_pool_capacity),
            shared: Arc::new(Shared {
                ui_thread: UiThread::unclaimed(),
                depth: AtomicUsize::new(0),
                warn_depth: self.warn_depth.max(1),
                closed: AtomicBool::new(false),
            }),
        };
        let state = init(&dispatcher);
        UiLoop {
            state,
            rx,
            dispatcher,
            executed: 0,
            stopped: false,
        }
    }
}

/// The UI context: owns the state and executes jobs serially.
pub struct UiLoop<S> {
    state: S,
    rx: Receiver<UiCommand<S>>,
    dispatcher: Dispatcher<S>,
    executed: u64,
    stopped: bool,
}

impl<S: 'static> UiLoop<S> {
    /// A loop around ready-made state with default settings.
    pub fn new(runtime: Handle, state: S) -> Self {
        UiLoopBuilder::new(runtime).build(|_| state)
    }

    pub fn dispatcher(&self) -> Dispatcher<S> {
        self.dispatcher.clone()
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    /// Jobs executed so far.
    pub fn executed(&self) -> u64 {
        self.executed
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Runs the loop on the calling thread until [`Dispatcher::shutdown`].
    ///
    /// The calling thread becomes the UI thread. It must not be a tokio
    /// worker: the loop blocks between jobs.
    pub fn run(&mut self) {
        self.dispatcher.shared.ui_thread.claim();
        info!("ui loop started");
        while !self.stopped {
            match self.rx.recv() {
                Ok(command) => self.handle(command),
                Err(_) => break,
            }
        }
        self.close();
        info!(executed = self.executed, "ui loop stopped");
    }

    /// Executes everything currently queued, including jobs queued by those
    /// jobs, and returns how many ran.
    pub fn run_until_idle(&mut self) -> usize {
        self.dispatcher.shared.ui_thread.claim();
        let before = self.executed;
        while !self.stopped {
            match self.rx.try_recv() {
                Ok(command) => self.handle(command),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if self.stopped {
            self.close();
        }
        (self.executed - before) as usize
    }

    /// Executes jobs as they arrive until `done` holds for the state or
    /// `timeout` elapses. Returns whether `done` was reached.
    pub fn run_until<P>(&mut self, timeout: Duration, mut done: P) -> bool
    where
        P: FnMut(&S) -> bool,
    {
        self.dispatcher.shared.ui_thread.claim();
        let deadline = Instant::now() + timeout;
        loop {
            if done(&self.state) {
                return true;
            }
            if self.stopped {
                self.close();
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(command) => self.handle(command),
                Err(RecvTimeoutError::Timeout) => return done(&self.state),
                Err(RecvTimeoutError::Disconnected) => return done(&self.state),
            }
        }
    }

    fn handle(&mut self, command: UiCommand<S>) {
        match command {
            UiCommand::Run(job) => {
                self.dispatcher.shared.depth.fetch_sub(1, Ordering::Relaxed);
                job(&mut self.state);
                self.executed += 1;
            }
            UiCommand::Stop => {
                debug!("ui loop received stop");
                self.stopped = true;
            }
        }
    }

    /// Refuses further work and drops whatever is still queued, abandoning
    /// any completion signals attached to it.
    ///
    /// The receiver is replaced by a disconnected one, so a send racing the
    /// closed flag fails in the sender instead of parking a job here.
    fn close(&mut self) {
        self.dispatcher.shared.closed.store(true, Ordering::Release);
        let (_, disconnected) = mpsc::channel();
        let rx = std::mem::replace(&mut self.rx, disconnected);
        let mut dropped = 0usize;
        while let Ok(command) = rx.try_recv() {
            if let UiCommand::Run(job) = command {
                self.dispatcher.shared.depth.fetch_sub(1, Ordering::Relaxed);
                drop(job);
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "discarded jobs queued after stop");
        }
    }
}
