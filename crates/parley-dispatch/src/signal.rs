// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot completion signals for `run_on_ui_and_wait`, drawn from a pool.
//!
//! A slot goes back to the pool only after a waiter has observed it in a
//! terminal state. Signals that are dropped unwaited, or whose wait timed
//! out, are never recycled: the UI job may still be about to fire them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use parley_core::ParleyError;

use crate::bridge::UiThread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Idle,
    Pending,
    Fired,
    /// The job was dropped without running (loop stopped or closed).
    Abandoned,
}

#[derive(Debug)]
struct Slot {
    state: Mutex<SlotState>,
    cond: Condvar,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Idle),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, terminal: SlotState) {
        let mut state = self.lock();
        if *state == SlotState::Pending {
            *state = terminal;
            self.cond.notify_all();
        }
    }
}

#[derive(Debug)]
struct PoolInner {
    idle: Mutex<Vec<Arc<Slot>>>,
    capacity: usize,
    created: AtomicUsize,
    reused: AtomicUsize,
}

/// A bounded pool of reusable completion slots.
#[derive(Debug, Clone)]
pub struct SignalPool {
    inner: Arc<PoolInner>,
}

/// Allocation counters, mostly useful in tests and debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub created: usize,
    pub reused: usize,
    pub idle: usize,
}

impl SignalPool {
    /// Creates a pool that keeps at most `capacity` idle slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(Vec::with_capacity(capacity)),
                capacity,
                created: AtomicUsize::new(0),
                reused: AtomicUsize::new(0),
            }),
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.inner.created.load(Ordering::Relaxed),
            reused: self.inner.reused.load(Ordering::Relaxed),
            idle: self.idle().len(),
        }
    }

    fn idle(&self) -> MutexGuard<'_, Vec<Arc<Slot>>> {
        self.inner.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a slot and arms it, returning the waiting and firing halves.
    pub(crate) fn acquire(&self, ui_thread: UiThread) -> (CompletionSignal, SignalTrigger) {
        let recycled = self.idle().pop();
        let slot = match recycled {
            Some(slot) => {
                self.inner.reused.fetch_add(1, Ordering::Relaxed);
                slot
            }
            None => {
                self.inner.created.fetch_add(1, Ordering::Relaxed);
                Arc::new(Slot::new())
            }
        };
        *slot.lock() = SlotState::Pending;

        let signal = CompletionSignal {
            slot: Some(Arc::clone(&slot)),
            outcome: None,
            pool: self.clone(),
            ui_thread,
        };
        let trigger = SignalTrigger {
            slot,
            fired: false,
        };
        (signal, trigger)
    }

    fn recycle(&self, slot: Arc<Slot>) {
        *slot.lock() = SlotState::Idle;
        let mut idle = self.idle();
        if idle.len() < self.inner.capacity {
            idle.push(slot);
        }
    }
}

/// The firing half, moved into the UI job.
///
/// Dropping it unfired marks the signal abandoned so waiters wake up.
#[derive(Debug)]
pub(crate) struct SignalTrigger {
    slot: Arc<Slot>,
    fired: bool,
}

impl SignalTrigger {
    pub(crate) fn fire(mut self) {
        self.fired = true;
        self.slot.settle(SlotState::Fired);
    }
}

impl Drop for SignalTrigger {
    fn drop(&mut self) {
        if !self.fired {
            self.slot.settle(SlotState::Abandoned);
        }
    }
}

/// Fires once the scheduled UI job has finished executing.
///
/// Must not be waited on from the UI thread; that would deadlock, so it
/// panics instead.
#[derive(Debug)]
#[must_use = "a completion signal does nothing unless waited on"]
pub struct CompletionSignal {
    slot: Option<Arc<Slot>>,
    outcome: Option<bool>,
    pool: SignalPool,
    ui_thread: UiThread,
}

impl CompletionSignal {
    /// Blocks until the job has run.
    ///
    /// Returns [`ParleyError::Closed`] if the UI loop dropped the job
    /// without running it.
    pub fn wait(mut self) -> Result<(), ParleyError> {
        self.block(None)?;
        Ok(())
    }

    /// Blocks for at most `timeout`.
    ///
    /// `Ok(true)` once the job has run, `Ok(false)` on timeout; the signal
    /// may be waited on again after a timeout.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<bool, ParleyError> {
        self.block(Some(Instant::now() + timeout))
    }

    /// Whether the job has already run, without blocking.
    pub fn is_done(&self) -> bool {
        match (&self.outcome, &self.slot) {
            (Some(fired), _) => *fired,
            (None, Some(slot)) => *slot.lock() == SlotState::Fired,
            (None, None) => false,
        }
    }

    fn block(&mut self, deadline: Option<Instant>) -> Result<bool, ParleyError> {
        if let Some(fired) = self.outcome {
            return if fired { Ok(true) } else { Err(ParleyError::Closed) };
        }

        assert!(
            !self.ui_thread.is_current(),
            "CompletionSignal waited on from the UI thread; the loop cannot run the job it is waiting for"
        );

        let Some(slot) = self.slot.take() else {
            return Err(ParleyError::Closed);
        };

        let terminal = {
            let mut state = slot.lock();
            loop {
                match *state {
                    SlotState::Fired | SlotState::Abandoned => break Some(*state),
                    _ => {}
                }
                match deadline {
                    None => {
                        state = slot.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
                    }
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            break None;
                        }
                        state = slot
                            .cond
                            .wait_timeout(state, deadline - now)
                            .unwrap_or_else(PoisonError::into_inner)
                            .0;
                    }
                }
            }
        };

        match terminal {
            Some(SlotState::Fired) => {
                self.outcome = Some(true);
                self.pool.recycle(slot);
                Ok(true)
            }
            Some(_) => {
                self.outcome = Some(false);
                self.pool.recycle(slot);
                Err(ParleyError::Closed)
            }
            None => {
                // Timed out: the job may still fire this slot later.
                self.slot = Some(slot);
                Ok(false)
            }
        }
    }
}
