// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered mutation queue for a UI component.
//!
//! Any thread may add mutations; they are applied on the UI loop in the
//! order they were added, one at a time. While the component has an overlay
//! open (a popover anchored to one of its rows) the activation counter is
//! non-zero. Under [`OverlayPolicy::DeferDestructive`] a destructive
//! mutation at the head of the queue then waits, and everything behind it
//! waits too, until the last overlay closes. Non-destructive mutations
//! ahead of it still apply.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_config::model::OverlayPolicy;
use tracing::{debug, trace};

use crate::scoped::Scoped;

/// A queued change to the component.
pub type Mutation<T> = Box<dyn FnOnce(&mut T) + Send + 'static>;

struct Queued<T> {
    destructive: bool,
    apply: Mutation<T>,
}

struct Pending<T> {
    items: VecDeque<Queued<T>>,
    /// A drain job is queued on the UI loop or currently running.
    scheduled: bool,
}

struct Inner<S, T> {
    scope: Scoped<S, T>,
    pending: Mutex<Pending<T>>,
    active: AtomicUsize,
    policy: OverlayPolicy,
    on_drained: Option<fn(&mut T)>,
}

impl<S: 'static, T: 'static> Inner<S, T> {
    fn lock(&self) -> MutexGuard<'_, Pending<T>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deferring(&self) -> bool {
        self.policy == OverlayPolicy::DeferDestructive && self.active.load(Ordering::Acquire) > 0
    }

    fn blocked(&self, pending: &Pending<T>) -> bool {
        pending
            .items
            .front()
            .is_some_and(|head| head.destructive && self.deferring())
    }

    fn schedule(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        let lens = self.scope.lens();
        self.scope.dispatcher().post(move |state: &mut S| match lens(state) {
            Some(target) => inner.drain(target),
            None => inner.abandon(),
        });
    }

    fn drain(&self, target: &mut T) {
        let mut applied = 0usize;
        loop {
            let next = {
                let mut pending = self.lock();
                if self.blocked(&pending) {
                    pending.scheduled = false;
                    debug!(
                        queue = self.scope.name(),
                        held = pending.items.len(),
                        "destructive update deferred while overlay is open"
                    );
                    return;
                }
                match pending.items.pop_front() {
                    Some(next) => next,
                    None => {
                        pending.scheduled = false;
                        break;
                    }
                }
            };
            // The lock is released here so mutations may enqueue more work.
            (next.apply)(target);
            applied += 1;
        }

        trace!(queue = self.scope.name(), applied, "event queue drained");
        if applied > 0
            && let Some(hook) = self.on_drained
        {
            hook(target);
        }
    }

    fn abandon(&self) {
        let mut pending = self.lock();
        let dropped = pending.items.len();
        pending.items.clear();
        pending.scheduled = false;
        debug!(
            queue = self.scope.name(),
            dropped, "component gone, discarding queued updates"
        );
    }
}

/// Cloneable handle to a component's ordered mutation queue.
pub struct EventQueue<S, T> {
    inner: Arc<Inner<S, T>>,
}

impl<S, T> Clone for EventQueue<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, T> std::fmt::Debug for EventQueue<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("scope", &self.inner.scope)
            .field("policy", &self.inner.policy)
            .field("active", &self.inner.active.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

pub struct EventQueueBuilder<S, T> {
    scope: Scoped<S, T>,
    policy: OverlayPolicy,
    on_drained: Option<fn(&mut T)>,
}

impl<S: 'static, T: 'static> EventQueueBuilder<S, T> {
    pub fn policy(mut self, policy: OverlayPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Called on the UI loop each time a drain applies at least one
    /// mutation and empties the queue.
    pub fn on_drained(mut self, hook: fn(&mut T)) -> Self {
        self.on_drained = Some(hook);
        self
    }

    pub fn build(self) -> EventQueue<S, T> {
        EventQueue {
            inner: Arc::new(Inner {
                scope: self.scope,
                pending: Mutex::new(Pending {
                    items: VecDeque::new(),
                    scheduled: false,
                }),
                active: AtomicUsize::new(0),
                policy: self.policy,
                on_drained: self.on_drained,
            }),
        }
    }
}

impl<S: 'static, T: 'static> EventQueue<S, T> {
    pub fn builder(scope: Scoped<S, T>) -> EventQueueBuilder<S, T> {
        EventQueueBuilder {
            scope,
            policy: OverlayPolicy::default(),
            on_drained: None,
        }
    }

    /// Queues a mutation. Safe to call from any thread.
    pub fn add<F>(&self, f: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.push(false, Box::new(f));
    }

    /// Queues a mutation that may remove or rebuild rows an open overlay
    /// could be anchored to.
    pub fn add_destructive<F>(&self, f: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.push(true, Box::new(f));
    }

    /// Marks an overlay as opened. UI thread only. Returns the new count.
    pub fn activate(&self) -> usize {
        self.inner.active.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Marks an overlay as closed. UI thread only.
    ///
    /// When the count reaches zero, held mutations are scheduled again.
    ///
    /// # Panics
    ///
    /// Panics if called more times than [`activate`](Self::activate).
    pub fn deactivate(&self) -> usize {
        let previous = match self.inner.active.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |n| n.checked_sub(1),
        ) {
            Ok(previous) => previous,
            Err(_) => panic!(
                "EventQueue `{}` deactivated more times than activated",
                self.inner.scope.name()
            ),
        };

        if previous == 1 {
            let resume = {
                let mut pending = self.inner.lock();
                let resume = !pending.scheduled && !pending.items.is_empty();
                if resume {
                    pending.scheduled = true;
                }
                resume
            };
            if resume {
                debug!(queue = self.inner.scope.name(), "overlay closed, resuming held updates");
                self.inner.schedule();
            }
        }
        previous - 1
    }

    /// Activates the queue until the returned guard is dropped.
    pub fn overlay(&self) -> OverlayGuard<S, T> {
        self.activate();
        OverlayGuard {
            queue: self.clone(),
        }
    }

    /// Number of currently open overlays.
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Mutations queued and not yet applied.
    pub fn pending(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn policy(&self) -> OverlayPolicy {
        self.inner.policy
    }

    fn push(&self, destructive: bool, apply: Mutation<T>) {
        let schedule = {
            let mut pending = self.inner.lock();
            pending.items.push_back(Queued { destructive, apply });
            let schedule = !pending.scheduled && !self.inner.blocked(&pending);
            if schedule {
                pending.scheduled = true;
            }
            schedule
        };
        if schedule {
            self.inner.schedule();
        }
    }
}

/// Keeps a queue activated for as long as it lives.
#[must_use = "the overlay closes as soon as the guard is dropped"]
pub struct OverlayGuard<S: 'static, T: 'static> {
    queue: EventQueue<S, T>,
}

impl<S: 'static, T: 'static> OverlayGuard<S, T> {
    pub fn queue(&self) -> &EventQueue<S, T> {
        &self.queue
    }
}

impl<S: 'static, T: 'static> Drop for OverlayGuard<S, T> {
    fn drop(&mut self) {
        self.queue.deactivate();
    }
}

impl<S: 'static, T: 'static> std::fmt::Debug for OverlayGuard<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayGuard").field("queue", &self.queue).finish()
    }
}
