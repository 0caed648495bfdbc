// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch narrowed to one component of the UI state.
//!
//! Components that live inside the UI state (a composer, a member list)
//! cannot hold references to themselves across threads. They hold a
//! [`Scoped`] instead: a dispatcher plus a lens that finds the component
//! again when the job runs. If the component is gone by then, the job is
//! discarded.

use std::future::Future;

use parley_core::ParleyError;
use tracing::debug;

use crate::bridge::{Dispatcher, UiJob};

/// Locates a component inside the UI state.
pub type Lens<S, T> = fn(&mut S) -> Option<&mut T>;

/// A job that runs against a component rather than the whole state.
pub type ScopedJob<T> = Box<dyn FnOnce(&mut T) + Send + 'static>;

/// Boxes a closure as a [`ScopedJob`].
pub fn scoped_job<T, F>(f: F) -> ScopedJob<T>
where
    F: FnOnce(&mut T) + Send + 'static,
{
    Box::new(f)
}

pub struct Scoped<S, T> {
    dispatcher: Dispatcher<S>,
    lens: Lens<S, T>,
    name: &'static str,
}

impl<S, T> Clone for Scoped<S, T> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            lens: self.lens,
            name: self.name,
        }
    }
}

impl<S, T> std::fmt::Debug for Scoped<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scoped").field("name", &self.name).finish()
    }
}

impl<S: 'static, T: 'static> Scoped<S, T> {
    pub fn new(dispatcher: Dispatcher<S>, name: &'static str, lens: Lens<S, T>) -> Self {
        Self {
            dispatcher,
            lens,
            name,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn lens(&self) -> Lens<S, T> {
        self.lens
    }

    /// Posts `f` against the component.
    pub fn post<F>(&self, f: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.dispatcher.post(self.wrap(Box::new(f)));
    }

    /// Runs `work` in the background and applies its continuation to the
    /// component. Errors go to the reporter as with [`Dispatcher::run_async`].
    pub fn run_async<Fut>(&self, work: Fut)
    where
        Fut: Future<Output = Result<Option<ScopedJob<T>>, ParleyError>> + Send + 'static,
    {
        let scope = self.clone();
        self.dispatcher.run_async(async move {
            let continuation = work.await?;
            Ok(continuation.map(|job| scope.wrap(job)))
        });
    }

    /// Delivers `err` to the reporter on the UI loop.
    pub fn report(&self, err: ParleyError) {
        self.dispatcher.report(err);
    }

    fn wrap(&self, job: ScopedJob<T>) -> UiJob<S> {
        let lens = self.lens;
        let name = self.name;
        Box::new(move |state: &mut S| match lens(state) {
            Some(target) => job(target),
            None => debug!(scope = name, "scope no longer exists, discarding ui job"),
        })
    }
}
