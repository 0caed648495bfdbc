// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error surfacing for background work.

use std::error::Error as _;

use parley_core::ParleyError;
use tracing::error;

/// Receives errors from background operations that have no other caller
/// to return them to. Always invoked on the UI loop.
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(&self, err: &ParleyError);
}

/// Reports errors through `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, err: &ParleyError) {
        let cause = err.source().map(|source| source.to_string());
        error!(
            error = %err,
            cause = cause.as_deref().unwrap_or(""),
            summary = %err.humanize(),
            "background operation failed"
        );
    }
}

impl<F> ErrorReporter for F
where
    F: Fn(&ParleyError) + Send + Sync + 'static,
{
    fn report(&self, err: &ParleyError) {
        self(err)
    }
}
