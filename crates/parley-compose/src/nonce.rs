// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side nonces for messages the backend has not confirmed yet.

use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use parley_core::Nonce;
use sha2::{Digest, Sha256};

/// Bytes of digest kept per nonce.
const NONCE_BYTES: usize = 16;

/// Length of an encoded nonce: 16 bytes as unpadded base64.
pub const NONCE_LEN: usize = 22;

/// Generates nonces from a scope, the wall clock, and a per-generator counter.
///
/// The counter alone keeps nonces from one generator distinct; the scope and
/// timestamp keep generators in different processes apart.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    counter: AtomicU64,
}

impl NonceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh 22-character URL-safe nonce for `scope`.
    pub fn next(&self, scope: &str) -> Nonce {
        let count = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let raw = format!("parley/{scope}/{nanos:X}/{count:X}");

        let digest = Sha256::digest(raw.as_bytes());
        Nonce::new(URL_SAFE_NO_PAD.encode(&digest[..NONCE_BYTES]))
    }

    /// Nonces handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn nonce_is_fixed_width_and_url_safe() {
        let nonce = NonceGenerator::new().next("u-1");
        assert_eq!(nonce.as_str().len(), NONCE_LEN);
        assert!(
            nonce
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn concurrent_generation_never_collides() {
        let generator = Arc::new(NonceGenerator::new());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..1000)
                        .map(|_| generator.next("same-scope"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for worker in workers {
            for nonce in worker.join().unwrap() {
                assert!(seen.insert(nonce), "duplicate nonce");
            }
        }
        assert_eq!(seen.len(), 8000);
        assert_eq!(generator.issued(), 8000);
    }

    proptest! {
        #[test]
        fn any_scope_yields_distinct_nonces(scope in ".*") {
            let generator = NonceGenerator::new();
            let a = generator.next(&scope);
            let b = generator.next(&scope);
            prop_assert_ne!(&a, &b);
            prop_assert_eq!(a.as_str().len(), NONCE_LEN);
        }
    }
}
