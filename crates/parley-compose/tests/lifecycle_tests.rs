// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the outbound message lifecycle.
//!
//! Each test drives an isolated UI loop on the test thread with a mock
//! backend running on the harness runtime.

use std::sync::Arc;
use std::time::Duration;

use parley_compose::{Composer, NonceGenerator, PresendBoard, PresendPhase, Submission};
use parley_config::model::{ComposeConfig, IdentityConfig};
use parley_core::{MessageSender, Nonce};
use parley_dispatch::Scoped;
use parley_test_utils::{MockSender, RecordingController, SendOutcome, UiHarness};

struct Window {
    composer: Option<Composer<Window>>,
}

fn composer_of(window: &mut Window) -> Option<&mut Composer<Window>> {
    window.composer.as_mut()
}

fn open_window(
    controller: impl parley_core::PresendController + 'static,
    sender: Arc<MockSender>,
) -> UiHarness<Window> {
    UiHarness::new(move |dispatcher| {
        let mut composer = Composer::new(
            Scoped::new(dispatcher.clone(), "composer", composer_of),
            Box::new(controller),
            Arc::new(NonceGenerator::new()),
            &IdentityConfig::default(),
            &ComposeConfig::default(),
        );
        composer.set_sender("u-1", Some(sender as Arc<dyn MessageSender>));
        Window {
            composer: Some(composer),
        }
    })
}

fn send(h: &mut UiHarness<Window>, text: &str) -> Nonce {
    let composer = h.state_mut().composer.as_mut().expect("composer open");
    composer.set_text(text);
    match composer.send_input() {
        Some(Submission::Sent(nonce)) => nonce,
        other => panic!("expected a send, got {other:?}"),
    }
}

fn pending(h: &UiHarness<Window>) -> usize {
    h.state().composer.as_ref().map_or(0, Composer::pending_count)
}

// ---- Concurrent sends ----

#[test]
fn test_rapid_sends_each_get_their_own_placeholder() {
    let board = PresendBoard::new();
    let sender = Arc::new(MockSender::new().with_latency(Duration::from_millis(5)));
    let mut h = open_window(board.clone(), Arc::clone(&sender));

    let nonces: Vec<Nonce> = (0..20).map(|i| send(&mut h, &format!("msg {i}"))).collect();
    assert_eq!(board.len(), 20);
    assert_eq!(pending(&h), 20);

    assert!(h.settle_until(|w| w.composer.as_ref().is_some_and(|c| c.pending_count() == 0)));

    for (i, nonce) in nonces.iter().enumerate() {
        let view = board.view(nonce).expect("placeholder");
        assert_eq!(view.phase(), PresendPhase::Done);
        assert_eq!(view.content(), format!("msg {i}"));
    }
    assert_eq!(sender.sent_count(), 20);
    assert!(h.reporter().is_empty());
}

#[test]
fn test_one_failure_does_not_disturb_other_sends() {
    let recorder = RecordingController::new();
    let sender = Arc::new(MockSender::new());
    sender.script(SendOutcome::Succeed);
    sender.script(SendOutcome::Fail("server busy".into()));
    sender.script(SendOutcome::Succeed);
    let mut h = open_window(recorder.clone(), Arc::clone(&sender));

    let first = send(&mut h, "one");
    assert!(h.settle_until(|_| recorder.done_for(&first).is_some()));
    let second = send(&mut h, "two");
    assert!(h.settle_until(|_| recorder.errors_for(&second) == 1));
    let third = send(&mut h, "three");
    assert!(h.settle_until(|_| recorder.done_for(&third).is_some()));

    assert_eq!(recorder.errors_for(&first), 0);
    assert_eq!(recorder.errors_for(&third), 0);
    assert_eq!(pending(&h), 1);
    assert_eq!(h.reporter().reports(), vec!["Server busy".to_string()]);
}

// ---- Scope lifetime ----

#[test]
fn test_results_for_a_closed_composer_are_discarded() {
    let recorder = RecordingController::new();
    let sender = Arc::new(MockSender::new().with_latency(Duration::from_millis(20)));
    let mut h = open_window(recorder.clone(), Arc::clone(&sender));

    let nonce = send(&mut h, "into the void");
    h.state_mut().composer = None;

    assert!(h.settle_until(|_| sender.sent_count() == 1));
    h.settle_for(Duration::from_millis(50));

    assert!(recorder.done_for(&nonce).is_none());
    assert_eq!(recorder.errors_for(&nonce), 0);
    assert!(h.reporter().is_empty());
}

#[test]
fn test_sender_swap_keeps_in_flight_sends() {
    let board = PresendBoard::new();
    let sender = Arc::new(MockSender::new().with_latency(Duration::from_millis(20)));
    let mut h = open_window(board.clone(), sender);

    let nonce = send(&mut h, "before swap");
    let composer = h.state_mut().composer.as_mut().expect("composer open");
    composer.set_sender("u-2", Some(Arc::new(MockSender::new()) as Arc<dyn MessageSender>));

    assert!(h.settle_until(|_| board.view(&nonce).is_some_and(|v| v.phase() == PresendPhase::Done)));
}
