// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Headless demo session.
//!
//! Runs the UI loop on the calling thread against the loopback backend:
//! sends a batch of messages (some with attachments), retries the ones that
//! failed, edits a committed one, and opens a mention popup while the
//! member list keeps receiving presence updates.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_compose::{Composer, NonceGenerator, PresendBoard, PresendPhase};
use parley_config::ParleyConfig;
use parley_core::{AttachmentFile, MessageSender, ParleyError};
use parley_dispatch::{Scoped, UiLoop, UiLoopBuilder};
use parley_members::{MemberList, MemberListController, Roster};
use tracing::{info, warn};

use crate::loopback::LoopbackSender;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub messages: usize,
    /// Every n-th send is refused; `0` never fails.
    pub fail_every: u64,
    pub latency: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub sent: usize,
    pub retried: usize,
    pub committed: usize,
    pub failed: usize,
    pub edited: bool,
    pub members: usize,
    pub sections: Vec<String>,
}

impl fmt::Display for DemoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sent: {}", self.sent)?;
        writeln!(f, "retried: {}", self.retried)?;
        writeln!(f, "committed: {}", self.committed)?;
        writeln!(f, "failed: {}", self.failed)?;
        writeln!(f, "edited: {}", if self.edited { "yes" } else { "no" })?;
        writeln!(f, "members: {}", self.members)?;
        write!(f, "sections: {}", self.sections.join(", "))
    }
}

struct DemoApp {
    composer: Composer<DemoApp>,
    members: MemberList<DemoApp>,
}

fn composer_of(app: &mut DemoApp) -> Option<&mut Composer<DemoApp>> {
    Some(&mut app.composer)
}

fn members_of(app: &mut DemoApp) -> Option<&mut MemberList<DemoApp>> {
    Some(&mut app.members)
}

fn sends_settled(app: &DemoApp) -> bool {
    app.composer.pending_count() == app.composer.failed().len()
}

struct ListLogger;

impl MemberListController for ListLogger {
    fn member_list_updated(&mut self, roster: &Roster) {
        info!(
            sections = roster.sections().len(),
            members = roster.member_count(),
            "member list updated"
        );
    }
}

/// Drives the loop until `done` holds. Also polls, since some conditions
/// depend on the backend rather than on queued jobs.
fn drive(
    ui: &mut UiLoop<DemoApp>,
    what: &str,
    mut done: impl FnMut(&DemoApp) -> bool,
) -> Result<(), ParleyError> {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    while Instant::now() < deadline {
        if ui.run_until(POLL_INTERVAL, &mut done) {
            return Ok(());
        }
        if ui.is_stopped() {
            return Err(ParleyError::Closed);
        }
    }
    warn!(what, "demo step timed out");
    Err(ParleyError::Timeout {
        duration: SETTLE_TIMEOUT,
    })
}

pub fn run(config: &ParleyConfig, options: &DemoOptions) -> Result<DemoReport, ParleyError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.dispatch.worker_threads)
        .thread_name("parley-worker")
        .enable_all()
        .build()
        .map_err(|e| ParleyError::Internal(format!("failed to start runtime: {e}")))?;

    let board = PresendBoard::new();
    let backend = Arc::new(LoopbackSender::new(options.fail_every, options.latency));
    let nonces = Arc::new(NonceGenerator::new());

    let mut ui = UiLoopBuilder::new(runtime.handle().clone())
        .config(&config.dispatch)
        .build(|dispatcher| DemoApp {
            composer: Composer::new(
                Scoped::new(dispatcher.clone(), "composer", composer_of),
                Box::new(board.clone()),
                nonces,
                &config.identity,
                &config.compose,
            ),
            members: MemberList::new(
                Scoped::new(dispatcher.clone(), "members", members_of),
                Box::new(ListLogger),
                &config.member_list,
            ),
        });

    let app = ui.state_mut();
    app.composer.set_sender(
        config.identity.user_id.clone(),
        Some(Arc::clone(&backend) as Arc<dyn MessageSender>),
    );
    app.members.try_async_list(backend.as_ref());

    info!(messages = options.messages, "sending demo messages");
    for i in 1..=options.messages {
        app.composer.set_text(format!("demo message {i}"));
        if i % 3 == 0 {
            app.composer.add_attachment(AttachmentFile {
                name: format!("photo-{i}.png"),
                path: format!("/tmp/photo-{i}.png").into(),
                size: 256 * 1024,
            });
        }
        app.composer.send_input();
    }
    drive(&mut ui, "initial sends", sends_settled)?;

    let failed = ui.state().composer.failed();
    info!(failed = failed.len(), "retrying failed sends once");
    let composer = &mut ui.state_mut().composer;
    let retried = failed
        .iter()
        .filter(|nonce| composer.retry(nonce).is_some())
        .count();
    drive(&mut ui, "retries", sends_settled)?;

    let edited = edit_first_committed(&mut ui, &board, &backend)?;

    drive(&mut ui, "member listing", |app| app.members.is_listing())?;
    let popup = ui
        .state()
        .members
        .roster()
        .sections()
        .iter()
        .flat_map(|section| section.members().into_iter().map(move |row| (section.id(), row.id())))
        .find_map(|(section, member)| ui.state().members.open_popup(section, member));
    if let Some(popup) = popup {
        info!(mention = popup.mention(), "mention popup open");
        ui.run_until(options.latency * 8, |_| false);
        drop(popup);
    }
    drive(&mut ui, "held member updates", |app| app.members.queue().pending() == 0)?;

    let state = ui.state();
    let report = DemoReport {
        sent: options.messages,
        retried,
        committed: board
            .views()
            .iter()
            .filter(|view| view.phase() == PresendPhase::Done)
            .count(),
        failed: state.composer.failed().len(),
        edited,
        members: state.members.roster().member_count(),
        sections: state
            .members
            .roster()
            .sections()
            .iter()
            .map(|section| section.header())
            .collect(),
    };

    ui.state_mut().members.reset();
    ui.dispatcher().shutdown();
    ui.run();
    drop(ui);
    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(report)
}

fn edit_first_committed(
    ui: &mut UiLoop<DemoApp>,
    board: &PresendBoard,
    backend: &LoopbackSender,
) -> Result<bool, ParleyError> {
    let Some(id) = board.views().iter().find_map(|view| view.id().cloned()) else {
        return Ok(false);
    };
    if !ui.state_mut().composer.start_editing(id.clone()) {
        return Ok(false);
    }
    drive(ui, "edit fetch", |app| app.composer.editing().is_some())?;

    let composer = &mut ui.state_mut().composer;
    let revised = format!("{} (edited)", composer.text());
    composer.set_text(revised.clone());
    composer.send_input();
    drive(ui, "edit", |_| backend.store().content(&id).as_deref() == Some(revised.as_str()))?;
    info!(id = %id, "edited committed message");
    Ok(true)
}
