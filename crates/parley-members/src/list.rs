// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The member list and the sink background listings stream into.
//!
//! Every change arrives through a [`MemberListHandle`], which may be used
//! from any thread. Changes are queued on the list's [`EventQueue`] and
//! applied on the UI loop in arrival order. Replacing the sections and
//! removing a member are destructive: while a mention popup is open they
//! wait, together with everything queued after them, until it closes.
//!
//! Each listing is tied to a generation. [`MemberList::reset`] starts a new
//! one, so updates still in flight from an earlier listing are dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parley_config::model::MemberListConfig;
use parley_core::{ListMember, MemberListSink, MemberSection, MessageSender, ParleyError};
use parley_dispatch::{EventQueue, OverlayGuard, Scoped, scoped_job};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::section::Section;

/// Notified on the UI loop whenever queued member-list updates have been
/// applied.
pub trait MemberListController {
    fn member_list_updated(&mut self, roster: &Roster);
}

/// Sections in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    sections: Vec<Section>,
    index: HashMap<String, usize>,
}

impl Roster {
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.index.get(id).map(|&i| &self.sections[i])
    }

    fn section_mut(&mut self, id: &str) -> Option<&mut Section> {
        self.index.get(id).map(|&i| &mut self.sections[i])
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Members across all sections.
    pub fn member_count(&self) -> usize {
        self.sections.iter().map(Section::len).sum()
    }

    /// Replaces the sections, keeping the members of sections that survive.
    fn set_sections(&mut self, sections: Vec<MemberSection>) {
        let mut previous: HashMap<String, Section> = self
            .sections
            .drain(..)
            .map(|section| (section.id().to_string(), section))
            .collect();
        self.index.clear();

        for (i, incoming) in sections.iter().enumerate() {
            let section = match previous.remove(&incoming.id) {
                Some(mut kept) => {
                    kept.update(&incoming.name, incoming.total);
                    kept
                }
                None => Section::new(incoming),
            };
            self.index.insert(incoming.id.clone(), i);
            self.sections.push(section);
        }
    }

    fn set_member(&mut self, section_id: &str, member: ListMember) {
        match self.section_mut(section_id) {
            Some(section) => section.set_member(member),
            None => debug!(section = section_id, member = %member.id, "member for unknown section"),
        }
    }

    fn remove_member(&mut self, section_id: &str, member_id: &str) {
        if let Some(section) = self.section_mut(section_id) {
            section.remove_member(member_id);
        }
    }

    fn clear(&mut self) {
        self.sections.clear();
        self.index.clear();
    }
}

pub struct MemberList<S: 'static> {
    scope: Scoped<S, MemberList<S>>,
    queue: EventQueue<S, MemberList<S>>,
    controller: Option<Box<dyn MemberListController>>,
    roster: Roster,
    width: u32,
    generation: u64,
    stop: Option<CancellationToken>,
}

impl<S: 'static> fmt::Debug for MemberList<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberList")
            .field("sections", &self.roster.sections.len())
            .field("generation", &self.generation)
            .field("listing", &self.stop.is_some())
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl<S: 'static> MemberList<S> {
    pub fn new(
        scope: Scoped<S, MemberList<S>>,
        controller: Box<dyn MemberListController>,
        config: &MemberListConfig,
    ) -> Self {
        let queue = EventQueue::builder(scope.clone())
            .policy(config.overlay_policy)
            .on_drained(Self::notify_updated)
            .build();
        Self {
            scope,
            queue,
            controller: Some(controller),
            roster: Roster::default(),
            width: config.width,
            generation: 0,
            stop: None,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Whether a listing stream is attached.
    pub fn is_listing(&self) -> bool {
        self.stop.is_some()
    }

    pub fn queue(&self) -> &EventQueue<S, MemberList<S>> {
        &self.queue
    }

    /// A sink for the current listing generation.
    pub fn handle(&self) -> MemberListHandle<S> {
        MemberListHandle {
            queue: self.queue.clone(),
            generation: self.generation,
        }
    }

    /// Stops the current listing and clears every section.
    pub fn reset(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.cancel();
        }
        self.generation += 1;
        self.roster.clear();
        debug!(generation = self.generation, "member list reset");
    }

    /// Starts listing members from `sender` if it can list them.
    ///
    /// Returns whether a listing was started. Call [`reset`](Self::reset)
    /// first when switching senders.
    pub fn try_async_list(&mut self, sender: &dyn MessageSender) -> bool {
        let Some(lister) = sender.as_member_lister() else {
            debug!("sender cannot list members");
            return false;
        };

        let sink: Arc<dyn MemberListSink> = Arc::new(self.handle());
        let generation = self.generation;
        self.scope.run_async(async move {
            let stop = lister.list_members(sink).await.map_err(|err| match err {
                ParleyError::MemberList { .. } => err,
                other => ParleyError::MemberList {
                    message: other.humanize(),
                    source: Some(Box::new(other)),
                },
            })?;
            Ok(Some(scoped_job(move |list: &mut MemberList<S>| {
                list.attach(generation, stop)
            })))
        });
        true
    }

    /// Opens the mention popup for a member, if it has a mention target.
    ///
    /// Destructive updates are held while the returned popup is alive.
    pub fn open_popup(&self, section_id: &str, member_id: &str) -> Option<MentionPopup<S>> {
        let row = self.roster.section(section_id)?.member(member_id)?;
        let mention = row.mention()?.to_string();
        debug!(section = section_id, member = member_id, "opening mention popup");
        Some(MentionPopup {
            member_id: member_id.to_string(),
            mention,
            _overlay: self.queue.overlay(),
        })
    }

    fn attach(&mut self, generation: u64, stop: CancellationToken) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "stale member listing, stopping");
            stop.cancel();
            return;
        }
        if let Some(previous) = self.stop.replace(stop) {
            previous.cancel();
        }
        info!(generation, "member listing attached");
    }

    fn apply(&mut self, generation: u64, change: impl FnOnce(&mut Roster)) {
        if generation == self.generation {
            change(&mut self.roster);
        } else {
            debug!(generation, current = self.generation, "dropping stale member update");
        }
    }

    fn notify_updated(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            controller.member_list_updated(&self.roster);
            self.controller = Some(controller);
        }
    }
}

impl<S: 'static> Drop for MemberList<S> {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.cancel();
        }
    }
}

/// Thread-safe sink that queues changes for one listing generation.
pub struct MemberListHandle<S: 'static> {
    queue: EventQueue<S, MemberList<S>>,
    generation: u64,
}

impl<S: 'static> Clone for MemberListHandle<S> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            generation: self.generation,
        }
    }
}

impl<S: 'static> fmt::Debug for MemberListHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberListHandle")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl<S: 'static> MemberListSink for MemberListHandle<S> {
    fn set_sections(&self, sections: Vec<MemberSection>) {
        let generation = self.generation;
        self.queue.add_destructive(move |list: &mut MemberList<S>| {
            list.apply(generation, |roster| roster.set_sections(sections))
        });
    }

    fn set_member(&self, section_id: &str, member: ListMember) {
        let generation = self.generation;
        let section_id = section_id.to_string();
        self.queue.add(move |list: &mut MemberList<S>| {
            list.apply(generation, |roster| roster.set_member(&section_id, member))
        });
    }

    fn remove_member(&self, section_id: &str, member_id: &str) {
        let generation = self.generation;
        let section_id = section_id.to_string();
        let member_id = member_id.to_string();
        self.queue.add_destructive(move |list: &mut MemberList<S>| {
            list.apply(generation, |roster| roster.remove_member(&section_id, &member_id))
        });
    }
}

/// An open mention popover. Closing it (dropping) releases held updates.
#[must_use = "the popup closes when dropped"]
pub struct MentionPopup<S: 'static> {
    member_id: String,
    mention: String,
    _overlay: OverlayGuard<S, MemberList<S>>,
}

impl<S: 'static> MentionPopup<S> {
    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    /// The mention text to insert when the user picks it.
    pub fn mention(&self) -> &str {
        &self.mention
    }
}

impl<S: 'static> fmt::Debug for MentionPopup<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MentionPopup")
            .field("member_id", &self.member_id)
            .field("mention", &self.mention)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::MemberStatus;
    use parley_test_utils::{MockMemberLister, MockSender, UiHarness};
    use std::sync::Mutex;
    use tracing_test::traced_test;

    struct App {
        members: Option<MemberList<App>>,
    }

    fn members_of(app: &mut App) -> Option<&mut MemberList<App>> {
        app.members.as_mut()
    }

    #[derive(Clone, Default)]
    struct Updates(Arc<Mutex<Vec<usize>>>);

    impl Updates {
        fn counts(&self) -> Vec<usize> {
            self.0.lock().unwrap().clone()
        }
    }

    impl MemberListController for Updates {
        fn member_list_updated(&mut self, roster: &Roster) {
            self.0.lock().unwrap().push(roster.member_count());
        }
    }

    fn member(id: &str, name: &str, mention: Option<&str>) -> ListMember {
        ListMember {
            id: id.into(),
            name: name.into(),
            status: MemberStatus::Online,
            secondary: None,
            mention: mention.map(str::to_string),
        }
    }

    fn section(id: &str, name: &str, total: usize) -> MemberSection {
        MemberSection {
            id: id.into(),
            name: name.into(),
            total,
        }
    }

    fn roster_lister() -> Arc<MockMemberLister> {
        Arc::new(MockMemberLister::new(
            vec![section("online", "Online", 2), section("offline", "Offline", 0)],
            vec![
                ("online".into(), member("2", "zoe", Some("@zoe"))),
                ("online".into(), member("1", "amy", None)),
                ("offline".into(), member("3", "bob", Some("@bob"))),
            ],
        ))
    }

    fn harness(updates: Updates) -> UiHarness<App> {
        UiHarness::new(move |dispatcher| App {
            members: Some(MemberList::new(
                Scoped::new(dispatcher.clone(), "members", members_of),
                Box::new(updates),
                &MemberListConfig::default(),
            )),
        })
    }

    fn list(h: &mut UiHarness<App>) -> &mut MemberList<App> {
        h.state_mut().members.as_mut().expect("member list open")
    }

    fn listing(app: &App) -> bool {
        app.members.as_ref().is_some_and(MemberList::is_listing)
    }

    fn start(h: &mut UiHarness<App>, lister: &Arc<MockMemberLister>) {
        let sender = MockSender::new().with_member_lister(lister.clone());
        assert!(list(h).try_async_list(&sender));
        assert!(h.settle_until(listing));
    }

    #[test]
    fn listing_fills_sections_in_order() {
        let updates = Updates::default();
        let mut h = harness(updates.clone());
        let lister = roster_lister();
        start(&mut h, &lister);

        let roster = list(&mut h).roster().clone();
        let headers: Vec<String> = roster.sections().iter().map(Section::header).collect();
        assert_eq!(headers, ["Online—2", "Offline"]);

        let online: Vec<&str> = roster
            .section("online")
            .unwrap()
            .members()
            .iter()
            .map(|row| row.name())
            .collect();
        assert_eq!(online, ["amy", "zoe"]);
        assert_eq!(updates.counts().last(), Some(&3));
        assert_eq!(list(&mut h).width(), 250);
    }

    #[test]
    fn senders_without_listing_are_skipped() {
        let mut h = harness(Updates::default());
        assert!(!list(&mut h).try_async_list(&MockSender::new()));
        assert!(list(&mut h).is_empty());
    }

    #[test]
    fn listing_failure_is_reported() {
        let mut h = harness(Updates::default());
        let lister = Arc::new(MockMemberLister::failing());
        let sender = MockSender::new().with_member_lister(lister.clone());
        assert!(list(&mut h).try_async_list(&sender));

        let reporter = h.reporter().clone();
        assert!(h.settle_until(move |_| !reporter.is_empty()));
        assert_eq!(h.reporter().reports(), vec!["Member list unavailable".to_string()]);
        assert!(!listing(h.state()));
    }

    #[test]
    fn popup_needs_a_mention_target() {
        let mut h = harness(Updates::default());
        start(&mut h, &roster_lister());

        let list = list(&mut h);
        assert!(list.open_popup("online", "1").is_none());
        assert!(list.open_popup("online", "404").is_none());
        assert!(list.open_popup("nowhere", "2").is_none());

        let popup = list.open_popup("online", "2").expect("zoe has a mention");
        assert_eq!(popup.mention(), "@zoe");
        assert_eq!(list.queue().active(), 1);
        drop(popup);
        assert_eq!(list.queue().active(), 0);
    }

    #[test]
    fn open_popup_holds_removals_until_closed() {
        let mut h = harness(Updates::default());
        let lister = roster_lister();
        start(&mut h, &lister);
        let sink = lister.last_sink().expect("listing sink");

        let popup = list(&mut h).open_popup("offline", "3").expect("bob has a mention");
        sink.set_member("online", member("4", "cat", None));
        sink.remove_member("offline", "3");
        sink.set_member("online", member("5", "dan", None));
        h.run_until_idle();

        let roster = list(&mut h).roster();
        assert!(roster.section("offline").unwrap().member("3").is_some());
        assert!(roster.section("online").unwrap().member("4").is_some());
        assert!(roster.section("online").unwrap().member("5").is_none());
        assert_eq!(list(&mut h).queue().pending(), 2);

        drop(popup);
        assert!(h.settle_until(|app| {
            app.members.as_ref().is_some_and(|l| l.queue().pending() == 0)
        }));
        let roster = list(&mut h).roster();
        assert!(roster.section("offline").unwrap().member("3").is_none());
        assert!(roster.section("online").unwrap().member("5").is_some());
    }

    #[test]
    #[traced_test]
    fn reset_stops_listing_and_ignores_stale_updates() {
        let updates = Updates::default();
        let mut h = harness(updates.clone());
        let lister = roster_lister();
        start(&mut h, &lister);
        let sink = lister.last_sink().expect("listing sink");

        list(&mut h).reset();
        assert!(lister.tokens()[0].is_cancelled());
        assert!(list(&mut h).is_empty());
        assert!(!list(&mut h).is_listing());

        sink.set_sections(vec![section("late", "Late", 1)]);
        h.run_until_idle();
        assert!(list(&mut h).is_empty());
        assert!(logs_contain("dropping stale member update"));
    }

    #[test]
    fn listing_that_lands_after_reset_is_stopped() {
        let mut h = harness(Updates::default());
        let lister = roster_lister();
        let sender = MockSender::new().with_member_lister(lister.clone());

        assert!(list(&mut h).try_async_list(&sender));
        list(&mut h).reset();

        let watched = Arc::clone(&lister);
        assert!(h.settle_until(move |_| {
            watched.tokens().first().is_some_and(|token| token.is_cancelled())
        }));
        assert!(list(&mut h).is_empty());
        assert!(!list(&mut h).is_listing());
    }

    #[test]
    fn dropping_the_list_stops_listing() {
        let mut h = harness(Updates::default());
        let lister = roster_lister();
        start(&mut h, &lister);

        h.state_mut().members = None;
        assert!(lister.tokens()[0].is_cancelled());
    }
}
