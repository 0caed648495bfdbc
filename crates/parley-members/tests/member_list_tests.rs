// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for member lists fed from background producers.

use std::sync::Arc;
use std::thread;

use parley_config::model::{MemberListConfig, OverlayPolicy};
use parley_core::{ListMember, MemberListSink, MemberSection, MemberStatus};
use parley_dispatch::Scoped;
use parley_members::{MemberList, MemberListController, Roster};
use parley_test_utils::UiHarness;

struct App {
    members: MemberList<App>,
}

fn members_of(app: &mut App) -> Option<&mut MemberList<App>> {
    Some(&mut app.members)
}

struct Quiet;

impl MemberListController for Quiet {
    fn member_list_updated(&mut self, _roster: &Roster) {}
}

fn open(config: MemberListConfig) -> UiHarness<App> {
    UiHarness::new(move |dispatcher| App {
        members: MemberList::new(
            Scoped::new(dispatcher.clone(), "members", members_of),
            Box::new(Quiet),
            &config,
        ),
    })
}

fn member(id: String, status: MemberStatus) -> ListMember {
    ListMember {
        name: format!("user {id}"),
        id,
        status,
        secondary: None,
        mention: None,
    }
}

// ---- Concurrent producers ----

#[test]
fn test_members_from_many_threads_all_land() {
    let mut h = open(MemberListConfig::default());
    let sink = h.state().members.handle();
    sink.set_sections(vec![MemberSection {
        id: "all".into(),
        name: "Everyone".into(),
        total: 400,
    }]);

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let sink = sink.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    sink.set_member("all", member(format!("{p}-{i}"), MemberStatus::Online));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert!(h.settle_until(|app| app.members.roster().member_count() == 400));
    assert_eq!(h.state().members.queue().pending(), 0);
}

#[test]
fn test_last_update_for_a_member_wins() {
    let mut h = open(MemberListConfig::default());
    let sink: Arc<dyn MemberListSink> = Arc::new(h.state().members.handle());
    sink.set_sections(vec![MemberSection {
        id: "s".into(),
        name: "Staff".into(),
        total: 0,
    }]);
    for status in [MemberStatus::Online, MemberStatus::Idle, MemberStatus::Busy] {
        sink.set_member("s", member("1".into(), status));
    }
    h.run_until_idle();

    let roster = h.state().members.roster();
    let row = roster.section("s").unwrap().member("1").unwrap();
    assert_eq!(row.status(), MemberStatus::Busy);
    assert!(row.markup().starts_with("<span color=\"#F04747\""));
}

// ---- Overlay policy ----

#[test]
fn test_immediate_policy_never_holds_updates() {
    let mut h = open(MemberListConfig {
        overlay_policy: OverlayPolicy::Immediate,
        ..MemberListConfig::default()
    });
    let sink = h.state().members.handle();
    sink.set_sections(vec![MemberSection {
        id: "s".into(),
        name: "Staff".into(),
        total: 0,
    }]);
    sink.set_member(
        "s",
        ListMember {
            mention: Some("@user".into()),
            ..member("1".into(), MemberStatus::Online)
        },
    );
    h.run_until_idle();

    let popup = h.state().members.open_popup("s", "1").expect("mention target");
    sink.remove_member("s", "1");
    h.run_until_idle();

    assert!(h.state().members.roster().section("s").unwrap().member("1").is_none());
    drop(popup);
}
