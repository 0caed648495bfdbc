// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sections and member rows of a member list.

use std::collections::HashMap;
use std::fmt::Write as _;

use parley_core::markup::escape_markup;
use parley_core::{ListMember, MemberSection, MemberStatus};

/// Dot color for a presence status, as `0xRRGGBB`.
pub fn status_color(status: MemberStatus) -> u32 {
    match status {
        MemberStatus::Online => 0x43B581,
        MemberStatus::Busy => 0xF04747,
        MemberStatus::Idle => 0xFAA61A,
        MemberStatus::Offline | MemberStatus::Unknown => 0x747F8D,
    }
}

/// One rendered member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRow {
    member: ListMember,
    markup: String,
}

impl MemberRow {
    pub fn new(member: ListMember) -> Self {
        let markup = render(&member);
        Self { member, markup }
    }

    pub fn update(&mut self, member: ListMember) {
        self.markup = render(&member);
        self.member = member;
    }

    pub fn id(&self) -> &str {
        &self.member.id
    }

    pub fn name(&self) -> &str {
        &self.member.name
    }

    pub fn status(&self) -> MemberStatus {
        self.member.status
    }

    pub fn mention(&self) -> Option<&str> {
        self.member.mention.as_deref()
    }

    /// Status dot, escaped name, and the secondary line if any.
    pub fn markup(&self) -> &str {
        &self.markup
    }
}

fn render(member: &ListMember) -> String {
    let mut markup = format!(
        r##"<span color="#{:06X}" size="large">●</span> {}"##,
        status_color(member.status),
        escape_markup(&member.name)
    );
    if let Some(secondary) = member.secondary.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(
            markup,
            "\n<span alpha=\"85%\"><sup>{}</sup></span>",
            escape_markup(secondary)
        );
    }
    markup
}

/// A group of members under one header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    id: String,
    name: String,
    total: usize,
    members: HashMap<String, MemberRow>,
}

impl Section {
    pub fn new(section: &MemberSection) -> Self {
        Self {
            id: section.id.clone(),
            name: section.name.clone(),
            total: section.total,
            members: HashMap::new(),
        }
    }

    pub fn update(&mut self, name: &str, total: usize) {
        self.name = name.to_string();
        self.total = total;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// The name, followed by the total when the backend reported one.
    pub fn header(&self) -> String {
        if self.total > 0 {
            format!("{}—{}", self.name, self.total)
        } else {
            self.name.clone()
        }
    }

    /// Inserts `member`, or updates the row with the same id.
    pub fn set_member(&mut self, member: ListMember) {
        match self.members.get_mut(&member.id) {
            Some(row) => row.update(member),
            None => {
                self.members.insert(member.id.clone(), MemberRow::new(member));
            }
        }
    }

    pub fn remove_member(&mut self, id: &str) -> bool {
        self.members.remove(id).is_some()
    }

    pub fn member(&self, id: &str) -> Option<&MemberRow> {
        self.members.get(id)
    }

    /// Rows sorted A–Z by name, ties broken by id.
    pub fn members(&self) -> Vec<&MemberRow> {
        let mut rows: Vec<&MemberRow> = self.members.values().collect();
        rows.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(b.id())));
        rows
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
