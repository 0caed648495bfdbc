// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Member list for the Parley chat client.
//!
//! A [`MemberList`] lives inside the UI state. Backends stream sections and
//! members into it through a [`MemberListHandle`] from any thread; the
//! changes are applied on the UI loop in order, and a
//! [`MemberListController`] hears about every batch.

pub mod list;
pub mod section;

pub use list::{MemberList, MemberListController, MemberListHandle, MentionPopup, Roster};
pub use section::{MemberRow, Section, status_color};
