// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley chat client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Local identity used for nonce scoping and fallback authorship.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// UI dispatch and background runtime settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Message composition settings.
    #[serde(default)]
    pub compose: ComposeConfig,

    /// Member list settings.
    #[serde(default)]
    pub member_list: MemberListConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// User id of the local account. Used as the nonce scope.
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Name shown on placeholders when the message view has no
    /// authoritative author record yet.
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// Avatar shown next to the fallback author.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            display_name: default_display_name(),
            avatar_url: None,
        }
    }
}

fn default_user_id() -> String {
    "local".to_string()
}

fn default_display_name() -> String {
    "you".to_string()
}

/// UI dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Maximum number of idle completion signals kept for reuse.
    #[serde(default = "default_signal_pool_capacity")]
    pub signal_pool_capacity: usize,

    /// Worker threads for the background runtime.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Backlog depth on the UI queue above which a warning is logged.
    #[serde(default = "default_ui_queue_warn_depth")]
    pub ui_queue_warn_depth: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            signal_pool_capacity: default_signal_pool_capacity(),
            worker_threads: default_worker_threads(),
            ui_queue_warn_depth: default_ui_queue_warn_depth(),
        }
    }
}

fn default_signal_pool_capacity() -> usize {
    16
}

fn default_worker_threads() -> usize {
    2
}

fn default_ui_queue_warn_depth() -> usize {
    1024
}

/// Message composition configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComposeConfig {
    /// Re-enter editing with the submitted draft when the backend rejects an edit.
    #[serde(default = "default_restore_draft")]
    pub restore_draft_on_edit_failure: bool,

    /// Maximum attachments per message.
    #[serde(default = "default_max_attachments")]
    pub max_attachments: usize,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            restore_draft_on_edit_failure: default_restore_draft(),
            max_attachments: default_max_attachments(),
        }
    }
}

fn default_restore_draft() -> bool {
    true
}

fn default_max_attachments() -> usize {
    10
}

/// How an ordered event queue treats destructive mutations while an
/// overlay (popover, context menu) is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPolicy {
    /// Hold destructive mutations, and everything queued behind them,
    /// until the last overlay closes.
    #[default]
    DeferDestructive,
    /// Apply every mutation as it arrives; overlays are only counted.
    Immediate,
}

/// Member list configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemberListConfig {
    /// Requested width of the member list pane, in pixels.
    #[serde(default = "default_member_list_width")]
    pub width: u32,

    /// Overlay policy for the member-list event queue.
    #[serde(default)]
    pub overlay_policy: OverlayPolicy,
}

impl Default for MemberListConfig {
    fn default() -> Self {
        Self {
            width: default_member_list_width(),
            overlay_policy: OverlayPolicy::default(),
        }
    }
}

fn default_member_list_width() -> u32 {
    250
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
