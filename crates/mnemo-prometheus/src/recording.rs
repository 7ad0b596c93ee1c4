// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions.
//!
//! The memory and gateway crates emit through the metrics-rs facade; this
//! module only names and describes what they emit.

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

pub const VECTORS_TOTAL: &str = "mnemo_vectors_total";
pub const MESSAGES: &str = "mnemo_messages";
pub const PROJECT_FILES: &str = "mnemo_project_files";
pub const TOOL_CALLS_TOTAL: &str = "mnemo_tool_calls_total";
pub const TOOL_CALL_DURATION: &str = "mnemo_tool_call_duration_seconds";

/// Register all Mnemo metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_gauge!(VECTORS_TOTAL, "Points stored in the memory collection");
    describe_gauge!(MESSAGES, "Stored conversational messages by role");
    describe_gauge!(PROJECT_FILES, "Indexed project files");
    describe_counter!(TOOL_CALLS_TOTAL, "Dispatched tool calls by tool and status");
    describe_histogram!(
        TOOL_CALL_DURATION,
        Unit::Seconds,
        "Tool call latency by tool"
    );
}
