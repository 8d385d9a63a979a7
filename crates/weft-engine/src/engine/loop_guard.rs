//! Non-productive tool-loop detection.
//!
//! The guard decides, independently of the hard `max_tool_calls` ceiling,
//! whether continued tool calling is still useful. It only ever shortens
//! loops; the ceiling in the router remains the absolute backstop.

use crate::contracts::{ConversationState, Message};
use std::collections::HashMap;

/// Default number of trailing messages the guard inspects.
pub const DEFAULT_GUARD_WINDOW: usize = 6;

/// Tool names treated as clock/time lookups.
///
/// A repeated call to one of these after a valid timestamp was already
/// obtained is never productive.
const CLOCK_TOOL_NAMES: &[&str] = &[
    "clock",
    "current_datetime",
    "current_time",
    "get_current_date",
    "get_current_time",
    "get_date",
    "get_time",
    "now",
];

/// Guard verdict for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    /// No loop signal; normal routing applies.
    Continue,
    /// Repeated non-advancing tool calls detected; route to finalize.
    FinalizeNow,
}

/// Pure decision logic over a trailing message window.
#[derive(Debug, Clone, Copy)]
pub struct ToolLoopGuard {
    /// Number of trailing messages inspected.
    pub window: usize,
}

impl Default for ToolLoopGuard {
    fn default() -> Self {
        Self {
            window: DEFAULT_GUARD_WINDOW,
        }
    }
}

impl ToolLoopGuard {
    /// Guard with a custom window.
    pub fn with_window(window: usize) -> Self {
        Self { window }
    }

    /// Assess the trailing window of `state`.
    pub fn assess(&self, state: &ConversationState) -> GuardVerdict {
        let recent = state.recent(self.window);

        let recent_tool_calls: Vec<&str> = recent
            .iter()
            .flat_map(Message::tool_calls)
            .map(|tc| tc.name.as_str())
            .collect();
        let tool_results: Vec<&str> = recent
            .iter()
            .filter(|m| m.is_tool())
            .map(Message::content)
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for name in &recent_tool_calls {
            *counts.entry(name).or_default() += 1;
        }
        let repeated: Vec<&str> = counts
            .iter()
            .filter(|(_, &count)| count >= 2)
            .map(|(&name, _)| name)
            .collect();

        if repeated.is_empty() {
            return GuardVerdict::Continue;
        }

        if !is_making_progress(&tool_results, &repeated) && !tool_results.is_empty() {
            tracing::debug!(
                repeated = ?repeated,
                results = tool_results.len(),
                "tool loop guard forcing finalization"
            );
            return GuardVerdict::FinalizeNow;
        }

        GuardVerdict::Continue
    }
}

/// Whether repeated tool calling still advances the conversation.
///
/// Clock-like tools are the special case: once any result carries a valid
/// timestamp, further identical calls are wasted. The general branch is
/// deliberately permissive (differing or too-few results count as progress);
/// the hard ceiling is the true backstop for non-clock tools.
fn is_making_progress(tool_results: &[&str], repeated: &[&str]) -> bool {
    if repeated.iter().any(|name| is_clock_tool(name))
        && tool_results.iter().any(|r| contains_timestamp(r))
    {
        return false;
    }

    match tool_results {
        [.., previous, last] => previous != last,
        _ => true,
    }
}

fn is_clock_tool(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    CLOCK_TOOL_NAMES.contains(&lowered.as_str())
}

/// Detect an ISO-8601-like timestamp (`YYYY-MM-DD`, optionally followed by
/// `T` or space and `HH:MM`) or a bare `HH:MM:SS` clock reading.
fn contains_timestamp(text: &str) -> bool {
    let bytes = text.as_bytes();
    let digit = |i: usize| i < bytes.len() && bytes[i].is_ascii_digit();

    for start in 0..bytes.len() {
        // YYYY-MM-DD
        if digit(start)
            && digit(start + 1)
            && digit(start + 2)
            && digit(start + 3)
            && bytes.get(start + 4) == Some(&b'-')
            && digit(start + 5)
            && digit(start + 6)
            && bytes.get(start + 7) == Some(&b'-')
            && digit(start + 8)
            && digit(start + 9)
        {
            return true;
        }
        // HH:MM:SS
        if digit(start)
            && digit(start + 1)
            && bytes.get(start + 2) == Some(&b':')
            && digit(start + 3)
            && digit(start + 4)
            && bytes.get(start + 5) == Some(&b':')
            && digit(start + 6)
            && digit(start + 7)
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ConversationState, Message, ToolCall};
    use serde_json::json;

    fn tool_call(name: &str, id: &str) -> ToolCall {
        ToolCall::new(id, name, json!({}))
    }

    fn state_with_repeated_tool(name: &str, results: &[&str]) -> ConversationState {
        let mut state = ConversationState::new();
        state.push(Message::human("question"));
        for (i, result) in results.iter().enumerate() {
            let id = format!("tc-{i}");
            state.push(Message::ai_with_tool_calls("", vec![tool_call(name, &id)]));
            state.push(Message::tool(*result, &id));
        }
        state
    }

    // -- timestamp detection --

    #[test]
    fn detects_iso_date_and_datetime() {
        assert!(contains_timestamp("2024-06-01"));
        assert!(contains_timestamp("now: 2024-06-01T12:30:00Z"));
        assert!(contains_timestamp("the time is 14:32:05 UTC"));
    }

    #[test]
    fn plain_text_and_bare_numbers_are_not_timestamps() {
        assert!(!contains_timestamp("no dates here"));
        assert!(!contains_timestamp("1234 items"));
        assert!(!contains_timestamp("ratio 12:3"));
    }

    // -- repeated-call detection --

    #[test]
    fn distinct_tools_never_trigger_the_repeated_branch() {
        let mut state = ConversationState::new();
        state.push(Message::human("q"));
        state.push(Message::ai_with_tool_calls(
            "",
            vec![
                tool_call("search", "tc-1"),
                tool_call("calculate", "tc-2"),
                tool_call("translate", "tc-3"),
            ],
        ));
        state.push(Message::tool("a", "tc-1"));
        state.push(Message::tool("b", "tc-2"));
        state.push(Message::tool("c", "tc-3"));
        assert_eq!(
            ToolLoopGuard::default().assess(&state),
            GuardVerdict::Continue
        );
    }

    #[test]
    fn clock_tool_with_two_timestamps_finalizes() {
        let state = state_with_repeated_tool(
            "get_current_time",
            &["2024-06-01T10:00:00Z", "2024-06-01T10:00:02Z"],
        );
        assert_eq!(
            ToolLoopGuard::default().assess(&state),
            GuardVerdict::FinalizeNow
        );
    }

    #[test]
    fn repeated_general_tool_with_identical_results_finalizes() {
        let state = state_with_repeated_tool("search", &["same answer", "same answer"]);
        assert_eq!(
            ToolLoopGuard::default().assess(&state),
            GuardVerdict::FinalizeNow
        );
    }

    #[test]
    fn repeated_general_tool_with_differing_results_continues() {
        let state = state_with_repeated_tool("search", &["first answer", "second answer"]);
        assert_eq!(
            ToolLoopGuard::default().assess(&state),
            GuardVerdict::Continue
        );
    }

    #[test]
    fn too_few_results_default_to_progress() {
        // Two calls requested, only one result so far: permissive branch.
        let mut state = ConversationState::new();
        state.push(Message::ai_with_tool_calls("", vec![tool_call("search", "tc-1")]));
        state.push(Message::ai_with_tool_calls("", vec![tool_call("search", "tc-2")]));
        state.push(Message::tool("partial", "tc-1"));
        assert_eq!(
            ToolLoopGuard::default().assess(&state),
            GuardVerdict::Continue
        );
    }

    #[test]
    fn window_excludes_old_repetitions() {
        // Repetitions fall outside a window of 2 trailing messages.
        let state = state_with_repeated_tool("search", &["same", "same"]);
        let guard = ToolLoopGuard::with_window(2);
        assert_eq!(guard.assess(&state), GuardVerdict::Continue);
    }
}
