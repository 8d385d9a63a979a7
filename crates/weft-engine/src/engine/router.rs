//! The state-machine transition function consulted after each model response.
//!
//! All routing decisions live here (with loop-safety input from
//! [`ToolLoopGuard`]); node handlers never choose their own successors.

use crate::contracts::{ConversationState, TurnConfig};
use crate::engine::loop_guard::{GuardVerdict, ToolLoopGuard};

/// Routing outcome after a model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextNode {
    /// Dispatch the requested tool calls.
    ExecuteTools,
    /// Force termination through the guaranteed-non-empty finalize node.
    FinalizeResponse,
    /// Clean model-driven stop.
    End,
}

/// Router inputs derived from the per-turn configuration.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// Whether tool dispatch is allowed at all.
    pub use_tools: bool,
    /// Hard ceiling on tool calls per turn.
    pub max_tool_calls: usize,
}

impl From<&TurnConfig> for RouterConfig {
    fn from(config: &TurnConfig) -> Self {
        Self {
            use_tools: config.use_tools,
            max_tool_calls: config.max_tool_calls,
        }
    }
}

/// Decide the next node after a model response.
///
/// Pure and side-effect-free:
/// 1. no trailing AI message, tools disabled, or no tool calls requested →
///    [`NextNode::End`];
/// 2. ceiling reached → [`NextNode::FinalizeResponse`] (never `End` directly,
///    so the closing message is guaranteed non-empty);
/// 3. guard detects a non-productive loop → [`NextNode::FinalizeResponse`];
/// 4. otherwise → [`NextNode::ExecuteTools`].
pub fn should_continue(
    state: &ConversationState,
    config: &RouterConfig,
    guard: &ToolLoopGuard,
) -> NextNode {
    let Some(last) = state.last_message() else {
        return NextNode::End;
    };
    if !config.use_tools || !last.is_ai() || last.tool_calls().is_empty() {
        return NextNode::End;
    }

    if state.tool_call_count >= config.max_tool_calls {
        return NextNode::FinalizeResponse;
    }

    if guard.assess(state) == GuardVerdict::FinalizeNow {
        return NextNode::FinalizeResponse;
    }

    NextNode::ExecuteTools
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{Message, ToolCall};
    use serde_json::json;

    fn config(use_tools: bool, max_tool_calls: usize) -> RouterConfig {
        RouterConfig {
            use_tools,
            max_tool_calls,
        }
    }

    fn guard() -> ToolLoopGuard {
        ToolLoopGuard::default()
    }

    fn ai_requesting(name: &str, id: &str) -> Message {
        Message::ai_with_tool_calls("", vec![ToolCall::new(id, name, json!({}))])
    }

    #[test]
    fn empty_state_ends() {
        let state = ConversationState::new();
        assert_eq!(
            should_continue(&state, &config(true, 10), &guard()),
            NextNode::End
        );
    }

    #[test]
    fn plain_ai_answer_ends() {
        let mut state = ConversationState::new();
        state.push(Message::human("q"));
        state.push(Message::ai("answer"));
        assert_eq!(
            should_continue(&state, &config(true, 10), &guard()),
            NextNode::End
        );
    }

    #[test]
    fn tool_request_with_tools_disabled_ends() {
        let mut state = ConversationState::new();
        state.push(ai_requesting("search", "tc-1"));
        assert_eq!(
            should_continue(&state, &config(false, 10), &guard()),
            NextNode::End
        );
    }

    #[test]
    fn tool_request_below_ceiling_executes() {
        let mut state = ConversationState::new();
        state.push(Message::human("q"));
        state.push(ai_requesting("search", "tc-1"));
        assert_eq!(
            should_continue(&state, &config(true, 10), &guard()),
            NextNode::ExecuteTools
        );
    }

    #[test]
    fn ceiling_forces_finalize_not_end() {
        let mut state = ConversationState::new();
        state.push(Message::human("q"));
        for i in 0..3 {
            let id = format!("tc-{i}");
            state.push(ai_requesting("search", &id));
            state.push(Message::tool(format!("result {i}"), &id));
        }
        state.push(ai_requesting("search", "tc-3"));
        assert_eq!(state.tool_call_count, 3);
        assert_eq!(
            should_continue(&state, &config(true, 3), &guard()),
            NextNode::FinalizeResponse
        );
    }

    #[test]
    fn zero_ceiling_finalizes_on_first_request() {
        let mut state = ConversationState::new();
        state.push(Message::human("q"));
        state.push(ai_requesting("search", "tc-1"));
        assert_eq!(
            should_continue(&state, &config(true, 0), &guard()),
            NextNode::FinalizeResponse
        );
    }

    #[test]
    fn guard_verdict_overrides_execute_tools() {
        let mut state = ConversationState::new();
        state.push(Message::human("what time is it"));
        for i in 0..2 {
            let id = format!("tc-{i}");
            state.push(ai_requesting("get_time", &id));
            state.push(Message::tool("2024-06-01T10:00:00Z", &id));
        }
        state.push(ai_requesting("get_time", "tc-2"));
        // Ceiling not reached, but the clock-tool guard fires.
        assert_eq!(
            should_continue(&state, &config(true, 10), &guard()),
            NextNode::FinalizeResponse
        );
    }
}
