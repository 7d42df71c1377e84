//! Property-based tests for the state machine
//!
//! Event sequences are driven the way the runtime drives them: every
//! `IssueRedirect` effect is answered with `RedirectIssued` or
//! `RedirectFailed` before the next external event.

use super::state::*;
use super::transition::*;
use super::*;
use crate::completion::CompletionEvent;
use crate::config::{CallConfig, FirstSpeaker, TransferMechanism, TransferMode, TransferTarget};
use crate::tools::{CallTransferInput, ToolCall, ToolInput};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context(mode: TransferMode, mechanism: TransferMechanism) -> CallContext {
    let transfer_target = mode.offers_transfer().then(|| match mechanism {
        TransferMechanism::Dial => TransferTarget::Dial {
            number: "+15551234567".to_string(),
            caller_id: None,
            carrier: None,
        },
        TransferMechanism::Refer => TransferTarget::Refer {
            address: "sip:desk@example.com".to_string(),
        },
    });

    CallContext::new(
        "prop-call",
        CallConfig {
            transfer_mode: mode,
            transfer_mechanism: mechanism,
            transfer_target,
            prompt: "Be helpful.".to_string(),
            api_key: "key".to_string(),
            voice: "Mark".to_string(),
            first_speaker: FirstSpeaker::Agent,
        },
    )
}

/// Everything observable from one simulated call
#[derive(Debug, Default)]
struct Trace {
    redirects: usize,
    confirm_hooks_armed: usize,
    effects_after_close: usize,
    final_state: CallState,
}

fn drive(context: &CallContext, events: Vec<Event>, redirects_succeed: bool) -> Trace {
    let mut trace = Trace::default();
    let mut state = CallState::Idle;

    for event in events {
        let mut pending = vec![event];
        while let Some(current) = pending.pop() {
            let was_closed = state.is_terminal();
            let Ok(result) = transition(&state, context, current) else {
                continue;
            };
            if was_closed {
                trace.effects_after_close += result.effects.len();
            }
            for effect in &result.effects {
                if let Effect::IssueRedirect {
                    tool_call_id,
                    command,
                } = effect
                {
                    trace.redirects += 1;
                    if command.confirm_hook().is_some() {
                        trace.confirm_hooks_armed += 1;
                    }
                    pending.push(if redirects_succeed {
                        Event::RedirectIssued {
                            tool_call_id: tool_call_id.clone(),
                        }
                    } else {
                        Event::RedirectFailed {
                            tool_call_id: tool_call_id.clone(),
                            message: "send failed".to_string(),
                        }
                    });
                }
            }
            state = result.new_state;
        }
    }

    trace.final_state = state;
    trace
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_mode() -> impl Strategy<Value = TransferMode> {
    prop_oneof![
        Just(TransferMode::None),
        Just(TransferMode::Cold),
        Just(TransferMode::Warm),
    ]
}

fn arb_mechanism() -> impl Strategy<Value = TransferMechanism> {
    prop_oneof![Just(TransferMechanism::Dial), Just(TransferMechanism::Refer)]
}

fn arb_tool_input() -> impl Strategy<Value = ToolInput> {
    prop_oneof![
        3 => "[a-zA-Z ]{1,40}".prop_map(|conversation_summary| {
            ToolInput::CallTransfer(CallTransferInput { conversation_summary })
        }),
        1 => "[a-z]{3,10}".prop_map(|name| ToolInput::Unknown {
            name,
            input: json!({}),
        }),
    ]
}

fn arb_tool_event() -> impl Strategy<Value = Event> {
    ("[a-z]{8}", arb_tool_input()).prop_map(|(id, input)| Event::ToolInvocation {
        tool: ToolCall::new(id, input),
    })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => arb_tool_event(),
        2 => "[a-z]{4}".prop_map(|msgid| Event::Confirmation { msgid }),
        2 => "[a-z]{4}".prop_map(|msgid| Event::DialOutcome {
            msgid,
            payload: json!({}),
        }),
        2 => prop_oneof![Just(None), Just(Some("server failure".to_string()))].prop_map(
            |completion_reason| Event::Completion {
                msgid: "done".to_string(),
                completion: CompletionEvent {
                    completion_reason,
                    error: None,
                },
            }
        ),
        2 => prop_oneof![Just("transcript"), Just("state")].prop_map(|kind| {
            Event::ConversationEvent {
                kind: Some(kind.to_string()),
                payload: json!({}),
            }
        }),
        1 => (proptest::option::of(1000u16..4999), "[a-z ]{0,10}")
            .prop_map(|(code, reason)| Event::SessionClosed { code, reason }),
        1 => "[a-z ]{1,10}".prop_map(|message| Event::SessionError { message }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// At most one redirect is ever issued per call
    #[test]
    fn prop_at_most_one_redirect(
        mode in arb_mode(),
        mechanism in arb_mechanism(),
        events in proptest::collection::vec(arb_event(), 0..30),
    ) {
        let trace = drive(&test_context(mode, mechanism), events, true);
        prop_assert!(trace.redirects <= 1);
    }

    /// A call configured without transfer never issues a redirect
    #[test]
    fn prop_no_redirect_without_transfer(
        mechanism in arb_mechanism(),
        events in proptest::collection::vec(arb_event(), 0..30),
    ) {
        let trace = drive(&test_context(TransferMode::None, mechanism), events, true);
        prop_assert_eq!(trace.redirects, 0);
    }

    /// Only warm transfers over dial arm the confirmation hook
    #[test]
    fn prop_confirmation_only_for_warm_dial(
        mode in arb_mode(),
        mechanism in arb_mechanism(),
        events in proptest::collection::vec(arb_event(), 0..30),
    ) {
        let trace = drive(&test_context(mode, mechanism), events, true);
        if mode != TransferMode::Warm || mechanism != TransferMechanism::Dial {
            prop_assert_eq!(trace.confirm_hooks_armed, 0);
        }
    }

    /// Nothing is produced once the session is closed
    #[test]
    fn prop_closed_is_silent(
        mode in arb_mode(),
        mechanism in arb_mechanism(),
        events in proptest::collection::vec(arb_event(), 0..30),
    ) {
        let trace = drive(&test_context(mode, mechanism), events, true);
        prop_assert_eq!(trace.effects_after_close, 0);
    }

    /// A failed redirect leaves the call idle with no summary held
    #[test]
    fn prop_failed_redirect_stays_idle(
        mode in prop_oneof![Just(TransferMode::Cold), Just(TransferMode::Warm)],
        mechanism in arb_mechanism(),
        events in proptest::collection::vec(arb_tool_event(), 1..10),
    ) {
        let trace = drive(&test_context(mode, mechanism), events, false);
        prop_assert_eq!(trace.final_state, CallState::Idle);
    }

    /// Each accepted tool invocation gets exactly one tool result
    #[test]
    fn prop_tool_invocation_answered_once(
        mode in arb_mode(),
        mechanism in arb_mechanism(),
        tool in arb_tool_event(),
        redirects_succeed in any::<bool>(),
    ) {
        let ctx = test_context(mode, mechanism);
        let mut state = CallState::Idle;
        let mut results = 0;
        let mut pending = vec![tool];

        while let Some(event) = pending.pop() {
            let result = transition(&state, &ctx, event).unwrap();
            for effect in result.effects {
                match effect {
                    Effect::SendToolResult { .. } => results += 1,
                    Effect::IssueRedirect { tool_call_id, .. } => pending.push(if redirects_succeed {
                        Event::RedirectIssued { tool_call_id }
                    } else {
                        Event::RedirectFailed { tool_call_id, message: "x".to_string() }
                    }),
                    _ => {}
                }
            }
            state = result.new_state;
        }

        prop_assert_eq!(results, 1);
    }

    /// The stored summary is the one from the accepted invocation
    #[test]
    fn prop_summary_held_while_transferring(
        mechanism in arb_mechanism(),
        summary in "[a-zA-Z ]{1,40}",
    ) {
        let ctx = test_context(TransferMode::Cold, mechanism);
        let tool = Event::ToolInvocation {
            tool: ToolCall::new(
                "t1",
                ToolInput::CallTransfer(CallTransferInput { conversation_summary: summary.clone() }),
            ),
        };
        let trace = drive(&ctx, vec![tool], true);
        prop_assert_eq!(trace.final_state.summary(), Some(summary.as_str()));
    }
}
