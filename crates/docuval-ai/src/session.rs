//! The bounded tool-calling session.
//!
//! A `Session` owns the conversation, dispatches requested tool invocations
//! against its registry, and loops with the decision-maker until a final
//! answer arrives or the iteration budget runs out.

use std::sync::atomic::{AtomicBool, Ordering};

use docuval_common::SessionId;
use tracing::{debug, warn};

use crate::registry::ToolRegistry;
use crate::usage::UsageLedger;
use crate::{AiError, DecisionKind, DecisionMaker, Message, ToolCall};

/// Guard that clears the `busy` flag on drop, ensuring it is always released
/// even if the future is cancelled or an early return occurs.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    /// Attempt to acquire the busy lock. Returns `Err` if already busy.
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AiError> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(AiError::ApiError(
                "Session is busy with another request".into(),
            ));
        }
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the decision-maker's next move.
    AwaitingDecision,
    /// Executing the tool invocations of the current round.
    ExecutingTools,
    /// Terminal: a final answer was produced.
    Done,
    /// Terminal: the iteration budget ran out without a final answer.
    BudgetExhausted,
}

/// How the session ended. Callers must distinguish the two: budget
/// exhaustion is an explicit no-conclusion signal, never an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed { answer: String, rounds: u32 },
    BudgetExhausted { rounds: u32 },
}

/// A validation conversation with its tool registry and round budget.
pub struct Session {
    /// Correlates log lines across rounds.
    id: SessionId,
    /// Conversation message history, append-only.
    messages: Vec<Message>,
    /// Fixed tool registry for this session.
    registry: ToolRegistry,
    /// Token usage ledger.
    ledger: UsageLedger,
    /// Maximum decision rounds before giving up.
    max_rounds: u32,
    /// Model name used for usage attribution.
    model: String,
    /// Current state machine position.
    state: SessionState,
    /// Whether the session is currently processing a run.
    busy: AtomicBool,
}

impl Session {
    /// Create a session seeded with one system and one user message.
    pub fn new(
        system_prompt: impl Into<String>,
        document: impl Into<String>,
        registry: ToolRegistry,
    ) -> Self {
        Self {
            id: SessionId::new(),
            messages: vec![Message::system(system_prompt), Message::user(document)],
            registry,
            ledger: UsageLedger::new(),
            max_rounds: 10,
            model: "unknown".into(),
            state: SessionState::AwaitingDecision,
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Drive the decision/execution loop to a terminal state.
    ///
    /// Each round sends the full conversation to the decision-maker. Tool
    /// requests are dispatched against the registry and their results
    /// appended in request order; a final answer terminates the session.
    /// After `max_rounds` rounds without a final answer the session stops
    /// with [`SessionOutcome::BudgetExhausted`].
    pub async fn run(&mut self, client: &dyn DecisionMaker) -> Result<SessionOutcome, AiError> {
        let _guard = BusyGuard::acquire(&self.busy)?;

        for round in 1..=self.max_rounds {
            self.state = SessionState::AwaitingDecision;
            debug!(session = %self.id, round, "requesting decision");

            let decision = client
                .decide(&self.messages, self.registry.definitions())
                .await?;
            self.ledger.record(&self.model, decision.usage);

            match decision.kind {
                DecisionKind::FinalAnswer { content } => {
                    self.messages.push(Message::assistant(content.clone(), Vec::new()));
                    self.state = SessionState::Done;
                    debug!(session = %self.id, round, "final answer received");
                    return Ok(SessionOutcome::Completed {
                        answer: content,
                        rounds: round,
                    });
                }
                DecisionKind::ToolRequests { content, requests } => {
                    self.state = SessionState::ExecutingTools;
                    debug!(
                        session = %self.id,
                        round,
                        count = requests.len(),
                        "executing tool requests"
                    );
                    self.messages
                        .push(Message::assistant(content, requests.clone()));
                    let results = self.execute_requests(&requests);
                    self.messages.extend(results);
                }
            }
        }

        self.state = SessionState::BudgetExhausted;
        warn!(
            session = %self.id,
            rounds = self.max_rounds,
            "round budget exhausted without a final answer"
        );
        Ok(SessionOutcome::BudgetExhausted {
            rounds: self.max_rounds,
        })
    }

    /// Dispatch every request of one round and append the results in
    /// request order. Every request produces exactly one result; dispatch
    /// failures become error content for that invocation only.
    fn execute_requests(&self, requests: &[ToolCall]) -> Vec<Message> {
        requests
            .iter()
            .map(|call| {
                let payload = match self.registry.dispatch(call) {
                    Ok(result) => result.to_payload(),
                    Err(e) => {
                        warn!(session = %self.id, tool = %call.name, "dispatch failed: {e}");
                        e.to_payload()
                    }
                };
                debug!(session = %self.id, tool = %call.name, "tool result ready");
                Message::tool_result(call.id.clone(), call.name.clone(), payload)
            })
            .collect()
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current state machine position.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The full conversation history.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Token usage accumulated so far.
    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CheckResult, ToolRegistry};
    use crate::{
        Decision, DecisionKind, DecisionMaker, Role, TokenUsage, ToolCall, ToolDefinition,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted decision-maker: plays back a fixed list of decisions and
    /// counts how often it was asked.
    struct ScriptedDecider {
        script: Vec<DecisionKind>,
        calls: AtomicU32,
    }

    impl ScriptedDecider {
        fn new(script: Vec<DecisionKind>) -> Self {
            Self {
                script,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DecisionMaker for ScriptedDecider {
        async fn decide(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<Decision, AiError> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let kind = self
                .script
                .get(index)
                .cloned()
                .unwrap_or_else(|| self.script.last().cloned().expect("empty script"));
            Ok(Decision {
                kind,
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
            })
        }
    }

    fn lookup_call(id: &str, value: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: "lookup".into(),
            arguments: json!({ "value": value }),
        }
    }

    fn lookup_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDefinition {
                name: "lookup".into(),
                description: "Checks a value.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": { "value": { "type": "string" } },
                    "required": ["value"]
                }),
            },
            Box::new(|args| {
                let value = crate::registry::require_str(args, "value")?;
                Ok(if value == "known" {
                    CheckResult::ok("value is on file")
                } else {
                    CheckResult::rejected("value is not in the reference set")
                })
            }),
        );
        registry
    }

    fn session(registry: ToolRegistry) -> Session {
        Session::new("You validate documents.", "document text", registry)
            .with_max_rounds(4)
            .with_model("stub")
    }

    #[tokio::test]
    async fn final_answer_on_first_round_completes() {
        let decider = ScriptedDecider::new(vec![DecisionKind::FinalAnswer {
            content: "the invoice is fine".into(),
        }]);
        let mut session = session(lookup_registry());

        let outcome = session.run(&decider).await.unwrap();
        assert_eq!(
            outcome,
            SessionOutcome::Completed {
                answer: "the invoice is fine".into(),
                rounds: 1
            }
        );
        assert_eq!(session.state(), SessionState::Done);
        assert_eq!(decider.calls(), 1);
        // system + user + assistant answer
        assert_eq!(session.messages().len(), 3);
    }

    #[tokio::test]
    async fn always_requesting_tools_exhausts_budget_after_exactly_n_rounds() {
        let decider = ScriptedDecider::new(vec![DecisionKind::ToolRequests {
            content: String::new(),
            requests: vec![lookup_call("call_1", "known")],
        }]);
        let mut session = session(lookup_registry());

        let outcome = session.run(&decider).await.unwrap();
        assert_eq!(outcome, SessionOutcome::BudgetExhausted { rounds: 4 });
        assert_eq!(session.state(), SessionState::BudgetExhausted);
        // Never a round N+1
        assert_eq!(decider.calls(), 4);
    }

    #[tokio::test]
    async fn two_requests_produce_two_results_in_request_order() {
        let decider = ScriptedDecider::new(vec![
            DecisionKind::ToolRequests {
                content: String::new(),
                requests: vec![
                    lookup_call("call_a", "known"),
                    lookup_call("call_b", "unknown"),
                ],
            },
            DecisionKind::FinalAnswer {
                content: "done".into(),
            },
        ]);
        let mut session = session(lookup_registry());

        session.run(&decider).await.unwrap();

        let tool_results: Vec<&Message> = session
            .messages()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_results.len(), 2);
        assert_eq!(tool_results[0].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(tool_results[1].tool_call_id.as_deref(), Some("call_b"));
        assert!(tool_results[0].content.contains("\"valid\":true"));
        assert!(tool_results[1].content.contains("\"valid\":false"));
    }

    #[tokio::test]
    async fn unknown_function_yields_error_result_and_continues() {
        let decider = ScriptedDecider::new(vec![
            DecisionKind::ToolRequests {
                content: String::new(),
                requests: vec![ToolCall {
                    id: "call_x".into(),
                    name: "frobnicate".into(),
                    arguments: json!({}),
                }],
            },
            DecisionKind::FinalAnswer {
                content: "recovered".into(),
            },
        ]);
        let mut session = session(lookup_registry());

        let outcome = session.run(&decider).await.unwrap();
        assert_eq!(
            outcome,
            SessionOutcome::Completed {
                answer: "recovered".into(),
                rounds: 2
            }
        );

        let error_result = session
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(error_result.content.contains("error"));
        assert!(error_result.content.contains("unknown function"));
    }

    #[tokio::test]
    async fn malformed_arguments_yield_error_result_and_continue() {
        let decider = ScriptedDecider::new(vec![
            DecisionKind::ToolRequests {
                content: String::new(),
                requests: vec![ToolCall {
                    id: "call_y".into(),
                    name: "lookup".into(),
                    arguments: json!({ "wrong_key": 1 }),
                }],
            },
            DecisionKind::FinalAnswer {
                content: "ok".into(),
            },
        ]);
        let mut session = session(lookup_registry());

        let outcome = session.run(&decider).await.unwrap();
        assert!(matches!(outcome, SessionOutcome::Completed { .. }));

        let error_result = session
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(error_result.content.contains("missing required field"));
    }

    #[tokio::test]
    async fn conversation_grows_monotonically_and_keeps_request_ids() {
        let decider = ScriptedDecider::new(vec![
            DecisionKind::ToolRequests {
                content: "checking".into(),
                requests: vec![lookup_call("call_1", "known")],
            },
            DecisionKind::FinalAnswer {
                content: "all good".into(),
            },
        ]);
        let mut session = session(lookup_registry());
        session.run(&decider).await.unwrap();

        // system, user, assistant(with request), tool result, assistant answer
        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Tool,
                Role::Assistant
            ]
        );
        assert_eq!(session.messages()[2].tool_calls.len(), 1);
        assert_eq!(
            session.messages()[3].tool_call_id.as_deref(),
            Some("call_1")
        );
    }

    #[tokio::test]
    async fn usage_is_recorded_per_round() {
        let decider = ScriptedDecider::new(vec![
            DecisionKind::ToolRequests {
                content: String::new(),
                requests: vec![lookup_call("call_1", "known")],
            },
            DecisionKind::FinalAnswer {
                content: "done".into(),
            },
        ]);
        let mut session = session(lookup_registry());
        session.run(&decider).await.unwrap();

        assert_eq!(session.ledger().call_count(), 2);
        assert_eq!(session.ledger().total().input_tokens, 20);
        assert!(session.ledger().for_model("stub").is_some());
    }
}
