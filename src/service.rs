use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::LlmConfig;
use crate::conversation::{extract_thinking, tool_loading_label};
use crate::error::{Result, TravelAssistantError};
use crate::models::{ChatMessage, ChatRequest, ChatResponse, ToolCall, Usage};
use crate::system_prompt::build_system_prompt;
use crate::tools::{ToolContext, ToolRegistry, failure};
use crate::transport::Transport;

const EVENT_BUFFER: usize = 64;
const TEXT_CHUNK_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCallState {
    Pending,
    Executing,
    OutputAvailable,
}

/// Events streamed to the client, one JSON object per SSE message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ChatEvent {
    Start {
        message_id: String,
    },
    Thinking {
        title: String,
        details: String,
    },
    TextDelta {
        delta: String,
    },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        state: ToolCallState,
        label: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        input: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
    },
    Error {
        error: String,
        error_type: &'static str,
    },
    Finish {
        finish_reason: String,
        usage: Usage,
    },
}

/// Drives the model/tool loop for one chat request
pub struct ChatService {
    transport: Arc<dyn Transport>,
    tools: ToolRegistry,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_tool_rounds: usize,
}

impl ChatService {
    pub fn new(transport: Arc<dyn Transport>, tools: ToolRegistry, llm: &LlmConfig) -> Self {
        Self {
            transport,
            tools,
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            max_tool_rounds: llm.max_tool_rounds,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    fn request(&self, messages: &[ChatMessage], with_tools: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: if with_tools {
                self.tools.definitions()
            } else {
                Vec::new()
            },
        }
    }

    /// Makes the first model call before returning, so connection and auth failures
    /// reach the caller as errors; everything after that is reported in-stream.
    pub async fn stream(
        self: Arc<Self>,
        history: Vec<ChatMessage>,
        ctx: ToolContext,
    ) -> Result<ReceiverStream<ChatEvent>> {
        if history.is_empty() {
            return Err(TravelAssistantError::Validation(
                "messages must not be empty".to_string(),
            ));
        }

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(build_system_prompt(
            &ctx,
            &self.tools.names(),
        )));
        messages.extend(history);

        let with_tools = !self.tools.is_empty() && self.max_tool_rounds > 0;
        let first = self
            .transport
            .chat(&self.request(&messages, with_tools))
            .await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(async move {
            let events = Emitter { tx };
            self.run(messages, first, ctx, events).await;
        });
        Ok(ReceiverStream::new(rx))
    }

    async fn run(
        &self,
        mut messages: Vec<ChatMessage>,
        first: ChatResponse,
        ctx: ToolContext,
        events: Emitter,
    ) {
        let message_id = uuid::Uuid::new_v4().to_string();
        if !events.send(ChatEvent::Start { message_id }).await {
            return;
        }

        let mut usage = Usage::default();
        let mut response = first;
        let mut rounds = 0;

        loop {
            if let Some(u) = &response.usage {
                usage.accumulate(u);
            }
            let Some(choice) = response.choices.into_iter().next() else {
                events
                    .error(&TravelAssistantError::Internal(
                        "LLM returned no choices".to_string(),
                    ))
                    .await;
                return;
            };
            let reply = choice.message;

            if reply.tool_calls.is_empty() || rounds >= self.max_tool_rounds {
                if !reply.tool_calls.is_empty() {
                    tracing::warn!(rounds, "Tool round limit reached, ignoring further tool calls");
                }
                let finish_reason = choice.finish_reason.unwrap_or_else(|| "stop".to_string());
                self.finish(reply.content.unwrap_or_default(), finish_reason, usage, &events)
                    .await;
                return;
            }

            rounds += 1;
            tracing::info!(
                round = rounds,
                calls = reply.tool_calls.len(),
                "Model requested tool calls"
            );
            messages.push(ChatMessage::assistant_tool_calls(
                reply.content.clone(),
                reply.tool_calls.clone(),
            ));
            for call in &reply.tool_calls {
                let Some(result) = self.execute_tool(call, &ctx, &events).await else {
                    return;
                };
                messages.push(ChatMessage::tool(
                    &call.id,
                    &call.function.name,
                    result.to_string(),
                ));
            }

            // Once the round budget is spent the model must answer in text
            let with_tools = rounds < self.max_tool_rounds;
            response = match self
                .transport
                .chat(&self.request(&messages, with_tools))
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("LLM call failed mid-stream: {}", e);
                    events.error(&e).await;
                    return;
                }
            };
        }
    }

    /// Runs one tool call, emitting its lifecycle. None when the client went away.
    async fn execute_tool(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
        events: &Emitter,
    ) -> Option<Value> {
        let name = call.function.name.as_str();
        let label = tool_loading_label(name);
        let arguments = if call.function.arguments.trim().is_empty() {
            Ok(Value::Object(Default::default()))
        } else {
            serde_json::from_str::<Value>(&call.function.arguments)
        };

        let lifecycle = |state, input: Option<Value>, output: Option<Value>| ChatEvent::ToolCall {
            tool_call_id: call.id.clone(),
            tool_name: name.to_string(),
            state,
            label,
            input,
            output,
        };

        if !events
            .send(lifecycle(ToolCallState::Pending, arguments.as_ref().ok().cloned(), None))
            .await
        {
            return None;
        }
        if !events
            .send(lifecycle(ToolCallState::Executing, None, None))
            .await
        {
            return None;
        }

        let result = match arguments {
            Ok(args) => {
                tracing::info!(tool = name, "Executing tool");
                self.tools.execute(name, args, ctx).await
            }
            Err(e) => {
                tracing::warn!(tool = name, "Model sent malformed tool arguments: {}", e);
                failure(
                    format!("Invalid tool arguments: {e}"),
                    format!("Could not run {name}"),
                )
            }
        };

        if !events
            .send(lifecycle(
                ToolCallState::OutputAvailable,
                None,
                Some(result.clone()),
            ))
            .await
        {
            return None;
        }
        Some(result)
    }

    async fn finish(&self, content: String, finish_reason: String, usage: Usage, events: &Emitter) {
        let reply = extract_thinking(&content);
        if let Some(thinking) = reply.thinking {
            if !events
                .send(ChatEvent::Thinking {
                    title: thinking.title,
                    details: thinking.details,
                })
                .await
            {
                return;
            }
        }
        for delta in text_chunks(&reply.text) {
            if !events.send(ChatEvent::TextDelta { delta }).await {
                return;
            }
        }
        tracing::info!(
            finish_reason = %finish_reason,
            total_tokens = usage.total_tokens,
            "Chat response complete"
        );
        events
            .send(ChatEvent::Finish {
                finish_reason,
                usage,
            })
            .await;
    }
}

fn text_chunks(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(TEXT_CHUNK_CHARS)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

struct Emitter {
    tx: mpsc::Sender<ChatEvent>,
}

impl Emitter {
    /// False once the client has disconnected
    async fn send(&self, event: ChatEvent) -> bool {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("Client disconnected, stopping chat stream");
            return false;
        }
        true
    }

    async fn error(&self, e: &TravelAssistantError) {
        self.send(ChatEvent::Error {
            error: e.to_string(),
            error_type: e.kind(),
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, FunctionCall, Role};
    use crate::tools::DatetimeTool;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio_stream::StreamExt;

    /// Replays canned responses and records every request
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<ChatResponse>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<ChatResponse>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().expect("lock").push(req.clone());
            self.replies
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(TravelAssistantError::Internal("script exhausted".into())))
        }
    }

    fn text_reply(text: &str) -> Result<ChatResponse> {
        Ok(ChatResponse {
            choices: vec![Choice {
                message: ChatMessage::assistant(text),
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }

    fn tool_reply(id: &str, name: &str, arguments: &str) -> Result<ChatResponse> {
        Ok(ChatResponse {
            choices: vec![Choice {
                message: ChatMessage::assistant_tool_calls(
                    None,
                    vec![ToolCall {
                        id: id.to_string(),
                        kind: "function".to_string(),
                        function: FunctionCall {
                            name: name.to_string(),
                            arguments: arguments.to_string(),
                        },
                    }],
                ),
                finish_reason: Some("tool_calls".to_string()),
            }],
            usage: None,
        })
    }

    fn llm(max_tool_rounds: usize) -> LlmConfig {
        LlmConfig {
            max_tool_rounds,
            ..crate::config::Config::default().llm
        }
    }

    fn ctx() -> ToolContext {
        ToolContext {
            timezone: chrono_tz::UTC,
            now: DateTime::parse_from_rfc3339("2026-06-15T14:00:00Z")
                .expect("valid")
                .with_timezone(&Utc),
        }
    }

    async fn collect(service: ChatService) -> Vec<ChatEvent> {
        let stream = Arc::new(service)
            .stream(vec![ChatMessage::user("What's the date?")], ctx())
            .await
            .expect("stream starts");
        stream.collect().await
    }

    #[tokio::test]
    async fn plain_answer_streams_thinking_text_and_finish() {
        let transport = ScriptedTransport::new(vec![text_reply(
            "<thinking>Plan\nanswer directly</thinking>Hello traveler!",
        )]);
        let service = ChatService::new(transport.clone(), ToolRegistry::new(), &llm(3));
        let events = collect(service).await;

        assert!(matches!(events[0], ChatEvent::Start { .. }));
        assert_eq!(
            events[1],
            ChatEvent::Thinking {
                title: "Plan".to_string(),
                details: "answer directly".to_string()
            }
        );
        assert_eq!(
            events[2],
            ChatEvent::TextDelta {
                delta: "Hello traveler!".to_string()
            }
        );
        match &events[3] {
            ChatEvent::Finish { finish_reason, usage } => {
                assert_eq!(finish_reason, "stop");
                assert_eq!(usage.total_tokens, 15);
            }
            other => panic!("expected finish, got {other:?}"),
        }

        let requests = transport.requests();
        assert_eq!(requests[0].messages[0].role, Role::System);
        assert!(requests[0].tools.is_empty());
    }

    #[tokio::test]
    async fn tool_calls_run_with_lifecycle_events() {
        let transport = ScriptedTransport::new(vec![
            tool_reply("call_1", "datetimeCalculator", r#"{"operation":"getCurrentDate"}"#),
            text_reply("Today is 2026-06-15."),
        ]);
        let tools = ToolRegistry::new().with(Arc::new(DatetimeTool));
        let service = ChatService::new(transport.clone(), tools, &llm(3));
        let events = collect(service).await;

        let states: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ChatEvent::ToolCall { state, .. } => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                ToolCallState::Pending,
                ToolCallState::Executing,
                ToolCallState::OutputAvailable
            ]
        );
        let output = events.iter().find_map(|e| match e {
            ChatEvent::ToolCall {
                output: Some(output),
                ..
            } => Some(output.clone()),
            _ => None,
        });
        assert_eq!(output.expect("tool output")["result"], "2026-06-15");

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        let tool_message = requests[1].messages.last().expect("tool message");
        assert_eq!(tool_message.role, Role::Tool);
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn round_limit_forces_text_answer() {
        let transport = ScriptedTransport::new(vec![
            tool_reply("call_1", "datetimeCalculator", r#"{"operation":"getCurrentDate"}"#),
            text_reply("Done."),
        ]);
        let tools = ToolRegistry::new().with(Arc::new(DatetimeTool));
        let service = ChatService::new(transport.clone(), tools, &llm(1));
        let events = collect(service).await;

        assert!(matches!(events.last(), Some(ChatEvent::Finish { .. })));
        let requests = transport.requests();
        assert!(requests[1].tools.is_empty());
    }

    #[tokio::test]
    async fn malformed_arguments_become_a_failed_tool_result() {
        let transport = ScriptedTransport::new(vec![
            tool_reply("call_1", "datetimeCalculator", "{not json"),
            text_reply("Sorry."),
        ]);
        let tools = ToolRegistry::new().with(Arc::new(DatetimeTool));
        let service = ChatService::new(transport, tools, &llm(3));
        let events = collect(service).await;

        let output = events.iter().find_map(|e| match e {
            ChatEvent::ToolCall {
                output: Some(output),
                ..
            } => Some(output.clone()),
            _ => None,
        });
        assert_eq!(output.expect("tool output")["success"], false);
    }

    #[tokio::test]
    async fn first_call_failure_is_returned_not_streamed() {
        let transport = ScriptedTransport::new(vec![Err(TravelAssistantError::Timeout(
            "connect timed out".to_string(),
        ))]);
        let service = Arc::new(ChatService::new(transport, ToolRegistry::new(), &llm(3)));
        let err = service
            .stream(vec![ChatMessage::user("hi")], ctx())
            .await
            .expect_err("must fail");
        assert!(matches!(err, TravelAssistantError::Timeout(_)));
    }

    #[tokio::test]
    async fn empty_history_is_rejected_before_any_llm_call() {
        let mut transport = crate::transport::MockTransport::new();
        transport.expect_chat().times(0);
        let service = Arc::new(ChatService::new(
            Arc::new(transport),
            ToolRegistry::new(),
            &llm(3),
        ));
        let err = service
            .stream(Vec::new(), ctx())
            .await
            .expect_err("must fail");
        assert!(matches!(err, TravelAssistantError::Validation(_)));
    }

    #[tokio::test]
    async fn later_failure_becomes_error_event() {
        let transport = ScriptedTransport::new(vec![
            tool_reply("call_1", "datetimeCalculator", r#"{"operation":"getTimezone"}"#),
            Err(TravelAssistantError::Network("connection reset".to_string())),
        ]);
        let tools = ToolRegistry::new().with(Arc::new(DatetimeTool));
        let service = ChatService::new(transport, tools, &llm(3));
        let events = collect(service).await;

        match events.last() {
            Some(ChatEvent::Error { error_type, .. }) => assert_eq!(*error_type, "NetworkError"),
            other => panic!("expected error event, got {other:?}"),
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = ChatEvent::ToolCall {
            tool_call_id: "c1".to_string(),
            tool_name: "flightSearch".to_string(),
            state: ToolCallState::OutputAvailable,
            label: "Searching for flights...",
            input: None,
            output: Some(serde_json::json!({"success": true})),
        };
        let json = serde_json::to_value(&event).expect("serializes");
        assert_eq!(json["type"], "tool-call");
        assert_eq!(json["toolCallId"], "c1");
        assert_eq!(json["state"], "output-available");
        assert!(json.get("input").is_none());

        let delta = serde_json::to_value(ChatEvent::TextDelta {
            delta: "hi".to_string(),
        })
        .expect("serializes");
        assert_eq!(delta["type"], "text-delta");
    }

    #[test]
    fn long_text_is_chunked_on_char_boundaries() {
        let text = "é".repeat(TEXT_CHUNK_CHARS + 1);
        let chunks = text_chunks(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "é");
    }
}
