//! Client chat history: conversion to model messages, thinking blocks, edit/resend

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TravelAssistantError};
use crate::models::{ChatMessage, Role};
use crate::tools::{cash_flights, reward_flights, reward_hotels};

const TOOL_RESULTS_HEADER: &str = "\n\n[Tool Results for AI Reference]:\n";
const THINKING_OPEN: &str = "<thinking>";
const THINKING_CLOSE: &str = "</thinking>";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiMessagePart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl UiMessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    fn is_tool(&self) -> bool {
        self.kind == "dynamic-tool" || self.kind.starts_with("tool-")
    }

    fn completed_output(&self) -> Option<&Value> {
        if !self.is_tool() || self.state.as_deref() != Some("output-available") {
            return None;
        }
        self.output.as_ref().filter(|o| !o.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<UiMessagePart>,
}

impl UiMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(text.into()),
            parts: Vec::new(),
        }
    }

    /// Plain text: `content` when non-empty, else the concatenated text parts
    pub fn text_content(&self) -> String {
        match self.content.as_deref().filter(|c| !c.is_empty()) {
            Some(content) => content.to_string(),
            None => self
                .parts
                .iter()
                .filter(|p| p.kind == "text")
                .filter_map(|p| p.text.as_deref())
                .collect(),
        }
    }

    /// Model-facing text; assistant turns carry their completed tool outputs along
    fn model_content(&self) -> String {
        let mut content = self.text_content();
        if self.role != Role::Assistant
            || self.content.as_deref().is_some_and(|c| !c.is_empty())
        {
            return content;
        }

        let outputs: Vec<_> = self
            .parts
            .iter()
            .filter_map(|p| p.completed_output().map(|o| (p, o)))
            .collect();
        if outputs.is_empty() {
            return content;
        }

        content.push_str(TOOL_RESULTS_HEADER);
        for (part, output) in outputs {
            let name = part.tool_name.as_deref().unwrap_or(&part.kind);
            let pretty = serde_json::to_string_pretty(output).unwrap_or_else(|_| output.to_string());
            content.push_str(&format!("Tool: {name}\nResults: {pretty}\n\n"));
        }
        content
    }
}

pub fn to_model_messages(messages: &[UiMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|m| ChatMessage::text(m.role, m.model_content()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thinking {
    pub title: String,
    pub details: String,
}

/// Reply text with its thinking block pulled out
#[derive(Debug, Clone, PartialEq)]
pub struct SplitReply {
    pub thinking: Option<Thinking>,
    pub text: String,
}

fn thinking_blocks(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        let open = cursor + text[cursor..].find(THINKING_OPEN)?;
        let inner = open + THINKING_OPEN.len();
        let close = inner + text[inner..].find(THINKING_CLOSE)?;
        cursor = close + THINKING_CLOSE.len();
        Some((open, cursor))
    })
}

/// First `<thinking>` block becomes `{title, details}`; every block is removed from the text
pub fn extract_thinking(text: &str) -> SplitReply {
    let blocks: Vec<_> = thinking_blocks(text).collect();
    let Some(&(first_start, first_end)) = blocks.first() else {
        return SplitReply {
            thinking: None,
            text: text.to_string(),
        };
    };

    let inner = &text[first_start + THINKING_OPEN.len()..first_end - THINKING_CLOSE.len()];
    let lines: Vec<&str> = inner.lines().filter(|l| !l.trim().is_empty()).collect();
    let title = lines
        .first()
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| "Thinking".to_string());
    let details = lines.iter().skip(1).copied().collect::<Vec<_>>().join("\n");

    let mut clean = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in blocks {
        clean.push_str(&text[last..start]);
        last = end;
    }
    clean.push_str(&text[last..]);

    SplitReply {
        thinking: Some(Thinking {
            title,
            details: details.trim().to_string(),
        }),
        text: clean.trim().to_string(),
    }
}

/// Edit/resend: keep history before `index`, replace that user message's text, drop the rest
pub fn apply_edit(mut messages: Vec<UiMessage>, index: usize, text: &str) -> Result<Vec<UiMessage>> {
    let Some(target) = messages.get(index) else {
        return Err(TravelAssistantError::Validation(format!(
            "Cannot edit message {index}: conversation has {} messages",
            messages.len()
        )));
    };
    if target.role != Role::User {
        return Err(TravelAssistantError::Validation(format!(
            "Only user messages can be edited (message {index} is not)"
        )));
    }

    messages.truncate(index);
    messages.push(UiMessage::user(text));
    Ok(messages)
}

/// Status line shown while a tool runs
pub fn tool_loading_label(tool_name: &str) -> &'static str {
    match tool_name {
        reward_flights::NAME => "Searching for reward flights...",
        reward_hotels::NAME => "Searching for reward hotels...",
        cash_flights::NAME => "Searching for flights...",
        _ => "Processing request...",
    }
}
