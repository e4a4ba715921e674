use std::fmt::Write;

use crate::tools::ToolContext;

pub const SYSTEM_PROMPT: &str = r#"You are a travel assistant chatbot for a travel booking platform. Your role is to help users with:

1. Flight bookings and inquiries
2. Hotel reservations and recommendations
3. Travel planning and itinerary suggestions
4. Travel-related questions and advice
5. General travel information

IMPORTANT LANGUAGE RULE:
- ALWAYS respond in the same language as the user's message
- If user writes in Chinese (中文), respond in Chinese
- If user writes in English, respond in English
- If user writes in other languages, respond in that language
- Maintain natural, native-level fluency in the chosen language

IMPORTANT RESTRICTIONS:
- Only respond to travel-related queries
- If asked about non-travel topics, politely redirect the conversation back to travel
- Do not provide information about politics, personal relationships, medical advice, or other unrelated topics
- Keep responses helpful, friendly, and focused on travel assistance

Language-specific redirect messages:
- English: "I'm a travel assistant and can only help with travel-related questions. How can I assist you with your travel plans today?"
- Chinese: "我是旅行助手，只能帮助解答旅行相关的问题。请问今天我可以如何协助您的旅行计划呢？"
- Use appropriate redirect message based on user's language"#;

const TOOL_GUIDANCE: &str = r#"TOOL USAGE:
- Use the available search tools for concrete flight or hotel questions instead of guessing availability or prices
- City names are accepted where airport codes are expected; if a tool reports it could not resolve a location, ask the user to pick one of the suggested airports
- Convert relative dates ("next Friday", "in two weeks") to YYYY-MM-DD using the current date below
- You may put brief planning notes inside <thinking></thinking> tags before your answer; the first line is shown as a title"#;

/// Base prompt plus the request's date context and, when any tools are registered, tool guidance
pub fn build_system_prompt(ctx: &ToolContext, tool_names: &[&str]) -> String {
    let local = ctx.now.with_timezone(&ctx.timezone);
    let mut prompt = String::from(SYSTEM_PROMPT);
    if !tool_names.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(TOOL_GUIDANCE);
        let _ = write!(prompt, "\n- Available tools: {}", tool_names.join(", "));
    }
    let _ = write!(
        prompt,
        "\n\nCURRENT CONTEXT:\n- Current date: {} ({})\n- Current time: {}\n- User timezone: {}",
        local.format("%Y-%m-%d"),
        local.format("%A"),
        local.format("%H:%M"),
        ctx.timezone.name(),
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn ctx() -> ToolContext {
        ToolContext {
            timezone: chrono_tz::Asia::Shanghai,
            now: DateTime::parse_from_rfc3339("2026-06-15T18:30:00Z")
                .expect("valid")
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn includes_local_date_and_zone() {
        let prompt = build_system_prompt(&ctx(), &["datetimeCalculator"]);
        assert!(prompt.starts_with("You are a travel assistant chatbot"));
        assert!(prompt.contains("- Current date: 2026-06-16 (Tuesday)"));
        assert!(prompt.contains("- Current time: 02:30"));
        assert!(prompt.contains("- User timezone: Asia/Shanghai"));
        assert!(prompt.contains("Available tools: datetimeCalculator"));
    }

    #[test]
    fn no_tool_section_without_tools() {
        let prompt = build_system_prompt(&ctx(), &[]);
        assert!(!prompt.contains("TOOL USAGE"));
        assert!(prompt.contains("我是旅行助手"));
    }
}
