//! Provider request bodies and reply extraction.
//!
//! Everything here is pure so that the wire shapes can be checked without a
//! network.

use serde::Serialize;
use serde_json::Value;

use crate::message::{ChatMessage, ChatRole};
use crate::provider::ChatProvider;

/// Longest raw error body kept in a summary.
const MAX_ERROR_BODY: usize = 200;

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<RoleContent<'a>>,
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RoleContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct RoleContent<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiInstruction>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiInstruction {
    parts: [GeminiOwnedPart; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiOwnedPart {
    text: String,
}

/// Builds the JSON request body for `provider`.
///
/// Claude and Gemini take system instructions outside the message list;
/// multiple system messages are joined with a blank line. `max_tokens` is
/// only sent where the provider requires it.
pub fn encode_request(
    provider: ChatProvider,
    model: &str,
    messages: &[ChatMessage],
    max_tokens: u32,
) -> Value {
    let body = match provider {
        ChatProvider::OpenAi => serde_json::to_value(OpenAiRequest {
            model,
            messages: messages
                .iter()
                .map(|m| RoleContent {
                    role: m.role.as_ref(),
                    content: &m.content,
                })
                .collect(),
        }),
        ChatProvider::Claude => serde_json::to_value(ClaudeRequest {
            model,
            max_tokens,
            messages: conversation_turns(messages)
                .map(|m| RoleContent {
                    role: m.role.as_ref(),
                    content: &m.content,
                })
                .collect(),
            system: system_text(messages),
        }),
        ChatProvider::Gemini => serde_json::to_value(GeminiRequest {
            contents: conversation_turns(messages)
                .map(|m| GeminiContent {
                    role: match m.role {
                        ChatRole::Assistant => "model",
                        _ => "user",
                    },
                    parts: [GeminiPart { text: &m.content }],
                })
                .collect(),
            system_instruction: system_text(messages).map(|text| GeminiInstruction {
                parts: [GeminiOwnedPart { text }],
            }),
        }),
    };

    // Plain structs of strings always serialize.
    body.unwrap_or(Value::Null)
}

/// Extracts the first text reply from a provider response.
pub fn decode_reply(provider: ChatProvider, response: &Value) -> Option<String> {
    let pointer = match provider {
        ChatProvider::OpenAi => "/choices/0/message/content",
        ChatProvider::Claude => "/content/0/text",
        ChatProvider::Gemini => "/candidates/0/content/parts/0/text",
    };

    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Summarises a provider error body for display.
///
/// Uses `error.message` or a string `error` when the body is JSON, otherwise
/// the body truncated to 200 characters.
pub fn summarize_error(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body)
        && let Some(error) = value.get("error")
    {
        let message = match error {
            Value::Object(error) => error.get("message").and_then(Value::as_str),
            Value::String(message) => Some(message.as_str()),
            _ => None,
        };
        if let Some(message) = message {
            return message.to_owned();
        }
    }

    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_owned(),
    }
}

fn conversation_turns(messages: &[ChatMessage]) -> impl Iterator<Item = &ChatMessage> {
    messages.iter().filter(|m| m.role != ChatRole::System)
}

fn system_text(messages: &[ChatMessage]) -> Option<String> {
    let parts: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == ChatRole::System && !m.content.is_empty())
        .map(|m| m.content.as_str())
        .collect();

    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
            ChatMessage::user("make a workflow"),
        ]
    }

    #[test]
    fn test_encode_openai() {
        let body = encode_request(ChatProvider::OpenAi, "gpt-4o", &conversation(), 4096);
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "make a workflow"}
                ]
            })
        );
    }

    #[test]
    fn test_encode_claude_hoists_system() {
        let body = encode_request(ChatProvider::Claude, "claude-x", &conversation(), 4096);
        assert_eq!(body["system"], "be brief");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(body["messages"][0], json!({"role": "user", "content": "hi"}));

        let body = encode_request(ChatProvider::Claude, "claude-x", &[ChatMessage::user("x")], 10);
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_encode_gemini_roles() {
        let body = encode_request(ChatProvider::Gemini, "gemini-2.0-flash", &conversation(), 0);
        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]},
                    {"role": "user", "parts": [{"text": "make a workflow"}]}
                ],
                "systemInstruction": {"parts": [{"text": "be brief"}]}
            })
        );
    }

    #[test]
    fn test_multiple_system_messages_are_joined() {
        let messages = [
            ChatMessage::system("one"),
            ChatMessage::system("two"),
            ChatMessage::user("go"),
        ];
        let body = encode_request(ChatProvider::Claude, "m", &messages, 1);
        assert_eq!(body["system"], "one\n\ntwo");
    }

    #[test]
    fn test_decode_reply() {
        let openai = json!({"choices": [{"message": {"role": "assistant", "content": "a"}}]});
        assert_eq!(decode_reply(ChatProvider::OpenAi, &openai).as_deref(), Some("a"));

        let claude = json!({"content": [{"type": "text", "text": "b"}]});
        assert_eq!(decode_reply(ChatProvider::Claude, &claude).as_deref(), Some("b"));

        let gemini = json!({"candidates": [{"content": {"parts": [{"text": "c"}]}}]});
        assert_eq!(decode_reply(ChatProvider::Gemini, &gemini).as_deref(), Some("c"));

        assert_eq!(decode_reply(ChatProvider::OpenAi, &json!({"choices": []})), None);
        assert_eq!(decode_reply(ChatProvider::Claude, &openai), None);
    }

    #[test]
    fn test_summarize_error() {
        assert_eq!(
            summarize_error(r#"{"error": {"message": "invalid key", "type": "auth"}}"#),
            "invalid key"
        );
        assert_eq!(summarize_error(r#"{"error": "quota"}"#), "quota");
        assert_eq!(summarize_error("bad gateway"), "bad gateway");

        let long = "x".repeat(250);
        let summary = summarize_error(&long);
        assert_eq!(summary.len(), 203);
        assert!(summary.ends_with("..."));
    }
}
