//! Conversation history.

use crate::client::ChatClient;
use crate::message::{ChatMessage, ChatRole};
use crate::{Error, Result, TRACING_TARGET_CLIENT};

/// A running conversation with a chat provider.
///
/// Each request carries the system prompt, the full history and the new user
/// message. Turns are recorded only after the provider answers, so a failed
/// request leaves the history unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    system_prompt: Option<String>,
    history: Vec<ChatMessage>,
}

impl Conversation {
    /// Creates a conversation framed by `system_prompt`.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            system_prompt: (!system_prompt.trim().is_empty()).then_some(system_prompt),
            history: Vec::new(),
        }
    }

    /// Returns the system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Returns the recorded user and assistant messages.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Returns the number of recorded messages.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns whether no turn has been recorded.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Forgets all recorded turns, keeping the system prompt.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Returns the last assistant reply.
    pub fn last_reply(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::Assistant)
            .map(|message| message.content.as_str())
    }

    /// Returns the messages a request for `user_message` would carry.
    pub fn request_messages(&self, user_message: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(system_prompt) = &self.system_prompt {
            messages.push(ChatMessage::system(system_prompt.as_str()));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(user_message));
        messages
    }

    /// Sends `user_message` with the conversation so far and records the turn.
    pub async fn ask(&mut self, client: &ChatClient, user_message: &str) -> Result<String> {
        if user_message.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }

        let messages = self.request_messages(user_message);
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            provider = %client.provider(),
            context_messages = messages.len(),
            "asking chat provider"
        );

        let reply = client.send(&messages).await?;
        self.history.push(ChatMessage::user(user_message));
        self.history.push(ChatMessage::assistant(reply.as_str()));
        Ok(reply)
    }
}
