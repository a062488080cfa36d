use crate::error::{Error, Result};
use crate::session::{self, Backend, Options};
use candid::CandidType;
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant. Respond using one sentence";

#[derive(
    CandidType, Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, PartialEq, Serialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

#[derive(CandidType, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<|start_header_id|>{}<|end_header_id|>{}<|eot_id|>",
            self.role, self.content
        )
    }
}

/// Parses `role:content`, e.g. `user:Where is Poland?`.
impl FromStr for ChatMessage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (role, content) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidArgument(format!("expected role:content, got {:?}", s)))?;

        let role = Role::from_str(role.trim())
            .map_err(|_| Error::InvalidArgument(format!("unknown role {:?}", role)))?;

        Ok(Self::new(role, content))
    }
}

/// Renders `messages` in the Llama 3 chat template, leaving the assistant
/// header open for the reply.
pub fn chat_prompt(messages: &[ChatMessage]) -> String {
    let messages = messages
        .iter()
        .map(ChatMessage::to_string)
        .collect::<String>();

    format!("<|begin_of_text|>{messages}<|start_header_id|>assistant<|end_header_id|>")
}

pub async fn chat<B, F>(
    backend: &B,
    messages: &[ChatMessage],
    options: Options,
    on_text: F,
) -> Result<String>
where
    B: Backend + ?Sized,
    F: FnMut(&str),
{
    let prompt = chat_prompt(messages);
    trace!("prompt: {}", prompt);

    session::generate(backend, &prompt, options, on_text).await
}

/// Asks a single question under the default system prompt.
pub async fn prompt<B, F>(
    backend: &B,
    question: &str,
    options: Options,
    on_text: F,
) -> Result<String>
where
    B: Backend + ?Sized,
    F: FnMut(&str),
{
    let messages = [
        ChatMessage::new(Role::System, SYSTEM_PROMPT),
        ChatMessage::new(Role::User, question),
    ];

    chat(backend, &messages, options, on_text).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_template() {
        let message = ChatMessage::new(Role::User, "Where is Poland?");
        assert_eq!(
            message.to_string(),
            "<|start_header_id|>user<|end_header_id|>Where is Poland?<|eot_id|>"
        )
    }

    #[test]
    fn test_chat_prompt_template() {
        let messages = [
            ChatMessage::new(Role::System, SYSTEM_PROMPT),
            ChatMessage::new(Role::User, "Where is Poland?"),
        ];
        assert_eq!(
            chat_prompt(&messages),
            "<|begin_of_text|>\
             <|start_header_id|>system<|end_header_id|>\
             You are a helpful assistant. Respond using one sentence<|eot_id|>\
             <|start_header_id|>user<|end_header_id|>Where is Poland?<|eot_id|>\
             <|start_header_id|>assistant<|end_header_id|>"
        )
    }

    #[test]
    fn test_chat_prompt_without_messages() {
        assert_eq!(
            chat_prompt(&[]),
            "<|begin_of_text|><|start_header_id|>assistant<|end_header_id|>"
        )
    }

    #[test]
    fn test_parse_chat_message() {
        assert_eq!(
            "assistant:Warsaw: the capital".parse::<ChatMessage>().unwrap(),
            ChatMessage::new(Role::Assistant, "Warsaw: the capital")
        );
        assert!(matches!(
            "narrator:hello".parse::<ChatMessage>(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            "hello".parse::<ChatMessage>(),
            Err(Error::InvalidArgument(_))
        ));
    }
}
