//! OpenAI implementation of [`GenericLlmClient`], backed by the chat completions API.

use std::{sync::Arc, time::Duration};

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use crate::base::{
    config::Config,
    prompts::{PATIENT_CONTEXT_PREAMBLE, relevance_question},
    types::{AssistantContext, ChatTurn, RelevanceContext, Res, Sender},
};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let mut cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        if let Some(api_base) = &config.openai_api_base {
            cfg = cfg.with_api_base(api_base.clone());
        }

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    /// Build the relevance agent messages.
    #[instrument(name = "OpenAiLlmClient::build_relevance_agent_messages", skip_all)]
    fn build_relevance_agent_messages(&self, context: &RelevanceContext) -> Res<Vec<ChatCompletionRequestMessage>> {
        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.config.relevance_agent_system_directive.clone())
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(relevance_question(&context.candidates, &context.user_message))
                .build()?
                .into(),
        ])
    }

    /// Build the assistant agent messages: directive, optional patient record, history, and the new message.
    #[instrument(name = "OpenAiLlmClient::build_assistant_agent_messages", skip_all)]
    fn build_assistant_agent_messages(&self, context: &AssistantContext) -> Res<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.config.assistant_agent_system_directive.clone())
                .build()?
                .into(),
        ];

        if let Some(patient_context) = context.patient_context.as_deref().filter(|c| !c.is_empty()) {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(format!("{PATIENT_CONTEXT_PREAMBLE}{patient_context}"))
                    .build()?
                    .into(),
            );
        }

        for turn in &context.chat_history {
            messages.push(build_turn_message(turn)?);
        }

        // The client usually echoes the new message as the last history turn.
        let already_sent = context
            .chat_history
            .last()
            .is_some_and(|turn| turn.sender == Sender::User && turn.text == context.user_message);

        if !already_sent {
            messages.push(ChatCompletionRequestUserMessageArgs::default().content(context.user_message.clone()).build()?.into());
        }

        Ok(messages)
    }

    /// Send a chat completion request, bounded by the configured timeout, and return the trimmed text.
    async fn call_openai_api(&self, request: CreateChatCompletionRequest) -> Res<String> {
        let duration = Duration::from_secs(self.config.openai_timeout_secs);

        let response = timeout(duration, self.client.chat().create(request))
            .await
            .map_err(|_| anyhow::anyhow!("OpenAI API call timed out after {} seconds", self.config.openai_timeout_secs))??;

        let Some(choice) = response.choices.into_iter().next() else {
            return Err(anyhow::anyhow!("OpenAI API returned no choices."));
        };

        if let Some(refusal) = choice.message.refusal {
            return Err(anyhow::anyhow!("Request refused: {refusal}"));
        }

        let content = choice.message.content.unwrap_or_default();
        info!("OpenAI API call succeeded with {} characters.", content.len());

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::get_relevance_agent_response", skip_all)]
    async fn get_relevance_agent_response(&self, context: &RelevanceContext) -> Res<String> {
        debug!("Checking relevance against {} candidates", context.candidates.len());

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.openai_model)
            .messages(self.build_relevance_agent_messages(context)?)
            .max_completion_tokens(self.config.openai_relevance_max_tokens)
            .temperature(self.config.openai_relevance_temperature)
            .build()?;

        self.call_openai_api(request).await
    }

    #[instrument(name = "OpenAiLlmClient::get_assistant_agent_response", skip_all)]
    async fn get_assistant_agent_response(&self, context: &AssistantContext) -> Res<String> {
        debug!("Generating reply with {} history turns", context.chat_history.len());

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.openai_model)
            .messages(self.build_assistant_agent_messages(context)?)
            .max_completion_tokens(self.config.openai_assistant_max_tokens)
            .temperature(self.config.openai_assistant_temperature)
            .build()?;

        self.call_openai_api(request).await
    }
}

/// Map a chat turn onto the matching OpenAI role.
fn build_turn_message(turn: &ChatTurn) -> Res<ChatCompletionRequestMessage> {
    let message: ChatCompletionRequestMessage = match turn.sender {
        Sender::Bot => ChatCompletionRequestAssistantMessageArgs::default().content(turn.text.clone()).build()?.into(),
        Sender::User => ChatCompletionRequestUserMessageArgs::default().content(turn.text.clone()).build()?.into(),
    };

    Ok(message)
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{config::ConfigInner, prompts};

    fn create_test_config() -> Config {
        Config {
            inner: Arc::new(ConfigInner {
                openai_api_key: "test_key".to_string(),
                openai_model: "gpt-4o-mini".to_string(),
                openai_relevance_temperature: 0.1,
                openai_relevance_max_tokens: 50,
                openai_assistant_temperature: 1.0,
                openai_assistant_max_tokens: 200,
                openai_timeout_secs: 5,
                assistant_agent_system_directive: prompts::ASSISTANT_AGENT_SYSTEM_DIRECTIVE.to_string(),
                relevance_agent_system_directive: prompts::RELEVANCE_AGENT_SYSTEM_DIRECTIVE.to_string(),
                ..Default::default()
            }),
        }
    }

    fn turn(sender: Sender, text: &str) -> ChatTurn {
        ChatTurn { sender, text: text.to_string() }
    }

    fn roles(messages: &[ChatCompletionRequestMessage]) -> Vec<&'static str> {
        messages
            .iter()
            .map(|m| match m {
                ChatCompletionRequestMessage::System(_) => "system",
                ChatCompletionRequestMessage::User(_) => "user",
                ChatCompletionRequestMessage::Assistant(_) => "assistant",
                _ => "other",
            })
            .collect()
    }

    #[test]
    fn test_relevance_messages_are_system_then_user() {
        let client = OpenAiLlmClient::new(&create_test_config());
        let context = RelevanceContext {
            user_message: "What are my allergies?".to_string(),
            candidates: vec!["alice.txt".to_string()],
        };

        let messages = client.build_relevance_agent_messages(&context).unwrap();

        assert_eq!(roles(&messages), vec!["system", "user"]);
    }

    #[test]
    fn test_assistant_messages_include_patient_context_and_history() {
        let client = OpenAiLlmClient::new(&create_test_config());
        let context = AssistantContext {
            user_message: "And my next appointment?".to_string(),
            chat_history: vec![turn(Sender::User, "Hi"), turn(Sender::Bot, "Hello! How can I help?")],
            patient_context: Some("Name: Alice".to_string()),
        };

        let messages = client.build_assistant_agent_messages(&context).unwrap();

        assert_eq!(roles(&messages), vec!["system", "system", "user", "assistant", "user"]);
    }

    #[test]
    fn test_assistant_messages_skip_empty_patient_context() {
        let client = OpenAiLlmClient::new(&create_test_config());
        let context = AssistantContext {
            user_message: "Hi".to_string(),
            chat_history: Vec::new(),
            patient_context: Some(String::new()),
        };

        let messages = client.build_assistant_agent_messages(&context).unwrap();

        assert_eq!(roles(&messages), vec!["system", "user"]);
    }

    #[test]
    fn test_assistant_messages_do_not_repeat_echoed_user_message() {
        let client = OpenAiLlmClient::new(&create_test_config());
        let context = AssistantContext {
            user_message: "How do I pay my bill?".to_string(),
            chat_history: vec![turn(Sender::Bot, "Welcome!"), turn(Sender::User, "How do I pay my bill?")],
            patient_context: None,
        };

        let messages = client.build_assistant_agent_messages(&context).unwrap();

        assert_eq!(roles(&messages), vec!["system", "assistant", "user"]);
    }

    #[tokio::test]
    async fn test_llm_client_error_handling_unreachable_endpoint() {
        let mut config = create_test_config();
        let config_inner = Arc::make_mut(&mut config.inner);
        config_inner.openai_api_base = Some("http://127.0.0.1:9/v1".to_string());

        let client = LlmClient::openai(&config);
        let context = RelevanceContext {
            user_message: "test".to_string(),
            candidates: vec!["alice.txt".to_string()],
        };

        let result = client.get_relevance_agent_response(&context).await;
        assert!(result.is_err(), "Should fail when the endpoint is unreachable");
    }
}
