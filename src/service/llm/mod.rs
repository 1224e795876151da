//! Integration with Large Language Model services.
//!
//! The module defines the `GenericLlmClient` trait that can be implemented
//! for different LLM providers, with a default implementation for OpenAI.

pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{AssistantContext, RelevanceContext, Res};

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the core functionality for interacting with large language models.
/// Implementing this trait allows different LLM providers to be used with patient-assist.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Ask the relevance agent which of the candidate records pertains to the user message.
    ///
    /// Returns the agent's raw, trimmed answer; callers are responsible for validating it
    /// against the candidates.
    async fn get_relevance_agent_response(&self, context: &RelevanceContext) -> Res<String>;

    /// Generate a reply from the assistant agent.
    ///
    /// The reply is free text that may contain embedded directives
    /// (see [`crate::base::directive`]).
    async fn get_assistant_agent_response(&self, context: &AssistantContext) -> Res<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
