//! Runtime services and shared state for patient-assist.

use tracing::instrument;

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{http, llm::LlmClient, store::RecordStore},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the record store, LLM client, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The record store instance.
    pub store: RecordStore,
    /// The LLM client instance.
    pub llm: LlmClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Res<Self> {
        // Initialize the record store.
        let store = RecordStore::file(&config.data_dir)?;

        // Initialize the LLM client.
        let llm = LlmClient::openai(&config);

        Ok(Self { config, store, llm })
    }

    pub async fn start(&self) -> Void {
        http::serve(self.clone()).await
    }
}
