//! Handles a chat turn: context lookup, the assistant call, and reply shaping.

use tracing::{error, info, instrument};

use crate::{
    base::{
        directive::shape_response,
        types::{AssistantContext, ChatRequest, Res, ShapedResponse},
    },
    interaction::relevance::check_relevance,
    service::{llm::LlmClient, store::RecordStore},
};

/// Answer a chat message.
///
/// A failing relevance check or a missing record only costs the reply its patient context; a
/// failing assistant call is returned as an error.
#[instrument(skip_all)]
pub async fn handle_chat(request: ChatRequest, store: &RecordStore, llm: &LlmClient) -> Res<ShapedResponse> {
    // First, see whether a patient record applies to the message.

    let relevant_file = match check_relevance(&request.message, store, llm).await {
        Ok(relevant_file) => relevant_file,
        Err(err) => {
            error!("Error checking relevance: {err}");
            None
        }
    };

    let patient_context = match &relevant_file {
        Some(filename) => load_patient_context(filename, store).await,
        None => None,
    };

    // Call the assistant with the history and any context.

    let context = AssistantContext {
        user_message: request.message,
        chat_history: request.chat_history,
        patient_context,
    };

    let raw = llm.get_assistant_agent_response(&context).await?;

    // Pull the directives out of the reply.

    let response = shape_response(&raw, relevant_file);

    info!(
        "Replying with form: {}, action button: {}, {} suggestions.",
        response.form.is_some(),
        response.action_button.is_some(),
        response.suggestions.len()
    );

    Ok(response)
}

/// Read the matched record, treating read failures as no context.
async fn load_patient_context(filename: &str, store: &RecordStore) -> Option<String> {
    match store.read_record(filename).await {
        Ok(contents) => contents,
        Err(err) => {
            error!("Error reading record `{filename}`: {err}");
            None
        }
    }
}
