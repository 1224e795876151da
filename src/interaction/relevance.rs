//! Picks which patient record, if any, a user message is about.

use tracing::{info, instrument, warn};

use crate::{
    base::types::{RelevanceContext, Res},
    service::{llm::LlmClient, store::RecordStore},
};

/// Match a user message against the records listed in the index.
///
/// Returns `None` without calling the LLM when the index is empty.
#[instrument(skip_all)]
pub async fn check_relevance(user_message: &str, store: &RecordStore, llm: &LlmClient) -> Res<Option<String>> {
    let candidates = store.load_index().await?;

    if candidates.is_empty() {
        info!("No patient records indexed; skipping relevance check.");
        return Ok(None);
    }

    match_candidates(user_message, candidates, llm).await
}

/// Ask the relevance agent to choose among `candidates`.
#[instrument(skip_all)]
pub async fn match_candidates(user_message: &str, candidates: Vec<String>, llm: &LlmClient) -> Res<Option<String>> {
    let context = RelevanceContext {
        user_message: user_message.to_string(),
        candidates,
    };

    let answer = llm.get_relevance_agent_response(&context).await?;
    info!("Relevance agent answered `{answer}`.");

    Ok(resolve_relevant_file(&answer, &context.candidates))
}

/// Turn the agent's free-text answer into one of the candidate filenames.
///
/// The answer is trimmed of whitespace, quotes, backticks, and trailing `.`/`,`, and reduced to
/// its last path component. A `None` answer, or one naming no candidate, resolves to `None`.
pub fn resolve_relevant_file(answer: &str, candidates: &[String]) -> Option<String> {
    let answer = answer.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '`').trim();

    let bare = answer.trim_end_matches(|c: char| c.is_ascii_punctuation());
    if bare.is_empty() || bare.eq_ignore_ascii_case("none") {
        return None;
    }

    let filename = answer.rsplit(['/', '\\']).next().unwrap_or(answer).trim().trim_end_matches(['.', ',', '"', '\'', '`']);

    if candidates.iter().any(|candidate| candidate == filename) {
        Some(filename.to_string())
    } else {
        warn!("Relevance agent named `{filename}`, which is not in the index.");
        None
    }
}

// Tests.
