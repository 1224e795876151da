use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

// Conversation.

/// Who authored a chat turn.
///
/// Anything other than `bot`, including a missing sender, counts as the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Bot,
    #[default]
    #[serde(other)]
    User,
}

/// A single turn of the conversation, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default)]
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
}

// Directive payloads.

/// The input type of a requested form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Tel,
    Textarea,
}

/// One field of a form the assistant asks the user to fill in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

/// A form requested by the assistant via `[FORM_REQUIRED]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSpec {
    pub fields: Vec<FormField>,
}

/// A button linking to another part of the portal, requested via `[ACTION_BUTTON]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub text: String,
    pub action: String,
}

/// The reply sent back to the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapedResponse {
    pub message: String,
    pub context_used: Option<String>,
    pub form: Option<FormSpec>,
    pub action_button: Option<ActionButton>,
    pub suggestions: Vec<String>,
}

// LLM contexts.

/// Input for the relevance agent.
#[derive(Debug, Clone, Default)]
pub struct RelevanceContext {
    /// The user's question.
    pub user_message: String,
    /// Record filenames the agent may choose from.
    pub candidates: Vec<String>,
}

/// Input for the assistant agent.
#[derive(Debug, Clone, Default)]
pub struct AssistantContext {
    /// The user's latest message.
    pub user_message: String,
    /// The full conversation so far, oldest first.
    pub chat_history: Vec<ChatTurn>,
    /// Contents of the matched patient record, if any.
    pub patient_context: Option<String>,
}

// Wire types.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelevanceRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceResponse {
    pub relevant_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSubmissionRequest {
    #[serde(default, deserialize_with = "deserialize_form_values")]
    pub form_data: BTreeMap<String, String>,
    #[serde(default)]
    pub context: String,
}

/// Accept any JSON scalar as a form value; non-strings keep their JSON text and `null` is empty.
fn deserialize_form_values<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;

    Ok(raw
        .into_iter()
        .map(|(field, value)| {
            let value = match value {
                serde_json::Value::String(text) => text,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (field, value)
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmissionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_or_missing_sender_is_the_user() {
        let turns: Vec<ChatTurn> = serde_json::from_str(r#"[{"sender":"system","text":"a"},{"text":"b"},{"sender":"bot","text":"c"}]"#).unwrap();

        let senders: Vec<Sender> = turns.iter().map(|turn| turn.sender).collect();
        assert_eq!(senders, [Sender::User, Sender::User, Sender::Bot]);
    }

    #[test]
    fn test_form_values_accept_json_scalars() {
        let request: FormSubmissionRequest =
            serde_json::from_str(r#"{"form_data":{"age":42,"consent":true,"name":"Alice","note":null},"context":"Intake"}"#).unwrap();

        assert_eq!(request.form_data["age"], "42");
        assert_eq!(request.form_data["consent"], "true");
        assert_eq!(request.form_data["name"], "Alice");
        assert_eq!(request.form_data["note"], "");
    }
}
