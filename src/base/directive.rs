//! Parser for the directives the assistant embeds in its free-text replies.
//!
//! The assistant may prefix its reply with a form request, append follow-up suggestions, and
//! place an action button anywhere in the body:
//!
//! ```text
//! [FORM_REQUIRED]{"fields": [...]} Please fill in the form below.
//! [ACTION_BUTTON]{"text": "Pay", "action": "pay_bill"}
//! [SUGGESTIONS]
//! How do I update my address?
//! ```
//!
//! Extraction runs in a fixed order (form, then suggestions, then action button), each step
//! working on the message left over by the previous one. A directive whose JSON is missing or
//! malformed is logged and dropped; its marker text stays in the message.

use anyhow::anyhow;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::base::types::{ActionButton, FormSpec, Res, ShapedResponse};

/// Marker that must open a reply carrying a form specification.
pub const FORM_MARKER: &str = "[FORM_REQUIRED]";
/// Marker after which follow-up suggestions are listed, one per line.
pub const SUGGESTIONS_MARKER: &str = "[SUGGESTIONS]";
/// Marker followed by an action button object.
pub const ACTION_MARKER: &str = "[ACTION_BUTTON]";
/// Maximum number of suggestions kept.
pub const MAX_SUGGESTIONS: usize = 3;

/// A structured directive recovered from an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Form(FormSpec),
    Suggestions(Vec<String>),
    Action(ActionButton),
}

/// An assistant reply split into its plain text and its directives, in extraction order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedReply {
    pub message: String,
    pub directives: Vec<Directive>,
}

impl ParsedReply {
    pub fn form(&self) -> Option<&FormSpec> {
        self.directives.iter().find_map(|d| if let Directive::Form(form) = d { Some(form) } else { None })
    }

    pub fn action_button(&self) -> Option<&ActionButton> {
        self.directives.iter().find_map(|d| if let Directive::Action(button) = d { Some(button) } else { None })
    }

    pub fn suggestions(&self) -> &[String] {
        self.directives
            .iter()
            .find_map(|d| if let Directive::Suggestions(s) = d { Some(s.as_slice()) } else { None })
            .unwrap_or_default()
    }

    /// Shape the reply for the chat client.
    pub fn into_shaped(self, context_used: Option<String>) -> ShapedResponse {
        let mut response = ShapedResponse {
            message: self.message,
            context_used,
            form: None,
            action_button: None,
            suggestions: Vec::new(),
        };

        for directive in self.directives {
            match directive {
                Directive::Form(form) => response.form = Some(form),
                Directive::Suggestions(suggestions) => response.suggestions = suggestions,
                Directive::Action(button) => response.action_button = Some(button),
            }
        }

        response
    }
}

/// Parse a raw assistant reply.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let mut directives = Vec::new();

    let (message, form) = extract_form(raw.trim());
    if let Some(form) = form {
        directives.push(Directive::Form(form));
    }

    let (message, suggestions) = extract_suggestions(message);
    if !suggestions.is_empty() {
        directives.push(Directive::Suggestions(suggestions));
    }

    let (message, action) = extract_action(message);
    if let Some(action) = action {
        directives.push(Directive::Action(action));
    }

    ParsedReply { message, directives }
}

/// Parse a raw assistant reply and shape it for the chat client.
pub fn shape_response(raw: &str, context_used: Option<String>) -> ShapedResponse {
    parse_reply(raw).into_shaped(context_used)
}

// Extraction steps.

fn extract_form(text: &str) -> (String, Option<FormSpec>) {
    let Some(rest) = text.strip_prefix(FORM_MARKER) else {
        return (text.to_string(), None);
    };

    match extract_json_object::<FormSpec>(rest.trim()) {
        Ok((form, tail)) => (tail.trim().to_string(), Some(form)),
        Err(err) => {
            warn!("Failed to parse form directive: {err}");
            (text.to_string(), None)
        }
    }
}

fn extract_suggestions(text: String) -> (String, Vec<String>) {
    let Some((before, after)) = text.split_once(SUGGESTIONS_MARKER) else {
        return (text, Vec::new());
    };

    let suggestions = after.lines().map(str::trim).filter(|line| !line.is_empty()).take(MAX_SUGGESTIONS).map(str::to_string).collect();

    (before.trim().to_string(), suggestions)
}

fn extract_action(text: String) -> (String, Option<ActionButton>) {
    let Some((pre, post)) = text.split_once(ACTION_MARKER) else {
        return (text, None);
    };

    match extract_json_object::<ActionButton>(post) {
        Ok((button, tail)) => {
            let pre = pre.trim();
            let tail = tail.trim();

            let message = if tail.is_empty() { pre.to_string() } else { format!("{pre} {tail}") };

            (message, Some(button))
        }
        Err(err) => {
            warn!("Failed to parse action button directive: {err}");
            (text, None)
        }
    }
}

// Brace matching.

/// Parse the first JSON object in `text`, returning it with the text that follows it.
fn extract_json_object<T: DeserializeOwned>(text: &str) -> Res<(T, &str)> {
    let start = text.find('{').ok_or_else(|| anyhow!("no JSON object found"))?;
    let end = find_object_end(text, start).ok_or_else(|| anyhow!("unbalanced braces in JSON object"))?;

    let value = serde_json::from_str(&text[start..end])?;

    Ok((value, &text[end..]))
}

/// Return the byte offset just past the `}` that closes the `{` at `start`.
///
/// Braces inside JSON string literals do not count towards the depth.
fn find_object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in text.as_bytes()[start..].iter().copied().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }

    None
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::types::{FieldType, FormField};

    fn address_form() -> FormSpec {
        FormSpec {
            fields: vec![
                FormField {
                    name: "street".to_string(),
                    label: "Street".to_string(),
                    field_type: FieldType::Text,
                    required: true,
                },
                FormField {
                    name: "zip".to_string(),
                    label: "ZIP Code".to_string(),
                    field_type: FieldType::Text,
                    required: false,
                },
            ],
        }
    }

    const ADDRESS_FORM_JSON: &str = r#"{"fields": [{"name": "street", "label": "Street", "type": "text", "required": true}, {"name": "zip", "label": "ZIP Code", "type": "text", "required": false}]}"#;

    #[test]
    fn test_plain_text_passes_through_trimmed() {
        let reply = parse_reply("  Your appointment is on **Monday**.  \n");

        assert_eq!(reply.message, "Your appointment is on **Monday**.");
        assert!(reply.directives.is_empty());
    }

    #[test]
    fn test_form_with_nested_objects_is_extracted() {
        let raw = format!("[FORM_REQUIRED] {ADDRESS_FORM_JSON}\nPlease fill in the form below.");

        let reply = parse_reply(&raw);

        assert_eq!(reply.form(), Some(&address_form()));
        assert_eq!(reply.message, "Please fill in the form below.");
    }

    #[test]
    fn test_form_marker_must_open_the_reply() {
        let raw = format!("Sure. [FORM_REQUIRED] {ADDRESS_FORM_JSON}");

        let reply = parse_reply(&raw);

        assert!(reply.form().is_none());
        assert_eq!(reply.message, raw);
    }

    #[test]
    fn test_form_marker_after_leading_whitespace_is_recognized() {
        let raw = format!("\n  [FORM_REQUIRED]{ADDRESS_FORM_JSON}");

        let reply = parse_reply(&raw);

        assert_eq!(reply.form(), Some(&address_form()));
        assert_eq!(reply.message, "");
    }

    #[test]
    fn test_form_with_unbalanced_braces_leaves_message_untouched() {
        let raw = r#"[FORM_REQUIRED] {"fields": [{"name": "street" ] Please fill in the form."#;

        let reply = parse_reply(raw);

        assert!(reply.form().is_none());
        assert_eq!(reply.message, raw);
    }

    #[test]
    fn test_form_with_invalid_field_type_is_dropped() {
        let raw = r#"[FORM_REQUIRED] {"fields": [{"name": "dob", "label": "Birthday", "type": "date", "required": true}]} Thanks."#;

        let reply = parse_reply(raw);

        assert!(reply.form().is_none());
        assert_eq!(reply.message, raw);
    }

    #[test]
    fn test_form_required_defaults_to_false() {
        let raw = r#"[FORM_REQUIRED] {"fields": [{"name": "email", "label": "Email", "type": "email"}]}"#;

        let reply = parse_reply(raw);

        let form = reply.form().unwrap();
        assert_eq!(form.fields[0].field_type, FieldType::Email);
        assert!(!form.fields[0].required);
    }

    #[test]
    fn test_braces_inside_strings_do_not_close_the_object() {
        let raw = r#"[FORM_REQUIRED] {"fields": [{"name": "note", "label": "Note } {", "type": "textarea", "required": false}]} Done."#;

        let reply = parse_reply(raw);

        let form = reply.form().unwrap();
        assert_eq!(form.fields[0].label, "Note } {");
        assert_eq!(reply.message, "Done.");
    }

    #[test]
    fn test_suggestions_are_truncated_and_blank_lines_dropped() {
        let reply = parse_reply("Here you go.\n[SUGGESTIONS]\nQ1\n\n  Q2  \nQ3\nQ4");

        assert_eq!(reply.message, "Here you go.");
        assert_eq!(reply.suggestions(), ["Q1", "Q2", "Q3"]);
    }

    #[test]
    fn test_suggestions_marker_without_lines_yields_none() {
        let reply = parse_reply("Here you go. [SUGGESTIONS]\n\n");

        assert_eq!(reply.message, "Here you go.");
        assert!(reply.suggestions().is_empty());
        assert!(reply.directives.is_empty());
    }

    #[test]
    fn test_action_button_joins_surrounding_text_with_single_space() {
        let reply = parse_reply(r#"text [ACTION_BUTTON] {"text":"Pay","action":"pay_bill"} more text"#);

        assert_eq!(reply.message, "text more text");
        assert_eq!(
            reply.action_button(),
            Some(&ActionButton {
                text: "Pay".to_string(),
                action: "pay_bill".to_string(),
            })
        );
    }

    #[test]
    fn test_action_button_at_end_keeps_only_preceding_text() {
        let reply = parse_reply("You can pay your bill below.\n[ACTION_BUTTON]{\"text\": \"Pay Bill\", \"action\": \"pay_bill\"}\n");

        assert_eq!(reply.message, "You can pay your bill below.");
        assert_eq!(reply.action_button().unwrap().action, "pay_bill");
    }

    #[test]
    fn test_malformed_action_button_leaves_message_untouched() {
        let raw = r#"Go here [ACTION_BUTTON] {"text": "Pay", "action": } later"#;

        let reply = parse_reply(raw);

        assert!(reply.action_button().is_none());
        assert_eq!(reply.message, raw);
    }

    #[test]
    fn test_action_marker_without_object_leaves_message_untouched() {
        let reply = parse_reply("Go here [ACTION_BUTTON] later");

        assert!(reply.action_button().is_none());
        assert_eq!(reply.message, "Go here [ACTION_BUTTON] later");
    }

    #[test]
    fn test_all_directives_in_documented_order() {
        let raw = format!(
            "[FORM_REQUIRED]{ADDRESS_FORM_JSON}\nPlease enter your new address below. [ACTION_BUTTON] {{\"text\": \"Records\", \"action\": \"medical_records\"}} You can also review your records.\n[SUGGESTIONS]\nHow long does an address change take?\nCan I update my phone number?"
        );

        let shaped = shape_response(&raw, Some("alice.txt".to_string()));

        assert_eq!(shaped.form, Some(address_form()));
        assert_eq!(shaped.message, "Please enter your new address below. You can also review your records.");
        assert_eq!(shaped.action_button.as_ref().map(|b| b.action.as_str()), Some("medical_records"));
        assert_eq!(shaped.suggestions, vec!["How long does an address change take?", "Can I update my phone number?"]);
        assert_eq!(shaped.context_used.as_deref(), Some("alice.txt"));
    }

    #[test]
    fn test_action_marker_after_suggestions_is_treated_as_a_suggestion() {
        let raw = "Hello.\n[SUGGESTIONS]\nWhat next?\n[ACTION_BUTTON] {\"text\": \"Pay\", \"action\": \"pay_bill\"}";

        let shaped = shape_response(raw, None);

        assert!(shaped.action_button.is_none());
        assert_eq!(shaped.message, "Hello.");
        assert_eq!(shaped.suggestions.len(), 2);
    }

    #[test]
    fn test_shaped_response_without_directives_has_empty_fields() {
        let shaped = shape_response("Hi there!", None);

        assert_eq!(
            shaped,
            ShapedResponse {
                message: "Hi there!".to_string(),
                context_used: None,
                form: None,
                action_button: None,
                suggestions: Vec::new(),
            }
        );
    }

    #[test]
    fn test_find_object_end_handles_escaped_quotes() {
        let text = r#"{"a": "say \"}\" please", "b": {"c": 1}} tail"#;

        let end = find_object_end(text, 0).unwrap();

        assert_eq!(&text[end..], " tail");
    }

    #[test]
    fn test_find_object_end_returns_none_when_unclosed() {
        assert_eq!(find_object_end(r#"{"a": {"b": 1}"#, 0), None);
    }
}
