//! Extraction of JSON objects from model replies.
//!
//! JSON mode usually yields a bare object, but some backends wrap it in a
//! ```json fence or surround it with prose. All three shapes are accepted.

use plancanvas_core::error::AgentError;
use serde::de::DeserializeOwned;

/// Locate the JSON object inside a reply.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// Deserialize the JSON object inside `text`, blaming `role` on failure.
pub fn parse<T: DeserializeOwned>(role: &str, text: &str) -> Result<T, AgentError> {
    let json = extract_json(text).ok_or_else(|| AgentError::MalformedOutput {
        role: role.to_string(),
        reason: "reply contains no JSON object".into(),
    })?;

    serde_json::from_str(json).map_err(|e| AgentError::MalformedOutput {
        role: role.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Steps {
        steps: Vec<String>,
    }

    #[test]
    fn bare_object() {
        let parsed: Steps = parse("planner", r#"{"steps": ["a", "b"]}"#).unwrap();
        assert_eq!(parsed.steps, vec!["a", "b"]);
    }

    #[test]
    fn fenced_object() {
        let reply = "Here you go:\n```json\n{\"steps\": [\"a\"]}\n```\nGood luck.";
        assert_eq!(extract_json(reply), Some("{\"steps\": [\"a\"]}"));
    }

    #[test]
    fn object_inside_prose() {
        let reply = "Plan follows {\"steps\": []} as requested";
        let parsed: Steps = parse("planner", reply).unwrap();
        assert!(parsed.steps.is_empty());
    }

    #[test]
    fn no_object_is_malformed() {
        let err = parse::<Steps>("planner", "I cannot help with that").unwrap_err();
        match err {
            AgentError::MalformedOutput { role, .. } => assert_eq!(role, "planner"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let err = parse::<Steps>("planner", r#"{"plan": ["a"]}"#).unwrap_err();
        assert!(err.to_string().contains("steps"));
    }

    #[test]
    fn reversed_braces_are_rejected() {
        assert_eq!(extract_json("} nothing {"), None);
    }
}
