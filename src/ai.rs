// Shared plumbing for language-model backed features: the generator trait the
// Claude and Gemini clients implement, and the tagged parsed/fallback outcome.

use crate::error::AiError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    async fn generate_text(&self, prompt: &str) -> Result<String, AiError>;
}

pub type SharedGenerator = Arc<dyn TextGenerator>;

/// Result of an AI-backed operation. `Fallback` carries canned content used
/// because every provider failed or returned something unusable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum AiOutcome<T> {
    Parsed(T),
    Fallback(T),
}

impl<T> AiOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, AiOutcome::Fallback(_))
    }

    pub fn value(&self) -> &T {
        match self {
            AiOutcome::Parsed(v) | AiOutcome::Fallback(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            AiOutcome::Parsed(v) | AiOutcome::Fallback(v) => v,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            AiOutcome::Parsed(_) => "ai",
            AiOutcome::Fallback(_) => "fallback",
        }
    }
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Skip the language tag on the opening fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Decode a JSON payload that may be wrapped in a code fence.
pub fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fences(text))
}

/// Try each generator in order until one produces output `parse` accepts.
/// Returns `None` when nothing usable came back.
pub async fn first_parsed<T, F>(
    generators: &[SharedGenerator],
    prompt: &str,
    parse: F,
) -> Option<T>
where
    F: Fn(&str) -> Option<T>,
{
    for generator in generators {
        match generator.generate_text(prompt).await {
            Ok(text) => match parse(&text) {
                Some(value) => {
                    tracing::info!("✅ {} response parsed", generator.name());
                    return Some(value);
                }
                None => tracing::warn!("{} returned an unusable response", generator.name()),
            },
            Err(e) => tracing::warn!("{} request failed: {}", generator.name(), e),
        }
    }
    None
}


#[cfg(test)]
mod tests {
    use super::test_support::StubGenerator;
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[\"@a\"]\n```"), "[\"@a\"]");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn test_parse_json_payload() {
        let parsed: Vec<String> = parse_json_payload("```json\n[\"x\", \"y\"]\n```").unwrap();
        assert_eq!(parsed, vec!["x", "y"]);
        assert!(parse_json_payload::<Vec<String>>("not json").is_err());
    }

    #[test]
    fn test_outcome_accessors() {
        let parsed = AiOutcome::Parsed(1);
        let fallback = AiOutcome::Fallback(2);
        assert!(!parsed.is_fallback());
        assert!(fallback.is_fallback());
        assert_eq!(fallback.source(), "fallback");
        assert_eq!(parsed.into_inner(), 1);
    }

    #[tokio::test]
    async fn test_first_parsed_falls_through_providers() {
        let failing = StubGenerator::failing();
        let garbage = StubGenerator::replying("nonsense");
        let good = StubGenerator::replying("42");
        let generators: Vec<SharedGenerator> = vec![failing.clone(), garbage.clone(), good.clone()];

        let value = first_parsed(&generators, "prompt", |t| t.trim().parse::<u32>().ok()).await;

        assert_eq!(value, Some(42));
        assert_eq!(failing.call_count(), 1);
        assert_eq!(garbage.call_count(), 1);
        assert_eq!(good.call_count(), 1);
    }

    #[tokio::test]
    async fn test_first_parsed_none_when_all_fail() {
        let generators: Vec<SharedGenerator> = vec![StubGenerator::failing()];
        let value = first_parsed(&generators, "p", |t| Some(t.to_string())).await;
        assert!(value.is_none());
    }
}
