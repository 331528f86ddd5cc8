// Competitor channel suggestions for a target viewer persona

use crate::ai::{first_parsed, strip_code_fences, AiOutcome, SharedGenerator};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HANDLE_PATTERN: Regex = Regex::new(r"@[\w-]+").unwrap();
    static ref LIST_NOISE: Regex = Regex::new(r#"["\[\]]"#).unwrap();
}

/// Used when no provider returns a usable list
pub const FALLBACK_CHANNELS: [&str; 10] = [
    "@MrBeast",
    "@Veritasium",
    "@ThePrimeagen",
    "@mkbhd",
    "@LinusTechTips",
    "@3Blue1Brown",
    "@vsauce",
    "@CGPGrey",
    "@TomScottGo",
    "@Fireship",
];

pub struct ChannelSuggester {
    generators: Vec<SharedGenerator>,
}

impl ChannelSuggester {
    /// `generators` are tried in order
    pub fn new(generators: Vec<SharedGenerator>) -> Self {
        Self { generators }
    }

    pub async fn suggest(&self, persona: &str, count: usize) -> AiOutcome<Vec<String>> {
        let preview: String = persona.chars().take(50).collect();
        tracing::info!("Getting {} channel suggestions for persona: {}...", count, preview);

        let prompt = build_prompt(persona, count);
        let parsed = first_parsed(&self.generators, &prompt, |text| {
            let channels = parse_channel_response(text, count);
            (!channels.is_empty()).then_some(channels)
        })
        .await;

        match parsed {
            Some(channels) => AiOutcome::Parsed(channels),
            None => {
                tracing::warn!("All AI providers failed, using built-in channel list");
                AiOutcome::Fallback(fallback_channels(count))
            }
        }
    }
}

fn build_prompt(persona: &str, count: usize) -> String {
    format!(
        r#"List exactly {count} real, active YouTube channels this viewer watches regularly.

Target Viewer Persona: "{persona}"

Return ONLY a JSON array of channel handles, for example ["@Veritasium", "@MrBeast"]."#
    )
}

pub fn fallback_channels(count: usize) -> Vec<String> {
    FALLBACK_CHANNELS
        .iter()
        .take(count)
        .map(|s| s.to_string())
        .collect()
}

fn with_at(handle: &str) -> String {
    if handle.starts_with('@') {
        handle.to_string()
    } else {
        format!("@{}", handle)
    }
}

/// Pull channel handles out of a model reply: a JSON array first, then any
/// `@handle` tokens, then a comma-separated list.
pub fn parse_channel_response(text: &str, count: usize) -> Vec<String> {
    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(strip_code_fences(text)) {
        return values
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(with_at)
            .take(count)
            .collect();
    }

    let handles: Vec<String> = HANDLE_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .take(count)
        .collect();
    if !handles.is_empty() {
        return handles;
    }

    if text.contains(',') {
        return text
            .split(',')
            .map(|part| LIST_NOISE.replace_all(part, "").trim().to_string())
            .filter(|part| !part.is_empty() && !part.starts_with('{'))
            .map(|part| with_at(&part))
            .take(count)
            .collect();
    }

    Vec::new()
}
