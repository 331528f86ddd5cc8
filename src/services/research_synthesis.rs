// Research synthesis: condenses raw search/fact-check/scrape results into a brief

use crate::ai::{first_parsed, parse_json_payload, AiOutcome, SharedGenerator};
use crate::models::ai::{Angle, RawResearch, ResearchBrief};
use crate::models::viral::ViralVideo;
use serde_json::json;
use std::fmt::Write;

pub struct ResearchSynthesizer {
    generators: Vec<SharedGenerator>,
}

impl ResearchSynthesizer {
    pub fn new(generators: Vec<SharedGenerator>) -> Self {
        Self { generators }
    }

    pub async fn synthesize(
        &self,
        video: &ViralVideo,
        angle: &Angle,
        raw: &RawResearch,
    ) -> AiOutcome<ResearchBrief> {
        let prompt = build_prompt(video, angle, raw);

        match first_parsed(&self.generators, &prompt, parse_brief).await {
            Some(brief) => AiOutcome::Parsed(brief),
            None => {
                tracing::warn!("Using fallback research brief");
                AiOutcome::Fallback(fallback_brief(raw))
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn build_prompt(video: &ViralVideo, angle: &Angle, raw: &RawResearch) -> String {
    let mut topics = String::new();
    for (i, topic) in raw.trending_topics.iter().take(10).enumerate() {
        let _ = writeln!(
            topics,
            "{}. {} ({})\n   {}",
            i + 1,
            topic.title.as_deref().unwrap_or("Untitled"),
            topic.url.as_deref().unwrap_or("no url"),
            truncate(topic.content.as_deref().unwrap_or_default(), 200)
        );
    }

    let mut checks = String::new();
    for check in &raw.fact_checks {
        let _ = writeln!(checks, "Query: {}\nResponse: {}", check.query, truncate(&check.verification, 500));
    }

    let mut scraped = String::new();
    for (i, page) in raw.scraped_content.iter().take(5).enumerate() {
        let _ = writeln!(scraped, "{}. {}\n   {}", i + 1, page.url, truncate(&page.content, 300));
    }

    format!(
        r#"Synthesize this research into a brief for a new video.

ORIGINAL VIDEO: {title} ({views} views)
ANGLE: {angle_name} | Hook: {hook} | Differentiator: {diff}

TRENDING TOPICS:
{topics}
FACT CHECKS:
{checks}
SCRAPED CONTENT:
{scraped}
Return ONLY a JSON object with "executive_summary" (string), "new_facts" (array),
"narrative_hooks" (array of strings), and optionally "updated_claims", "key_statistics",
"compelling_quotes", "supporting_evidence"."#,
        title = video.title,
        views = video.view_count,
        angle_name = angle.angle_name,
        hook = angle.core_hook,
        diff = angle.key_differentiator,
    )
}

/// Requires `executive_summary`, `new_facts` and `narrative_hooks`.
pub fn parse_brief(text: &str) -> Option<ResearchBrief> {
    match parse_json_payload::<ResearchBrief>(text) {
        Ok(brief) => Some(brief),
        Err(e) => {
            tracing::warn!("Research brief did not parse: {}", e);
            None
        }
    }
}

pub fn fallback_brief(raw: &RawResearch) -> ResearchBrief {
    let new_facts = raw
        .trending_topics
        .iter()
        .take(5)
        .map(|topic| {
            json!({
                "fact": topic.title.as_deref().unwrap_or("Unknown"),
                "source": topic.url.as_deref().unwrap_or("Unknown"),
                "credibility": "medium",
                "placement_suggestion": "body"
            })
        })
        .collect();

    ResearchBrief {
        executive_summary: "Research data compiled from multiple sources. Use the trending topics and fact-checks to enhance the script.".to_string(),
        new_facts,
        narrative_hooks: vec![
            "What if everything you know about this is wrong?".to_string(),
            "The data reveals something surprising...".to_string(),
            "Here's what the experts aren't telling you...".to_string(),
        ],
        updated_claims: Vec::new(),
        key_statistics: Vec::new(),
        compelling_quotes: Vec::new(),
        supporting_evidence: Vec::new(),
    }
}
