// Angle generation for remaking a viral video from a creator's own perspective

use crate::ai::{first_parsed, strip_code_fences, AiOutcome, SharedGenerator};
use crate::models::ai::{Angle, CreatorProfile};
use crate::models::viral::ViralVideo;

const MIN_ANGLES: usize = 3;
const MAX_ANGLES: usize = 5;
const TRANSCRIPT_WORD_LIMIT: usize = 1500;

pub struct AngleGenerator {
    generators: Vec<SharedGenerator>,
}

impl AngleGenerator {
    pub fn new(generators: Vec<SharedGenerator>) -> Self {
        Self { generators }
    }

    pub async fn generate(
        &self,
        video: &ViralVideo,
        profile: &CreatorProfile,
        transcript: Option<&str>,
    ) -> AiOutcome<Vec<Angle>> {
        let prompt = build_prompt(video, profile, transcript.unwrap_or_default());
        tracing::info!("Generating angles for video: {}", video.title);

        match first_parsed(&self.generators, &prompt, parse_angles).await {
            Some(angles) => AiOutcome::Parsed(angles),
            None => {
                tracing::warn!("Using fallback angles for {}", video.video_id);
                AiOutcome::Fallback(fallback_angles(&video.title, profile))
            }
        }
    }
}

fn transcript_excerpt(transcript: &str) -> String {
    transcript
        .split_whitespace()
        .take(TRANSCRIPT_WORD_LIMIT)
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_prompt(video: &ViralVideo, profile: &CreatorProfile, transcript: &str) -> String {
    let expertise = if profile.expertise_areas.is_empty() {
        "General knowledge".to_string()
    } else {
        profile.expertise_areas.join(", ")
    };

    format!(
        r#"Suggest 4 unique angles a creator could use to make their own video on this topic.

VIDEO: {title}
Views: {views} | Duration: {duration}s
Transcript excerpt:
{transcript}

CREATOR: {creator}
Niche: {niche} | Expertise: {expertise}
Tone: {tone} | Audience: {audience}
Bio: {bio}
Notes: {notes}

Return ONLY a JSON array. Each object needs "angle_name", "core_hook", "key_differentiator",
"target_emotion", "estimated_appeal" ("high" or "medium") and "why_this_works"."#,
        title = video.title,
        views = video.view_count,
        duration = video.duration_seconds,
        transcript = transcript_excerpt(transcript),
        creator = profile.creator_name.as_deref().unwrap_or("Independent Creator"),
        niche = profile.niche.as_deref().unwrap_or("General"),
        tone = profile.tone_preference.as_deref().unwrap_or("Informative"),
        audience = profile.target_audience.as_deref().unwrap_or("General viewers"),
        bio = profile.bio.as_deref().unwrap_or("Not specified"),
        notes = profile.additional_notes.as_deref().unwrap_or("None"),
    )
}

/// Accepts a JSON array of at least three entries. Entries missing a required
/// field are dropped and at most five are kept.
pub fn parse_angles(text: &str) -> Option<Vec<Angle>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(strip_code_fences(text)).ok()?;
    if values.len() < MIN_ANGLES {
        return None;
    }

    let angles: Vec<Angle> = values
        .into_iter()
        .filter_map(|v| serde_json::from_value::<Angle>(v).ok())
        .take(MAX_ANGLES)
        .collect();

    (!angles.is_empty()).then_some(angles)
}

pub fn fallback_angles(title: &str, profile: &CreatorProfile) -> Vec<Angle> {
    let niche = profile.niche_or_default();
    let expertise = profile.primary_expertise();

    vec![
        Angle {
            angle_name: format!("The {} Perspective", niche),
            core_hook: format!(
                "As someone who's spent years in {}, here's what everyone else is missing about '{}'",
                niche, title
            ),
            key_differentiator: format!(
                "Bringing {} expertise to a topic that's usually covered by generalists",
                expertise
            ),
            target_emotion: "curiosity".into(),
            estimated_appeal: "high".into(),
            why_this_works: Some("Your unique expertise adds credibility and fresh insights".into()),
        },
        Angle {
            angle_name: "The 3 Things Nobody Mentions".into(),
            core_hook: "I watched 20 videos about this topic. Here are the 3 critical things they all got wrong".into(),
            key_differentiator: "Meta-analysis approach that positions you as the definitive source".into(),
            target_emotion: "curiosity".into(),
            estimated_appeal: "high".into(),
            why_this_works: Some("Number-based hooks with contrarian framing perform well".into()),
        },
        Angle {
            angle_name: "The Real-World Test".into(),
            core_hook: "I actually tried this for 30 days. Here's what happened (with receipts)".into(),
            key_differentiator: "First-hand experience and proof instead of just commentary".into(),
            target_emotion: "validation".into(),
            estimated_appeal: "high".into(),
            why_this_works: Some("Personal experiments with documented results build trust".into()),
        },
        Angle {
            angle_name: "The Future Implications".into(),
            core_hook: format!(
                "Everyone's focused on today. But in 2 years, this changes everything about {}",
                niche
            ),
            key_differentiator: "Forward-looking analysis that makes viewers feel ahead of the curve".into(),
            target_emotion: "fear".into(),
            estimated_appeal: "medium".into(),
            why_this_works: Some("Prediction content creates urgency and shareability".into()),
        },
    ]
}
