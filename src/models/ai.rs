use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the creator making their own version is about. Every field is optional
/// so partially filled profiles still produce prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatorProfile {
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub expertise_areas: Vec<String>,
    #[serde(default)]
    pub tone_preference: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

impl CreatorProfile {
    pub fn niche_or_default(&self) -> &str {
        self.niche.as_deref().unwrap_or("your niche")
    }

    pub fn primary_expertise(&self) -> &str {
        self.expertise_areas
            .first()
            .map(String::as_str)
            .unwrap_or("your expertise")
    }
}

/// A distinct take a creator could use to remake a viral video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Angle {
    pub angle_name: String,
    pub core_hook: String,
    pub key_differentiator: String,
    #[serde(default = "default_emotion")]
    pub target_emotion: String,
    #[serde(default = "default_appeal")]
    pub estimated_appeal: String,
    #[serde(default)]
    pub why_this_works: Option<String>,
}

fn default_emotion() -> String {
    "curiosity".to_string()
}

fn default_appeal() -> String {
    "medium".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchTopic {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactCheck {
    pub query: String,
    #[serde(default)]
    pub verification: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapedContent {
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// Raw material gathered by the external research providers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawResearch {
    #[serde(default)]
    pub trending_topics: Vec<ResearchTopic>,
    #[serde(default)]
    pub fact_checks: Vec<FactCheck>,
    #[serde(default)]
    pub scraped_content: Vec<ScrapedContent>,
}

/// Synthesized research for script writing. The fact and evidence lists are
/// free-form objects since their shape varies between model responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchBrief {
    pub executive_summary: String,
    pub new_facts: Vec<Value>,
    pub narrative_hooks: Vec<String>,
    #[serde(default)]
    pub updated_claims: Vec<Value>,
    #[serde(default)]
    pub key_statistics: Vec<Value>,
    #[serde(default)]
    pub compelling_quotes: Vec<Value>,
    #[serde(default)]
    pub supporting_evidence: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedScript {
    pub script: String,
    pub titles: Vec<String>,
    pub thumbnails: Vec<String>,
    #[serde(default)]
    pub hook_options: Vec<String>,
    #[serde(default = "unknown_duration")]
    pub estimated_duration: String,
    #[serde(default)]
    pub word_count: usize,
}

fn unknown_duration() -> String {
    "Unknown".to_string()
}
