use crate::models::ai::{Angle, CreatorProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// A saved creator profile (`creator_profiles` row)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProfileRecord {
    pub user_id: Uuid,
    pub creator_name: String,
    pub niche: String,
    pub bio: Option<String>,
    pub expertise_areas: Vec<String>,
    pub tone_preference: Option<String>,
    pub target_audience: Option<String>,
    pub additional_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Prompt-facing view of the saved profile
    pub fn profile(&self) -> CreatorProfile {
        CreatorProfile {
            creator_name: Some(self.creator_name.clone()),
            niche: Some(self.niche.clone()),
            expertise_areas: self.expertise_areas.clone(),
            tone_preference: self.tone_preference.clone(),
            target_audience: self.target_audience.clone(),
            bio: self.bio.clone(),
            additional_notes: self.additional_notes.clone(),
        }
    }
}

/// Create-or-update payload. Unset optional fields keep their saved value.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    pub creator_name: String,
    pub niche: String,
    #[serde(default)]
    pub bio: Option<String>,
    /// Entries may themselves be comma separated
    #[serde(default)]
    pub expertise_areas: Vec<String>,
    #[serde(default)]
    pub tone_preference: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

/// A persisted script (`generated_scripts` row)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ScriptRecord {
    pub id: i64,
    pub user_id: Uuid,
    pub original_video_id: String,
    pub selected_angle: String,
    pub angle_options: Json<Vec<Angle>>,
    pub script: String,
    pub titles: Vec<String>,
    pub thumbnail_descriptions: Vec<String>,
    pub research_data: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
}

impl ScriptRecord {
    /// The angle the script was written from, else the first stored option
    pub fn angle_used(&self) -> Option<&Angle> {
        self.angle_options
            .iter()
            .find(|a| a.angle_name == self.selected_angle)
            .or_else(|| self.angle_options.first())
    }
}

/// Listing entry for a user's scripts
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ScriptSummary {
    pub id: i64,
    pub original_video_id: String,
    pub selected_angle: String,
    pub created_at: DateTime<Utc>,
}
