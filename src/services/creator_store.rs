// Persistence for the viral researcher's per-user data: the creator profile
// that personalises angles and the scripts generated from them.

use crate::models::ai::{Angle, GeneratedScript, ResearchBrief};
use crate::models::creator::{ProfileInput, ProfileRecord, ScriptRecord, ScriptSummary};
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Flatten expertise entries, splitting comma-separated ones and dropping blanks.
pub fn normalize_expertise(areas: &[String]) -> Vec<String> {
    areas
        .iter()
        .flat_map(|area| area.split(','))
        .map(str::trim)
        .filter(|area| !area.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// JSON stored alongside a script describing the research it was written from
pub fn research_data(brief: Option<&ResearchBrief>) -> Option<Value> {
    brief.map(|brief| json!({ "research_brief": brief }))
}

/// A script ready to be saved for `user_id`
#[derive(Debug)]
pub struct NewScript<'a> {
    pub user_id: Uuid,
    pub video_id: &'a str,
    pub angle: &'a Angle,
    pub angle_options: &'a [Angle],
    pub generated: &'a GeneratedScript,
    pub research_data: Option<Value>,
}

#[derive(Clone)]
pub struct CreatorStore {
    pool: PgPool,
}

impl CreatorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, sqlx::Error> {
        sqlx::query_as::<_, ProfileRecord>("SELECT * FROM creator_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Create the user's profile, or update it keeping saved values for unset
    /// optional fields.
    pub async fn save_profile(
        &self,
        user_id: Uuid,
        input: &ProfileInput,
    ) -> Result<ProfileRecord, sqlx::Error> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            r#"
            INSERT INTO creator_profiles
                (user_id, creator_name, niche, bio, expertise_areas,
                 tone_preference, target_audience, additional_notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE SET
                creator_name = EXCLUDED.creator_name,
                niche = EXCLUDED.niche,
                bio = COALESCE(EXCLUDED.bio, creator_profiles.bio),
                expertise_areas = EXCLUDED.expertise_areas,
                tone_preference = COALESCE(EXCLUDED.tone_preference, creator_profiles.tone_preference),
                target_audience = COALESCE(EXCLUDED.target_audience, creator_profiles.target_audience),
                additional_notes = COALESCE(EXCLUDED.additional_notes, creator_profiles.additional_notes),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(input.creator_name.trim())
        .bind(input.niche.trim())
        .bind(non_blank(&input.bio))
        .bind(normalize_expertise(&input.expertise_areas))
        .bind(non_blank(&input.tone_preference))
        .bind(non_blank(&input.target_audience))
        .bind(non_blank(&input.additional_notes))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("👤 Saved creator profile for {}", user_id);
        Ok(record)
    }

    pub async fn save_script(&self, script: &NewScript<'_>) -> Result<i64, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO generated_scripts
                (user_id, original_video_id, selected_angle, angle_options, script,
                 titles, thumbnail_descriptions, research_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(script.user_id)
        .bind(script.video_id)
        .bind(&script.angle.angle_name)
        .bind(Json(script.angle_options))
        .bind(&script.generated.script)
        .bind(script.generated.titles.clone())
        .bind(script.generated.thumbnails.clone())
        .bind(script.research_data.clone().map(Json))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("📝 Saved script {} for video {}", id, script.video_id);
        Ok(id)
    }

    /// The user's scripts, newest first
    pub async fn list_scripts(&self, user_id: Uuid) -> Result<Vec<ScriptSummary>, sqlx::Error> {
        sqlx::query_as::<_, ScriptSummary>(
            r#"
            SELECT id, original_video_id, selected_angle, created_at
            FROM generated_scripts
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// One script, only when it belongs to `user_id`
    pub async fn script(&self, id: i64, user_id: Uuid) -> Result<Option<ScriptRecord>, sqlx::Error> {
        sqlx::query_as::<_, ScriptRecord>(
            "SELECT * FROM generated_scripts WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
