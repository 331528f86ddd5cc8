// Viral researcher handlers
// Channel ingestion, bucketed browsing, creator profiles, and the
// angle -> research -> script flow with saved scripts

use super::user_id;
use crate::error::ApiError;
use crate::middleware::auth::auth_middleware;
use crate::models::ai::{Angle, CreatorProfile, RawResearch, ResearchBrief};
use crate::models::auth::Claims;
use crate::models::creator::{ProfileInput, ProfileRecord, ScriptRecord};
use crate::models::viral::ViralVideo;
use crate::services::angle_generator::AngleGenerator;
use crate::services::creator_store::{research_data, CreatorStore, NewScript};
use crate::services::research_synthesis::ResearchSynthesizer;
use crate::services::script_generator::{format_script_for_display, ScriptGenerator};
use crate::services::viral_videos::{ViralScraper, ViralVideoStore};
use crate::utils::{detect_hook_category, extract_hook, VIEW_BUCKETS};
use crate::AppState;
use axum::{
    extract::{Extension, Path, Query},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_SCRAPE_DAYS: i64 = 365;
const MAX_SCRAPE_DAYS: i64 = 3650;
const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 200;
const SPOKEN_WORDS_PER_MINUTE: usize = 150;

pub fn viral_routes() -> Router {
    Router::new()
        .route("/api/viral/channels", post(scrape_channel).get(list_channels))
        .route("/api/viral/videos", get(list_videos))
        .route("/api/viral/buckets", get(bucket_counts))
        .route("/api/viral/videos/:video_id/angles", post(generate_angles))
        .route("/api/viral/research/synthesize", post(synthesize_research))
        .route("/api/viral/videos/:video_id/script", post(generate_script))
        .route("/api/viral/profile", post(save_profile).get(get_profile))
        .route("/api/viral/scripts", get(list_scripts))
        .route("/api/viral/scripts/:id", get(get_script))
        .layer(axum::middleware::from_fn(auth_middleware))
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub channel: String,
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    pub channel_id: Option<String>,
    pub bucket: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AnglesRequest {
    /// Overrides the saved creator profile for this request
    #[serde(default)]
    pub profile: Option<CreatorProfile>,
    #[serde(default)]
    pub transcript: Option<String>,
    /// Ignore cached angles
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub video_id: String,
    pub angle: Angle,
    #[serde(default)]
    pub research: RawResearch,
}

#[derive(Debug, Deserialize)]
pub struct ScriptRequest {
    pub angle_index: usize,
    #[serde(default)]
    pub research_brief: Option<ResearchBrief>,
}

async fn load_video(store: &ViralVideoStore, video_id: &str) -> Result<ViralVideo, ApiError> {
    store
        .get(video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Video {} not found", video_id)))
}

fn saved_profile(record: Option<ProfileRecord>) -> Result<CreatorProfile, ApiError> {
    record
        .map(|r| r.profile())
        .ok_or_else(|| ApiError::BadRequest("Create a creator profile first".into()))
}

fn validate_profile(input: &ProfileInput) -> Result<(), ApiError> {
    if input.creator_name.trim().is_empty() {
        return Err(ApiError::BadRequest("creator_name is required".into()));
    }
    if input.niche.trim().is_empty() {
        return Err(ApiError::BadRequest("niche is required".into()));
    }
    Ok(())
}

/// Speaking time rounded to whole minutes
fn estimated_minutes(word_count: usize) -> usize {
    (word_count + SPOKEN_WORDS_PER_MINUTE / 2) / SPOKEN_WORDS_PER_MINUTE
}

fn script_view(record: &ScriptRecord, source_video: Option<&ViralVideo>) -> Value {
    let word_count = record.script.split_whitespace().count();
    json!({
        "success": true,
        "script": record,
        "formatted_script": format_script_for_display(&record.script),
        "selected_title": record.titles.first().map(String::as_str).unwrap_or("Untitled Script"),
        "angle": record.angle_used(),
        "word_count": word_count,
        "estimated_duration": format!("{} min", estimated_minutes(word_count)),
        "source_video": source_video
    })
}

fn scrape_days(days: Option<i64>) -> Result<i64, ApiError> {
    let days = days.unwrap_or(DEFAULT_SCRAPE_DAYS);
    if !(1..=MAX_SCRAPE_DAYS).contains(&days) {
        return Err(ApiError::BadRequest(format!(
            "days must be between 1 and {}",
            MAX_SCRAPE_DAYS
        )));
    }
    Ok(days)
}

fn validate_bucket(bucket: Option<&str>) -> Result<(), ApiError> {
    match bucket {
        Some(b) if !VIEW_BUCKETS.contains(&b) => Err(ApiError::BadRequest(format!(
            "Unknown bucket '{}'. Expected one of: {}",
            b,
            VIEW_BUCKETS.join(", ")
        ))),
        _ => Ok(()),
    }
}

pub async fn scrape_channel(
    Extension(state): Extension<Arc<AppState>>,
    Extension(_claims): Extension<Claims>,
    Json(request): Json<ScrapeRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.channel.trim().is_empty() {
        return Err(ApiError::BadRequest("channel is required".into()));
    }
    let days = scrape_days(request.days)?;

    let youtube = state
        .youtube_client
        .clone()
        .ok_or_else(|| ApiError::ServiceUnavailable("YouTube API key is not configured".into()))?;

    let scraper = ViralScraper::new(
        state.resolver.clone(),
        youtube,
        state.settings.video_min_duration,
        state.settings.max_videos_per_channel,
    );
    let store = ViralVideoStore::new(state.db_pool.clone());

    let report = scraper
        .scrape_channel(&store, &request.channel, days, request.force_refresh)
        .await?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}

pub async fn list_channels(
    Extension(state): Extension<Arc<AppState>>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let channels = ViralVideoStore::new(state.db_pool.clone()).channels().await?;
    Ok(Json(json!({
        "success": true,
        "channels": channels
    })))
}

pub async fn list_videos(
    Query(query): Query<VideoQuery>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    validate_bucket(query.bucket.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

    let videos = ViralVideoStore::new(state.db_pool.clone())
        .list(query.channel_id.as_deref(), query.bucket.as_deref(), limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": videos.len(),
        "videos": videos
    })))
}

pub async fn bucket_counts(
    Extension(state): Extension<Arc<AppState>>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let buckets = ViralVideoStore::new(state.db_pool.clone()).bucket_counts().await?;
    Ok(Json(json!({
        "success": true,
        "buckets": buckets
    })))
}

pub async fn generate_angles(
    Path(video_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<AnglesRequest>,
) -> Result<Json<Value>, ApiError> {
    if !request.refresh {
        if let Some(angles) = state.angle_cache.get(&video_id).await {
            tracing::debug!("Angle cache hit for {}", video_id);
            return Ok(Json(json!({
                "success": true,
                "video_id": video_id,
                "angles": angles,
                "source": "cache"
            })));
        }
    }

    let profile = match request.profile {
        Some(profile) => profile,
        None => {
            let user_id = user_id(&claims)?;
            saved_profile(CreatorStore::new(state.db_pool.clone()).profile(user_id).await?)?
        }
    };

    let store = ViralVideoStore::new(state.db_pool.clone());
    let video = load_video(&store, &video_id).await?;

    let outcome = AngleGenerator::new(state.claude_first())
        .generate(&video, &profile, request.transcript.as_deref())
        .await;
    let source = outcome.source();
    let angles = outcome.into_inner();

    // Script generation reads angles from this cache
    state.angle_cache.insert(video_id.clone(), angles.clone()).await;

    Ok(Json(json!({
        "success": true,
        "video_id": video_id,
        "angles": angles,
        "source": source
    })))
}

pub async fn synthesize_research(
    Extension(state): Extension<Arc<AppState>>,
    Extension(_claims): Extension<Claims>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Json<Value>, ApiError> {
    let store = ViralVideoStore::new(state.db_pool.clone());
    let video = load_video(&store, &request.video_id).await?;

    let outcome = ResearchSynthesizer::new(state.gemini_first())
        .synthesize(&video, &request.angle, &request.research)
        .await;

    Ok(Json(json!({
        "success": true,
        "source": outcome.source(),
        "brief": outcome.value()
    })))
}

pub async fn generate_script(
    Path(video_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<ScriptRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user_id(&claims)?;
    let angles = state.angle_cache.get(&video_id).await.ok_or_else(|| {
        ApiError::NotFound(format!("No angles cached for {}. Generate angles first.", video_id))
    })?;
    let angle = angles.get(request.angle_index).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "angle_index {} out of range (0..{})",
            request.angle_index,
            angles.len()
        ))
    })?;

    let store = ViralVideoStore::new(state.db_pool.clone());
    let video = load_video(&store, &video_id).await?;

    let outcome = ScriptGenerator::new(state.claude_first())
        .generate(&video, angle, request.research_brief.as_ref())
        .await;
    let source = outcome.source();
    let script = outcome.into_inner();

    let script_id = CreatorStore::new(state.db_pool.clone())
        .save_script(&NewScript {
            user_id,
            video_id: &video_id,
            angle,
            angle_options: &angles,
            generated: &script,
            research_data: research_data(request.research_brief.as_ref()),
        })
        .await?;

    let hook = extract_hook(&script.script);
    let hook_category = hook.as_deref().map(detect_hook_category);

    Ok(Json(json!({
        "success": true,
        "script_id": script_id,
        "source": source,
        "angle": angle,
        "hook": hook,
        "hook_category": hook_category,
        "formatted_script": format_script_for_display(&script.script),
        "script": script
    })))
}

pub async fn save_profile(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<ProfileInput>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user_id(&claims)?;
    validate_profile(&input)?;

    let store = CreatorStore::new(state.db_pool.clone());
    let action = if store.profile(user_id).await?.is_some() {
        "updated"
    } else {
        "created"
    };
    let profile = store.save_profile(user_id, &input).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Profile {} successfully", action),
        "profile": profile
    })))
}

pub async fn get_profile(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user_id(&claims)?;
    let profile = CreatorStore::new(state.db_pool.clone())
        .profile(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No creator profile yet".into()))?;

    Ok(Json(json!({
        "success": true,
        "profile": profile
    })))
}

pub async fn list_scripts(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user_id(&claims)?;
    let scripts = CreatorStore::new(state.db_pool.clone())
        .list_scripts(user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": scripts.len(),
        "scripts": scripts
    })))
}

pub async fn get_script(
    Path(script_id): Path<i64>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user_id(&claims)?;
    let record = CreatorStore::new(state.db_pool.clone())
        .script(script_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Script not found".into()))?;

    let source_video = ViralVideoStore::new(state.db_pool.clone())
        .get(&record.original_video_id)
        .await?;

    Ok(Json(script_view(&record, source_video.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bucket() {
        assert!(validate_bucket(None).is_ok());
        assert!(validate_bucket(Some("1M+")).is_ok());
        assert!(matches!(validate_bucket(Some("huge")), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_scrape_days_bounds() {
        assert_eq!(scrape_days(None).unwrap(), DEFAULT_SCRAPE_DAYS);
        assert_eq!(scrape_days(Some(1)).unwrap(), 1);
        assert_eq!(scrape_days(Some(MAX_SCRAPE_DAYS)).unwrap(), MAX_SCRAPE_DAYS);
        for days in [0, -5, MAX_SCRAPE_DAYS + 1, 1_000_000_000_000_000, i64::MAX] {
            assert!(matches!(scrape_days(Some(days)), Err(ApiError::BadRequest(_))));
        }
    }

    #[test]
    fn test_script_request_defaults() {
        let request: ScriptRequest = serde_json::from_str(r#"{"angle_index": 2}"#).unwrap();
        assert_eq!(request.angle_index, 2);
        assert!(request.research_brief.is_none());

        let angles: AnglesRequest = serde_json::from_str("{}").unwrap();
        assert!(!angles.refresh);
        assert!(angles.profile.is_none());
    }

    fn profile_record() -> ProfileRecord {
        let now = chrono::Utc::now();
        ProfileRecord {
            user_id: uuid::Uuid::new_v4(),
            creator_name: "Dana".into(),
            niche: "personal finance".into(),
            bio: None,
            expertise_areas: vec!["investing".into()],
            tone_preference: Some("calm".into()),
            target_audience: None,
            additional_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_saved_profile_is_required_without_inline_profile() {
        assert!(matches!(saved_profile(None), Err(ApiError::BadRequest(_))));

        let profile = saved_profile(Some(profile_record())).unwrap();
        assert_eq!(profile.niche.as_deref(), Some("personal finance"));
        assert_eq!(profile.primary_expertise(), "investing");
    }

    #[test]
    fn test_validate_profile() {
        let input: ProfileInput =
            serde_json::from_str(r#"{"creator_name": "Dana", "niche": "finance"}"#).unwrap();
        assert!(validate_profile(&input).is_ok());
        assert!(input.expertise_areas.is_empty());

        let blank: ProfileInput =
            serde_json::from_str(r#"{"creator_name": "Dana", "niche": "  "}"#).unwrap();
        assert!(matches!(validate_profile(&blank), Err(ApiError::BadRequest(_))));

        assert!(serde_json::from_str::<ProfileInput>(r#"{"niche": "finance"}"#).is_err());
    }

    #[test]
    fn test_estimated_minutes() {
        assert_eq!(estimated_minutes(0), 0);
        assert_eq!(estimated_minutes(74), 0);
        assert_eq!(estimated_minutes(75), 1);
        assert_eq!(estimated_minutes(1_500), 10);
    }

    #[test]
    fn test_script_view() {
        let record = ScriptRecord {
            id: 7,
            user_id: uuid::Uuid::new_v4(),
            original_video_id: "v1".into(),
            selected_angle: "The Contrarian".into(),
            angle_options: sqlx::types::Json(vec![Angle {
                angle_name: "The Contrarian".into(),
                core_hook: "Everyone is wrong".into(),
                key_differentiator: "data".into(),
                target_emotion: "surprise".into(),
                estimated_appeal: "high".into(),
                why_this_works: None,
            }]),
            script: "[HOOK]\nThree words here.".into(),
            titles: vec![],
            thumbnail_descriptions: vec![],
            research_data: None,
            created_at: chrono::Utc::now(),
        };

        let view = script_view(&record, None);
        assert_eq!(view["script"]["id"], 7);
        assert_eq!(view["selected_title"], "Untitled Script");
        assert_eq!(view["angle"]["core_hook"], "Everyone is wrong");
        assert_eq!(view["word_count"], 4);
        assert_eq!(view["estimated_duration"], "0 min");
        assert!(view["source_video"].is_null());
    }
}
