// Thumbnail tester handlers
// Runs the competitor pipeline, persists the test and serves/reshuffles the grid

use super::user_id;
use crate::display::{build_display_set, reshuffle, DisplayItem, DisplaySet, GridSession, UserItem};
use crate::error::ApiError;
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::thumbnail_test::{NewThumbnailTest, ThumbnailTest};
use crate::services::channel_suggestions::ChannelSuggester;
use crate::services::test_store::TestRunStore;
use crate::services::thumbnail_pipeline::{PipelineOptions, ThumbnailPipeline};
use crate::utils::{format_duration, format_time_ago, format_view_count};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    response::Json,
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub fn thumbnail_routes() -> Router {
    Router::new()
        .route("/api/thumbnail/generate", post(generate_test))
        .route("/api/thumbnail/shuffle", post(shuffle_test))
        .route("/api/thumbnail/tests/latest", get(latest_test))
        .route("/api/thumbnail/tests/:id", get(get_test))
        .route("/api/thumbnail/tests/:id/title", patch(update_title))
        .layer(axum::middleware::from_fn(auth_middleware))
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub persona: String,
    pub video_title: String,
    /// Where the uploaded thumbnail is served from
    pub thumbnail_url: String,
    #[serde(default)]
    pub channel_avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShuffleRequest {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

/// A grid entry with its human-readable labels
#[derive(Debug, Serialize)]
pub struct GridItem<'a> {
    #[serde(flatten)]
    pub item: &'a DisplayItem,
    pub views_label: String,
    pub duration_label: Option<String>,
    pub published_label: String,
}

pub fn grid_items(set: &DisplaySet, now: DateTime<Utc>) -> Vec<GridItem<'_>> {
    set.items
        .iter()
        .map(|item| GridItem {
            item,
            views_label: if item.is_user_item {
                String::new()
            } else {
                format_view_count(item.video.view_count)
            },
            duration_label: item.video.duration_seconds.map(format_duration),
            published_label: format_time_ago(item.video.published_at, now),
        })
        .collect()
}

fn grid_response(session_id: Uuid, set: &DisplaySet) -> Value {
    json!({
        "success": true,
        "session_id": session_id,
        "user_position": set.user_position,
        "total": set.len(),
        "videos": grid_items(set, Utc::now()),
    })
}

fn non_empty(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Run the full pipeline for a persona and persist the resulting grid
pub async fn generate_test(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user_id(&claims)?;
    let persona = non_empty(&request.persona, "persona")?;
    let video_title = non_empty(&request.video_title, "video_title")?;
    let thumbnail_url = non_empty(&request.thumbnail_url, "thumbnail_url")?;

    let youtube = state
        .youtube_client
        .clone()
        .ok_or_else(|| ApiError::ServiceUnavailable("YouTube API key is not configured".into()))?;

    let store = TestRunStore::new(state.db_pool.clone());
    let test_id = store
        .create_test(&NewThumbnailTest {
            user_id,
            persona: persona.clone(),
            video_title: video_title.clone(),
            thumbnail_path: thumbnail_url.clone(),
            avatar_path: request.channel_avatar.clone(),
        })
        .await?;

    let pipeline = ThumbnailPipeline::new(
        ChannelSuggester::new(state.gemini_first()),
        state.resolver.clone(),
        youtube,
        PipelineOptions::from(&state.settings),
    );

    let collected = match pipeline.collect(&persona).await {
        Ok(collected) => collected,
        Err(e) => {
            tracing::warn!("Thumbnail test {} failed: {}", test_id, e);
            if let Err(db_err) = store.mark_failed(test_id).await {
                tracing::error!("Failed to mark test {} as failed: {}", test_id, db_err);
            }
            return Err(e.into());
        }
    };

    store.upsert_channels(&collected.channels).await?;
    store
        .upsert_videos(&collected.videos, state.settings.shorts_duration_threshold)
        .await?;

    let user_item = UserItem {
        title: video_title,
        thumbnail_url,
        channel_avatar: request.channel_avatar,
    };
    let set = build_display_set(
        &collected.videos,
        user_item,
        state.settings.shorts_duration_threshold,
        &mut StdRng::from_entropy(),
    );

    store.save_arrangement(test_id, user_id, &set).await?;
    let channel_ids = collected.channels.channel_ids();
    store
        .complete_test(test_id, &channel_ids, collected.videos.len())
        .await?;

    tracing::info!(
        "✅ Thumbnail test {} ready: {} items, user at {:?}, {} unresolved channels",
        test_id,
        set.len(),
        set.user_position,
        collected.unresolved
    );

    let mut response = grid_response(test_id, &set);
    response["channels_discovered"] = json!(channel_ids);
    response["unresolved_channels"] = json!(collected.unresolved);
    response["total_videos_fetched"] = json!(collected.videos.len());
    response["suggestion_source"] = json!(collected.suggestions.source());

    state
        .sessions
        .insert(test_id, GridSession { user_id, set })
        .await;

    Ok(Json(response))
}

/// Cached grid for the session, falling back to the persisted arrangement
async fn current_grid(
    state: &AppState,
    store: &TestRunStore,
    test_id: Uuid,
    user_id: Uuid,
) -> Result<DisplaySet, ApiError> {
    if let Some(session) = state.sessions.get(&test_id).await {
        if session.user_id == user_id {
            return Ok(session.set);
        }
    }

    tracing::debug!("Session {} not cached, loading from database", test_id);
    let test = store
        .load_test(test_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Test session not found".into()))?;
    let set = store.load_arrangement(&test).await?;
    if set.is_empty() {
        return Err(ApiError::NotFound("Test session has no videos".into()));
    }
    Ok(set)
}

pub async fn shuffle_test(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<ShuffleRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user_id(&claims)?;
    let store = TestRunStore::new(state.db_pool.clone());

    let current = current_grid(&state, &store, request.session_id, user_id).await?;
    let set = reshuffle(current, &mut StdRng::from_entropy());

    if let Err(e) = store.save_arrangement(request.session_id, user_id, &set).await {
        tracing::warn!("Failed to persist reshuffle of {}: {}", request.session_id, e);
    }

    let response = grid_response(request.session_id, &set);
    state
        .sessions
        .insert(request.session_id, GridSession { user_id, set })
        .await;

    Ok(Json(response))
}

async fn test_response(store: &TestRunStore, test: ThumbnailTest) -> Result<Json<Value>, ApiError> {
    let set = store.load_arrangement(&test).await?;
    let mut response = grid_response(test.id, &set);
    response["test"] = json!(test);
    Ok(Json(response))
}

pub async fn latest_test(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user_id(&claims)?;
    let store = TestRunStore::new(state.db_pool.clone());

    let test = store
        .latest_test(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No completed tests yet".into()))?;
    test_response(&store, test).await
}

pub async fn get_test(
    Path(test_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user_id(&claims)?;
    let store = TestRunStore::new(state.db_pool.clone());

    let test = store
        .load_test(test_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Test not found".into()))?;
    test_response(&store, test).await
}

pub async fn update_title(
    Path(test_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<TitleRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user_id(&claims)?;
    let title = non_empty(&request.title, "title")?;
    let store = TestRunStore::new(state.db_pool.clone());

    if !store.update_title(test_id, user_id, &title).await? {
        return Err(ApiError::NotFound("Test not found".into()));
    }

    // Keep a cached grid in step with the database
    if let Some(mut session) = state.sessions.get(&test_id).await {
        if let Some(item) = session.set.user_item_mut() {
            item.video.title = title.clone();
        }
        state.sessions.insert(test_id, session).await;
    }

    Ok(Json(json!({
        "success": true,
        "title": title
    })))
}
