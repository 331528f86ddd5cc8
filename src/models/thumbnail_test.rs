use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted thumbnail test run (`thumbnail_tests` row)
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ThumbnailTest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub persona: String,
    pub video_title: String,
    pub thumbnail_path: String,
    pub avatar_path: Option<String>,
    pub status: String,
    pub channels_discovered: Vec<String>,
    pub total_videos_fetched: i32,
    pub user_position: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewThumbnailTest {
    pub user_id: Uuid,
    pub persona: String,
    pub video_title: String,
    pub thumbnail_path: String,
    pub avatar_path: Option<String>,
}

/// One display position of a test joined with its video metadata
#[derive(Debug, Clone, FromRow)]
pub struct TestVideoRow {
    pub position: i32,
    pub is_user_video: bool,
    pub video_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub title: String,
    pub thumbnail_url: String,
    pub view_count: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub video_url: String,
}

pub const STATUS_PROCESSING: &str = "processing";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";
