use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Outcome of resolving one creator-supplied handle to a stable channel id.
/// `success` is true exactly when `channel_id` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedChannel {
    pub handle: String,
    pub channel_id: Option<String>,
    pub resolution_url: String,
    pub success: bool,
}

impl ResolvedChannel {
    pub fn resolved(handle: String, channel_id: String, resolution_url: String) -> Self {
        Self {
            handle,
            channel_id: Some(channel_id),
            resolution_url,
            success: true,
        }
    }

    pub fn failed(handle: String, resolution_url: String) -> Self {
        Self {
            handle,
            channel_id: None,
            resolution_url,
            success: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub uploads_playlist_id: String,
}

/// Metadata for one competitor video, as fetched from the video API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct VideoRecord {
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

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
