use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Long-form competitor video stored for the viral researcher
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ViralVideo {
    pub video_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub title: String,
    pub thumbnail_url: String,
    pub view_count: i64,
    pub duration_seconds: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub video_url: String,
    pub view_bucket: String,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct BucketCount {
    pub view_bucket: String,
    pub video_count: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ScrapedChannel {
    pub channel_id: String,
    pub channel_name: String,
    pub video_count: i64,
    pub last_scraped_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ScrapeReport {
    pub channel_id: String,
    pub channel_name: String,
    pub videos_fetched: usize,
    pub videos_stored: usize,
    /// True when the channel was already ingested and no refresh was requested
    pub skipped: bool,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn viral_video(video_id: &str, views: i64) -> ViralVideo {
        ViralVideo {
            video_id: video_id.to_string(),
            channel_id: "UCaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            channel_name: "Channel A".to_string(),
            title: format!("Viral {}", video_id),
            thumbnail_url: format!("https://img.example/{}.jpg", video_id),
            view_count: views,
            duration_seconds: 720,
            published_at: None,
            video_url: format!("https://www.youtube.com/watch?v={}", video_id),
            view_bucket: crate::utils::view_bucket(views).to_string(),
            scraped_at: Utc::now(),
        }
    }
}
