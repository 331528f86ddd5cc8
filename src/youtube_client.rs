// YouTube Data API v3 client for competitor video discovery
// Docs: https://developers.google.com/youtube/v3

use crate::channel_resolver::ResolutionSet;
use crate::models::youtube::{watch_url, ChannelInfo, VideoRecord};
use crate::utils::parse_duration;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

type ApiResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

// ============================================================================
// API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelItem {
    pub id: String,
    pub snippet: ChannelSnippet,
    #[serde(rename = "contentDetails")]
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
pub struct ChannelSnippet {
    pub title: String,
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct Thumbnails {
    pub default: Option<ThumbnailInfo>,
    pub medium: Option<ThumbnailInfo>,
    pub high: Option<ThumbnailInfo>,
    pub maxres: Option<ThumbnailInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailInfo {
    pub url: String,
}

impl Thumbnails {
    /// maxres > high > medium > default
    pub fn best_url(&self) -> Option<String> {
        self.maxres
            .as_ref()
            .or(self.high.as_ref())
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItemsResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub snippet: PlaylistItemSnippet,
    #[serde(rename = "contentDetails")]
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItemSnippet {
    pub title: String,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItemContentDetails {
    #[serde(rename = "videoId")]
    pub video_id: String,
    #[serde(rename = "videoPublishedAt")]
    pub video_published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoDetailsItem>,
}

#[derive(Debug, Deserialize)]
pub struct VideoDetailsItem {
    pub id: String,
    #[serde(rename = "contentDetails")]
    pub content_details: Option<VideoContentDetails>,
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Deserialize)]
pub struct VideoContentDetails {
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideoStatistics {
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
}

/// Playlist entry waiting for its duration and view count
struct PendingVideo {
    title: String,
    thumbnail_url: String,
    published_at: Option<DateTime<Utc>>,
}

// ============================================================================
// YouTube Client Implementation
// ============================================================================

impl YouTubeClient {
    pub fn new(api_key: String, request_timeout: Duration) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_BASE, request_timeout)
    }

    pub fn with_base_url(api_key: String, base_url: &str, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build YouTube HTTP client ({}), using defaults", e);
                Client::new()
            });

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> ApiResult<T> {
        let url = format!("{}/{}", self.base_url, resource);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", &self.api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(format!("YouTube API {} failed ({}): {}", resource, status, error_text).into());
        }

        Ok(response.json::<T>().await?)
    }

    /// Fetch a channel's title, avatar and uploads playlist id.
    pub async fn fetch_channel_info(&self, channel_id: &str) -> ApiResult<Option<ChannelInfo>> {
        let response: ChannelListResponse = self
            .get_json("channels", &[("part", "snippet,contentDetails"), ("id", channel_id)])
            .await?;

        Ok(response.items.into_iter().next().map(|item| ChannelInfo {
            channel_id: item.id,
            title: item.snippet.title,
            thumbnail_url: item.snippet.thumbnails.and_then(|t| t.best_url()),
            uploads_playlist_id: item.content_details.related_playlists.uploads,
        }))
    }

    /// Channel metadata, or `None` when the lookup fails for any reason.
    pub async fn get_channel_info(&self, channel_id: &str) -> Option<ChannelInfo> {
        match self.fetch_channel_info(channel_id).await {
            Ok(Some(info)) => Some(info),
            Ok(None) => {
                tracing::warn!("Channel {} not found", channel_id);
                None
            }
            Err(e) => {
                tracing::error!("Failed to fetch channel info for {}: {}", channel_id, e);
                None
            }
        }
    }

    pub async fn list_playlist_items(
        &self,
        playlist_id: &str,
        max_results: u32,
    ) -> ApiResult<PlaylistItemsResponse> {
        let max_results = max_results.clamp(1, 50).to_string();
        self.get_json(
            "playlistItems",
            &[
                ("part", "snippet,contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", max_results.as_str()),
            ],
        )
        .await
    }

    /// One batched details lookup for up to 50 ids
    pub async fn list_video_details(&self, video_ids: &[String]) -> ApiResult<VideoListResponse> {
        let ids = video_ids.join(",");
        self.get_json("videos", &[("part", "contentDetails,statistics"), ("id", ids.as_str())])
            .await
    }

    /// Most recent uploads of one channel with duration and view counts.
    /// Failures are logged and yield whatever could be assembled.
    pub async fn get_recent_videos(
        &self,
        channel_id: &str,
        channel_name: &str,
        max_results: u32,
    ) -> Vec<VideoRecord> {
        match self.get_channel_info(channel_id).await {
            Some(info) => self.get_uploads(&info, channel_name, max_results).await,
            None => Vec::new(),
        }
    }

    /// Recent uploads for a channel whose metadata is already known, so the
    /// `channels` lookup isn't repeated.
    pub async fn get_uploads(
        &self,
        info: &ChannelInfo,
        channel_name: &str,
        max_results: u32,
    ) -> Vec<VideoRecord> {
        let channel_id = info.channel_id.as_str();

        let playlist = match self.list_playlist_items(&info.uploads_playlist_id, max_results).await {
            Ok(playlist) => playlist,
            Err(e) => {
                tracing::error!("Failed to list uploads for {}: {}", channel_id, e);
                return Vec::new();
            }
        };

        let mut video_ids = Vec::with_capacity(playlist.items.len());
        let mut pending: HashMap<String, PendingVideo> = HashMap::new();
        for item in playlist.items {
            let video_id = item.content_details.video_id;
            let published_at = item
                .content_details
                .video_published_at
                .or(item.snippet.published_at);
            pending.insert(
                video_id.clone(),
                PendingVideo {
                    title: item.snippet.title,
                    thumbnail_url: item.snippet.thumbnails.best_url().unwrap_or_default(),
                    published_at,
                },
            );
            video_ids.push(video_id);
        }

        if video_ids.is_empty() {
            return Vec::new();
        }

        let details = match self.list_video_details(&video_ids).await {
            Ok(details) => details,
            Err(e) => {
                tracing::error!("Failed to fetch video details for {}: {}", channel_id, e);
                return Vec::new();
            }
        };

        let videos: Vec<VideoRecord> = details
            .items
            .into_iter()
            .filter_map(|item| {
                let entry = pending.remove(&item.id)?;
                let duration_seconds = item
                    .content_details
                    .and_then(|c| c.duration)
                    .map(|d| parse_duration(&d));
                let view_count = Some(
                    item.statistics
                        .and_then(|s| s.view_count)
                        .and_then(|v| v.parse::<i64>().ok())
                        .unwrap_or(0),
                );

                Some(VideoRecord {
                    video_url: watch_url(&item.id),
                    video_id: item.id,
                    channel_id: channel_id.to_string(),
                    channel_name: channel_name.to_string(),
                    title: entry.title,
                    thumbnail_url: entry.thumbnail_url,
                    view_count,
                    published_at: entry.published_at,
                    duration_seconds,
                })
            })
            .collect();

        tracing::debug!("Fetched {} videos for {}", videos.len(), channel_id);
        videos
    }

    /// Sequentially fetch recent videos for every successfully resolved channel,
    /// in input order. The creator handle is used as the display name.
    pub async fn get_videos_for_channels(
        &self,
        channels: &ResolutionSet,
        videos_per_channel: u32,
    ) -> Vec<VideoRecord> {
        let mut all_videos = Vec::new();

        for channel in channels.successful() {
            let Some(channel_id) = channel.channel_id.as_deref() else {
                continue;
            };
            let videos = self
                .get_recent_videos(channel_id, &channel.handle, videos_per_channel)
                .await;
            tracing::info!("📺 {} videos from {}", videos.len(), channel.handle);
            all_videos.extend(videos);
        }

        all_videos
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Canned API payloads shared by the client and pipeline tests.

    use serde_json::json;

    pub fn channel_body(channel_id: &str, title: &str) -> String {
        json!({
            "items": [{
                "id": channel_id,
                "snippet": {
                    "title": title,
                    "thumbnails": { "default": { "url": "https://img.example/avatar.jpg" } }
                },
                "contentDetails": { "relatedPlaylists": { "uploads": format!("UU{}", &channel_id[2..]) } }
            }]
        })
        .to_string()
    }

    pub fn playlist_body(video_ids: &[&str]) -> String {
        let items: Vec<_> = video_ids
            .iter()
            .map(|id| {
                json!({
                    "snippet": {
                        "title": format!("Video {}", id),
                        "publishedAt": "2024-01-01T00:00:00Z",
                        "thumbnails": {
                            "high": { "url": format!("https://img.example/{}/high.jpg", id) },
                            "medium": { "url": format!("https://img.example/{}/medium.jpg", id) }
                        }
                    },
                    "contentDetails": { "videoId": id, "videoPublishedAt": "2024-02-01T00:00:00Z" }
                })
            })
            .collect();
        json!({ "items": items }).to_string()
    }

    pub fn details_body(videos: &[(&str, &str, Option<&str>)]) -> String {
        let items: Vec<_> = videos
            .iter()
            .map(|(id, duration, views)| {
                let mut statistics = serde_json::Map::new();
                if let Some(v) = views {
                    statistics.insert("viewCount".into(), json!(v));
                }
                json!({
                    "id": id,
                    "contentDetails": { "duration": duration },
                    "statistics": statistics
                })
            })
            .collect();
        json!({ "items": items }).to_string()
    }
}
