// Viral video ingestion: scrape a channel's recent long-form uploads into the
// bucketed `viral_videos` table and query them back.

use crate::channel_resolver::{is_channel_id, ChannelResolver};
use crate::error::ApiError;
use crate::models::viral::{BucketCount, ScrapeReport, ScrapedChannel, ViralVideo};
use crate::models::youtube::VideoRecord;
use crate::utils::{view_bucket, VIEW_BUCKETS};
use crate::youtube_client::YouTubeClient;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::collections::HashMap;

/// Long-form videos published on or after `cutoff`, tagged with their view
/// bucket. Videos with unknown duration or date are dropped.
pub fn select_viral_candidates(
    videos: Vec<VideoRecord>,
    min_duration: i64,
    cutoff: DateTime<Utc>,
    scraped_at: DateTime<Utc>,
) -> Vec<ViralVideo> {
    videos
        .into_iter()
        .filter_map(|video| {
            let duration_seconds = video.duration_seconds.filter(|d| *d >= min_duration)?;
            let published_at = video.published_at.filter(|p| *p >= cutoff)?;
            let view_count = video.view_count.unwrap_or(0);

            Some(ViralVideo {
                view_bucket: view_bucket(view_count).to_string(),
                video_id: video.video_id,
                channel_id: video.channel_id,
                channel_name: video.channel_name,
                title: video.title,
                thumbnail_url: video.thumbnail_url,
                view_count,
                duration_seconds,
                published_at: Some(published_at),
                video_url: video.video_url,
                scraped_at,
            })
        })
        .collect()
}

/// Bucket counts in tier order, with empty tiers reported as zero
pub fn ordered_bucket_counts(rows: Vec<BucketCount>) -> Vec<BucketCount> {
    let counts: HashMap<String, i64> = rows
        .into_iter()
        .map(|row| (row.view_bucket, row.video_count))
        .collect();

    VIEW_BUCKETS
        .iter()
        .map(|bucket| BucketCount {
            view_bucket: bucket.to_string(),
            video_count: counts.get(*bucket).copied().unwrap_or(0),
        })
        .collect()
}

#[derive(Clone)]
pub struct ViralVideoStore {
    pool: PgPool,
}

impl ViralVideoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn channel_exists(&self, channel_id: &str) -> Result<bool, sqlx::Error> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM viral_videos WHERE channel_id = $1)")
                .bind(channel_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    pub async fn upsert(&self, video: &ViralVideo) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO viral_videos (
                video_id, channel_id, channel_name, title, thumbnail_url, view_count,
                duration_seconds, published_at, video_url, view_bucket, scraped_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (video_id) DO UPDATE
            SET title = EXCLUDED.title,
                thumbnail_url = EXCLUDED.thumbnail_url,
                view_count = EXCLUDED.view_count,
                view_bucket = EXCLUDED.view_bucket,
                scraped_at = EXCLUDED.scraped_at
            "#,
        )
        .bind(&video.video_id)
        .bind(&video.channel_id)
        .bind(&video.channel_name)
        .bind(&video.title)
        .bind(&video.thumbnail_url)
        .bind(video.view_count)
        .bind(video.duration_seconds)
        .bind(video.published_at)
        .bind(&video.video_url)
        .bind(&video.view_bucket)
        .bind(video.scraped_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, video_id: &str) -> Result<Option<ViralVideo>, sqlx::Error> {
        sqlx::query_as::<_, ViralVideo>("SELECT * FROM viral_videos WHERE video_id = $1")
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Most viewed first; both filters are optional
    pub async fn list(
        &self,
        channel_id: Option<&str>,
        bucket: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ViralVideo>, sqlx::Error> {
        sqlx::query_as::<_, ViralVideo>(
            r#"
            SELECT * FROM viral_videos
            WHERE ($1::TEXT IS NULL OR channel_id = $1)
              AND ($2::TEXT IS NULL OR view_bucket = $2)
            ORDER BY view_count DESC
            LIMIT $3
            "#,
        )
        .bind(channel_id)
        .bind(bucket)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn bucket_counts(&self) -> Result<Vec<BucketCount>, sqlx::Error> {
        let rows = sqlx::query_as::<_, BucketCount>(
            "SELECT view_bucket, COUNT(*) AS video_count FROM viral_videos GROUP BY view_bucket",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ordered_bucket_counts(rows))
    }

    pub async fn channels(&self) -> Result<Vec<ScrapedChannel>, sqlx::Error> {
        sqlx::query_as::<_, ScrapedChannel>(
            r#"
            SELECT channel_id,
                   MAX(channel_name) AS channel_name,
                   COUNT(*) AS video_count,
                   MAX(scraped_at) AS last_scraped_at
            FROM viral_videos
            GROUP BY channel_id
            ORDER BY last_scraped_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}

/// Videos fetched for one channel before persistence
#[derive(Debug)]
pub struct FetchedChannel {
    pub channel_id: String,
    pub channel_name: String,
    pub videos_fetched: usize,
    pub candidates: Vec<ViralVideo>,
}

pub struct ViralScraper {
    resolver: ChannelResolver,
    youtube: YouTubeClient,
    min_duration: i64,
    max_videos: u32,
}

impl ViralScraper {
    pub fn new(
        resolver: ChannelResolver,
        youtube: YouTubeClient,
        min_duration: i64,
        max_videos: u32,
    ) -> Self {
        Self {
            resolver,
            youtube,
            min_duration,
            max_videos,
        }
    }

    /// Bare channel ids pass through; anything else goes through the resolver.
    pub async fn channel_id_for(&self, input: &str) -> Result<String, ApiError> {
        let input = input.trim();
        if is_channel_id(input) {
            return Ok(input.to_string());
        }

        self.resolver
            .resolve(input)
            .await
            .channel_id
            .ok_or_else(|| ApiError::BadRequest(format!("Could not resolve channel '{}'", input)))
    }

    pub async fn fetch(&self, channel_id: &str, days: i64) -> Result<FetchedChannel, ApiError> {
        let now = Utc::now();
        let cutoff = Duration::try_days(days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| ApiError::BadRequest(format!("days out of range: {}", days)))?;

        let info = self.youtube.get_channel_info(channel_id).await.ok_or_else(|| {
            ApiError::NotFound(format!("Channel {} not found on YouTube", channel_id))
        })?;

        let videos = self
            .youtube
            .get_uploads(&info, &info.title, self.max_videos)
            .await;
        let videos_fetched = videos.len();

        let candidates = select_viral_candidates(videos, self.min_duration, cutoff, now);

        tracing::info!(
            "📈 {}: {} of {} videos qualify (>= {}s, last {} days)",
            info.title,
            candidates.len(),
            videos_fetched,
            self.min_duration,
            days
        );

        Ok(FetchedChannel {
            channel_id: channel_id.to_string(),
            channel_name: info.title,
            videos_fetched,
            candidates,
        })
    }

    pub async fn scrape_channel(
        &self,
        store: &ViralVideoStore,
        input: &str,
        days: i64,
        force_refresh: bool,
    ) -> Result<ScrapeReport, ApiError> {
        let channel_id = self.channel_id_for(input).await?;

        if !force_refresh && store.channel_exists(&channel_id).await? {
            tracing::info!("Channel {} already scraped, skipping", channel_id);
            return Ok(ScrapeReport {
                channel_name: channel_id.clone(),
                channel_id,
                videos_fetched: 0,
                videos_stored: 0,
                skipped: true,
            });
        }

        let fetched = self.fetch(&channel_id, days).await?;
        for video in &fetched.candidates {
            store.upsert(video).await?;
        }

        Ok(ScrapeReport {
            channel_id: fetched.channel_id,
            channel_name: fetched.channel_name,
            videos_fetched: fetched.videos_fetched,
            videos_stored: fetched.candidates.len(),
            skipped: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::test_support::video;
    use crate::youtube_client::test_support::{channel_body, details_body, playlist_body};
    use mockito::{Matcher, Server};
    use std::time::Duration as StdDuration;

    const CHANNEL: &str = "UCaaaaaaaaaaaaaaaaaaaaaa";

    #[test]
    fn test_select_viral_candidates_filters_duration_and_age() {
        let now = Utc::now();
        let cutoff = now - Duration::days(30);

        let mut long_recent = video("long", "c", Some(600));
        long_recent.published_at = Some(now - Duration::days(3));
        long_recent.view_count = Some(75_000);

        let mut short_recent = video("short", "c", Some(120));
        short_recent.published_at = Some(now - Duration::days(3));

        let mut long_old = video("old", "c", Some(900));
        long_old.published_at = Some(now - Duration::days(90));

        let undated = video("undated", "c", Some(900));

        let picked = select_viral_candidates(
            vec![long_recent, short_recent, long_old, undated],
            300,
            cutoff,
            now,
        );
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].video_id, "long");
        assert_eq!(picked[0].view_bucket, "50-100k");
        assert_eq!(picked[0].duration_seconds, 600);
    }

    #[test]
    fn test_ordered_bucket_counts_fill_missing_tiers() {
        let rows = vec![
            BucketCount { view_bucket: "1M+".into(), video_count: 2 },
            BucketCount { view_bucket: "under-5k".into(), video_count: 7 },
        ];
        let counts = ordered_bucket_counts(rows);
        assert_eq!(counts.len(), VIEW_BUCKETS.len());
        assert_eq!(counts[0].view_bucket, "under-5k");
        assert_eq!(counts[0].video_count, 7);
        assert_eq!(counts[5].video_count, 2);
        assert_eq!(counts[2].video_count, 0);
    }

    #[tokio::test]
    async fn test_fetch_keeps_long_form_only() {
        let mut server = Server::new_async().await;
        let channels = server
            .mock("GET", "/channels")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(channel_body(CHANNEL, "Channel A"))
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/playlistItems")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(playlist_body(&["v1", "v2"]))
            .create_async()
            .await;
        server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(details_body(&[("v1", "PT12M", Some("2000000")), ("v2", "PT45S", Some("10"))]))
            .create_async()
            .await;

        let timeout = StdDuration::from_secs(5);
        let scraper = ViralScraper::new(
            ChannelResolver::with_base_url(&server.url(), timeout),
            YouTubeClient::with_base_url("k".into(), &server.url(), timeout),
            300,
            50,
        );

        // Fixture videos are dated 2024-02-01; a wide window keeps them in range
        let fetched = scraper.fetch(CHANNEL, 365 * 50).await.unwrap();
        assert_eq!(fetched.channel_name, "Channel A");
        assert_eq!(fetched.videos_fetched, 2);
        assert_eq!(fetched.candidates.len(), 1);
        assert_eq!(fetched.candidates[0].view_bucket, "1M+");
        // Channel metadata is looked up once per scrape
        channels.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_rejects_out_of_range_window() {
        let mut server = Server::new_async().await;
        let channels = server
            .mock("GET", "/channels")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let timeout = StdDuration::from_secs(5);
        let scraper = ViralScraper::new(
            ChannelResolver::with_base_url(&server.url(), timeout),
            YouTubeClient::with_base_url("k".into(), &server.url(), timeout),
            300,
            50,
        );

        for days in [1_000_000_000_000_000, i64::MAX, 3_000_000_000] {
            let err = scraper.fetch(CHANNEL, days).await.unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
        channels.assert_async().await;
    }

    #[tokio::test]
    async fn test_channel_id_for_unresolvable_handle() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/@nobody")
            .with_status(404)
            .create_async()
            .await;

        let timeout = StdDuration::from_secs(5);
        let scraper = ViralScraper::new(
            ChannelResolver::with_base_url(&server.url(), timeout),
            YouTubeClient::with_base_url("k".into(), &server.url(), timeout),
            300,
            50,
        );

        assert_eq!(scraper.channel_id_for(CHANNEL).await.unwrap(), CHANNEL);
        let err = scraper.channel_id_for("@nobody").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
