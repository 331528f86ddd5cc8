// Persistence of thumbnail test runs: discovered channels, the raw video audit
// log, and the arrangement shown to the creator.

use crate::channel_resolver::ResolutionSet;
use crate::display::{DisplayItem, DisplaySet, USER_VIDEO_ID};
use crate::models::thumbnail_test::{
    NewThumbnailTest, TestVideoRow, ThumbnailTest, STATUS_COMPLETED, STATUS_FAILED,
    STATUS_PROCESSING,
};
use crate::models::youtube::VideoRecord;
use crate::utils::is_short;
use sqlx::PgPool;
use uuid::Uuid;

/// `youtube_videos` id of the creator's own item in a test
pub fn user_video_id(test_id: Uuid) -> String {
    format!("{}_{}", USER_VIDEO_ID, test_id)
}

pub fn user_channel_id(user_id: Uuid) -> String {
    format!("user_channel_{}", user_id)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrangementRow {
    pub video_id: String,
    pub position: i32,
    pub is_user_video: bool,
}

/// `test_videos` rows for a display set, one per position
pub fn arrangement_rows(test_id: Uuid, set: &DisplaySet) -> Vec<ArrangementRow> {
    set.items
        .iter()
        .enumerate()
        .map(|(position, item)| ArrangementRow {
            video_id: if item.is_user_item {
                user_video_id(test_id)
            } else {
                item.video.video_id.clone()
            },
            position: position as i32,
            is_user_video: item.is_user_item,
        })
        .collect()
}

/// Rebuild a display set from persisted rows. Only the first user row is
/// treated as the user item.
pub fn display_set_from_rows(mut rows: Vec<TestVideoRow>, avatar: Option<String>) -> DisplaySet {
    rows.sort_by_key(|row| row.position);

    let mut user_position = None;
    let items = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            let is_user_item = row.is_user_video && user_position.is_none();
            if is_user_item {
                user_position = Some(index);
            }
            DisplayItem {
                video: VideoRecord {
                    video_id: if is_user_item { USER_VIDEO_ID.to_string() } else { row.video_id },
                    channel_id: if is_user_item { String::new() } else { row.channel_id },
                    channel_name: row.channel_name,
                    title: row.title,
                    thumbnail_url: row.thumbnail_url,
                    view_count: row.view_count,
                    published_at: row.published_at,
                    duration_seconds: row.duration_seconds,
                    video_url: row.video_url,
                },
                is_user_item,
                channel_avatar: if is_user_item { avatar.clone() } else { None },
            }
        })
        .collect();

    DisplaySet { items, user_position }
}

#[derive(Clone)]
pub struct TestRunStore {
    pool: PgPool,
}

impl TestRunStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_channels(&self, channels: &ResolutionSet) -> Result<usize, sqlx::Error> {
        let mut stored = 0;
        for channel in channels.successful() {
            let Some(channel_id) = channel.channel_id.as_deref() else {
                continue;
            };
            sqlx::query(
                r#"
                INSERT INTO youtube_channels (channel_id, channel_name, channel_handle)
                VALUES ($1, $2, $3)
                ON CONFLICT (channel_id) DO UPDATE
                SET channel_name = EXCLUDED.channel_name,
                    channel_handle = EXCLUDED.channel_handle,
                    updated_at = NOW()
                "#,
            )
            .bind(channel_id)
            .bind(&channel.handle)
            .bind(&channel.handle)
            .execute(&self.pool)
            .await?;
            stored += 1;
        }
        Ok(stored)
    }

    async fn upsert_video(&self, video: &VideoRecord, is_short: bool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO youtube_videos (
                video_id, channel_id, channel_name, title, thumbnail_url,
                view_count, published_at, duration_seconds, video_url, is_short
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (video_id) DO UPDATE
            SET title = EXCLUDED.title,
                thumbnail_url = EXCLUDED.thumbnail_url,
                view_count = EXCLUDED.view_count,
                duration_seconds = EXCLUDED.duration_seconds,
                is_short = EXCLUDED.is_short,
                updated_at = NOW()
            "#,
        )
        .bind(&video.video_id)
        .bind(&video.channel_id)
        .bind(&video.channel_name)
        .bind(&video.title)
        .bind(&video.thumbnail_url)
        .bind(video.view_count)
        .bind(video.published_at)
        .bind(video.duration_seconds)
        .bind(&video.video_url)
        .bind(is_short)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Every fetched video, shorts included, flagged with `is_short`
    pub async fn upsert_videos(
        &self,
        videos: &[VideoRecord],
        shorts_threshold: i64,
    ) -> Result<usize, sqlx::Error> {
        for video in videos {
            self.upsert_video(video, is_short(video.duration_seconds, shorts_threshold))
                .await?;
        }
        Ok(videos.len())
    }

    pub async fn create_test(&self, new: &NewThumbnailTest) -> Result<Uuid, sqlx::Error> {
        let test_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO thumbnail_tests (
                id, user_id, persona, video_title, thumbnail_path, avatar_path, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(test_id)
        .bind(new.user_id)
        .bind(&new.persona)
        .bind(&new.video_title)
        .bind(&new.thumbnail_path)
        .bind(&new.avatar_path)
        .bind(STATUS_PROCESSING)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Created thumbnail test {}", test_id);
        Ok(test_id)
    }

    /// Replace the stored arrangement of a test with `set`
    pub async fn save_arrangement(
        &self,
        test_id: Uuid,
        user_id: Uuid,
        set: &DisplaySet,
    ) -> Result<(), sqlx::Error> {
        if let Some(user) = set.user_item() {
            let mut record = user.video.clone();
            record.video_id = user_video_id(test_id);
            record.channel_id = user_channel_id(user_id);
            self.upsert_video(&record, false).await?;
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM test_videos WHERE test_id = $1")
            .bind(test_id)
            .execute(&mut *tx)
            .await?;

        for row in arrangement_rows(test_id, set) {
            sqlx::query(
                "INSERT INTO test_videos (test_id, video_id, position, is_user_video) VALUES ($1, $2, $3, $4)",
            )
            .bind(test_id)
            .bind(&row.video_id)
            .bind(row.position)
            .bind(row.is_user_video)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE thumbnail_tests SET user_position = $1 WHERE id = $2")
            .bind(set.user_position.map(|p| p as i32))
            .bind(test_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }

    pub async fn complete_test(
        &self,
        test_id: Uuid,
        channels_discovered: &[String],
        total_videos_fetched: usize,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE thumbnail_tests
            SET status = $1, channels_discovered = $2, total_videos_fetched = $3, completed_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(STATUS_COMPLETED)
        .bind(channels_discovered)
        .bind(total_videos_fetched as i32)
        .bind(test_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, test_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE thumbnail_tests SET status = $1, completed_at = NOW() WHERE id = $2")
            .bind(STATUS_FAILED)
            .bind(test_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// A test owned by `user_id`
    pub async fn load_test(
        &self,
        test_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ThumbnailTest>, sqlx::Error> {
        sqlx::query_as::<_, ThumbnailTest>(
            "SELECT * FROM thumbnail_tests WHERE id = $1 AND user_id = $2",
        )
        .bind(test_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn latest_test(&self, user_id: Uuid) -> Result<Option<ThumbnailTest>, sqlx::Error> {
        sqlx::query_as::<_, ThumbnailTest>(
            r#"
            SELECT * FROM thumbnail_tests
            WHERE user_id = $1 AND status = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(STATUS_COMPLETED)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn load_arrangement(&self, test: &ThumbnailTest) -> Result<DisplaySet, sqlx::Error> {
        let rows = sqlx::query_as::<_, TestVideoRow>(
            r#"
            SELECT tv.position, tv.is_user_video,
                   v.video_id, v.channel_id, v.channel_name, v.title, v.thumbnail_url,
                   v.view_count, v.published_at, v.duration_seconds, v.video_url
            FROM test_videos tv
            JOIN youtube_videos v ON v.video_id = tv.video_id
            WHERE tv.test_id = $1
            ORDER BY tv.position
            "#,
        )
        .bind(test.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(display_set_from_rows(rows, test.avatar_path.clone()))
    }

    /// Rename the creator's item. Returns false when the test is not the user's.
    pub async fn update_title(
        &self,
        test_id: Uuid,
        user_id: Uuid,
        title: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE thumbnail_tests SET video_title = $1 WHERE id = $2 AND user_id = $3",
        )
        .bind(title)
        .bind(test_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE youtube_videos SET title = $1, updated_at = NOW() WHERE video_id = $2")
            .bind(title)
            .bind(user_video_id(test_id))
            .execute(&self.pool)
            .await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::build_display_set;
    use crate::display::test_support::{user_item, video};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn row_from(test_id: Uuid, item: &DisplayItem, position: i32) -> TestVideoRow {
        TestVideoRow {
            position,
            is_user_video: item.is_user_item,
            video_id: if item.is_user_item {
                user_video_id(test_id)
            } else {
                item.video.video_id.clone()
            },
            channel_id: item.video.channel_id.clone(),
            channel_name: item.video.channel_name.clone(),
            title: item.video.title.clone(),
            thumbnail_url: item.video.thumbnail_url.clone(),
            view_count: item.video.view_count,
            published_at: item.video.published_at,
            duration_seconds: item.video.duration_seconds,
            video_url: item.video.video_url.clone(),
        }
    }

    #[test]
    fn test_arrangement_rows_use_per_test_user_id() {
        let test_id = Uuid::new_v4();
        let videos = vec![video("a", "@one", Some(500)), video("b", "@two", Some(700))];
        let set = build_display_set(&videos, user_item(), 60, &mut StdRng::seed_from_u64(3));

        let rows = arrangement_rows(test_id, &set);
        assert_eq!(rows.len(), 3);
        let user_rows: Vec<_> = rows.iter().filter(|r| r.is_user_video).collect();
        assert_eq!(user_rows.len(), 1);
        assert_eq!(user_rows[0].video_id, format!("user_video_{}", test_id));
        assert_eq!(Some(user_rows[0].position as usize), set.user_position);
    }

    #[test]
    fn test_display_set_rebuilt_from_unordered_rows() {
        let test_id = Uuid::new_v4();
        let videos = vec![
            video("a", "@one", Some(500)),
            video("b", "@one", Some(700)),
            video("c", "@two", Some(900)),
        ];
        let set = build_display_set(&videos, user_item(), 60, &mut StdRng::seed_from_u64(11));

        let mut rows: Vec<TestVideoRow> = set
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| row_from(test_id, item, i as i32))
            .collect();
        rows.reverse();

        let avatar = set.user_item().and_then(|u| u.channel_avatar.clone());
        let rebuilt = display_set_from_rows(rows, avatar);
        assert_eq!(rebuilt.user_position, set.user_position);
        let ids: Vec<_> = rebuilt.items.iter().map(|i| i.video.video_id.as_str()).collect();
        let expected: Vec<_> = set.items.iter().map(|i| i.video.video_id.as_str()).collect();
        assert_eq!(ids, expected);
        assert_eq!(rebuilt.user_item().unwrap().video.video_id, USER_VIDEO_ID);
    }

    #[test]
    fn test_display_set_from_rows_without_user_item() {
        let test_id = Uuid::new_v4();
        let item = DisplayItem::competitor(video("a", "@one", Some(500)));
        let rebuilt = display_set_from_rows(vec![row_from(test_id, &item, 0)], None);
        assert_eq!(rebuilt.user_position, None);
        assert_eq!(rebuilt.len(), 1);
    }
}
