// Competitor grid assembly: short-form filtering, shuffling and placement of
// the creator's own thumbnail among competitor videos.

use crate::models::youtube::VideoRecord;
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USER_CHANNEL_NAME: &str = "Your Channel";
pub const USER_VIDEO_ID: &str = "user_video";

/// The creator's own candidate thumbnail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserItem {
    pub title: String,
    pub thumbnail_url: String,
    pub channel_avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayItem {
    #[serde(flatten)]
    pub video: VideoRecord,
    pub is_user_item: bool,
    pub channel_avatar: Option<String>,
}

impl DisplayItem {
    pub fn competitor(video: VideoRecord) -> Self {
        Self {
            video,
            is_user_item: false,
            channel_avatar: None,
        }
    }
}

impl From<UserItem> for DisplayItem {
    fn from(user: UserItem) -> Self {
        Self {
            video: VideoRecord {
                video_id: USER_VIDEO_ID.to_string(),
                channel_id: String::new(),
                channel_name: USER_CHANNEL_NAME.to_string(),
                title: user.title,
                thumbnail_url: user.thumbnail_url,
                view_count: None,
                published_at: Some(Utc::now()),
                duration_seconds: None,
                video_url: "#".to_string(),
            },
            is_user_item: true,
            channel_avatar: user.channel_avatar,
        }
    }
}

/// Ordered grid with at most one user item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySet {
    pub items: Vec<DisplayItem>,
    pub user_position: Option<usize>,
}

impl DisplaySet {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn user_item(&self) -> Option<&DisplayItem> {
        self.user_position.and_then(|p| self.items.get(p))
    }

    pub fn user_item_mut(&mut self) -> Option<&mut DisplayItem> {
        self.user_position.and_then(|p| self.items.get_mut(p))
    }
}

/// A cached grid together with the user it belongs to
#[derive(Debug, Clone)]
pub struct GridSession {
    pub user_id: Uuid,
    pub set: DisplaySet,
}

/// Keep long-form videos. Unknown durations are kept.
pub fn filter_long_form(videos: &[VideoRecord], threshold: i64) -> Vec<VideoRecord> {
    videos
        .iter()
        .filter(|v| v.duration_seconds.map_or(true, |d| d >= threshold))
        .cloned()
        .collect()
}

/// Highest index the user item may land on in a grid of `total` items:
/// the last slot of the top two thirds.
pub fn max_user_position(total: usize) -> usize {
    (total * 2 / 3).saturating_sub(1)
}

fn place_user_item<R: Rng>(
    mut competitors: Vec<DisplayItem>,
    user: DisplayItem,
    rng: &mut R,
) -> DisplaySet {
    competitors.shuffle(rng);

    let position = rng.gen_range(0..=max_user_position(competitors.len() + 1));
    competitors.insert(position, user);

    DisplaySet {
        items: competitors,
        user_position: Some(position),
    }
}

/// Filter, shuffle and place the user item within the top two thirds.
pub fn build_display_set<R: Rng>(
    videos: &[VideoRecord],
    user_item: UserItem,
    shorts_threshold: i64,
    rng: &mut R,
) -> DisplaySet {
    let competitors = filter_long_form(videos, shorts_threshold)
        .into_iter()
        .map(DisplayItem::competitor)
        .collect();

    place_user_item(competitors, user_item.into(), rng)
}

/// Reshuffle an existing grid, keeping the user item in the top two thirds.
/// A grid without a user item is simply shuffled.
pub fn reshuffle<R: Rng>(set: DisplaySet, rng: &mut R) -> DisplaySet {
    let (mut users, mut competitors): (Vec<DisplayItem>, Vec<DisplayItem>) =
        set.items.into_iter().partition(|item| item.is_user_item);

    match users.pop() {
        Some(user) => {
            if !users.is_empty() {
                tracing::warn!("Display set had {} extra user items, dropping them", users.len());
            }
            place_user_item(competitors, user, rng)
        }
        None => {
            competitors.shuffle(rng);
            DisplaySet {
                items: competitors,
                user_position: None,
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn video(id: &str, channel: &str, duration: Option<i64>) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            channel_id: channel.to_string(),
            channel_name: format!("@{}", channel),
            title: format!("Title {}", id),
            thumbnail_url: format!("https://img.example/{}.jpg", id),
            view_count: Some(1000),
            published_at: None,
            duration_seconds: duration,
            video_url: format!("https://www.youtube.com/watch?v={}", id),
        }
    }

    pub fn user_item() -> UserItem {
        UserItem {
            title: "My Video".to_string(),
            thumbnail_url: "/uploads/mine.jpg".to_string(),
            channel_avatar: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_filter_long_form_is_deterministic() {
        let videos = vec![
            video("a", "c1", Some(500)),
            video("b", "c1", Some(30)),
            video("c", "c1", Some(60)),
            video("d", "c1", None),
        ];
        let kept: Vec<String> = filter_long_form(&videos, 60)
            .into_iter()
            .map(|v| v.video_id)
            .collect();
        assert_eq!(kept, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_max_user_position() {
        assert_eq!(max_user_position(1), 0);
        assert_eq!(max_user_position(2), 0);
        assert_eq!(max_user_position(3), 1);
        assert_eq!(max_user_position(5), 2);
        assert_eq!(max_user_position(21), 13);
    }

    #[test]
    fn test_two_channels_with_one_short_each() {
        // 2 channels x [500, 30, 700] with a 60s threshold
        let videos = vec![
            video("a1", "c1", Some(500)),
            video("a2", "c1", Some(30)),
            video("a3", "c1", Some(700)),
            video("b1", "c2", Some(500)),
            video("b2", "c2", Some(30)),
            video("b3", "c2", Some(700)),
        ];

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let set = build_display_set(&videos, user_item(), 60, &mut rng);
            assert_eq!(set.len(), 5);
            let position = set.user_position.unwrap();
            assert!(position <= 2);
            assert!(set.items[position].is_user_item);
            assert_eq!(set.items.iter().filter(|i| i.is_user_item).count(), 1);
            assert!(set
                .items
                .iter()
                .all(|i| i.is_user_item || i.video.duration_seconds.unwrap() >= 60));
        }
    }

    #[test]
    fn test_placement_bound_across_sizes() {
        let mut rng = StdRng::seed_from_u64(7);
        for competitors in 0..30usize {
            let videos: Vec<VideoRecord> = (0..competitors)
                .map(|i| video(&format!("v{}", i), "c", Some(600)))
                .collect();
            for _ in 0..50 {
                let set = build_display_set(&videos, user_item(), 60, &mut rng);
                let n = competitors + 1;
                assert_eq!(set.len(), n);
                assert!(set.user_position.unwrap() <= max_user_position(n));
            }
        }
    }

    #[test]
    fn test_empty_competitor_list_places_user_first() {
        let mut rng = StdRng::seed_from_u64(1);
        let set = build_display_set(&[], user_item(), 60, &mut rng);
        assert_eq!(set.len(), 1);
        assert_eq!(set.user_position, Some(0));
        assert_eq!(set.user_item().map(|i| i.video.channel_name.as_str()), Some(USER_CHANNEL_NAME));
    }

    #[test]
    fn test_reshuffle_keeps_items_and_bound() {
        let videos: Vec<VideoRecord> = (0..8)
            .map(|i| video(&format!("v{}", i), "c", Some(600)))
            .collect();
        let mut rng = StdRng::seed_from_u64(42);
        let mut set = build_display_set(&videos, user_item(), 60, &mut rng);

        for _ in 0..100 {
            set = reshuffle(set, &mut rng);
            assert_eq!(set.len(), 9);
            let position = set.user_position.unwrap();
            assert!(position <= max_user_position(9));
            assert!(set.items[position].is_user_item);
        }

        let mut ids: Vec<String> = set.items.iter().map(|i| i.video.video_id.clone()).collect();
        ids.sort();
        let mut expected: Vec<String> = (0..8).map(|i| format!("v{}", i)).collect();
        expected.push(USER_VIDEO_ID.to_string());
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_reshuffle_without_user_item() {
        let set = DisplaySet {
            items: (0..4)
                .map(|i| DisplayItem::competitor(video(&format!("v{}", i), "c", Some(600))))
                .collect(),
            user_position: None,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let shuffled = reshuffle(set, &mut rng);
        assert_eq!(shuffled.len(), 4);
        assert!(shuffled.user_position.is_none());
    }
}
