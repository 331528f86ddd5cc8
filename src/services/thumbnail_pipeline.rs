// Thumbnail tester pipeline: persona -> suggested channels -> resolved ids -> recent videos

use crate::ai::AiOutcome;
use crate::channel_resolver::{ChannelResolver, ResolutionSet};
use crate::config::Settings;
use crate::error::PipelineError;
use crate::models::youtube::VideoRecord;
use crate::services::channel_suggestions::ChannelSuggester;
use crate::youtube_client::YouTubeClient;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_channels: usize,
    pub videos_per_channel: u32,
    pub max_workers: usize,
    pub resolve_deadline: Option<Duration>,
}

impl From<&Settings> for PipelineOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            max_channels: settings.max_channels,
            videos_per_channel: settings.videos_per_channel,
            max_workers: settings.max_workers,
            resolve_deadline: settings.resolve_deadline,
        }
    }
}

#[derive(Debug)]
pub struct CollectedVideos {
    pub suggestions: AiOutcome<Vec<String>>,
    pub channels: ResolutionSet,
    pub unresolved: usize,
    /// Every fetched video, shorts included
    pub videos: Vec<VideoRecord>,
}

pub struct ThumbnailPipeline {
    suggester: ChannelSuggester,
    resolver: ChannelResolver,
    youtube: YouTubeClient,
    options: PipelineOptions,
}

impl ThumbnailPipeline {
    pub fn new(
        suggester: ChannelSuggester,
        resolver: ChannelResolver,
        youtube: YouTubeClient,
        options: PipelineOptions,
    ) -> Self {
        Self {
            suggester,
            resolver,
            youtube,
            options,
        }
    }

    pub async fn collect(&self, persona: &str) -> Result<CollectedVideos, PipelineError> {
        let suggestions = self.suggester.suggest(persona, self.options.max_channels).await;
        if suggestions.value().is_empty() {
            return Err(PipelineError::NoChannelSuggestions);
        }
        tracing::info!(
            "🔎 {} channel suggestions ({})",
            suggestions.value().len(),
            suggestions.source()
        );

        let channels = self
            .resolver
            .resolve_many(
                suggestions.value(),
                self.options.max_workers,
                self.options.resolve_deadline,
            )
            .await;

        let resolved = channels.successful().count();
        if resolved == 0 {
            return Err(PipelineError::NoChannelsResolved {
                attempted: channels.len(),
            });
        }

        let videos = self
            .youtube
            .get_videos_for_channels(&channels, self.options.videos_per_channel)
            .await;
        if videos.is_empty() {
            return Err(PipelineError::NoVideosFetched { channels: resolved });
        }

        Ok(CollectedVideos {
            suggestions,
            unresolved: channels.unresolved_count(),
            channels,
            videos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::test_support::StubGenerator;
    use crate::display::{build_display_set, max_user_position, UserItem};
    use crate::youtube_client::test_support::{channel_body, details_body, playlist_body};
    use mockito::{Matcher, Server, ServerGuard};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const VALID_ID: &str = "UCX6OQ3DkcsbYNE6H8uQQuVA";

    fn options() -> PipelineOptions {
        PipelineOptions {
            max_channels: 10,
            videos_per_channel: 3,
            max_workers: 4,
            resolve_deadline: Some(Duration::from_secs(10)),
        }
    }

    fn pipeline(server: &ServerGuard, reply: &str) -> ThumbnailPipeline {
        let timeout = Duration::from_secs(5);
        ThumbnailPipeline::new(
            ChannelSuggester::new(vec![StubGenerator::replying(reply)]),
            ChannelResolver::with_base_url(&server.url(), timeout),
            YouTubeClient::with_base_url("k".into(), &server.url(), timeout),
            options(),
        )
    }

    #[tokio::test]
    async fn test_collect_continues_with_resolved_subset() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/@validhandle")
            .with_status(200)
            .with_body(format!(r#""externalId":"{}""#, VALID_ID))
            .create_async()
            .await;
        server
            .mock("GET", "/@doesnotexist12345")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/channels")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(channel_body(VALID_ID, "Valid"))
            .create_async()
            .await;
        server
            .mock("GET", "/playlistItems")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(playlist_body(&["a", "b", "c"]))
            .create_async()
            .await;
        server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(details_body(&[
                ("a", "PT8M20S", Some("10")),
                ("b", "PT30S", Some("20")),
                ("c", "PT11M40S", Some("30")),
            ]))
            .create_async()
            .await;

        let collected = pipeline(&server, r#"["@doesnotexist12345", "@validhandle"]"#)
            .collect("indie game devs")
            .await
            .unwrap();

        assert!(!collected.suggestions.is_fallback());
        assert_eq!(collected.channels.len(), 2);
        assert_eq!(collected.unresolved, 1);
        assert_eq!(collected.videos.len(), 3);
        assert!(collected.videos.iter().all(|v| v.channel_id == VALID_ID));

        let user = UserItem {
            title: "Mine".into(),
            thumbnail_url: "/uploads/mine.jpg".into(),
            channel_avatar: None,
        };
        let set = build_display_set(&collected.videos, user, 60, &mut StdRng::seed_from_u64(5));
        assert_eq!(set.len(), 3);
        let position = set.user_position.unwrap();
        assert!(position <= max_user_position(3));
    }

    #[tokio::test]
    async fn test_collect_fails_when_nothing_resolves() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/@".into()))
            .with_status(404)
            .create_async()
            .await;

        let err = pipeline(&server, r#"["@nope1", "@nope2"]"#)
            .collect("anyone")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoChannelsResolved { attempted: 2 }));
    }

    #[tokio::test]
    async fn test_collect_fails_without_videos() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/@validhandle")
            .with_status(200)
            .with_body(format!("https://www.youtube.com/channel/{}", VALID_ID))
            .create_async()
            .await;
        server
            .mock("GET", "/channels")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let err = pipeline(&server, r#"["@validhandle"]"#)
            .collect("anyone")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoVideosFetched { channels: 1 }));
    }
}
