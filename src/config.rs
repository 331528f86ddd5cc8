// Runtime configuration loaded from the environment (and `.env` via dotenvy)

use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub youtube_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub jwt_secret: Option<String>,

    pub gemini_model: String,
    pub claude_model: String,

    // Thumbnail tester pipeline
    pub max_channels: usize,
    pub videos_per_channel: u32,
    pub max_workers: usize,
    pub request_timeout: Duration,
    pub resolve_deadline: Option<Duration>,
    /// Display-time short-form cutoff in seconds
    pub shorts_duration_threshold: i64,

    // Viral researcher ingestion
    /// Ingestion-time minimum duration in seconds, stricter than the display cutoff
    pub video_min_duration: i64,
    pub max_videos_per_channel: u32,

    pub session_ttl: Duration,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            youtube_api_key: None,
            gemini_api_key: None,
            anthropic_api_key: None,
            jwt_secret: None,
            gemini_model: "gemini-2.0-flash".to_string(),
            claude_model: "claude-3-5-sonnet-20241022".to_string(),
            max_channels: 10,
            videos_per_channel: 2,
            max_workers: 10,
            request_timeout: Duration::from_secs(10),
            resolve_deadline: None,
            shorts_duration_threshold: 60,
            video_min_duration: 300,
            max_videos_per_channel: 50,
            session_ttl: Duration::from_secs(3600),
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();

        let youtube_api_key = get("GOOGLE_API_KEY").or_else(|| get("YOUTUBE_API_KEY"));

        Self {
            database_url: get("DATABASE_URL"),
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| youtube_api_key.clone()),
            youtube_api_key,
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            jwt_secret: get("SUPABASE_JWT_SECRET"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            claude_model: get("CLAUDE_MODEL").unwrap_or(defaults.claude_model),
            max_channels: parse_or(&get, "MAX_CHANNELS", defaults.max_channels),
            videos_per_channel: parse_or(&get, "VIDEOS_PER_CHANNEL", defaults.videos_per_channel),
            max_workers: parse_or(&get, "MAX_WORKERS", defaults.max_workers).max(1),
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT", 10u64)),
            resolve_deadline: get("RESOLVE_DEADLINE")
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs),
            shorts_duration_threshold: parse_or(
                &get,
                "SHORTS_DURATION_THRESHOLD",
                defaults.shorts_duration_threshold,
            ),
            video_min_duration: parse_or(&get, "VIDEO_MIN_DURATION", defaults.video_min_duration),
            max_videos_per_channel: parse_or(
                &get,
                "MAX_VIDEOS_PER_CHANNEL",
                defaults.max_videos_per_channel,
            )
            .min(50),
            session_ttl: Duration::from_secs(parse_or(&get, "SESSION_TTL", 3600u64)),
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid value for {}: {:?}, using default {}", key, raw, default);
                default
            }
        },
        None => default,
    }
}
