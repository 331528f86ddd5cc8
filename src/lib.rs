// lib.rs - Context engine library: pipeline components, AI adapters and HTTP handlers
pub mod ai;
pub mod cache;
pub mod channel_resolver;
pub mod claude_client;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod gemini_client;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;
pub mod youtube_client;

use ai::SharedGenerator;
use cache::TtlCache;
use channel_resolver::ChannelResolver;
use claude_client::ClaudeClient;
use config::Settings;
use display::GridSession;
use gemini_client::GeminiClient;
use models::ai::Angle;
use std::sync::Arc;
use uuid::Uuid;
use youtube_client::YouTubeClient;

// AppState holds the database pool, settings, API clients and the in-process caches
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub settings: Settings,
    pub resolver: ChannelResolver,
    pub youtube_client: Option<YouTubeClient>,
    pub gemini_client: Option<GeminiClient>,
    pub claude_client: Option<ClaudeClient>,
    pub sessions: TtlCache<Uuid, GridSession>, // Display grids keyed by test id
    pub angle_cache: TtlCache<String, Vec<Angle>>, // Generated angles keyed by video id
}

impl AppState {
    fn gemini(&self) -> Option<SharedGenerator> {
        self.gemini_client
            .clone()
            .map(|c| Arc::new(c) as SharedGenerator)
    }

    fn claude(&self) -> Option<SharedGenerator> {
        self.claude_client
            .clone()
            .map(|c| Arc::new(c) as SharedGenerator)
    }

    /// Gemini, then Claude (channel suggestions, research synthesis)
    pub fn gemini_first(&self) -> Vec<SharedGenerator> {
        self.gemini().into_iter().chain(self.claude()).collect()
    }

    /// Claude, then Gemini (angles, scripts)
    pub fn claude_first(&self) -> Vec<SharedGenerator> {
        self.claude().into_iter().chain(self.gemini()).collect()
    }
}
