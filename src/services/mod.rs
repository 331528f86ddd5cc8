// src/services/mod.rs
pub mod angle_generator;
pub mod channel_suggestions;
pub mod creator_store;
pub mod research_synthesis;
pub mod script_generator;
pub mod test_store;
pub mod thumbnail_pipeline;
pub mod viral_videos;

pub use angle_generator::AngleGenerator;
pub use channel_suggestions::ChannelSuggester;
pub use creator_store::CreatorStore;
pub use research_synthesis::ResearchSynthesizer;
pub use script_generator::ScriptGenerator;
pub use test_store::TestRunStore;
pub use thumbnail_pipeline::ThumbnailPipeline;
pub use viral_videos::{ViralScraper, ViralVideoStore};
