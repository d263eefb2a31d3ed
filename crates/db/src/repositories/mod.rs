//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Multi-row creations run in
//! a single transaction so a failure leaves no partial parent behind.

pub mod character_repo;
pub mod episode_repo;
pub mod generation_repo;
pub mod poster_generation_repo;
pub mod segment_repo;
pub mod series_repo;
pub mod story_repo;
pub mod token_usage_repo;
pub mod wan_story_repo;

pub use character_repo::CharacterRepo;
pub use episode_repo::EpisodeRepo;
pub use generation_repo::GenerationRepo;
pub use poster_generation_repo::{CharacterVisualGenerationRepo, SeriesPosterGenerationRepo};
pub use segment_repo::SegmentRepo;
pub use series_repo::SeriesRepo;
pub use story_repo::StoryRepo;
pub use token_usage_repo::TokenUsageRepo;
pub use wan_story_repo::{WanStoryRepo, WanStorySegmentRepo};
