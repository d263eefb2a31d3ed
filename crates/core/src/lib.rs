pub mod ai_json;
pub mod analytics;
pub mod characters;
pub mod error;
pub mod render_progress;
pub mod retry;
pub mod segment_plan;
pub mod status;
pub mod storage;
pub mod styles;
pub mod types;
pub mod usage;
