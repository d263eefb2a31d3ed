//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches, where the
//!   table is patchable
//!
//! Status columns are plain `String`s holding the literals of the
//! `studio_core::status` enums; writers bind `as_str()`.

pub mod character;
pub mod episode;
pub mod generation;
pub mod poster_generation;
pub mod segment;
pub mod series;
pub mod story;
pub mod token_usage;
pub mod wan_story;
