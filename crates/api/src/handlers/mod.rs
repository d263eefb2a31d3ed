//! HTTP request handlers, one module per resource.

pub mod activity;
pub mod characters;
pub mod episodes;
pub mod segments;
pub mod series;
pub mod stories;
pub mod usage;
pub mod wan;
