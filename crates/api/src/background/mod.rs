//! Background tasks started with the server.
//!
//! Each submodule provides an async function intended to be spawned via
//! `tokio::spawn` or awaited once at startup.

pub mod video_resume;
