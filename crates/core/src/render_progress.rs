//! Progress estimate for ClipCraft render jobs.
//!
//! The renderer reports either a number or a free-text phase message such as
//! `"Phase 2/4: Rendering segment 3/6"`. Text messages are mapped onto a
//! 0-100 scale: phase 1 covers 0-25, phase 2 covers 25-50, phase 3 sits at
//! 60/70, phase 4 at 85, and `"Done"` is 100. All wording-dependent matching
//! lives in this module.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)segment (\d+)/(\d+)").expect("valid regex"));

/// Progress value as returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RenderProgress {
    Percent(f64),
    Phase(String),
}

impl RenderProgress {
    /// Normalise to a whole percentage in `0..=100`.
    pub fn percent(&self) -> i16 {
        match self {
            Self::Percent(value) => value.clamp(0.0, 100.0).round() as i16,
            Self::Phase(text) => progress_from_phase(Some(text)),
        }
    }

    /// Human-readable message to surface alongside the percentage.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Percent(_) => None,
            Self::Phase(text) => Some(text),
        }
    }
}

/// Map a phase message onto a percentage.
pub fn progress_from_phase(message: Option<&str>) -> i16 {
    let Some(message) = message else {
        return 0;
    };

    if message.contains("Phase 1/4") {
        if let Some((current, total)) = segment_fraction(message) {
            return scaled(current, total, 25);
        }
        if message.to_lowercase().contains("opening card") {
            return 5;
        }
        return 10;
    }

    if message.contains("Phase 2/4") {
        if let Some((current, total)) = segment_fraction(message) {
            return 25 + scaled(current, total, 25);
        }
        return 35;
    }

    if message.contains("Phase 3/4") {
        if message.to_lowercase().contains("re-encoding") {
            return 70;
        }
        return 60;
    }

    if message.contains("Phase 4/4") {
        return 85;
    }

    if message.contains("Done") {
        return 100;
    }

    0
}

fn segment_fraction(message: &str) -> Option<(u32, u32)> {
    let caps = SEGMENT_RE.captures(message)?;
    let current = caps.get(1)?.as_str().parse().ok()?;
    let total = caps.get(2)?.as_str().parse().ok()?;
    Some((current, total))
}

/// `floor(current / total * span)`, clamped to `span`; zero totals yield 0.
fn scaled(current: u32, total: u32, span: u32) -> i16 {
    if total == 0 {
        return 0;
    }
    let value = (u64::from(current.min(total)) * u64::from(span)) / u64::from(total);
    value as i16
}
