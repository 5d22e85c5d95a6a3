//! Best-effort structure pulled out of a free-text narrative.
//!
//! Nothing here is guaranteed by the service; the narrative itself stays the
//! authoritative output.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*•]\s+(.+?)\s*$").expect("bullet pattern"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{1,3}[.)]\s+(.+?)\s*$").expect("numbered pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NarrativeOutline {
    pub headline: String,
    pub bullets: Vec<String>,
    pub numbered: Vec<String>,
}

/// Headline is the first non-blank line (markdown heading marks dropped);
/// `-`, `*` and `•` lines are bullets; `1.` / `1)` lines are numbered items.
pub fn outline(narrative: &str) -> NarrativeOutline {
    let headline = narrative
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.trim_start_matches('#').trim().to_string())
        .unwrap_or_default();

    let mut bullets = Vec::new();
    let mut numbered = Vec::new();
    for line in narrative.lines() {
        if let Some(caps) = BULLET.captures(line) {
            bullets.push(caps[1].to_string());
        } else if let Some(caps) = NUMBERED.captures(line) {
            numbered.push(caps[1].to_string());
        }
    }

    NarrativeOutline {
        headline,
        bullets,
        numbered,
    }
}
