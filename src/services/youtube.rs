// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! YouTube link parsing and embeddable player URLs.

use regex::Regex;
use std::sync::OnceLock;

/// Player parameters: minimal chrome, inline playback, no related videos.
const EMBED_PARAMS: &str = "controls=1&modestbranding=1&rel=0&showinfo=0&autohide=1\
&playsinline=1&iv_load_policy=3&disablekb=1&color=white&theme=dark";

fn video_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            // Matches watch, embed, /v/, /e/, channel-path and youtu.be links.
            Regex::new(
                r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
            )
            .ok()
        })
        .as_ref()
}

/// Extract the 11-character video id from a YouTube URL.
pub fn extract_video_id(url: &str) -> Option<&str> {
    video_id_pattern()?
        .captures(url)?
        .get(1)
        .map(|m| m.as_str())
}

pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}?{}", video_id, EMBED_PARAMS)
}
