use anyhow::{Context, Result, anyhow};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

use crate::timing::Subtitle;

// @module: SRT input for the command line tools

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("SRT timestamp regex is valid")
});

/// Load an SRT file as one subtitle track
pub fn load_srt_file<P: AsRef<Path>>(path: P, track: usize) -> Result<Vec<Subtitle>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
    parse_srt_string(&content, track)
        .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))
}

/// Parse SRT content into lines on `track`, sorted by start and indexed `0..n`.
///
/// Entries with empty text are kept: they occupy time on the timeline even
/// though they are never mined.
pub fn parse_srt_string(content: &str, track: usize) -> Result<Vec<Subtitle>> {
    let mut subtitles = Vec::new();

    // State variables for parsing
    let mut timing: Option<(i64, i64)> = None;
    let mut expecting_timing = false;
    let mut text = String::new();

    let mut finish = |timing: &mut Option<(i64, i64)>, text: &mut String| {
        if let Some((start, end)) = timing.take() {
            if end < start {
                warn!("Skipping subtitle with inverted time range {} --> {}", start, end);
            } else {
                subtitles.push(Subtitle::new(0, start, end, text.trim()).on_track(track));
            }
        }
        text.clear();
    };

    for (line_number, line) in content.lines().enumerate() {
        let trimmed = line.trim().trim_start_matches('\u{feff}');

        if trimmed.is_empty() {
            if timing.is_some() {
                finish(&mut timing, &mut text);
            }
            expecting_timing = false;
            continue;
        }

        if timing.is_none() && !expecting_timing && trimmed.parse::<usize>().is_ok() {
            expecting_timing = true;
            continue;
        }

        if timing.is_none() {
            if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                timing = Some((timestamp_from_captures(&caps, 1), timestamp_from_captures(&caps, 5)));
                expecting_timing = false;
                continue;
            }
            warn!("Unexpected text at line {}: {}", line_number + 1, trimmed);
            continue;
        }

        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(trimmed);
    }
    finish(&mut timing, &mut text);

    if subtitles.is_empty() {
        return Err(anyhow!("No valid subtitle entries were found in the SRT content"));
    }

    subtitles.sort_by_key(|s| s.start);
    for (index, subtitle) in subtitles.iter_mut().enumerate() {
        subtitle.index = index;
    }

    Ok(subtitles)
}

/// Parse an `HH:MM:SS,mmm` timestamp to milliseconds
pub fn parse_timestamp(timestamp: &str) -> Result<i64> {
    let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();
    if parts.len() != 4 {
        return Err(anyhow!("Invalid timestamp format: {}", timestamp));
    }

    let hours: i64 = parts[0].parse().context("Failed to parse hours")?;
    let minutes: i64 = parts[1].parse().context("Failed to parse minutes")?;
    let seconds: i64 = parts[2].parse().context("Failed to parse seconds")?;
    let millis: i64 = parts[3].parse().context("Failed to parse milliseconds")?;

    if minutes >= 60 || seconds >= 60 || millis >= 1000 {
        return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
    }

    Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
}

/// Format milliseconds as `HH:MM:SS,mmm`; negative values clamp to zero
pub fn format_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

fn timestamp_from_captures(caps: &regex::Captures, start_idx: usize) -> i64 {
    let part = |i: usize| -> i64 {
        caps.get(start_idx + i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    ((part(0) * 60 + part(1)) * 60 + part(2)) * 1000 + part(3)
}
