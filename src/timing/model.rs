/*!
 * Subtitle data model shared by the timing engine, the orchestrator and the
 * bridge protocol.
 */

use serde::{Deserialize, Serialize};

/// Opaque descriptor of a bitmap subtitle (e.g. PGS/VobSub) line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
    /// Encoded image data, usually a data URL
    pub data_url: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// A single subtitle line of a loaded subtitle set.
///
/// Two lines are the same line when their `(start, end, text, track)` tuple is
/// equal. This is the identity used for re-render diffing and for locating a
/// line across a rebuilt array; `index` is only meaningful within one loaded
/// set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtitle {
    /// Start time in ms, with the current offset applied
    pub start: i64,
    /// End time in ms (exclusive), with the current offset applied
    pub end: i64,
    /// Start time in ms as loaded
    pub original_start: i64,
    /// End time in ms as loaded
    pub original_end: i64,
    /// Line text, may be empty
    pub text: String,
    /// Bitmap rendition of the line, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_image: Option<ImageDescriptor>,
    /// Track the line belongs to
    #[serde(default)]
    pub track: usize,
    /// Position within the loaded set
    #[serde(default)]
    pub index: usize,
}

impl Subtitle {
    /// Create a line on track 0 whose original times equal its current times
    pub fn new(index: usize, start: i64, end: i64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            original_start: start,
            original_end: end,
            text: text.into(),
            text_image: None,
            track: 0,
            index,
        }
    }

    /// Builder-style track assignment
    pub fn on_track(mut self, track: usize) -> Self {
        self.track = track;
        self
    }

    /// Whether `timestamp` falls inside `[start, end)`
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    /// Whether the line carries any text
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    /// Duration in ms, never negative
    pub fn duration(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    /// Copy of this line with `start/end` rebuilt from the original times
    pub fn with_offset(&self, offset: i64) -> Self {
        Self {
            start: self.original_start + offset,
            end: self.original_end + offset,
            ..self.clone()
        }
    }
}

impl PartialEq for Subtitle {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
            && self.end == other.end
            && self.text == other.text
            && self.track == other.track
    }
}

impl Eq for Subtitle {}

/// What the timing engine sees at one instant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowingSnapshot {
    /// Lines on enabled tracks whose `[start, end)` contains the timestamp,
    /// ordered by track
    pub showing: Vec<Subtitle>,
    /// When nothing is showing, the line(s) that ended most recently
    pub last_shown: Vec<Subtitle>,
    /// The line(s) starting at the earliest future start time
    pub next_to_show: Vec<Subtitle>,
    /// A line that has just started; reported once per line
    pub started_showing: Option<Subtitle>,
    /// A line about to end; reported once per line
    pub will_stop_showing: Option<Subtitle>,
}

impl ShowingSnapshot {
    /// First line of `next_to_show`, if any
    pub fn next(&self) -> Option<&Subtitle> {
        self.next_to_show.first()
    }
}
