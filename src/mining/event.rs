/*!
 * Values produced by the mining pipeline.
 */

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timing::Subtitle;
use crate::timing::surrounding::extract_text;

/// What to do with a mined line once it has been captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostMineAction {
    /// Keep the capture without exporting it
    None,
    /// Open the card editor with the capture
    #[default]
    OpenEditor,
    /// Merge the capture into the most recently exported card
    UpdateLast,
    /// Export a new card straight away
    Export,
}

/// Playback state to leave the video in after a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostMinePlayback {
    /// Whatever it was before mining started
    #[default]
    Remember,
    Play,
    Pause,
}

/// Span of media captured for a line, in ms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingWindow {
    pub start_timestamp: i64,
    pub end_timestamp: i64,
}

impl RecordingWindow {
    /// Window around `subtitle`, padded on both sides and clamped at zero
    pub fn padded(subtitle: &Subtitle, padding_start: i64, padding_end: i64) -> Self {
        Self {
            start_timestamp: (subtitle.start - padding_start).max(0),
            end_timestamp: subtitle.end + padding_end,
        }
    }

    pub fn duration(&self) -> i64 {
        (self.end_timestamp - self.start_timestamp).max(0)
    }
}

/// Everything captured for one mined line. Immutable once forwarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningEvent {
    pub id: Uuid,
    pub subtitle: Subtitle,
    pub surrounding_subtitles: Vec<Subtitle>,
    /// Text of the mined line and of lines overlapping it on other tracks
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_window: Option<RecordingWindow>,
    pub screenshot: bool,
    pub post_action: PostMineAction,
    pub is_bulk: bool,
}

impl MiningEvent {
    pub fn new(
        subtitle: Subtitle,
        surrounding_subtitles: Vec<Subtitle>,
        recording_window: Option<RecordingWindow>,
        screenshot: bool,
        post_action: PostMineAction,
        is_bulk: bool,
    ) -> Self {
        let text = extract_text(&subtitle, &surrounding_subtitles, None);
        Self {
            id: Uuid::new_v4(),
            subtitle,
            surrounding_subtitles,
            text,
            recording_window,
            screenshot,
            post_action,
            is_bulk,
        }
    }
}

/// What the orchestrator keeps of a forwarded event so the editor can be
/// shown again after a rewind or re-record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumableSnapshot {
    pub subtitle: Subtitle,
    pub surrounding_subtitles: Vec<Subtitle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_window: Option<RecordingWindow>,
    /// Playback position when the editor was requested
    pub dialog_requested_timestamp: i64,
    /// Whether a card has been exported from this snapshot
    #[serde(default)]
    pub card_exported: bool,
}

impl ResumableSnapshot {
    pub fn of(event: &MiningEvent, dialog_requested_timestamp: i64) -> Self {
        Self {
            subtitle: event.subtitle.clone(),
            surrounding_subtitles: event.surrounding_subtitles.clone(),
            recording_window: event.recording_window,
            dialog_requested_timestamp,
            card_exported: false,
        }
    }
}

/// Acknowledgement from the export target that a card was written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardExported {
    pub is_bulk_export: bool,
    #[serde(default)]
    pub skipped_duplicate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_error: Option<String>,
}

impl CardExported {
    pub fn interactive() -> Self {
        Self::default()
    }

    pub fn bulk() -> Self {
        Self {
            is_bulk_export: true,
            ..Self::default()
        }
    }
}
