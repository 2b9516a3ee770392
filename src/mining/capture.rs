/*!
 * Media capture and export collaborators.
 */

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::{MiningEvent, RecordingWindow};
use crate::errors::{CaptureError, ExportError};

/// Parameters of a recording about to start
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingRequest {
    /// Identity used to discard clips from superseded recordings
    pub id: Uuid,
    /// Window to record; `end_timestamp` is open for toggled recordings
    pub start_timestamp: i64,
    pub end_timestamp: Option<i64>,
}

/// Audio captured by one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioClip {
    pub recording_id: Uuid,
    pub window: RecordingWindow,
    pub data: Bytes,
}

/// One captured frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub timestamp: i64,
    pub data: Bytes,
}

/// Media attached to a forwarded event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedMedia {
    pub audio: Option<AudioClip>,
    pub screenshot: Option<Screenshot>,
}

/// Audio recording and screenshot device
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn start_recording(&self, request: RecordingRequest) -> Result<(), CaptureError>;

    /// Stop the running recording and return its clip
    async fn stop_recording(&self) -> Result<AudioClip, CaptureError>;

    async fn take_screenshot(&self, timestamp: i64) -> Result<Screenshot, CaptureError>;
}

/// How the export target took a forwarded event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Accepted; a `card-exported` acknowledgement follows later
    Submitted,
    /// The target wants the editor opened for this event
    EditorRequested,
}

/// Receiver of mining events. Must not wait for the export itself to finish.
#[async_trait]
pub trait ExportTarget: Send + Sync {
    async fn forward(&self, event: &MiningEvent, media: &CapturedMedia) -> Result<ForwardOutcome, ExportError>;
}
