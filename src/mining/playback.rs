/*!
 * Control over the video being mined.
 */

use async_trait::async_trait;

use crate::errors::CaptureError;

/// The playback clock and its controls, selected once per bound video.
///
/// Reads are synchronous snapshots; controls are async because a real
/// player may take a while to settle after a seek.
#[async_trait]
pub trait PlaybackAdapter: Send + Sync {
    /// Current position in ms
    fn current_time_ms(&self) -> i64;

    fn paused(&self) -> bool;

    /// Playback speed multiplier, 1.0 for normal speed
    fn playback_rate(&self) -> f64;

    async fn seek(&self, timestamp_ms: i64) -> Result<(), CaptureError>;

    async fn play(&self) -> Result<(), CaptureError>;

    async fn pause(&self) -> Result<(), CaptureError>;
}
