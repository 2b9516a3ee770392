/*!
 * Error types for the submine library.
 *
 * This module contains custom error types for the different stages of the
 * mining pipeline, using the thiserror crate for ergonomic error definitions.
 */

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the context bridge
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// The embedded surface never announced itself as ready
    #[error("Timed out after {0:?} waiting for frame to be ready")]
    BindTimeout(Duration),

    /// A message was sent before the handshake completed
    #[error("Attempted to message the frame before it was ready")]
    NotReady,

    /// The other side of the link went away
    #[error("Bridge link disconnected")]
    Disconnected,

    /// An envelope could not be decoded into a known command
    #[error("Failed to decode bridge message: {0}")]
    Decode(String),

    /// A proxied network call failed
    #[error("Proxied request failed: {0}")]
    Http(String),

    /// The other side answered a request with an error
    #[error("Request rejected by the other side: {0}")]
    Remote(String),
}

/// Errors that can occur while capturing media
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Starting or stopping an audio/video recording failed
    #[error("Recording failed: {0}")]
    Recording(String),

    /// Taking a screenshot failed
    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    /// The playback adapter refused a seek/play/pause
    #[error("Playback control failed: {0}")]
    Playback(String),
}

/// Errors returned by the export target
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    /// The export target refused the mining event
    #[error("Export rejected: {0}")]
    Rejected(String),

    /// The export target could not be reached
    #[error("Export target unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur while mining a subtitle
#[derive(Error, Debug)]
pub enum MiningError {
    /// Capture error
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Export error
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Bridge error
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Another mining operation is already running
    #[error("A mining operation is already in progress")]
    Busy,

    /// Nothing is showing at the requested instant
    #[error("No subtitle at the current timestamp")]
    NoSubtitle,

    /// The stopped clip belonged to a superseded recording and was dropped
    #[error("Recorded clip was stale and has been discarded")]
    StaleClip,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the bridge
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Error from the mining pipeline
    #[error("Mining error: {0}")]
    Mining(#[from] MiningError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
