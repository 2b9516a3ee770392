/*!
 * # submine - subtitle mining for language learners
 *
 * A Rust library that turns a video with subtitles into flashcards while the
 * viewer keeps watching.
 *
 * ## Features
 *
 * - Tracking which subtitle line is showing on a continuously advancing clock
 * - Capturing an audio clip and a screenshot for a mined line
 * - Driving an embedded card editor over a typed message bridge
 * - Unattended bulk export of every line, one at a time, with cancellation
 * - Auto-pause, condensed and repeat playback modes
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `timing`: the polled timing engine:
 *   - `timing::collection`: interval lookup over sorted lines
 *   - `timing::edge`: once-per-line started/stopping detection
 *   - `timing::surrounding`: context windows for mined lines
 * - `bridge`: the context bridge between the controller and UI surfaces:
 *   - `bridge::client`: controller end
 *   - `bridge::server`: surface end
 *   - `bridge::frame`: surface lifecycle
 * - `mining`: the mining pipeline:
 *   - `mining::orchestrator`: the mining state machine
 *   - `mining::bulk_export`: the bulk export scheduler
 *   - `mining::play_mode`: playback modes
 * - `app_controller`: binds the pipeline to one video
 * - `simulation`: headless collaborators for the CLI and tests
 * - `app_config`: Configuration management
 * - `subtitle_processor`: SRT parsing
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod bridge;
pub mod errors;
pub mod language_utils;
pub mod mining;
pub mod simulation;
pub mod subtitle_processor;
pub mod timing;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Collaborators, ControllerHandle, MiningController, ViewerIntent};
pub use errors::{AppError, BridgeError, CaptureError, ExportError, MiningError};
pub use language_utils::{get_language_name, language_codes_match, normalize_ui_language};
pub use mining::{BulkExportMessage, BulkExportScheduler, MiningEvent, Orchestrator, OrchestratorState};
pub use timing::{ShowingSnapshot, Subtitle, TimingEngine};
