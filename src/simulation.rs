/*!
 * Simulated collaborators for headless runs and tests.
 *
 * - `SimulatedPlayback` - a playback clock driven by the tokio clock
 * - `SimulatedCapture` - recordings and screenshots made of placeholder bytes
 * - `JsonLinesExport` - an export target writing one JSON line per event
 * - `HeadlessPresentation` - records what would have been shown
 * - `HeadlessSurfaceFactory` - in-process UI surfaces running a `BridgeServer`
 */

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use uuid::Uuid;

use crate::bridge::{BridgeServer, ClientMessage, FetchOptions, Link, ServerMessage, SurfaceFactory, link_pair};
use crate::errors::{BridgeError, CaptureError, ExportError};
use crate::mining::{
    AudioClip, CapturedMedia, CardExported, ExportTarget, ForwardOutcome, MediaCapture, MiningEvent, Notification,
    PlaybackAdapter, PostMineAction, Presentation, RecordingRequest, RecordingWindow, Screenshot,
};
use crate::timing::Subtitle;

#[derive(Debug)]
struct ClockState {
    anchor_ms: i64,
    anchor: Instant,
    paused: bool,
    rate: f64,
}

impl ClockState {
    fn position(&self) -> i64 {
        if self.paused {
            return self.anchor_ms;
        }
        let elapsed = self.anchor.elapsed().as_millis() as f64;
        self.anchor_ms + (elapsed * self.rate) as i64
    }

    fn reanchor(&mut self, position: i64) {
        self.anchor_ms = position.max(0);
        self.anchor = Instant::now();
    }
}

/// Playback clock advancing with the tokio clock
#[derive(Debug)]
pub struct SimulatedPlayback {
    clock: Mutex<ClockState>,
    seeks: Mutex<Vec<i64>>,
}

impl Default for SimulatedPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlayback {
    /// Paused at zero, normal speed
    pub fn new() -> Self {
        Self {
            clock: Mutex::new(ClockState {
                anchor_ms: 0,
                anchor: Instant::now(),
                paused: true,
                rate: 1.0,
            }),
            seeks: Mutex::new(Vec::new()),
        }
    }

    pub fn set_playback_rate(&self, rate: f64) {
        let mut clock = self.clock.lock();
        let position = clock.position();
        clock.reanchor(position);
        clock.rate = rate;
    }

    /// Every position sought to, in order
    pub fn seek_history(&self) -> Vec<i64> {
        self.seeks.lock().clone()
    }
}

#[async_trait]
impl PlaybackAdapter for SimulatedPlayback {
    fn current_time_ms(&self) -> i64 {
        self.clock.lock().position()
    }

    fn paused(&self) -> bool {
        self.clock.lock().paused
    }

    fn playback_rate(&self) -> f64 {
        self.clock.lock().rate
    }

    async fn seek(&self, timestamp_ms: i64) -> Result<(), CaptureError> {
        self.clock.lock().reanchor(timestamp_ms);
        self.seeks.lock().push(timestamp_ms.max(0));
        Ok(())
    }

    async fn play(&self) -> Result<(), CaptureError> {
        let mut clock = self.clock.lock();
        if clock.paused {
            let position = clock.position();
            clock.reanchor(position);
            clock.paused = false;
        }
        Ok(())
    }

    async fn pause(&self) -> Result<(), CaptureError> {
        let mut clock = self.clock.lock();
        if !clock.paused {
            let position = clock.position();
            clock.reanchor(position);
            clock.paused = true;
        }
        Ok(())
    }
}

/// Behavior mode for the simulated capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureBehavior {
    /// Everything succeeds
    Working,
    /// Screenshots fail
    FailingScreenshots,
    /// Starting a recording fails
    FailingRecordings,
    /// The next stopped clip carries a foreign recording id
    StaleNextClip,
}

#[derive(Debug, Default)]
struct CaptureState {
    active: Option<RecordingRequest>,
    recordings: usize,
    screenshots: usize,
    screenshots_while_recording: usize,
}

/// Capture device producing placeholder media
#[derive(Debug)]
pub struct SimulatedCapture {
    behavior: Mutex<CaptureBehavior>,
    state: Mutex<CaptureState>,
}

impl SimulatedCapture {
    pub fn new(behavior: CaptureBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            state: Mutex::new(CaptureState::default()),
        }
    }

    /// A capture device that always succeeds
    pub fn working() -> Self {
        Self::new(CaptureBehavior::Working)
    }

    pub fn set_behavior(&self, behavior: CaptureBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Number of recordings stopped so far
    pub fn recordings(&self) -> usize {
        self.state.lock().recordings
    }

    /// Number of screenshots taken so far
    pub fn screenshots(&self) -> usize {
        self.state.lock().screenshots
    }

    /// Number of screenshots taken while a recording was running
    pub fn screenshots_while_recording(&self) -> usize {
        self.state.lock().screenshots_while_recording
    }
}

#[async_trait]
impl MediaCapture for SimulatedCapture {
    async fn start_recording(&self, request: RecordingRequest) -> Result<(), CaptureError> {
        if *self.behavior.lock() == CaptureBehavior::FailingRecordings {
            return Err(CaptureError::Recording("simulated recorder failure".to_string()));
        }

        let mut state = self.state.lock();
        if state.active.is_some() {
            return Err(CaptureError::Recording("already recording".to_string()));
        }
        debug!("Simulated recording {} started at {}", request.id, request.start_timestamp);
        state.active = Some(request);
        Ok(())
    }

    async fn stop_recording(&self) -> Result<AudioClip, CaptureError> {
        let request = {
            let mut state = self.state.lock();
            let request = state
                .active
                .take()
                .ok_or_else(|| CaptureError::Recording("not recording".to_string()))?;
            state.recordings += 1;
            request
        };

        let recording_id = {
            let mut behavior = self.behavior.lock();
            if *behavior == CaptureBehavior::StaleNextClip {
                *behavior = CaptureBehavior::Working;
                Uuid::new_v4()
            } else {
                request.id
            }
        };

        let window = RecordingWindow {
            start_timestamp: request.start_timestamp,
            end_timestamp: request.end_timestamp.unwrap_or(request.start_timestamp),
        };
        Ok(AudioClip {
            recording_id,
            window,
            data: Bytes::from(format!("audio {}-{}", window.start_timestamp, window.end_timestamp)),
        })
    }

    async fn take_screenshot(&self, timestamp: i64) -> Result<Screenshot, CaptureError> {
        if *self.behavior.lock() == CaptureBehavior::FailingScreenshots {
            return Err(CaptureError::Screenshot("simulated screenshot failure".to_string()));
        }

        let mut state = self.state.lock();
        state.screenshots += 1;
        if state.active.is_some() {
            state.screenshots_while_recording += 1;
        }
        Ok(Screenshot {
            timestamp,
            data: Bytes::from(format!("frame@{}", timestamp)),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRecord<'a> {
    event: &'a MiningEvent,
    audio_bytes: usize,
    screenshot_bytes: usize,
}

/// Export target writing each event as a JSON line and acknowledging it
/// on a channel
pub struct JsonLinesExport {
    writer: Option<Mutex<Box<dyn Write + Send>>>,
    acks: UnboundedSender<CardExported>,
    forwarded: Mutex<Vec<MiningEvent>>,
}

impl JsonLinesExport {
    pub fn new(acks: UnboundedSender<CardExported>) -> Self {
        Self {
            writer: None,
            acks,
            forwarded: Mutex::new(Vec::new()),
        }
    }

    pub fn with_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.writer = Some(Mutex::new(writer));
        self
    }

    /// Every event forwarded so far
    pub fn forwarded(&self) -> Vec<MiningEvent> {
        self.forwarded.lock().clone()
    }
}

#[async_trait]
impl ExportTarget for JsonLinesExport {
    async fn forward(&self, event: &MiningEvent, media: &CapturedMedia) -> Result<ForwardOutcome, ExportError> {
        if let Some(writer) = &self.writer {
            let record = ExportRecord {
                event,
                audio_bytes: media.audio.as_ref().map_or(0, |a| a.data.len()),
                screenshot_bytes: media.screenshot.as_ref().map_or(0, |s| s.data.len()),
            };
            let line = serde_json::to_string(&record).map_err(|e| ExportError::Rejected(e.to_string()))?;
            let mut writer = writer.lock();
            writeln!(writer, "{}", line).map_err(|e| ExportError::Unavailable(e.to_string()))?;
        }
        self.forwarded.lock().push(event.clone());

        match event.post_action {
            PostMineAction::OpenEditor if !event.is_bulk => Ok(ForwardOutcome::EditorRequested),
            PostMineAction::None => Ok(ForwardOutcome::Submitted),
            _ => {
                let ack = CardExported {
                    is_bulk_export: event.is_bulk,
                    ..CardExported::default()
                };
                if self.acks.send(ack).is_err() {
                    warn!("Nobody is listening for export acknowledgements");
                }
                Ok(ForwardOutcome::Submitted)
            }
        }
    }
}

/// What a headless presentation has been asked to do
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationState {
    pub overlay: Vec<String>,
    pub subtitles_forced_hidden: bool,
    pub controls_hidden: bool,
    pub keys_bound: bool,
    pub focus_saved: bool,
    pub focus_restores: usize,
    pub fullscreen: bool,
    pub notifications: Vec<Notification>,
    pub clipboard: Vec<String>,
}

impl Default for PresentationState {
    fn default() -> Self {
        Self {
            overlay: Vec::new(),
            subtitles_forced_hidden: false,
            controls_hidden: false,
            keys_bound: true,
            focus_saved: false,
            focus_restores: 0,
            fullscreen: false,
            notifications: Vec::new(),
            clipboard: Vec::new(),
        }
    }
}

/// Presentation without a screen
#[derive(Debug, Default)]
pub struct HeadlessPresentation {
    state: Mutex<PresentationState>,
}

impl HeadlessPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start in fullscreen
    pub fn fullscreen() -> Self {
        let presentation = Self::default();
        presentation.state.lock().fullscreen = true;
        presentation
    }

    pub fn state(&self) -> PresentationState {
        self.state.lock().clone()
    }
}

impl Presentation for HeadlessPresentation {
    fn show_subtitles(&self, lines: &[Subtitle]) {
        self.state.lock().overlay = lines.iter().map(|s| s.text.clone()).collect();
    }

    fn force_hide_subtitles(&self, hidden: bool) {
        self.state.lock().subtitles_forced_hidden = hidden;
    }

    fn set_controls_hidden(&self, hidden: bool) {
        self.state.lock().controls_hidden = hidden;
    }

    fn set_keys_bound(&self, bound: bool) {
        self.state.lock().keys_bound = bound;
    }

    fn notify(&self, notification: Notification) {
        match &notification {
            Notification::Info(message) => info!("{}", message),
            Notification::Error(message) => warn!("{}", message),
        }
        self.state.lock().notifications.push(notification);
    }

    fn save_focus(&self) {
        self.state.lock().focus_saved = true;
    }

    fn restore_focus(&self) {
        let mut state = self.state.lock();
        if state.focus_saved {
            state.focus_saved = false;
            state.focus_restores += 1;
        }
    }

    fn fullscreen(&self) -> bool {
        self.state.lock().fullscreen
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        self.state.lock().fullscreen = fullscreen;
    }

    fn copy_to_clipboard(&self, data_url: &str) {
        self.state.lock().clipboard.push(data_url.to_string());
    }
}

/// How a headless surface reacts to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceBehavior {
    /// Answers requests and rewinds, never closes itself
    Passive,
    /// Resumes as soon as it receives state
    ResumeOnState { card_exported: bool },
    /// Never announces itself as ready
    NeverReady,
}

/// Creates in-process surfaces, each served by its own task
#[derive(Debug)]
pub struct HeadlessSurfaceFactory {
    behavior: SurfaceBehavior,
    created: AtomicUsize,
    last_language: Mutex<Option<String>>,
}

impl HeadlessSurfaceFactory {
    pub fn new(behavior: SurfaceBehavior) -> Self {
        Self {
            behavior,
            created: AtomicUsize::new(0),
            last_language: Mutex::new(None),
        }
    }

    /// Number of surfaces created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Language the most recent surface was created with
    pub fn last_language(&self) -> Option<String> {
        self.last_language.lock().clone()
    }
}

impl SurfaceFactory for HeadlessSurfaceFactory {
    fn create(&self, language: &str, _fetch: &FetchOptions) -> Result<Link, BridgeError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last_language.lock() = Some(language.to_string());

        let (controller_end, surface_end) = link_pair();
        match self.behavior {
            SurfaceBehavior::NeverReady => {
                tokio::spawn(async move {
                    let mut surface_end = surface_end;
                    while surface_end.incoming.recv().await.is_some() {}
                });
            }
            behavior => {
                tokio::spawn(serve_surface(surface_end, behavior));
            }
        }
        Ok(controller_end)
    }
}

async fn serve_surface(link: Link, behavior: SurfaceBehavior) {
    let mut server = BridgeServer::new(link);
    if let Err(e) = server.bind().await {
        warn!("Headless surface failed to bind: {}", e);
        return;
    }

    let mut latest_state = Value::Null;
    while let Some(message) = server.next_message().await {
        let result = match message {
            ClientMessage::UpdateState { state } => {
                latest_state = state;
                match behavior {
                    SurfaceBehavior::ResumeOnState { card_exported } => server.post(ServerMessage::Resume {
                        ui_state: latest_state.clone(),
                        card_exported,
                    }),
                    _ => Ok(()),
                }
            }
            ClientMessage::Request { message_id, body } => server.respond(message_id, Ok(body)),
            ClientMessage::Rewind => server.post(ServerMessage::Rewind {
                ui_state: latest_state.clone(),
            }),
            ClientMessage::Focus | ClientMessage::Response { .. } => Ok(()),
        };

        if let Err(e) = result {
            debug!("Headless surface lost its controller: {}", e);
            break;
        }
    }
}
