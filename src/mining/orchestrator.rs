/*!
 * The mining state machine.
 *
 * One orchestrator drives one bound video through
 * `Idle -> AwaitingCapture -> Recording -> Forwarding -> AwaitingUiResolution -> Idle`.
 * It never sleeps: a running recording is represented by a deadline which the
 * owner waits on alongside its other event sources, then reports back through
 * [`Orchestrator::on_recording_deadline`]. Timing ticks keep flowing while a
 * recording runs.
 *
 * Capture and export failures are reported to the viewer and bring the
 * machine back to `Idle`; they never leave it stuck in an intermediate state.
 */

use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::capture::{AudioClip, CapturedMedia, ExportTarget, ForwardOutcome, MediaCapture, RecordingRequest, Screenshot};
use super::editor::EditorUi;
use super::event::{CardExported, MiningEvent, PostMineAction, PostMinePlayback, RecordingWindow, ResumableSnapshot};
use super::interruption::Interruption;
use super::playback::PlaybackAdapter;
use super::presentation::{Notification, Presentation};
use crate::app_config::MiningConfig;
use crate::bridge::ServerMessage;
use crate::errors::{CaptureError, MiningError};
use crate::timing::{Subtitle, TimingEngine};

/// The collaborators an orchestrator drives
#[derive(Clone)]
pub struct MiningCollaborators {
    pub playback: Arc<dyn PlaybackAdapter>,
    pub capture: Arc<dyn MediaCapture>,
    pub export: Arc<dyn ExportTarget>,
    pub presentation: Arc<dyn Presentation>,
}

/// A line on its way through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMine {
    pub subtitle: Subtitle,
    pub surrounding: Vec<Subtitle>,
    pub post_action: PostMineAction,
    pub is_bulk: bool,
    pub screenshot: Option<Screenshot>,
    pub window: Option<RecordingWindow>,
}

/// A recording in progress
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRecording {
    pub id: Uuid,
    /// Playback position the recording started from
    pub started_at: i64,
    /// When a fixed-length recording is due to stop; `None` when toggled
    pub deadline: Option<Instant>,
    /// The line being recorded; `None` for a toggled recording without one
    pub pending: Option<PendingMine>,
    /// Whether the video was playing before mining started
    pub was_playing: bool,
    /// Editor snapshot to show again once a re-record finishes
    pub rerecord: Option<ResumableSnapshot>,
}

/// Orchestrator states
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorState {
    Idle,
    AwaitingCapture,
    Recording(ActiveRecording),
    Forwarding,
    AwaitingUiResolution,
}

pub struct Orchestrator {
    playback: Arc<dyn PlaybackAdapter>,
    capture: Arc<dyn MediaCapture>,
    export: Arc<dyn ExportTarget>,
    presentation: Arc<dyn Presentation>,
    editor: EditorUi,
    settings: MiningConfig,
    state: OrchestratorState,
    snapshot: Option<ResumableSnapshot>,
    editor_interruption: Option<Interruption>,
    settings_interruption: Option<Interruption>,
}

impl Orchestrator {
    pub fn new(collaborators: MiningCollaborators, editor: EditorUi, settings: MiningConfig) -> Self {
        Self {
            playback: collaborators.playback,
            capture: collaborators.capture,
            export: collaborators.export,
            presentation: collaborators.presentation,
            editor,
            settings,
            state: OrchestratorState::Idle,
            snapshot: None,
            editor_interruption: None,
            settings_interruption: None,
        }
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == OrchestratorState::Idle
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, OrchestratorState::Recording(_))
    }

    /// Whether the running recording belongs to a bulk export
    pub fn is_mining_bulk(&self) -> bool {
        matches!(&self.state, OrchestratorState::Recording(active)
            if active.pending.as_ref().is_some_and(|pending| pending.is_bulk))
    }

    /// Snapshot of the last forwarded line, kept for rewind/re-record
    pub fn snapshot(&self) -> Option<&ResumableSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn editor(&self) -> &EditorUi {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut EditorUi {
        &mut self.editor
    }

    pub fn settings(&self) -> &MiningConfig {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: MiningConfig) {
        self.settings = settings;
    }

    /// When the running fixed-length recording is due to stop
    pub fn recording_deadline(&self) -> Option<Instant> {
        match &self.state {
            OrchestratorState::Recording(active) => active.deadline,
            _ => None,
        }
    }

    /// Mine the line showing right now
    pub async fn mine(
        &mut self,
        engine: &mut TimingEngine,
        post_action: Option<PostMineAction>,
    ) -> Result<(), MiningError> {
        if !self.is_idle() {
            return Err(MiningError::Busy);
        }

        let now = self.playback.current_time_ms();
        let (subtitle, surrounding) = engine.current_subtitle(now).ok_or(MiningError::NoSubtitle)?;
        let post_action = post_action.unwrap_or(self.settings.post_mine_action);
        self.start(engine, subtitle, surrounding, post_action, false).await
    }

    /// Mine a specific line of the loaded set
    pub async fn mine_subtitle(
        &mut self,
        engine: &mut TimingEngine,
        subtitle: Subtitle,
        post_action: PostMineAction,
        is_bulk: bool,
    ) -> Result<(), MiningError> {
        if !self.is_idle() {
            return Err(MiningError::Busy);
        }

        let surrounding = engine.surrounding_of(&subtitle);
        self.start(engine, subtitle, surrounding, post_action, is_bulk).await
    }

    /// Start a recording without a line, or stop the running one
    pub async fn toggle_recording(&mut self, engine: &mut TimingEngine) -> Result<(), MiningError> {
        match self.state {
            OrchestratorState::Recording(_) => self.finish_recording(engine).await,
            OrchestratorState::Idle => {
                let result = self.begin_toggled_recording().await;
                result.map_err(|e| self.fail(e))
            }
            _ => Err(MiningError::Busy),
        }
    }

    /// Stop a fixed-length recording whose deadline has passed
    pub async fn on_recording_deadline(&mut self, engine: &mut TimingEngine) -> Result<(), MiningError> {
        match self.recording_deadline() {
            Some(deadline) if deadline <= Instant::now() => self.finish_recording(engine).await,
            _ => Ok(()),
        }
    }

    /// Capture a screenshot on its own. While the editor is showing, the
    /// editor is asked to hand back control instead so the frame can be
    /// chosen again.
    pub async fn take_screenshot(&mut self, engine: &mut TimingEngine) -> Result<(), MiningError> {
        if self.state == OrchestratorState::AwaitingUiResolution && self.editor.showing() {
            self.editor.request_rewind()?;
            return Ok(());
        }
        if !self.is_idle() {
            return Err(MiningError::Busy);
        }

        let now = self.playback.current_time_ms();
        let (subtitle, surrounding) = engine
            .current_subtitle(now)
            .unwrap_or_else(|| (Subtitle::new(0, now, now, ""), Vec::new()));

        self.state = OrchestratorState::AwaitingCapture;
        let screenshot = match self.capture_screenshot(now).await {
            Ok(screenshot) => screenshot,
            Err(e) => return Err(self.fail(e.into())),
        };

        let pending = PendingMine {
            subtitle,
            surrounding,
            post_action: PostMineAction::UpdateLast,
            is_bulk: false,
            screenshot: Some(screenshot),
            window: None,
        };
        self.forward(pending, None, None).await
    }

    /// React to an event raised by the editor surface
    pub async fn on_ui_message(&mut self, engine: &mut TimingEngine, message: ServerMessage) -> Result<(), MiningError> {
        match message {
            ServerMessage::Resume { ui_state, card_exported } => {
                if !self.awaiting_ui("resume") {
                    return Ok(());
                }
                self.adopt_ui_state(ui_state);
                let was_playing = self.close_editor();
                self.state = OrchestratorState::Idle;

                let result = self.resume(engine, card_exported, was_playing).await;
                result.map_err(|e| self.fail(e))
            }
            ServerMessage::Rewind { ui_state } => {
                if !self.awaiting_ui("rewind") {
                    return Ok(());
                }
                self.adopt_ui_state(ui_state);
                self.close_editor();
                if let Some(settings) = self.settings_interruption.as_mut() {
                    settings.stay_paused();
                }
                self.state = OrchestratorState::Idle;

                let result = self.rewind(engine).await;
                result.map_err(|e| self.fail(e))
            }
            ServerMessage::Rerecord {
                record_start,
                record_end,
                ui_state,
            } => {
                if !self.awaiting_ui("rerecord") {
                    return Ok(());
                }
                self.adopt_ui_state(ui_state);
                self.close_editor();
                self.state = OrchestratorState::Idle;

                let Some(previous) = self.snapshot.clone() else {
                    return Err(MiningError::NoSubtitle);
                };
                let pending = PendingMine {
                    subtitle: previous.subtitle.clone(),
                    surrounding: previous.surrounding_subtitles.clone(),
                    post_action: PostMineAction::OpenEditor,
                    is_bulk: false,
                    screenshot: None,
                    window: Some(RecordingWindow {
                        start_timestamp: record_start.max(0),
                        end_timestamp: record_end.max(record_start),
                    }),
                };
                self.state = OrchestratorState::AwaitingCapture;
                let result = self.begin_recording(engine, pending, false, Some(previous)).await;
                result.map_err(|e| self.fail(e))
            }
            ServerMessage::CopyToClipboard { data_url } => {
                self.presentation.copy_to_clipboard(&data_url);
                Ok(())
            }
            ServerMessage::OpenSettings => self.open_settings().await,
            other => {
                debug!("Ignoring unexpected surface event {:?}", other);
                Ok(())
            }
        }
    }

    /// Note an export acknowledgement
    pub fn on_card_exported(&mut self, ack: &CardExported) {
        if let Some(export_error) = &ack.export_error {
            error!("Card export failed: {}", export_error);
            self.presentation
                .notify(Notification::Error(format!("Export failed: {}", export_error)));
            return;
        }

        if ack.is_bulk_export {
            debug!("Bulk card exported");
            return;
        }

        if ack.skipped_duplicate {
            self.presentation
                .notify(Notification::Info("Skipped duplicate card".to_string()));
        } else {
            self.presentation.notify(Notification::Info("Card exported".to_string()));
        }
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.card_exported = true;
        }
    }

    /// Put the settings surface in front of the video
    pub async fn open_settings(&mut self) -> Result<(), MiningError> {
        if self.settings_interruption.is_some() {
            return Ok(());
        }
        let interruption = Interruption::begin(&*self.playback, &*self.presentation).await?;
        self.settings_interruption = Some(interruption);
        info!("Settings opened");
        Ok(())
    }

    /// Restore the view after the settings surface closed
    pub async fn close_settings(&mut self) -> Result<(), MiningError> {
        let Some(interruption) = self.settings_interruption.take() else {
            return Ok(());
        };
        if let Some(editor) = self.editor_interruption.as_mut() {
            editor.absorb(interruption);
            return Ok(());
        }
        interruption.end(&*self.presentation);
        if interruption.was_playing() {
            self.playback.play().await?;
        }
        Ok(())
    }

    /// Drop the editor surface and restore the view. Idempotent.
    pub fn unbind(&mut self) {
        self.close_editor();
        if let Some(interruption) = self.settings_interruption.take() {
            interruption.end(&*self.presentation);
        }
        self.editor.unbind();
    }

    async fn start(
        &mut self,
        engine: &mut TimingEngine,
        subtitle: Subtitle,
        surrounding: Vec<Subtitle>,
        post_action: PostMineAction,
        is_bulk: bool,
    ) -> Result<(), MiningError> {
        self.state = OrchestratorState::AwaitingCapture;
        debug!("Mining line {} ({} context line(s))", subtitle.index, surrounding.len());

        let window = self.settings.record_media.then(|| {
            RecordingWindow::padded(
                &subtitle,
                self.settings.audio_padding_start_ms,
                self.settings.audio_padding_end_ms,
            )
        });
        let mut pending = PendingMine {
            subtitle,
            surrounding,
            post_action,
            is_bulk,
            screenshot: None,
            window,
        };

        if window.is_none() {
            if self.settings.take_screenshot {
                let timestamp = self.playback.current_time_ms();
                match self.capture_screenshot(timestamp).await {
                    Ok(screenshot) => pending.screenshot = Some(screenshot),
                    Err(e) => return Err(self.fail(e.into())),
                }
            }
            return self.forward(pending, None, None).await;
        }

        let was_playing = !self.playback.paused();
        if let Err(e) = self.begin_recording(engine, pending, was_playing, None).await {
            return Err(self.fail(e));
        }
        if self.settings.take_screenshot {
            if let Err(e) = self.screenshot_recording().await {
                self.abort_recording().await;
                return Err(self.fail(e.into()));
            }
        }
        Ok(())
    }

    /// Grab the frame for the line being recorded, once playback is at its start
    async fn screenshot_recording(&mut self) -> Result<(), CaptureError> {
        let timestamp = self.playback.current_time_ms();
        let screenshot = self.capture_screenshot(timestamp).await?;
        if let OrchestratorState::Recording(ActiveRecording {
            pending: Some(pending), ..
        }) = &mut self.state
        {
            pending.screenshot = Some(screenshot);
        }
        Ok(())
    }

    async fn abort_recording(&self) {
        if let Err(e) = self.capture.stop_recording().await {
            debug!("Recording could not be stopped: {}", e);
        }
        if let Err(e) = self.playback.pause().await {
            debug!("Playback could not be paused: {}", e);
        }
    }

    async fn begin_recording(
        &mut self,
        engine: &mut TimingEngine,
        pending: PendingMine,
        was_playing: bool,
        rerecord: Option<ResumableSnapshot>,
    ) -> Result<(), MiningError> {
        let window = pending.window.ok_or(MiningError::NoSubtitle)?;
        let id = Uuid::new_v4();

        self.playback.seek(window.start_timestamp).await?;
        engine.force_recheck();
        self.capture
            .start_recording(RecordingRequest {
                id,
                start_timestamp: window.start_timestamp,
                end_timestamp: Some(window.end_timestamp),
            })
            .await?;
        self.playback.play().await?;

        let rate = self.playback.playback_rate();
        let rate = if rate > 0.0 { rate } else { 1.0 };
        let length = Duration::from_millis((window.duration() as f64 / rate).round() as u64);
        debug!("Recording {} for {:?}", id, length);

        self.state = OrchestratorState::Recording(ActiveRecording {
            id,
            started_at: window.start_timestamp,
            deadline: Some(Instant::now() + length),
            pending: Some(pending),
            was_playing,
            rerecord,
        });
        Ok(())
    }

    async fn begin_toggled_recording(&mut self) -> Result<(), MiningError> {
        let id = Uuid::new_v4();
        let now = self.playback.current_time_ms();
        let was_playing = !self.playback.paused();

        self.capture
            .start_recording(RecordingRequest {
                id,
                start_timestamp: now,
                end_timestamp: None,
            })
            .await?;
        if !was_playing {
            self.playback.play().await?;
        }

        info!("Recording started");
        self.state = OrchestratorState::Recording(ActiveRecording {
            id,
            started_at: now,
            deadline: None,
            pending: None,
            was_playing,
            rerecord: None,
        });
        Ok(())
    }

    async fn finish_recording(&mut self, engine: &mut TimingEngine) -> Result<(), MiningError> {
        let OrchestratorState::Recording(active) =
            std::mem::replace(&mut self.state, OrchestratorState::AwaitingCapture)
        else {
            return Ok(());
        };

        let stopped_at = self.playback.current_time_ms();
        let clip = match self.capture.stop_recording().await {
            Ok(clip) => clip,
            Err(e) => return Err(self.fail(e.into())),
        };
        if clip.recording_id != active.id {
            debug!("Discarding stale clip from recording {}", clip.recording_id);
            self.state = OrchestratorState::Idle;
            return Err(MiningError::StaleClip);
        }

        if let Err(e) = self.apply_playback_policy(active.was_playing).await {
            return Err(self.fail(e.into()));
        }

        let pending = match active.pending {
            Some(pending) => pending,
            None => self.toggled_pending(engine, active.started_at, stopped_at),
        };
        self.forward(pending, Some(clip), active.rerecord).await
    }

    fn toggled_pending(&self, engine: &TimingEngine, start: i64, stop: i64) -> PendingMine {
        let window = RecordingWindow {
            start_timestamp: start,
            end_timestamp: stop.max(start),
        };
        let surrounding = engine
            .around_interval(window.start_timestamp, window.end_timestamp)
            .map(|(around, _)| around)
            .unwrap_or_default();

        PendingMine {
            subtitle: Subtitle::new(0, window.start_timestamp, window.end_timestamp, ""),
            surrounding,
            post_action: self.settings.post_mine_action,
            is_bulk: false,
            screenshot: None,
            window: Some(window),
        }
    }

    async fn forward(
        &mut self,
        pending: PendingMine,
        audio: Option<AudioClip>,
        rerecord: Option<ResumableSnapshot>,
    ) -> Result<(), MiningError> {
        self.state = OrchestratorState::Forwarding;
        let event = MiningEvent::new(
            pending.subtitle,
            pending.surrounding,
            pending.window,
            pending.screenshot.is_some(),
            pending.post_action,
            pending.is_bulk,
        );
        let media = CapturedMedia {
            audio,
            screenshot: pending.screenshot,
        };

        let outcome = match self.export.forward(&event, &media).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e.into())),
        };
        let now = self.playback.current_time_ms();

        if let Some(previous) = rerecord {
            let snapshot = ResumableSnapshot {
                recording_window: event.recording_window,
                dialog_requested_timestamp: now,
                ..previous
            };
            return self.show_editor(snapshot).await;
        }

        match outcome {
            ForwardOutcome::Submitted => {
                debug!("Forwarded line {}", event.subtitle.index);
                self.snapshot = Some(ResumableSnapshot::of(&event, now));
                self.state = OrchestratorState::Idle;
                Ok(())
            }
            ForwardOutcome::EditorRequested => self.show_editor(ResumableSnapshot::of(&event, now)).await,
        }
    }

    async fn show_editor(&mut self, snapshot: ResumableSnapshot) -> Result<(), MiningError> {
        let interruption = match Interruption::begin(&*self.playback, &*self.presentation).await {
            Ok(interruption) => interruption,
            Err(e) => return Err(self.fail(e.into())),
        };

        if let Err(e) = self.editor.show(&snapshot).await {
            interruption.end(&*self.presentation);
            return Err(self.fail(e.into()));
        }

        self.editor_interruption = Some(interruption);
        self.snapshot = Some(snapshot);
        self.state = OrchestratorState::AwaitingUiResolution;
        Ok(())
    }

    async fn resume(&mut self, engine: &mut TimingEngine, card_exported: bool, was_playing: bool) -> Result<(), MiningError> {
        if card_exported {
            if let Some(snapshot) = self.snapshot.as_mut() {
                snapshot.card_exported = true;
                let timestamp = snapshot.dialog_requested_timestamp;
                self.playback.seek(timestamp).await?;
                engine.force_recheck();
            }
        }

        if self.settings_interruption.is_some() {
            return Ok(());
        }
        match self.settings.post_mine_playback {
            PostMinePlayback::Remember if was_playing => self.playback.play().await?,
            PostMinePlayback::Play => self.playback.play().await?,
            _ => {}
        }
        Ok(())
    }

    async fn rewind(&mut self, engine: &mut TimingEngine) -> Result<(), MiningError> {
        self.playback.pause().await?;
        if let Some(snapshot) = &self.snapshot {
            self.playback.seek(snapshot.subtitle.start).await?;
            engine.force_recheck();
        }
        Ok(())
    }

    async fn apply_playback_policy(&self, was_playing: bool) -> Result<(), CaptureError> {
        match self.settings.post_mine_playback {
            PostMinePlayback::Remember if !was_playing => self.playback.pause().await,
            PostMinePlayback::Remember => Ok(()),
            PostMinePlayback::Play => self.playback.play().await,
            PostMinePlayback::Pause => self.playback.pause().await,
        }
    }

    async fn capture_screenshot(&self, timestamp: i64) -> Result<Screenshot, CaptureError> {
        let clean = self.settings.clean_screenshot;
        if clean {
            self.presentation.set_controls_hidden(true);
            self.presentation.force_hide_subtitles(true);
        }

        let result = self.capture.take_screenshot(timestamp).await;

        if clean {
            self.presentation.force_hide_subtitles(false);
            self.presentation.set_controls_hidden(false);
        }
        result
    }

    fn awaiting_ui(&self, what: &str) -> bool {
        let awaiting = self.state == OrchestratorState::AwaitingUiResolution;
        if !awaiting {
            debug!("Ignoring {} while {:?}", what, self.state);
        }
        awaiting
    }

    fn adopt_ui_state(&mut self, ui_state: serde_json::Value) {
        match serde_json::from_value::<ResumableSnapshot>(ui_state) {
            Ok(snapshot) => self.snapshot = Some(snapshot),
            Err(e) => debug!("Keeping stored snapshot, surface state unreadable: {}", e),
        }
    }

    /// Hide the editor and undo its interruption. Returns whether playback
    /// should pick up again; never while settings is still in front.
    fn close_editor(&mut self) -> bool {
        self.editor.hide();
        let Some(interruption) = self.editor_interruption.take() else {
            return false;
        };
        if let Some(settings) = self.settings_interruption.as_mut() {
            settings.absorb(interruption);
            return false;
        }
        interruption.end(&*self.presentation);
        interruption.was_playing()
    }

    fn fail(&mut self, e: MiningError) -> MiningError {
        error!("Mining failed: {}", e);
        self.presentation.notify(Notification::Error(e.to_string()));
        self.state = OrchestratorState::Idle;
        e
    }
}
