use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, MissedTickBehavior};

use crate::app_config::Config;
use crate::bridge::{FetchOptions, HttpPoster, ServerMessage, SurfaceFactory, UiFrame};
use crate::errors::MiningError;
use crate::language_utils;
use crate::mining::{
    BulkExportMessage, BulkExportScheduler, CardExported, EditorUi, ExportTarget, MediaCapture, MiningCollaborators,
    Notification, Orchestrator, PlayMode, PlayModeAction, PlayModeState, PlaybackAdapter, PostMineAction, Presentation,
};
use crate::timing::{Subtitle, TimingEngine, TimingOptions};

// @module: Controller binding the mining pipeline to one video

/// Something the viewer asked for
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerIntent {
    /// Mine the showing line, optionally overriding the configured action
    Mine(Option<PostMineAction>),
    ToggleRecording,
    TakeScreenshot,
    StartBulk,
    CancelBulk,
    /// Shift subtitles by a relative amount of ms
    Offset(i64),
    ToggleTrack(usize),
    Seek(i64),
    SetPlayMode(PlayMode),
    SetLanguage(String),
    LoadSubtitles(Vec<Subtitle>),
    OpenSettings,
    CloseSettings,
    Shutdown,
}

/// Everything a controller needs from the outside world
#[derive(Clone)]
pub struct Collaborators {
    pub playback: Arc<dyn PlaybackAdapter>,
    pub capture: Arc<dyn MediaCapture>,
    pub export: Arc<dyn ExportTarget>,
    pub presentation: Arc<dyn Presentation>,
    pub surfaces: Arc<dyn SurfaceFactory>,
    pub poster: Option<Arc<dyn HttpPoster>>,
}

/// Cloneable sender of viewer intents
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    intents: UnboundedSender<ViewerIntent>,
}

impl ControllerHandle {
    pub fn send(&self, intent: ViewerIntent) -> Result<()> {
        self.intents
            .send(intent)
            .map_err(|_| anyhow::anyhow!("Mining controller is no longer running"))
    }
}

/// Main controller for one bound video
pub struct MiningController {
    // @field: Config the controller was built with
    config: Config,
    engine: TimingEngine,
    orchestrator: Orchestrator,
    scheduler: BulkExportScheduler,
    play_mode: PlayModeState,
    playback: Arc<dyn PlaybackAdapter>,
    presentation: Arc<dyn Presentation>,
    intents: UnboundedReceiver<ViewerIntent>,
    ui_events: UnboundedReceiver<ServerMessage>,
    acks: UnboundedReceiver<CardExported>,
    bound: bool,
}

impl MiningController {
    // @method: Build a controller; returns it with its intent handle and
    // the bulk export announcements
    pub fn new(
        config: &Config,
        collaborators: Collaborators,
        acks: UnboundedReceiver<CardExported>,
    ) -> Result<(Self, ControllerHandle, UnboundedReceiver<BulkExportMessage>)> {
        config.validate()?;

        let language = language_utils::normalize_ui_language(&config.bridge.language)
            .context("Invalid UI language")?;
        let fetch = FetchOptions {
            allowed_fetch_url: config.bridge.allowed_fetch_url.clone(),
            video_src: None,
        };

        let (ui_tx, ui_events) = mpsc::unbounded_channel();
        let mut frame = UiFrame::new(
            collaborators.surfaces,
            ui_tx,
            collaborators.poster,
            config.bridge.bind_timeout(),
        );
        frame.set_language(language);
        frame.set_fetch_options(fetch);

        let orchestrator = Orchestrator::new(
            MiningCollaborators {
                playback: collaborators.playback.clone(),
                capture: collaborators.capture,
                export: collaborators.export,
                presentation: collaborators.presentation.clone(),
            },
            EditorUi::new(frame),
            config.mining.clone(),
        );

        let (bulk_tx, bulk_rx) = mpsc::unbounded_channel();
        let (intent_tx, intents) = mpsc::unbounded_channel();
        let timing = &config.timing;

        let controller = Self {
            config: config.clone(),
            engine: TimingEngine::new(TimingOptions::from(timing)),
            orchestrator,
            scheduler: BulkExportScheduler::new(bulk_tx),
            play_mode: PlayModeState::new(timing.play_mode, timing.auto_pause_preference, timing.condensed_min_skip_ms),
            playback: collaborators.playback,
            presentation: collaborators.presentation,
            intents,
            ui_events,
            acks,
            bound: true,
        };

        Ok((controller, ControllerHandle { intents: intent_tx }, bulk_rx))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &TimingEngine {
        &self.engine
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn scheduler(&self) -> &BulkExportScheduler {
        &self.scheduler
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Replace the loaded subtitles
    pub fn load_subtitles(&mut self, subtitles: Vec<Subtitle>) {
        self.engine.set_subtitles(subtitles);
        self.presentation.show_subtitles(&[]);
    }

    /// Run until shutdown or until every intent sender is gone
    pub async fn run(&mut self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.timing.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Mining controller started");

        while self.bound {
            let deadline = self.orchestrator.recording_deadline();

            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                intent = self.intents.recv() => match intent {
                    Some(intent) => {
                        if !self.handle_intent(intent).await {
                            break;
                        }
                    }
                    None => break,
                },
                Some(message) = self.ui_events.recv() => self.on_ui_event(message).await,
                Some(ack) = self.acks.recv() => self.on_card_exported(ack).await,
                _ = sleep_until_deadline(deadline) => self.on_recording_deadline().await,
            }
        }

        self.unbind();
        info!("Mining controller stopped");
        Ok(())
    }

    /// One timing tick: update the overlay, apply the play mode and feed
    /// the bulk export
    pub async fn tick(&mut self) {
        let now = self.playback.current_time_ms();
        let tick = self.engine.at(now);
        if tick.subtitles_are_new {
            self.presentation.show_subtitles(&tick.snapshot.showing);
        }

        let recording = self.orchestrator.is_recording();
        if let Some(action) = self.play_mode.on_tick(&tick.snapshot, now, recording) {
            let result = match action {
                PlayModeAction::Pause => self.playback.pause().await,
                PlayModeAction::Seek(timestamp) => {
                    let result = self.playback.seek(timestamp).await;
                    self.engine.force_recheck();
                    result
                }
            };
            if let Err(e) = result {
                warn!("Play mode could not drive playback: {}", e);
            }
        }

        self.drive_bulk().await;
    }

    /// Apply one intent. Returns false when the controller should stop.
    pub async fn handle_intent(&mut self, intent: ViewerIntent) -> bool {
        debug!("Intent: {:?}", intent);
        match intent {
            ViewerIntent::Mine(_) | ViewerIntent::ToggleRecording | ViewerIntent::TakeScreenshot
                if self.scheduler.in_flight() =>
            {
                self.report(Err(MiningError::Busy));
            }
            ViewerIntent::Mine(post_action) => {
                let result = self.orchestrator.mine(&mut self.engine, post_action).await;
                self.report(result);
            }
            ViewerIntent::ToggleRecording => {
                let result = self.orchestrator.toggle_recording(&mut self.engine).await;
                self.report(result);
            }
            ViewerIntent::TakeScreenshot => {
                let result = self.orchestrator.take_screenshot(&mut self.engine).await;
                self.report(result);
            }
            ViewerIntent::StartBulk => {
                let from = self.current_line_index();
                if self.scheduler.start(self.engine.subtitles(), from) {
                    self.drive_bulk().await;
                }
            }
            ViewerIntent::CancelBulk => {
                if self.scheduler.cancel() {
                    if let Err(e) = self.playback.pause().await {
                        warn!("Could not pause after cancelling bulk export: {}", e);
                    }
                }
            }
            ViewerIntent::Offset(delta) => {
                self.engine.offset(delta);
                info!("Subtitle offset is now {} ms", self.engine.current_offset());
            }
            ViewerIntent::ToggleTrack(track) => {
                let enabled = self.engine.track_enabled(track);
                self.engine.set_track_enabled(track, !enabled);
            }
            ViewerIntent::Seek(timestamp) => {
                if let Err(e) = self.playback.seek(timestamp).await {
                    warn!("Seek failed: {}", e);
                }
                self.engine.force_recheck();
            }
            ViewerIntent::SetPlayMode(mode) => self.play_mode.set_mode(mode),
            ViewerIntent::SetLanguage(language) => match language_utils::normalize_ui_language(&language) {
                Ok(language) => self.orchestrator.editor_mut().frame_mut().set_language(language),
                Err(e) => warn!("Ignoring UI language change: {}", e),
            },
            ViewerIntent::LoadSubtitles(subtitles) => self.load_subtitles(subtitles),
            ViewerIntent::OpenSettings => {
                let result = self.orchestrator.open_settings().await;
                self.report(result);
            }
            ViewerIntent::CloseSettings => {
                let result = self.orchestrator.close_settings().await;
                self.report(result);
            }
            ViewerIntent::Shutdown => return false,
        }
        true
    }

    /// Hand an editor event to the orchestrator
    pub async fn on_ui_event(&mut self, message: ServerMessage) {
        let result = self.orchestrator.on_ui_message(&mut self.engine, message).await;
        self.report(result);
    }

    /// Note an export acknowledgement and move the bulk export along
    pub async fn on_card_exported(&mut self, ack: CardExported) {
        self.orchestrator.on_card_exported(&ack);
        if self.scheduler.on_card_exported(&ack) {
            self.drive_bulk().await;
        }
    }

    /// Stop a fixed-length recording whose deadline passed
    pub async fn on_recording_deadline(&mut self) {
        let bulk = self.orchestrator.is_mining_bulk();
        if let Err(e) = self.orchestrator.on_recording_deadline(&mut self.engine).await {
            debug!("Recording could not be finished: {}", e);
            if bulk {
                self.scheduler.on_mine_failed();
                self.drive_bulk().await;
            }
        }
    }

    /// Release the video. Idempotent.
    pub fn unbind(&mut self) {
        if !self.bound {
            return;
        }
        self.bound = false;
        self.scheduler.cancel();
        self.orchestrator.unbind();
        self.engine.clear_subtitles();
        debug!("Mining controller unbound");
    }

    async fn drive_bulk(&mut self) {
        if !self.orchestrator.is_idle() {
            return;
        }
        let Some(index) = self.scheduler.claim_next() else {
            return;
        };
        let Some(subtitle) = self.engine.subtitles().iter().find(|s| s.index == index).cloned() else {
            debug!("Bulk line {} is no longer loaded", index);
            self.scheduler.on_mine_failed();
            return;
        };

        if let Err(e) = self.playback.seek(subtitle.start).await {
            warn!("Seek to bulk line {} failed: {}", index, e);
        }
        self.engine.force_recheck();

        let result = self
            .orchestrator
            .mine_subtitle(&mut self.engine, subtitle, PostMineAction::Export, true)
            .await;
        if let Err(e) = result {
            debug!("Bulk line {} failed: {}", index, e);
            self.scheduler.on_mine_failed();
        }
    }

    /// Index of the line showing now, or of the next one to show
    fn current_line_index(&self) -> Option<usize> {
        let now = self.playback.current_time_ms();
        let subtitles = self.engine.subtitles();
        subtitles
            .iter()
            .find(|s| s.has_text() && s.end > now)
            .map(|s| s.index)
            .or_else(|| subtitles.last().map(|s| s.index + 1))
    }

    fn report(&self, result: Result<(), MiningError>) {
        match result {
            Ok(()) => {}
            Err(MiningError::Busy) => debug!("Ignored: a mining operation is already in progress"),
            Err(MiningError::NoSubtitle) => {
                self.presentation
                    .notify(Notification::Info("No subtitle to mine here".to_string()));
            }
            // already reported by the orchestrator
            Err(e) => debug!("Mining operation failed: {}", e),
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
