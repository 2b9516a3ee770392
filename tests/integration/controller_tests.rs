/*!
 * Integration tests for the mining controller lifecycle
 */

use anyhow::Result;
use std::time::Duration;

use submine::app_config::Config;
use submine::mining::{BulkExportMessage, CardExported, Notification, PlaybackAdapter, PostMineAction};
use submine::simulation::{CaptureBehavior, SurfaceBehavior};
use submine::{ControllerHandle, ViewerIntent};

use crate::common::{self, ControllerHarness};

fn editor_config() -> Config {
    let mut config = Config::default();
    config.mining = common::text_only_settings();
    config.mining.post_mine_action = PostMineAction::OpenEditor;
    config
}

/// Collect bulk announcements, reacting to each, until the run is over
fn watch_bulk(
    mut bulk: tokio::sync::mpsc::UnboundedReceiver<BulkExportMessage>,
    handle: ControllerHandle,
    cancel_after: Option<usize>,
) -> tokio::task::JoinHandle<Vec<BulkExportMessage>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(message) = bulk.recv().await {
            let finished = matches!(message, BulkExportMessage::Completed | BulkExportMessage::Cancelled);
            if let (BulkExportMessage::Progress { current, .. }, Some(limit)) = (&message, cancel_after) {
                if *current == limit {
                    let _ = handle.send(ViewerIntent::CancelBulk);
                }
            }
            seen.push(message);
            if finished {
                let _ = handle.send(ViewerIntent::Shutdown);
                break;
            }
        }
        seen
    })
}

/// Bulk export over the sample lines mines 0 and 2 and skips the empty one
#[tokio::test(start_paused = true)]
async fn test_run_withBulkExport_shouldExportEveryNonEmptyLine() -> Result<()> {
    let h = ControllerHarness::new(&Config::default(), SurfaceBehavior::Passive, None)?;
    let ControllerHarness {
        mut controller,
        handle,
        bulk,
        export,
        capture,
        ..
    } = h;
    controller.load_subtitles(common::sample_subtitles());

    let watcher = watch_bulk(bulk, handle.clone(), None);
    handle.send(ViewerIntent::StartBulk)?;
    tokio::time::timeout(Duration::from_secs(60), controller.run()).await??;

    let seen = watcher.await?;
    assert_eq!(
        seen,
        vec![
            BulkExportMessage::Started { total: 2 },
            BulkExportMessage::Progress { current: 1, total: 2 },
            BulkExportMessage::Progress { current: 2, total: 2 },
            BulkExportMessage::Completed,
        ]
    );

    let forwarded = export.forwarded();
    assert_eq!(forwarded.len(), 2);
    assert!(forwarded.iter().all(|event| event.is_bulk));
    assert_eq!(forwarded[0].subtitle.index, 0);
    assert_eq!(forwarded[1].subtitle.index, 2);
    assert_eq!(capture.recordings(), 2);
    assert!(!controller.is_bound());
    Ok(())
}

/// A stale clip on the first line skips it and the run still completes
#[tokio::test(start_paused = true)]
async fn test_run_withStaleClipDuringBulk_shouldSkipLineAndComplete() -> Result<()> {
    let h = ControllerHarness::new(&Config::default(), SurfaceBehavior::Passive, None)?;
    let ControllerHarness {
        mut controller,
        handle,
        bulk,
        export,
        capture,
        ..
    } = h;
    controller.load_subtitles(common::sample_subtitles());
    capture.set_behavior(CaptureBehavior::StaleNextClip);

    let watcher = watch_bulk(bulk, handle.clone(), None);
    handle.send(ViewerIntent::StartBulk)?;
    tokio::time::timeout(Duration::from_secs(60), controller.run()).await??;

    let seen = watcher.await?;
    assert_eq!(
        seen,
        vec![
            BulkExportMessage::Started { total: 2 },
            BulkExportMessage::Progress { current: 1, total: 2 },
            BulkExportMessage::Progress { current: 2, total: 2 },
            BulkExportMessage::Completed,
        ]
    );

    let forwarded = export.forwarded();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].subtitle.index, 2);
    assert_eq!(capture.recordings(), 2);
    Ok(())
}

/// Viewer capture intents are refused while a bulk line waits for its acknowledgement
#[tokio::test(start_paused = true)]
async fn test_handleIntent_captureDuringBulk_shouldNotDisturbRun() -> Result<()> {
    let mut h = ControllerHarness::new(&Config::default(), SurfaceBehavior::Passive, None)?;
    h.controller.load_subtitles(common::sample_subtitles());

    h.controller.handle_intent(ViewerIntent::StartBulk).await;
    assert!(h.controller.orchestrator().is_mining_bulk());
    tokio::time::advance(Duration::from_millis(1500)).await;
    h.controller.on_recording_deadline().await;

    // line 0 is forwarded; its acknowledgement has not been handled yet
    assert!(h.controller.orchestrator().is_idle());
    assert!(h.controller.scheduler().in_flight());
    assert_eq!(h.controller.scheduler().cursor(), 0);

    h.controller.handle_intent(ViewerIntent::Seek(500)).await;
    h.controller
        .handle_intent(ViewerIntent::Mine(Some(PostMineAction::Export)))
        .await;
    h.controller.handle_intent(ViewerIntent::ToggleRecording).await;
    h.controller.handle_intent(ViewerIntent::TakeScreenshot).await;

    assert_eq!(h.export.forwarded().len(), 1);
    assert_eq!(h.capture.recordings(), 1);
    assert_eq!(h.capture.screenshots(), 1);
    assert!(!h.capture.is_recording());
    assert!(h.controller.scheduler().in_flight());
    assert_eq!(h.controller.scheduler().cursor(), 0);

    h.controller.on_card_exported(CardExported::bulk()).await;

    assert_eq!(h.controller.scheduler().cursor(), 1);
    assert!(h.controller.orchestrator().is_mining_bulk());
    assert!(h.capture.is_recording());
    Ok(())
}

/// A failed viewer recording started before the run leaves the run where it was
#[tokio::test(start_paused = true)]
async fn test_onRecordingDeadline_interactiveFailureDuringBulk_shouldNotAdvanceRun() -> Result<()> {
    let mut h = ControllerHarness::new(&Config::default(), SurfaceBehavior::Passive, None)?;
    h.controller.load_subtitles(common::sample_subtitles());
    h.playback.seek(500).await?;

    h.controller
        .handle_intent(ViewerIntent::Mine(Some(PostMineAction::Export)))
        .await;
    assert!(h.controller.orchestrator().is_recording());
    assert!(!h.controller.orchestrator().is_mining_bulk());

    h.controller.handle_intent(ViewerIntent::StartBulk).await;
    assert!(h.controller.scheduler().is_running());
    assert!(!h.controller.scheduler().in_flight());

    h.capture.set_behavior(CaptureBehavior::StaleNextClip);
    tokio::time::advance(Duration::from_millis(1500)).await;
    h.controller.on_recording_deadline().await;

    assert!(h.controller.orchestrator().is_idle());
    assert!(h.export.forwarded().is_empty());
    assert_eq!(h.controller.scheduler().cursor(), 0);
    assert!(!h.controller.scheduler().in_flight());

    h.controller.tick().await;

    assert!(h.controller.scheduler().in_flight());
    assert!(h.controller.orchestrator().is_mining_bulk());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withCancelledBulkExport_shouldStopAndPause() -> Result<()> {
    let h = ControllerHarness::new(&Config::default(), SurfaceBehavior::Passive, None)?;
    let ControllerHarness {
        mut controller,
        handle,
        bulk,
        playback,
        ..
    } = h;
    controller.load_subtitles(common::sample_subtitles());

    let watcher = watch_bulk(bulk, handle.clone(), Some(1));
    handle.send(ViewerIntent::StartBulk)?;
    tokio::time::timeout(Duration::from_secs(60), controller.run()).await??;

    let seen = watcher.await?;
    assert_eq!(seen.first(), Some(&BulkExportMessage::Started { total: 2 }));
    assert_eq!(seen.last(), Some(&BulkExportMessage::Cancelled));
    assert!(!seen.contains(&BulkExportMessage::Completed));
    assert!(!controller.scheduler().is_running());
    assert!(playback.paused());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withEditorResuming_shouldReturnToIdle() -> Result<()> {
    let mut h = ControllerHarness::new(
        &editor_config(),
        SurfaceBehavior::ResumeOnState { card_exported: true },
        None,
    )?;
    h.controller.load_subtitles(common::sample_subtitles());
    h.playback.seek(500).await?;

    let presentation = h.presentation.clone();
    let handle = h.handle.clone();
    let stopper = tokio::spawn(async move {
        while presentation.state().focus_restores == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let _ = handle.send(ViewerIntent::Shutdown);
    });

    h.handle.send(ViewerIntent::Mine(None))?;
    tokio::time::timeout(Duration::from_secs(30), h.controller.run()).await??;
    stopper.await?;

    assert!(h.controller.orchestrator().is_idle());
    assert!(h.controller.orchestrator().snapshot().is_some_and(|s| s.card_exported));
    assert_eq!(h.surfaces.created(), 1);
    assert_eq!(h.export.forwarded().len(), 1);
    assert!(h.presentation.state().keys_bound);
    Ok(())
}

#[tokio::test]
async fn test_handleIntent_mineInGap_shouldNotifyViewer() -> Result<()> {
    let mut h = ControllerHarness::new(&Config::default(), SurfaceBehavior::Passive, None)?;
    h.controller.load_subtitles(vec![submine::Subtitle::new(0, 5000, 6000, "later")]);

    assert!(h.controller.handle_intent(ViewerIntent::Mine(None)).await);

    assert_eq!(
        h.presentation.state().notifications,
        vec![Notification::Info("No subtitle to mine here".to_string())]
    );
    assert!(h.export.forwarded().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_handleIntent_setLanguage_shouldMarkSurfaceForRecreation() -> Result<()> {
    let mut h = ControllerHarness::new(&Config::default(), SurfaceBehavior::Passive, None)?;

    h.controller.handle_intent(ViewerIntent::SetLanguage("JA".to_string())).await;
    assert_eq!(h.controller.orchestrator().editor().frame().language(), "ja");
    assert!(h.controller.orchestrator().editor().frame().is_dirty());

    h.controller.handle_intent(ViewerIntent::SetLanguage("xx".to_string())).await;
    assert_eq!(h.controller.orchestrator().editor().frame().language(), "ja");
    Ok(())
}

#[tokio::test]
async fn test_tick_afterSeek_shouldShowCurrentLine() -> Result<()> {
    let mut h = ControllerHarness::new(&Config::default(), SurfaceBehavior::Passive, None)?;
    h.controller.load_subtitles(common::sample_subtitles());

    h.controller.handle_intent(ViewerIntent::Seek(2500)).await;
    h.controller.tick().await;

    assert_eq!(h.presentation.state().overlay, vec!["b".to_string()]);
    assert_eq!(h.playback.seek_history(), vec![2500]);
    Ok(())
}

#[tokio::test]
async fn test_handleIntent_offset_shouldAccumulate() -> Result<()> {
    let mut h = ControllerHarness::new(&Config::default(), SurfaceBehavior::Passive, None)?;
    h.controller.load_subtitles(common::sample_subtitles());

    h.controller.handle_intent(ViewerIntent::Offset(500)).await;
    h.controller.handle_intent(ViewerIntent::Offset(-200)).await;

    assert_eq!(h.controller.engine().current_offset(), 300);
    assert_eq!(h.controller.engine().subtitles()[0].start, 300);
    Ok(())
}

#[tokio::test]
async fn test_run_afterHandlesDropped_shouldUnbind() -> Result<()> {
    let h = ControllerHarness::new(&Config::default(), SurfaceBehavior::Passive, None)?;
    let ControllerHarness {
        mut controller, handle, ..
    } = h;
    drop(handle);

    tokio::time::timeout(Duration::from_secs(5), controller.run()).await??;

    assert!(!controller.is_bound());
    Ok(())
}

#[tokio::test]
async fn test_handleIntent_shutdown_shouldStopController() -> Result<()> {
    let mut h = ControllerHarness::new(&Config::default(), SurfaceBehavior::Passive, None)?;
    assert!(!h.controller.handle_intent(ViewerIntent::Shutdown).await);
    assert!(h.controller.handle_intent(ViewerIntent::OpenSettings).await);
    assert!(h.controller.handle_intent(ViewerIntent::CloseSettings).await);
    assert!(h.presentation.state().keys_bound);
    Ok(())
}
