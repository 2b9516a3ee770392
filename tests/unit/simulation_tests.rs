/*!
 * Tests for the simulated collaborators
 */

use std::time::Duration;
use submine::mining::{
    CapturedMedia, ExportTarget, ForwardOutcome, MediaCapture, MiningEvent, Notification, PlaybackAdapter,
    PostMineAction, Presentation, RecordingRequest,
};
use submine::simulation::{CaptureBehavior, HeadlessPresentation, JsonLinesExport, SimulatedCapture, SimulatedPlayback};
use submine::timing::Subtitle;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::common;

fn event(post_action: PostMineAction, is_bulk: bool) -> MiningEvent {
    let subtitle = Subtitle::new(0, 0, 1000, "a");
    MiningEvent::new(subtitle.clone(), vec![subtitle], None, false, post_action, is_bulk)
}

#[tokio::test(start_paused = true)]
async fn test_simulatedPlayback_whilePlaying_shouldFollowClockAndRate() {
    let playback = SimulatedPlayback::new();
    assert!(playback.paused());

    playback.seek(1000).await.unwrap();
    playback.play().await.unwrap();
    tokio::time::advance(Duration::from_millis(500)).await;
    assert_eq!(playback.current_time_ms(), 1500);

    playback.set_playback_rate(2.0);
    tokio::time::advance(Duration::from_millis(500)).await;
    assert_eq!(playback.current_time_ms(), 2500);

    playback.pause().await.unwrap();
    tokio::time::advance(Duration::from_millis(500)).await;
    assert_eq!(playback.current_time_ms(), 2500);
    assert_eq!(playback.seek_history(), vec![1000]);
}

#[tokio::test]
async fn test_simulatedCapture_stopWithoutStart_shouldFail() {
    let capture = SimulatedCapture::working();
    assert!(capture.stop_recording().await.is_err());
}

#[tokio::test]
async fn test_simulatedCapture_staleNextClip_shouldReturnForeignIdOnce() {
    let capture = SimulatedCapture::new(CaptureBehavior::StaleNextClip);
    let id = Uuid::new_v4();
    let request = RecordingRequest {
        id,
        start_timestamp: 0,
        end_timestamp: Some(1000),
    };

    capture.start_recording(request.clone()).await.unwrap();
    assert_ne!(capture.stop_recording().await.unwrap().recording_id, id);

    capture.start_recording(request).await.unwrap();
    let clip = capture.stop_recording().await.unwrap();
    assert_eq!(clip.recording_id, id);
    assert_eq!(clip.window.end_timestamp, 1000);
    assert_eq!(capture.recordings(), 2);
}

#[tokio::test]
async fn test_simulatedCapture_failingScreenshots_shouldFail() {
    let capture = SimulatedCapture::new(CaptureBehavior::FailingScreenshots);
    assert!(capture.take_screenshot(0).await.is_err());
    capture.set_behavior(CaptureBehavior::Working);
    assert!(capture.take_screenshot(0).await.is_ok());
    assert_eq!(capture.screenshots(), 1);
}

#[tokio::test]
async fn test_jsonLinesExport_forward_shouldAckOnlyExports() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let export = JsonLinesExport::new(tx);
    let media = CapturedMedia::default();

    let outcome = export.forward(&event(PostMineAction::OpenEditor, false), &media).await.unwrap();
    assert_eq!(outcome, ForwardOutcome::EditorRequested);
    assert!(rx.try_recv().is_err());

    let outcome = export.forward(&event(PostMineAction::Export, true), &media).await.unwrap();
    assert_eq!(outcome, ForwardOutcome::Submitted);
    assert!(rx.try_recv().unwrap().is_bulk_export);

    let outcome = export.forward(&event(PostMineAction::None, false), &media).await.unwrap();
    assert_eq!(outcome, ForwardOutcome::Submitted);
    assert!(rx.try_recv().is_err());
    assert_eq!(export.forwarded().len(), 3);
}

#[test]
fn test_headlessPresentation_restoreFocus_withoutSave_shouldDoNothing() {
    let presentation = HeadlessPresentation::new();
    presentation.restore_focus();
    assert_eq!(presentation.state().focus_restores, 0);

    presentation.save_focus();
    presentation.restore_focus();
    presentation.notify(Notification::Info("hello".to_string()));
    let state = presentation.state();
    assert_eq!(state.focus_restores, 1);
    assert_eq!(state.notifications, vec![Notification::Info("hello".to_string())]);
}

#[test]
fn test_jsonLinesExport_withWriter_shouldWriteOneLinePerEvent() -> anyhow::Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("cards.jsonl");
    let file = std::fs::File::create(&path)?;
    let export = JsonLinesExport::new(mpsc::unbounded_channel().0).with_writer(Box::new(file));

    tokio_test::block_on(async {
        let media = CapturedMedia::default();
        export.forward(&event(PostMineAction::Export, true), &media).await?;
        export.forward(&event(PostMineAction::UpdateLast, false), &media).await?;
        Ok::<_, anyhow::Error>(())
    })?;

    let written = std::fs::read_to_string(&path)?;
    let lines: Vec<serde_json::Value> = written
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"]["isBulk"], serde_json::json!(true));
    assert_eq!(lines[1]["event"]["postAction"], serde_json::json!("updateLast"));
    assert_eq!(lines[0]["audioBytes"], serde_json::json!(0));
    Ok(())
}
