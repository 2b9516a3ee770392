/*!
 * Tests for the bulk export scheduler
 */

use submine::mining::{BulkExportMessage, BulkExportScheduler, CardExported};
use tokio::sync::mpsc;

use crate::common;

fn drain(rx: &mut mpsc::UnboundedReceiver<BulkExportMessage>) -> Vec<BulkExportMessage> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

/// Two acknowledged exports complete a run over `[0, 2]`
#[test]
fn test_scheduler_withSampleLines_shouldCompleteAfterTwoAcks() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut scheduler = BulkExportScheduler::new(tx);

    assert!(scheduler.start(&common::sample_subtitles(), Some(0)));
    assert_eq!(scheduler.queue(), &[0, 2]);

    assert_eq!(scheduler.claim_next(), Some(0));
    assert!(scheduler.on_card_exported(&CardExported::bulk()));
    assert_eq!(scheduler.claim_next(), Some(2));
    assert!(scheduler.on_card_exported(&CardExported::bulk()));

    assert!(!scheduler.is_running());
    assert_eq!(scheduler.claim_next(), None);
    assert_eq!(
        drain(&mut rx),
        vec![
            BulkExportMessage::Started { total: 2 },
            BulkExportMessage::Progress { current: 1, total: 2 },
            BulkExportMessage::Progress { current: 2, total: 2 },
            BulkExportMessage::Completed,
        ]
    );
}

/// The cursor only moves on bulk acknowledgements for a line in flight
#[test]
fn test_cursor_withMixedAcks_shouldOnlyAdvanceOnBulkAck() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut scheduler = BulkExportScheduler::new(tx);
    scheduler.start(&common::sample_subtitles(), None);

    // nothing in flight yet
    assert!(!scheduler.on_card_exported(&CardExported::bulk()));
    assert_eq!(scheduler.cursor(), 0);

    scheduler.claim_next();
    for _ in 0..3 {
        assert!(!scheduler.on_card_exported(&CardExported::interactive()));
    }
    assert_eq!(scheduler.cursor(), 0);

    assert!(scheduler.on_card_exported(&CardExported::bulk()));
    assert_eq!(scheduler.cursor(), 1);
    assert!(!scheduler.on_card_exported(&CardExported::bulk()));
    assert_eq!(scheduler.cursor(), 1);
}

#[test]
fn test_cancel_atEveryPosition_shouldLeaveQueueEmpty() {
    for position in 0..3 {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = BulkExportScheduler::new(tx);
        scheduler.start(&common::sample_subtitles(), None);

        for _ in 0..position {
            if scheduler.claim_next().is_some() {
                scheduler.on_card_exported(&CardExported::bulk());
            }
        }
        scheduler.claim_next();

        let was_running = scheduler.is_running();
        assert_eq!(scheduler.cancel(), was_running);
        assert!(scheduler.queue().is_empty());
        assert!(!scheduler.in_flight());
        assert_eq!(scheduler.claim_next(), None);
        if was_running {
            assert_eq!(drain(&mut rx).last(), Some(&BulkExportMessage::Cancelled));
        }
    }
}

#[test]
fn test_onMineFailed_withLastLine_shouldComplete() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut scheduler = BulkExportScheduler::new(tx);
    scheduler.start(&common::sample_subtitles(), Some(2));

    assert_eq!(scheduler.claim_next(), Some(2));
    scheduler.on_mine_failed();

    assert!(!scheduler.is_running());
    assert_eq!(drain(&mut rx).last(), Some(&BulkExportMessage::Completed));
}

#[test]
fn test_start_afterCompletion_shouldRunAgain() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut scheduler = BulkExportScheduler::new(tx);
    scheduler.start(&common::sample_subtitles(), Some(2));
    scheduler.claim_next();
    scheduler.on_card_exported(&CardExported::bulk());

    assert!(scheduler.start(&common::sample_subtitles(), None));
    assert_eq!(scheduler.queue(), &[0, 2]);
}

#[test]
fn test_bulkExportMessage_serialize_shouldUseCommandTag() {
    let json = serde_json::to_value(BulkExportMessage::Started { total: 2 }).unwrap();
    assert_eq!(json, serde_json::json!({ "command": "bulk-export-started", "total": 2 }));

    let json = serde_json::to_value(BulkExportMessage::Completed).unwrap();
    assert_eq!(json, serde_json::json!({ "command": "bulk-export-completed" }));
}
