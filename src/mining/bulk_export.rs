/*!
 * Unattended export of every non-empty line.
 *
 * The scheduler only decides *which* line comes next and *when* it may be
 * mined; its owner does the mining. Advancement is driven by bulk
 * `card-exported` acknowledgements, never by timers, and at most one line is
 * in flight at any time.
 */

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use super::event::CardExported;
use crate::timing::Subtitle;

/// Announcements made to bulk export observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum BulkExportMessage {
    #[serde(rename = "bulk-export-started")]
    Started { total: usize },
    #[serde(rename = "bulk-export-progress")]
    Progress { current: usize, total: usize },
    #[serde(rename = "bulk-export-cancelled")]
    Cancelled,
    #[serde(rename = "bulk-export-completed")]
    Completed,
}

#[derive(Debug)]
pub struct BulkExportScheduler {
    queue: Vec<usize>,
    cursor: usize,
    in_flight: bool,
    running: bool,
    cancelled: bool,
    announcements: UnboundedSender<BulkExportMessage>,
}

impl BulkExportScheduler {
    pub fn new(announcements: UnboundedSender<BulkExportMessage>) -> Self {
        Self {
            queue: Vec::new(),
            cursor: 0,
            in_flight: false,
            running: false,
            cancelled: false,
            announcements,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// Number of lines acknowledged so far in this run
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Subtitle indices of this run, in export order
    pub fn queue(&self) -> &[usize] {
        &self.queue
    }

    /// Start a run over the non-empty lines from `current_index` onwards.
    /// Lines before it are left out of the run. Returns false, doing nothing,
    /// when a run is already going or there is nothing to export.
    pub fn start(&mut self, subtitles: &[Subtitle], current_index: Option<usize>) -> bool {
        if self.running {
            debug!("Bulk export already running");
            return false;
        }

        let from = current_index.unwrap_or(0);
        let queue: Vec<usize> = subtitles
            .iter()
            .filter(|s| s.has_text() && s.index >= from)
            .map(|s| s.index)
            .collect();
        if queue.is_empty() {
            debug!("No lines to bulk export");
            return false;
        }

        info!("Bulk export of {} line(s) started", queue.len());
        self.queue = queue;
        self.cursor = 0;
        self.in_flight = false;
        self.running = true;
        self.cancelled = false;
        self.announce(BulkExportMessage::Started { total: self.queue.len() });
        true
    }

    /// Claim the next line to mine. `None` while one is already in flight,
    /// when idle, or when the queue is exhausted.
    pub fn claim_next(&mut self) -> Option<usize> {
        if !self.running || self.cancelled || self.in_flight {
            return None;
        }

        let index = *self.queue.get(self.cursor)?;
        self.in_flight = true;
        Some(index)
    }

    /// Advance on a bulk acknowledgement. Interactive acknowledgements and
    /// acknowledgements with nothing in flight are ignored.
    pub fn on_card_exported(&mut self, ack: &CardExported) -> bool {
        if !ack.is_bulk_export {
            return false;
        }
        if !self.running || !self.in_flight {
            debug!("Ignoring bulk acknowledgement with nothing in flight");
            return false;
        }

        self.advance();
        true
    }

    /// The in-flight line could not be mined; move past it
    pub fn on_mine_failed(&mut self) {
        if self.running && self.in_flight {
            debug!("Skipping line {} after a failed capture", self.cursor);
            self.advance();
        }
    }

    /// Stop the run. The line in flight, if any, is not aborted, but nothing
    /// after it starts. Returns false if no run was going.
    pub fn cancel(&mut self) -> bool {
        if !self.running {
            return false;
        }

        info!("Bulk export cancelled at {}/{}", self.cursor, self.queue.len());
        self.cancelled = true;
        self.reset();
        self.announce(BulkExportMessage::Cancelled);
        true
    }

    fn advance(&mut self) {
        self.in_flight = false;
        self.cursor += 1;
        let total = self.queue.len();
        self.announce(BulkExportMessage::Progress {
            current: self.cursor,
            total,
        });

        if self.cursor >= total {
            info!("Bulk export of {} line(s) completed", total);
            self.reset();
            self.announce(BulkExportMessage::Completed);
        }
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.cursor = 0;
        self.in_flight = false;
        self.running = false;
    }

    fn announce(&self, message: BulkExportMessage) {
        if self.announcements.send(message).is_err() {
            debug!("No bulk export observer");
        }
    }
}
