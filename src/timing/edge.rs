/*!
 * Edge detection for "line started" / "line about to stop" events.
 */

use super::model::Subtitle;

/// Remembers the last line reported for each edge so a line is reported once,
/// however many ticks it keeps qualifying
#[derive(Debug, Clone, Default)]
pub struct EdgeTrigger {
    last_started: Option<Subtitle>,
    last_will_stop: Option<Subtitle>,
}

impl EdgeTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the line if it has not been reported as started yet
    pub fn started(&mut self, subtitle: Option<Subtitle>) -> Option<Subtitle> {
        Self::fire(&mut self.last_started, subtitle)
    }

    /// Returns the line if it has not been reported as stopping yet
    pub fn will_stop(&mut self, subtitle: Option<Subtitle>) -> Option<Subtitle> {
        Self::fire(&mut self.last_will_stop, subtitle)
    }

    /// Forget everything reported so far
    pub fn clear(&mut self) {
        self.last_started = None;
        self.last_will_stop = None;
    }

    fn fire(last: &mut Option<Subtitle>, subtitle: Option<Subtitle>) -> Option<Subtitle> {
        let subtitle = subtitle?;
        if last.as_ref() == Some(&subtitle) {
            return None;
        }
        *last = Some(subtitle.clone());
        Some(subtitle)
    }
}
