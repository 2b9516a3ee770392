/*!
 * Interval lookup over a sorted subtitle list.
 *
 * The collection answers "what is showing at `t`" in O(log n + k) using a
 * binary search on start times and a prefix maximum of end times, so long
 * lines that started far before `t` are still found without scanning the
 * whole list.
 */

use super::model::{ShowingSnapshot, Subtitle};

/// Lookup options
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionOptions {
    /// Radius used to flag lines that just started or are about to stop.
    /// `None` disables both flags.
    pub showing_check_radius_ms: Option<i64>,
}

/// Sorted subtitle list with interval queries
#[derive(Debug, Clone, Default)]
pub struct SubtitleCollection {
    subtitles: Vec<Subtitle>,
    // max_end[i] = max(subtitles[0..=i].end)
    max_end: Vec<i64>,
    options: CollectionOptions,
}

impl SubtitleCollection {
    /// Build a collection. Lines are stably sorted by start time.
    pub fn new(mut subtitles: Vec<Subtitle>, options: CollectionOptions) -> Self {
        subtitles.sort_by_key(|s| s.start);

        let mut max_end = Vec::with_capacity(subtitles.len());
        let mut running = i64::MIN;
        for s in &subtitles {
            running = running.max(s.end);
            max_end.push(running);
        }

        Self {
            subtitles,
            max_end,
            options,
        }
    }

    /// An empty collection
    pub fn empty() -> Self {
        Self::default()
    }

    /// All lines, sorted by start
    pub fn subtitles(&self) -> &[Subtitle] {
        &self.subtitles
    }

    pub fn len(&self) -> usize {
        self.subtitles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtitles.is_empty()
    }

    /// Level-triggered snapshot at `timestamp`, considering only lines for
    /// which `enabled` returns true
    pub fn slice_at<F>(&self, timestamp: i64, enabled: F) -> ShowingSnapshot
    where
        F: Fn(&Subtitle) -> bool,
    {
        // Number of lines with start <= timestamp
        let upper = self.subtitles.partition_point(|s| s.start <= timestamp);

        let mut showing = Vec::new();
        for i in (0..upper).rev() {
            if self.max_end[i] <= timestamp {
                break;
            }
            let s = &self.subtitles[i];
            if s.start < s.end && s.end > timestamp && enabled(s) {
                showing.push(s.clone());
            }
        }
        showing.reverse();
        showing.sort_by_key(|s| s.track);

        let last_shown = if showing.is_empty() {
            self.last_shown(upper, timestamp, &enabled)
        } else {
            Vec::new()
        };

        let next_to_show = self.next_to_show(upper, &enabled);

        let mut started_showing = None;
        let mut will_stop_showing = None;
        if let Some(radius) = self.options.showing_check_radius_ms {
            for s in &showing {
                if will_stop_showing.is_none() && s.end <= timestamp + radius {
                    will_stop_showing = Some(s.clone());
                }
                if started_showing.is_none() && timestamp - radius < s.start {
                    started_showing = Some(s.clone());
                }
                if started_showing.is_some() && will_stop_showing.is_some() {
                    break;
                }
            }
        }

        ShowingSnapshot {
            showing,
            last_shown,
            next_to_show,
            started_showing,
            will_stop_showing,
        }
    }

    fn last_shown<F>(&self, upper: usize, timestamp: i64, enabled: &F) -> Vec<Subtitle>
    where
        F: Fn(&Subtitle) -> bool,
    {
        let mut best_end: Option<i64> = None;
        let mut best = Vec::new();

        for i in (0..upper).rev() {
            if let Some(end) = best_end {
                // No earlier line can end later than the prefix maximum
                if self.max_end[i] < end {
                    break;
                }
            }
            let s = &self.subtitles[i];
            if s.start >= s.end || s.end > timestamp || !enabled(s) {
                continue;
            }
            match best_end {
                Some(end) if s.end < end => {}
                Some(end) if s.end == end => best.push(s.clone()),
                _ => {
                    best_end = Some(s.end);
                    best.clear();
                    best.push(s.clone());
                }
            }
        }

        best.reverse();
        best
    }

    fn next_to_show<F>(&self, upper: usize, enabled: &F) -> Vec<Subtitle>
    where
        F: Fn(&Subtitle) -> bool,
    {
        let mut next: Vec<Subtitle> = Vec::new();

        for s in &self.subtitles[upper..] {
            if let Some(first) = next.first() {
                if s.start != first.start {
                    break;
                }
            }
            if s.start < s.end && enabled(s) {
                next.push(s.clone());
            }
        }

        next.sort_by_key(|s| s.track);
        next
    }
}
