/*!
 * The timing engine: from a sorted subtitle list and the current playback
 * position, decide what is showing, what just started, what is about to stop
 * and what comes next.
 *
 * The engine is polled on a fixed period by its owner; it performs no I/O and
 * holds no timers itself. Seeks must be followed by [`TimingEngine::force_recheck`]
 * so edge events are re-evaluated against the new position.
 */

use log::debug;
use std::collections::HashSet;

use crate::app_config::TimingConfig;

use super::collection::{CollectionOptions, SubtitleCollection};
use super::edge::EdgeTrigger;
use super::model::{ShowingSnapshot, Subtitle};
use super::surrounding::{surrounding_subtitles, surrounding_subtitles_around_interval};

/// Engine tuning, usually derived from [`TimingConfig`]
#[derive(Debug, Clone, Copy)]
pub struct TimingOptions {
    /// Radius for the started/about-to-stop flags
    pub showing_check_radius_ms: i64,
    /// Minimum lines of context on each side of a mined line
    pub surrounding_count_radius: usize,
    /// Minimum ms of context on each side of a mined line
    pub surrounding_time_radius_ms: i64,
}

impl Default for TimingOptions {
    fn default() -> Self {
        Self {
            showing_check_radius_ms: 150,
            surrounding_count_radius: 1,
            surrounding_time_radius_ms: 5000,
        }
    }
}

impl From<&TimingConfig> for TimingOptions {
    fn from(config: &TimingConfig) -> Self {
        Self {
            showing_check_radius_ms: config.showing_check_radius_ms,
            surrounding_count_radius: config.surrounding_count_radius,
            surrounding_time_radius_ms: config.surrounding_time_radius_ms,
        }
    }
}

/// Output of one engine tick
#[derive(Debug, Clone, Default)]
pub struct Tick {
    /// Snapshot with edge-triggered flags
    pub snapshot: ShowingSnapshot,
    /// Whether `showing` differs from the previous tick
    pub subtitles_are_new: bool,
}

/// Polled subtitle timing engine
#[derive(Debug, Default)]
pub struct TimingEngine {
    collection: SubtitleCollection,
    disabled_tracks: HashSet<usize>,
    showing: Option<Vec<Subtitle>>,
    edges: EdgeTrigger,
    options: TimingOptions,
}

impl TimingEngine {
    /// Create an empty engine
    pub fn new(options: TimingOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Engine options
    pub fn options(&self) -> &TimingOptions {
        &self.options
    }

    /// Replace the loaded subtitle set. Lines are sorted by start and
    /// re-indexed `0..n`.
    pub fn set_subtitles(&mut self, mut subtitles: Vec<Subtitle>) {
        subtitles.sort_by_key(|s| s.start);
        for (index, subtitle) in subtitles.iter_mut().enumerate() {
            subtitle.index = index;
        }
        debug!("Loaded {} subtitle(s)", subtitles.len());
        self.rebuild(subtitles);
    }

    /// Drop every loaded line
    pub fn clear_subtitles(&mut self) {
        self.rebuild(Vec::new());
    }

    /// The loaded lines, sorted by start
    pub fn subtitles(&self) -> &[Subtitle] {
        self.collection.subtitles()
    }

    /// Shift the timeline by `delta` ms relative to the current offset. Every
    /// line is rebuilt from its original times, so opposite deltas cancel
    /// exactly. Edge state is reset.
    pub fn offset(&mut self, delta: i64) {
        let target = self.current_offset() + delta;
        self.set_offset(target);
    }

    /// Set the absolute offset: every line becomes `original + offset`
    pub fn set_offset(&mut self, offset: i64) {
        if self.collection.is_empty() {
            return;
        }

        let shifted = self
            .collection
            .subtitles()
            .iter()
            .map(|s| s.with_offset(offset))
            .collect();
        debug!("Applied subtitle offset of {} ms", offset);
        self.rebuild(shifted);
    }

    /// The offset currently applied to the loaded lines
    pub fn current_offset(&self) -> i64 {
        self.collection
            .subtitles()
            .first()
            .map(|s| s.start - s.original_start)
            .unwrap_or(0)
    }

    /// Enable or disable a track. Lines on disabled tracks are treated as absent.
    pub fn set_track_enabled(&mut self, track: usize, enabled: bool) {
        let changed = if enabled {
            self.disabled_tracks.remove(&track)
        } else {
            self.disabled_tracks.insert(track)
        };

        if changed {
            self.force_recheck();
        }
    }

    /// Whether a track is enabled
    pub fn track_enabled(&self, track: usize) -> bool {
        !self.disabled_tracks.contains(&track)
    }

    /// Forget the previous tick so the next one re-evaluates from scratch.
    /// Call after every explicit seek.
    pub fn force_recheck(&mut self) {
        self.edges.clear();
        self.showing = None;
    }

    /// Evaluate the timeline at `timestamp`
    pub fn at(&mut self, timestamp: i64) -> Tick {
        let disabled = &self.disabled_tracks;
        let mut snapshot = self
            .collection
            .slice_at(timestamp, |s| !disabled.contains(&s.track));

        snapshot.started_showing = self.edges.started(snapshot.started_showing.take());
        snapshot.will_stop_showing = self.edges.will_stop(snapshot.will_stop_showing.take());

        let subtitles_are_new = self.showing.as_ref() != Some(&snapshot.showing);
        if subtitles_are_new {
            self.showing = Some(snapshot.showing.clone());
        }

        Tick {
            snapshot,
            subtitles_are_new,
        }
    }

    /// The first enabled line showing at `timestamp`, with its context window
    pub fn current_subtitle(&self, timestamp: i64) -> Option<(Subtitle, Vec<Subtitle>)> {
        let subtitles = self.collection.subtitles();
        let index = subtitles
            .iter()
            .position(|s| s.contains(timestamp) && self.track_enabled(s.track))?;

        let surrounding = surrounding_subtitles(
            subtitles,
            index,
            self.options.surrounding_count_radius,
            self.options.surrounding_time_radius_ms,
        );
        Some((subtitles[index].clone(), surrounding))
    }

    /// Context window for an arbitrary line of the loaded set. Falls back to
    /// the line alone when no window can be formed.
    pub fn surrounding_of(&self, subtitle: &Subtitle) -> Vec<Subtitle> {
        match self.around_interval(subtitle.start, subtitle.end) {
            Some((around, _)) if !around.is_empty() => around,
            _ => vec![subtitle.clone()],
        }
    }

    /// Context window around `[start, end]` and the first line after `start`
    pub fn around_interval(&self, start: i64, end: i64) -> Option<(Vec<Subtitle>, Subtitle)> {
        surrounding_subtitles_around_interval(
            self.collection.subtitles(),
            start,
            end,
            self.options.surrounding_count_radius,
            self.options.surrounding_time_radius_ms,
        )
    }

    fn rebuild(&mut self, subtitles: Vec<Subtitle>) {
        self.collection = SubtitleCollection::new(
            subtitles,
            CollectionOptions {
                showing_check_radius_ms: Some(self.options.showing_check_radius_ms),
            },
        );
        self.force_recheck();
    }
}
