/*!
 * Tests for the timing engine
 */

use submine::timing::{Subtitle, TimingEngine, TimingOptions};

use crate::common;

fn engine_with(subtitles: Vec<Subtitle>) -> TimingEngine {
    let mut engine = TimingEngine::new(TimingOptions::default());
    engine.set_subtitles(subtitles);
    engine
}

/// Showing must equal the brute-force interval filter at every instant
#[test]
fn test_at_acrossTimeline_shouldMatchIntervalFilter() {
    let subtitles = vec![
        Subtitle::new(0, 0, 1000, "a"),
        Subtitle::new(1, 500, 4000, "long"),
        Subtitle::new(2, 1000, 2000, "b"),
        Subtitle::new(3, 1000, 2000, "b2").on_track(1),
        Subtitle::new(4, 3000, 3000, "zero"),
        Subtitle::new(5, 5000, 6000, "c"),
    ];
    let mut engine = engine_with(subtitles);
    engine.set_track_enabled(1, false);
    let loaded = engine.subtitles().to_vec();

    for t in (-100..6500).step_by(50) {
        let tick = engine.at(t);
        let mut expected: Vec<Subtitle> = loaded
            .iter()
            .filter(|s| s.start <= t && t < s.end && s.track != 1)
            .cloned()
            .collect();
        expected.sort_by_key(|s| s.track);

        let mut actual = tick.snapshot.showing.clone();
        actual.sort_by_key(|s| s.start);
        expected.sort_by_key(|s| s.start);
        assert_eq!(actual, expected, "mismatch at {}", t);
    }
}

#[test]
fn test_at_withAbuttingLines_shouldSwitchAtEnd() {
    let mut engine = engine_with(vec![Subtitle::new(0, 0, 1000, "first"), Subtitle::new(1, 1000, 2000, "second")]);

    assert_eq!(engine.at(999).snapshot.showing[0].text, "first");
    assert_eq!(engine.at(1000).snapshot.showing[0].text, "second");
    assert!(engine.at(2000).snapshot.showing.is_empty());
}

#[test]
fn test_at_inGap_shouldReportLastShownAndNext() {
    let mut engine = engine_with(vec![Subtitle::new(0, 0, 1000, "a"), Subtitle::new(1, 3000, 4000, "b")]);

    let snapshot = engine.at(2000).snapshot;
    assert!(snapshot.showing.is_empty());
    assert_eq!(snapshot.last_shown.len(), 1);
    assert_eq!(snapshot.last_shown[0].text, "a");
    assert_eq!(snapshot.next().map(|s| s.text.as_str()), Some("b"));
}

#[test]
fn test_at_sameTimestampTwice_shouldNotRefireEdges() {
    let mut engine = engine_with(vec![Subtitle::new(0, 0, 1000, "a")]);

    let first = engine.at(50);
    assert!(first.subtitles_are_new);
    assert!(first.snapshot.started_showing.is_some());

    let second = engine.at(50);
    assert!(!second.subtitles_are_new);
    assert!(second.snapshot.started_showing.is_none());
}

#[test]
fn test_forceRecheck_afterSeek_shouldRefireEdges() {
    let mut engine = engine_with(vec![Subtitle::new(0, 0, 1000, "a")]);

    assert!(engine.at(900).snapshot.will_stop_showing.is_some());
    assert!(engine.at(950).snapshot.will_stop_showing.is_none());

    engine.force_recheck();
    let tick = engine.at(950);
    assert!(tick.subtitles_are_new);
    assert!(tick.snapshot.will_stop_showing.is_some());
}

#[test]
fn test_offset_roundTrip_shouldRestoreEveryLine() {
    let subtitles = common::sample_subtitles();
    let mut engine = engine_with(subtitles.clone());

    engine.offset(1234);
    assert_eq!(engine.current_offset(), 1234);
    assert_eq!(engine.subtitles()[2].start, 3234);
    engine.offset(-1234);

    assert_eq!(engine.current_offset(), 0);
    for (line, original) in engine.subtitles().iter().zip(subtitles.iter()) {
        assert_eq!(line.start, original.start);
        assert_eq!(line.end, original.end);
        assert_eq!(line.original_start, original.start);
    }
}

#[test]
fn test_setTrackEnabled_withDisabledTrack_shouldTreatLinesAsAbsent() {
    let mut engine = engine_with(vec![
        Subtitle::new(0, 0, 1000, "main"),
        Subtitle::new(1, 0, 1000, "other").on_track(1),
        Subtitle::new(2, 2000, 3000, "later").on_track(1),
    ]);
    engine.set_track_enabled(1, false);

    let snapshot = engine.at(500).snapshot;
    assert_eq!(snapshot.showing.len(), 1);
    assert!(snapshot.next_to_show.is_empty());
    assert!(!engine.track_enabled(1));
}

/// Mining at 500 with a single line yields only that line as context
#[test]
fn test_currentSubtitle_withSingleLine_shouldHaveOnlyItAsContext() {
    let mut engine = TimingEngine::new(TimingOptions {
        surrounding_count_radius: 1,
        ..TimingOptions::default()
    });
    engine.set_subtitles(vec![Subtitle::new(0, 0, 1000, "a")]);

    let (subtitle, surrounding) = engine.current_subtitle(500).unwrap();
    assert_eq!(subtitle.index, 0);
    assert_eq!(surrounding.len(), 1);
    assert_eq!(surrounding[0].index, 0);
}

#[test]
fn test_currentSubtitle_inGap_shouldReturnNone() {
    let engine = engine_with(vec![Subtitle::new(0, 0, 1000, "a"), Subtitle::new(1, 3000, 4000, "b")]);
    assert!(engine.current_subtitle(2000).is_none());
}

#[test]
fn test_surroundingOf_withSampleLines_shouldIncludeNeighbours() {
    let engine = engine_with(common::sample_subtitles());
    let target = engine.subtitles()[2].clone();

    let surrounding = engine.surrounding_of(&target);
    assert!(surrounding.contains(&target));
    assert!(surrounding.len() >= 2);
}

#[test]
fn test_clearSubtitles_shouldEmptyTimeline() {
    let mut engine = engine_with(common::sample_subtitles());
    engine.clear_subtitles();

    assert!(engine.subtitles().is_empty());
    assert!(engine.at(500).snapshot.showing.is_empty());
}
