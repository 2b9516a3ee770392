/*!
 * Context windows around a mined line.
 *
 * A window extends from a line in both directions until it is at least
 * `count_radius` lines away AND the next line would start at least
 * `time_radius` ms away from the anchor.
 */

use super::model::Subtitle;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Direction {
    Forward,
    Backward,
}

/// Lines surrounding `subtitles[index]`, the anchor included
pub fn surrounding_subtitles(
    subtitles: &[Subtitle],
    index: usize,
    count_radius: usize,
    time_radius: i64,
) -> Vec<Subtitle> {
    if index >= subtitles.len() {
        return Vec::new();
    }

    let mut start_index = index;
    for i in (0..=index).rev() {
        start_index = i;
        if at_boundary(subtitles, i, index, count_radius, time_radius, Direction::Backward) {
            break;
        }
    }

    let mut end_index = index;
    for i in index..subtitles.len() {
        end_index = i;
        if at_boundary(subtitles, i, index, count_radius, time_radius, Direction::Forward) {
            break;
        }
    }

    subtitles[start_index..=end_index].to_vec()
}

/// Lines surrounding the interval `[start, end]`, and the first line starting
/// at or after `start`. Returns `None` when no window can be formed.
pub fn surrounding_subtitles_around_interval(
    subtitles: &[Subtitle],
    start: i64,
    end: i64,
    count_radius: usize,
    time_radius: i64,
) -> Option<(Vec<Subtitle>, Subtitle)> {
    if subtitles.is_empty() {
        return None;
    }

    let last = subtitles.len() - 1;
    let index_after_start = index_near(subtitles, start, Direction::Forward).unwrap_or(last);
    let start_boundary = (0..subtitles.len())
        .find(|&i| within_boundary(subtitles, i, count_radius, time_radius, start, index_after_start))
        .unwrap_or(last);

    let index_before_end = index_near(subtitles, end, Direction::Backward).unwrap_or(0);
    let end_boundary = (0..subtitles.len())
        .rev()
        .find(|&i| within_boundary(subtitles, i, count_radius, time_radius, end, index_before_end))
        .unwrap_or(0);

    if end_boundary < start_boundary {
        return None;
    }

    Some((
        subtitles[start_boundary..=end_boundary].to_vec(),
        subtitles[index_after_start].clone(),
    ))
}

/// Text for a mined line: the non-empty lines of `surrounding` overlapping at
/// least half of `subtitle`, optionally restricted to one track
pub fn extract_text(subtitle: &Subtitle, surrounding: &[Subtitle], track: Option<usize>) -> String {
    if surrounding.is_empty() {
        return subtitle.text.clone();
    }

    let filtered: Vec<Subtitle> = surrounding
        .iter()
        .filter(|s| intersects_interval(s, subtitle.start, subtitle.end))
        .filter(|s| track.is_none_or(|t| s.track == t))
        .cloned()
        .collect();

    join_subtitles(&filtered)
}

/// Join the non-blank lines with newlines
pub fn join_subtitles(subtitles: &[Subtitle]) -> String {
    subtitles
        .iter()
        .filter(|s| !s.text.trim().is_empty())
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether at least half of `subtitle` lies inside `[start, end]`
pub fn intersects_interval(subtitle: &Subtitle, start: i64, end: i64) -> bool {
    let length = subtitle.duration();
    if length == 0 {
        return false;
    }

    let overlap = subtitle.end.min(end) - subtitle.start.max(start);
    2 * overlap >= length
}

fn index_near(subtitles: &[Subtitle], timestamp: i64, direction: Direction) -> Option<usize> {
    match direction {
        Direction::Forward => subtitles.iter().position(|s| s.start >= timestamp),
        Direction::Backward => subtitles.iter().rposition(|s| s.start <= timestamp),
    }
}

fn at_boundary(
    subtitles: &[Subtitle],
    index: usize,
    initial_index: usize,
    count_radius: usize,
    time_radius: i64,
    direction: Direction,
) -> bool {
    let next = match direction {
        Direction::Forward => subtitles.get(index + 1),
        Direction::Backward => index.checked_sub(1).and_then(|i| subtitles.get(i)),
    };

    index.abs_diff(initial_index) >= count_radius
        && next.is_none_or(|n| (n.start - subtitles[initial_index].start).abs() >= time_radius)
}

fn within_boundary(
    subtitles: &[Subtitle],
    index: usize,
    count_radius: usize,
    time_radius: i64,
    timestamp: i64,
    index_near_timestamp: usize,
) -> bool {
    index_near_timestamp.abs_diff(index) <= count_radius
        || (subtitles[index].start - timestamp).abs() <= time_radius
}
