/*!
 * Playback modes reacting to timing ticks.
 */

use serde::{Deserialize, Serialize};

use crate::timing::{ShowingSnapshot, Subtitle};

/// How playback reacts to subtitle boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayMode {
    #[default]
    Normal,
    /// Pause at each line
    AutoPause,
    /// Skip the gaps between lines
    Condensed,
    /// Loop the current line
    Repeat,
}

/// Where in a line auto-pause stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoPausePreference {
    AtStart,
    #[default]
    AtEnd,
}

/// What a play mode wants done to playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayModeAction {
    Pause,
    Seek(i64),
}

/// Play mode state carried across ticks
#[derive(Debug, Clone)]
pub struct PlayModeState {
    mode: PlayMode,
    preference: AutoPausePreference,
    condensed_min_skip_ms: i64,
    repeat_line: Option<Subtitle>,
}

impl PlayModeState {
    pub fn new(mode: PlayMode, preference: AutoPausePreference, condensed_min_skip_ms: i64) -> Self {
        Self {
            mode,
            preference,
            condensed_min_skip_ms,
            repeat_line: None,
        }
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
        self.repeat_line = None;
    }

    /// React to one tick. Nothing happens while a recording is running.
    pub fn on_tick(&mut self, snapshot: &ShowingSnapshot, now: i64, recording: bool) -> Option<PlayModeAction> {
        if recording {
            return None;
        }

        match self.mode {
            PlayMode::Normal => None,
            PlayMode::AutoPause => match self.preference {
                AutoPausePreference::AtStart => snapshot.started_showing.as_ref().map(|_| PlayModeAction::Pause),
                AutoPausePreference::AtEnd => snapshot.will_stop_showing.as_ref().map(|_| PlayModeAction::Pause),
            },
            PlayMode::Condensed => {
                if !snapshot.showing.is_empty() {
                    return None;
                }
                let next = snapshot.next()?;
                (next.start - now >= self.condensed_min_skip_ms).then_some(PlayModeAction::Seek(next.start))
            }
            PlayMode::Repeat => {
                if let Some(started) = &snapshot.started_showing {
                    self.repeat_line = Some(started.clone());
                }
                let stopping = snapshot.will_stop_showing.as_ref()?;
                let line = self.repeat_line.as_ref()?;
                (line == stopping).then_some(PlayModeAction::Seek(line.start))
            }
        }
    }
}
