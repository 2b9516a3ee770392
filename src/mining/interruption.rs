/*!
 * Taking the view away from the viewer while another surface is up.
 */

use log::debug;

use super::playback::PlaybackAdapter;
use super::presentation::Presentation;
use crate::errors::CaptureError;

/// View state saved when a surface was put in front of the video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interruption {
    was_playing: bool,
    was_fullscreen: bool,
}

impl Interruption {
    /// Pause, save focus, leave fullscreen, unbind keys and hide the overlay
    pub async fn begin(
        playback: &dyn PlaybackAdapter,
        presentation: &dyn Presentation,
    ) -> Result<Self, CaptureError> {
        let interruption = Self {
            was_playing: !playback.paused(),
            was_fullscreen: presentation.fullscreen(),
        };

        if interruption.was_playing {
            playback.pause().await?;
        }
        presentation.save_focus();
        if interruption.was_fullscreen {
            presentation.set_fullscreen(false);
        }
        presentation.set_keys_bound(false);
        presentation.force_hide_subtitles(true);
        debug!("View interrupted ({:?})", interruption);

        Ok(interruption)
    }

    /// Whether the video was playing when the interruption began
    pub fn was_playing(&self) -> bool {
        self.was_playing
    }

    /// Take over the view saved by another interruption that ends while
    /// this one is still up
    pub fn absorb(&mut self, inner: Interruption) {
        self.was_playing |= inner.was_playing;
        self.was_fullscreen |= inner.was_fullscreen;
    }

    /// Leave the video paused when this interruption ends
    pub fn stay_paused(&mut self) {
        self.was_playing = false;
    }

    /// Undo [`Interruption::begin`]. Playback is left as is; the caller
    /// decides whether to resume.
    pub fn end(self, presentation: &dyn Presentation) {
        presentation.force_hide_subtitles(false);
        presentation.set_keys_bound(true);
        presentation.restore_focus();
        if self.was_fullscreen {
            presentation.set_fullscreen(true);
        }
        debug!("View restored");
    }
}
