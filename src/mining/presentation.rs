/*!
 * The page around the video: overlay, controls, focus, fullscreen.
 */

use crate::timing::Subtitle;

/// Short user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Info(String),
    Error(String),
}

/// View-side collaborator of the orchestrator
pub trait Presentation: Send + Sync {
    /// Render these lines in the overlay
    fn show_subtitles(&self, lines: &[Subtitle]);

    /// Keep the overlay hidden regardless of what is showing
    fn force_hide_subtitles(&self, hidden: bool);

    fn set_controls_hidden(&self, hidden: bool);

    fn set_keys_bound(&self, bound: bool);

    fn notify(&self, notification: Notification);

    /// Remember the element that has focus
    fn save_focus(&self);

    /// Give focus back to the remembered element
    fn restore_focus(&self);

    fn fullscreen(&self) -> bool;

    fn set_fullscreen(&self, fullscreen: bool);

    fn copy_to_clipboard(&self, data_url: &str);
}
