/*!
 * The card editor surface.
 */

use log::debug;

use super::event::ResumableSnapshot;
use crate::bridge::{ClientMessage, UiFrame};
use crate::errors::BridgeError;

/// Card editor shown over the video after a capture
pub struct EditorUi {
    frame: UiFrame,
}

impl EditorUi {
    pub fn new(frame: UiFrame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &UiFrame {
        &self.frame
    }

    /// Access to the hosting frame, e.g. to change its language
    pub fn frame_mut(&mut self) -> &mut UiFrame {
        &mut self.frame
    }

    pub fn showing(&self) -> bool {
        !self.frame.hidden()
    }

    /// Bind the surface if needed, push the snapshot and show it
    pub async fn show(&mut self, snapshot: &ResumableSnapshot) -> Result<(), BridgeError> {
        let created = self.frame.bind().await?;
        let client = self.frame.client().ok_or(BridgeError::NotReady)?;
        let state = serde_json::to_value(snapshot).map_err(|e| BridgeError::Decode(e.to_string()))?;
        client.update_state(state)?;
        if !created {
            client.send_message(ClientMessage::Focus)?;
        }
        self.frame.show();
        debug!("Editor shown for line {}", snapshot.subtitle.index);
        Ok(())
    }

    /// Ask the editor to hand control back for a rewind
    pub fn request_rewind(&self) -> Result<(), BridgeError> {
        let client = self.frame.client().ok_or(BridgeError::NotReady)?;
        client.send_message(ClientMessage::Rewind)
    }

    pub fn hide(&mut self) {
        self.frame.hide();
    }

    pub fn unbind(&mut self) {
        self.frame.unbind();
    }
}
