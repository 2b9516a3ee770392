/*!
 * Wire protocol between the controller and an embedded UI surface.
 *
 * Every message travels inside an [`Envelope`] tagged with the context that
 * sent it. The payload is kept as raw JSON until it reaches the receiving
 * side, where it is decoded once into one of the closed command enums below.
 * Nothing past the transport boundary ever matches on command strings.
 */

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::BridgeError;

/// Which execution context produced an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SenderTag {
    /// The page-embedded controller
    Controller,
    /// The sandboxed UI surface
    Surface,
}

/// Fire-and-forget unit of transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub sender: SenderTag,
    pub message: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl Envelope {
    /// Wrap a command for sending
    pub fn wrap<T: Serialize>(sender: SenderTag, command: &T) -> Result<Self, BridgeError> {
        let message = serde_json::to_value(command).map_err(|e| BridgeError::Decode(e.to_string()))?;
        Ok(Self {
            sender,
            message,
            correlation_id: None,
        })
    }

    /// Decode the payload into a typed command
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BridgeError> {
        serde_json::from_value(self.message.clone()).map_err(|e| BridgeError::Decode(e.to_string()))
    }
}

/// Controller to surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ControllerCommand {
    SendClientMessage { message: ClientMessage, frame_id: String },
}

/// Surface to controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SurfaceCommand {
    /// Sent once the surface has loaded
    Ready { frame_id: String },
    /// Unprompted UI-driven event
    OnServerMessage { message: ServerMessage },
}

/// Messages the controller sends into the surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Replace the surface's state; the newest push wins
    UpdateState { state: Value },
    /// Correlated request; answered with [`ServerMessage::Response`]
    Request { message_id: String, body: Value },
    /// Answer to a request made by the surface
    Response {
        message_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Give the surface input focus
    Focus,
    /// Ask the surface to hand control back for a rewind
    Rewind,
}

/// Messages the surface sends to the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Close the editor and continue watching
    Resume {
        ui_state: Value,
        #[serde(default)]
        card_exported: bool,
    },
    /// Close the editor and go back to the mined line
    Rewind { ui_state: Value },
    /// Capture the media again for a new window, then reopen the editor
    Rerecord {
        record_start: i64,
        record_end: i64,
        ui_state: Value,
    },
    CopyToClipboard { data_url: String },
    OpenSettings,
    /// Network call the surface is not allowed to make itself
    HttpPost {
        url: String,
        body: Value,
        message_id: String,
    },
    /// Answer to a request made by the controller
    Response {
        message_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Split a `result|error` pair into a `Result`
pub fn response_payload(result: Option<Value>, error: Option<String>) -> Result<Value, String> {
    match error {
        Some(error) => Err(error),
        None => Ok(result.unwrap_or(Value::Null)),
    }
}

/// Join a `Result` back into a `result|error` pair
pub fn split_payload(payload: Result<Value, String>) -> (Option<Value>, Option<String>) {
    match payload {
        Ok(value) => (Some(value), None),
        Err(error) => (None, Some(error)),
    }
}
