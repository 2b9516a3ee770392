/*!
 * Controller side of the context bridge.
 *
 * A [`BridgeClient`] turns a UI surface living in another context into a local
 * object: push state with [`BridgeClient::update_state`], ask questions with
 * [`BridgeClient::request`], and receive the surface's unprompted events on
 * the channel handed to [`BridgeClient::new`].
 */

use log::{debug, warn};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::correlator::Correlator;
use super::http::{FetchPolicy, HttpPoster};
use super::protocol::{
    ClientMessage, ControllerCommand, Envelope, SenderTag, ServerMessage, SurfaceCommand, response_payload,
    split_payload,
};
use super::transport::Link;
use crate::errors::BridgeError;

/// Network access the controller performs for the surface
#[derive(Clone)]
pub struct Proxy {
    pub poster: Arc<dyn HttpPoster>,
    pub policy: FetchPolicy,
}

struct ClientShared {
    outgoing: UnboundedSender<Envelope>,
    incoming: tokio::sync::Mutex<UnboundedReceiver<Envelope>>,
    frame_id: Mutex<Option<String>>,
    correlator: Correlator,
    events: UnboundedSender<ServerMessage>,
    proxy: Option<Proxy>,
}

/// Controller end of a bound surface
pub struct BridgeClient {
    shared: Arc<ClientShared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeClient {
    /// Wrap the controller end of a link. Unprompted surface events are
    /// forwarded to `events`.
    pub fn new(link: Link, events: UnboundedSender<ServerMessage>, proxy: Option<Proxy>) -> Self {
        Self {
            shared: Arc::new(ClientShared {
                outgoing: link.outgoing,
                incoming: tokio::sync::Mutex::new(link.incoming),
                frame_id: Mutex::new(None),
                correlator: Correlator::new(),
                events,
                proxy,
            }),
            reader: Mutex::new(None),
        }
    }

    /// Frame id announced by the surface, once bound
    pub fn frame_id(&self) -> Option<String> {
        self.shared.frame_id.lock().clone()
    }

    /// Whether the handshake completed and the link is being read
    pub fn is_bound(&self) -> bool {
        self.frame_id().is_some() && self.reader.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.shared.correlator.pending()
    }

    /// Wait for the surface's `ready` announcement, then start reading its
    /// messages. Binding an already bound client returns the current frame id.
    pub async fn bind(&self, timeout: Duration) -> Result<String, BridgeError> {
        if self.is_bound() {
            if let Some(frame_id) = self.frame_id() {
                return Ok(frame_id);
            }
        }

        let shared = Arc::clone(&self.shared);
        let frame_id = {
            let mut incoming = shared.incoming.lock().await;
            let handshake = async {
                while let Some(envelope) = incoming.recv().await {
                    match shared.decode(&envelope) {
                        Some(SurfaceCommand::Ready { frame_id }) => return Ok(frame_id),
                        Some(SurfaceCommand::OnServerMessage { message }) => shared.dispatch(message),
                        None => {}
                    }
                }
                Err(BridgeError::Disconnected)
            };

            match tokio::time::timeout(timeout, handshake).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("Surface did not become ready within {:?}", timeout);
                    return Err(BridgeError::BindTimeout(timeout));
                }
            }
        };

        debug!("Surface bound with frame id {}", frame_id);
        *shared.frame_id.lock() = Some(frame_id.clone());

        let reader_shared = Arc::clone(&shared);
        let handle = tokio::spawn(async move {
            let mut incoming = reader_shared.incoming.lock().await;
            while let Some(envelope) = incoming.recv().await {
                match reader_shared.decode(&envelope) {
                    Some(SurfaceCommand::Ready { frame_id }) => {
                        debug!("Surface re-announced itself as {}", frame_id);
                        *reader_shared.frame_id.lock() = Some(frame_id);
                    }
                    Some(SurfaceCommand::OnServerMessage { message }) => reader_shared.dispatch(message),
                    None => {}
                }
            }
            debug!("Surface link closed");
            *reader_shared.frame_id.lock() = None;
        });

        if let Some(previous) = self.reader.lock().replace(handle) {
            previous.abort();
        }

        Ok(frame_id)
    }

    /// Replace the surface's state
    pub fn update_state(&self, state: Value) -> Result<(), BridgeError> {
        self.send_message(ClientMessage::UpdateState { state })
    }

    /// Send any client message to the bound surface
    pub fn send_message(&self, message: ClientMessage) -> Result<(), BridgeError> {
        self.shared.send(message)
    }

    /// Ask the surface something and wait for its answer. There is no
    /// internal timeout; wrap the call if one is needed.
    pub async fn request(&self, body: Value) -> Result<Value, BridgeError> {
        let (message_id, rx) = self.shared.correlator.register();
        if let Err(e) = self.send_message(ClientMessage::Request {
            message_id: message_id.clone(),
            body,
        }) {
            self.shared.correlator.cancel(&message_id);
            return Err(e);
        }

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(BridgeError::Remote(error)),
            Err(_) => Err(BridgeError::Disconnected),
        }
    }

    /// Stop listening to the surface. Pending requests stay registered.
    /// Calling this more than once is a no-op.
    pub fn unbind(&self) {
        if let Some(handle) = self.reader.lock().take() {
            handle.abort();
            debug!("Surface unbound");
        }
        *self.shared.frame_id.lock() = None;
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl ClientShared {
    fn decode(&self, envelope: &Envelope) -> Option<SurfaceCommand> {
        if envelope.sender != SenderTag::Surface {
            debug!("Ignoring envelope from {:?}", envelope.sender);
            return None;
        }

        match envelope.decode::<SurfaceCommand>() {
            Ok(command) => Some(command),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    fn send(&self, message: ClientMessage) -> Result<(), BridgeError> {
        let frame_id = self.frame_id.lock().clone().ok_or(BridgeError::NotReady)?;
        let envelope = Envelope::wrap(
            SenderTag::Controller,
            &ControllerCommand::SendClientMessage { message, frame_id },
        )?;
        self.outgoing.send(envelope).map_err(|_| BridgeError::Disconnected)
    }

    fn dispatch(self: &Arc<Self>, message: ServerMessage) {
        match message {
            ServerMessage::Response {
                message_id,
                result,
                error,
            } => {
                self.correlator.resolve(&message_id, response_payload(result, error));
            }
            ServerMessage::HttpPost { url, body, message_id } => self.proxy_post(url, body, message_id),
            other => {
                if self.events.send(other).is_err() {
                    debug!("No listener for surface events");
                }
            }
        }
    }

    fn proxy_post(self: &Arc<Self>, url: String, body: Value, message_id: String) {
        let Some(proxy) = self.proxy.clone() else {
            debug!("Dropping http-post to {}: no proxy configured", url);
            return;
        };
        let Some(allowed) = proxy.policy.check(&url) else {
            debug!("Dropping http-post to {}: not on the allowlist", url);
            return;
        };

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let payload = proxy.poster.post(&allowed, &body).await.map_err(|e| e.to_string());
            let (result, error) = split_payload(payload);
            if let Err(e) = shared.send(ClientMessage::Response {
                message_id,
                result,
                error,
            }) {
                debug!("Could not deliver http-post response: {}", e);
            }
        });
    }
}
