/*!
 * Surface side of the context bridge.
 */

use log::{debug, warn};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::correlator::Correlator;
use super::protocol::{
    ClientMessage, ControllerCommand, Envelope, SenderTag, ServerMessage, SurfaceCommand, response_payload,
    split_payload,
};
use super::transport::Link;
use crate::errors::BridgeError;

/// Surface end of a link
pub struct BridgeServer {
    outgoing: UnboundedSender<Envelope>,
    incoming: Option<UnboundedReceiver<Envelope>>,
    correlator: Arc<Correlator>,
    frame_id: Option<String>,
    messages: Option<UnboundedReceiver<ClientMessage>>,
    reader: Option<Reader>,
}

struct Reader {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<UnboundedReceiver<Envelope>>,
}

impl BridgeServer {
    pub fn new(link: Link) -> Self {
        Self {
            outgoing: link.outgoing,
            incoming: Some(link.incoming),
            correlator: Arc::new(Correlator::new()),
            frame_id: None,
            messages: None,
            reader: None,
        }
    }

    /// Current frame id, while bound
    pub fn frame_id(&self) -> Option<&str> {
        self.frame_id.as_deref()
    }

    /// Announce readiness under a fresh frame id and start reading controller
    /// messages addressed to it
    pub async fn bind(&mut self) -> Result<String, BridgeError> {
        self.unbind().await;

        let frame_id = Uuid::new_v4().to_string();
        let Some(mut incoming) = self.incoming.take() else {
            return Err(BridgeError::Disconnected);
        };

        let correlator = Arc::clone(&self.correlator);
        let (messages, messages_rx) = mpsc::unbounded_channel();
        let (stop, mut stopped) = oneshot::channel();
        let expected = frame_id.clone();
        let handle = tokio::spawn(async move {
            loop {
                let envelope = tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    envelope = incoming.recv() => match envelope {
                        Some(envelope) => envelope,
                        None => break,
                    },
                };
                let Some(message) = accept(&envelope, &expected) else {
                    continue;
                };
                match message {
                    ClientMessage::Response {
                        message_id,
                        result,
                        error,
                    } => {
                        correlator.resolve(&message_id, response_payload(result, error));
                    }
                    other => {
                        let _ = messages.send(other);
                    }
                }
            }
            incoming
        });
        self.reader = Some(Reader { stop, handle });
        self.messages = Some(messages_rx);

        self.announce(&SurfaceCommand::Ready {
            frame_id: frame_id.clone(),
        })?;
        self.frame_id = Some(frame_id.clone());
        debug!("Surface ready as {}", frame_id);
        Ok(frame_id)
    }

    /// Send an unprompted event to the controller
    pub fn post(&self, message: ServerMessage) -> Result<(), BridgeError> {
        self.announce(&SurfaceCommand::OnServerMessage { message })
    }

    /// Answer a controller request
    pub fn respond(&self, message_id: String, payload: Result<Value, String>) -> Result<(), BridgeError> {
        let (result, error) = split_payload(payload);
        self.post(ServerMessage::Response {
            message_id,
            result,
            error,
        })
    }

    /// Ask the controller to POST on our behalf. The returned future resolves
    /// with the controller's answer; if the URL is not allowed it never does.
    pub fn request_http_post(
        &self,
        url: impl Into<String>,
        body: Value,
    ) -> impl Future<Output = Result<Value, BridgeError>> + Send + 'static {
        let (message_id, rx) = self.correlator.register();
        let sent = self.post(ServerMessage::HttpPost {
            url: url.into(),
            body,
            message_id: message_id.clone(),
        });
        if sent.is_err() {
            self.correlator.cancel(&message_id);
        }

        async move {
            sent?;
            match rx.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(BridgeError::Http(error)),
                Err(_) => Err(BridgeError::Disconnected),
            }
        }
    }

    /// Next message from the controller, `None` once unbound or the link is gone
    pub async fn next_message(&mut self) -> Option<ClientMessage> {
        self.messages.as_mut()?.recv().await
    }

    /// Stop reading controller messages. A later [`BridgeServer::bind`]
    /// announces a new frame id on the same link. Idempotent.
    pub async fn unbind(&mut self) {
        self.frame_id = None;
        self.messages = None;
        let Some(reader) = self.reader.take() else {
            return;
        };
        let _ = reader.stop.send(());
        match reader.handle.await {
            Ok(incoming) => self.incoming = Some(incoming),
            Err(e) => warn!("Surface link reader failed: {}", e),
        }
    }

    fn announce(&self, command: &SurfaceCommand) -> Result<(), BridgeError> {
        let envelope = Envelope::wrap(SenderTag::Surface, command)?;
        self.outgoing.send(envelope).map_err(|_| BridgeError::Disconnected)
    }
}

fn accept(envelope: &Envelope, frame_id: &str) -> Option<ClientMessage> {
    if envelope.sender != SenderTag::Controller {
        return None;
    }

    match envelope.decode::<ControllerCommand>() {
        Ok(ControllerCommand::SendClientMessage { message, frame_id: target }) if target == frame_id => {
            Some(message)
        }
        Ok(ControllerCommand::SendClientMessage { frame_id: target, .. }) => {
            debug!("Ignoring message for frame {}", target);
            None
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}
