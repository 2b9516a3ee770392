/*!
 * In-process transport between two contexts.
 *
 * A [`Link`] is one end of a duplex channel pair carrying [`Envelope`]s.
 * Delivery is at most once: a send to a dropped end is lost.
 */

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::protocol::Envelope;
use crate::errors::BridgeError;

/// One end of a duplex envelope channel
#[derive(Debug)]
pub struct Link {
    pub outgoing: UnboundedSender<Envelope>,
    pub incoming: UnboundedReceiver<Envelope>,
}

impl Link {
    /// Send an envelope to the other end
    pub fn post(&self, envelope: Envelope) -> Result<(), BridgeError> {
        self.outgoing.send(envelope).map_err(|_| BridgeError::Disconnected)
    }
}

/// Create two connected ends: `(controller_end, surface_end)`
pub fn link_pair() -> (Link, Link) {
    let (to_surface, from_controller) = mpsc::unbounded_channel();
    let (to_controller, from_surface) = mpsc::unbounded_channel();

    (
        Link {
            outgoing: to_surface,
            incoming: from_surface,
        },
        Link {
            outgoing: to_controller,
            incoming: from_controller,
        },
    )
}
