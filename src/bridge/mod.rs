/*!
 * Context bridge between the controller and embedded UI surfaces.
 *
 * - `protocol`: envelopes and the typed commands they carry
 * - `transport`: in-process duplex links
 * - `correlator`: request/response pairing by message id
 * - `client`: controller end (`BridgeClient`)
 * - `server`: surface end (`BridgeServer`)
 * - `frame`: surface lifecycle and dirty tracking (`UiFrame`)
 * - `http`: proxied network calls and the fetch allowlist
 */

pub use self::client::{BridgeClient, Proxy};
pub use self::frame::{FetchOptions, SurfaceFactory, UiFrame};
pub use self::http::{FetchPolicy, HttpPoster, ReqwestPoster};
pub use self::protocol::{ClientMessage, Envelope, SenderTag, ServerMessage};
pub use self::server::BridgeServer;
pub use self::transport::{Link, link_pair};

pub mod client;
pub mod correlator;
pub mod frame;
pub mod http;
pub mod protocol;
pub mod server;
pub mod transport;
