/*!
 * Hosting of an embedded UI surface.
 *
 * [`UiFrame`] owns the lifecycle of one surface: it creates the surface on
 * first use, binds a [`BridgeClient`] to it, and recreates both from scratch
 * whenever the configuration baked into the surface (language, fetch
 * allowlist) changes. A live surface is never updated in place.
 */

use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use super::client::{BridgeClient, Proxy};
use super::http::{FetchPolicy, HttpPoster};
use super::protocol::ServerMessage;
use super::transport::Link;
use crate::errors::BridgeError;

/// Settings injected into a surface when it is created
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    /// The single URL the surface may reach through the controller
    pub allowed_fetch_url: Option<String>,
    /// Source of the video the surface is about
    pub video_src: Option<String>,
}

/// Creates surfaces and returns the controller end of their link
pub trait SurfaceFactory: Send + Sync {
    fn create(&self, language: &str, fetch: &FetchOptions) -> Result<Link, BridgeError>;
}

/// One embedded surface and its bridge client
pub struct UiFrame {
    factory: Arc<dyn SurfaceFactory>,
    events: UnboundedSender<ServerMessage>,
    poster: Option<Arc<dyn HttpPoster>>,
    bind_timeout: Duration,
    language: String,
    fetch: FetchOptions,
    dirty: bool,
    hidden: bool,
    client: Option<Arc<BridgeClient>>,
}

impl UiFrame {
    pub fn new(
        factory: Arc<dyn SurfaceFactory>,
        events: UnboundedSender<ServerMessage>,
        poster: Option<Arc<dyn HttpPoster>>,
        bind_timeout: Duration,
    ) -> Self {
        Self {
            factory,
            events,
            poster,
            bind_timeout,
            language: "en".to_string(),
            fetch: FetchOptions::default(),
            dirty: true,
            hidden: true,
            client: None,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Change the UI language; takes effect on the next bind
    pub fn set_language(&mut self, language: impl Into<String>) {
        let language = language.into();
        if self.language != language {
            self.language = language;
            self.dirty = true;
        }
    }

    pub fn fetch_options(&self) -> &FetchOptions {
        &self.fetch
    }

    /// Change the fetch options; takes effect on the next bind
    pub fn set_fetch_options(&mut self, fetch: FetchOptions) {
        if self.fetch != fetch {
            self.fetch = fetch;
            self.dirty = true;
        }
    }

    /// Whether the next bind will recreate the surface
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Make sure a bound surface exists. Returns true when a new surface had
    /// to be created, in which case any state must be pushed again.
    pub async fn bind(&mut self) -> Result<bool, BridgeError> {
        if !self.dirty && self.client.as_ref().is_some_and(|c| c.is_bound()) {
            return Ok(false);
        }

        self.unbind();

        let link = self.factory.create(&self.language, &self.fetch)?;
        let proxy = self.poster.clone().map(|poster| Proxy {
            poster,
            policy: FetchPolicy::new(self.fetch.allowed_fetch_url.clone()),
        });
        let client = Arc::new(BridgeClient::new(link, self.events.clone(), proxy));
        client.bind(self.bind_timeout).await?;

        info!("UI surface created (language: {})", self.language);
        self.client = Some(client);
        self.dirty = false;
        Ok(true)
    }

    /// The bound client, if any
    pub fn client(&self) -> Option<Arc<BridgeClient>> {
        self.client.clone()
    }

    pub fn show(&mut self) {
        self.hidden = false;
    }

    pub fn hide(&mut self) {
        self.hidden = true;
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// Drop the surface. Idempotent.
    pub fn unbind(&mut self) {
        if let Some(client) = self.client.take() {
            client.unbind();
            debug!("UI surface removed");
        }
        self.hidden = true;
    }
}
