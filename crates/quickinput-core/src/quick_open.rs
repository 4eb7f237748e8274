//! The proxy object the requester talks to
//!
//! Bundles the classic request mediator and the session mediator behind the
//! six operations exposed to the requester process.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::error::{RemoteError, Result};
use crate::mediator::RequestMediator;
use crate::service::{QuickInputService, Requester};
use crate::session::{SessionMediator, SessionRegistry, TransferQuickInput};
use crate::types::{InputOptions, PickItem, PickOptions, Selection, SessionId};

pub struct QuickOpen {
    requests: RequestMediator,
    sessions: SessionMediator,
}

impl QuickOpen {
    pub fn new(service: Arc<dyn QuickInputService>, requester: Arc<dyn Requester>) -> Self {
        Self {
            requests: RequestMediator::new(Arc::clone(&service), Arc::clone(&requester)),
            sessions: SessionMediator::new(service, requester),
        }
    }

    /// Apply host configuration
    pub fn with_config(self, config: &Config) -> Self {
        Self {
            requests: self
                .requests
                .with_validation_timeout(config.validation_timeout()),
            sessions: self
                .sessions
                .with_update_in_place(config.sessions.update_in_place),
        }
    }

    /// `$show`
    pub async fn show(
        &self,
        options: PickOptions,
        cancel: CancellationToken,
    ) -> Result<Option<Selection>> {
        self.requests.show(options, cancel).await
    }

    /// `$setItems`
    pub fn set_items(&self, items: Vec<PickItem>) {
        self.requests.set_items(items);
    }

    /// `$setError`
    pub fn set_error(&self, error: RemoteError) {
        self.requests.set_error(error);
    }

    /// `$input`
    pub async fn input(
        &self,
        options: Option<InputOptions>,
        validate_input: bool,
        cancel: CancellationToken,
    ) -> Result<Option<String>> {
        self.requests.input(options, validate_input, cancel).await
    }

    /// `$createOrUpdate`
    pub fn create_or_update(&self, params: TransferQuickInput) -> JoinHandle<()> {
        self.sessions.create_or_update(params)
    }

    /// `$dispose`
    pub fn dispose(&self, session_id: SessionId) {
        self.sessions.dispose(session_id);
    }

    pub fn sessions(&self) -> &SessionRegistry {
        self.sessions.registry()
    }

    pub fn requests(&self) -> &RequestMediator {
        &self.requests
    }

    /// Tear down: in-flight requests resolve to nothing, sessions are forgotten
    pub fn shutdown(&self) {
        info!(
            sessions = self.sessions.registry().len(),
            "Shutting down quick open proxy"
        );
        self.requests.shutdown();
        self.sessions.clear();
    }
}
