//! Multi-session mediator
//!
//! Drives the create-or-update / dispose protocol for quick input sessions.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::registry::SessionRegistry;
use super::types::{SessionDescriptor, TransferQuickInput};
use crate::service::{QuickInputService, Requester};
use crate::types::SessionId;

pub struct SessionMediator {
    service: Arc<dyn QuickInputService>,
    requester: Arc<dyn Requester>,
    registry: SessionRegistry,
    update_in_place: bool,
}

impl SessionMediator {
    pub fn new(service: Arc<dyn QuickInputService>, requester: Arc<dyn Requester>) -> Self {
        Self {
            service,
            requester,
            registry: SessionRegistry::new(),
            update_in_place: false,
        }
    }

    /// Apply display fields of repeat `create_or_update` calls to the stored session
    pub fn with_update_in_place(mut self, enabled: bool) -> Self {
        self.update_in_place = enabled;
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Register the session if new, then show it.
    ///
    /// Every call triggers its own `show`, even while an earlier show for the
    /// same id is still open. The returned handle completes once the show has
    /// resolved and any selection has been reported; callers do not need to
    /// await it.
    pub fn create_or_update(&self, params: TransferQuickInput) -> JoinHandle<()> {
        let session_id = params.id;
        let descriptor = self.resolve(&params);

        let service = Arc::clone(&self.service);
        let requester = Arc::clone(&self.requester);

        tokio::spawn(async move {
            match service.show(descriptor).await {
                Ok(Some(outcome)) => {
                    let handles = outcome.handles();
                    if handles.is_empty() {
                        debug!(session_id, "Session resolved with an empty selection");
                        return;
                    }
                    if let Err(e) = requester.on_did_select_items(session_id, handles).await {
                        warn!(session_id, error = %e, "Failed to report session selection");
                    }
                }
                Ok(None) => debug!(session_id, "Session dismissed"),
                Err(e) => warn!(session_id, error = %e, "Quick input session failed"),
            }
        })
    }

    fn resolve(&self, params: &TransferQuickInput) -> SessionDescriptor {
        let session_id = params.id;
        let (descriptor, created) = self
            .registry
            .get_or_insert_with(session_id, || SessionDescriptor::from_params(params));

        if created {
            info!(session_id, kind = descriptor.kind_name(), "Created quick input session");
            return descriptor;
        }

        if !self.update_in_place {
            return descriptor;
        }

        match self
            .registry
            .update(session_id, |existing| existing.apply_update(params))
        {
            Some((updated, true)) => updated,
            Some((unchanged, false)) => {
                warn!(
                    session_id,
                    kind = unchanged.kind_name(),
                    requested = %params.kind,
                    "Ignoring update that would change the session type"
                );
                unchanged
            }
            // Disposed between the lookup and the update
            None => descriptor,
        }
    }

    /// Forget a session. The UI is not told to close anything.
    pub fn dispose(&self, session_id: SessionId) {
        if self.registry.remove(session_id).is_some() {
            info!(session_id, "Disposed quick input session");
        } else {
            debug!(session_id, "Dispose for unknown session");
        }
    }

    /// Drop every registered session
    pub fn clear(&self) {
        self.registry.clear();
    }
}
