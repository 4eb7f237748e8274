//! Collaborator interfaces
//!
//! `QuickInputService` is the UI side that actually renders pickers and input
//! boxes. `Requester` is the proxy back to the extension process.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::session::SessionDescriptor;
use crate::types::{
    InputConfig, ItemHandle, ItemsFuture, PickItem, PickOptions, PickOutcome, SessionId,
};

/// Live selection events emitted while a pick is open
pub type ProgressSender = mpsc::UnboundedSender<PickItem>;

/// UI-facing quick input operations
#[async_trait]
pub trait QuickInputService: Send + Sync {
    /// Show a picker over `items`, which may resolve after the picker is
    /// visible. Interactive selections are sent on `progress` before the
    /// final result. Resolves to `None` when dismissed or cancelled.
    async fn pick(
        &self,
        items: ItemsFuture,
        options: PickOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<Option<PickOutcome>>;

    /// Show an input box. Submission is blocked until
    /// `config.validate_input` settles for the current value.
    async fn input(&self, config: InputConfig, cancel: CancellationToken) -> Result<Option<String>>;

    /// Show a long-lived quick input session
    async fn show(&self, session: SessionDescriptor) -> Result<Option<PickOutcome>>;
}

/// Calls back into the requester process
#[async_trait]
pub trait Requester: Send + Sync {
    /// A classic pick reported a live selection
    async fn on_item_selected(&self, handle: ItemHandle) -> Result<()>;

    /// A session's picker resolved with a selection
    async fn on_did_select_items(
        &self,
        session_id: SessionId,
        handles: Vec<ItemHandle>,
    ) -> Result<()>;

    /// Ask the requester to validate an input value
    async fn validate_input(&self, value: String) -> Result<Option<String>>;
}
