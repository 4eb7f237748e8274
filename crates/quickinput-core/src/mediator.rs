//! Request mediator for classic pick and input requests
//!
//! Turns `$show` / `$input` into cancelable calls on the quick input service:
//!
//! 1. `$show` begins a request slot and hands its contents future to the
//!    service, which may render before the items arrive
//! 2. Live selections from the service are forwarded to the requester one by
//!    one, in order
//! 3. The final outcome is mapped to a handle or a list of handles depending
//!    on `canPickMany`
//!
//! Cancellation always resolves to "no selection"; only errors raised by the
//! service itself propagate.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, RemoteError, Result};
use crate::service::{QuickInputService, Requester};
use crate::slot::RequestSlots;
use crate::types::{InputConfig, InputOptions, InputValidator, PickItem, PickOptions, Selection};

pub struct RequestMediator {
    service: Arc<dyn QuickInputService>,
    requester: Arc<dyn Requester>,
    slots: RequestSlots,
    validation_timeout: Option<Duration>,
    /// Parent of every per-call token; cancelled on shutdown
    root: CancellationToken,
}

impl RequestMediator {
    pub fn new(service: Arc<dyn QuickInputService>, requester: Arc<dyn Requester>) -> Self {
        Self {
            service,
            requester,
            slots: RequestSlots::new(),
            validation_timeout: None,
            root: CancellationToken::new(),
        }
    }

    /// Bound each `$validateInput` round trip
    pub fn with_validation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.validation_timeout = timeout;
        self
    }

    /// Token of the most recent `$show`
    pub fn current_token(&self) -> u64 {
        self.slots.current_token()
    }

    /// Show a picker and wait for the user's choice.
    ///
    /// Supersedes any earlier `show` still waiting for its items.
    pub async fn show(
        &self,
        options: PickOptions,
        cancel: CancellationToken,
    ) -> Result<Option<Selection>> {
        let can_pick_many = options.can_pick_many;
        let (setter, contents) = self.slots.begin();
        let token = setter.token();
        debug!(token, can_pick_many, "Showing quick pick");

        let call = self.root.child_token();
        let _guard = call.clone().drop_guard();

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<PickItem>();
        let mut pick = self
            .service
            .pick(contents, options, progress_tx, call.clone());

        let mut forwarding = true;
        let finished = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    call.cancel();
                    break None;
                }
                _ = call.cancelled() => break None,
                item = progress_rx.recv(), if forwarding => match item {
                    Some(item) => self.forward_selection(token, &item).await,
                    None => forwarding = false,
                },
                result = &mut pick => break Some(result),
            }
        };

        // Selections reported right before the pick resolved
        if finished.is_some() {
            while let Ok(item) = progress_rx.try_recv() {
                self.forward_selection(token, &item).await;
            }
        }
        drop(progress_rx);

        match finished {
            Some(result) => {
                let selection = result?.and_then(|outcome| {
                    Selection::from_outcome(outcome, can_pick_many)
                });
                debug!(token, ?selection, "Quick pick resolved");
                Ok(selection)
            }
            None => {
                debug!(token, "Quick pick cancelled");
                settle_cancelled(pick).map(|_| None)
            }
        }
    }

    async fn forward_selection(&self, token: u64, item: &PickItem) {
        if let Err(e) = self.requester.on_item_selected(item.handle).await {
            warn!(token, handle = item.handle, error = %e, "Failed to forward item selection");
        }
    }

    /// Deliver items to the picker of the current `show`
    pub fn set_items(&self, items: Vec<PickItem>) {
        let count = items.len();
        if !self.slots.set_items(items) {
            debug!(count, "Ignored items for a request that is no longer current");
        }
    }

    /// Fail the picker of the current `show`
    pub fn set_error(&self, error: RemoteError) {
        if !self.slots.set_error(error) {
            debug!("Ignored error for a request that is no longer current");
        }
    }

    /// Show an input box and wait for the submitted value
    pub async fn input(
        &self,
        options: Option<InputOptions>,
        validate_input: bool,
        cancel: CancellationToken,
    ) -> Result<Option<String>> {
        let mut config = options
            .as_ref()
            .map(InputConfig::from)
            .unwrap_or_default();
        if validate_input {
            config.validate_input = Some(self.validator());
        }
        debug!(?config, "Showing input box");

        let call = self.root.child_token();
        let _guard = call.clone().drop_guard();
        let mut input = self.service.input(config, call.clone());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                call.cancel();
                debug!("Input box cancelled");
                settle_cancelled(input)
            }
            _ = call.cancelled() => settle_cancelled(input),
            result = &mut input => result,
        }
    }

    /// Validator that asks the requester about each candidate value.
    ///
    /// Round-trip failures turn into a validation message so the user can
    /// retry instead of losing the input box.
    fn validator(&self) -> InputValidator {
        let requester = Arc::clone(&self.requester);
        let limit = self.validation_timeout;

        Arc::new(move |value: String| {
            let requester = Arc::clone(&requester);
            async move {
                let verdict = match limit {
                    Some(limit) => {
                        match tokio::time::timeout(limit, requester.validate_input(value)).await {
                            Ok(verdict) => verdict,
                            Err(_) => Err(Error::Requester(format!(
                                "validation timed out after {}ms",
                                limit.as_millis()
                            ))),
                        }
                    }
                    None => requester.validate_input(value).await,
                };

                match verdict {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(error = %e, "Input validation round trip failed");
                        Some(format!("Validation failed: {}", e))
                    }
                }
            }
            .boxed()
        })
    }

    /// Cancel every in-flight request and invalidate the current slot
    pub fn shutdown(&self) {
        self.root.cancel();
        self.slots.invalidate();
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }
}

/// Result of a call whose token has fired: no selection, unless the service
/// has already failed.
///
/// The service future gets one last poll and is then dropped, so a service
/// that ignores its token cannot hold the caller.
fn settle_cancelled<T, F>(call: F) -> Result<Option<T>>
where
    F: Future<Output = Result<Option<T>>>,
{
    match call.now_or_never() {
        Some(Err(e)) => Err(e),
        Some(Ok(_)) | None => Ok(None),
    }
}
