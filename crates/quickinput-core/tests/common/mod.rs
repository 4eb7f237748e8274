//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use quickinput_core::{
    CancellationToken, Error, InputConfig, ItemHandle, ItemsFuture, PickOptions, PickOutcome,
    ProgressSender, QuickInputService, Requester, Result, SessionDescriptor, SessionId,
};

/// How a held-open call reacts to its token
#[derive(Clone, Copy)]
enum CancelMode {
    Honor,
    Ignore,
    Fail,
}

/// Quick input service driven by a script instead of a user
pub struct FakeService {
    emit_progress: bool,
    hold_open: bool,
    cancel_mode: CancelMode,
    inputs: Mutex<VecDeque<String>>,
    show_result: Mutex<Option<PickOutcome>>,
    pub pick_options: Mutex<Vec<PickOptions>>,
    pub validation_messages: Mutex<Vec<Option<String>>>,
    pub shown: Mutex<Vec<SessionDescriptor>>,
    opened_tx: mpsc::UnboundedSender<ProgressSender>,
    opened_rx: Mutex<Option<mpsc::UnboundedReceiver<ProgressSender>>>,
}

impl FakeService {
    pub fn new() -> Self {
        let (opened_tx, opened_rx) = mpsc::unbounded_channel();
        Self {
            emit_progress: false,
            hold_open: false,
            cancel_mode: CancelMode::Honor,
            inputs: Mutex::new(VecDeque::new()),
            show_result: Mutex::new(None),
            pick_options: Mutex::new(Vec::new()),
            validation_messages: Mutex::new(Vec::new()),
            shown: Mutex::new(Vec::new()),
            opened_tx,
            opened_rx: Mutex::new(Some(opened_rx)),
        }
    }

    /// Report every resolved item as a live selection before resolving
    pub fn emitting_progress(mut self) -> Self {
        self.emit_progress = true;
        self
    }

    /// Keep pickers and input boxes open until cancelled
    pub fn holding_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Never return from held-open calls, even once cancelled
    pub fn ignoring_cancel(mut self) -> Self {
        self.hold_open = true;
        self.cancel_mode = CancelMode::Ignore;
        self
    }

    /// Fail held-open calls as soon as they are cancelled
    pub fn failing_on_cancel(mut self) -> Self {
        self.hold_open = true;
        self.cancel_mode = CancelMode::Fail;
        self
    }

    async fn wait_out(&self, cancel: &CancellationToken) -> Result<()> {
        match self.cancel_mode {
            CancelMode::Honor => {
                cancel.cancelled().await;
                Ok(())
            }
            CancelMode::Ignore => std::future::pending().await,
            CancelMode::Fail => {
                cancel.cancelled().await;
                Err(Error::Service("picker torn down".to_string()))
            }
        }
    }

    /// Values "typed" into input boxes, in order
    pub fn with_inputs(self, values: &[&str]) -> Self {
        self.inputs
            .lock()
            .extend(values.iter().map(|v| v.to_string()));
        self
    }

    pub fn with_show_result(self, outcome: Option<PickOutcome>) -> Self {
        *self.show_result.lock() = outcome;
        self
    }

    /// Progress senders of pickers held open, one per pick call
    pub fn opened(&self) -> mpsc::UnboundedReceiver<ProgressSender> {
        self.opened_rx
            .lock()
            .take()
            .expect("opened receiver already taken")
    }
}

#[async_trait]
impl QuickInputService for FakeService {
    async fn pick(
        &self,
        items: ItemsFuture,
        options: PickOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<Option<PickOutcome>> {
        self.pick_options.lock().push(options.clone());

        if self.hold_open {
            let _ = self.opened_tx.send(progress.clone());
            self.wait_out(&cancel).await?;
            return Ok(None);
        }

        let items = tokio::select! {
            items = items => items?,
            _ = cancel.cancelled() => return Ok(None),
        };

        if self.emit_progress {
            for item in &items {
                let _ = progress.send(item.clone());
            }
        }

        if items.is_empty() {
            return Ok(None);
        }

        Ok(Some(if options.can_pick_many {
            PickOutcome::Many(items)
        } else {
            PickOutcome::One(items[0].clone())
        }))
    }

    async fn input(
        &self,
        config: InputConfig,
        cancel: CancellationToken,
    ) -> Result<Option<String>> {
        if self.hold_open {
            self.wait_out(&cancel).await?;
            return Ok(None);
        }

        loop {
            let candidate = self.inputs.lock().pop_front();
            let Some(candidate) = candidate else {
                return Ok(None);
            };

            let message = config.validate(&candidate).await;
            let accepted = message.is_none();
            self.validation_messages.lock().push(message);
            if accepted {
                return Ok(Some(candidate));
            }
        }
    }

    async fn show(&self, session: SessionDescriptor) -> Result<Option<PickOutcome>> {
        self.shown.lock().push(session);
        Ok(self.show_result.lock().clone())
    }
}

/// Something the requester was told about
#[derive(Debug, Clone, PartialEq)]
pub enum RequesterEvent {
    ItemSelected(ItemHandle),
    ItemsSelected(SessionId, Vec<ItemHandle>),
    Validated(String),
}

/// Requester that records every call.
///
/// Validation rejects values shorter than three characters and fails the
/// round trip for the literal value `fail`.
pub struct RecordingRequester {
    events: mpsc::UnboundedSender<RequesterEvent>,
    pub log: Mutex<Vec<RequesterEvent>>,
    validation_delay: Option<Duration>,
}

impl RecordingRequester {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<RequesterEvent>) {
        Self::build(None)
    }

    pub fn with_validation_delay(
        delay: Duration,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<RequesterEvent>) {
        Self::build(Some(delay))
    }

    fn build(
        validation_delay: Option<Duration>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<RequesterEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let requester = Arc::new(Self {
            events,
            log: Mutex::new(Vec::new()),
            validation_delay,
        });
        (requester, rx)
    }

    fn record(&self, event: RequesterEvent) {
        self.log.lock().push(event.clone());
        let _ = self.events.send(event);
    }

    pub fn selected(&self) -> Vec<ItemHandle> {
        self.log
            .lock()
            .iter()
            .filter_map(|event| match event {
                RequesterEvent::ItemSelected(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub fn validated(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|event| match event {
                RequesterEvent::Validated(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Requester for RecordingRequester {
    async fn on_item_selected(&self, handle: ItemHandle) -> Result<()> {
        self.record(RequesterEvent::ItemSelected(handle));
        Ok(())
    }

    async fn on_did_select_items(
        &self,
        session_id: SessionId,
        handles: Vec<ItemHandle>,
    ) -> Result<()> {
        self.record(RequesterEvent::ItemsSelected(session_id, handles));
        Ok(())
    }

    async fn validate_input(&self, value: String) -> Result<Option<String>> {
        self.record(RequesterEvent::Validated(value.clone()));

        if let Some(delay) = self.validation_delay {
            tokio::time::sleep(delay).await;
        }

        if value == "fail" {
            return Err(Error::Requester("validator crashed".to_string()));
        }

        Ok((value.chars().count() < 3).then(|| "too short".to_string()))
    }
}

/// Wait for the next requester event, failing the test after a second
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<RequesterEvent>) -> RequesterEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for requester event")
        .expect("requester event channel closed")
}
