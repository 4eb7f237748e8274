//! Pending request slots for classic pick requests
//!
//! A picker may be shown before its items exist. Each `$show` begins a slot:
//! the service gets a contents future right away and the requester fills it
//! later through `$setItems` or `$setError`.
//!
//! Every slot is stamped with a generation token. Only the setter whose token
//! is still current can resolve its slot, so a late delivery meant for a
//! superseded request can never leak into the one that replaced it. A
//! superseded contents future stays pending forever.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::RemoteError;
use crate::types::{ItemsFuture, PickItem};

type ItemsResult = Result<Vec<PickItem>, RemoteError>;

/// Resolver pair for one slot, bound to the token current when it was begun
#[derive(Clone)]
pub struct SlotSetter {
    token: u64,
    current: Arc<AtomicU64>,
    resolver: Arc<Mutex<Option<oneshot::Sender<ItemsResult>>>>,
}

impl SlotSetter {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.token
    }

    /// Resolve the slot with items. Returns whether the delivery landed.
    pub fn set_items(&self, items: Vec<PickItem>) -> bool {
        self.deliver(Ok(items))
    }

    /// Reject the slot. Returns whether the delivery landed.
    pub fn set_error(&self, error: RemoteError) -> bool {
        self.deliver(Err(error))
    }

    fn deliver(&self, result: ItemsResult) -> bool {
        if !self.is_current() {
            trace!(token = self.token, "Dropping delivery for superseded request");
            return false;
        }

        match self.resolver.lock().take() {
            Some(tx) => tx.send(result).is_ok(),
            None => {
                trace!(token = self.token, "Slot already resolved");
                false
            }
        }
    }
}

/// Generation counter plus the setter of the most recent slot
#[derive(Default)]
pub struct RequestSlots {
    current: Arc<AtomicU64>,
    latest: Mutex<Option<SlotSetter>>,
}

impl RequestSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new slot, invalidating whichever slot was current
    pub fn begin(&self) -> (SlotSetter, ItemsFuture) {
        let (tx, rx) = oneshot::channel();

        let mut latest = self.latest.lock();
        let token = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let setter = SlotSetter {
            token,
            current: Arc::clone(&self.current),
            resolver: Arc::new(Mutex::new(Some(tx))),
        };
        *latest = Some(setter.clone());
        drop(latest);

        trace!(token, "Began request slot");

        let contents = async move {
            match rx.await {
                Ok(result) => result,
                // Sender dropped: the slot was superseded and must never resolve
                Err(_) => futures::future::pending().await,
            }
        }
        .boxed()
        .shared();

        (setter, contents)
    }

    /// Token of the most recently begun slot (0 before any)
    pub fn current_token(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Deliver items to the current slot
    pub fn set_items(&self, items: Vec<PickItem>) -> bool {
        match self.latest_setter() {
            Some(setter) => setter.set_items(items),
            None => false,
        }
    }

    /// Deliver a failure to the current slot
    pub fn set_error(&self, error: RemoteError) -> bool {
        match self.latest_setter() {
            Some(setter) => setter.set_error(error),
            None => false,
        }
    }

    /// Invalidate the current slot without starting a new request
    pub fn invalidate(&self) {
        let mut latest = self.latest.lock();
        self.current.fetch_add(1, Ordering::SeqCst);
        *latest = None;
    }

    fn latest_setter(&self) -> Option<SlotSetter> {
        self.latest.lock().clone()
    }
}
