//! Session registry
//!
//! Plain map from session id to descriptor. Entries are inserted on first
//! `$createOrUpdate` and removed only by `$dispose`; there is no expiry.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::types::SessionDescriptor;
use crate::types::SessionId;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, SessionDescriptor>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the descriptor for `id`, inserting `create()` if absent.
    ///
    /// The flag is true when the descriptor was created by this call.
    pub fn get_or_insert_with<F>(&self, id: SessionId, create: F) -> (SessionDescriptor, bool)
    where
        F: FnOnce() -> SessionDescriptor,
    {
        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions.get(&id) {
            return (existing.clone(), false);
        }

        let descriptor = create();
        sessions.insert(id, descriptor.clone());
        (descriptor, true)
    }

    /// Mutate an existing descriptor in place, returning the updated copy
    pub fn update<F, R>(&self, id: SessionId, update: F) -> Option<(SessionDescriptor, R)>
    where
        F: FnOnce(&mut SessionDescriptor) -> R,
    {
        let mut sessions = self.sessions.lock();
        let descriptor = sessions.get_mut(&id)?;
        let result = update(descriptor);
        Some((descriptor.clone(), result))
    }

    pub fn get(&self, id: SessionId) -> Option<SessionDescriptor> {
        self.sessions.lock().get(&id).cloned()
    }

    /// Remove a session; absent ids are fine
    pub fn remove(&self, id: SessionId) -> Option<SessionDescriptor> {
        self.sessions.lock().remove(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().contains_key(&id)
    }

    /// List registered session ids
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn clear(&self) {
        self.sessions.lock().clear();
    }
}
