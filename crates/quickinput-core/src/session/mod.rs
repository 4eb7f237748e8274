//! Quick input sessions
//!
//! Long-lived pickers and input boxes addressed by a caller-chosen numeric id.
//! Unlike classic `$show` requests, sessions are independent of each other
//! and stay registered until the requester disposes them.
//!
//! ```text
//!   $createOrUpdate(params) ──▶ SessionRegistry (insert if absent)
//!                                     │
//!                                     ▼
//!                        QuickInputService::show(descriptor)
//!                                     │ pick
//!                                     ▼
//!                   Requester::on_did_select_items(id, handles)
//!
//!   $dispose(id) ──▶ SessionRegistry (remove)
//! ```

mod mediator;
mod registry;
mod types;

pub use mediator::SessionMediator;
pub use registry::SessionRegistry;
pub use types::{PickSession, SessionDescriptor, TextInputSession, TransferQuickInput};
