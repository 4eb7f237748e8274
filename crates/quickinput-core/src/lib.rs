//! QuickInput Core - pick and input request mediation
//!
//! This crate sits in the privileged, UI-owning process and lets an isolated
//! requester (an extension process) drive quick picks and input boxes:
//! - Classic pick/input requests with cancellation and live selection events
//! - Token-guarded item delivery into an already visible picker
//! - A registry of long-lived quick input sessions keyed by numeric id
//! - Configuration loading for the host

pub mod config;
pub mod error;
pub mod mediator;
pub mod quick_open;
pub mod service;
pub mod session;
pub mod slot;
pub mod types;

pub use config::{Config, ConfigManager};
pub use error::{Error, RemoteError, Result};
pub use mediator::RequestMediator;
pub use quick_open::QuickOpen;
pub use service::{ProgressSender, QuickInputService, Requester};
pub use session::{
    PickSession, SessionDescriptor, SessionMediator, SessionRegistry, TextInputSession,
    TransferQuickInput,
};
pub use slot::{RequestSlots, SlotSetter};
pub use types::{
    items_ready, InputConfig, InputOptions, InputValidator, ItemHandle, ItemsFuture, PickItem,
    PickOptions, PickOutcome, Selection, SessionId,
};

/// Re-exported so callers can build cancellation handles without a direct
/// `tokio-util` dependency.
pub use tokio_util::sync::CancellationToken;
