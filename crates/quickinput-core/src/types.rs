//! Data model shared between the requester and the quick input service
//!
//! Field names follow the requester's camelCase wire shape.

use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// Opaque identifier of a pick item, stable for one show call
pub type ItemHandle = i64;

/// Caller-chosen identifier of a quick input session
pub type SessionId = i64;

/// Items for a picker that may still be resolving.
///
/// Shared so the service can poll it more than once (a session may be shown
/// repeatedly) and so a rejection reaches every consumer.
pub type ItemsFuture = Shared<BoxFuture<'static, Result<Vec<PickItem>, RemoteError>>>;

/// Async check of a candidate input value. `None` means valid, `Some`
/// carries the message to show next to the input box.
pub type InputValidator = Arc<dyn Fn(String) -> BoxFuture<'static, Option<String>> + Send + Sync>;

/// An item source that is already resolved
pub fn items_ready(items: Vec<PickItem>) -> ItemsFuture {
    futures::future::ready(Ok(items)).boxed().shared()
}

/// A single entry in a quick pick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickItem {
    pub handle: ItemHandle,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Initially selected when picking many
    #[serde(default)]
    pub picked: bool,
}

impl PickItem {
    pub fn new(handle: ItemHandle, label: impl Into<String>) -> Self {
        Self {
            handle,
            label: label.into(),
            description: None,
            detail: None,
            picked: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Options for a classic `$show` request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PickOptions {
    pub can_pick_many: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_holder: Option<String>,
    pub match_on_description: bool,
    pub match_on_detail: bool,
    pub ignore_focus_lost: bool,
}

impl PickOptions {
    pub fn single() -> Self {
        Self::default()
    }

    pub fn many() -> Self {
        Self {
            can_pick_many: true,
            ..Self::default()
        }
    }

    pub fn with_place_holder(mut self, place_holder: impl Into<String>) -> Self {
        self.place_holder = Some(place_holder.into());
        self
    }
}

/// What the quick input service resolved a pick with
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    One(PickItem),
    Many(Vec<PickItem>),
}

impl PickOutcome {
    pub fn handles(&self) -> Vec<ItemHandle> {
        match self {
            PickOutcome::One(item) => vec![item.handle],
            PickOutcome::Many(items) => items.iter().map(|item| item.handle).collect(),
        }
    }
}

/// What `$show` resolves with: a single handle or a list of handles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    One(ItemHandle),
    Many(Vec<ItemHandle>),
}

impl Selection {
    /// Map a UI outcome to the requester's return shape.
    ///
    /// The shape follows `can_pick_many` from the request, not the shape the
    /// service happened to return.
    pub fn from_outcome(outcome: PickOutcome, can_pick_many: bool) -> Option<Self> {
        if can_pick_many {
            return Some(Selection::Many(outcome.handles()));
        }

        match outcome {
            PickOutcome::One(item) => Some(Selection::One(item.handle)),
            PickOutcome::Many(items) => items.first().map(|item| Selection::One(item.handle)),
        }
    }
}

/// Input box options as sent by the requester
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputOptions {
    pub password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_holder: Option<String>,
    /// `[start, end)` character range of `value` to preselect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_selection: Option<[usize; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub ignore_focus_out: bool,
}

/// Normalized input box configuration handed to the quick input service
#[derive(Clone, Default)]
pub struct InputConfig {
    pub password: bool,
    pub place_holder: Option<String>,
    pub value_selection: Option<[usize; 2]>,
    pub prompt: Option<String>,
    pub value: Option<String>,
    pub ignore_focus_lost: bool,
    pub validate_input: Option<InputValidator>,
}

impl InputConfig {
    /// Run the attached validator, if any
    pub async fn validate(&self, value: &str) -> Option<String> {
        match &self.validate_input {
            Some(validator) => validator(value.to_string()).await,
            None => None,
        }
    }
}

impl From<&InputOptions> for InputConfig {
    fn from(options: &InputOptions) -> Self {
        Self {
            password: options.password,
            place_holder: options.place_holder.clone(),
            value_selection: options.value_selection,
            prompt: options.prompt.clone(),
            value: options.value.clone(),
            ignore_focus_lost: options.ignore_focus_out,
            validate_input: None,
        }
    }
}

impl fmt::Debug for InputConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputConfig")
            .field("password", &self.password)
            .field("place_holder", &self.place_holder)
            .field("value_selection", &self.value_selection)
            .field("prompt", &self.prompt)
            .field("value", &self.value)
            .field("ignore_focus_lost", &self.ignore_focus_lost)
            .field("validate_input", &self.validate_input.is_some())
            .finish()
    }
}
