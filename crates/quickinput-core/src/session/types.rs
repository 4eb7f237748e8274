//! Session descriptors and the parameters they are built from

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{items_ready, ItemsFuture, PickItem, SessionId};

/// `type` value that selects a text input session; anything else is a pick
pub const INPUT_BOX_TYPE: &str = "inputBox";

/// Parameters of `$createOrUpdate`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferQuickInput {
    pub id: SessionId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_select_many: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<PickItem>>,
}

impl TransferQuickInput {
    pub fn input_box(id: SessionId) -> Self {
        Self {
            id,
            kind: INPUT_BOX_TYPE.to_string(),
            ..Self::default()
        }
    }

    pub fn quick_pick(id: SessionId, items: Vec<PickItem>) -> Self {
        Self {
            id,
            kind: "quickPick".to_string(),
            items: Some(items),
            ..Self::default()
        }
    }

    pub fn is_input_box(&self) -> bool {
        self.kind == INPUT_BOX_TYPE
    }
}

/// Displayed state of a text input session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextInputSession {
    pub value: Option<String>,
    pub place_holder: Option<String>,
    pub prompt: Option<String>,
    pub password: bool,
}

/// Displayed state of a pick session
#[derive(Clone)]
pub struct PickSession {
    pub place_holder: Option<String>,
    pub items: ItemsFuture,
}

impl fmt::Debug for PickSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PickSession")
            .field("place_holder", &self.place_holder)
            .field("items", &self.items.peek())
            .finish()
    }
}

/// A registered quick input session.
///
/// The variant is chosen once from the creating parameters and never
/// changes; only the display fields inside it may be updated.
#[derive(Debug, Clone)]
pub enum SessionDescriptor {
    TextInput(TextInputSession),
    PickOne(PickSession),
    PickMany(PickSession),
}

impl SessionDescriptor {
    pub fn from_params(params: &TransferQuickInput) -> Self {
        if params.is_input_box() {
            return SessionDescriptor::TextInput(TextInputSession {
                value: params.value.clone(),
                place_holder: params.placeholder.clone(),
                prompt: params.prompt.clone(),
                password: params.password.unwrap_or(false),
            });
        }

        let pick = PickSession {
            place_holder: params.placeholder.clone(),
            items: items_ready(params.items.clone().unwrap_or_default()),
        };

        if params.can_select_many.unwrap_or(false) {
            SessionDescriptor::PickMany(pick)
        } else {
            SessionDescriptor::PickOne(pick)
        }
    }

    /// Copy display fields from a repeat call, keeping the variant.
    ///
    /// Returns false when `params` describe a different variant; nothing is
    /// changed in that case.
    pub fn apply_update(&mut self, params: &TransferQuickInput) -> bool {
        if !self.accepts(params) {
            return false;
        }

        match self {
            SessionDescriptor::TextInput(text) => {
                if params.value.is_some() {
                    text.value = params.value.clone();
                }
                if params.placeholder.is_some() {
                    text.place_holder = params.placeholder.clone();
                }
                if params.prompt.is_some() {
                    text.prompt = params.prompt.clone();
                }
                if let Some(password) = params.password {
                    text.password = password;
                }
            }
            SessionDescriptor::PickOne(pick) | SessionDescriptor::PickMany(pick) => {
                if params.placeholder.is_some() {
                    pick.place_holder = params.placeholder.clone();
                }
                if let Some(items) = &params.items {
                    pick.items = items_ready(items.clone());
                }
            }
        }

        true
    }

    fn accepts(&self, params: &TransferQuickInput) -> bool {
        match self {
            SessionDescriptor::TextInput(_) => params.is_input_box(),
            SessionDescriptor::PickOne(_) => {
                !params.is_input_box() && !params.can_select_many.unwrap_or(false)
            }
            SessionDescriptor::PickMany(_) => {
                !params.is_input_box() && params.can_select_many.unwrap_or(false)
            }
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SessionDescriptor::TextInput(_) => "textInput",
            SessionDescriptor::PickOne(_) => "pickOne",
            SessionDescriptor::PickMany(_) => "pickMany",
        }
    }

    pub fn place_holder(&self) -> Option<&str> {
        match self {
            SessionDescriptor::TextInput(text) => text.place_holder.as_deref(),
            SessionDescriptor::PickOne(pick) | SessionDescriptor::PickMany(pick) => {
                pick.place_holder.as_deref()
            }
        }
    }

    /// Current value of a text input session
    pub fn value(&self) -> Option<&str> {
        match self {
            SessionDescriptor::TextInput(text) => text.value.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_deserialize_from_wire_shape() {
        let params: TransferQuickInput = serde_json::from_value(serde_json::json!({
            "id": 5,
            "type": "quickPick",
            "placeholder": "choose",
            "canSelectMany": true,
            "items": [{ "handle": 1, "label": "a" }]
        }))
        .unwrap();

        assert_eq!(params.id, 5);
        assert!(!params.is_input_box());
        assert_eq!(params.items.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_variant_from_params() {
        let text = SessionDescriptor::from_params(&TransferQuickInput::input_box(1));
        assert_eq!(text.kind_name(), "textInput");

        let one = SessionDescriptor::from_params(&TransferQuickInput::quick_pick(2, vec![]));
        assert_eq!(one.kind_name(), "pickOne");

        let mut params = TransferQuickInput::quick_pick(3, vec![]);
        params.can_select_many = Some(true);
        assert_eq!(SessionDescriptor::from_params(&params).kind_name(), "pickMany");
    }

    #[test]
    fn test_unknown_type_is_pick() {
        let params = TransferQuickInput {
            id: 4,
            kind: "somethingElse".to_string(),
            ..TransferQuickInput::default()
        };
        assert_eq!(SessionDescriptor::from_params(&params).kind_name(), "pickOne");
    }

    #[test]
    fn test_apply_update_keeps_variant() {
        let mut params = TransferQuickInput::input_box(1);
        params.value = Some("x".to_string());
        let mut descriptor = SessionDescriptor::from_params(&params);

        params.value = Some("y".to_string());
        assert!(descriptor.apply_update(&params));
        assert_eq!(descriptor.value(), Some("y"));

        let pick = TransferQuickInput::quick_pick(1, vec![PickItem::new(1, "a")]);
        assert!(!descriptor.apply_update(&pick));
        assert_eq!(descriptor.kind_name(), "textInput");
        assert_eq!(descriptor.value(), Some("y"));
    }

    #[tokio::test]
    async fn test_apply_update_replaces_pick_items() {
        let mut descriptor =
            SessionDescriptor::from_params(&TransferQuickInput::quick_pick(1, vec![]));
        let mut update = TransferQuickInput::quick_pick(1, vec![PickItem::new(8, "eight")]);
        update.placeholder = Some("pick".to_string());

        assert!(descriptor.apply_update(&update));
        assert_eq!(descriptor.place_holder(), Some("pick"));

        let SessionDescriptor::PickOne(pick) = descriptor else {
            panic!("expected pick-one session");
        };
        assert_eq!(pick.items.await.unwrap()[0].handle, 8);
    }
}
