//! Requester callbacks carried over the connection

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use quickinput_core::{ItemHandle, Requester, Result, SessionId};

use crate::connection::Connection;
use crate::protocol::methods;

/// [`Requester`] that forwards every callback to the remote process
pub struct RemoteRequester {
    connection: Arc<Connection>,
}

impl RemoteRequester {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl Requester for RemoteRequester {
    async fn on_item_selected(&self, handle: ItemHandle) -> Result<()> {
        self.connection
            .notify(methods::ON_ITEM_SELECTED, json!([handle]))?;
        Ok(())
    }

    async fn on_did_select_items(
        &self,
        session_id: SessionId,
        handles: Vec<ItemHandle>,
    ) -> Result<()> {
        self.connection
            .notify(methods::ON_DID_SELECT_ITEMS, json!([session_id, handles]))?;
        Ok(())
    }

    async fn validate_input(&self, value: String) -> Result<Option<String>> {
        let verdict = self
            .connection
            .request(methods::VALIDATE_INPUT, json!([value]))
            .await?;
        // Anything but a string means the value is acceptable
        Ok(verdict.as_str().map(str::to_string))
    }
}
