//! Dispatch of requester calls to the quick open proxy

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use quickinput_core::{
    InputOptions, PickItem, PickOptions, QuickOpen, RemoteError, SessionId, TransferQuickInput,
};

use crate::connection::RequestHandler;
use crate::protocol::{methods, param, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};

/// Serves the `$`-methods of a [`QuickOpen`] proxy
pub struct QuickOpenServer {
    proxy: Arc<QuickOpen>,
}

impl QuickOpenServer {
    pub fn new(proxy: Arc<QuickOpen>) -> Self {
        Self { proxy }
    }

    pub fn proxy(&self) -> &Arc<QuickOpen> {
        &self.proxy
    }

    async fn handle_show(
        &self,
        id: RequestId,
        params: Option<Value>,
        cancel: CancellationToken,
    ) -> JsonRpcResponse {
        let options: PickOptions = match param::<Option<PickOptions>>(params.as_ref(), 0) {
            Ok(options) => options.unwrap_or_default(),
            Err(e) => return JsonRpcResponse::error(id, e),
        };

        let result = self.proxy.show(options, cancel).await;
        reply(id, result)
    }

    fn handle_set_items(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        match param::<Vec<PickItem>>(params.as_ref(), 0) {
            Ok(items) => {
                self.proxy.set_items(items);
                JsonRpcResponse::success(id, Value::Null)
            }
            Err(e) => JsonRpcResponse::error(id, e),
        }
    }

    fn handle_set_error(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        match param::<RemoteError>(params.as_ref(), 0) {
            Ok(error) => {
                self.proxy.set_error(error);
                JsonRpcResponse::success(id, Value::Null)
            }
            Err(e) => JsonRpcResponse::error(id, e),
        }
    }

    async fn handle_input(
        &self,
        id: RequestId,
        params: Option<Value>,
        cancel: CancellationToken,
    ) -> JsonRpcResponse {
        let options = match param::<Option<InputOptions>>(params.as_ref(), 0) {
            Ok(options) => options,
            Err(e) => return JsonRpcResponse::error(id, e),
        };
        let validate_input = match param::<Option<bool>>(params.as_ref(), 1) {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => return JsonRpcResponse::error(id, e),
        };

        let result = self.proxy.input(options, validate_input, cancel).await;
        reply(id, result)
    }

    fn handle_create_or_update(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        match param::<TransferQuickInput>(params.as_ref(), 0) {
            Ok(params) => {
                // The show runs on its own; the requester hears back through
                // `$onDidSelectItems`
                drop(self.proxy.create_or_update(params));
                JsonRpcResponse::success(id, Value::Null)
            }
            Err(e) => JsonRpcResponse::error(id, e),
        }
    }

    fn handle_dispose(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        match param::<SessionId>(params.as_ref(), 0) {
            Ok(session_id) => {
                self.proxy.dispose(session_id);
                JsonRpcResponse::success(id, Value::Null)
            }
            Err(e) => JsonRpcResponse::error(id, e),
        }
    }
}

#[async_trait]
impl RequestHandler for QuickOpenServer {
    async fn handle_request(
        &self,
        request: JsonRpcRequest,
        cancel: CancellationToken,
    ) -> JsonRpcResponse {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        match method.as_str() {
            methods::SHOW => self.handle_show(id, params, cancel).await,
            methods::SET_ITEMS => self.handle_set_items(id, params),
            methods::SET_ERROR => self.handle_set_error(id, params),
            methods::INPUT => self.handle_input(id, params, cancel).await,
            methods::CREATE_OR_UPDATE => self.handle_create_or_update(id, params),
            methods::DISPOSE => self.handle_dispose(id, params),
            other => {
                debug!(method = other, "Unknown method");
                JsonRpcResponse::error(id, JsonRpcError::method_not_found())
            }
        }
    }
}

/// Serialize a mediator result into a response
fn reply<T: Serialize>(id: RequestId, result: quickinput_core::Result<T>) -> JsonRpcResponse {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e)),
        },
        Err(e) => {
            warn!(%id, error = %e, "Request failed");
            JsonRpcResponse::error(id, to_rpc_error(e))
        }
    }
}

fn to_rpc_error(error: quickinput_core::Error) -> JsonRpcError {
    match error {
        quickinput_core::Error::Remote(remote) => {
            let mut rpc = JsonRpcError::new(JsonRpcError::SERVER_ERROR, remote.message);
            if remote.name.is_some() || remote.stack.is_some() {
                rpc = rpc.with_data(json!({ "name": remote.name, "stack": remote.stack }));
            }
            rpc
        }
        other => JsonRpcError::new(JsonRpcError::SERVER_ERROR, other.to_string()),
    }
}
