//! Error types for the RPC adapter

use thiserror::Error;

use crate::protocol::JsonRpcError;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Remote error: {0}")]
    Remote(JsonRpcError),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<std::io::Error> for RpcError {
    fn from(e: std::io::Error) -> Self {
        RpcError::Transport(e.to_string())
    }
}

impl From<RpcError> for quickinput_core::Error {
    fn from(e: RpcError) -> Self {
        quickinput_core::Error::Requester(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
