//! Wire types for the platform's JSON-RPC endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw JSON-RPC response envelope
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id:      Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result:  Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:   Option<JsonRpcError>,
}

/// Raw error object from a JSON-RPC response
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct JsonRpcError {
    pub code:    i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data:    Option<RemoteFaultData>,
}

/// Server-side exception details carried in `error.data`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct RemoteFaultData {
    #[serde(default)]
    pub name:    String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub debug:   String,
}

/// Fault reported by the remote server
#[derive(Debug, Clone)]
pub struct RemoteFault {
    pub code:      i64,
    pub message:   String,
    /// Qualified exception name, e.g. `odoo.exceptions.AccessError`
    pub exception: String,
    pub detail:    String,
}

impl std::fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.exception.is_empty() {
            write!(f, "{} (code {})", self.message, self.code)
        } else {
            write!(
                f,
                "{}: {} (code {})",
                self.exception, self.detail, self.code
            )
        }
    }
}

/// Outcome of one JSON-RPC call
#[derive(Debug)]
pub enum ResponseStatus {
    Success(Value),
    Fault(RemoteFault),
}

impl From<JsonRpcResponse> for ResponseStatus {
    fn from(response: JsonRpcResponse) -> Self {
        match response.error {
            Some(error) => {
                let data = error.data.unwrap_or_default();
                Self::Fault(RemoteFault {
                    code:      error.code,
                    message:   error.message,
                    exception: data.name,
                    detail:    data.message,
                })
            },
            None => Self::Success(response.result.unwrap_or(Value::Null)),
        }
    }
}
