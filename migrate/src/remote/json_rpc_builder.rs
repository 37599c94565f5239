use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Value, json};

use super::constants::{JSONRPC_METHOD_CALL, JSONRPC_VERSION};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Builder for `call` envelopes addressed to one service method
pub struct JsonRpcBuilder {
    service: &'static str,
    method:  &'static str,
    args:    Vec<Value>,
}

impl JsonRpcBuilder {
    pub const fn new(service: &'static str, method: &'static str) -> Self {
        Self {
            service,
            method,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn build(self) -> Value {
        json!({
            "jsonrpc": JSONRPC_VERSION,
            "method": JSONRPC_METHOD_CALL,
            "params": {
                "service": self.service,
                "method": self.method,
                "args": self.args,
            },
            "id": NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_service_method_and_positional_args() {
        let body = JsonRpcBuilder::new("common", "authenticate")
            .arg("prod")
            .arg("admin")
            .arg("secret")
            .arg(json!({}))
            .build();

        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["method"], "call");
        assert_eq!(body["params"]["service"], "common");
        assert_eq!(body["params"]["method"], "authenticate");
        assert_eq!(body["params"]["args"], json!(["prod", "admin", "secret", {}]));
        assert!(body["id"].is_u64());
    }
}
