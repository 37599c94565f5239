//! Constants for the Odoo JSON-RPC transport

/// Path of the JSON-RPC dispatcher on an Odoo server
pub const JSONRPC_PATH: &str = "/jsonrpc";

/// JSON-RPC protocol version
pub const JSONRPC_VERSION: &str = "2.0";

/// Method name every Odoo JSON-RPC call is wrapped in
pub const JSONRPC_METHOD_CALL: &str = "call";

/// Service exposing `authenticate` and `version`
pub const SERVICE_COMMON: &str = "common";

/// Service exposing `execute_kw`
pub const SERVICE_OBJECT: &str = "object";

/// Per-request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Model holding field metadata
pub const MODEL_FIELDS: &str = "ir.model.fields";

/// Model holding model metadata
pub const MODEL_MODELS: &str = "ir.model";

/// Model holding external identifiers and the module that created each record
pub const MODEL_DATA: &str = "ir.model.data";

/// Model holding the users table
pub const MODEL_USERS: &str = "res.users";
