mod api;
mod client;
pub mod constants;
mod domain;
#[cfg(test)]
pub mod fake;
mod http_client;
mod json_rpc_builder;
mod types;

pub use api::{Record, RecordAccess, RecordId, RemoteApi, is_truthy};
pub use client::OdooClient;
pub use domain::{Domain, Operator};
