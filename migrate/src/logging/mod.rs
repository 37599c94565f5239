//! Trace log setup
//!
//! Diagnostic events go to a file in the system temp directory; the operator's
//! progress output on stdout stays separate.

mod lazy_file_writer;
mod tracing;

pub use tracing::TracingLevel;
