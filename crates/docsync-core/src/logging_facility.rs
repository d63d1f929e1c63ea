//! Structured logging facility for docsync
//!
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! ```rust
//! use docsync_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Lower layers (registry, codec) only emit `tracing::debug!`; the gate logs
//! every denial at `warn`; command dispatch owns the start/end boundary.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
