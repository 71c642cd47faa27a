//! Logging for cairn.
//!
//! Logs go to stderr so commands that stream block payloads to stdout stay
//! clean.

mod logging;

pub use logging::*;
