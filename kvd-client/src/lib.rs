//! # KVD Wire Client
//!
//! Purpose: Provide a lightweight, synchronous Redis-compatible client
//! connection that the driver facades share.
//!
//! ## Design Principles
//! 1. **One Session**: A single authenticated TCP connection, no pool.
//! 2. **Minimal Allocation**: Reuse buffers for RESP framing and parsing.
//! 3. **Protocol Clarity**: Encode/parse RESP2 explicitly for correctness.
//! 4. **Typed Failures**: Every failure is a `DriverError` variant.

mod connection;
mod error;
mod options;
mod resp;

pub use connection::Connection;
pub use error::{DriverError, DriverResult};
pub use options::{ConnectOptions, DEFAULT_HOST, DEFAULT_PORT};
pub use resp::{encode_command, read_response, RespValue};
