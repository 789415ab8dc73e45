//! # KVD Driver
//!
//! Purpose: A small facade over a Redis-compatible store: one connection
//! manager and four groups of helpers sharing its session.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `Driver` hides the wire client; callers see grouped operations.
//! 2. **Typed Results**: `Ok(None)` for absent data, `Err(DriverError)` for failures.
//! 3. **Validate Early**: Malformed arguments never reach the store.
//! 4. **One Session**: All facades share one handle and are invalidated together.
//!
//! ```no_run
//! use kvd_driver::{ConnectOptions, Driver, SetOptions};
//!
//! let mut driver = Driver::new()?;
//! driver.connect(&ConnectOptions::default().with_password("secret"))?;
//! let kv = driver.commands()?;
//! kv.set("greeting", "hello", &SetOptions::new().expire_in(60))?;
//! assert_eq!(kv.get("greeting")?.as_deref(), Some("hello"));
//! driver.close()?;
//! # Ok::<(), kvd_driver::DriverError>(())
//! ```

mod args;
mod client;
mod commands;
mod diagnostics;
mod driver;
mod handle;
mod monitor;
mod reply;
mod session;
mod users;

pub use client::{ClientInfo, ClientOps, CLIENT_INFO_FIELDS};
pub use commands::{Commands, Expiry, SetCondition, SetOptions};
pub use diagnostics::{Diagnostics, MemoryStats, StatValue};
pub use driver::Driver;
pub use handle::{Handle, SharedHandle};
pub use monitor::{ClientOrigin, MonitorEvent, MonitorStream};
pub use session::Session;
pub use users::{UserRecord, Users, BASIC_COMMANDS, MAX_GENPASS_BITS};

pub use kvd_client::{ConnectOptions, DriverError, DriverResult};
