//! # Shared Connection Handle
//!
//! Purpose: The one session every facade talks through. Closing it from
//! any owner invalidates it for all of them at once.
//!
//! ## Design Principles
//! 1. **Single Owner, Many Readers**: `Session` owns it, facades hold `Arc` clones.
//! 2. **Minimal Locking**: The mutex is held for exactly one round trip.
//! 3. **Fail Closed**: After close, or after a broken socket, calls return `NotConnected`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kvd_client::{ConnectOptions, Connection, DriverError, DriverResult, RespValue};
use tracing::warn;

/// Handle type shared by the four facades.
pub type SharedHandle = Arc<Handle>;

pub struct Handle {
    conn: Mutex<Option<Connection>>,
    // Kept so the monitor stream can open a sibling connection.
    options: ConnectOptions,
}

impl Handle {
    pub(crate) fn new(conn: Connection, options: ConnectOptions) -> Self {
        Handle {
            conn: Mutex::new(Some(conn)),
            options,
        }
    }

    /// Options the session was opened with.
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// False once the session was closed or its socket broke.
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Runs one command; error replies become `DriverError::Server`.
    pub(crate) fn exec(&self, args: &[&[u8]]) -> DriverResult<RespValue> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(DriverError::NotConnected)?;
        match conn.exec(args) {
            Ok(reply) => reply.into_result(),
            Err(err) => {
                if err.is_fatal() {
                    // The reply stream is out of sync; nothing after this can be trusted.
                    guard.take();
                    warn!(target: "kvd::handle", error = %err, "dropping broken connection");
                }
                Err(err)
            }
        }
    }

    /// Runs one command and decodes its reply, logging any failure.
    pub(crate) fn call<T, F>(&self, args: &[&[u8]], decode: F) -> DriverResult<T>
    where
        F: FnOnce(RespValue) -> DriverResult<T>,
    {
        let result = self.exec(args).and_then(decode);
        if let Err(err) = &result {
            warn!(
                target: "kvd::handle",
                command = %command_name(args),
                error = %err,
                "command failed"
            );
        }
        result
    }

    /// Sends QUIT and invalidates the handle. A closed handle closes trivially.
    pub(crate) fn close(&self) -> DriverResult<()> {
        match self.lock().take() {
            Some(conn) => conn.quit(),
            None => Ok(()),
        }
    }

    /// Drops the socket without QUIT.
    pub(crate) fn invalidate(&self) {
        self.lock().take();
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Command name for logs: the verb, plus the subcommand for container verbs.
fn command_name(args: &[&[u8]]) -> String {
    let verb = args.first().map(|v| String::from_utf8_lossy(v)).unwrap_or_default();
    match args.get(1) {
        Some(sub) if matches!(verb.as_ref(), "CLIENT" | "ACL" | "MEMORY") => {
            format!("{} {}", verb, String::from_utf8_lossy(sub))
        }
        _ => verb.into_owned(),
    }
}
