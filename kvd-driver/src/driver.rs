//! # Driver
//!
//! Purpose: The connection manager. Owns at most one `Session` and hands
//! out its facades while connected.
//!
//! ## Design Principles
//! 1. **One Per Process**: Only one `Driver` may be alive at a time, either the
//!    shared instance from [`Driver::instance`] or one built with [`Driver::new`]
//!    and passed around explicitly.
//! 2. **Defined Disconnect**: Facade access while disconnected is `NotConnected`.
//! 3. **Close Is Idempotent**: Closing a disconnected driver succeeds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use kvd_client::{ConnectOptions, DriverError, DriverResult};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::client::ClientOps;
use crate::commands::Commands;
use crate::diagnostics::Diagnostics;
use crate::session::Session;
use crate::users::Users;

static CLAIMED: AtomicBool = AtomicBool::new(false);
static INSTANCE: OnceCell<Mutex<Driver>> = OnceCell::new();

pub struct Driver {
    session: Option<Session>,
}

impl Driver {
    /// Creates the process's driver.
    ///
    /// Fails with `AlreadyInstantiated` while another driver is alive.
    pub fn new() -> DriverResult<Self> {
        CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DriverError::AlreadyInstantiated)?;
        Ok(Driver { session: None })
    }

    /// The process-wide driver, created on first access.
    ///
    /// Fails only if a driver built with [`Driver::new`] is still alive.
    pub fn instance() -> DriverResult<&'static Mutex<Driver>> {
        INSTANCE.get_or_try_init(|| Driver::new().map(Mutex::new))
    }

    /// Opens a session, replacing (and closing) any current one.
    pub fn connect(&mut self, options: &ConnectOptions) -> DriverResult<()> {
        if let Some(previous) = self.session.take() {
            if let Err(err) = previous.close() {
                debug!(target: "kvd::driver", error = %err, "closing replaced session failed");
            }
        }
        match Session::open(options) {
            Ok(session) => {
                info!(target: "kvd::driver", endpoint = %options, "connected");
                self.session = Some(session);
                Ok(())
            }
            Err(err) => {
                warn!(target: "kvd::driver", endpoint = %options, error = %err, "connection failed");
                Err(err)
            }
        }
    }

    /// Closes the session. Succeeds trivially when nothing is connected.
    ///
    /// The driver is disconnected afterwards even when QUIT fails.
    pub fn close(&mut self) -> DriverResult<()> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                debug!(target: "kvd::driver", "close without an established connection");
                return Ok(());
            }
        };
        match session.close() {
            Ok(()) => {
                info!(target: "kvd::driver", "connection closed");
                Ok(())
            }
            Err(err) => {
                warn!(target: "kvd::driver", error = %err, "QUIT failed");
                Err(err)
            }
        }
    }

    /// True while a session is open and its socket is healthy.
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .map(|session| session.handle().is_open())
            .unwrap_or(false)
    }

    /// The current session, or `NotConnected`.
    pub fn session(&self) -> DriverResult<&Session> {
        self.session.as_ref().ok_or(DriverError::NotConnected)
    }

    /// Key-value operations on the current session.
    pub fn commands(&self) -> DriverResult<&Commands> {
        self.session().map(Session::commands)
    }

    /// Client introspection on the current session.
    pub fn client(&self) -> DriverResult<&ClientOps> {
        self.session().map(Session::client)
    }

    /// User and ACL administration on the current session.
    pub fn users(&self) -> DriverResult<&Users> {
        self.session().map(Session::users)
    }

    /// Memory, key-count and monitor diagnostics on the current session.
    pub fn diagnostics(&self) -> DriverResult<&Diagnostics> {
        self.session().map(Session::diagnostics)
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        CLAIMED.store(false, Ordering::Release);
    }
}
