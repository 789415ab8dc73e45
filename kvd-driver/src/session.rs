//! # Session
//!
//! Purpose: One open connection plus the four facades bound to it. The
//! facades are created together and invalidated together.

use std::sync::Arc;

use kvd_client::{ConnectOptions, Connection, DriverResult};

use crate::client::ClientOps;
use crate::commands::Commands;
use crate::diagnostics::Diagnostics;
use crate::handle::{Handle, SharedHandle};
use crate::users::Users;

pub struct Session {
    handle: SharedHandle,
    commands: Commands,
    client: ClientOps,
    users: Users,
    diagnostics: Diagnostics,
}

impl Session {
    /// Connects, authenticates, selects the database and verifies with PING.
    pub fn open(options: &ConnectOptions) -> DriverResult<Self> {
        let conn = Connection::open(options)?;
        let handle = Arc::new(Handle::new(conn, options.clone()));
        Ok(Session {
            commands: Commands::new(handle.clone()),
            client: ClientOps::new(handle.clone()),
            users: Users::new(handle.clone()),
            diagnostics: Diagnostics::new(handle.clone()),
            handle,
        })
    }

    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    pub fn client(&self) -> &ClientOps {
        &self.client
    }

    pub fn users(&self) -> &Users {
        &self.users
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn handle(&self) -> &SharedHandle {
        &self.handle
    }

    /// Sends QUIT. Every facade sees `NotConnected` afterwards, even if QUIT failed.
    pub fn close(self) -> DriverResult<()> {
        self.handle.close()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Facade clones may outlive the session; they must not keep the socket.
        self.handle.invalidate();
    }
}
