//! # Connection Options
//!
//! Everything needed to open and authenticate one session. The struct is
//! `Deserialize` with per-field defaults so it can sit inside an embedder's
//! own config file, and `from_env` covers the command-line tooling.

use std::env;
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{DriverError, DriverResult};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 6379;

/// Configuration for one store session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// Host name or IP address, e.g. "localhost".
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// ACL user for `AUTH`; `None` authenticates as the default user.
    pub username: Option<String>,
    /// Password for `AUTH`; `None` skips authentication.
    pub password: Option<String>,
    /// Logical database index selected after connecting.
    pub db: u32,
    /// Name announced with `CLIENT SETNAME` during the handshake.
    pub client_name: Option<String>,
    /// Optional TCP connect timeout.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
    /// Optional TCP read timeout.
    #[serde(with = "humantime_serde")]
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    #[serde(with = "humantime_serde")]
    pub write_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            db: 0,
            client_name: None,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl ConnectOptions {
    /// Options for `host:port` with every other field defaulted.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ConnectOptions {
            host: host.into(),
            port,
            ..ConnectOptions::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Applies the same timeout to connect, read and write.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self.read_timeout = Some(timeout);
        self.write_timeout = Some(timeout);
        self
    }

    /// Reads `KVD_HOST`, `KVD_PORT`, `KVD_USERNAME`, `KVD_PASSWORD`, `KVD_DB`,
    /// `KVD_CLIENT_NAME` and `KVD_TIMEOUT_MS`; unset variables keep defaults.
    pub fn from_env() -> DriverResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`ConnectOptions::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> DriverResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = ConnectOptions::default();
        if let Some(host) = lookup("KVD_HOST") {
            options.host = host;
        }
        if let Some(port) = lookup("KVD_PORT") {
            options.port = parse_var("KVD_PORT", &port)?;
        }
        options.username = lookup("KVD_USERNAME");
        options.password = lookup("KVD_PASSWORD");
        if let Some(db) = lookup("KVD_DB") {
            options.db = parse_var("KVD_DB", &db)?;
        }
        options.client_name = lookup("KVD_CLIENT_NAME");
        if let Some(timeout) = lookup("KVD_TIMEOUT_MS") {
            let millis: u64 = parse_var("KVD_TIMEOUT_MS", &timeout)?;
            options = options.with_timeout(Duration::from_millis(millis));
        }
        Ok(options)
    }

    /// Resolves host and port into candidate socket addresses.
    pub fn socket_addrs(&self) -> DriverResult<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| DriverError::InvalidAddress(self.to_string()))?
            .collect();
        if addrs.is_empty() {
            return Err(DriverError::InvalidAddress(self.to_string()));
        }
        Ok(addrs)
    }
}

impl fmt::Display for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.db)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> DriverResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| DriverError::invalid(format!("{} must be a number, got {:?}", name, raw)))
}
