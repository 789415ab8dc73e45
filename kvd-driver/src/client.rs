//! # Client Introspection
//!
//! Purpose: Inspect and manage client connections: this session's id, info
//! and name, the server's client list, and killing other clients by address.

use std::net::SocketAddr;

use kvd_client::{DriverError, DriverResult};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::args;
use crate::handle::SharedHandle;
use crate::reply;

/// Fields kept by [`ClientOps::client_info`] unless everything is requested.
pub const CLIENT_INFO_FIELDS: [&str; 6] = ["id", "addr", "laddr", "fd", "name", "db"];

/// One `CLIENT INFO`/`CLIENT LIST` line as ordered `field=value` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    fields: Vec<(String, String)>,
}

impl ClientInfo {
    /// Parses a line like `id=3 addr=127.0.0.1:50188 name= db=0`.
    ///
    /// Tokens without `=` are ignored; an empty value stays empty.
    pub fn parse(line: &str) -> Self {
        let fields = line
            .split_whitespace()
            .filter_map(|token| token.split_once('='))
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect();
        ClientInfo { fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn id(&self) -> Option<u64> {
        self.get("id").and_then(|id| id.parse().ok())
    }

    pub fn addr(&self) -> Option<&str> {
        self.get("addr")
    }

    /// Keeps only the named fields, in the order given. Missing fields are skipped.
    pub fn project(&self, names: &[&str]) -> Self {
        let fields = names
            .iter()
            .filter_map(|name| self.get(name).map(|value| (name.to_string(), value.to_string())))
            .collect();
        ClientInfo { fields }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ClientInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// Client connection facade over the shared handle.
#[derive(Clone)]
pub struct ClientOps {
    handle: SharedHandle,
}

impl ClientOps {
    pub(crate) fn new(handle: SharedHandle) -> Self {
        ClientOps { handle }
    }

    /// Id the server assigned to this connection.
    pub fn client_id(&self) -> DriverResult<u64> {
        self.handle.call(&[b"CLIENT", b"ID"], |reply| {
            let id = reply::integer(reply)?;
            u64::try_from(id).map_err(|_| DriverError::UnexpectedResponse)
        })
    }

    /// Info about this connection: the `CLIENT_INFO_FIELDS` projection, or
    /// every field when `all` is set.
    pub fn client_info(&self, all: bool) -> DriverResult<ClientInfo> {
        let info = self.handle.call(&[b"CLIENT", b"INFO"], |reply| {
            reply::text(reply).map(|line| ClientInfo::parse(line.trim()))
        })?;
        if all {
            Ok(info)
        } else {
            Ok(info.project(&CLIENT_INFO_FIELDS))
        }
    }

    /// Every client currently connected to the server.
    pub fn client_list(&self) -> DriverResult<Vec<ClientInfo>> {
        self.handle.call(&[b"CLIENT", b"LIST"], |reply| {
            let body = reply::text(reply)?;
            Ok(body
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ClientInfo::parse)
                .collect())
        })
    }

    /// Closes the client connected from `address` (`ip:port`).
    ///
    /// Returns `Ok(false)` when no client matched.
    pub fn kill(&self, address: impl AsRef<[u8]>) -> DriverResult<bool> {
        let address = args::text("kill", "address", address.as_ref())?;
        if address.parse::<SocketAddr>().is_err() {
            return Err(args::reject("kill", format!("address {:?} is not ip:port", address)));
        }
        self.handle
            .call(&[b"CLIENT", b"KILL", b"ADDR", address.as_bytes()], |reply| {
                reply::integer(reply).map(|killed| killed > 0)
            })
    }

    /// Names this connection; names may not contain spaces.
    pub fn set_client_name(&self, name: impl AsRef<[u8]>) -> DriverResult<()> {
        let name = args::token("set_client_name", "name", name.as_ref())?;
        self.handle
            .call(&[b"CLIENT", b"SETNAME", name.as_bytes()], reply::ok)
    }

    /// Name of this connection, if one was set.
    pub fn client_name(&self) -> DriverResult<Option<String>> {
        self.handle.call(&[b"CLIENT", b"GETNAME"], reply::optional_text)
    }

    pub fn echo(&self, message: impl AsRef<[u8]>) -> DriverResult<String> {
        let message = args::text("echo", "message", message.as_ref())?;
        self.handle.call(&[b"ECHO", message.as_bytes()], reply::text)
    }
}
