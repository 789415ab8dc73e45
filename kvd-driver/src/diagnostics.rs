//! # Diagnostics
//!
//! Purpose: Read-only views of the server's health: the memory doctor
//! report, memory metrics, per-key memory usage, key count and the live
//! command monitor.

use std::collections::BTreeMap;

use kvd_client::{Connection, DriverError, DriverResult, RespValue};
use serde::Serialize;
use tracing::{debug, warn};

use crate::args;
use crate::handle::SharedHandle;
use crate::monitor::MonitorStream;
use crate::reply;

/// `MEMORY STATS` metrics by name.
pub type MemoryStats = BTreeMap<String, StatValue>;

/// One `MEMORY STATS` value. Ratios arrive as text; `db.N` entries nest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Text(String),
    Nested(MemoryStats),
    List(Vec<StatValue>),
    Null,
}

impl StatValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StatValue::Integer(value) => Some(*value),
            StatValue::Text(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Integer(value) => Some(*value as f64),
            StatValue::Text(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&StatValue> {
        match self {
            StatValue::Nested(map) => map.get(field),
            _ => None,
        }
    }
}

/// Decodes a flat `name, value, name, value, ...` array into a map.
fn parse_stats(reply: RespValue) -> DriverResult<MemoryStats> {
    let items = reply::array(reply)?;
    if items.len() % 2 != 0 {
        return Err(DriverError::UnexpectedResponse);
    }
    let mut stats = MemoryStats::new();
    let mut iter = items.into_iter();
    while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
        let name = reply::text(name)?;
        let value = stat_value(&name, value)?;
        stats.insert(name, value);
    }
    Ok(stats)
}

/// Only per-database `db.N` entries are maps; every other array is a list.
fn stat_value(name: &str, value: RespValue) -> DriverResult<StatValue> {
    match value {
        RespValue::Integer(n) => Ok(StatValue::Integer(n)),
        RespValue::Simple(data) | RespValue::Bulk(Some(data)) => reply::utf8(data).map(StatValue::Text),
        RespValue::Bulk(None) | RespValue::Array(None) => Ok(StatValue::Null),
        RespValue::Array(Some(items)) if is_db_entry(name) => {
            parse_stats(RespValue::Array(Some(items))).map(StatValue::Nested)
        }
        RespValue::Array(Some(items)) => items
            .into_iter()
            .map(|item| stat_value(name, item))
            .collect::<DriverResult<_>>()
            .map(StatValue::List),
        RespValue::Error(message) => Err(DriverError::server(&message)),
    }
}

fn is_db_entry(name: &str) -> bool {
    name.strip_prefix("db.")
        .map(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Diagnostics facade over the shared handle.
#[derive(Clone)]
pub struct Diagnostics {
    handle: SharedHandle,
}

impl Diagnostics {
    pub(crate) fn new(handle: SharedHandle) -> Self {
        Diagnostics { handle }
    }

    /// The `MEMORY DOCTOR` report: memory problems and suggested remedies.
    pub fn check_memory(&self) -> DriverResult<String> {
        self.handle.call(&[b"MEMORY", b"DOCTOR"], reply::text)
    }

    /// Memory metrics such as `peak.allocated`, `total.allocated`,
    /// `keys.count`, `dataset.percentage` and per-database `db.N` overheads.
    pub fn check_memory_stats(&self) -> DriverResult<MemoryStats> {
        self.handle.call(&[b"MEMORY", b"STATS"], parse_stats)
    }

    /// Bytes a key and its value take in RAM; `Ok(None)` when the key is absent.
    pub fn memory_usage(&self, key: impl AsRef<[u8]>) -> DriverResult<Option<i64>> {
        let key = args::text("memory_usage", "key", key.as_ref())?;
        self.handle
            .call(&[b"MEMORY", b"USAGE", key.as_bytes()], reply::optional_integer)
    }

    /// Number of keys in the selected database.
    pub fn database_size(&self) -> DriverResult<i64> {
        self.handle.call(&[b"DBSIZE"], reply::integer)
    }

    /// Streams every command the server processes.
    ///
    /// MONITOR takes over a connection for good, so this opens a sibling
    /// connection with the session's options; the session stays usable.
    /// The stream blocks between events and ends when dropped or when the
    /// server closes the connection.
    pub fn actions_registry(&self) -> DriverResult<MonitorStream> {
        if !self.handle.is_open() {
            return Err(DriverError::NotConnected);
        }
        let mut conn = Connection::open(self.handle.options()).map_err(|err| {
            warn!(target: "kvd::diagnostics", error = %err, "monitor connection failed");
            err
        })?;
        conn.send(&[b"MONITOR"])?;
        match conn.read_reply()? {
            RespValue::Simple(_) => {}
            RespValue::Error(message) => {
                let err = DriverError::server(&message);
                warn!(target: "kvd::diagnostics", error = %err, "MONITOR refused");
                return Err(err);
            }
            _ => return Err(DriverError::UnexpectedResponse),
        }
        // The feed may stay quiet for any length of time.
        conn.set_read_timeout(None)?;
        debug!(target: "kvd::diagnostics", endpoint = %self.handle.options(), "monitor started");
        Ok(MonitorStream::new(conn))
    }
}
