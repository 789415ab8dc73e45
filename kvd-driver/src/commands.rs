//! # Key/Value Operations
//!
//! Purpose: The string commands most callers need: GET, SET (with expiry and
//! existence conditions), APPEND, MGET, MSET and GETDEL.
//!
//! ## Design Principles
//! 1. **Text In, Text Out**: Keys and values must be UTF-8; checked before dispatch.
//! 2. **Absent Is Not Failure**: A missing key is `Ok(None)`, never an error.
//! 3. **Typed Options**: `SetOptions` enums make `EX`/`EXAT` and `NX`/`XX` exclusive.

use kvd_client::{DriverResult, RespValue};

use crate::args;
use crate::handle::SharedHandle;
use crate::reply;

/// Expiration attached by SET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// `EX seconds`: relative time to live.
    Seconds(u64),
    /// `EXAT timestamp`: absolute unix time in seconds.
    At(u64),
}

/// Existence condition for SET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    /// `NX`: only set when the key does not exist.
    IfAbsent,
    /// `XX`: only set when the key already exists.
    IfPresent,
}

/// Options recognized by [`Commands::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub expiry: Option<Expiry>,
    pub condition: Option<SetCondition>,
}

impl SetOptions {
    pub fn new() -> Self {
        SetOptions::default()
    }

    pub fn expire_in(mut self, seconds: u64) -> Self {
        self.expiry = Some(Expiry::Seconds(seconds));
        self
    }

    pub fn expire_at(mut self, unix_secs: u64) -> Self {
        self.expiry = Some(Expiry::At(unix_secs));
        self
    }

    pub fn only_if_absent(mut self) -> Self {
        self.condition = Some(SetCondition::IfAbsent);
        self
    }

    pub fn only_if_present(mut self) -> Self {
        self.condition = Some(SetCondition::IfPresent);
        self
    }

    /// Trailing SET arguments, in the order the store documents them.
    fn to_args(self) -> DriverResult<Vec<String>> {
        let mut out = Vec::with_capacity(3);
        match self.expiry {
            Some(Expiry::Seconds(0)) | Some(Expiry::At(0)) => {
                return Err(args::reject("set", "expiry must be greater than zero".to_string()));
            }
            Some(Expiry::Seconds(secs)) => {
                out.push("EX".to_string());
                out.push(secs.to_string());
            }
            Some(Expiry::At(ts)) => {
                out.push("EXAT".to_string());
                out.push(ts.to_string());
            }
            None => {}
        }
        match self.condition {
            Some(SetCondition::IfAbsent) => out.push("NX".to_string()),
            Some(SetCondition::IfPresent) => out.push("XX".to_string()),
            None => {}
        }
        Ok(out)
    }
}

/// Key/value facade over the shared handle.
#[derive(Clone)]
pub struct Commands {
    handle: SharedHandle,
}

impl Commands {
    pub(crate) fn new(handle: SharedHandle) -> Self {
        Commands { handle }
    }

    /// Fetches a value by key. Returns `Ok(None)` when the key is missing.
    pub fn get(&self, key: impl AsRef<[u8]>) -> DriverResult<Option<String>> {
        let key = args::text("get", "key", key.as_ref())?;
        self.handle.call(&[b"GET", key.as_bytes()], reply::optional_text)
    }

    /// Sets a key, replacing any previous value.
    ///
    /// Returns `Ok(false)` when an `NX`/`XX` condition prevented the write.
    pub fn set(
        &self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        options: &SetOptions,
    ) -> DriverResult<bool> {
        let key = args::text("set", "key", key.as_ref())?;
        let value = args::text("set", "value", value.as_ref())?;
        let extra = options.to_args()?;

        let mut cmd: Vec<&[u8]> = vec![b"SET".as_slice(), key.as_bytes(), value.as_bytes()];
        cmd.extend(extra.iter().map(|arg| arg.as_bytes()));
        self.handle.call(&cmd, |reply| match reply {
            RespValue::Bulk(None) => Ok(false),
            other => reply::ok(other).map(|_| true),
        })
    }

    /// Appends to a string value, creating it when absent.
    ///
    /// Returns the length of the value after the append.
    pub fn append(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> DriverResult<i64> {
        let key = args::text("append", "key", key.as_ref())?;
        let value = args::text("append", "value", value.as_ref())?;
        self.handle
            .call(&[b"APPEND", key.as_bytes(), value.as_bytes()], reply::integer)
    }

    /// Sets every pair in one atomic MSET.
    pub fn mset<K, V>(&self, pairs: &[(K, V)]) -> DriverResult<()>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        args::non_empty("mset", "pairs", pairs)?;
        let mut cmd: Vec<&[u8]> = Vec::with_capacity(1 + pairs.len() * 2);
        cmd.push(b"MSET".as_slice());
        for (key, value) in pairs {
            cmd.push(args::text("mset", "key", key.as_ref())?.as_bytes());
            cmd.push(args::text("mset", "value", value.as_ref())?.as_bytes());
        }
        self.handle.call(&cmd, reply::ok)
    }

    /// Fetches several keys; missing keys come back as `None` in place.
    pub fn mget<K: AsRef<[u8]>>(&self, keys: &[K]) -> DriverResult<Vec<Option<String>>> {
        args::non_empty("mget", "keys", keys)?;
        let mut cmd: Vec<&[u8]> = Vec::with_capacity(1 + keys.len());
        cmd.push(b"MGET".as_slice());
        for key in keys {
            cmd.push(args::text("mget", "key", key.as_ref())?.as_bytes());
        }
        self.handle.call(&cmd, reply::optional_text_list)
    }

    /// Returns the value and deletes the key in one step.
    pub fn getdel(&self, key: impl AsRef<[u8]>) -> DriverResult<Option<String>> {
        let key = args::text("getdel", "key", key.as_ref())?;
        self.handle.call(&[b"GETDEL", key.as_bytes()], reply::optional_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvd_client::DriverError;

    #[test]
    fn set_options_render_in_order() {
        let options = SetOptions::new().expire_in(30).only_if_absent();
        assert_eq!(options.to_args().unwrap(), vec!["EX", "30", "NX"]);

        let options = SetOptions::new().expire_at(1_700_000_000).only_if_present();
        assert_eq!(options.to_args().unwrap(), vec!["EXAT", "1700000000", "XX"]);

        assert!(SetOptions::new().to_args().unwrap().is_empty());
    }

    #[test]
    fn later_builder_call_wins() {
        let options = SetOptions::new().expire_in(5).expire_at(99).only_if_absent().only_if_present();
        assert_eq!(options.expiry, Some(Expiry::At(99)));
        assert_eq!(options.condition, Some(SetCondition::IfPresent));
    }

    #[test]
    fn zero_expiry_is_rejected() {
        assert!(matches!(
            SetOptions::new().expire_in(0).to_args(),
            Err(DriverError::InvalidArgument(_))
        ));
    }
}
