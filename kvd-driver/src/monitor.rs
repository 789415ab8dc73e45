//! # Monitor Stream
//!
//! Purpose: Turn the MONITOR push feed into typed events.
//!
//! Each pushed line looks like:
//!
//! ```text
//! 1339518083.107412 [0 127.0.0.1:60866] "set" "key" "va\"lue"
//! 1339518083.107412 [0 lua] "get" "key"
//! 1339518083.107412 [0 unix:/tmp/store.sock] "ping"
//! ```

use kvd_client::{Connection, DriverError, DriverResult, RespValue};
use serde::Serialize;
use tracing::debug;

/// Where a monitored command came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientOrigin {
    Tcp { address: String, port: u16 },
    Unix { path: String },
    Lua,
    Other { raw: String },
}

impl ClientOrigin {
    fn parse(raw: &str) -> Self {
        if raw == "lua" {
            return ClientOrigin::Lua;
        }
        if let Some(path) = raw.strip_prefix("unix:") {
            return ClientOrigin::Unix {
                path: path.to_string(),
            };
        }
        match raw.rsplit_once(':').map(|(addr, port)| (addr, port.parse::<u16>())) {
            Some((address, Ok(port))) => ClientOrigin::Tcp {
                address: address.to_string(),
                port,
            },
            _ => ClientOrigin::Other {
                raw: raw.to_string(),
            },
        }
    }
}

/// One command observed by MONITOR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorEvent {
    /// Unix time in seconds, microsecond precision.
    pub time: f64,
    pub db: u32,
    pub origin: ClientOrigin,
    /// Command name and arguments, unescaped.
    pub args: Vec<String>,
}

impl MonitorEvent {
    /// Parses one pushed MONITOR line.
    pub fn parse(line: &str) -> DriverResult<Self> {
        let malformed = || DriverError::UnexpectedResponse;

        let (time, rest) = line.split_once(' ').ok_or_else(malformed)?;
        let time: f64 = time.parse().map_err(|_| malformed())?;

        let rest = rest.strip_prefix('[').ok_or_else(malformed)?;
        let (client, command) = rest.split_once("] ").ok_or_else(malformed)?;
        let (db, origin) = client.split_once(' ').ok_or_else(malformed)?;
        let db: u32 = db.parse().map_err(|_| malformed())?;

        Ok(MonitorEvent {
            time,
            db,
            origin: ClientOrigin::parse(origin),
            args: split_quoted(command).ok_or_else(malformed)?,
        })
    }

    /// Command name, uppercased.
    pub fn command(&self) -> Option<String> {
        self.args.first().map(|name| name.to_ascii_uppercase())
    }

    /// Arguments joined by spaces, as a human would type them.
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

/// Splits `"a" "b\"c"` into its unescaped arguments. `None` on bad quoting.
///
/// `\xHH` escapes are raw bytes, so multi-byte text arrives as a run of them
/// and is decoded once the whole argument is collected.
fn split_quoted(input: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut bytes = input.bytes().peekable();
    loop {
        while bytes.peek() == Some(&b' ') {
            bytes.next();
        }
        match bytes.next() {
            None => return Some(args),
            Some(b'"') => {}
            Some(_) => return None,
        }
        let mut arg = Vec::new();
        loop {
            match bytes.next()? {
                b'"' => break,
                b'\\' => match bytes.next()? {
                    b'n' => arg.push(b'\n'),
                    b'r' => arg.push(b'\r'),
                    b't' => arg.push(b'\t'),
                    b'a' => arg.push(0x07),
                    b'b' => arg.push(0x08),
                    b'x' => {
                        let hi = char::from(bytes.next()?).to_digit(16)?;
                        let lo = char::from(bytes.next()?).to_digit(16)?;
                        arg.push((hi * 16 + lo) as u8);
                    }
                    other => arg.push(other),
                },
                b => arg.push(b),
            }
        }
        args.push(String::from_utf8_lossy(&arg).into_owned());
    }
}

/// Blocking iterator over MONITOR events on a dedicated connection.
///
/// Yields `Err` for a line it cannot read and ends after transport errors or
/// when the server hangs up. Dropping the stream closes the connection.
pub struct MonitorStream {
    conn: Option<Connection>,
}

impl MonitorStream {
    pub(crate) fn new(conn: Connection) -> Self {
        MonitorStream { conn: Some(conn) }
    }
}

impl Iterator for MonitorStream {
    type Item = DriverResult<MonitorEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        let conn = self.conn.as_mut()?;
        match conn.read_reply() {
            Ok(RespValue::Simple(line)) => Some(
                String::from_utf8(line)
                    .map_err(|_| DriverError::UnexpectedResponse)
                    .and_then(|line| MonitorEvent::parse(&line)),
            ),
            Ok(RespValue::Error(message)) => Some(Err(DriverError::server(&message))),
            Ok(_) => Some(Err(DriverError::UnexpectedResponse)),
            Err(err) => {
                self.conn = None;
                if err.is_eof() {
                    debug!(target: "kvd::monitor", "monitor stream closed by server");
                    None
                } else {
                    Some(Err(err))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tcp_event_with_escapes() {
        let event =
            MonitorEvent::parse(r#"1339518083.107412 [0 127.0.0.1:60866] "set" "key" "va\"l ue""#)
                .unwrap();
        assert_eq!(event.db, 0);
        assert!((event.time - 1339518083.107412).abs() < 1e-6);
        assert_eq!(
            event.origin,
            ClientOrigin::Tcp {
                address: "127.0.0.1".to_string(),
                port: 60866
            }
        );
        assert_eq!(event.args, vec!["set", "key", "va\"l ue"]);
        assert_eq!(event.command().as_deref(), Some("SET"));
    }

    #[test]
    fn parses_lua_and_unix_origins() {
        let lua = MonitorEvent::parse(r#"1.5 [3 lua] "get" "k""#).unwrap();
        assert_eq!(lua.origin, ClientOrigin::Lua);
        assert_eq!(lua.db, 3);

        let unix = MonitorEvent::parse(r#"1.5 [0 unix:/tmp/store.sock] "ping""#).unwrap();
        assert_eq!(
            unix.origin,
            ClientOrigin::Unix {
                path: "/tmp/store.sock".to_string()
            }
        );
        assert_eq!(unix.command_line(), "ping");
    }

    #[test]
    fn ipv6_origin_splits_on_last_colon() {
        let event = MonitorEvent::parse(r#"2.0 [0 [::1]:6000] "dbsize""#).unwrap();
        assert_eq!(
            event.origin,
            ClientOrigin::Tcp {
                address: "[::1]".to_string(),
                port: 6000
            }
        );
    }

    #[test]
    fn decodes_hex_and_control_escapes() {
        assert_eq!(
            split_quoted(r#""a\x41\n" "\\""#).unwrap(),
            vec!["aA\n".to_string(), "\\".to_string()]
        );
    }

    #[test]
    fn joins_byte_escapes_into_utf8_text() {
        let event = MonitorEvent::parse(r#"1.0 [0 lua] "set" "caf\xc3\xa9" "\xe2\x82\xac5""#).unwrap();
        assert_eq!(event.args, vec!["set", "caf\u{e9}", "\u{20ac}5"]);
        // Raw UTF-8 passes through unchanged.
        assert_eq!(split_quoted("\"na\u{ef}ve\"").unwrap(), vec!["na\u{ef}ve".to_string()]);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(MonitorEvent::parse("OK").is_err());
        assert!(MonitorEvent::parse(r#"x [0 lua] "get""#).is_err());
        assert!(MonitorEvent::parse(r#"1.0 [0 lua] "unterminated"#).is_err());
        assert!(MonitorEvent::parse(r#"1.0 [0 lua] bare"#).is_err());
    }
}
