//! # Store Connection
//!
//! Purpose: One TCP session to the store, with the handshake (AUTH, SELECT,
//! CLIENT SETNAME, PING) done up front so a returned `Connection` is known
//! to be live and authenticated.
//!
//! ## Design Principles
//! 1. **Single Session**: No pooling; the driver shares one connection.
//! 2. **Cache-Friendly Buffers**: The connection reuses its own buffers.
//! 3. **Fail Fast**: Handshake failures surface before the caller sees a handle.
//! 4. **Push Support**: `send`/`read_reply` split lets MONITOR read a stream.

use std::io::{BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use tracing::debug;

use crate::error::{DriverError, DriverResult};
use crate::options::ConnectOptions;
use crate::resp::{encode_command, read_response, RespValue};

/// Single TCP connection with reusable buffers.
///
/// The buffers are stored on the connection to avoid per-call allocations.
pub struct Connection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
}

impl Connection {
    /// Opens a TCP session and runs the handshake described by `options`.
    pub fn open(options: &ConnectOptions) -> DriverResult<Self> {
        let stream = connect_stream(options)?;
        if let Some(timeout) = options.read_timeout {
            stream.set_read_timeout(Some(timeout))?;
        }
        if let Some(timeout) = options.write_timeout {
            stream.set_write_timeout(Some(timeout))?;
        }
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;

        let mut conn = Connection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
        };
        conn.handshake(options)?;
        debug!(target: "kvd::connection", endpoint = %options, "session established");
        Ok(conn)
    }

    /// Executes a RESP command and returns the raw reply, error replies included.
    pub fn exec(&mut self, args: &[&[u8]]) -> DriverResult<RespValue> {
        self.send(args)?;
        self.read_reply()
    }

    /// Writes a command without waiting for its reply.
    pub fn send(&mut self, args: &[&[u8]]) -> DriverResult<()> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;
        Ok(())
    }

    /// Reads the next reply (or pushed line) from the socket.
    pub fn read_reply(&mut self) -> DriverResult<RespValue> {
        read_response(&mut self.reader, &mut self.line_buf)
    }

    /// Changes the socket read timeout. `None` blocks until data arrives,
    /// which push feeds need between quiet periods.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> DriverResult<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Round-trips a PING; only `+PONG` counts as alive.
    pub fn ping(&mut self) -> DriverResult<()> {
        match self.exec(&[b"PING"])? {
            RespValue::Simple(text) if text == b"PONG" => Ok(()),
            RespValue::Error(message) => Err(classify_error(&message)),
            _ => Err(DriverError::UnexpectedResponse),
        }
    }

    /// Sends QUIT and consumes the connection.
    pub fn quit(mut self) -> DriverResult<()> {
        match self.exec(&[b"QUIT"])? {
            RespValue::Simple(_) => Ok(()),
            RespValue::Error(message) => Err(DriverError::server(&message)),
            _ => Err(DriverError::UnexpectedResponse),
        }
    }

    fn handshake(&mut self, options: &ConnectOptions) -> DriverResult<()> {
        if let Some(password) = options.password.as_deref() {
            let reply = match options.username.as_deref() {
                Some(user) => self.exec(&[b"AUTH", user.as_bytes(), password.as_bytes()])?,
                None => self.exec(&[b"AUTH", password.as_bytes()])?,
            };
            match reply {
                RespValue::Simple(_) => {}
                RespValue::Error(message) => {
                    return Err(DriverError::Auth(String::from_utf8_lossy(&message).into_owned()))
                }
                _ => return Err(DriverError::UnexpectedResponse),
            }
        }

        if options.db != 0 {
            let db = options.db.to_string();
            self.expect_ok(&[b"SELECT", db.as_bytes()])?;
        }

        if let Some(name) = options.client_name.as_deref() {
            self.expect_ok(&[b"CLIENT", b"SETNAME", name.as_bytes()])?;
        }

        self.ping()
    }

    fn expect_ok(&mut self, args: &[&[u8]]) -> DriverResult<()> {
        match self.exec(args)? {
            RespValue::Simple(_) => Ok(()),
            RespValue::Error(message) => Err(classify_error(&message)),
            _ => Err(DriverError::UnexpectedResponse),
        }
    }
}

/// Maps credential-related error replies to `Auth`, everything else to `Server`.
fn classify_error(message: &[u8]) -> DriverError {
    if message.starts_with(b"NOAUTH") || message.starts_with(b"WRONGPASS") {
        DriverError::Auth(String::from_utf8_lossy(message).into_owned())
    } else {
        DriverError::server(message)
    }
}

fn connect_stream(options: &ConnectOptions) -> DriverResult<TcpStream> {
    let mut last_err = None;
    for addr in options.socket_addrs()? {
        let attempt = match options.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                debug!(target: "kvd::connection", %addr, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }
    Err(last_err
        .map(DriverError::from)
        .unwrap_or_else(|| DriverError::InvalidAddress(options.to_string())))
}
