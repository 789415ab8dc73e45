#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use kvd_driver::ConnectOptions;

/// One scripted server action.
pub enum Step {
    /// Read one command, record it, write these bytes back.
    Reply(Vec<u8>),
    /// Write these bytes without reading anything first.
    Push(Vec<u8>),
    /// Stay silent for a while.
    Pause(Duration),
}

pub type Command = Vec<String>;

/// In-process server that plays one script per accepted connection, in
/// order, and records every command it reads.
pub struct ScriptedServer {
    port: u16,
    thread: JoinHandle<Vec<Vec<Command>>>,
}

impl ScriptedServer {
    pub fn spawn(sessions: Vec<Vec<Step>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let thread = thread::spawn(move || {
            let mut recorded = Vec::with_capacity(sessions.len());
            for script in sessions {
                let (stream, _) = listener.accept().expect("accept");
                recorded.push(play(stream, script));
            }
            recorded
        });

        ScriptedServer { port, thread }
    }

    /// Single-connection shorthand.
    pub fn single(script: Vec<Step>) -> Self {
        Self::spawn(vec![script])
    }

    pub fn options(&self) -> ConnectOptions {
        ConnectOptions::new("127.0.0.1", self.port).with_timeout(Duration::from_secs(2))
    }

    /// Waits for every script to finish and returns the commands per connection.
    pub fn finish(self) -> Vec<Vec<Command>> {
        self.thread.join().expect("server thread")
    }
}

fn play(mut stream: TcpStream, script: Vec<Step>) -> Vec<Command> {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut reader = BufReader::new(stream.try_clone().expect("clone"));
    let mut commands = Vec::new();
    for step in script {
        match step {
            Step::Reply(bytes) => match read_command(&mut reader) {
                Ok(args) => {
                    commands.push(
                        args.iter()
                            .map(|arg| String::from_utf8_lossy(arg).into_owned())
                            .collect(),
                    );
                    let _ = stream.write_all(&bytes);
                    let _ = stream.flush();
                }
                Err(_) => break,
            },
            Step::Push(bytes) => {
                let _ = stream.write_all(&bytes);
                let _ = stream.flush();
            }
            Step::Pause(duration) => thread::sleep(duration),
        }
    }
    commands
}

fn read_command(reader: &mut BufReader<TcpStream>) -> std::io::Result<Vec<Vec<u8>>> {
    let mut line = Vec::new();
    read_line(reader, &mut line)?.ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?;
    if line.first() != Some(&b'*') {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected array"));
    }
    let count = parse_usize(&line[1..])?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        read_line(reader, &mut line)?.ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?;
        if line.first() != Some(&b'$') {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected bulk"));
        }
        let len = parse_usize(&line[1..])?;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf)?;
        if crlf != [b'\r', b'\n'] {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "missing crlf"));
        }
        args.push(data);
    }
    Ok(args)
}

fn read_line(reader: &mut BufReader<TcpStream>, buf: &mut Vec<u8>) -> std::io::Result<Option<()>> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Ok(None);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid line"));
    }
    buf.truncate(buf.len() - 2);
    Ok(Some(()))
}

fn parse_usize(data: &[u8]) -> std::io::Result<usize> {
    if data.is_empty() {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "empty"));
    }
    let mut value = 0usize;
    for &b in data {
        if !b.is_ascii_digit() {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "digit"));
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as usize);
    }
    Ok(value)
}

pub fn reply(bytes: Vec<u8>) -> Step {
    Step::Reply(bytes)
}

pub fn push(bytes: Vec<u8>) -> Step {
    Step::Push(bytes)
}

pub fn simple(msg: &str) -> Vec<u8> {
    format!("+{}\r\n", msg).into_bytes()
}

pub fn error(msg: &str) -> Vec<u8> {
    format!("-{}\r\n", msg).into_bytes()
}

pub fn integer(value: i64) -> Vec<u8> {
    format!(":{}\r\n", value).into_bytes()
}

pub fn bulk(data: &str) -> Vec<u8> {
    format!("${}\r\n{}\r\n", data.len(), data).into_bytes()
}

pub fn null() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

pub fn array(items: &[Vec<u8>]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", items.len()).into_bytes();
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

pub fn pause(millis: u64) -> Step {
    Step::Pause(Duration::from_millis(millis))
}

/// The PONG every session needs for its handshake.
pub fn pong() -> Step {
    reply(simple("PONG"))
}

/// Builds a recorded command for comparisons.
pub fn cmd(parts: &[&str]) -> Command {
    parts.iter().map(|part| part.to_string()).collect()
}
