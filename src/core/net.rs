//! Telnet socket connection
//!
//! This module provides the raw TCP leg of a session: resolve the host,
//! connect to the first candidate address that answers, then switch the
//! socket to non-blocking mode for the polling receive loop. Reads and
//! writes go through independently cloned handles so the reader thread
//! and the sending thread never contend for one descriptor.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Bounded size of a single receive.
pub const RECV_BUFFER_SIZE: usize = 4096;

/// Delay between polls when the socket has nothing to read, and between
/// retries of a would-block send.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Send retry budget before a would-block result is handed to the caller.
const SEND_RETRIES: u32 = 50;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("Failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Could not connect to {host}:{port}")]
    ConnectFailed { host: String, port: u16 },

    #[error("Socket setup failed: {0}")]
    Setup(#[source] io::Error),

    #[error("Send would block")]
    WouldBlock,

    #[error("Send failed: {0}")]
    Send(#[source] io::Error),

    #[error("Receive failed: {0}")]
    Recv(#[source] io::Error),

    #[error("Not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, NetError>;

/// Result of one non-blocking read attempt.
#[derive(Debug)]
pub enum RecvResult {
    /// Bytes were read into the buffer.
    Data(usize),
    /// Nothing available right now; poll again after a delay.
    WouldBlock,
    /// The remote host closed the connection.
    Closed,
}

/// One connected telnet socket.
pub struct TelnetConnection {
    stream: TcpStream,
}

impl TelnetConnection {
    /// Resolve `host` and connect, trying candidate addresses in order
    /// until one succeeds. The connect itself is blocking; the socket is
    /// switched to non-blocking before any send or receive happens.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let addrs = (host, port).to_socket_addrs().map_err(|e| NetError::Resolve {
            host: host.to_string(),
            port,
            source: e,
        })?;

        let mut stream = None;
        for addr in addrs {
            debug!("trying {}", addr);
            match TcpStream::connect(addr) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => debug!("connect to {} failed: {}", addr, e),
            }
        }

        let stream = stream.ok_or_else(|| NetError::ConnectFailed {
            host: host.to_string(),
            port,
        })?;

        stream.set_nonblocking(true).map_err(NetError::Setup)?;
        Ok(Self { stream })
    }

    /// Clone the underlying handle for the reader thread. Reads and writes
    /// are independent socket operations, so the two handles need no lock.
    pub fn reader_handle(&self) -> Result<TelnetConnection> {
        let stream = self.stream.try_clone().map_err(NetError::Setup)?;
        Ok(TelnetConnection { stream })
    }

    /// One bounded, non-blocking read attempt.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<RecvResult> {
        match self.stream.read(buf) {
            Ok(0) => Ok(RecvResult::Closed),
            Ok(n) => Ok(RecvResult::Data(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(RecvResult::WouldBlock),
            Err(e) => Err(NetError::Recv(e)),
        }
    }

    /// Write all of `data`, retrying briefly on a would-block result so a
    /// line is not silently dropped. If the socket stays unwritable past
    /// the retry budget, `NetError::WouldBlock` is returned and the caller
    /// decides whether to retry.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut written = 0;
        let mut retries = 0;

        while written < data.len() {
            match self.stream.write(&data[written..]) {
                Ok(n) => {
                    written += n;
                    retries = 0;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    retries += 1;
                    if retries > SEND_RETRIES {
                        return Err(NetError::WouldBlock);
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(NetError::Send(e)),
            }
        }

        Ok(())
    }

    /// Shut down both directions and release the socket.
    pub fn close(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
