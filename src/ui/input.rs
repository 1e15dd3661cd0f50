//! Stdin line reader
//!
//! Reading stdin blocks, so a dedicated thread turns lines into channel
//! messages the main loop can poll alongside session output. One message
//! per line; an empty line is a valid command and is forwarded.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// Non-blocking access to user-entered command lines.
pub struct InputReader {
    line_rx: Receiver<String>,
    eof: bool,
}

impl InputReader {
    /// Spawn the stdin reader thread.
    ///
    /// The thread parks on a blocking read and cannot be joined on
    /// shutdown; it dies with the process, which is fine for a reader
    /// that owns no resources beyond stdin.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<String>();

        thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self {
            line_rx: rx,
            eof: false,
        }
    }

    /// Next pending line, if any. Returns `None` both when no input is
    /// waiting and after end-of-input; check `is_eof` to tell them apart.
    pub fn try_read_line(&mut self) -> Option<String> {
        match self.line_rx.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.eof = true;
                None
            }
        }
    }

    /// True once stdin has been closed.
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}
