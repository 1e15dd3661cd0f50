//! Session management
//!
//! A session owns the telnet connection, the reader thread and the
//! inbound pipeline (IAC filter -> Big5 decode -> ANSI parse). The reader
//! thread only moves raw bytes; every piece of mutable parse/style state
//! is touched on the consuming thread, inside `process_output`, so runs
//! always carry an accurate style snapshot in emission order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use super::ansi::{AnsiParser, StyleState, TextRun};
use super::encoding;
use super::iac::IacFilter;
use super::net::{NetError, RecvResult, TelnetConnection, POLL_INTERVAL, RECV_BUFFER_SIZE};

/// Display-side consumer of session output.
pub trait OutputSink {
    /// A styled run of text from the remote host.
    fn on_run(&mut self, run: &TextRun);
    /// A connection-lifecycle message (closed, receive error, ...).
    fn on_notice(&mut self, text: &str);
}

/// Events the reader thread hands to the consuming thread.
#[derive(Debug)]
enum SessionEvent {
    /// Raw bytes from the socket.
    Data(Vec<u8>),
    /// Remote host closed the connection. A normal ending, not an error.
    Closed,
    /// Fatal receive error, preformatted for the sink.
    Error(String),
}

/// One telnet session: connection, reader thread and parse pipeline.
pub struct Session {
    conn: Option<TelnetConnection>,
    running: Arc<AtomicBool>,
    reader_thread: Option<JoinHandle<()>>,
    event_rx: Option<Receiver<SessionEvent>>,
    iac: IacFilter,
    parser: AnsiParser,
    style: StyleState,
}

impl Session {
    pub fn new() -> Self {
        Self {
            conn: None,
            running: Arc::new(AtomicBool::new(false)),
            reader_thread: None,
            event_rx: None,
            iac: IacFilter::new(),
            parser: AnsiParser::new(),
            style: StyleState::default(),
        }
    }

    /// Connect to `host:port` and spawn the reader thread.
    pub fn start(&mut self, host: &str, port: u16) -> Result<(), NetError> {
        let conn = TelnetConnection::connect(host, port)?;
        let mut reader = conn.reader_handle()?;
        self.conn = Some(conn);
        self.running.store(true, Ordering::SeqCst);
        info!("connected to {}:{}", host, port);

        let (tx, rx) = mpsc::channel::<SessionEvent>();
        self.event_rx = Some(rx);

        let running = self.running.clone();
        let reader_thread = thread::spawn(move || {
            let mut buffer = vec![0u8; RECV_BUFFER_SIZE];

            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                match reader.recv(&mut buffer) {
                    Ok(RecvResult::Data(n)) => {
                        if tx.send(SessionEvent::Data(buffer[..n].to_vec())).is_err() {
                            running.store(false, Ordering::SeqCst);
                            break;
                        }
                    }
                    Ok(RecvResult::Closed) => {
                        let _ = tx.send(SessionEvent::Closed);
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                    Ok(RecvResult::WouldBlock) => {
                        // Nothing to read; bound CPU with a short sleep
                        thread::sleep(POLL_INTERVAL);
                    }
                    Err(e) => {
                        let _ = tx.send(SessionEvent::Error(format!("Receive error: {}", e)));
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        });

        self.reader_thread = Some(reader_thread);
        Ok(())
    }

    /// True while the reader loop is alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Drain pending reader events and forward runs/notices to the sink.
    ///
    /// Returns whether anything was processed. After a close or error
    /// event has been delivered, no further runs are processed.
    pub fn process_output(&mut self, sink: &mut dyn OutputSink) -> bool {
        let mut events = Vec::new();

        if let Some(rx) = &self.event_rx {
            loop {
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        }

        let processed = !events.is_empty();
        for event in events {
            match event {
                SessionEvent::Data(bytes) => {
                    let text_bytes = self.iac.feed(&bytes);
                    let decoded = encoding::decode(&text_bytes);
                    for run in self.parser.feed(decoded.text(), &mut self.style) {
                        sink.on_run(&run);
                    }
                }
                SessionEvent::Closed => {
                    sink.on_notice("Connection closed by remote host.");
                    self.teardown();
                    break;
                }
                SessionEvent::Error(msg) => {
                    sink.on_notice(&msg);
                    self.teardown();
                    break;
                }
            }
        }

        processed
    }

    /// Encode a command line and send it, CR+LF terminated. An empty line
    /// is valid and sent. A would-block result is handed back non-fatally;
    /// any other send error stops the session.
    pub fn send_line(&mut self, line: &str) -> Result<(), NetError> {
        let conn = self.conn.as_mut().ok_or(NetError::NotConnected)?;

        let mut bytes = encoding::encode(line).into_bytes();
        bytes.extend_from_slice(b"\r\n");
        debug!("sending {} bytes", bytes.len());

        match conn.send(&bytes) {
            Ok(()) => Ok(()),
            Err(NetError::WouldBlock) => Err(NetError::WouldBlock),
            Err(e) => {
                self.teardown();
                Err(e)
            }
        }
    }

    /// Cooperative shutdown: clear the running flag, join the reader, then
    /// release the socket.
    pub fn stop(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        // The reader observes the flag within one poll interval; join it
        // before the socket goes away.
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }

        if let Some(conn) = self.conn.take() {
            conn.close();
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ansi::Color;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct RecordingSink {
        runs: Vec<TextRun>,
        notices: Vec<String>,
    }

    impl OutputSink for RecordingSink {
        fn on_run(&mut self, run: &TextRun) {
            self.runs.push(run.clone());
        }

        fn on_notice(&mut self, text: &str) {
            self.notices.push(text.to_string());
        }
    }

    /// Pump the session until `done` or the deadline passes.
    fn pump_until(
        session: &mut Session,
        sink: &mut RecordingSink,
        mut done: impl FnMut(&RecordingSink) -> bool,
    ) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(sink) {
            assert!(Instant::now() < deadline, "timed out waiting for output");
            session.process_output(sink);
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn styled_output_reaches_sink() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(b"\x1b[31mHello\x1b[0m World").unwrap();
            // Hold the socket open until the client has read everything
            std::thread::sleep(Duration::from_millis(300));
        });

        let mut session = Session::new();
        session.start("127.0.0.1", addr.port()).unwrap();

        let mut sink = RecordingSink::default();
        pump_until(&mut session, &mut sink, |s| {
            s.runs.iter().map(|r| r.text.len()).sum::<usize>() >= 11
        });

        let text: String = sink.runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(text, "Hello World");
        assert_eq!(sink.runs[0].style.fg, Color::dark(1));
        assert_eq!(sink.runs.last().unwrap().style, StyleState::default());

        session.stop();
        server.join().unwrap();
    }

    #[test]
    fn remote_close_emits_one_notice() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(b"bye").unwrap();
            // Remote closes; client must transition to closed
        });

        let mut session = Session::new();
        session.start("127.0.0.1", addr.port()).unwrap();
        server.join().unwrap();

        let mut sink = RecordingSink::default();
        pump_until(&mut session, &mut sink, |s| !s.notices.is_empty());

        // Keep pumping; nothing further may arrive
        for _ in 0..10 {
            session.process_output(&mut sink);
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(sink.notices.len(), 1);
        assert!(sink.notices[0].contains("closed"));
        assert!(!session.is_running());

        let text: String = sink.runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(text, "bye");
    }

    #[test]
    fn sent_lines_are_big5_with_crlf() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 64];
            loop {
                match sock.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    Err(_) => break,
                }
            }
            buf
        });

        let mut session = Session::new();
        session.start("127.0.0.1", addr.port()).unwrap();

        session.send_line("look 你好").unwrap();
        session.send_line("").unwrap();
        session.stop();

        let wire = server.join().unwrap();
        let mut expected = b"look ".to_vec();
        expected.extend_from_slice(&[0xa7, 0x41, 0xa6, 0x6e]); // 你好 in Big5
        expected.extend_from_slice(b"\r\n\r\n");
        assert_eq!(wire, expected);
    }

    #[test]
    fn iac_negotiation_is_invisible() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            // IAC WILL ECHO interleaved with text
            sock.write_all(&[255, 251, 1, b'o', b'k']).unwrap();
            std::thread::sleep(Duration::from_millis(300));
        });

        let mut session = Session::new();
        session.start("127.0.0.1", addr.port()).unwrap();

        let mut sink = RecordingSink::default();
        pump_until(&mut session, &mut sink, |s| !s.runs.is_empty());

        let text: String = sink.runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(text, "ok");

        session.stop();
        server.join().unwrap();
    }

    #[test]
    fn send_without_connection_fails() {
        let mut session = Session::new();
        assert!(matches!(session.send_line("hi"), Err(NetError::NotConnected)));
    }
}
