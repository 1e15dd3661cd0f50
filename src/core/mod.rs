//! Core protocol components.
//!
//! This module contains the protocol-processing logic of the client:
//!
//! - **net**: non-blocking TCP connection to the telnet server
//! - **iac**: telnet IAC command filtering
//! - **encoding**: Big5 <-> UTF-8 conversion with best-effort fallback
//! - **ansi**: SGR escape-sequence parsing into styled text runs
//! - **session**: high-level session combining connection + pipeline
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── TelnetConnection (socket I/O, reader thread)
//! └── inbound pipeline
//!     ├── IacFilter   (strip telnet commands)
//!     ├── encoding    (Big5 -> UTF-8)
//!     └── AnsiParser  (escape sequences -> styled runs)
//! ```

pub mod ansi;
pub mod encoding;
pub mod iac;
pub mod net;
pub mod session;
