//! ANSI/SGR escape sequence handling
//!
//! This is not a terminal emulator. BBS-style MUD output is a flowing
//! styled text stream, so the only escape family that matters here is SGR
//! (colors and attributes); cursor movement, erase and the rest of the CSI
//! set are deliberately out of scope. Matching the behavior this client
//! was built around, any CSI final letter triggers the same numeric
//! parameter apply as `m` does. Extending non-`m` finals to their real
//! ANSI meaning is an extension point, not something callers may rely on.

pub mod parser;
pub mod style;

pub use parser::{AnsiParser, TextRun};
pub use style::{Attrs, Color, StyleState, PALETTE};
