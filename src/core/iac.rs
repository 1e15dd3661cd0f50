//! Telnet IAC command filtering
//!
//! MUD servers interleave telnet option negotiation (IAC sequences) with
//! the text stream. None of it is interesting to a display-only client,
//! but the bytes must not reach the Big5 decoder: 0xFF is never valid
//! Big5 and a WILL/DO option byte can alias a printable character. Like
//! the escape-sequence parser, an IAC sequence cut off by a read boundary
//! is carried over to the next chunk rather than dropped.

const IAC: u8 = 255;
const WILL: u8 = 251;
const WONT: u8 = 252;
const DO: u8 = 253;
const DONT: u8 = 254;
const SB: u8 = 250;
const SE: u8 = 240;

/// Strips IAC command sequences from the inbound byte stream.
#[derive(Debug, Default)]
pub struct IacFilter {
    /// Partial IAC sequence from the previous chunk.
    pending: Vec<u8>,
}

impl IacFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove telnet commands from `chunk`, returning the remaining text
    /// bytes. An escaped `IAC IAC` becomes a single literal 0xFF.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<u8> {
        let data = if self.pending.is_empty() {
            chunk.to_vec()
        } else {
            let mut carried = std::mem::take(&mut self.pending);
            carried.extend_from_slice(chunk);
            carried
        };

        let mut out = Vec::with_capacity(data.len());
        let mut i = 0;

        while i < data.len() {
            if data[i] != IAC {
                out.push(data[i]);
                i += 1;
                continue;
            }

            if i + 1 >= data.len() {
                // Lone IAC at chunk end; the command byte is still in flight
                self.pending = data[i..].to_vec();
                break;
            }

            match data[i + 1] {
                WILL | WONT | DO | DONT => {
                    if i + 2 >= data.len() {
                        self.pending = data[i..].to_vec();
                        break;
                    }
                    i += 3;
                }
                SB => {
                    // Subnegotiation runs until IAC SE
                    match Self::find_se(&data[i + 2..]) {
                        Some(end) => i += 2 + end,
                        None => {
                            self.pending = data[i..].to_vec();
                            break;
                        }
                    }
                }
                IAC => {
                    out.push(IAC);
                    i += 2;
                }
                _ => {
                    // Two-byte command (NOP, GA, ...)
                    i += 2;
                }
            }
        }

        out
    }

    /// Offset just past the `IAC SE` terminator, if present.
    fn find_se(data: &[u8]) -> Option<usize> {
        let mut i = 0;
        while i + 1 < data.len() {
            if data[i] == IAC && data[i + 1] == SE {
                return Some(i + 2);
            }
            i += 1;
        }
        None
    }

    #[allow(dead_code)]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
