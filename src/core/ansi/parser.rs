//! Incremental ANSI/SGR stream parser
//!
//! Splits decoded text into styled runs. The server writes escape
//! sequences without any regard for where our reads land, so a sequence
//! may arrive cut in half; the unterminated tail is kept in `pending` and
//! prefixed to the next chunk. Feeding a stream whole or split at any
//! offset yields the same runs.

use super::style::StyleState;

const ESC: char = '\u{1b}';

/// A piece of plain text plus the style in effect when it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: StyleState,
}

/// Incremental scanner. One instance per session; the carry-over buffer
/// makes it restartable only by constructing a new instance.
#[derive(Debug, Default)]
pub struct AnsiParser {
    /// Unterminated escape-sequence prefix from the previous chunk.
    pending: String,
}

impl AnsiParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk of decoded text, updating `style` and returning
    /// the runs it produced, in order.
    pub fn feed(&mut self, chunk: &str, style: &mut StyleState) -> Vec<TextRun> {
        let data = if self.pending.is_empty() {
            chunk.to_string()
        } else {
            let mut carried = std::mem::take(&mut self.pending);
            carried.push_str(chunk);
            carried
        };

        let mut runs = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let Some(off) = data[pos..].find(ESC) else {
                Self::push_run(&mut runs, &data[pos..], style);
                break;
            };
            let esc = pos + off;
            Self::push_run(&mut runs, &data[pos..esc], style);

            // A lone trailing ESC: the next chunk decides whether it opens
            // a CSI, so it must be carried over rather than skipped.
            if esc + 1 >= data.len() {
                self.pending = data[esc..].to_string();
                break;
            }

            // Stray ESC not followed by '[': skip just the marker and keep
            // scanning, so one bad byte does not desynchronize the stream.
            if data.as_bytes()[esc + 1] != b'[' {
                pos = esc + 1;
                continue;
            }

            match data[esc + 2..].find(|c: char| c.is_ascii_alphabetic()) {
                Some(t) => {
                    let term = esc + 2 + t;
                    // Any terminating letter triggers the SGR apply; see
                    // the module docs in `ansi` for why non-'m' finals are
                    // not given their full ANSI meaning.
                    style.apply_sgr(&data[esc + 2..term]);
                    pos = term + 1;
                }
                None => {
                    // Sequence runs off the end of the chunk; retry once
                    // more data arrives. Never emitted as plain text.
                    self.pending = data[esc..].to_string();
                    break;
                }
            }
        }

        runs
    }

    /// True if an unterminated sequence is waiting for more data.
    #[allow(dead_code)]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn push_run(runs: &mut Vec<TextRun>, text: &str, style: &StyleState) {
        if text.is_empty() {
            return;
        }
        // Coalesce with the previous run when the style has not changed in
        // between (happens after a skipped stray ESC).
        if let Some(last) = runs.last_mut() {
            if last.style == *style {
                last.text.push_str(text);
                return;
            }
        }
        runs.push(TextRun {
            text: text.to_string(),
            style: *style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ansi::style::{Attrs, Color};

    fn feed_all(parser: &mut AnsiParser, style: &mut StyleState, chunks: &[&str]) -> Vec<TextRun> {
        let mut runs = Vec::new();
        for chunk in chunks {
            runs.extend(parser.feed(chunk, style));
        }
        runs
    }

    /// Merge adjacent runs that share a style. Splitting plain text across
    /// two feeds necessarily yields two runs, so invariance is judged on
    /// the normalized sequence.
    fn normalize(runs: Vec<TextRun>) -> Vec<TextRun> {
        let mut out: Vec<TextRun> = Vec::new();
        for run in runs {
            match out.last_mut() {
                Some(last) if last.style == run.style => last.text.push_str(&run.text),
                _ => out.push(run),
            }
        }
        out
    }

    fn red() -> StyleState {
        let mut s = StyleState::default();
        s.apply_code(31);
        s
    }

    #[test]
    fn plain_text_passthrough() {
        let mut parser = AnsiParser::new();
        let mut style = StyleState::default();
        let runs = parser.feed("hello world", &mut style);
        assert_eq!(
            runs,
            vec![TextRun {
                text: "hello world".to_string(),
                style: StyleState::default(),
            }]
        );
    }

    #[test]
    fn color_then_reset() {
        // Scenario A from the session contract
        let mut parser = AnsiParser::new();
        let mut style = StyleState::default();
        let runs = parser.feed("\x1b[31mHello\x1b[0m World", &mut style);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "Hello");
        assert_eq!(runs[0].style.fg, Color::dark(1));
        assert_eq!(runs[1].text, " World");
        assert_eq!(runs[1].style, StyleState::default());
    }

    #[test]
    fn sequence_split_mid_params() {
        // Scenario B: "\x1b[3" then "1mHi"
        let mut parser = AnsiParser::new();
        let mut style = StyleState::default();

        let runs = feed_all(&mut parser, &mut style, &["\x1b[3", "1mHi"]);
        assert_eq!(
            runs,
            vec![TextRun {
                text: "Hi".to_string(),
                style: red(),
            }]
        );
        assert!(!parser.has_pending());
    }

    #[test]
    fn split_invariance_at_every_offset() {
        let input = "pre\x1b[1;31mred bold\x1b[0m後面\x1b[44mblue bg";

        let whole = {
            let mut parser = AnsiParser::new();
            let mut style = StyleState::default();
            parser.feed(input, &mut style)
        };

        for split in 0..=input.len() {
            if !input.is_char_boundary(split) {
                continue;
            }
            let mut parser = AnsiParser::new();
            let mut style = StyleState::default();
            let runs = feed_all(&mut parser, &mut style, &[&input[..split], &input[split..]]);
            assert_eq!(
                normalize(runs),
                whole,
                "runs differ when split at byte {}",
                split
            );
        }
    }

    #[test]
    fn pending_survives_many_tiny_chunks() {
        let mut parser = AnsiParser::new();
        let mut style = StyleState::default();

        let mut runs = Vec::new();
        for chunk in ["\x1b", "[", "3", "1", ";", "4", "7", "m", "ok"] {
            runs.extend(parser.feed(chunk, &mut style));
        }
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "ok");
        assert_eq!(runs[0].style.fg, Color::dark(1));
        assert_eq!(runs[0].style.bg, Color::dark(7));
    }

    #[test]
    fn stray_escape_is_skipped() {
        let mut parser = AnsiParser::new();
        let mut style = StyleState::default();
        let runs = parser.feed("ab\x1bcd", &mut style);

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "abcd");
        assert_eq!(runs[0].style, StyleState::default());
    }

    #[test]
    fn trailing_escape_not_emitted() {
        let mut parser = AnsiParser::new();
        let mut style = StyleState::default();

        let runs = parser.feed("text\x1b", &mut style);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "text");
        assert!(parser.has_pending());

        // Turns out to be a stray ESC once the next chunk arrives
        let runs = parser.feed("more", &mut style);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "more");
        assert!(!parser.has_pending());
    }

    #[test]
    fn empty_params_reset() {
        let mut parser = AnsiParser::new();
        let mut style = StyleState::default();
        parser.feed("\x1b[31m", &mut style);
        assert_eq!(style.fg, Color::dark(1));

        parser.feed("\x1b[m", &mut style);
        assert_eq!(style, StyleState::default());
    }

    #[test]
    fn non_sgr_terminator_still_applies_params() {
        // Deliberate simplification: every CSI final letter is treated as a
        // style apply, so ESC[1A reads its parameter as "bold".
        let mut parser = AnsiParser::new();
        let mut style = StyleState::default();
        parser.feed("\x1b[1A", &mut style);
        assert!(style.attrs.contains(Attrs::BOLD));
    }

    #[test]
    fn cumulative_fields_apply_in_order() {
        let mut parser = AnsiParser::new();
        let mut style = StyleState::default();
        let runs = parser.feed("\x1b[1;0mx", &mut style);
        assert_eq!(runs[0].style, StyleState::default());
    }

    #[test]
    fn style_persists_across_feeds() {
        let mut parser = AnsiParser::new();
        let mut style = StyleState::default();

        parser.feed("\x1b[31m", &mut style);
        let runs = parser.feed("still red", &mut style);
        assert_eq!(runs[0].style, red());
    }

    #[test]
    fn double_byte_text_between_sequences() {
        let mut parser = AnsiParser::new();
        let mut style = StyleState::default();
        let runs = parser.feed("\x1b[33m你好\x1b[0m世界", &mut style);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "你好");
        assert_eq!(runs[0].style.fg, Color::dark(3));
        assert_eq!(runs[1].text, "世界");
    }
}
