//! Terminal renderer using crossterm
//!
//! Writes styled runs straight into the scrolling output stream. The
//! remote side drives layout with its own line breaks, so no cursor
//! addressing happens here; this is a flowing-text renderer, not a
//! screen-oriented one.

use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};

use crate::core::ansi::{Attrs, Color, TextRun};
use crate::core::session::OutputSink;

fn to_crossterm(color: Color) -> crossterm::style::Color {
    let (r, g, b) = color.rgb();
    crossterm::style::Color::Rgb { r, g, b }
}

/// Renders runs and notices to stdout.
pub struct StreamRenderer {
    stdout: io::Stdout,
}

impl StreamRenderer {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }

    fn write_run(&mut self, run: &TextRun) -> io::Result<()> {
        let style = &run.style;

        queue!(self.stdout, SetAttribute(Attribute::Reset))?;
        if style.attrs.contains(Attrs::BOLD) {
            queue!(self.stdout, SetAttribute(Attribute::Bold))?;
        }
        if style.attrs.contains(Attrs::DIM) {
            queue!(self.stdout, SetAttribute(Attribute::Dim))?;
        }
        if style.attrs.contains(Attrs::UNDERLINE) {
            queue!(self.stdout, SetAttribute(Attribute::Underlined))?;
        }
        // REVERSED is already baked into fg/bg by the style state, so no
        // Attribute::Reverse here; applying both would reverse twice.

        queue!(self.stdout, SetForegroundColor(to_crossterm(style.fg)))?;
        if style.bg != Color::DEFAULT_BG {
            queue!(self.stdout, SetBackgroundColor(to_crossterm(style.bg)))?;
        }

        queue!(self.stdout, Print(&run.text), ResetColor)?;
        queue!(self.stdout, SetAttribute(Attribute::Reset))?;
        self.stdout.flush()
    }

    fn write_notice(&mut self, text: &str) -> io::Result<()> {
        queue!(
            self.stdout,
            SetAttribute(Attribute::Reset),
            SetAttribute(Attribute::Dim),
            Print("\r\n*** "),
            Print(text),
            Print("\r\n"),
            SetAttribute(Attribute::Reset)
        )?;
        self.stdout.flush()
    }
}

impl Default for StreamRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for StreamRenderer {
    fn on_run(&mut self, run: &TextRun) {
        // Nowhere sensible to report a failed stdout write
        let _ = self.write_run(run);
    }

    fn on_notice(&mut self, text: &str) {
        let _ = self.write_notice(text);
    }
}
