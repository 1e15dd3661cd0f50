//! SGR style state
//!
//! This module defines the 16-color palette and the mutable style state
//! that SGR parameters act on. The state is a small Copy value so the
//! parser can snapshot it into every emitted run.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct Attrs: u8 {
        const BOLD      = 0b0001;
        const DIM       = 0b0010;
        const UNDERLINE = 0b0100;
        const REVERSED  = 0b1000;
    }
}

/// One of the 16 ANSI palette entries (0-7 dark, 8-15 bright).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8);

/// Fixed palette, VGA-style values. Dark row first, bright row second.
pub const PALETTE: [(u8, u8, u8); 16] = [
    (0, 0, 0),       // black
    (170, 0, 0),     // red
    (0, 170, 0),     // green
    (170, 85, 0),    // yellow/brown
    (0, 0, 170),     // blue
    (170, 0, 170),   // magenta
    (0, 170, 170),   // cyan
    (170, 170, 170), // white/gray
    (85, 85, 85),    // bright black
    (255, 85, 85),   // bright red
    (85, 255, 85),   // bright green
    (255, 255, 85),  // bright yellow
    (85, 85, 255),   // bright blue
    (255, 85, 255),  // bright magenta
    (85, 255, 255),  // bright cyan
    (255, 255, 255), // bright white
];

impl Color {
    /// Session-start defaults: bright white on black.
    pub const DEFAULT_FG: Color = Color(15);
    pub const DEFAULT_BG: Color = Color(0);

    /// Dark palette entry for SGR 30-37 / 40-47.
    pub fn dark(n: u8) -> Color {
        Color(n & 7)
    }

    /// Bright palette entry for SGR 90-97 / 100-107.
    pub fn bright(n: u8) -> Color {
        Color((n & 7) + 8)
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        PALETTE[(self.0 & 15) as usize]
    }
}

/// Current text style. Copied into every emitted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleState {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attrs,
}

impl Default for StyleState {
    fn default() -> Self {
        Self {
            fg: Color::DEFAULT_FG,
            bg: Color::DEFAULT_BG,
            attrs: Attrs::empty(),
        }
    }
}

impl StyleState {
    /// Reset to default fg/bg with all attributes cleared.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply one numeric SGR parameter. Unknown codes are ignored.
    pub fn apply_code(&mut self, code: i32) {
        match code {
            0 => self.reset(),
            1 => self.attrs |= Attrs::BOLD,
            2 => self.attrs |= Attrs::DIM,
            4 => self.attrs |= Attrs::UNDERLINE,
            7 => {
                // Reverse video is a logical swap, so a second 7 restores
                // the original pair.
                std::mem::swap(&mut self.fg, &mut self.bg);
                self.attrs.toggle(Attrs::REVERSED);
            }
            30..=37 => self.fg = Color::dark((code - 30) as u8),
            40..=47 => self.bg = Color::dark((code - 40) as u8),
            90..=97 => self.fg = Color::bright((code - 90) as u8),
            100..=107 => self.bg = Color::bright((code - 100) as u8),
            _ => {}
        }
    }

    /// Apply an SGR parameter string such as `"1;33"` or `"2;37;0"`.
    ///
    /// An empty string is equivalent to `"0"`. Fields are applied in order,
    /// so a later field overrides an earlier one; non-numeric fields are
    /// skipped rather than treated as errors.
    pub fn apply_sgr(&mut self, params: &str) {
        if params.is_empty() || params == "0" {
            self.reset();
            return;
        }

        for field in params.split(';') {
            if let Ok(code) = field.trim().parse::<i32>() {
                self.apply_code(code);
            }
        }
    }
}
