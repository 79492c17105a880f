//! Byte-at-a-time line assembly.
//!
//! | byte                 | effect                                      |
//! |----------------------|---------------------------------------------|
//! | `0x20..=0x7E`        | append if room, otherwise dropped           |
//! | `\n`, `\r`           | emit the line if non-empty, then reset      |
//! | `\b`, `0x7F`         | remove the last byte, if any                |
//! | anything else        | ignored                                     |
//!
//! At most [`LINE_CAPACITY`] − 1 bytes are kept. The buffer is always
//! empty or a printable-ASCII prefix of the pending line, so it is valid
//! UTF-8 by construction.

pub const LINE_CAPACITY: usize = 128;
const MAX_LINE: usize = LINE_CAPACITY - 1;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;

/// A completed console line.
pub type Line = heapless::String<LINE_CAPACITY>;

pub struct LineBuffer {
    bytes: [u8; LINE_CAPACITY],
    cursor: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; LINE_CAPACITY],
            cursor: 0,
        }
    }

    /// Feed one byte. Returns the completed line on a terminator.
    pub fn feed(&mut self, byte: u8) -> Option<Line> {
        match byte {
            b'\n' | b'\r' => {
                if self.cursor == 0 {
                    return None;
                }
                let line = self.as_line();
                self.cursor = 0;
                line
            }
            0x20..=0x7E => {
                if self.cursor < MAX_LINE {
                    self.bytes[self.cursor] = byte;
                    self.cursor += 1;
                }
                None
            }
            BACKSPACE | DELETE => {
                self.cursor = self.cursor.saturating_sub(1);
                None
            }
            _ => None,
        }
    }

    /// Pending bytes (not yet terminated).
    pub fn pending(&self) -> &[u8] {
        &self.bytes[..self.cursor]
    }

    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    fn as_line(&self) -> Option<Line> {
        let text = core::str::from_utf8(self.pending()).ok()?;
        let mut line = Line::new();
        line.push_str(text).ok()?;
        Some(line)
    }
}
