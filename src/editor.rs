// editor.rs

use std::io::{self, Read, Write};

use bytes::{BufMut, BytesMut};
use tracing::debug;

use crate::history::{History, Newer};

const ESC: u8 = 0x1b;
const DEL: u8 = 0x7f;

const ERASE: &[u8] = b"\x08 \x08";
const CLEAR_LINE: &[u8] = b"\r\x1b[K";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(u8),
    Backspace,
    Enter,
    Up,
    Down,
    Ignored,
}

/// Bounded line buffer holding whole UTF-8 characters.
///
/// A character that would not fit in `capacity` is dropped together with its
/// continuation bytes.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    bytes: BytesMut,
    capacity: usize,
    // continuation bytes still owed by a dropped character
    skip: usize,
}

/// Length of the UTF-8 sequence introduced by `lead`; 1 for stray bytes.
fn sequence_len(lead: u8) -> usize {
    match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

impl EditBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
            capacity,
            skip: 0,
        }
    }

    pub fn push(&mut self, byte: u8) -> bool {
        let continuation = byte & 0xc0 == 0x80;
        if continuation && self.skip > 0 {
            self.skip -= 1;
            return false;
        }
        self.skip = 0;
        let needed = if continuation { 1 } else { sequence_len(byte) };
        if self.bytes.len() + needed > self.capacity {
            self.skip = needed - 1;
            return false;
        }
        self.bytes.put_u8(byte);
        true
    }

    /// Removes the last UTF-8 character, continuation bytes included.
    pub fn pop_char(&mut self) -> bool {
        self.skip = 0;
        if self.bytes.is_empty() {
            return false;
        }
        let cut = self
            .bytes
            .iter()
            .rposition(|&b| b & 0xc0 != 0x80)
            .unwrap_or(0);
        self.bytes.truncate(cut);
        true
    }

    /// Loads `line`, cut back to the last character boundary within capacity.
    pub fn set(&mut self, line: &str) {
        let mut end = line.len().min(self.capacity);
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        self.clear();
        self.bytes.extend_from_slice(&line.as_bytes()[..end]);
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.skip = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_line(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Raw-mode line editor.
///
/// Reads one byte at a time from `input` and does its own echo to `output`,
/// since the terminal's echo is off. Cursor-up and cursor-down walk the
/// [`History`] passed to [`read_line`](Self::read_line).
pub struct LineEditor<R, W> {
    input: R,
    output: W,
    buffer: EditBuffer,
}

impl<R: Read, W: Write> LineEditor<R, W> {
    pub fn new(input: R, output: W, max_line_len: usize) -> Self {
        Self {
            input,
            output,
            buffer: EditBuffer::new(max_line_len),
        }
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Prints `prompt` on a new line and edits until Enter on a non-empty
    /// buffer. Returns `None` once input is exhausted.
    pub fn read_line(&mut self, prompt: &str, history: &mut History) -> io::Result<Option<String>> {
        self.buffer.clear();
        write!(self.output, "\n{}", prompt)?;
        self.output.flush()?;

        loop {
            let Some(key) = self.read_key()? else {
                return Ok(None);
            };
            match key {
                Key::Char(byte) => {
                    if self.buffer.push(byte) {
                        self.output.write_all(&[byte])?;
                    }
                }
                Key::Backspace => {
                    if self.buffer.pop_char() {
                        self.output.write_all(ERASE)?;
                    }
                }
                Key::Enter => {
                    if !self.buffer.is_empty() {
                        self.output.write_all(b"\n")?;
                        self.output.flush()?;
                        return Ok(Some(self.buffer.to_line()));
                    }
                }
                Key::Up => {
                    if let Some(entry) = history.older() {
                        self.buffer.set(entry);
                        self.redraw(prompt)?;
                    }
                }
                Key::Down => match history.newer() {
                    Newer::Entry(entry) => {
                        self.buffer.set(entry);
                        self.redraw(prompt)?;
                    }
                    Newer::Fresh => {
                        self.buffer.clear();
                        self.redraw(prompt)?;
                    }
                    Newer::Unchanged => {}
                },
                Key::Ignored => {}
            }
            self.output.flush()?;
        }
    }

    fn redraw(&mut self, prompt: &str) -> io::Result<()> {
        self.output.write_all(CLEAR_LINE)?;
        self.output.write_all(prompt.as_bytes())?;
        self.output.write_all(self.buffer.as_bytes())
    }

    fn read_key(&mut self) -> io::Result<Option<Key>> {
        let Some(byte) = self.read_byte()? else {
            return Ok(None);
        };
        let key = match byte {
            b'\n' | b'\r' => Key::Enter,
            DEL => Key::Backspace,
            ESC => match self.read_escape()? {
                Some(key) => key,
                None => return Ok(None),
            },
            b if b >= 0x20 => Key::Char(b),
            _ => Key::Ignored,
        };
        Ok(Some(key))
    }

    /// Consumes the rest of an escape sequence. CSI sequences run through
    /// their parameter and intermediate bytes up to the final byte; only a
    /// bare `ESC [ A` or `ESC [ B` maps to a key.
    fn read_escape(&mut self) -> io::Result<Option<Key>> {
        let Some(first) = self.read_byte()? else {
            return Ok(None);
        };
        match first {
            b'[' => {
                let mut bare = true;
                loop {
                    let Some(byte) = self.read_byte()? else {
                        return Ok(None);
                    };
                    match byte {
                        0x20..=0x3f => bare = false,
                        b'A' if bare => return Ok(Some(Key::Up)),
                        b'B' if bare => return Ok(Some(Key::Down)),
                        0x40..=0x7e => {
                            debug!(final_byte = byte, "ignored escape sequence");
                            return Ok(Some(Key::Ignored));
                        }
                        _ => return Ok(Some(Key::Ignored)),
                    }
                }
            }
            // SS3: one more byte names the key
            b'O' => Ok(self.read_byte()?.map(|_| Key::Ignored)),
            _ => Ok(Some(Key::Ignored)),
        }
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
