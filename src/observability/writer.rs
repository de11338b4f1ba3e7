//! Output writers for help and usage text.
//!
//! Three renderings exist: the plain default, a "fabulous" rainbow writer and
//! its true-color variant. [`OutputWriter::select`] picks one per invocation.

use colored::Color;
use std::f64::consts::PI;
use std::io::{self, Write};

const RAINBOW: [Color; 6] = [
    Color::Red,
    Color::Yellow,
    Color::Green,
    Color::Cyan,
    Color::Blue,
    Color::Magenta,
];

const TRUECOLOR_FREQUENCY: f64 = 0.1;

/// Which writer renders command output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputWriter {
    /// Text is written as is
    Default,
    /// Rainbow using the 16 basic terminal colors
    Fabulous,
    /// Smooth 24-bit rainbow
    FabulousTrueColor,
}

impl OutputWriter {
    /// Pick the writer: the true-color signal wins over the fabulous flag.
    pub fn select(fabulous: bool, truecolor: bool) -> Self {
        if truecolor {
            OutputWriter::FabulousTrueColor
        } else if fabulous {
            OutputWriter::Fabulous
        } else {
            OutputWriter::Default
        }
    }

    /// Wrap `inner` so everything written through it is rendered by this writer.
    pub fn wrap<'a>(self, inner: &'a mut dyn Write) -> Box<dyn Write + 'a> {
        match self {
            OutputWriter::Default => Box::new(inner),
            OutputWriter::Fabulous => Box::new(FabulousWriter::new(inner, false)),
            OutputWriter::FabulousTrueColor => Box::new(FabulousWriter::new(inner, true)),
        }
    }
}

/// Color `text` as a rainbow, starting `offset` characters into the cycle.
///
/// Whitespace is passed through and does not advance the cycle. Escape
/// sequences are always emitted, whether or not the output is a terminal.
pub fn rainbow(text: &str, offset: usize, truecolor: bool) -> String {
    let mut out = String::with_capacity(text.len() * 4);
    let mut position = offset;

    for ch in text.chars() {
        if ch.is_whitespace() {
            out.push(ch);
            continue;
        }

        let color = if truecolor {
            let (r, g, b) = truecolor_at(position);
            Color::TrueColor { r, g, b }
        } else {
            RAINBOW[position % RAINBOW.len()]
        };
        out.push_str(&format!("\x1b[{}m{}\x1b[0m", color.to_fg_str(), ch));
        position += 1;
    }

    out
}

fn truecolor_at(position: usize) -> (u8, u8, u8) {
    let phase = TRUECOLOR_FREQUENCY * position as f64;
    let channel = |shift: f64| ((phase + shift).sin() * 127.0 + 128.0) as u8;
    (channel(0.0), channel(2.0 * PI / 3.0), channel(4.0 * PI / 3.0))
}

/// Writer that paints everything passing through it as a rainbow.
pub struct FabulousWriter<W: Write> {
    inner: W,
    truecolor: bool,
    offset: usize,
    // Trailing bytes of a character split across writes
    pending: Vec<u8>,
}

impl<W: Write> FabulousWriter<W> {
    /// Wrap `inner`
    pub fn new(inner: W, truecolor: bool) -> Self {
        Self {
            inner,
            truecolor,
            offset: 0,
            pending: Vec::new(),
        }
    }

    /// Unwrap the inner writer
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn paint(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(bytes);
        let painted = rainbow(&text, self.offset, self.truecolor);
        self.offset += text.chars().filter(|c| !c.is_whitespace()).count();
        self.inner.write_all(painted.as_bytes())
    }
}

impl<W: Write> Write for FabulousWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);

        // An incomplete sequence at the end waits for the next write.
        let complete = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(_) => self.pending.len(),
        };
        let rest = self.pending.split_off(complete);
        let head = std::mem::replace(&mut self.pending, rest);

        self.paint(&head)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let rest = std::mem::take(&mut self.pending);
        self.paint(&rest)?;
        self.inner.flush()
    }
}
