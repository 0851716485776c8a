//! Minimal canonical-mode line reader over a raw byte stream.

use std::{
    collections::VecDeque,
    io::{self, ErrorKind, Read},
};

use crate::{
    InterruptFlag,
    traits::{LineReader, ReadLine},
};

const NUL: u8 = 0x00;
const EOT: u8 = 0x04;
const ETX: u8 = 0x03;

/// Longest line accepted before the reader gives up on the stream.
const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

/// Line reader that splits a byte stream on `\n`, `\r` or `\r\n`.
///
/// A Ctrl-D on an empty line ends the stream, a Ctrl-C discards the line
/// typed so far and NUL bytes are dropped. Reads that return `WouldBlock`,
/// `TimedOut` or `Interrupted` re-check the interrupt flag and try again.
/// A line longer than the configured limit fails with `InvalidData`.
pub struct StreamLineReader {
    input: Box<dyn Read + Send>,
    interrupt: InterruptFlag,
    line: Vec<u8>,
    ready: VecDeque<io::Result<ReadLine>>,
    max_line_len: usize,
    skip_lf: bool,
    eof: bool,
}

impl StreamLineReader {
    /// Wrap an input stream.
    #[must_use]
    pub fn new(input: Box<dyn Read + Send>, interrupt: InterruptFlag) -> Self {
        Self {
            input,
            interrupt,
            line: Vec::new(),
            ready: VecDeque::new(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            skip_lf: false,
            eof: false,
        }
    }

    /// Override the line length limit.
    #[must_use]
    pub const fn max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    fn finish_line(&mut self) {
        let line = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        self.ready.push_back(Ok(ReadLine::Line(line)));
    }

    /// Apply line discipline to freshly read bytes. Each byte is seen once;
    /// the rest of a chunk holding an overlong line is dropped.
    fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if std::mem::take(&mut self.skip_lf) && byte == b'\n' {
                continue;
            }
            match byte {
                b'\n' => self.finish_line(),
                b'\r' => {
                    self.skip_lf = true;
                    self.finish_line();
                }
                EOT if self.line.is_empty() => self.ready.push_back(Ok(ReadLine::Eof)),
                ETX => self.line.clear(),
                NUL => {}
                _ if self.line.len() >= self.max_line_len => {
                    self.line.clear();
                    self.ready.push_back(Err(io::Error::new(
                        ErrorKind::InvalidData,
                        format!("input line exceeds {} bytes", self.max_line_len),
                    )));
                    return;
                }
                _ => self.line.push(byte),
            }
        }
    }
}

impl LineReader for StreamLineReader {
    fn read_line(&mut self) -> io::Result<ReadLine> {
        let mut buf = [0u8; 1024];
        loop {
            if self.interrupt.is_interrupted() {
                return Ok(ReadLine::Interrupted);
            }
            if let Some(line) = self.ready.pop_front() {
                return line;
            }
            if self.eof {
                if self.line.is_empty() {
                    return Ok(ReadLine::Eof);
                }
                self.finish_line();
                continue;
            }

            match self.input.read(&mut buf) {
                Ok(0) => self.eof = true,
                Ok(n) => self.feed(&buf[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e),
            }
        }
    }
}
