use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Line,
    Eof,
}

/// Prompts and reads one line at a time into a caller-owned buffer, so the
/// allocation is reused from one iteration to the next. Lines are raw bytes;
/// no encoding is assumed.
pub struct InputHandler<R> {
    reader: R,
}

impl<R: BufRead> InputHandler<R> {
    pub fn new(reader: R) -> Self {
        InputHandler { reader }
    }

    /// Only the trailing `\n` is stripped; a `\r` stays part of the line.
    pub fn read_line(&mut self, prompt: &str, out: &mut dyn Write, buf: &mut Vec<u8>) -> io::Result<ReadOutcome> {
        let _ = write!(out, "{}", prompt);
        let _ = out.flush();

        buf.clear();
        let bytes_read = self.reader.read_until(b'\n', buf)?;
        if bytes_read == 0 {
            // EOF (e.g., Ctrl-D)
            return Ok(ReadOutcome::Eof);
        }
        if buf.ends_with(b"\n") {
            buf.pop();
        }
        Ok(ReadOutcome::Line)
    }
}
