pub mod input;

use std::io::Write;

pub use input::{InputHandler, ReadOutcome};

/// Output handles the shell and its built-ins write through.
///
/// The interactive binary passes real stdout/stderr; tests pass buffers.
pub struct Streams<'a> {
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
}

impl<'a> Streams<'a> {
    pub fn new(out: &'a mut dyn Write, err: &'a mut dyn Write) -> Self {
        Streams { out, err }
    }

    /// Writes one diagnostic line. A failing stderr has nowhere to report to.
    pub fn report(&mut self, msg: &dyn std::fmt::Display) {
        let _ = writeln!(self.err, "{}", msg);
    }
}
