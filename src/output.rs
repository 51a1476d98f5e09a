//! Report rendering on stdout.
//!
//! The JSON path prints a header and one block per finding; the XML path prints
//! one line per validation event and no success line.

use std::io::{self, Write};

use crate::diagnostic::Diagnostic;

pub const JSON_VALID: &str = "JSON appears to be valid!";
pub const JSON_INVALID: &str = "JSON appears to be INVALID:";

/// Line-oriented report writer
pub struct Output<W: Write> {
    writer: W,
}

impl<W: Write> Output<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Print the outcome of a JSON validation, in the order given.
    pub fn json_report(&mut self, diagnostics: &[Diagnostic]) -> io::Result<()> {
        if diagnostics.is_empty() {
            writeln!(self.writer, "{}", JSON_VALID)?;
        } else {
            writeln!(self.writer, "{}", JSON_INVALID)?;
            for diagnostic in diagnostics {
                writeln!(self.writer, "> {}", diagnostic)?;
                for child in &diagnostic.children {
                    writeln!(self.writer, "-->  {}", child)?;
                }
            }
        }
        self.writer.flush()
    }

    /// Print one XML validation event.
    pub fn xml_event(&mut self, diagnostic: &Diagnostic) -> io::Result<()> {
        writeln!(self.writer, "> {}", diagnostic)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
