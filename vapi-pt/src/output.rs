//! Console report of the demo steps

use std::{fmt::Debug, io::Write};

use serde::Serialize;

use crate::Result;

/// Writes step progress and message payloads
///
/// Each payload is printed twice: as its `Debug` form on a `MSG:` line and
/// as indented JSON on a `JSON:` block.
pub struct Report<W> {
    out: W,
}

impl<W: Write> Report<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// # Errors
    ///
    /// Returns [`crate::SessionError::Output`] if writing fails
    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    /// Close a step with `OK` and a blank line
    ///
    /// # Errors
    ///
    /// Returns [`crate::SessionError::Output`] if writing fails
    pub fn ok(&mut self) -> Result<()> {
        writeln!(self.out, "OK")?;
        writeln!(self.out)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if writing or JSON encoding fails
    pub fn message<T: Debug + Serialize>(&mut self, msg: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(msg)?;
        writeln!(self.out, "MSG: {msg:?}")?;
        writeln!(self.out, "JSON: {json}")?;
        Ok(())
    }

    /// One numbered record of a dump, followed by its payload
    ///
    /// # Errors
    ///
    /// Returns an error if writing or JSON encoding fails
    pub fn record<T: Debug + Serialize>(&mut self, kind: &str, n: usize, msg: &T) -> Result<()> {
        writeln!(self.out, " - {kind} #{n}: {msg:?}")?;
        self.message(msg)
    }
}
