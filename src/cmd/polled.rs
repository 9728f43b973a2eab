use core::fmt::Write as _;

use embedded_io::{Read, Write};
use heapless::String;

use super::queue::{Edit, LineEditor};
use super::{write_report, ErrorCode, Interpreter, Outcome};

/// IO failure of a [`PolledConsole`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PolledError<R, W> {
    /// Reading failed.
    Read(R),
    /// Writing failed.
    Write(W),
    /// The reader returned no data.
    Eof,
}

/// Blocking console: prompt, read a line, run it, print the report.
///
/// Every non-empty line gets a command number, including lines that fail to parse.
#[derive(Debug)]
pub struct PolledConsole {
    editor: LineEditor,
    seq: u16,
}

impl PolledConsole {
    /// Console whose first command is number 1.
    pub const fn new() -> Self {
        PolledConsole {
            editor: LineEditor::new(),
            seq: 1,
        }
    }

    /// Number of the next command.
    pub fn next_seq(&self) -> u16 {
        self.seq
    }

    /// Handles one command, blocking until it has been entered.
    pub fn run_once<R, W, C, const CMDS: usize, const ERRS: usize>(
        &mut self,
        rx: &mut R,
        tx: &mut W,
        interp: &Interpreter<C, CMDS, ERRS>,
        ctx: &mut C,
    ) -> Result<Outcome, PolledError<R::Error, W::Error>>
    where
        R: Read,
        W: Write,
    {
        let mut out: String<96> = String::new();
        let _ = write!(out, "CMD {}:", self.seq);
        tx.write_all(out.as_bytes()).map_err(PolledError::Write)?;

        let outcome = loop {
            let mut byte = [0u8];
            match rx.read(&mut byte) {
                Ok(0) => return Err(PolledError::Eof),
                Ok(_) => {}
                Err(e) => return Err(PolledError::Read(e)),
            }
            match self.editor.push(byte[0]) {
                Edit::Pending => {}
                Edit::Blank => {
                    out.clear();
                    let _ = write!(out, "\r\nCMD {}:", self.seq);
                    tx.write_all(out.as_bytes()).map_err(PolledError::Write)?;
                }
                Edit::Line(line) => break interp.execute(ctx, &line),
                Edit::TooLong => break Outcome::failed(ErrorCode::TOO_LONG),
            }
        };

        out.clear();
        let _ = write_report(&mut out, self.seq, interp.message(outcome.code), &outcome.result);
        tx.write_all(out.as_bytes()).map_err(PolledError::Write)?;
        self.seq = self.seq.wrapping_add(1);
        Ok(outcome)
    }
}

impl Default for PolledConsole {
    fn default() -> Self {
        Self::new()
    }
}
