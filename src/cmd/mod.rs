//! Serial command interpreter.
//!
//! A command line is a name followed by numeric arguments and then string arguments, separated
//! by spaces, commas or tabs:
//!
//! ```text
//! writeBits 3 1 0x0F
//! ```
//!
//! Commands are grouped in sets. Each set brings its own error messages, which are appended to
//! the [`ErrorTable`] after the built-in ones, so a handler only ever reports a small local
//! [`Fault`] index and the interpreter turns it into a global [`ErrorCode`].
//!
//! Lines arrive through a [`Console`], which is shared between the receive interrupt, the
//! transmit interrupt and the context that actually executes commands, or through a
//! [`PolledConsole`] when blocking IO is good enough.

mod arg;
mod data;
mod interp;
mod polled;
mod queue;
mod table;
mod token;

pub use arg::{parse_arg, ArgError};
pub use data::{format_text, CmdData, CmdResult, StrArg, Text};
pub use interp::{write_report, Interpreter, Outcome};
pub use polled::{PolledConsole, PolledError};
pub use queue::{BufState, Console, Edit, LineEditor, LineQueue, Report, ReportQueue, RxEvent};
pub use table::{Command, CommandTable, ErrorCode, ErrorTable, Fault, Full, Handler};
pub use token::{tokens, Tokens, SEPARATORS};

/// Longest accepted command line, terminator included.
pub const LINE_LEN: usize = 40;
/// Number of complete lines that can wait for execution.
pub const LINE_DEPTH: usize = 6;
/// Number of reports that can wait for transmission.
pub const REPORT_DEPTH: usize = 6;
/// Maximum numeric arguments per command.
pub const MAX_ARGS: usize = 6;
/// Maximum string arguments per command.
pub const MAX_STR_ARGS: usize = 3;
/// Maximum length of one string argument.
pub const MAX_STR_LEN: usize = 11;
/// Capacity of a text result.
pub const RESULT_LEN: usize = 32;
/// Longest error message a command set may register.
pub const MESSAGE_LEN: usize = 40;

/// A complete command line as received.
pub type Line = heapless::String<LINE_LEN>;
