use heapless::Vec;

use super::{CmdData, MESSAGE_LEN};

/// Global error number, used as an index into the [`ErrorTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorCode(pub u8);

impl ErrorCode {
    /// Command ran.
    pub const SUCCESS: ErrorCode = ErrorCode(0);
    /// Line longer than the receive buffer.
    pub const TOO_LONG: ErrorCode = ErrorCode(1);
    /// No command with that name.
    pub const NO_SUCH_COMMAND: ErrorCode = ErrorCode(2);
    /// Fewer numeric arguments than the command takes.
    pub const MISSING_ARGS: ErrorCode = ErrorCode(3);
    /// A numeric argument failed to parse.
    pub const NOT_A_NUMBER: ErrorCode = ErrorCode(4);
    /// Fewer string arguments than the command takes.
    pub const MISSING_STR_ARGS: ErrorCode = ErrorCode(5);
    /// Extra tokens after the last argument.
    pub const TOO_MANY_ARGS: ErrorCode = ErrorCode(6);
    /// A string argument longer than [`MAX_STR_LEN`](super::MAX_STR_LEN).
    pub const STR_ARG_TOO_LONG: ErrorCode = ErrorCode(7);

    /// `true` for [`ErrorCode::SUCCESS`].
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

/// Handler-local error index. Index `n` of a command set maps to the set's base code plus `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fault(pub u8);

/// A fixed-capacity table ran out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Full;

const BUILTIN_ERRORS: [&str; 8] = [
    "success",
    "CMD too long",
    "CMD name does not exist",
    "not enough arguments",
    "argument not a number",
    "not enough string args",
    "too many args",
    "string arg too long",
];

/// Error messages indexed by [`ErrorCode`].
pub struct ErrorTable<const N: usize> {
    messages: Vec<&'static str, N>,
}

impl<const N: usize> ErrorTable<N> {
    /// Table holding the built-in messages. `N` must leave room for them.
    pub fn new() -> Result<Self, Full> {
        let mut table = ErrorTable {
            messages: Vec::new(),
        };
        table.add_set(&BUILTIN_ERRORS)?;
        Ok(table)
    }

    /// Appends one message and returns its code.
    pub fn add(&mut self, message: &'static str) -> Result<ErrorCode, Full> {
        self.add_set(&[message])
    }

    /// Appends a group of messages and returns the code of the first one. Nothing is added if the
    /// whole group does not fit. Messages are at most [`MESSAGE_LEN`] bytes.
    pub fn add_set(&mut self, messages: &[&'static str]) -> Result<ErrorCode, Full> {
        debug_assert!(
            messages.iter().all(|m| m.len() <= MESSAGE_LEN),
            "error message longer than MESSAGE_LEN"
        );
        let base = self.messages.len();
        if base + messages.len() > N.min(u8::MAX as usize + 1) {
            return Err(Full);
        }
        for msg in messages {
            self.messages.push(msg).map_err(|_| Full)?;
        }
        Ok(ErrorCode(base as u8))
    }

    /// Message for `code`.
    pub fn message(&self, code: ErrorCode) -> &'static str {
        self.messages
            .get(usize::from(code.0))
            .copied()
            .unwrap_or("unknown error")
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// `true` if nothing has been added. Never the case after [`ErrorTable::new`].
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Function run when a command is entered.
pub type Handler<C> = fn(&mut C, &mut CmdData) -> Result<(), Fault>;

/// Describes one command: how it is called and what runs.
pub struct Command<C> {
    /// Name typed on the console. Matched exactly.
    pub name: &'static str,
    /// Numeric arguments, always first.
    pub n_args: u8,
    /// String arguments, always after the numeric ones.
    pub n_str_args: u8,
    /// Runs the command.
    pub handler: Handler<C>,
}

impl<C> Command<C> {
    /// Command taking only numeric arguments.
    pub const fn new(name: &'static str, n_args: u8, handler: Handler<C>) -> Self {
        Command {
            name,
            n_args,
            n_str_args: 0,
            handler,
        }
    }

    /// Adds string arguments.
    pub const fn with_str_args(mut self, n_str_args: u8) -> Self {
        self.n_str_args = n_str_args;
        self
    }
}

// Manual impls: deriving would put a `C: Clone` bound on the context type.
impl<C> Clone for Command<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Command<C> {}

pub(crate) struct Entry<C> {
    pub(crate) command: Command<C>,
    pub(crate) err_base: ErrorCode,
    pub(crate) err_count: u8,
}

/// Registered commands.
pub struct CommandTable<C, const N: usize> {
    entries: Vec<Entry<C>, N>,
}

impl<C, const N: usize> CommandTable<C, N> {
    /// Empty table.
    pub const fn new() -> Self {
        CommandTable {
            entries: Vec::new(),
        }
    }

    /// Registers `command`, reporting its faults relative to `err_base`. Its handler may
    /// return fault indices below `err_count`.
    pub fn add(&mut self, command: Command<C>, err_base: ErrorCode, err_count: u8) -> Result<(), Full> {
        self.entries
            .push(Entry {
                command,
                err_base,
                err_count,
            })
            .map_err(|_| Full)
    }

    pub(crate) fn find(&self, name: &str) -> Option<&Entry<C>> {
        self.entries.iter().find(|e| e.command.name == name)
    }

    /// Looks a command up by name. The first registration of a name wins.
    pub fn get(&self, name: &str) -> Option<&Command<C>> {
        self.find(name).map(|e| &e.command)
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Room left.
    pub fn remaining(&self) -> usize {
        N - self.entries.len()
    }
}

impl<C, const N: usize> Default for CommandTable<C, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop(_: &mut (), _: &mut CmdData) -> Result<(), Fault> {
        Ok(())
    }

    #[test]
    fn builtin_messages() {
        let table = ErrorTable::<16>::new().unwrap();
        assert_eq!(table.len(), 8);
        assert_eq!(table.message(ErrorCode::SUCCESS), "success");
        assert_eq!(table.message(ErrorCode::TOO_LONG), "CMD too long");
        assert_eq!(table.message(ErrorCode::TOO_MANY_ARGS), "too many args");
        assert_eq!(table.message(ErrorCode(200)), "unknown error");
    }

    #[test]
    fn sets_get_consecutive_bases() {
        let mut table = ErrorTable::<16>::new().unwrap();
        assert_eq!(table.add_set(&["a", "b"]), Ok(ErrorCode(8)));
        assert_eq!(table.add("c"), Ok(ErrorCode(10)));
        assert_eq!(table.message(ErrorCode(9)), "b");
    }

    #[test]
    #[should_panic(expected = "longer than MESSAGE_LEN")]
    fn long_messages_are_refused() {
        let long: &'static str = "this message is far too long to fit in a report";
        let _ = ErrorTable::<16>::new().unwrap().add(long);
    }

    #[test]
    fn error_set_is_all_or_nothing() {
        let mut table = ErrorTable::<10>::new().unwrap();
        assert_eq!(table.add_set(&["a", "b", "c"]), Err(Full));
        assert_eq!(table.len(), 8);
        assert!(ErrorTable::<4>::new().is_err());
    }

    #[test]
    fn first_registration_wins() {
        let mut table = CommandTable::<(), 2>::new();
        table.add(Command::new("go", 1, nop), ErrorCode(8), 1).unwrap();
        table.add(Command::new("go", 2, nop), ErrorCode(9), 1).unwrap();
        assert_eq!(table.get("go").map(|c| c.n_args), Some(1));
        assert!(table.get("Go").is_none());
        assert_eq!(table.add(Command::new("x", 0, nop), ErrorCode(0), 0), Err(Full));
    }
}
