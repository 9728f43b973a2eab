use core::fmt;

use super::table::Entry;
use super::{
    parse_arg, tokens, CmdData, CmdResult, Command, CommandTable, ErrorCode, ErrorTable, Full,
    StrArg,
};

/// What happened when a line was executed.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// [`ErrorCode::SUCCESS`] or the reason the command failed.
    pub code: ErrorCode,
    /// Value set by the handler. Always [`CmdResult::None`] on failure.
    pub result: CmdResult,
}

impl Outcome {
    /// Failure without a result.
    pub fn failed(code: ErrorCode) -> Self {
        Outcome {
            code,
            result: CmdResult::None,
        }
    }
}

/// Writes the report for command number `seq`.
///
/// `\r\n--CMD 3 success --\r\n`, or with a result `\r\n--CMD 3 success: 42 --\r\n`.
pub fn write_report<W: fmt::Write>(
    w: &mut W,
    seq: u16,
    message: &str,
    result: &CmdResult,
) -> fmt::Result {
    if result.is_some() {
        write!(w, "\r\n--CMD {} {}: {} --\r\n", seq, message, result)
    } else {
        write!(w, "\r\n--CMD {} {} --\r\n", seq, message)
    }
}

/// Command and error registries, and the logic that turns a line into a handler call.
///
/// `C` is the context handed to every handler. It owns whatever peripherals the registered
/// command sets need.
pub struct Interpreter<C, const CMDS: usize, const ERRS: usize> {
    commands: CommandTable<C, CMDS>,
    errors: ErrorTable<ERRS>,
}

impl<C, const CMDS: usize, const ERRS: usize> Interpreter<C, CMDS, ERRS> {
    /// Interpreter with only the built-in error messages.
    pub fn new() -> Result<Self, Full> {
        Ok(Interpreter {
            commands: CommandTable::new(),
            errors: ErrorTable::new()?,
        })
    }

    /// Registers a command set. `errors` are appended to the error table and every command's
    /// [`Fault`](super::Fault) indices are reported relative to the first of them. Returns that
    /// base code. Nothing is registered if either table lacks room.
    pub fn register_set(
        &mut self,
        errors: &[&'static str],
        commands: &[Command<C>],
    ) -> Result<ErrorCode, Full> {
        if commands.len() > self.commands.remaining() {
            return Err(Full);
        }
        let count = u8::try_from(errors.len()).map_err(|_| Full)?;
        let base = self.errors.add_set(errors)?;
        for cmd in commands {
            self.commands.add(*cmd, base, count)?;
        }
        debug!("registered {=usize} commands, errors from {=u8}", commands.len(), base.0);
        Ok(base)
    }

    /// Message for `code`.
    pub fn message(&self, code: ErrorCode) -> &'static str {
        self.errors.message(code)
    }

    /// Registered commands.
    pub fn commands(&self) -> &CommandTable<C, CMDS> {
        &self.commands
    }

    /// Checks `line` against the registered commands and fills `data` with its arguments.
    ///
    /// A command that declares more arguments than [`MAX_ARGS`](super::MAX_ARGS) or
    /// [`MAX_STR_ARGS`](super::MAX_STR_ARGS) can never be parsed and always fails with
    /// [`ErrorCode::TOO_MANY_ARGS`].
    pub fn parse(&self, line: &str, data: &mut CmdData) -> Result<Command<C>, ErrorCode> {
        self.parse_entry(line, data).map(|e| e.command)
    }

    fn parse_entry(&self, line: &str, data: &mut CmdData) -> Result<&Entry<C>, ErrorCode> {
        data.clear();
        let mut toks = tokens(line);
        let name = toks.next().ok_or(ErrorCode::NO_SUCH_COMMAND)?;
        let entry = self.commands.find(name).ok_or(ErrorCode::NO_SUCH_COMMAND)?;

        for i in 0..usize::from(entry.command.n_args) {
            let tok = toks.next().ok_or(ErrorCode::MISSING_ARGS)?;
            let slot = data.args.get_mut(i).ok_or(ErrorCode::TOO_MANY_ARGS)?;
            *slot = parse_arg(tok).map_err(|_| ErrorCode::NOT_A_NUMBER)?;
        }
        for _ in 0..entry.command.n_str_args {
            let tok = toks.next().ok_or(ErrorCode::MISSING_STR_ARGS)?;
            let arg = StrArg::try_from(tok).map_err(|_| ErrorCode::STR_ARG_TOO_LONG)?;
            data.str_args
                .push(arg)
                .map_err(|_| ErrorCode::TOO_MANY_ARGS)?;
        }
        if toks.next().is_some() {
            return Err(ErrorCode::TOO_MANY_ARGS);
        }
        Ok(entry)
    }

    /// Parses and runs one line.
    pub fn execute(&self, ctx: &mut C, line: &str) -> Outcome {
        let mut data = CmdData::new();
        let (handler, base, count) = match self.parse_entry(line, &mut data) {
            Ok(entry) => (entry.command.handler, entry.err_base, entry.err_count),
            Err(code) => {
                debug!("rejected line: {=u8}", code.0);
                return Outcome::failed(code);
            }
        };
        match handler(ctx, &mut data) {
            Ok(()) => Outcome {
                code: ErrorCode::SUCCESS,
                result: data.result,
            },
            Err(fault) => {
                debug_assert!(
                    fault.0 < count,
                    "fault {} outside a set of {} messages",
                    fault.0,
                    count
                );
                let code = ErrorCode(base.0.saturating_add(fault.0));
                debug!("command fault {=u8}", code.0);
                Outcome::failed(code)
            }
        }
    }

    /// Writes the report for `outcome` as command number `seq`.
    pub fn report<W: fmt::Write>(&self, w: &mut W, seq: u16, outcome: &Outcome) -> fmt::Result {
        write_report(w, seq, self.message(outcome.code), &outcome.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::Fault;

    #[derive(Default)]
    struct Ctx {
        calls: Vec<(i32, i32)>,
        last_str: std::string::String,
    }

    fn add(ctx: &mut Ctx, data: &mut CmdData) -> Result<(), Fault> {
        ctx.calls.push((data.arg(0), data.arg(1)));
        data.result = CmdResult::SLong(data.arg(0) + data.arg(1));
        Ok(())
    }

    fn limited(_: &mut Ctx, data: &mut CmdData) -> Result<(), Fault> {
        data.arg_in(0, 0..=10, Fault(1))?;
        Ok(())
    }

    fn name(ctx: &mut Ctx, data: &mut CmdData) -> Result<(), Fault> {
        ctx.last_str = data.str_arg(0).into();
        Ok(())
    }

    fn interp() -> Interpreter<Ctx, 8, 16> {
        let mut i = Interpreter::new().unwrap();
        i.register_set(
            &["first", "out of range"],
            &[
                Command::new("add", 2, add),
                Command::new("limited", 1, limited),
            ],
        )
        .unwrap();
        i.register_set(&[], &[Command::new("name", 1, name).with_str_args(1)])
            .unwrap();
        i
    }

    #[test]
    fn executes_with_result() {
        let i = interp();
        let mut ctx = Ctx::default();
        let out = i.execute(&mut ctx, "add 0x10 -4");
        assert_eq!(out.code, ErrorCode::SUCCESS);
        assert_eq!(out.result, CmdResult::SLong(12));
        assert_eq!(ctx.calls, [(16, -4)]);
    }

    #[test]
    fn parse_errors() {
        let i = interp();
        let mut ctx = Ctx::default();
        let code = |line| i.execute(&mut Ctx::default(), line).code;
        assert_eq!(code("sub 1 2"), ErrorCode::NO_SUCH_COMMAND);
        assert_eq!(code("add 1"), ErrorCode::MISSING_ARGS);
        assert_eq!(code("add 1 two"), ErrorCode::NOT_A_NUMBER);
        assert_eq!(code("add 1 2 3"), ErrorCode::TOO_MANY_ARGS);
        assert_eq!(code("name 1"), ErrorCode::MISSING_STR_ARGS);
        assert_eq!(code("name 1 abcdefghijkl"), ErrorCode::STR_ARG_TOO_LONG);
        assert!(i.execute(&mut ctx, "name 1 abcdefghijk").code.is_success());
        assert_eq!(ctx.last_str, "abcdefghijk");
        assert!(ctx.calls.is_empty());
    }

    #[test]
    fn faults_map_through_set_base() {
        let i = interp();
        let out = i.execute(&mut Ctx::default(), "limited 11");
        assert_eq!(out.code, ErrorCode(9));
        assert_eq!(i.message(out.code), "out of range");
        assert_eq!(out.result, CmdResult::None);
    }

    fn stray(_: &mut Ctx, _: &mut CmdData) -> Result<(), Fault> {
        Err(Fault(2))
    }

    #[test]
    #[should_panic(expected = "outside a set of 2 messages")]
    fn fault_past_its_own_set_is_caught() {
        let mut i = Interpreter::<Ctx, 4, 16>::new().unwrap();
        i.register_set(&["first", "second"], &[Command::new("stray", 0, stray)])
            .unwrap();
        i.register_set(&["belongs to the next set"], &[]).unwrap();
        i.execute(&mut Ctx::default(), "stray");
    }

    #[test]
    fn oversized_set_is_rejected_whole() {
        let mut i = Interpreter::<Ctx, 2, 16>::new().unwrap();
        let res = i.register_set(
            &["e"],
            &[
                Command::new("a", 0, limited),
                Command::new("b", 0, limited),
                Command::new("c", 0, limited),
            ],
        );
        assert_eq!(res, Err(Full));
        assert!(i.commands().is_empty());
        assert_eq!(i.message(ErrorCode(8)), "unknown error");
    }

    #[test]
    fn report_format() {
        let i = interp();
        let mut s = std::string::String::new();
        i.report(&mut s, 3, &Outcome::failed(ErrorCode::MISSING_ARGS))
            .unwrap();
        assert_eq!(s, "\r\n--CMD 3 not enough arguments --\r\n");

        s.clear();
        let ok = Outcome {
            code: ErrorCode::SUCCESS,
            result: CmdResult::UInt(42),
        };
        i.report(&mut s, 12, &ok).unwrap();
        assert_eq!(s, "\r\n--CMD 12 success: 42 --\r\n");
    }
}
