use core::fmt::{self, Write};
use core::ops::RangeInclusive;

use heapless::{String, Vec};

use super::{Fault, MAX_ARGS, MAX_STR_ARGS, MAX_STR_LEN, RESULT_LEN};

/// One string argument.
pub type StrArg = String<MAX_STR_LEN>;
/// Text produced by a command.
pub type Text = String<RESULT_LEN>;

/// Value a command hands back to be printed with its report.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CmdResult {
    /// Nothing to print.
    #[default]
    None,
    /// Unsigned value.
    UInt(u32),
    /// Signed value.
    SLong(i32),
    /// Printed with three decimals.
    Float(f32),
    /// Free text.
    Text(Text),
}

impl CmdResult {
    /// `true` unless the result is [`CmdResult::None`].
    pub fn is_some(&self) -> bool {
        !matches!(self, CmdResult::None)
    }
}

impl fmt::Display for CmdResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmdResult::None => Ok(()),
            CmdResult::UInt(v) => write!(f, "{}", v),
            CmdResult::SLong(v) => write!(f, "{}", v),
            CmdResult::Float(v) => write!(f, "{:.3}", v),
            CmdResult::Text(s) => f.write_str(s),
        }
    }
}

/// Arguments parsed from a command line, plus the slot a handler writes its result to.
#[derive(Debug, Clone, Default)]
pub struct CmdData {
    /// Numeric arguments in order. Unused slots are zero.
    pub args: [i32; MAX_ARGS],
    /// String arguments in order.
    pub str_args: Vec<StrArg, MAX_STR_ARGS>,
    /// Set by the handler.
    pub result: CmdResult,
}

impl CmdData {
    /// Empty argument block.
    pub const fn new() -> Self {
        CmdData {
            args: [0; MAX_ARGS],
            str_args: Vec::new(),
            result: CmdResult::None,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.args = [0; MAX_ARGS];
        self.str_args.clear();
        self.result = CmdResult::None;
    }

    /// Numeric argument `index`.
    #[inline]
    pub fn arg(&self, index: usize) -> i32 {
        self.args.get(index).copied().unwrap_or(0)
    }

    /// Numeric argument `index`, or `fault` when it lies outside `range`.
    pub fn arg_in(&self, index: usize, range: RangeInclusive<i32>, fault: Fault) -> Result<i32, Fault> {
        let value = self.arg(index);
        if range.contains(&value) {
            Ok(value)
        } else {
            Err(fault)
        }
    }

    /// Numeric argument `index` as a byte, or `fault` outside `0..=255`.
    pub fn arg_u8(&self, index: usize, fault: Fault) -> Result<u8, Fault> {
        self.arg_in(index, 0..=255, fault).map(|v| v as u8)
    }

    /// String argument `index`, empty if absent.
    pub fn str_arg(&self, index: usize) -> &str {
        self.str_args.get(index).map(|s| s.as_str()).unwrap_or("")
    }

    /// Formats a text result. Text that does not fit is cut short.
    pub fn set_text(&mut self, args: fmt::Arguments<'_>) {
        self.result = CmdResult::Text(format_text(args));
    }
}

/// Formats into a [`Text`], cutting it short when it does not fit.
pub fn format_text(args: fmt::Arguments<'_>) -> Text {
    let mut text = Truncating(Text::new());
    let _ = text.write_fmt(args);
    text.0
}

struct Truncating(Text);

impl Write for Truncating {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                return Err(fmt::Error);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_display() {
        assert_eq!(format!("{}", CmdResult::None), "");
        assert_eq!(format!("{}", CmdResult::UInt(42)), "42");
        assert_eq!(format!("{}", CmdResult::SLong(-7)), "-7");
        assert_eq!(format!("{}", CmdResult::Float(409.2161)), "409.216");
    }

    #[test]
    fn argument_ranges() {
        let mut data = CmdData::new();
        data.args[0] = 7;
        data.args[1] = 300;
        assert_eq!(data.arg_in(0, 1..=6, Fault(2)), Err(Fault(2)));
        assert_eq!(data.arg_in(0, 0..=7, Fault(2)), Ok(7));
        assert_eq!(data.arg_u8(1, Fault(4)), Err(Fault(4)));
        assert_eq!(data.arg(MAX_ARGS), 0);
    }

    #[test]
    fn text_is_truncated() {
        let mut data = CmdData::new();
        data.set_text(format_args!("{}", "x".repeat(50)));
        match &data.result {
            CmdResult::Text(t) => assert_eq!(t.len(), RESULT_LEN),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clear_resets_everything() {
        let mut data = CmdData::new();
        data.args[2] = 5;
        data.str_args.push(StrArg::try_from("abc").unwrap()).unwrap();
        data.result = CmdResult::UInt(1);
        data.clear();
        assert_eq!(data.args, [0; MAX_ARGS]);
        assert!(data.str_args.is_empty());
        assert!(!data.result.is_some());
    }
}
