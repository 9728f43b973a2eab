//! Buffers shared between the UART interrupts and the context that runs commands.

use core::cell::RefCell;
use core::fmt::Write;

use critical_section::Mutex;
use heapless::{Deque, String};

use super::interp::write_report;
use super::{
    CmdResult, ErrorCode, Interpreter, Line, Text, LINE_DEPTH, LINE_LEN, MESSAGE_LEN,
    REPORT_DEPTH, RESULT_LEN,
};

const DEL: u8 = 127;
const BS: u8 = 8;
const TX_LEN: usize = 96;
// "\r\n--CMD 65535 " + message + ": " + result + " --\r\n"
const REPORT_LEN: usize = 14 + MESSAGE_LEN + 2 + RESULT_LEN + 5;
const _: () = assert!(REPORT_LEN <= TX_LEN);
// "\r" + padded stream line
const _: () = assert!(1 + RESULT_LEN <= TX_LEN);
const TOO_LONG_MESSAGE: &str = "CMD too long";

/// Fill level of a circular buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufState {
    /// Nothing queued.
    Empty,
    /// Some entries queued, room for more.
    InProgress,
    /// No room left.
    Full,
}

impl BufState {
    fn of(len: usize, capacity: usize) -> Self {
        if len == 0 {
            BufState::Empty
        } else if len >= capacity {
            BufState::Full
        } else {
            BufState::InProgress
        }
    }
}

/// Result of feeding one byte to a [`LineEditor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Nothing finished yet.
    Pending,
    /// `\r` on an empty line.
    Blank,
    /// `\r` ended a line.
    Line(Line),
    /// The line outgrew the buffer. Input is discarded up to the next `\r`.
    TooLong,
}

/// Builds lines out of received bytes.
///
/// `\r` ends a line, `\n` is ignored and DEL or backspace remove the previous character. A line
/// holds at most `LINE_LEN - 1` characters.
#[derive(Debug)]
pub struct LineEditor {
    buf: Line,
    discarding: bool,
}

impl LineEditor {
    /// Empty editor.
    pub const fn new() -> Self {
        LineEditor {
            buf: String::new(),
            discarding: false,
        }
    }

    /// Characters typed so far on the current line.
    pub fn current(&self) -> &str {
        &self.buf
    }

    /// Feeds one byte.
    pub fn push(&mut self, byte: u8) -> Edit {
        match byte {
            b'\r' => {
                if core::mem::replace(&mut self.discarding, false) {
                    Edit::Pending
                } else if self.buf.is_empty() {
                    Edit::Blank
                } else {
                    Edit::Line(core::mem::take(&mut self.buf))
                }
            }
            b'\n' => Edit::Pending,
            DEL | BS => {
                if !self.discarding {
                    self.buf.pop();
                }
                Edit::Pending
            }
            _ if self.discarding => Edit::Pending,
            _ if self.buf.len() >= LINE_LEN - 1 => {
                self.buf.clear();
                self.discarding = true;
                Edit::TooLong
            }
            c if c.is_ascii() => {
                // Cannot fail, the length was checked above.
                let _ = self.buf.push(char::from(c));
                Edit::Pending
            }
            _ => Edit::Pending,
        }
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete lines waiting to be executed, each tagged with its command number.
#[derive(Debug)]
pub struct LineQueue<const N: usize> {
    lines: Deque<(u16, Line), N>,
    dropped: u16,
}

impl<const N: usize> LineQueue<N> {
    /// Empty queue.
    pub const fn new() -> Self {
        LineQueue {
            lines: Deque::new(),
            dropped: 0,
        }
    }

    /// Queues `line`. When full the line is dropped, counted and handed back.
    pub fn push(&mut self, seq: u16, line: Line) -> Result<(), Line> {
        self.lines.push_back((seq, line)).map_err(|(_, line)| {
            self.dropped = self.dropped.wrapping_add(1);
            line
        })
    }

    /// Oldest line.
    pub fn pop(&mut self) -> Option<(u16, Line)> {
        self.lines.pop_front()
    }

    /// Fill level.
    pub fn state(&self) -> BufState {
        BufState::of(self.lines.len(), N)
    }

    /// Lines dropped because the queue was full.
    pub fn dropped(&self) -> u16 {
        self.dropped
    }
}

impl<const N: usize> Default for LineQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one command, ready to be printed.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Command number.
    pub seq: u16,
    /// Error code, for logging.
    pub code: ErrorCode,
    /// Message for `code`.
    pub message: &'static str,
    /// Printed after the message when present.
    pub result: CmdResult,
}

impl Report {
    fn render(&self, out: &mut String<TX_LEN>) {
        // Fits, see REPORT_LEN.
        let _ = write_report(out, self.seq, self.message, &self.result);
    }
}

/// Reports waiting to be transmitted.
#[derive(Debug)]
pub struct ReportQueue<const N: usize> {
    reports: Deque<Report, N>,
    dropped: u16,
}

impl<const N: usize> ReportQueue<N> {
    /// Empty queue.
    pub const fn new() -> Self {
        ReportQueue {
            reports: Deque::new(),
            dropped: 0,
        }
    }

    /// Queues `report`, or drops and counts it when full.
    pub fn push(&mut self, report: Report) -> bool {
        if self.reports.push_back(report).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            false
        } else {
            true
        }
    }

    /// Oldest report.
    pub fn pop(&mut self) -> Option<Report> {
        self.reports.pop_front()
    }

    /// Fill level.
    pub fn state(&self) -> BufState {
        BufState::of(self.reports.len(), N)
    }

    /// Reports dropped because the queue was full.
    pub fn dropped(&self) -> u16 {
        self.dropped
    }
}

impl<const N: usize> Default for ReportQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// What the receive interrupt should do after [`Console::on_rx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxEvent {
    /// Byte absorbed, nothing to do.
    None,
    /// A blank line was entered and the prompt is due again. Enable the transmit interrupt.
    Prompt,
    /// A line is waiting for [`Console::service`].
    LineQueued,
    /// A line was dropped because the line queue was full. The prompt is due again.
    Rejected,
    /// The line was too long and its error report is queued. Enable the transmit interrupt.
    TooLong,
    /// Enter ended a stream. The prompt is due again.
    StreamStopped,
}

impl RxEvent {
    /// `true` when there is something new to transmit.
    pub fn wants_tx(self) -> bool {
        matches!(
            self,
            RxEvent::Prompt | RxEvent::Rejected | RxEvent::TooLong | RxEvent::StreamStopped
        )
    }
}

struct State<const L: usize, const R: usize> {
    editor: LineEditor,
    lines: LineQueue<L>,
    reports: ReportQueue<R>,
    tx: String<TX_LEN>,
    tx_pos: usize,
    prompt_pending: bool,
    next_seq: u16,
    streaming: bool,
    stream_line: Option<Text>,
    stream_ended: bool,
}

impl<const L: usize, const R: usize> State<L, R> {
    const fn new() -> Self {
        State {
            editor: LineEditor::new(),
            lines: LineQueue::new(),
            reports: ReportQueue::new(),
            tx: String::new(),
            tx_pos: 0,
            prompt_pending: true,
            next_seq: 1,
            streaming: false,
            stream_line: None,
            stream_ended: false,
        }
    }

    fn receive(&mut self, byte: u8) -> RxEvent {
        if self.streaming {
            // Only Enter matters while streaming.
            if byte != b'\r' {
                return RxEvent::None;
            }
            self.end_stream();
            return RxEvent::StreamStopped;
        }
        match self.editor.push(byte) {
            Edit::Pending => RxEvent::None,
            Edit::Blank => {
                self.prompt_pending = true;
                RxEvent::Prompt
            }
            Edit::Line(line) => match self.lines.push(self.next_seq, line) {
                Ok(()) => {
                    self.next_seq = self.next_seq.wrapping_add(1);
                    RxEvent::LineQueued
                }
                Err(_) => {
                    warn!("line queue full, line dropped");
                    self.prompt_pending = true;
                    RxEvent::Rejected
                }
            },
            Edit::TooLong => {
                let seq = self.next_seq;
                self.next_seq = self.next_seq.wrapping_add(1);
                self.queue_report(Report {
                    seq,
                    code: ErrorCode::TOO_LONG,
                    message: TOO_LONG_MESSAGE,
                    result: CmdResult::None,
                });
                RxEvent::TooLong
            }
        }
    }

    fn end_stream(&mut self) {
        if self.streaming {
            self.streaming = false;
            self.stream_line = None;
            self.stream_ended = true;
            self.editor = LineEditor::new();
            self.prompt_pending = true;
        }
    }

    fn queue_report(&mut self, report: Report) {
        if !self.reports.push(report) {
            warn!("report queue full, report dropped");
        }
        self.prompt_pending = true;
    }

    fn transmit(&mut self) -> Option<u8> {
        loop {
            if let Some(&b) = self.tx.as_bytes().get(self.tx_pos) {
                self.tx_pos += 1;
                return Some(b);
            }
            self.tx.clear();
            self.tx_pos = 0;
            if let Some(report) = self.reports.pop() {
                report.render(&mut self.tx);
            } else if let Some(line) = self.stream_line.take() {
                // Each line overwrites the one before it.
                let _ = write!(self.tx, "\r{:<w$}", line.as_str(), w = RESULT_LEN);
            } else if self.prompt_pending && !self.streaming {
                self.prompt_pending = false;
                if core::mem::take(&mut self.stream_ended) {
                    let _ = self.tx.push_str("\r\n");
                }
                let _ = write!(self.tx, "CMD {}:", self.next_seq);
            } else {
                return None;
            }
        }
    }

    fn pending_output(&self) -> bool {
        self.tx_pos < self.tx.len()
            || self.reports.state() != BufState::Empty
            || self.stream_line.is_some()
            || (self.prompt_pending && !self.streaming)
    }
}

/// Interrupt-driven console.
///
/// Meant to live in a `static`. The receive interrupt calls [`Console::on_rx`], the transmit
/// interrupt calls [`Console::next_tx`] and a timer or the main loop calls
/// [`Console::service`]. All state sits behind one critical section, and the command itself
/// runs outside it so interrupts keep flowing while a slow handler is busy.
///
/// A command may leave the console streaming ([`Console::start_stream`]). The prompt is then
/// held back, [`Console::stream`] lines are printed over each other, and the next Enter ends
/// the stream instead of being read as input.
///
/// ```
/// use msp430fr2x5x_labs::cmd::Console;
///
/// static CONSOLE: Console = Console::new();
///
/// // A fresh console wants to print its first prompt.
/// let prompt: Vec<u8> = core::iter::from_fn(|| CONSOLE.next_tx()).collect();
/// assert_eq!(prompt, b"CMD 1:");
/// ```
pub struct Console<const LINES: usize = LINE_DEPTH, const REPORTS: usize = REPORT_DEPTH> {
    state: Mutex<RefCell<State<LINES, REPORTS>>>,
}

impl<const LINES: usize, const REPORTS: usize> Console<LINES, REPORTS> {
    /// Console with the first prompt pending.
    pub const fn new() -> Self {
        Console {
            state: Mutex::new(RefCell::new(State::new())),
        }
    }

    /// Receive interrupt entry point.
    pub fn on_rx(&self, byte: u8) -> RxEvent {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).receive(byte))
    }

    /// Transmit interrupt entry point. `None` means there is nothing left to send and the
    /// transmit interrupt can be disabled.
    pub fn next_tx(&self) -> Option<u8> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).transmit())
    }

    /// Runs at most one queued line and queues its report. Returns `true` when output is
    /// pending, in which case the transmit interrupt should be enabled.
    pub fn service<C, const CMDS: usize, const ERRS: usize>(
        &self,
        interp: &Interpreter<C, CMDS, ERRS>,
        ctx: &mut C,
    ) -> bool {
        if let Some((seq, line)) = self.take_line() {
            let outcome = interp.execute(ctx, &line);
            debug!("CMD {=u16} -> {=u8}", seq, outcome.code.0);
            self.push_report(Report {
                seq,
                code: outcome.code,
                message: interp.message(outcome.code),
                result: outcome.result,
            });
        }
        self.pending_output()
    }

    /// Takes the oldest complete line.
    pub fn take_line(&self) -> Option<(u16, Line)> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).lines.pop())
    }

    /// Queues a report. The prompt follows once the report queue drains.
    pub fn push_report(&self, report: Report) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).queue_report(report))
    }

    /// `true` while there are bytes left to transmit.
    pub fn pending_output(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).pending_output())
    }

    /// Number the next command will get.
    pub fn next_seq(&self) -> u16 {
        critical_section::with(|cs| self.state.borrow_ref(cs).next_seq)
    }

    /// Holds the prompt back and prints [`stream`](Self::stream) lines until Enter is
    /// received or [`stop_stream`](Self::stop_stream) is called.
    pub fn start_stream(&self) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.streaming = true;
            state.stream_line = None;
            state.stream_ended = false;
        })
    }

    /// Replaces the stream line waiting to be sent. Returns `false` when no stream is running.
    pub fn stream(&self, line: Text) -> bool {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.streaming {
                state.stream_line = Some(line);
            }
            state.streaming
        })
    }

    /// Ends the stream and lets the prompt through.
    pub fn stop_stream(&self) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).end_stream())
    }

    /// `true` while a stream is running.
    pub fn streaming(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).streaming)
    }

    /// Lines lost to a full line queue.
    pub fn dropped_lines(&self) -> u16 {
        critical_section::with(|cs| self.state.borrow_ref(cs).lines.dropped())
    }

    /// Reports lost to a full report queue.
    pub fn dropped_reports(&self) -> u16 {
        critical_section::with(|cs| self.state.borrow_ref(cs).reports.dropped())
    }
}

impl<const LINES: usize, const REPORTS: usize> Default for Console<LINES, REPORTS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{CmdData, Command, Fault};

    fn feed<const L: usize, const R: usize>(console: &Console<L, R>, s: &str) -> Vec<RxEvent> {
        s.bytes().map(|b| console.on_rx(b)).collect()
    }

    fn drain<const L: usize, const R: usize>(console: &Console<L, R>) -> std::string::String {
        let bytes: Vec<u8> = core::iter::from_fn(|| console.next_tx()).collect();
        std::string::String::from_utf8(bytes).unwrap()
    }

    fn echo(_: &mut u32, data: &mut CmdData) -> Result<(), Fault> {
        data.result = CmdResult::SLong(data.arg(0));
        Ok(())
    }

    fn count(calls: &mut u32, _: &mut CmdData) -> Result<(), Fault> {
        *calls += 1;
        Ok(())
    }

    fn interp() -> Interpreter<u32, 4, 12> {
        let mut i = Interpreter::new().unwrap();
        i.register_set(&[], &[Command::new("echo", 1, echo), Command::new("count", 0, count)])
            .unwrap();
        i
    }

    #[test]
    fn editor_handles_control_characters() {
        let mut ed = LineEditor::new();
        for b in b"ab\x7Fc\x08d\n" {
            assert_eq!(ed.push(*b), Edit::Pending);
        }
        assert_eq!(ed.current(), "ad");
        assert_eq!(ed.push(b'\r'), Edit::Line(Line::try_from("ad").unwrap()));
        assert_eq!(ed.push(b'\r'), Edit::Blank);
        assert_eq!(ed.push(BS), Edit::Pending);
    }

    #[test]
    fn editor_limits_line_length() {
        let mut ed = LineEditor::new();
        for _ in 0..LINE_LEN - 1 {
            assert_eq!(ed.push(b'x'), Edit::Pending);
        }
        assert_eq!(ed.push(b'y'), Edit::TooLong);
        assert_eq!(ed.push(b'z'), Edit::Pending);
        assert_eq!(ed.push(b'\r'), Edit::Pending);
        assert_eq!(ed.push(b'o'), Edit::Pending);
        assert_eq!(ed.push(b'k'), Edit::Pending);
        assert_eq!(ed.push(b'\r'), Edit::Line(Line::try_from("ok").unwrap()));
    }

    #[test]
    fn longest_line_fits() {
        let mut ed = LineEditor::new();
        let long = "x".repeat(LINE_LEN - 1);
        for b in long.bytes() {
            ed.push(b);
        }
        assert_eq!(ed.push(b'\r'), Edit::Line(Line::try_from(long.as_str()).unwrap()));
    }

    #[test]
    fn queue_states() {
        let mut q = LineQueue::<2>::new();
        assert_eq!(q.state(), BufState::Empty);
        q.push(1, Line::new()).unwrap();
        assert_eq!(q.state(), BufState::InProgress);
        q.push(2, Line::new()).unwrap();
        assert_eq!(q.state(), BufState::Full);
        assert!(q.push(3, Line::new()).is_err());
        assert_eq!(q.dropped(), 1);
        assert_eq!(q.pop().map(|(seq, _)| seq), Some(1));
        assert_eq!(q.state(), BufState::InProgress);
    }

    #[test]
    fn prompt_then_report_then_prompt() {
        let console: Console = Console::new();
        let interp = interp();
        let mut calls = 0;

        assert!(console.pending_output());
        assert_eq!(drain(&console), "CMD 1:");
        assert!(!console.pending_output());

        let events = feed(&console, "echo -5\r");
        assert_eq!(events.last(), Some(&RxEvent::LineQueued));
        assert!(console.service(&interp, &mut calls));
        assert_eq!(drain(&console), "\r\n--CMD 1 success: -5 --\r\nCMD 2:");

        feed(&console, "bogus\r");
        assert!(console.service(&interp, &mut calls));
        assert_eq!(drain(&console), "\r\n--CMD 2 CMD name does not exist --\r\nCMD 3:");
        assert!(!console.service(&interp, &mut calls));
    }

    #[test]
    fn blank_line_reprompts_without_counting() {
        let console: Console = Console::new();
        drain(&console);
        assert_eq!(feed(&console, "\r"), [RxEvent::Prompt]);
        assert_eq!(drain(&console), "CMD 1:");
        assert_eq!(console.next_seq(), 1);
    }

    #[test]
    fn too_long_line_reports_immediately_and_counts() {
        let console: Console = Console::new();
        drain(&console);
        let events = feed(&console, &"a".repeat(LINE_LEN));
        assert_eq!(events.last(), Some(&RxEvent::TooLong));
        assert_eq!(drain(&console), "\r\n--CMD 1 CMD too long --\r\nCMD 2:");
        // the rest of the long line is thrown away
        feed(&console, "aaaa\r");
        assert_eq!(console.take_line(), None);
        assert_eq!(console.next_seq(), 2);
    }

    #[test]
    fn full_line_queue_drops_lines() {
        let console: Console<2, 4> = Console::new();
        let interp = interp();
        let mut calls = 0;
        drain(&console);
        feed(&console, "count\rcount\r");
        assert_eq!(feed(&console, "count\r").last(), Some(&RxEvent::Rejected));
        assert_eq!(console.dropped_lines(), 1);
        while console.take_line().is_some() {}
        feed(&console, "count\r");
        console.service(&interp, &mut calls);
        assert_eq!(calls, 1);
        assert!(drain(&console).contains("--CMD 3 success --"));
    }

    fn text(s: &str) -> Text {
        Text::try_from(s).unwrap()
    }

    #[test]
    fn stream_holds_prompt_until_enter() {
        let console: Console = Console::new();
        let interp = interp();
        let mut calls = 0;
        drain(&console);
        feed(&console, "count\r");
        console.service(&interp, &mut calls);
        console.start_stream();
        assert!(console.stream(text("X1=1")));
        assert_eq!(
            drain(&console),
            format!("\r\n--CMD 1 success --\r\n\r{:<32}", "X1=1")
        );
        assert!(!console.pending_output());

        // a newer line replaces one not yet sent
        console.stream(text("X1=2"));
        console.stream(text("X1=3"));
        assert_eq!(drain(&console), format!("\r{:<32}", "X1=3"));

        // typing is ignored, Enter ends the stream
        assert_eq!(feed(&console, "count"), [RxEvent::None; 5]);
        assert_eq!(feed(&console, "\r"), [RxEvent::StreamStopped]);
        assert!(!console.streaming());
        assert!(!console.stream(text("late")));
        assert_eq!(drain(&console), "\r\nCMD 2:");
        assert_eq!(console.take_line(), None);
    }

    #[test]
    fn stopped_stream_lets_input_through() {
        let console: Console = Console::new();
        drain(&console);
        console.start_stream();
        console.stream(text("ANGLE=90"));
        console.stop_stream();
        assert_eq!(drain(&console), "\r\nCMD 1:");
        assert_eq!(feed(&console, "count\r").last(), Some(&RxEvent::LineQueued));
    }

    #[test]
    fn full_report_queue_drops_reports() {
        let console: Console<4, 1> = Console::new();
        let interp = interp();
        let mut calls = 0;
        drain(&console);
        feed(&console, "count\rcount\r");
        console.service(&interp, &mut calls);
        console.service(&interp, &mut calls);
        assert_eq!(calls, 2);
        assert_eq!(console.dropped_reports(), 1);
        assert_eq!(drain(&console), "\r\n--CMD 1 success --\r\nCMD 3:");
    }
}
