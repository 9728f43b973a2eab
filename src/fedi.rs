//! Encoder display: shows a quadrature encoder's position on the 84x48 LCD, either as a hand
//! on a dial or as progress bars with one row per revolution.

use core::fmt;

use crate::drivers::pcd8544::{Canvas, DrawError, BANKS, HEIGHT, WIDTH};

/// Points around the dial.
pub const DIAL_STEPS: u16 = 150;
const Q1: u16 = 37;
const Q2: u16 = 75;
const Q3: u16 = 112;

// Quarter sine wave, round(sin(θ) * 24 * 7) for 2.4° steps.
const SINE: [u8; 38] = [
    0, 7, 14, 21, 28, 35, 42, 49, 55, 62, 68, 75, 81, 87, 93, 99, 104, 110, 115, 120, 125, 129,
    134, 138, 142, 145, 149, 152, 155, 157, 160, 162, 164, 165, 166, 167, 168, 168,
];

// The panel has no centre pixel, so each half of the dial has its own centre line.
const X_LEFT: u8 = 41;
const X_RIGHT: u8 = 42;
const Y_TOP: u8 = 23;
const Y_BOTTOM: u8 = 24;
// Pixels are taller than wide: x is divided by 6, y by 7.
const X_DIV: u8 = 6;
const Y_DIV: u8 = 7;

/// Dial position of step `step`, clockwise from 12 o'clock.
pub fn dial_point(step: u16) -> (u8, u8) {
    let s = |i: u16| SINE[usize::from(i)];
    let step = step % DIAL_STEPS;
    let x = if step <= Q1 {
        X_RIGHT + s(step) / X_DIV
    } else if step < Q2 {
        X_RIGHT + s(Q2 - step) / X_DIV
    } else if step <= Q3 {
        X_LEFT - s(step - Q2) / X_DIV
    } else {
        X_LEFT - s(DIAL_STEPS - step) / X_DIV
    };
    // The vertical radius reaches one row past either edge; those points sit on the edge.
    let y = if step <= Q1 {
        Y_TOP.saturating_sub(s(Q1 - step) / Y_DIV)
    } else if step < Q2 {
        Y_BOTTOM + s(step - Q1) / Y_DIV
    } else if step <= Q3 {
        Y_BOTTOM + s(Q3 - step) / Y_DIV
    } else {
        Y_TOP.saturating_sub(s(step - Q3) / Y_DIV)
    };
    (x, y.min(HEIGHT - 1))
}

/// Draws the dial outline.
pub fn draw_circle<C: Canvas>(canvas: &mut C) -> Result<(), DrawError<C::Error>> {
    outline(canvas, true)
}

/// Removes the dial outline.
pub fn erase_circle<C: Canvas>(canvas: &mut C) -> Result<(), DrawError<C::Error>> {
    outline(canvas, false)
}

fn outline<C: Canvas>(canvas: &mut C, on: bool) -> Result<(), DrawError<C::Error>> {
    for step in 0..DIAL_STEPS {
        let (x, y) = dial_point(step);
        canvas.put_pixel(x, y, on)?;
    }
    Ok(())
}

/// Encoder resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderGeometry {
    /// Counts per shaft revolution, quadrature included.
    pub counts_per_rev: u32,
}

impl Default for EncoderGeometry {
    /// 360 lines in x4 quadrature.
    fn default() -> Self {
        EncoderGeometry {
            counts_per_rev: 1440,
        }
    }
}

impl EncoderGeometry {
    /// Geometry for `counts_per_rev` counts per revolution. Zero is treated as one.
    pub const fn new(counts_per_rev: u32) -> Self {
        EncoderGeometry {
            counts_per_rev: if counts_per_rev == 0 { 1 } else { counts_per_rev },
        }
    }

    fn cpr(&self) -> i64 {
        i64::from(self.counts_per_rev.max(1))
    }

    /// Whole revolutions and the counts left over, both truncated towards zero.
    pub fn split(&self, count: i32) -> (i32, i32) {
        let count = i64::from(count);
        ((count / self.cpr()) as i32, (count % self.cpr()) as i32)
    }

    /// Angle within the current revolution, rounded to the nearest degree with halves away
    /// from zero.
    pub fn degrees(&self, count: i32) -> i32 {
        let (_, rem) = self.split(count);
        let half = self.cpr() / 2;
        let scaled = i64::from(rem) * 360;
        let rounded = if scaled < 0 {
            (scaled - half) / self.cpr()
        } else {
            (scaled + half) / self.cpr()
        };
        rounded as i32
    }

    /// Dial step of the angle within the current revolution.
    pub fn dial_step(&self, count: i32) -> u16 {
        let (_, rem) = self.split(count);
        let step = i64::from(rem) * i64::from(DIAL_STEPS) / self.cpr();
        step.rem_euclid(i64::from(DIAL_STEPS)) as u16
    }

    /// Lit bar cells for `count`. Each bank row holds one revolution of [`WIDTH`] cells and
    /// the display wraps every six revolutions.
    pub fn bar_cells(&self, count: i32) -> BarFill {
        let (revs, rem) = self.split(count);
        let rows = i64::from(revs % i32::from(BANKS));
        let cols = i64::from(rem) * i64::from(WIDTH) / self.cpr();
        let cells = (rows * i64::from(WIDTH) + cols).unsigned_abs() as u16;
        if count < 0 {
            BarFill::Negative(cells)
        } else {
            BarFill::Positive(cells)
        }
    }

    /// Formats `count` as whole revolutions and degrees.
    pub fn describe(&self, count: i32) -> Displacement {
        Displacement {
            revolutions: self.split(count).0,
            degrees: self.degrees(count),
        }
    }
}

/// Revolutions and angle of a displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Displacement {
    /// Whole revolutions.
    pub revolutions: i32,
    /// Degrees within the revolution.
    pub degrees: i32,
}

impl fmt::Display for Displacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rev: {} Angle: {} deg", self.revolutions, self.degrees)
    }
}

/// How much of the bar display is lit. Positive positions fill from the top left, negative ones
/// from the bottom right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BarFill {
    /// Cells lit in reading order.
    Positive(u16),
    /// Cells lit backwards from the last one.
    Negative(u16),
}

impl BarFill {
    fn cells(self) -> u16 {
        match self {
            BarFill::Positive(n) | BarFill::Negative(n) => n,
        }
    }

    fn same_side(self, other: BarFill) -> bool {
        matches!(
            (self, other),
            (BarFill::Positive(_), BarFill::Positive(_)) | (BarFill::Negative(_), BarFill::Negative(_))
        )
    }

    fn cell_position(self, index: u16) -> (u8, u8) {
        let total = u16::from(WIDTH) * u16::from(BANKS);
        let i = match self {
            BarFill::Positive(_) => index,
            BarFill::Negative(_) => total - 1 - index,
        };
        ((i % u16::from(WIDTH)) as u8, (i / u16::from(WIDTH)) as u8)
    }
}

fn draw_cell<C: Canvas>(canvas: &mut C, x: u8, bank: u8, on: bool) -> Result<(), DrawError<C::Error>> {
    // Rows 1 to 6 of the bank, leaving a gap between bars.
    for y in bank * 8 + 1..bank * 8 + 7 {
        canvas.put_pixel(x, y, on)?;
    }
    Ok(())
}

/// Hand on the dial, redrawn only when it moves.
#[derive(Debug, Default)]
pub struct AngleDial {
    last: Option<u16>,
}

impl AngleDial {
    /// Dial with no hand drawn.
    pub const fn new() -> Self {
        AngleDial { last: None }
    }

    /// Points the hand at `step`. Returns `true` if anything was drawn.
    pub fn update<C: Canvas>(&mut self, canvas: &mut C, step: u16) -> Result<bool, DrawError<C::Error>> {
        let step = step % DIAL_STEPS;
        if self.last == Some(step) {
            return Ok(false);
        }
        self.erase(canvas)?;
        let (x, y) = dial_point(step);
        canvas.line(X_RIGHT, Y_TOP, x, y, true)?;
        self.last = Some(step);
        Ok(true)
    }

    /// Removes the hand, leaving the outline intact.
    pub fn erase<C: Canvas>(&mut self, canvas: &mut C) -> Result<(), DrawError<C::Error>> {
        if let Some(old) = self.last.take() {
            let (x, y) = dial_point(old);
            canvas.line(X_RIGHT, Y_TOP, x, y, false)?;
            // the hand's tip sits on the outline
            canvas.set_pixel(x, y)?;
        }
        Ok(())
    }

    /// Forgets the hand, e.g. after the screen was cleared.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Progress bars, one row per revolution.
#[derive(Debug)]
pub struct ProgressBars {
    last: BarFill,
}

impl Default for ProgressBars {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBars {
    /// Empty bars.
    pub const fn new() -> Self {
        ProgressBars {
            last: BarFill::Positive(0),
        }
    }

    /// Shows `fill`, touching only cells that change. Crossing zero clears the screen.
    pub fn update<C: Canvas>(&mut self, canvas: &mut C, fill: BarFill) -> Result<bool, DrawError<C::Error>> {
        if fill == self.last {
            return Ok(false);
        }
        if !fill.same_side(self.last) {
            canvas.clear()?;
            self.last = match fill {
                BarFill::Positive(_) => BarFill::Positive(0),
                BarFill::Negative(_) => BarFill::Negative(0),
            };
        }
        let (from, to) = (self.last.cells(), fill.cells());
        let (range, on) = if to > from { (from..to, true) } else { (to..from, false) };
        for i in range {
            let (x, bank) = fill.cell_position(i);
            draw_cell(canvas, x, bank, on)?;
        }
        self.last = fill;
        Ok(true)
    }

    /// Forgets what was drawn, e.g. after the screen was cleared.
    pub fn reset(&mut self) {
        self.last = BarFill::Positive(0);
    }
}

/// Which way the position is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayMode {
    /// Hand on a dial.
    Dial,
    /// Progress bars.
    Bars,
}

impl TryFrom<i32> for DisplayMode {
    type Error = i32;

    fn try_from(mode: i32) -> Result<Self, i32> {
        match mode {
            0 => Ok(DisplayMode::Dial),
            1 => Ok(DisplayMode::Bars),
            other => Err(other),
        }
    }
}

/// Everything the display needs to remember between refreshes.
#[derive(Debug)]
pub struct EncoderView {
    geometry: EncoderGeometry,
    mode: DisplayMode,
    home: i32,
    dial: AngleDial,
    bars: ProgressBars,
}

impl EncoderView {
    /// Dial view with home at zero.
    pub const fn new(geometry: EncoderGeometry) -> Self {
        EncoderView {
            geometry,
            mode: DisplayMode::Dial,
            home: 0,
            dial: AngleDial::new(),
            bars: ProgressBars::new(),
        }
    }

    /// Encoder resolution.
    pub fn geometry(&self) -> EncoderGeometry {
        self.geometry
    }

    /// Current mode.
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Count that reads as position zero.
    pub fn home(&self) -> i32 {
        self.home
    }

    /// Moves home.
    pub fn set_home(&mut self, home: i32) {
        self.home = home;
    }

    /// Position relative to home.
    pub fn position(&self, count: i32) -> i32 {
        count.wrapping_sub(self.home)
    }

    /// Switches mode and redraws the frame.
    pub fn set_mode<C: Canvas>(&mut self, canvas: &mut C, mode: DisplayMode) -> Result<(), DrawError<C::Error>> {
        self.mode = mode;
        self.redraw_frame(canvas)
    }

    /// Clears the screen and draws the empty frame for the current mode.
    pub fn redraw_frame<C: Canvas>(&mut self, canvas: &mut C) -> Result<(), DrawError<C::Error>> {
        canvas.clear()?;
        self.dial.reset();
        self.bars.reset();
        if self.mode == DisplayMode::Dial {
            draw_circle(canvas)?;
        }
        Ok(())
    }

    /// Shows the raw counter value `count`.
    pub fn refresh<C: Canvas>(&mut self, canvas: &mut C, count: i32) -> Result<bool, DrawError<C::Error>> {
        let pos = self.position(count);
        match self.mode {
            DisplayMode::Dial => self.dial.update(canvas, self.geometry.dial_step(pos)),
            DisplayMode::Bars => self.bars.update(canvas, self.geometry.bar_cells(pos)),
        }
    }
}
