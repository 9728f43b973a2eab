//! PCD8544 controller of the Nokia 5110 LCD, on SPI with a separate data/command pin.
//!
//! The panel is 84 columns by 48 rows. Rows are grouped in six banks of eight, and one byte of
//! display RAM covers one column of one bank, least significant bit on top. The controller
//! cannot be read back, so the driver keeps a shadow [`FrameBuffer`] and rewrites whole bytes.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

/// Columns.
pub const WIDTH: u8 = 84;
/// Rows.
pub const HEIGHT: u8 = 48;
/// Banks of eight rows.
pub const BANKS: u8 = HEIGHT / 8;

const EXTENDED_INSTR: u8 = 0x21;
const SET_VOP: u8 = 0xBC;
const TEMP_COEFF: u8 = 0x04;
const BIAS: u8 = 0x15;
const BASIC_INSTR: u8 = 0x20;
const VERTICAL_ADDRESSING: u8 = 0x22;
const NORMAL_DISPLAY: u8 = 0x0C;
const SET_Y: u8 = 0x40;
const SET_X: u8 = 0x80;

/// Why drawing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DrawError<E> {
    /// A coordinate is off the panel. Nothing was drawn.
    OutOfRange,
    /// The device could not be written.
    Bus(E),
}

/// Something 84 by 48 pixels that can be drawn on.
pub trait Canvas {
    /// Device error.
    type Error;

    /// Width and height in pixels.
    fn size(&self) -> (u8, u8) {
        (WIDTH, HEIGHT)
    }

    /// Current state of a pixel. Off-panel pixels read as off.
    fn pixel(&self, x: u8, y: u8) -> bool;

    /// Turns a pixel on or off.
    fn put_pixel(&mut self, x: u8, y: u8, on: bool) -> Result<(), DrawError<Self::Error>>;

    /// Turns every pixel off.
    fn clear(&mut self) -> Result<(), DrawError<Self::Error>>;

    /// Turns a pixel on.
    fn set_pixel(&mut self, x: u8, y: u8) -> Result<(), DrawError<Self::Error>> {
        self.put_pixel(x, y, true)
    }

    /// Turns a pixel off.
    fn clear_pixel(&mut self, x: u8, y: u8) -> Result<(), DrawError<Self::Error>> {
        self.put_pixel(x, y, false)
    }

    /// Line across the whole panel: column `pos` if `vertical`, row `pos` otherwise.
    fn screen_line(&mut self, pos: u8, vertical: bool) -> Result<(), DrawError<Self::Error>> {
        let (w, h) = self.size();
        if vertical {
            self.line(pos, 0, pos, h - 1, true)
        } else {
            self.line(0, pos, w - 1, pos, true)
        }
    }

    /// Straight line, both ends included.
    fn line(&mut self, x0: u8, y0: u8, x1: u8, y1: u8, on: bool) -> Result<(), DrawError<Self::Error>> {
        let (w, h) = self.size();
        if x0 >= w || x1 >= w || y0 >= h || y1 >= h {
            return Err(DrawError::OutOfRange);
        }
        for (x, y) in LinePoints::new(x0, y0, x1, y1) {
            self.put_pixel(x, y, on)?;
        }
        Ok(())
    }
}

/// Pixels of a straight line from one point to another, both included.
#[derive(Debug, Clone)]
pub struct LinePoints {
    x: i16,
    y: i16,
    x1: i16,
    y1: i16,
    dx: i16,
    dy: i16,
    sx: i16,
    sy: i16,
    err: i16,
    done: bool,
}

impl LinePoints {
    /// Line from `(x0, y0)` to `(x1, y1)`.
    pub fn new(x0: u8, y0: u8, x1: u8, y1: u8) -> Self {
        let (x0, y0, x1, y1) = (i16::from(x0), i16::from(y0), i16::from(x1), i16::from(y1));
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        LinePoints {
            x: x0,
            y: y0,
            x1,
            y1,
            dx,
            dy,
            sx: if x0 < x1 { 1 } else { -1 },
            sy: if y0 < y1 { 1 } else { -1 },
            err: dx + dy,
            done: false,
        }
    }
}

impl Iterator for LinePoints {
    type Item = (u8, u8);

    fn next(&mut self) -> Option<(u8, u8)> {
        if self.done {
            return None;
        }
        let point = (self.x as u8, self.y as u8);
        if self.x == self.x1 && self.y == self.y1 {
            self.done = true;
        } else {
            let e2 = 2 * self.err;
            if e2 >= self.dy {
                self.err += self.dy;
                self.x += self.sx;
            }
            if e2 <= self.dx {
                self.err += self.dx;
                self.y += self.sy;
            }
        }
        Some(point)
    }
}

/// Display RAM image, one byte per column per bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    columns: [[u8; BANKS as usize]; WIDTH as usize],
}

impl FrameBuffer {
    /// Blank image.
    pub const fn new() -> Self {
        FrameBuffer {
            columns: [[0; BANKS as usize]; WIDTH as usize],
        }
    }

    /// Byte of column `x` in `bank`.
    pub fn column(&self, x: u8, bank: u8) -> u8 {
        self.columns
            .get(usize::from(x))
            .and_then(|c| c.get(usize::from(bank)))
            .copied()
            .unwrap_or(0)
    }

    fn update(&mut self, x: u8, y: u8, on: bool) -> Option<u8> {
        let byte = self
            .columns
            .get_mut(usize::from(x))?
            .get_mut(usize::from(y / 8))?;
        let bit = 1 << (y % 8);
        if on {
            *byte |= bit;
        } else {
            *byte &= !bit;
        }
        Some(*byte)
    }

    fn fill_column(&mut self, x: u8) {
        if let Some(col) = self.columns.get_mut(usize::from(x)) {
            *col = [0xFF; BANKS as usize];
        }
    }

    fn blank(&mut self) {
        self.columns = [[0; BANKS as usize]; WIDTH as usize];
    }

    /// Number of lit pixels.
    pub fn lit(&self) -> u32 {
        self.columns.iter().flatten().map(|b| b.count_ones()).sum()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas for FrameBuffer {
    type Error = core::convert::Infallible;

    fn pixel(&self, x: u8, y: u8) -> bool {
        y < HEIGHT && self.column(x, y / 8) & (1 << (y % 8)) != 0
    }

    fn put_pixel(&mut self, x: u8, y: u8, on: bool) -> Result<(), DrawError<Self::Error>> {
        if x >= WIDTH || y >= HEIGHT {
            return Err(DrawError::OutOfRange);
        }
        self.update(x, y, on);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DrawError<Self::Error>> {
        self.blank();
        Ok(())
    }
}

/// Bus errors of the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<S, P> {
    /// SPI transfer failed.
    Spi(S),
    /// The data/command pin could not be driven.
    Pin(P),
}

/// PCD8544 driver.
pub struct Pcd8544<SPI, DC> {
    spi: SPI,
    dc: DC,
    fb: FrameBuffer,
}

type Result8544<SPI, DC> =
    Result<(), DrawError<Error<<SPI as embedded_hal::spi::ErrorType>::Error, <DC as embedded_hal::digital::ErrorType>::Error>>>;

impl<SPI: SpiDevice, DC: OutputPin> Pcd8544<SPI, DC> {
    /// Wraps the bus and the data/command pin. The panel is not touched.
    pub fn new(spi: SPI, dc: DC) -> Self {
        Pcd8544 {
            spi,
            dc,
            fb: FrameBuffer::new(),
        }
    }

    /// Gives the bus and pin back.
    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }

    /// Shadow of the display RAM.
    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.fb
    }

    /// Sets contrast, temperature coefficient and bias, selects normal mode and clears.
    pub fn init(&mut self) -> Result8544<SPI, DC> {
        self.commands(&[
            EXTENDED_INSTR,
            SET_VOP,
            TEMP_COEFF,
            BIAS,
            BASIC_INSTR,
            NORMAL_DISPLAY,
        ])?;
        self.clear()?;
        info!("PCD8544 ready");
        Ok(())
    }

    /// Sends the shadow byte of column `x` in `bank` to the panel.
    pub fn flush_column(&mut self, x: u8, bank: u8) -> Result8544<SPI, DC> {
        if x >= WIDTH || bank >= BANKS {
            return Err(DrawError::OutOfRange);
        }
        self.commands(&[SET_X | x, SET_Y | bank])?;
        self.data(&[self.fb.column(x, bank)])
    }

    /// Rewrites the whole panel from the shadow.
    pub fn flush(&mut self) -> Result8544<SPI, DC> {
        self.commands(&[BASIC_INSTR, SET_Y, SET_X])?;
        for bank in 0..BANKS {
            let mut row = [0u8; WIDTH as usize];
            for (x, b) in (0..WIDTH).zip(row.iter_mut()) {
                *b = self.fb.column(x, bank);
            }
            self.data(&row)?;
        }
        Ok(())
    }

    fn commands(&mut self, bytes: &[u8]) -> Result8544<SPI, DC> {
        self.send(false, bytes)
    }

    fn data(&mut self, bytes: &[u8]) -> Result8544<SPI, DC> {
        self.send(true, bytes)
    }

    fn send(&mut self, data: bool, bytes: &[u8]) -> Result8544<SPI, DC> {
        let level = if data {
            self.dc.set_high()
        } else {
            self.dc.set_low()
        };
        if let Err(e) = level {
            return Err(DrawError::Bus(Error::Pin(e)));
        }
        self.spi
            .write(bytes)
            .map_err(|e| DrawError::Bus(Error::Spi(e)))
    }
}

impl<SPI: SpiDevice, DC: OutputPin> Canvas for Pcd8544<SPI, DC> {
    type Error = Error<SPI::Error, DC::Error>;

    fn pixel(&self, x: u8, y: u8) -> bool {
        self.fb.pixel(x, y)
    }

    fn put_pixel(&mut self, x: u8, y: u8, on: bool) -> Result<(), DrawError<Self::Error>> {
        if x >= WIDTH || y >= HEIGHT {
            return Err(DrawError::OutOfRange);
        }
        self.fb.update(x, y, on);
        self.flush_column(x, y / 8)
    }

    fn clear(&mut self) -> Result<(), DrawError<Self::Error>> {
        self.fb.blank();
        self.flush()
    }

    fn screen_line(&mut self, pos: u8, vertical: bool) -> Result<(), DrawError<Self::Error>> {
        if vertical {
            if pos >= WIDTH {
                return Err(DrawError::OutOfRange);
            }
            self.fb.fill_column(pos);
            self.commands(&[VERTICAL_ADDRESSING, SET_Y, SET_X | pos])?;
            self.data(&[0xFF; BANKS as usize])?;
            self.commands(&[BASIC_INSTR])
        } else {
            if pos >= HEIGHT {
                return Err(DrawError::OutOfRange);
            }
            let bank = pos / 8;
            let mut row = [0u8; WIDTH as usize];
            for (x, b) in (0..WIDTH).zip(row.iter_mut()) {
                *b = self.fb.update(x, pos, true).unwrap_or(0);
            }
            self.commands(&[BASIC_INSTR, SET_Y | bank, SET_X])?;
            self.data(&row)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{PinMock, SpiMock};

    fn lcd() -> Pcd8544<SpiMock, PinMock> {
        Pcd8544::new(SpiMock::default(), PinMock::default())
    }

    #[test]
    fn init_sends_setup_then_blank_ram() {
        let mut lcd = lcd();
        lcd.init().unwrap();
        let (spi, dc) = lcd.release();
        assert_eq!(spi.transactions[0], [0x21, 0xBC, 0x04, 0x15, 0x20, 0x0C]);
        assert_eq!(spi.transactions[1], [0x20, 0x40, 0x80]);
        let data: usize = spi.transactions[2..].iter().map(|t| t.len()).sum();
        assert_eq!(data, 504);
        assert!(spi.transactions[2..].iter().flatten().all(|&b| b == 0));
        assert_eq!(dc.history, [false, false, true, true, true, true, true, true]);
    }

    #[test]
    fn pixel_rewrites_its_whole_byte() {
        let mut lcd = lcd();
        lcd.set_pixel(10, 9).unwrap();
        lcd.set_pixel(10, 15).unwrap();
        lcd.clear_pixel(10, 9).unwrap();
        assert!(lcd.pixel(10, 15));
        assert!(!lcd.pixel(10, 9));
        let (spi, _) = lcd.release();
        assert_eq!(spi.transactions[0], [0x80 | 10, 0x40 | 1]);
        assert_eq!(spi.transactions[1], [0x02]);
        assert_eq!(spi.transactions[3], [0x82]);
        assert_eq!(spi.transactions[5], [0x80]);
    }

    #[test]
    fn off_panel_is_rejected_without_bus_traffic() {
        let mut lcd = lcd();
        assert_eq!(lcd.set_pixel(84, 0), Err(DrawError::OutOfRange));
        assert_eq!(lcd.set_pixel(0, 48), Err(DrawError::OutOfRange));
        assert_eq!(lcd.line(0, 0, 10, 48, true), Err(DrawError::OutOfRange));
        assert_eq!(lcd.screen_line(84, true), Err(DrawError::OutOfRange));
        assert_eq!(lcd.screen_line(48, false), Err(DrawError::OutOfRange));
        assert!(lcd.release().0.transactions.is_empty());
    }

    #[test]
    fn screen_lines() {
        let mut lcd = lcd();
        lcd.screen_line(5, true).unwrap();
        lcd.screen_line(20, false).unwrap();
        let fb = lcd.framebuffer();
        assert!((0..HEIGHT).all(|y| fb.pixel(5, y)));
        assert!((0..WIDTH).all(|x| fb.pixel(x, 20)));
        assert_eq!(fb.lit(), 48 + 84 - 1);
        let (spi, _) = lcd.release();
        assert_eq!(spi.transactions[0], [0x22, 0x40, 0x85]);
        assert_eq!(spi.transactions[1], [0xFF; 6]);
        assert_eq!(spi.transactions[3], [0x20, 0x42, 0x80]);
        assert_eq!(spi.transactions[4][5], 0xFF);
        assert_eq!(spi.transactions[4][6], 0x10);
    }

    #[test]
    fn lines_include_both_ends() {
        let mut fb = FrameBuffer::new();
        fb.line(0, 0, 83, 47, true).unwrap();
        assert!(fb.pixel(0, 0));
        assert!(fb.pixel(83, 47));
        assert_eq!(fb.lit(), 84);

        let mut fb = FrameBuffer::new();
        fb.line(40, 30, 40, 10, true).unwrap();
        assert_eq!(fb.lit(), 21);
        fb.line(40, 30, 40, 10, false).unwrap();
        assert_eq!(fb.lit(), 0);

        let points: Vec<_> = LinePoints::new(3, 3, 3, 3).collect();
        assert_eq!(points, [(3, 3)]);
    }

    #[test]
    fn steep_line_is_continuous() {
        let points: Vec<_> = LinePoints::new(10, 0, 13, 20).collect();
        assert_eq!(points.len(), 21);
        for pair in points.windows(2) {
            assert_eq!(pair[1].1, pair[0].1 + 1);
            assert!(pair[1].0 >= pair[0].0 && pair[1].0 - pair[0].0 <= 1);
        }
    }
}
