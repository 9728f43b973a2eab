//! Encoder commands: LS7366R counter access and the LCD encoder display.
//!
//! | Command | Arguments | Result |
//! |---|---|---|
//! | `fediReadReg` | register code | register contents |
//! | `fediRead` | | raw count |
//! | `fediClear` | | clears the count and home |
//! | `fediHome` | dir, msw, lsw | loads `±(msw·65536 + lsw)` as count and home |
//! | `fediFw` | | revolutions and angle from home |
//! | `fediDisp` | mode (0 dial, 1 bars) | redraws the display |
//! | `fediClr` | | clears the LCD and redraws the empty frame |

use embedded_hal::spi::SpiDevice;

use crate::cmd::{CmdData, CmdResult, Command, ErrorCode, Fault, Full, Interpreter};
use crate::drivers::ls7366::{self, Ls7366, Register};
use crate::drivers::pcd8544::{Canvas, DrawError};
use crate::fedi::{DisplayMode, EncoderView};

use super::draw_fault;

/// Messages of this set, in fault order.
pub const ERRORS: [&str; 4] = [
    "Invalid register specified",
    "encoder not responding",
    "mode must be 0=dial, 1=bars",
    "LCD write failed",
];

const BAD_REGISTER: Fault = Fault(0);
const COUNTER_BUS: Fault = Fault(1);
const BAD_MODE: Fault = Fault(2);
const LCD_BUS: Fault = Fault(3);

/// What the encoder commands work on.
pub struct EncoderParts<'a, SPI, L> {
    /// Quadrature counter.
    pub counter: &'a mut Ls7366<SPI>,
    /// Display state.
    pub view: &'a mut EncoderView,
    /// Display.
    pub lcd: &'a mut L,
}

/// Gives the encoder commands their counter, view and display.
pub trait EncoderContext {
    /// Counter's SPI device.
    type Spi: SpiDevice;
    /// Display.
    type Lcd: Canvas;

    /// Borrows the parts.
    fn encoder(&mut self) -> EncoderParts<'_, Self::Spi, Self::Lcd>;
}

/// Registers the `fedi*` commands.
pub fn register<C: EncoderContext, const CMDS: usize, const ERRS: usize>(
    interp: &mut Interpreter<C, CMDS, ERRS>,
) -> Result<ErrorCode, Full> {
    interp.register_set(
        &ERRORS,
        &[
            Command::new("fediReadReg", 1, read_reg::<C>),
            Command::new("fediRead", 0, read::<C>),
            Command::new("fediClear", 0, clear::<C>),
            Command::new("fediHome", 3, home::<C>),
            Command::new("fediFw", 0, firmware::<C>),
            Command::new("fediDisp", 1, display::<C>),
            Command::new("fediClr", 0, redraw::<C>),
        ],
    )
}

fn counter_fault<E>(e: ls7366::Error<E>) -> Fault {
    match e {
        ls7366::Error::BadRegister(_) => BAD_REGISTER,
        ls7366::Error::Spi(_) => {
            warn!("LS7366R transfer failed");
            COUNTER_BUS
        }
    }
}

fn lcd_fault<E>(e: DrawError<E>) -> Fault {
    draw_fault(e, LCD_BUS, LCD_BUS)
}

fn read_reg<C: EncoderContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let code = data.arg_u8(0, BAD_REGISTER)?;
    let reg = Register::try_from(code).map_err(|_| BAD_REGISTER)?;
    let value = ctx.encoder().counter.read(reg).map_err(counter_fault)?;
    data.result = CmdResult::SLong(value.as_i32());
    Ok(())
}

fn read<C: EncoderContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let count = ctx.encoder().counter.count().map_err(counter_fault)?;
    data.result = CmdResult::SLong(count);
    Ok(())
}

fn clear<C: EncoderContext>(ctx: &mut C, _: &mut CmdData) -> Result<(), Fault> {
    let parts = ctx.encoder();
    parts.counter.clear(Register::Cntr).map_err(counter_fault)?;
    parts.view.set_home(0);
    Ok(())
}

fn home<C: EncoderContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let magnitude = (data.arg(1) as u16 as i32)
        .wrapping_mul(65_536)
        .wrapping_add(data.arg(2) as u16 as i32);
    let pos = if data.arg(0) < 0 {
        magnitude.wrapping_neg()
    } else {
        magnitude
    };
    let parts = ctx.encoder();
    parts.counter.set_count(pos).map_err(counter_fault)?;
    parts.view.set_home(pos);
    data.result = CmdResult::SLong(pos);
    Ok(())
}

fn firmware<C: EncoderContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let parts = ctx.encoder();
    let count = parts.counter.count().map_err(counter_fault)?;
    let shown = parts.view.geometry().describe(parts.view.position(count));
    data.set_text(format_args!("{}", shown));
    Ok(())
}

fn display<C: EncoderContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let mode = DisplayMode::try_from(data.arg(0)).map_err(|_| BAD_MODE)?;
    let parts = ctx.encoder();
    parts.view.set_mode(parts.lcd, mode).map_err(lcd_fault)
}

fn redraw<C: EncoderContext>(ctx: &mut C, _: &mut CmdData) -> Result<(), Fault> {
    let parts = ctx.encoder();
    parts.view.redraw_frame(parts.lcd).map_err(lcd_fault)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::pcd8544::FrameBuffer;
    use crate::fedi::EncoderGeometry;
    use crate::test_util::SpiMock;

    struct Bench {
        counter: Ls7366<SpiMock>,
        view: EncoderView,
        lcd: FrameBuffer,
    }

    impl EncoderContext for Bench {
        type Spi = SpiMock;
        type Lcd = FrameBuffer;

        fn encoder(&mut self) -> EncoderParts<'_, SpiMock, FrameBuffer> {
            EncoderParts {
                counter: &mut self.counter,
                view: &mut self.view,
                lcd: &mut self.lcd,
            }
        }
    }

    fn setup() -> (Interpreter<Bench, 8, 16>, ErrorCode, Bench) {
        let mut i = Interpreter::new().unwrap();
        let base = register(&mut i).unwrap();
        let bench = Bench {
            counter: Ls7366::new(SpiMock::default()),
            view: EncoderView::new(EncoderGeometry::default()),
            lcd: FrameBuffer::new(),
        };
        (i, base, bench)
    }

    fn spi(b: &mut Bench) -> &mut SpiMock {
        b.counter.spi_mut()
    }

    #[test]
    fn read_count_and_registers() {
        let (interp, base, mut b) = setup();
        spi(&mut b).reply(&[0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(interp.execute(&mut b, "fediRead").result, CmdResult::SLong(-2));

        spi(&mut b).reply(&[0x03]);
        let out = interp.execute(&mut b, "fediReadReg 0x08");
        assert_eq!(out.result, CmdResult::SLong(3));
        assert_eq!(spi(&mut b).transactions.last().unwrap()[0], 0x48);

        assert_eq!(interp.execute(&mut b, "fediReadReg 0x09").code, base);
        assert_eq!(interp.message(base), "Invalid register specified");
    }

    #[test]
    fn home_loads_count() {
        let (interp, _, mut b) = setup();
        let out = interp.execute(&mut b, "fediHome -1 1 2");
        assert_eq!(out.result, CmdResult::SLong(-65_538));
        assert_eq!(b.view.home(), -65_538);
        let writes = &spi(&mut b).transactions;
        let n = writes.len();
        assert_eq!(writes[n - 2], vec![0x98, 0xFF, 0xFE, 0xFF, 0xFE]);
        assert_eq!(writes[n - 1], vec![0xE0]);

        interp.execute(&mut b, "fediClear");
        assert_eq!(b.view.home(), 0);
        assert_eq!(spi(&mut b).transactions.last().unwrap(), &vec![0x20]);
    }

    #[test]
    fn revolutions_from_home() {
        let (interp, _, mut b) = setup();
        b.view.set_home(100);
        // 100 + 1440 + 360 = 1900
        spi(&mut b).reply(&[0, 0, 0x07, 0x6C]);
        let out = interp.execute(&mut b, "fediFw");
        assert_eq!(out.result.to_string(), "Rev: 1 Angle: 90 deg");
    }

    #[test]
    fn display_modes() {
        let (interp, base, mut b) = setup();
        interp.execute(&mut b, "fediDisp 0");
        assert!(b.lcd.lit() > 100);
        interp.execute(&mut b, "fediDisp 1");
        assert_eq!(b.view.mode(), DisplayMode::Bars);
        assert_eq!(b.lcd.lit(), 0);
        assert_eq!(interp.execute(&mut b, "fediDisp 2").code, ErrorCode(base.0 + 2));
        b.lcd.set_pixel(1, 1).unwrap();
        interp.execute(&mut b, "fediClr");
        assert_eq!(b.lcd.lit(), 0);
    }
}
