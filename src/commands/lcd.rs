//! Drawing commands for the 84x48 LCD.

use crate::cmd::{CmdData, Command, ErrorCode, Fault, Full, Interpreter};
use crate::drivers::pcd8544::{Canvas, DrawError};

use super::draw_fault;

/// Messages of this set, in fault order.
pub const ERRORS: [&str; 3] = [
    "coordinate off screen",
    "LCD write failed",
    "isV must be 0 or 1",
];

const OFF_SCREEN: Fault = Fault(0);
const BUS: Fault = Fault(1);
const BAD_ORIENTATION: Fault = Fault(2);

/// Gives the drawing commands a canvas.
pub trait LcdContext {
    /// The display.
    type Lcd: Canvas;

    /// The display.
    fn lcd(&mut self) -> &mut Self::Lcd;
}

/// Registers `nokClear`, `nokSetPix`, `nokClearPix`, `nokScrnLine` and `nokLine`.
pub fn register<C: LcdContext, const CMDS: usize, const ERRS: usize>(
    interp: &mut Interpreter<C, CMDS, ERRS>,
) -> Result<ErrorCode, Full> {
    interp.register_set(
        &ERRORS,
        &[
            Command::new("nokClear", 0, clear::<C>),
            Command::new("nokSetPix", 2, set_pixel::<C>),
            Command::new("nokClearPix", 2, clear_pixel::<C>),
            Command::new("nokScrnLine", 2, screen_line::<C>),
            Command::new("nokLine", 4, line::<C>),
        ],
    )
}

fn fault<E>(e: DrawError<E>) -> Fault {
    draw_fault(e, OFF_SCREEN, BUS)
}

fn clear<C: LcdContext>(ctx: &mut C, _: &mut CmdData) -> Result<(), Fault> {
    ctx.lcd().clear().map_err(fault)
}

fn put<C: LcdContext>(ctx: &mut C, data: &CmdData, on: bool) -> Result<(), Fault> {
    let x = data.arg_u8(0, OFF_SCREEN)?;
    let y = data.arg_u8(1, OFF_SCREEN)?;
    ctx.lcd().put_pixel(x, y, on).map_err(fault)
}

fn set_pixel<C: LcdContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    put(ctx, data, true)
}

fn clear_pixel<C: LcdContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    put(ctx, data, false)
}

fn screen_line<C: LcdContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let pos = data.arg_u8(0, OFF_SCREEN)?;
    let vertical = data.arg_in(1, 0..=1, BAD_ORIENTATION)? == 1;
    ctx.lcd().screen_line(pos, vertical).map_err(fault)
}

fn line<C: LcdContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let mut p = [0u8; 4];
    for (i, v) in p.iter_mut().enumerate() {
        *v = data.arg_u8(i, OFF_SCREEN)?;
    }
    let [x0, y0, x1, y1] = p;
    ctx.lcd().line(x0, y0, x1, y1, true).map_err(fault)
}
