//! Pixy2 camera commands.
//!
//! `pixyVector continuous mode` reads the first line the camera tracks. `mode` picks what is
//! shown: [`VectorMode::TEXT`] reports it, [`VectorMode::DRAW`] puts it on the display and
//! [`VectorMode::ANGLE`] swaps the end points for the line's heading. With `continuous` set the
//! command also arms a [`VectorStream`], which the application samples from a timer through
//! [`poll_stream`] until the console sees Enter.

use embedded_hal::i2c::I2c;

use crate::cmd::{format_text, CmdData, CmdResult, Command, ErrorCode, Fault, Full, Interpreter, Text};
use crate::drivers::pcd8544::Canvas;
use crate::drivers::pixy2::{self, Pixy2, Vector, VectorTracker};

use super::draw_fault;

/// Messages of this set, in fault order.
pub const ERRORS: [&str; 8] = [
    "camera not responding",
    "camera reply out of sync",
    "camera checksum error",
    "no vector in view",
    "lamp must be 0=off, 1=on",
    "LCD write failed",
    "continuous must be 0=once, 1=stream",
    "display mode must be 0..7",
];

const BUS: Fault = Fault(0);
const SYNC: Fault = Fault(1);
const CHECKSUM: Fault = Fault(2);
const NO_VECTOR: Fault = Fault(3);
const BAD_LAMP: Fault = Fault(4);
const LCD: Fault = Fault(5);
const BAD_CONTINUOUS: Fault = Fault(6);
const BAD_MODE: Fault = Fault(7);

bitflags::bitflags! {
    /// How `pixyVector` shows a line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VectorMode: u8 {
        /// Report it as text.
        const TEXT = 0x01;
        /// Draw it on the display.
        const DRAW = 0x02;
        /// Show the heading instead of the end points.
        const ANGLE = 0x04;
    }
}

/// Continuous `pixyVector` state.
#[derive(Debug, Default)]
pub struct VectorStream {
    mode: Option<VectorMode>,
    started: bool,
}

impl VectorStream {
    /// Stream that is not running.
    pub const fn new() -> Self {
        VectorStream {
            mode: None,
            started: false,
        }
    }

    /// Starts streaming with `mode`.
    pub fn start(&mut self, mode: VectorMode) {
        self.mode = Some(mode);
        self.started = true;
    }

    /// `true` once after each [`start`](Self::start), so the console can be switched over.
    pub fn take_started(&mut self) -> bool {
        core::mem::take(&mut self.started)
    }

    /// Stops streaming.
    pub fn stop(&mut self) {
        self.mode = None;
        self.started = false;
    }

    /// Mode of the running stream.
    pub fn mode(&self) -> Option<VectorMode> {
        self.mode
    }
}

/// What the camera commands work on.
pub struct PixyParts<'a, I2C, L> {
    /// The camera.
    pub camera: &'a mut Pixy2<I2C>,
    /// Last line drawn.
    pub tracker: &'a mut VectorTracker,
    /// Display to draw vectors on, if any.
    pub lcd: Option<&'a mut L>,
    /// Continuous sampling state.
    pub stream: &'a mut VectorStream,
}

/// Gives the camera commands their camera.
pub trait PixyContext {
    /// Camera bus.
    type I2c: I2c;
    /// Display.
    type Lcd: Canvas;

    /// Borrows the parts.
    fn pixy(&mut self) -> PixyParts<'_, Self::I2c, Self::Lcd>;
}

/// Registers `pixyVersion`, `pixyFps`, `pixyLamp` and `pixyVector`.
pub fn register<C: PixyContext, const CMDS: usize, const ERRS: usize>(
    interp: &mut Interpreter<C, CMDS, ERRS>,
) -> Result<ErrorCode, Full> {
    interp.register_set(
        &ERRORS,
        &[
            Command::new("pixyVersion", 0, version::<C>),
            Command::new("pixyFps", 0, fps::<C>),
            Command::new("pixyLamp", 2, lamp::<C>),
            Command::new("pixyVector", 2, vector::<C>),
        ],
    )
}

/// Takes one sample for a running stream. Returns the line to print when the stream shows
/// text. A fault stops the stream.
pub fn poll_stream<C: PixyContext>(ctx: &mut C) -> Result<Option<Text>, Fault> {
    let parts = ctx.pixy();
    let Some(mode) = parts.stream.mode() else {
        return Ok(None);
    };
    let stream = parts.stream;
    let shown = show_vector(parts.camera, parts.tracker, parts.lcd, mode);
    if shown.is_err() {
        stream.stop();
    }
    shown
}

fn camera_fault<E>(e: pixy2::Error<E>) -> Fault {
    match e {
        pixy2::Error::I2c(_) => {
            warn!("pixy bus error");
            BUS
        }
        pixy2::Error::BadSync => SYNC,
        pixy2::Error::BadChecksum => CHECKSUM,
        pixy2::Error::NoVector => NO_VECTOR,
    }
}

fn version<C: PixyContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let v = ctx.pixy().camera.version().map_err(camera_fault)?;
    data.set_text(format_args!(
        "HW {:X} FW {}.{}.{} {}",
        v.hardware, v.major, v.minor, v.build, v.firmware_type
    ));
    Ok(())
}

fn fps<C: PixyContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let fps = ctx.pixy().camera.fps().map_err(camera_fault)?;
    data.result = CmdResult::UInt(fps);
    Ok(())
}

fn lamp<C: PixyContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let upper = data.arg_in(0, 0..=1, BAD_LAMP)? == 1;
    let lower = data.arg_in(1, 0..=1, BAD_LAMP)? == 1;
    ctx.pixy().camera.set_lamp(upper, lower).map_err(camera_fault)
}

fn vector<C: PixyContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let continuous = data.arg_in(0, 0..=1, BAD_CONTINUOUS)? == 1;
    let bits = data.arg_in(1, 0..=7, BAD_MODE)? as u8;
    let mode = VectorMode::from_bits_truncate(bits);
    let parts = ctx.pixy();
    if let Some(text) = show_vector(parts.camera, parts.tracker, parts.lcd, mode)? {
        data.result = CmdResult::Text(text);
    }
    if continuous {
        debug!("pixy vector stream, mode {=u8}", bits);
        parts.stream.start(mode);
    }
    Ok(())
}

fn show_vector<I2C: I2c, L: Canvas>(
    camera: &mut Pixy2<I2C>,
    tracker: &mut VectorTracker,
    lcd: Option<&mut L>,
    mode: VectorMode,
) -> Result<Option<Text>, Fault> {
    let v = camera.main_vector().map_err(camera_fault)?;
    if let Some(lcd) = lcd.filter(|_| mode.contains(VectorMode::DRAW)) {
        let drawn = if mode.contains(VectorMode::ANGLE) {
            tracker.update_heading(lcd, &v)
        } else {
            tracker.update(lcd, &v)
        };
        drawn.map_err(|e| draw_fault(e, LCD, LCD))?;
    }
    Ok(mode.contains(VectorMode::TEXT).then(|| describe(&v, mode)))
}

fn describe(v: &Vector, mode: VectorMode) -> Text {
    if mode.contains(VectorMode::ANGLE) {
        format_text(format_args!("ANGLE={}", v.heading()))
    } else {
        format_text(format_args!("X1={} Y1={} X2={} Y2={}", v.x0, v.y0, v.x1, v.y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::pcd8544::FrameBuffer;
    use crate::test_util::I2cMock;

    struct Cam {
        camera: Pixy2<I2cMock>,
        tracker: VectorTracker,
        lcd: Option<FrameBuffer>,
        stream: VectorStream,
    }

    impl PixyContext for Cam {
        type I2c = I2cMock;
        type Lcd = FrameBuffer;

        fn pixy(&mut self) -> PixyParts<'_, I2cMock, FrameBuffer> {
            PixyParts {
                camera: &mut self.camera,
                tracker: &mut self.tracker,
                lcd: self.lcd.as_mut(),
                stream: &mut self.stream,
            }
        }
    }

    fn setup(lcd: bool) -> (Interpreter<Cam, 8, 16>, ErrorCode, Cam) {
        let mut i = Interpreter::new().unwrap();
        let base = register(&mut i).unwrap();
        let cam = Cam {
            camera: Pixy2::new(I2cMock::default()),
            tracker: VectorTracker::new(),
            lcd: lcd.then(FrameBuffer::new),
            stream: VectorStream::new(),
        };
        (i, base, cam)
    }

    // Tail (6, 10), head (6, 20): a line pointing straight down.
    const DOWN: [u8; 15] = [0xAF, 0xC1, 0x31, 0x12, 0, 0, 0x01, 0x06, 6, 10, 6, 20, 0, 0, 0];

    fn lit(cam: &Cam) -> u32 {
        cam.lcd.as_ref().unwrap().lit()
    }

    fn reply(kind: u8, payload: &[u8], total: usize) -> Vec<u8> {
        let sum: u16 = payload.iter().map(|&b| u16::from(b)).sum();
        let mut r = vec![0xAF, 0xC1, kind, payload.len() as u8];
        r.extend_from_slice(&sum.to_le_bytes());
        r.extend_from_slice(payload);
        r.resize(total, 0);
        r
    }

    #[test]
    fn version_and_fps() {
        let (interp, _, mut cam) = setup(false);
        let mut payload = vec![0x22, 0x00, 3, 0, 0x12, 0x00];
        payload.extend_from_slice(b"general\0\0\0");
        cam.camera.i2c_mut().reply(&reply(0x0F, &payload, 22));
        cam.camera.i2c_mut().reply(&reply(0x01, &60u32.to_le_bytes(), 10));
        let out = interp.execute(&mut cam, "pixyVersion");
        assert_eq!(out.result.to_string(), "HW 22 FW 3.0.18 general");
        assert_eq!(interp.execute(&mut cam, "pixyFps").result, CmdResult::UInt(60));
    }

    #[test]
    fn lamp_arguments() {
        let (interp, base, mut cam) = setup(false);
        cam.camera.i2c_mut().reply(&reply(0x01, &[0, 0, 0, 0], 10));
        assert!(interp.execute(&mut cam, "pixyLamp 1 0").code.is_success());
        assert_eq!(cam.camera.i2c_mut().writes[0].1, [0xAE, 0xC1, 0x16, 0x02, 1, 0]);
        assert_eq!(interp.execute(&mut cam, "pixyLamp 2 0").code, ErrorCode(base.0 + 4));
    }

    #[test]
    fn vector_text_and_drawing() {
        let (interp, base, mut cam) = setup(true);
        cam.camera.i2c_mut().reply(&DOWN);
        let out = interp.execute(&mut cam, "pixyVector 0 3");
        assert_eq!(out.result.to_string(), "X1=6 Y1=10 X2=6 Y2=20");
        assert_eq!(lit(&cam), 11);
        assert!(cam.stream.mode().is_none());

        let mut empty = DOWN;
        empty[7] = 0;
        cam.camera.i2c_mut().reply(&empty);
        assert_eq!(interp.execute(&mut cam, "pixyVector 0 3").code, ErrorCode(base.0 + 3));

        cam.camera.i2c_mut().nack = true;
        assert_eq!(interp.execute(&mut cam, "pixyFps").code, base);
    }

    #[test]
    fn text_bit_alone_leaves_display_untouched() {
        let (interp, _, mut cam) = setup(true);
        cam.camera.i2c_mut().reply(&DOWN);
        let out = interp.execute(&mut cam, "pixyVector 0 1");
        assert_eq!(out.result.to_string(), "X1=6 Y1=10 X2=6 Y2=20");
        assert_eq!(lit(&cam), 0);
    }

    #[test]
    fn draw_bit_alone_reports_nothing() {
        let (interp, _, mut cam) = setup(true);
        cam.camera.i2c_mut().reply(&DOWN);
        let out = interp.execute(&mut cam, "pixyVector 0 2");
        assert!(out.code.is_success());
        assert_eq!(out.result, CmdResult::None);
        assert!(cam.lcd.as_ref().unwrap().pixel(7, 15));
    }

    #[test]
    fn angle_bit_shows_heading() {
        let (interp, _, mut cam) = setup(true);
        cam.camera.i2c_mut().reply(&DOWN);
        let out = interp.execute(&mut cam, "pixyVector 0 5");
        assert_eq!(out.result.to_string(), "ANGLE=180");
        assert_eq!(lit(&cam), 0);

        cam.camera.i2c_mut().reply(&DOWN);
        let out = interp.execute(&mut cam, "pixyVector 0 6");
        assert_eq!(out.result, CmdResult::None);
        let lcd = cam.lcd.as_ref().unwrap();
        // hand tip at the bottom of the dial, no end-point line
        assert!(lcd.pixel(41, 47));
        assert!(!lcd.pixel(7, 15));
    }

    #[test]
    fn vector_arguments() {
        let (interp, base, mut cam) = setup(false);
        assert_eq!(interp.execute(&mut cam, "pixyVector 2 1").code, ErrorCode(base.0 + 6));
        assert_eq!(interp.execute(&mut cam, "pixyVector 0 8").code, ErrorCode(base.0 + 7));
        assert_eq!(interp.execute(&mut cam, "pixyVector 0").code, ErrorCode::MISSING_ARGS);
        assert!(cam.camera.i2c_mut().writes.is_empty());

        // drawing asked for but nothing to draw on
        cam.camera.i2c_mut().reply(&DOWN);
        assert!(interp.execute(&mut cam, "pixyVector 0 2").code.is_success());
    }

    #[test]
    fn stream_samples_until_a_fault() {
        let (interp, base, mut cam) = setup(false);
        assert_eq!(poll_stream(&mut cam), Ok(None));

        cam.camera.i2c_mut().reply(&DOWN);
        let out = interp.execute(&mut cam, "pixyVector 1 5");
        assert_eq!(out.result.to_string(), "ANGLE=180");
        assert_eq!(cam.stream.mode(), Some(VectorMode::TEXT | VectorMode::ANGLE));
        assert!(cam.stream.take_started());
        assert!(!cam.stream.take_started());

        let mut up = DOWN;
        up[9] = 20;
        up[11] = 10;
        cam.camera.i2c_mut().reply(&up);
        let line = poll_stream(&mut cam).unwrap().unwrap();
        assert_eq!(line.as_str(), "ANGLE=0");

        cam.camera.i2c_mut().nack = true;
        assert_eq!(poll_stream(&mut cam), Err(Fault(0)));
        assert!(cam.stream.mode().is_none());
        assert_eq!(poll_stream(&mut cam), Ok(None));
        assert_eq!(interp.message(base), ERRORS[0]);
    }
}
