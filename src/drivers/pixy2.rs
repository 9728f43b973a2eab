//! Pixy2 camera over I2C.
//!
//! Requests are `[0xAE, 0xC1, type, length, payload..]`. Replies start with `0xAF, 0xC1`, then
//! the reply type, the payload length and a little-endian 16-bit sum of the payload bytes.

use embedded_hal::i2c::I2c;
use heapless::String;

use super::pcd8544::{Canvas, DrawError, HEIGHT, WIDTH};
use crate::fedi::{draw_circle, erase_circle, AngleDial, DIAL_STEPS};
use crate::measure::atan2;

/// Default I2C address, as set in PixyMon.
pub const ADDRESS: u8 = 0x54;

const SYNC_SEND: [u8; 2] = [0xAE, 0xC1];
const SYNC_RECV: [u8; 2] = [0xAF, 0xC1];
const HEADER_LEN: usize = 6;

const VERSION_REQUEST: u8 = 0x0E;
const FPS_REQUEST: u8 = 0x18;
const LAMP_REQUEST: u8 = 0x16;
const MAIN_REQUEST: u8 = 0x30;
const MAIN_FEATURES: u8 = 0x00;
const VECTOR_FEATURE: u8 = 0x01;
const VECTOR_LEN: u8 = 6;

/// Camera errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Bus failure.
    I2c(E),
    /// Reply did not start with the sync bytes.
    BadSync,
    /// Payload did not add up to the checksum.
    BadChecksum,
    /// The camera sees no line.
    NoVector,
}

/// Camera firmware and hardware identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// Hardware revision.
    pub hardware: u16,
    /// Firmware major version.
    pub major: u8,
    /// Firmware minor version.
    pub minor: u8,
    /// Firmware build number.
    pub build: u16,
    /// Firmware type, e.g. `general`.
    pub firmware_type: String<10>,
}

/// A line the camera tracks, in camera coordinates (78 by 51).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vector {
    /// Tail x.
    pub x0: u8,
    /// Tail y.
    pub y0: u8,
    /// Head x.
    pub x1: u8,
    /// Head y.
    pub y1: u8,
    /// Tracking index.
    pub index: u8,
    /// Flags.
    pub flags: u8,
}

impl Vector {
    /// Direction from tail to head in whole degrees, clockwise from straight up.
    pub fn heading(&self) -> u16 {
        let dx = f32::from(self.x1) - f32::from(self.x0);
        // camera rows grow downwards
        let up = f32::from(self.y0) - f32::from(self.y1);
        let mut degrees = atan2(dx, up).to_degrees();
        if degrees < 0.0 {
            degrees += 360.0;
        }
        ((degrees + 0.5) as u16) % 360
    }
}

/// Pixy2 driver.
pub struct Pixy2<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Pixy2<I2C> {
    /// Camera at [`ADDRESS`].
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, ADDRESS)
    }

    /// Camera at another address.
    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Pixy2 { i2c, address }
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    #[cfg(test)]
    pub(crate) fn i2c_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// Reads the version block.
    pub fn version(&mut self) -> Result<Version, Error<I2C::Error>> {
        let r: [u8; 22] = self.request(VERSION_REQUEST, &[])?;
        let mut firmware_type = String::new();
        for &b in r[12..].iter().take_while(|&&b| b != 0) {
            if b.is_ascii() {
                let _ = firmware_type.push(char::from(b));
            }
        }
        Ok(Version {
            hardware: u16::from_le_bytes([r[6], r[7]]),
            major: r[8],
            minor: r[9],
            build: u16::from_le_bytes([r[10], r[11]]),
            firmware_type,
        })
    }

    /// Frames per second the camera is processing.
    pub fn fps(&mut self) -> Result<u32, Error<I2C::Error>> {
        let r: [u8; 10] = self.request(FPS_REQUEST, &[])?;
        Ok(u32::from_le_bytes([r[6], r[7], r[8], r[9]]))
    }

    /// Switches the upper (white) and lower (RGB) lamps.
    pub fn set_lamp(&mut self, upper: bool, lower: bool) -> Result<(), Error<I2C::Error>> {
        let _: [u8; 10] = self.request(LAMP_REQUEST, &[u8::from(upper), u8::from(lower)])?;
        Ok(())
    }

    /// First line of the main features.
    pub fn main_vector(&mut self) -> Result<Vector, Error<I2C::Error>> {
        let r: [u8; 15] = self.request(MAIN_REQUEST, &[MAIN_FEATURES, VECTOR_FEATURE])?;
        if r[7] < VECTOR_LEN {
            return Err(Error::NoVector);
        }
        Ok(Vector {
            x0: r[8],
            y0: r[9],
            x1: r[10],
            y1: r[11],
            index: r[12],
            flags: r[13],
        })
    }

    fn request<const N: usize>(
        &mut self,
        kind: u8,
        payload: &[u8],
    ) -> Result<[u8; N], Error<I2C::Error>> {
        let mut packet = [0u8; 8];
        let len = payload.len().min(packet.len() - 4);
        packet[..2].copy_from_slice(&SYNC_SEND);
        packet[2] = kind;
        packet[3] = len as u8;
        packet[4..4 + len].copy_from_slice(&payload[..len]);
        self.i2c
            .write(self.address, &packet[..4 + len])
            .map_err(Error::I2c)?;

        let mut reply = [0u8; N];
        self.i2c.read(self.address, &mut reply).map_err(Error::I2c)?;
        check_reply::<I2C::Error>(&reply)?;
        Ok(reply)
    }
}

fn check_reply<E>(reply: &[u8]) -> Result<(), Error<E>> {
    if reply.len() < HEADER_LEN || reply[..2] != SYNC_RECV {
        warn!("pixy reply out of sync");
        return Err(Error::BadSync);
    }
    let end = HEADER_LEN + usize::from(reply[3]);
    // Replies longer than the read cannot be verified.
    if let Some(payload) = reply.get(HEADER_LEN..end) {
        let sum = payload
            .iter()
            .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)));
        if sum != u16::from_le_bytes([reply[4], reply[5]]) {
            warn!("pixy checksum mismatch");
            return Err(Error::BadChecksum);
        }
    }
    Ok(())
}

/// Draws the camera's line on the LCD, replacing the previous one. The line can also be shown
/// by its heading alone, as a hand on the encoder dial.
#[derive(Debug, Default)]
pub struct VectorTracker {
    last: Option<[u8; 4]>,
    dial: AngleDial,
    dial_shown: bool,
}

impl VectorTracker {
    /// Tracker with nothing drawn yet.
    pub const fn new() -> Self {
        VectorTracker {
            last: None,
            dial: AngleDial::new(),
            dial_shown: false,
        }
    }

    /// Maps camera coordinates onto the panel. Columns are stretched by 7/6.
    pub fn to_screen(v: &Vector) -> [u8; 4] {
        let x = |x: u8| (u16::from(x) * 7 / 6).min(u16::from(WIDTH - 1)) as u8;
        let y = |y: u8| y.min(HEIGHT - 1);
        [x(v.x0), y(v.y0), x(v.x1), y(v.y1)]
    }

    /// Redraws if the line moved. Returns `true` when something was drawn.
    pub fn update<C: Canvas>(&mut self, canvas: &mut C, v: &Vector) -> Result<bool, DrawError<C::Error>> {
        let next = Self::to_screen(v);
        if self.last == Some(next) {
            return Ok(false);
        }
        if self.dial_shown {
            self.dial.erase(canvas)?;
            erase_circle(canvas)?;
            self.dial_shown = false;
        }
        if let Some([x0, y0, x1, y1]) = self.last {
            canvas.line(x0, y0, x1, y1, false)?;
        }
        let [x0, y0, x1, y1] = next;
        canvas.line(x0, y0, x1, y1, true)?;
        self.last = Some(next);
        Ok(true)
    }

    /// Points the dial hand along the line's heading. Returns `true` when something was drawn.
    pub fn update_heading<C: Canvas>(
        &mut self,
        canvas: &mut C,
        v: &Vector,
    ) -> Result<bool, DrawError<C::Error>> {
        if let Some([x0, y0, x1, y1]) = self.last.take() {
            canvas.line(x0, y0, x1, y1, false)?;
        }
        if !self.dial_shown {
            draw_circle(canvas)?;
            self.dial.reset();
            self.dial_shown = true;
        }
        let step = u32::from(v.heading()) * u32::from(DIAL_STEPS) / 360;
        self.dial.update(canvas, step as u16)
    }

    /// Forgets the previous drawing, e.g. after the screen was cleared.
    pub fn reset(&mut self) {
        self.last = None;
        self.dial.reset();
        self.dial_shown = false;
    }
}
