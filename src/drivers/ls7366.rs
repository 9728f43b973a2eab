//! LS7366R 32-bit quadrature counter on SPI.
//!
//! Every access starts with an instruction byte: the operation in the top two bits and the
//! register in bits 3 to 5. Four-byte registers go over the wire most significant byte first.

use embedded_hal::spi::{Operation, SpiDevice};

/// Counter registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// Mode register 0.
    Mdr0 = 0x08,
    /// Mode register 1.
    Mdr1 = 0x10,
    /// Data transfer register, source for loads into CNTR.
    Dtr = 0x18,
    /// Counter.
    Cntr = 0x20,
    /// Output register, snapshot of CNTR.
    Otr = 0x28,
    /// Status register.
    Str = 0x30,
}

impl Register {
    /// Number of bytes the register holds.
    pub fn width(self) -> usize {
        match self {
            Register::Mdr0 | Register::Mdr1 | Register::Str => 1,
            Register::Dtr | Register::Cntr | Register::Otr => 4,
        }
    }
}

/// A byte that is not one of the register codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BadRegister(pub u8);

impl TryFrom<u8> for Register {
    type Error = BadRegister;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0x08 => Register::Mdr0,
            0x10 => Register::Mdr1,
            0x18 => Register::Dtr,
            0x20 => Register::Cntr,
            0x28 => Register::Otr,
            0x30 => Register::Str,
            _ => return Err(BadRegister(code)),
        })
    }
}

const CLR: u8 = 0x00;
const RD: u8 = 0x40;
const WR: u8 = 0x80;
const LOAD: u8 = 0xC0;

bitflags::bitflags! {
    /// MDR0 settings.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mdr0: u8 {
        /// One count per quadrature cycle.
        const QUADRATURE_X1 = 0x01;
        /// Two counts per quadrature cycle.
        const QUADRATURE_X2 = 0x02;
        /// Four counts per quadrature cycle.
        const QUADRATURE_X4 = 0x03;
        /// Stop counting at carry or borrow.
        const SINGLE_CYCLE = 0x04;
        /// Limit counting to the range 0..=DTR.
        const RANGE_LIMIT = 0x08;
        /// Count modulo DTR + 1.
        const MODULO_N = 0x0C;
        /// Index input loads CNTR from DTR.
        const INDEX_LOAD_CNTR = 0x10;
        /// Index input resets CNTR.
        const INDEX_RESET_CNTR = 0x20;
        /// Index input loads OTR from CNTR.
        const INDEX_LOAD_OTR = 0x30;
        /// Index input is asynchronous.
        const INDEX_ASYNC = 0x40;
        /// Input filter clock divided by two.
        const FILTER_DIV2 = 0x80;
    }
}

bitflags::bitflags! {
    /// MDR1 settings. No size bits means a four-byte counter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mdr1: u8 {
        /// Three-byte counter.
        const THREE_BYTE = 0x01;
        /// Two-byte counter.
        const TWO_BYTE = 0x02;
        /// One-byte counter.
        const ONE_BYTE = 0x03;
        /// Counting disabled.
        const DISABLE = 0x04;
        /// Flag on index.
        const FLAG_IDX = 0x10;
        /// Flag on CNTR = DTR.
        const FLAG_CMP = 0x20;
        /// Flag on borrow.
        const FLAG_BW = 0x40;
        /// Flag on carry.
        const FLAG_CY = 0x80;
    }
}

bitflags::bitflags! {
    /// STR contents.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Sign of the count.
        const SIGN = 0x01;
        /// Counting up.
        const UP = 0x02;
        /// Index input is active.
        const INDEX = 0x04;
        /// Counting is enabled.
        const ENABLED = 0x08;
        /// Power loss latch.
        const POWER_LOSS = 0x10;
        /// Compare latch.
        const COMPARE = 0x20;
        /// Borrow latch.
        const BORROW = 0x40;
        /// Carry latch.
        const CARRY = 0x80;
    }
}

/// Mode the counter is put in by [`Ls7366::init`]: x4 quadrature, free running, index off,
/// filter clock undivided.
pub const DEFAULT_MDR0: Mdr0 = Mdr0::QUADRATURE_X4;
/// Four-byte counter, counting enabled, no flags.
pub const DEFAULT_MDR1: Mdr1 = Mdr1::empty();

/// Contents of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegValue {
    /// MDR0, MDR1 or STR.
    Byte(u8),
    /// DTR, CNTR or OTR.
    Word(i32),
}

impl RegValue {
    /// Value widened to 32 bits.
    pub fn as_i32(self) -> i32 {
        match self {
            RegValue::Byte(b) => i32::from(b),
            RegValue::Word(w) => w,
        }
    }
}

/// Counter errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// SPI transfer failed.
    Spi(E),
    /// The operation does not apply to that register.
    BadRegister(Register),
}

/// LS7366R driver.
pub struct Ls7366<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Ls7366<SPI> {
    /// Wraps the SPI device. The chip is not touched.
    pub fn new(spi: SPI) -> Self {
        Ls7366 { spi }
    }

    /// Gives the SPI device back.
    pub fn release(self) -> SPI {
        self.spi
    }

    #[cfg(test)]
    pub(crate) fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Sets the default modes and zeroes the count.
    pub fn init(&mut self) -> Result<(), Error<SPI::Error>> {
        self.write_mode(Register::Mdr0, DEFAULT_MDR0.bits())?;
        self.write_mode(Register::Mdr1, DEFAULT_MDR1.bits())?;
        self.clear(Register::Cntr)?;
        info!("LS7366R ready");
        Ok(())
    }

    /// Reads any register.
    pub fn read(&mut self, reg: Register) -> Result<RegValue, Error<SPI::Error>> {
        let mut buf = [0u8; 4];
        let width = reg.width();
        self.spi
            .transaction(&mut [
                Operation::Write(&[RD | reg as u8]),
                Operation::Read(&mut buf[..width]),
            ])
            .map_err(Error::Spi)?;
        Ok(match width {
            1 => RegValue::Byte(buf[0]),
            _ => RegValue::Word(i32::from_be_bytes(buf)),
        })
    }

    /// Reads CNTR.
    pub fn count(&mut self) -> Result<i32, Error<SPI::Error>> {
        self.read(Register::Cntr).map(RegValue::as_i32)
    }

    /// Reads STR.
    pub fn status(&mut self) -> Result<Status, Error<SPI::Error>> {
        self.read(Register::Str)
            .map(|v| Status::from_bits_retain(v.as_i32() as u8))
    }

    /// Writes MDR0 or MDR1.
    pub fn write_mode(&mut self, reg: Register, value: u8) -> Result<(), Error<SPI::Error>> {
        match reg {
            Register::Mdr0 | Register::Mdr1 => self.command(&[WR | reg as u8, value]),
            _ => Err(Error::BadRegister(reg)),
        }
    }

    /// Writes DTR.
    pub fn write_dtr(&mut self, value: i32) -> Result<(), Error<SPI::Error>> {
        let [a, b, c, d] = value.to_be_bytes();
        self.command(&[WR | Register::Dtr as u8, a, b, c, d])
    }

    /// Transfers DTR into CNTR, or CNTR into OTR.
    pub fn load(&mut self, reg: Register) -> Result<(), Error<SPI::Error>> {
        match reg {
            Register::Cntr | Register::Otr => self.command(&[LOAD | reg as u8]),
            _ => Err(Error::BadRegister(reg)),
        }
    }

    /// Zeroes MDR0, MDR1, CNTR or STR.
    pub fn clear(&mut self, reg: Register) -> Result<(), Error<SPI::Error>> {
        match reg {
            Register::Mdr0 | Register::Mdr1 | Register::Cntr | Register::Str => {
                self.command(&[CLR | reg as u8])
            }
            _ => Err(Error::BadRegister(reg)),
        }
    }

    /// Makes the current position read as `count`.
    pub fn set_count(&mut self, count: i32) -> Result<(), Error<SPI::Error>> {
        self.write_dtr(count)?;
        self.load(Register::Cntr)
    }

    fn command(&mut self, bytes: &[u8]) -> Result<(), Error<SPI::Error>> {
        self.spi.write(bytes).map_err(Error::Spi)
    }
}
