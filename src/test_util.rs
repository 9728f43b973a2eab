//! Recording stand-ins for the `embedded-hal` peripherals the drivers talk to.

use std::collections::VecDeque;
use std::convert::Infallible;

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{self, I2c};
use embedded_hal::pwm::{self, SetDutyCycle};
use embedded_hal::spi::{self, SpiDevice};

/// SPI device that records what was written in each transaction and answers reads from a
/// script. Reads with nothing scripted return zeros.
#[derive(Debug, Default)]
pub struct SpiMock {
    pub transactions: Vec<Vec<u8>>,
    pub replies: VecDeque<u8>,
    pub fail: bool,
}

impl SpiMock {
    pub fn reply(&mut self, bytes: &[u8]) {
        self.replies.extend(bytes);
    }

    fn next_reply(&mut self) -> u8 {
        self.replies.pop_front().unwrap_or(0)
    }
}

impl spi::ErrorType for SpiMock {
    type Error = spi::ErrorKind;
}

impl SpiDevice for SpiMock {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Self::Error> {
        if self.fail {
            return Err(spi::ErrorKind::Other);
        }
        let mut written = Vec::new();
        for op in operations {
            match op {
                spi::Operation::Write(buf) => written.extend_from_slice(buf),
                spi::Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.next_reply();
                    }
                }
                spi::Operation::Transfer(read, write) => {
                    written.extend_from_slice(write);
                    for b in read.iter_mut() {
                        *b = self.next_reply();
                    }
                }
                spi::Operation::TransferInPlace(buf) => {
                    written.extend_from_slice(buf);
                    for b in buf.iter_mut() {
                        *b = self.next_reply();
                    }
                }
                spi::Operation::DelayNs(_) => {}
            }
        }
        self.transactions.push(written);
        Ok(())
    }
}

/// I2C bus that records writes and answers reads from queued replies.
#[derive(Debug, Default)]
pub struct I2cMock {
    pub writes: Vec<(u8, Vec<u8>)>,
    pub reads: VecDeque<Vec<u8>>,
    pub nack: bool,
}

impl I2cMock {
    pub fn reply(&mut self, bytes: &[u8]) {
        self.reads.push_back(bytes.to_vec());
    }
}

impl i2c::ErrorType for I2cMock {
    type Error = i2c::ErrorKind;
}

impl I2c for I2cMock {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.nack {
            return Err(i2c::ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                i2c::Operation::Write(buf) => self.writes.push((address, buf.to_vec())),
                i2c::Operation::Read(buf) => {
                    let reply = self.reads.pop_front().unwrap_or_default();
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = reply.get(i).copied().unwrap_or(0);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Output pin remembering every level it was driven to.
#[derive(Debug, Default)]
pub struct PinMock {
    pub high: bool,
    pub history: Vec<bool>,
}

impl digital::ErrorType for PinMock {
    type Error = Infallible;
}

impl OutputPin for PinMock {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.history.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.history.push(true);
        Ok(())
    }
}

/// PWM channel with a 0..=100 duty range.
#[derive(Debug, Default)]
pub struct PwmMock {
    pub duty: u16,
}

impl pwm::ErrorType for PwmMock {
    type Error = Infallible;
}

impl SetDutyCycle for PwmMock {
    fn max_duty_cycle(&self) -> u16 {
        100
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty;
        Ok(())
    }
}

/// `embedded-io` writer collecting everything into a vector.
#[derive(Debug, Default)]
pub struct Sink(pub Vec<u8>);

impl Sink {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl embedded_io::ErrorType for Sink {
    type Error = Infallible;
}

impl embedded_io::Write for Sink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
