//! Blocking I2C master on eUSCI_B0 (SDA P1.2, SCL P1.3), used for the Pixy2 camera.
//!
//! Only 7-bit addressing is implemented. Adjacent operations of the same direction in one
//! transaction are merged without a repeated start, as `embedded-hal` asks.

use core::marker::PhantomData;

use embedded_hal::i2c::{self, ErrorKind, NoAcknowledgeSource, Operation, SevenBitAddress};
use msp430::asm;
use msp430fr2355 as pac;

use super::port::select_primary;
use super::regs::{EUsciI2c, GpioPeriph, UcIfg, UcbCtlw0};

/// Marks a eUSCI usable as the I2C master, along with where its pins live.
pub trait I2cUsci: EUsciI2c {
    /// Port holding SDA and SCL.
    type Port: GpioPeriph;
    /// SDA and SCL pins of that port.
    const PIN_MASK: u8;
}

impl I2cUsci for pac::E_USCI_B0 {
    type Port = pac::P1;
    const PIN_MASK: u8 = (1 << 2) | (1 << 3);
}

/// Builder object for the I2C master.
pub struct I2cConfig<USCI: I2cUsci> {
    usci: USCI,
    clksel: UcbCtlw0,
    divisor: u16,
}

impl<USCI: I2cUsci> I2cConfig<USCI> {
    /// Master clocked from SMCLK divided by `clk_divisor`. 10 gives about 100 kHz.
    pub fn new(usci: USCI, clk_divisor: u16) -> Self {
        I2cConfig {
            usci,
            clksel: UcbCtlw0::UCSSEL_SMCLK,
            divisor: clk_divisor.max(1),
        }
    }

    /// Clock from ACLK divided by `clk_divisor` instead.
    #[inline]
    pub fn use_aclk(mut self, clk_divisor: u16) -> Self {
        self.clksel = UcbCtlw0::UCSSEL_ACLK;
        self.divisor = clk_divisor.max(1);
        self
    }

    /// Performs hardware configuration and hands the pins to the eUSCI.
    pub fn configure(self, port: &USCI::Port) -> I2c<USCI> {
        select_primary(port, USCI::PIN_MASK);
        let usci = self.usci;
        usci.ctlw0_wr(UcbCtlw0::UCSWRST.bits());
        usci.ctlw0_wr(
            (UcbCtlw0::UCSWRST | UcbCtlw0::UCMODE_I2C | UcbCtlw0::UCMST | UcbCtlw0::UCSYNC | self.clksel)
                .bits(),
        );
        // No automatic stop, no byte counter
        usci.ctlw1_wr(0);
        usci.tbcnt_wr(0);
        usci.brw_wr(self.divisor);
        usci.ctlw0_clear(UcbCtlw0::UCSWRST.bits());
        I2c(PhantomData)
    }
}

/// I2C transmit/receive errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    /// Address or data was never acknowledged by the slave
    GotNack,
    /// Device lost arbitration
    ArbitrationLost,
}

impl i2c::Error for I2cError {
    fn kind(&self) -> ErrorKind {
        match self {
            I2cError::GotNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            I2cError::ArbitrationLost => ErrorKind::ArbitrationLoss,
        }
    }
}

/// I2C bus handle.
pub struct I2c<USCI: I2cUsci>(PhantomData<USCI>);

impl<USCI: I2cUsci> I2c<USCI> {
    fn stop(usci: &USCI) {
        usci.ctlw0_set(UcbCtlw0::UCTXSTP.bits());
        while UcbCtlw0::from_bits_truncate(usci.ctlw0_rd()).contains(UcbCtlw0::UCTXSTP) {
            asm::nop();
        }
    }

    /// Waits for `flag`, bailing out on NACK or lost arbitration.
    fn wait(usci: &USCI, flag: UcIfg) -> Result<(), I2cError> {
        loop {
            let ifg = usci.ifg_rd();
            if ifg.contains(UcIfg::UCNACKIFG) {
                usci.ifg_clear(UcIfg::UCNACKIFG);
                Self::stop(usci);
                return Err(I2cError::GotNack);
            }
            if ifg.contains(UcIfg::UCALIFG) {
                usci.ifg_clear(UcIfg::UCALIFG);
                return Err(I2cError::ArbitrationLost);
            }
            if ifg.contains(flag) {
                return Ok(());
            }
        }
    }

    fn wait_start(usci: &USCI) -> Result<(), I2cError> {
        while UcbCtlw0::from_bits_truncate(usci.ctlw0_rd()).contains(UcbCtlw0::UCTXSTT) {
            asm::nop();
        }
        let ifg = usci.ifg_rd();
        if ifg.contains(UcIfg::UCNACKIFG) {
            usci.ifg_clear(UcIfg::UCNACKIFG);
            Self::stop(usci);
            return Err(I2cError::GotNack);
        }
        if ifg.contains(UcIfg::UCALIFG) {
            usci.ifg_clear(UcIfg::UCALIFG);
            return Err(I2cError::ArbitrationLost);
        }
        Ok(())
    }

    fn start_write(usci: &USCI) -> Result<(), I2cError> {
        usci.ctlw0_set((UcbCtlw0::UCTR | UcbCtlw0::UCTXSTT).bits());
        Self::wait(usci, UcIfg::UCTXIFG)
    }

    fn start_read(usci: &USCI) -> Result<(), I2cError> {
        usci.ctlw0_clear(UcbCtlw0::UCTR.bits());
        usci.ctlw0_set(UcbCtlw0::UCTXSTT.bits());
        Self::wait_start(usci)
    }

    fn run(&mut self, address: SevenBitAddress, operations: &mut [Operation<'_>]) -> Result<(), I2cError> {
        let usci = unsafe { USCI::steal() };
        usci.i2csa_wr(u16::from(address));

        let count = operations.len();
        let mut reading: Option<bool> = None;
        let mut stopped = false;
        for (i, op) in operations.iter_mut().enumerate() {
            let last_op = i + 1 == count;
            match op {
                Operation::Write(bytes) => {
                    if reading != Some(false) {
                        Self::start_write(&usci)?;
                    }
                    let mut first = reading != Some(false);
                    for &byte in bytes.iter() {
                        usci.tx_wr(byte);
                        if first {
                            // Address phase finishes once the first byte is loaded
                            Self::wait_start(&usci)?;
                            first = false;
                        }
                        Self::wait(&usci, UcIfg::UCTXIFG)?;
                    }
                    if first {
                        Self::wait_start(&usci)?;
                    }
                    reading = Some(false);
                }
                Operation::Read(buf) => {
                    if reading != Some(true) {
                        Self::start_read(&usci)?;
                    }
                    let len = buf.len();
                    for (j, byte) in buf.iter_mut().enumerate() {
                        if last_op && j + 1 == len {
                            usci.ctlw0_set(UcbCtlw0::UCTXSTP.bits());
                            stopped = true;
                        }
                        Self::wait(&usci, UcIfg::UCRXIFG)?;
                        *byte = usci.rx_rd();
                    }
                    reading = Some(true);
                }
            }
        }

        if stopped {
            while UcbCtlw0::from_bits_truncate(usci.ctlw0_rd()).contains(UcbCtlw0::UCTXSTP) {
                asm::nop();
            }
        } else if reading.is_some() {
            Self::stop(&usci);
        }
        Ok(())
    }
}

impl<USCI: I2cUsci> i2c::ErrorType for I2c<USCI> {
    type Error = I2cError;
}

impl<USCI: I2cUsci> i2c::I2c<SevenBitAddress> for I2c<USCI> {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        let result = self.run(address, operations);
        if let Err(e) = result {
            warn!("i2c {=u8:#x}: {}", address, e);
        }
        result
    }
}
