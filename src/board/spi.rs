//! SPI master on eUSCI_B1 (CLK P4.5, SIMO P4.6, SOMI P4.7), shared by the LCD and the
//! encoder counter.
//!
//! [`SpiConfig`] configures the eUSCI and yields a [`Spi`] bus handle. The handle is zero
//! sized and every copy drives the same registers, so each chip gets its own
//! [`ExclusiveSpi`], which wraps a handle with that chip's select line. Transactions on
//! different devices must not interleave; the demos keep every SPI user in one context.

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{self, Mode, Operation, Phase, Polarity, SpiBus, SpiDevice};
use msp430::asm;
use msp430fr2355 as pac;

use super::port::select_primary;
use super::regs::{EUsci, GpioPeriph, UcIfg, UcbCtlw0};

/// Marks a eUSCI usable as the SPI master, along with where its pins live.
pub trait SpiUsci: EUsci {
    /// Port holding CLK, SIMO and SOMI.
    type Port: GpioPeriph;
    /// CLK, SIMO and SOMI pins of that port.
    const PIN_MASK: u8;
}

impl SpiUsci for pac::E_USCI_B1 {
    type Port = pac::P4;
    const PIN_MASK: u8 = (1 << 5) | (1 << 6) | (1 << 7);
}

/// Builder object for the SPI master.
pub struct SpiConfig<USCI: SpiUsci> {
    usci: USCI,
    ctlw0: UcbCtlw0,
    divisor: u16,
}

impl<USCI: SpiUsci> SpiConfig<USCI> {
    /// 3-wire master in `mode`, clocked from SMCLK undivided.
    pub fn new(usci: USCI, mode: Mode, msb_first: bool) -> Self {
        let mut ctlw0 = UcbCtlw0::UCSWRST | UcbCtlw0::UCSYNC | UcbCtlw0::UCMST | UcbCtlw0::UCSSEL_SMCLK;
        ctlw0.set(UcbCtlw0::UCMSB, msb_first);
        ctlw0.set(UcbCtlw0::UCCKPL, mode.polarity == Polarity::IdleHigh);
        // UCCKPH set means capture on the first edge, which is CPHA = 0.
        ctlw0.set(UcbCtlw0::UCCKPH, mode.phase == Phase::CaptureOnFirstTransition);
        SpiConfig {
            usci,
            ctlw0,
            divisor: 1,
        }
    }

    /// Clock from SMCLK divided by `clk_divisor`.
    #[inline]
    pub fn use_smclk(mut self, clk_divisor: u16) -> Self {
        self.ctlw0.remove(UcbCtlw0::UCSSEL_ACLK);
        self.ctlw0.insert(UcbCtlw0::UCSSEL_SMCLK);
        self.divisor = clk_divisor.max(1);
        self
    }

    /// Clock from ACLK divided by `clk_divisor`.
    #[inline]
    pub fn use_aclk(mut self, clk_divisor: u16) -> Self {
        self.ctlw0.remove(UcbCtlw0::UCSSEL_SMCLK);
        self.ctlw0.insert(UcbCtlw0::UCSSEL_ACLK);
        self.divisor = clk_divisor.max(1);
        self
    }

    /// Performs hardware configuration and hands the pins to the eUSCI.
    pub fn configure(self, port: &USCI::Port) -> Spi<USCI> {
        select_primary(port, USCI::PIN_MASK);
        self.usci.ctlw0_wr(UcbCtlw0::UCSWRST.bits());
        self.usci.ctlw0_wr(self.ctlw0.bits());
        self.usci.brw_wr(self.divisor);
        self.usci.ctlw0_clear(UcbCtlw0::UCSWRST.bits());
        Spi(PhantomData)
    }
}

/// SPI bus handle.
pub struct Spi<USCI: SpiUsci>(PhantomData<USCI>);

impl<USCI: SpiUsci> Spi<USCI> {
    /// Another handle on the same bus, for the next chip.
    pub fn handle(&self) -> Self {
        Spi(PhantomData)
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        let usci = unsafe { USCI::steal() };
        while !usci.ifg_rd().contains(UcIfg::UCTXIFG) {
            asm::nop();
        }
        usci.tx_wr(byte);
        while !usci.ifg_rd().contains(UcIfg::UCRXIFG) {
            asm::nop();
        }
        usci.rx_rd()
    }
}

impl<USCI: SpiUsci> spi::ErrorType for Spi<USCI> {
    type Error = Infallible;
}

impl<USCI: SpiUsci> SpiBus<u8> for Spi<USCI> {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for word in words {
            *word = self.exchange(0);
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        for &word in words {
            self.exchange(word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let len = read.len().max(write.len());
        for i in 0..len {
            let byte = self.exchange(write.get(i).copied().unwrap_or(0));
            if let Some(r) = read.get_mut(i) {
                *r = byte;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for word in words {
            *word = self.exchange(*word);
        }
        Ok(())
    }

    /// Every exchange waits for its received byte, so the bus is idle on return already.
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A bus handle and the chip select of one device. Select is active low.
pub struct ExclusiveSpi<USCI: SpiUsci, CS> {
    bus: Spi<USCI>,
    cs: CS,
}

/// Chip select failure. The bus itself cannot fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipSelectError;

impl spi::Error for ChipSelectError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::ChipSelectFault
    }
}

impl<USCI: SpiUsci, CS: OutputPin> ExclusiveSpi<USCI, CS> {
    /// Drives `cs` high and pairs it with `bus`.
    pub fn new(bus: Spi<USCI>, mut cs: CS) -> Result<Self, ChipSelectError> {
        cs.set_high().map_err(|_| ChipSelectError)?;
        Ok(ExclusiveSpi { bus, cs })
    }
}

impl<USCI: SpiUsci, CS: OutputPin> spi::ErrorType for ExclusiveSpi<USCI, CS> {
    type Error = ChipSelectError;
}

impl<USCI: SpiUsci, CS: OutputPin> SpiDevice for ExclusiveSpi<USCI, CS> {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(|_| ChipSelectError)?;
        for op in operations {
            // Spi is infallible
            let _ = match op {
                Operation::Read(buf) => self.bus.read(buf),
                Operation::Write(buf) => self.bus.write(buf),
                Operation::Transfer(read, write) => self.bus.transfer(read, write),
                Operation::TransferInPlace(buf) => self.bus.transfer_in_place(buf),
                Operation::DelayNs(ns) => {
                    // SMCLK is about 1 MHz, one nop per microsecond is close enough
                    for _ in 0..(*ns / 1000).max(1) {
                        asm::nop();
                    }
                    Ok(())
                }
            };
        }
        self.cs.set_high().map_err(|_| ChipSelectError)
    }
}
