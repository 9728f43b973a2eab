//! Console UART on eUSCI_A1 (TX P4.3, RX P4.2), which the LaunchPad routes to its USB
//! backchannel.
//!
//! The labs only ever talk 8N1, so [`SerialConfig::new()`] takes just the baud rate. Pick the
//! clock with [`use_smclk`](SerialConfig::use_smclk) or [`use_aclk`](SerialConfig::use_aclk),
//! then [`split`](SerialConfig::split) into [`Tx`] and [`Rx`].
//!
//! [`Tx`] and [`Rx`] implement both the single-byte non-blocking
//! [`embedded-hal-nb`](embedded_hal_nb::serial) traits, which the interrupt-driven console uses,
//! and the blocking [`embedded-io`](embedded_io) traits, which the polled console uses. The
//! eUSCI has a single byte buffer, so `embedded-io` reads and writes move one byte per call.

use core::convert::Infallible;
use core::marker::PhantomData;
use core::num::NonZeroU32;

use msp430fr2355 as pac;

use super::port::select_primary;
use super::regs::{EUsciUart, UcIfg, UcaCtlw0, UcaStatw};

/// Marks a eUSCI that can be used as the console UART, along with where its pins live.
pub trait SerialUsci: EUsciUart {
    /// Port holding the Tx and Rx pins.
    type Port: super::regs::GpioPeriph;
    /// Tx and Rx pins of that port.
    const PIN_MASK: u8;
}

impl SerialUsci for pac::E_USCI_A1 {
    type Port = pac::P4;
    const PIN_MASK: u8 = (1 << 2) | (1 << 3);
}

/// Clock source not chosen yet.
pub struct NoClockSet {
    baudrate: NonZeroU32,
}

/// Clock source chosen and baud rate registers worked out.
pub struct ClockSet {
    baud_config: BaudConfig,
    clksel: UcaCtlw0,
}

/// Console UART settings: 8 data bits, no parity, one stop bit, LSB first.
///
/// Once the clock source has been selected, the builder can be converted into the [`Tx`] and
/// [`Rx`] halves.
pub struct SerialConfig<USCI: SerialUsci, S> {
    usci: USCI,
    state: S,
}

impl<USCI: SerialUsci> SerialConfig<USCI, NoClockSet> {
    /// Console at `baudrate` bits per second. Zero is treated as 1.
    #[inline]
    pub fn new(usci: USCI, baudrate: u32) -> Self {
        SerialConfig {
            usci,
            state: NoClockSet {
                baudrate: NonZeroU32::new(baudrate).unwrap_or(NonZeroU32::MIN),
            },
        }
    }

    /// Clocks the UART from ACLK running at `freq` Hz.
    #[inline(always)]
    pub fn use_aclk(self, freq: u32) -> SerialConfig<USCI, ClockSet> {
        self.clocked(freq, UcaCtlw0::UCSSEL_ACLK)
    }

    /// Clocks the UART from SMCLK running at `freq` Hz.
    #[inline(always)]
    pub fn use_smclk(self, freq: u32) -> SerialConfig<USCI, ClockSet> {
        self.clocked(freq, UcaCtlw0::UCSSEL_SMCLK)
    }

    fn clocked(self, freq: u32, clksel: UcaCtlw0) -> SerialConfig<USCI, ClockSet> {
        SerialConfig {
            usci: self.usci,
            state: ClockSet {
                baud_config: calculate_baud_config(freq, self.state.baudrate),
                clksel,
            },
        }
    }
}

struct BaudConfig {
    br: u16,
    brs: u8,
    brf: u8,
    ucos16: bool,
}

#[inline]
fn calculate_baud_config(clk_freq: u32, bps: NonZeroU32) -> BaudConfig {
    // Ensure n stays within the 16 bit boundary
    let n = (clk_freq / bps).clamp(1, 0xFFFF);

    let brs = lookup_brs(clk_freq, bps);

    if (n >= 16) && (bps.get() < u32::MAX / 16) {
        let div = bps.saturating_mul(NonZeroU32::new(16).unwrap_or(NonZeroU32::MIN));

        // n / 16 without losing the fraction first
        let br = (clk_freq / div) as u16;

        // n % 16, same idea
        let brf = ((clk_freq % div) / bps) as u8;
        BaudConfig {
            ucos16: true,
            br,
            brf,
            brs,
        }
    } else {
        BaudConfig {
            ucos16: false,
            br: n as u16,
            brf: 0,
            brs,
        }
    }
}

#[inline(always)]
fn lookup_brs(clk_freq: u32, bps: NonZeroU32) -> u8 {
    let modulo = clk_freq % bps;

    // Fraction of a bit period in ten-thousandths. `modulo` is below 5 MBd (datasheet max),
    // so the coarse branch cannot overflow either.
    let fraction_as_ten_thousandths = if modulo < u32::MAX / 10_000 {
        ((modulo * 10_000) / bps) as u16
    } else {
        (((modulo * 500) / bps) * 20) as u16
    };

    // Table 22-4, MSP430FR4xx and MSP430FR2xx family user's guide (Rev. I)
    match fraction_as_ten_thousandths {
        0..529 => 0x00,
        529..715 => 0x01,
        715..835 => 0x02,
        835..1001 => 0x04,
        1001..1252 => 0x08,
        1252..1430 => 0x10,
        1430..1670 => 0x20,
        1670..2147 => 0x11,
        2147..2224 => 0x21,
        2224..2503 => 0x22,
        2503..3000 => 0x44,
        3000..3335 => 0x25,
        3335..3575 => 0x49,
        3575..3753 => 0x4A,
        3753..4003 => 0x52,
        4003..4286 => 0x92,
        4286..4378 => 0x53,
        4378..5002 => 0x55,
        5002..5715 => 0xAA,
        5715..6003 => 0x6B,
        6003..6254 => 0xAD,
        6254..6432 => 0xB5,
        6432..6667 => 0xB6,
        6667..7001 => 0xD6,
        7001..7147 => 0xB7,
        7147..7503 => 0xBB,
        7503..7861 => 0xDD,
        7861..8004 => 0xED,
        8004..8333 => 0xEE,
        8333..8464 => 0xBF,
        8464..8572 => 0xDF,
        8572..8751 => 0xEF,
        8751..9004 => 0xF7,
        9004..9170 => 0xFB,
        9170..9288 => 0xFD,
        9288.. => 0xFE,
    }
}

impl<USCI: SerialUsci> SerialConfig<USCI, ClockSet> {
    #[inline]
    fn config_hw(self) {
        let ClockSet {
            baud_config,
            clksel,
        } = self.state;
        let usci = self.usci;

        // 8N1 LSB first is all zeroes apart from the clock and error interrupt bits
        let ctlw0 = clksel | UcaCtlw0::UCSWRST | UcaCtlw0::UCRXEIE;
        usci.ctlw0_wr(UcaCtlw0::UCSWRST.bits());
        usci.ctlw0_wr(ctlw0.bits());
        usci.brw_wr(baud_config.br);
        usci.mctlw_wr(baud_config.ucos16, baud_config.brs, baud_config.brf);
        usci.statw_wr(0);
        usci.ctlw0_clear(UcaCtlw0::UCSWRST.bits());
        debug!("uart br={=u16} brs={=u8} brf={=u8}", baud_config.br, baud_config.brs, baud_config.brf);
    }

    /// Perform hardware configuration, hand the pins to the eUSCI and split into Tx and Rx.
    #[inline]
    pub fn split(self, port: &USCI::Port) -> (Tx<USCI>, Rx<USCI>) {
        select_primary(port, USCI::PIN_MASK);
        self.config_hw();
        (Tx(PhantomData), Rx(PhantomData))
    }
}

/// Console transmit half.
pub struct Tx<USCI: SerialUsci>(PhantomData<USCI>);

impl<USCI: SerialUsci> Tx<USCI> {
    /// Lets the transmit buffer empty interrupt through.
    #[inline(always)]
    pub fn enable_tx_interrupts(&mut self) {
        let usci = unsafe { USCI::steal() };
        usci.ie_set(UcIfg::UCTXIFG.bits());
    }

    /// Masks the transmit interrupt, e.g. once the console has nothing left to send.
    #[inline(always)]
    pub fn disable_tx_interrupts(&mut self) {
        let usci = unsafe { USCI::steal() };
        usci.ie_clear(UcIfg::UCTXIFG.bits());
    }

    #[inline]
    fn flush(&mut self) -> nb::Result<(), Infallible> {
        let usci = unsafe { USCI::steal() };
        if usci.ifg_rd().contains(UcIfg::UCTXIFG) {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    #[inline]
    fn send(&mut self, data: u8) -> nb::Result<(), Infallible> {
        let usci = unsafe { USCI::steal() };
        if usci.ifg_rd().contains(UcIfg::UCTXIFG) {
            usci.tx_wr(data);
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

/// Console receive half.
pub struct Rx<USCI: SerialUsci>(PhantomData<USCI>);

impl<USCI: SerialUsci> Rx<USCI> {
    /// Raises an interrupt for every received byte.
    #[inline(always)]
    pub fn enable_rx_interrupts(&mut self) {
        let usci = unsafe { USCI::steal() };
        usci.ie_set(UcIfg::UCRXIFG.bits());
    }

    /// Masks the receive interrupt.
    #[inline(always)]
    pub fn disable_rx_interrupts(&mut self) {
        let usci = unsafe { USCI::steal() };
        usci.ie_clear(UcIfg::UCRXIFG.bits());
    }

    // Reading RXBUF clears RXIFG and the error flags.
    fn recv(&mut self) -> nb::Result<u8, RecvError> {
        let usci = unsafe { USCI::steal() };

        if usci.ifg_rd().contains(UcIfg::UCRXIFG) {
            let statw = UcaStatw::from_bits_truncate(usci.statw_rd());
            let data = usci.rx_rd();

            if statw.contains(UcaStatw::UCFE) {
                Err(nb::Error::Other(RecvError::Framing))
            } else if statw.contains(UcaStatw::UCPE) {
                Err(nb::Error::Other(RecvError::Parity))
            } else if statw.contains(UcaStatw::UCOE) {
                Err(nb::Error::Other(RecvError::Overrun(data)))
            } else {
                Ok(data)
            }
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

/// Receive errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecvError {
    /// Stop bit missing.
    Framing,
    /// Parity mismatch.
    Parity,
    /// Buffer overrun error. Contains the most recently read byte, which is still valid.
    Overrun(u8),
}

mod emb_io {
    use super::*;
    use embedded_io::{Error, ErrorType, Read, ReadReady, Write, WriteReady};
    use nb::block;

    impl<USCI: SerialUsci> ErrorType for Rx<USCI> {
        type Error = RecvError;
    }
    impl Error for RecvError {
        fn kind(&self) -> embedded_io::ErrorKind {
            embedded_io::ErrorKind::Other
        }
    }
    impl<USCI: SerialUsci> Read for Rx<USCI> {
        /// Blocks for one byte. An empty `buf` returns `Ok(0)` at once.
        #[inline]
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let Some(first) = buf.first_mut() else { return Ok(0) };
            *first = block!(self.recv())?;
            Ok(1)
        }
    }
    impl<USCI: SerialUsci> ReadReady for Rx<USCI> {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            let usci = unsafe { USCI::steal() };
            Ok(usci.ifg_rd().contains(UcIfg::UCRXIFG))
        }
    }

    impl<USCI: SerialUsci> ErrorType for Tx<USCI> {
        type Error = Infallible;
    }
    impl<USCI: SerialUsci> Write for Tx<USCI> {
        /// Waits for TXBUF to empty. The last byte may still be shifting out (USCI42 makes
        /// UCTXCPTIFG unreliable).
        #[inline]
        fn flush(&mut self) -> Result<(), Self::Error> {
            block!(Tx::flush(self))
        }

        /// Blocks until TXBUF is free and sends `buf[0]`. Use `write_all()` for the rest.
        #[inline]
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            let Some(&first) = buf.first() else { return Ok(0) };
            block!(self.send(first))?;
            Ok(1)
        }
    }
    impl<USCI: SerialUsci> WriteReady for Tx<USCI> {
        fn write_ready(&mut self) -> Result<bool, Self::Error> {
            let usci = unsafe { USCI::steal() };
            Ok(usci.ifg_rd().contains(UcIfg::UCTXIFG))
        }
    }
}

mod ehal_nb1 {
    use super::*;
    use embedded_hal_nb::serial::{Error, ErrorKind, ErrorType, Read, Write};

    impl Error for RecvError {
        fn kind(&self) -> ErrorKind {
            match self {
                RecvError::Framing => ErrorKind::FrameFormat,
                RecvError::Parity => ErrorKind::Parity,
                RecvError::Overrun(_) => ErrorKind::Overrun,
            }
        }
    }
    impl<USCI: SerialUsci> ErrorType for Rx<USCI> {
        type Error = RecvError;
    }
    impl<USCI: SerialUsci> Read<u8> for Rx<USCI> {
        /// The received byte, or `WouldBlock` while RXIFG is clear.
        #[inline]
        fn read(&mut self) -> nb::Result<u8, Self::Error> {
            self.recv()
        }
    }

    impl<USCI: SerialUsci> ErrorType for Tx<USCI> {
        type Error = Infallible;
    }
    impl<USCI: SerialUsci> Write<u8> for Tx<USCI> {
        #[inline]
        fn flush(&mut self) -> nb::Result<(), Self::Error> {
            Tx::flush(self)
        }

        /// Loads TXBUF, or `WouldBlock` while it is still full.
        #[inline]
        fn write(&mut self, data: u8) -> nb::Result<(), Self::Error> {
            self.send(data)
        }
    }
}
