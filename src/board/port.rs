//! Digital I/O ports P1 to P6.
//!
//! [`Ports`] gives the port commands byte-wide access by port number. [`PortPin`] is a single
//! pin for the drivers that want an `embedded-hal` pin: chip selects, the LCD D/C line, the
//! motor bridge inputs and the encoder direction input.

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};
use msp430fr2355 as pac;

use super::regs::GpioPeriph;
use crate::commands::{BitOp, PortAccess};

/// Hands `mask` pins of `port` to their primary peripheral function (SEL1 = 0, SEL0 = 1).
#[inline]
pub(crate) fn select_primary<P: GpioPeriph>(port: &P, mask: u8) {
    port.pxsel1_clear(mask);
    port.pxsel0_set(mask);
}

/// Hands `mask` pins of `port` back to general purpose I/O.
#[inline]
pub(crate) fn select_gpio<P: GpioPeriph>(port: &P, mask: u8) {
    port.pxsel1_clear(mask);
    port.pxsel0_clear(mask);
}

/// All six ports, addressed by number.
pub struct Ports {
    p1: pac::P1,
    p2: pac::P2,
    p3: pac::P3,
    p4: pac::P4,
    p5: pac::P5,
    p6: pac::P6,
}

macro_rules! on_port {
    ($self:ident, $port:expr, |$p:ident| $body:expr, $none:expr) => {
        match $port {
            1 => { let $p = &$self.p1; $body }
            2 => { let $p = &$self.p2; $body }
            3 => { let $p = &$self.p3; $body }
            4 => { let $p = &$self.p4; $body }
            5 => { let $p = &$self.p5; $body }
            6 => { let $p = &$self.p6; $body }
            _ => $none,
        }
    };
}

fn apply<P: GpioPeriph>(p: &P, mask: u8, op: BitOp) {
    match op {
        BitOp::Clear => p.pxout_clear(mask),
        BitOp::Set => p.pxout_set(mask),
        BitOp::Toggle => p.pxout_toggle(mask),
    }
}

fn direction<P: GpioPeriph>(p: &P, mask: u8, output: bool) {
    if output {
        p.pxdir_set(mask);
    } else {
        p.pxdir_clear(mask);
    }
}

impl Ports {
    /// Takes the port peripherals. Pins already handed to a peripheral keep their function.
    pub fn new(p1: pac::P1, p2: pac::P2, p3: pac::P3, p4: pac::P4, p5: pac::P5, p6: pac::P6) -> Self {
        Ports { p1, p2, p3, p4, p5, p6 }
    }
}

impl PortAccess for Ports {
    fn port_count(&self) -> u8 {
        6
    }

    fn set_direction(&mut self, port: u8, mask: u8, output: bool) {
        on_port!(self, port, |p| direction(p, mask, output), ())
    }

    fn modify(&mut self, port: u8, mask: u8, op: BitOp) {
        on_port!(self, port, |p| apply(p, mask, op), ())
    }

    fn write(&mut self, port: u8, value: u8) {
        on_port!(self, port, |p| p.pxout_wr(value), ())
    }

    fn read(&mut self, port: u8) -> u8 {
        on_port!(self, port, |p| p.pxin_rd(), 0)
    }
}

/// One general purpose pin of port `P`.
pub struct PortPin<P: GpioPeriph> {
    mask: u8,
    _port: PhantomData<P>,
}

impl<P: GpioPeriph> PortPin<P> {
    /// Pin `pin` (0 to 7) as an output driven low.
    pub fn output(port: &P, pin: u8) -> Self {
        let mask = 1 << (pin & 7);
        select_gpio(port, mask);
        port.pxout_clear(mask);
        port.pxdir_set(mask);
        PortPin { mask, _port: PhantomData }
    }

    /// Pin `pin` (0 to 7) as an input.
    pub fn input(port: &P, pin: u8) -> Self {
        let mask = 1 << (pin & 7);
        select_gpio(port, mask);
        port.pxdir_clear(mask);
        PortPin { mask, _port: PhantomData }
    }
}

impl<P: GpioPeriph> ErrorType for PortPin<P> {
    type Error = Infallible;
}

impl<P: GpioPeriph> OutputPin for PortPin<P> {
    #[inline]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let p = unsafe { P::steal() };
        p.pxout_clear(self.mask);
        Ok(())
    }

    #[inline]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        let p = unsafe { P::steal() };
        p.pxout_set(self.mask);
        Ok(())
    }
}

impl<P: GpioPeriph> StatefulOutputPin for PortPin<P> {
    #[inline]
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        let p = unsafe { P::steal() };
        Ok(p.pxout_rd() & self.mask != 0)
    }

    #[inline]
    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        self.is_set_high().map(|high| !high)
    }

    #[inline]
    fn toggle(&mut self) -> Result<(), Self::Error> {
        let p = unsafe { P::steal() };
        p.pxout_toggle(self.mask);
        Ok(())
    }
}

impl<P: GpioPeriph> InputPin for PortPin<P> {
    #[inline]
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let p = unsafe { P::steal() };
        Ok(p.pxin_rd() & self.mask != 0)
    }

    #[inline]
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}
