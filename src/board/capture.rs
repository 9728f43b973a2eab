//! Encoder pulse capture on Timer_B1 CCR1, input on P2.0.
//!
//! The timer runs continuously from SMCLK / 14, the default
//! [`VelocityConfig`](crate::measure::VelocityConfig) rate, and latches its count on every
//! rising edge of encoder channel A. Both the capture and the overflow raise the `TIMER1_B1`
//! interrupt; [`Capture::event`] says which one happened.

use core::marker::PhantomData;

use msp430fr2355 as pac;

use super::port::select_primary;
use super::regs::{tb_id, GpioPeriph, SubTimerB, TbCctl, TbCtl, CCR1};

const TBIV_CCR1: u16 = 0x02;
const TBIV_OVERFLOW: u16 = 0x0E;

/// Marks a Timer_B whose CCR1 input sees encoder channel A, along with where that pin lives.
pub trait CaptureTimer: SubTimerB<CCR1> {
    /// Port holding the input.
    type Port: GpioPeriph;
    /// Input pin of that port.
    const PIN_MASK: u8;
}

impl CaptureTimer for pac::TB1 {
    type Port = pac::P2;
    const PIN_MASK: u8 = 1 << 0;
}

/// Timer clock dividers. The defaults give SMCLK / 14.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// ID divider: 1, 2, 4 or 8.
    pub id: u8,
    /// IDEX divider: 1 to 8.
    pub idex: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig { id: 2, idex: 7 }
    }
}

impl CaptureConfig {
    /// Starts the timer with capture and overflow interrupts enabled.
    pub fn configure<TIM: CaptureTimer>(self, timer: TIM, port: &TIM::Port) -> Capture<TIM> {
        port.pxdir_clear(TIM::PIN_MASK);
        select_primary(port, TIM::PIN_MASK);

        timer.ctl_wr(TbCtl::TBCLR.bits());
        timer.ex0_wr(self.idex);
        // CCIS = 0 selects CCIxA, the pin
        timer.cctl_wr((TbCctl::CM_RISING | TbCctl::SCS | TbCctl::CAP | TbCctl::CCIE).bits());
        timer.ctl_wr(
            (TbCtl::TBSSEL_SMCLK | TbCtl::MC_CONTINUOUS | TbCtl::TBCLR | TbCtl::TBIE).bits() | tb_id(self.id),
        );
        Capture(PhantomData)
    }
}

/// What raised the capture timer's interrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureEvent {
    /// A rising edge latched this count.
    Edge(u16),
    /// The counter wrapped.
    Overflow,
    /// Nothing pending.
    None,
}

/// Capture channel handle, usable from the interrupt handler.
pub struct Capture<TIM: CaptureTimer>(PhantomData<TIM>);

impl<TIM: CaptureTimer> Capture<TIM> {
    /// Reads the vector register, which clears the flag it reports.
    pub fn event(&mut self) -> CaptureEvent {
        let timer = unsafe { TIM::steal() };
        match timer.iv_rd() {
            TBIV_CCR1 => {
                if TbCctl::from_bits_truncate(timer.cctl_rd()).contains(TbCctl::COV) {
                    warn!("capture overrun");
                    timer.cctl_clear(TbCctl::COV.bits());
                }
                CaptureEvent::Edge(timer.ccr_rd())
            }
            TBIV_OVERFLOW => CaptureEvent::Overflow,
            _ => CaptureEvent::None,
        }
    }
}
