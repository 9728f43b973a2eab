//! Periodic service tick on Timer_B0 CCR0, clocked from ACLK.
//!
//! The `TIMER0_B0` interrupt fires once per period and its flag clears itself on entry, so the
//! handler only has to do its work.

use core::marker::PhantomData;

use msp430fr2355 as pac;

use super::regs::{SubTimerB, TbCctl, TbCtl, CCR0};

/// ACLK after reset: the 32768 Hz REFO.
pub const ACLK_HZ: u32 = 32_768;

/// Marks a Timer_B usable as the tick source.
pub trait TickTimer: SubTimerB<CCR0> {}

impl TickTimer for pac::TB0 {}

/// Tick handle. Dropping it leaves the timer running.
pub struct Tick<TIM: TickTimer>(PhantomData<TIM>);

/// Starts `timer` interrupting `hz` times a second, clamped to what a 16-bit period from ACLK
/// can do.
pub fn start<TIM: TickTimer>(timer: TIM, hz: u32) -> Tick<TIM> {
    let period = (ACLK_HZ / hz.max(1)).clamp(2, 0x1_0000) - 1;
    timer.ctl_wr(TbCtl::TBCLR.bits());
    timer.ex0_wr(1);
    timer.ccr_wr(period as u16);
    timer.cctl_wr(TbCctl::CCIE.bits());
    timer.ctl_wr((TbCtl::TBSSEL_ACLK | TbCtl::MC_UP | TbCtl::TBCLR).bits());
    debug!("tick every {=u32} ACLK cycles", period + 1);
    Tick(PhantomData)
}

impl<TIM: TickTimer> Tick<TIM> {
    /// Stops the interrupts without stopping the timer.
    pub fn pause(&mut self) {
        let timer = unsafe { TIM::steal() };
        timer.cctl_clear(TbCctl::CCIE.bits());
    }

    /// Resumes the interrupts.
    pub fn resume(&mut self) {
        let timer = unsafe { TIM::steal() };
        timer.cctl_clear(TbCctl::CCIFG.bits());
        timer.cctl_set(TbCctl::CCIE.bits());
    }
}
