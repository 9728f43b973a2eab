//! Motor PWM on Timer_B3 CCR1, output on P6.0.
//!
//! The timer counts up to a fixed period so duty cycle is a plain fraction of it, and the
//! carrier frequency is changed by reprogramming the timer's input dividers with a
//! [`PwmSetting`] from [`PwmClock::select`].

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use msp430fr2355 as pac;

use super::port::select_primary;
use super::regs::{tb_id, GpioPeriph, SubTimerB, TbCctl, TbCtl, CCR0, CCR1};
use crate::measure::{PwmClock, PwmSetting};

/// Marks a Timer_B whose CCR1 output drives the motor, along with where that pin lives.
pub trait PwmTimer: SubTimerB<CCR0> + SubTimerB<CCR1> {
    /// Port holding the output.
    type Port: GpioPeriph;
    /// Output pin of that port.
    const PIN_MASK: u8;
}

impl PwmTimer for pac::TB3 {
    type Port = pac::P6;
    const PIN_MASK: u8 = 1 << 0;
}

/// Builder object for the PWM output.
pub struct PwmConfig<TIM: PwmTimer> {
    timer: TIM,
    clock: PwmClock,
    setting: PwmSetting,
}

impl<TIM: PwmTimer> PwmConfig<TIM> {
    /// Timer clocked from SMCLK as described by `clock`, starting with `setting`.
    pub fn new(timer: TIM, clock: PwmClock, setting: PwmSetting) -> Self {
        PwmConfig {
            timer,
            clock,
            setting,
        }
    }

    /// Starts the timer with the output low and hands the pin to it.
    pub fn configure(self, port: &TIM::Port) -> Pwm<TIM> {
        let timer = self.timer;
        timer.ctl_wr(TbCtl::TBCLR.bits());
        SubTimerB::<CCR0>::ccr_wr(&timer, self.clock.period);
        SubTimerB::<CCR1>::ccr_wr(&timer, 0);
        SubTimerB::<CCR1>::cctl_wr(&timer, TbCctl::OUTMOD_RESET_SET.bits());
        port.pxdir_set(TIM::PIN_MASK);
        select_primary(port, TIM::PIN_MASK);

        let mut pwm = Pwm {
            period: self.clock.period,
            _timer: PhantomData,
        };
        pwm.retime(self.setting);
        pwm
    }
}

/// The PWM channel.
pub struct Pwm<TIM: PwmTimer> {
    period: u16,
    _timer: PhantomData<TIM>,
}

impl<TIM: PwmTimer> Pwm<TIM> {
    /// Reprograms the input dividers, keeping period and duty.
    pub fn retime(&mut self, setting: PwmSetting) {
        let timer = unsafe { TIM::steal() };
        timer.ex0_wr(setting.idex);
        timer.ctl_wr((TbCtl::TBSSEL_SMCLK | TbCtl::MC_UP | TbCtl::TBCLR).bits() | tb_id(setting.id));
        debug!("pwm /{=u8} /{=u8} -> {=u32} Hz", setting.id, setting.idex, setting.hz);
    }
}

impl<TIM: PwmTimer> ErrorType for Pwm<TIM> {
    type Error = Infallible;
}

impl<TIM: PwmTimer> SetDutyCycle for Pwm<TIM> {
    fn max_duty_cycle(&self) -> u16 {
        self.period
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        let timer = unsafe { TIM::steal() };
        SubTimerB::<CCR1>::ccr_wr(&timer, duty.min(self.period));
        Ok(())
    }
}
