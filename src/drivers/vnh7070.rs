//! VNH7070 H-bridge: two direction inputs, a current-sense select line and a PWM input.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

bitflags::bitflags! {
    /// Levels of the three control inputs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Control: u8 {
        /// INa, high side A. Drives clockwise.
        const IN_A = 0x01;
        /// INb, high side B. Drives counter-clockwise.
        const IN_B = 0x02;
        /// SEL0, current sense select.
        const SEL = 0x04;
    }
}

/// Motor driver errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<P, W> {
    /// A control pin could not be driven.
    Pin(P),
    /// The PWM channel rejected the duty cycle.
    Pwm(W),
    /// Control value above 7.
    BadControl(u8),
    /// Duty cycle outside 0..=100, or -100..=100 for [`Vnh7070::set_motor`].
    BadDuty(i32),
}

/// VNH7070 driver. All three control pins share one type.
pub struct Vnh7070<P, PWM> {
    in_a: P,
    in_b: P,
    sel: P,
    pwm: PWM,
    control: Control,
    duty: u8,
}

type VnhResult<P, PWM> = Result<
    (),
    Error<<P as embedded_hal::digital::ErrorType>::Error, <PWM as embedded_hal::pwm::ErrorType>::Error>,
>;

impl<P: OutputPin, PWM: SetDutyCycle> Vnh7070<P, PWM> {
    /// Takes the pins and PWM channel. Nothing is driven until [`Vnh7070::init`].
    pub fn new(in_a: P, in_b: P, sel: P, pwm: PWM) -> Self {
        Vnh7070 {
            in_a,
            in_b,
            sel,
            pwm,
            control: Control::empty(),
            duty: 0,
        }
    }

    /// Lets the motor free-wheel with zero duty, without entering standby.
    pub fn init(&mut self) -> VnhResult<P, PWM> {
        self.input_ctrl(Control::SEL.bits())?;
        self.set_duty(0)
    }

    /// Drives the three control inputs from the low three bits of `bits`.
    pub fn input_ctrl(&mut self, bits: u8) -> VnhResult<P, PWM> {
        let Some(control) = Control::from_bits(bits) else {
            return Err(Error::BadControl(bits));
        };
        let levels = [
            (&mut self.in_a, Control::IN_A),
            (&mut self.in_b, Control::IN_B),
            (&mut self.sel, Control::SEL),
        ];
        for (pin, bit) in levels {
            pin.set_state(control.contains(bit).into())
                .map_err(Error::<P::Error, PWM::Error>::Pin)?;
        }
        self.control = control;
        Ok(())
    }

    /// Changes the duty cycle, in percent, keeping the direction.
    pub fn set_duty(&mut self, percent: u8) -> VnhResult<P, PWM> {
        if percent > 100 {
            return Err(Error::BadDuty(i32::from(percent)));
        }
        self.pwm
            .set_duty_cycle_percent(percent)
            .map_err(Error::<P::Error, PWM::Error>::Pwm)?;
        self.duty = percent;
        Ok(())
    }

    /// Runs clockwise.
    pub fn clockwise(&mut self, percent: u8) -> VnhResult<P, PWM> {
        self.check_duty(percent)?;
        self.input_ctrl(Control::IN_A.bits())?;
        self.set_duty(percent)
    }

    /// Runs counter-clockwise.
    pub fn counter_clockwise(&mut self, percent: u8) -> VnhResult<P, PWM> {
        self.check_duty(percent)?;
        self.input_ctrl((Control::IN_B | Control::SEL).bits())?;
        self.set_duty(percent)
    }

    /// Brakes to ground: both high sides off, PWM fully on.
    pub fn brake(&mut self) -> VnhResult<P, PWM> {
        self.input_ctrl(0)?;
        self.set_duty(100)
    }

    /// Sets direction and duty together. Negative runs clockwise, zero and up
    /// counter-clockwise.
    pub fn set_motor(&mut self, signed_percent: i32) -> VnhResult<P, PWM> {
        if !(-100..=100).contains(&signed_percent) {
            return Err(Error::BadDuty(signed_percent));
        }
        let duty = signed_percent.unsigned_abs() as u8;
        if signed_percent < 0 {
            self.clockwise(duty)
        } else {
            self.counter_clockwise(duty)
        }
    }

    /// Current control inputs.
    pub fn control(&self) -> Control {
        self.control
    }

    /// Current duty cycle in percent.
    pub fn duty(&self) -> u8 {
        self.duty
    }

    /// Mutable access to the PWM channel, e.g. to retime it.
    pub fn pwm_mut(&mut self) -> &mut PWM {
        &mut self.pwm
    }

    /// Gives the pins and PWM channel back.
    pub fn release(self) -> (P, P, P, PWM) {
        (self.in_a, self.in_b, self.sel, self.pwm)
    }

    fn check_duty(&self, percent: u8) -> VnhResult<P, PWM> {
        if percent > 100 {
            Err(Error::BadDuty(i32::from(percent)))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{PinMock, PwmMock};

    fn motor() -> Vnh7070<PinMock, PwmMock> {
        Vnh7070::new(
            PinMock::default(),
            PinMock::default(),
            PinMock::default(),
            PwmMock::default(),
        )
    }

    fn levels(m: &Vnh7070<PinMock, PwmMock>) -> (bool, bool, bool) {
        (m.in_a.high, m.in_b.high, m.sel.high)
    }

    #[test]
    fn init_free_wheels() {
        let mut m = motor();
        m.init().unwrap();
        assert_eq!(levels(&m), (false, false, true));
        assert_eq!(m.pwm.duty, 0);
    }

    #[test]
    fn directions() {
        let mut m = motor();
        m.set_motor(-40).unwrap();
        assert_eq!(levels(&m), (true, false, false));
        assert_eq!(m.pwm.duty, 40);

        m.set_motor(75).unwrap();
        assert_eq!(levels(&m), (false, true, true));
        assert_eq!(m.duty(), 75);

        m.set_duty(10).unwrap();
        assert_eq!(m.control(), Control::IN_B | Control::SEL);
        assert_eq!(m.pwm.duty, 10);

        m.brake().unwrap();
        assert_eq!(levels(&m), (false, false, false));
        assert_eq!(m.pwm.duty, 100);
    }

    #[test]
    fn rejects_bad_values_without_moving() {
        let mut m = motor();
        m.set_motor(20).unwrap();
        assert_eq!(m.set_motor(101), Err(Error::BadDuty(101)));
        assert_eq!(m.set_motor(-101), Err(Error::BadDuty(-101)));
        assert_eq!(m.set_duty(150), Err(Error::BadDuty(150)));
        assert_eq!(m.input_ctrl(8), Err(Error::BadControl(8)));
        assert_eq!(m.clockwise(101), Err(Error::BadDuty(101)));
        assert_eq!(levels(&m), (false, true, true));
        assert_eq!(m.pwm.duty, 20);
    }

    #[test]
    fn raw_control_bits() {
        let mut m = motor();
        m.input_ctrl(0b101).unwrap();
        assert_eq!(levels(&m), (true, false, true));
    }
}
