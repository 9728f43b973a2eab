//! DC motor commands: VNH7070 H-bridge on a PWM carrier, speed from the capture timer.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::cmd::{CmdData, CmdResult, Command, ErrorCode, Fault, Full, Interpreter};
use crate::drivers::vnh7070::{self, Vnh7070};
use crate::measure::{PwmClock, PwmSetting};

/// Messages of this set, in fault order.
pub const ERRORS: [&str; 3] = [
    "Value must be positive.",
    "PWM duty must be <= 100",
    "motor driver not responding",
];

const NOT_POSITIVE: Fault = Fault(0);
const BAD_DUTY: Fault = Fault(1);
const DRIVER: Fault = Fault(2);

/// Gives the motor commands the bridge, its carrier timer and the speed meter.
pub trait MotorContext {
    /// Control pins.
    type Pin: OutputPin;
    /// PWM channel.
    type Pwm: SetDutyCycle;

    /// The bridge.
    fn motor(&mut self) -> &mut Vnh7070<Self::Pin, Self::Pwm>;

    /// Clock the carrier timer runs from.
    fn pwm_clock(&self) -> PwmClock;

    /// Reprograms the carrier timer's dividers.
    fn apply_pwm(&mut self, setting: PwmSetting);

    /// Speed in rad/s since the last call, see [`VelocityMeter`](crate::measure::VelocityMeter).
    fn take_speed(&mut self) -> f32;
}

/// Registers `pwmFreq`, `pwmDuty`, `setMtr`, `brake` and `getSpeed`.
pub fn register<C: MotorContext, const CMDS: usize, const ERRS: usize>(
    interp: &mut Interpreter<C, CMDS, ERRS>,
) -> Result<ErrorCode, Full> {
    interp.register_set(
        &ERRORS,
        &[
            Command::new("pwmFreq", 1, pwm_freq::<C>),
            Command::new("pwmDuty", 1, pwm_duty::<C>),
            Command::new("setMtr", 1, set_motor::<C>),
            Command::new("brake", 0, brake::<C>),
            Command::new("getSpeed", 0, get_speed::<C>),
        ],
    )
}

fn driver_fault<P, W>(e: vnh7070::Error<P, W>) -> Fault {
    match e {
        vnh7070::Error::BadDuty(_) | vnh7070::Error::BadControl(_) => BAD_DUTY,
        vnh7070::Error::Pin(_) | vnh7070::Error::Pwm(_) => {
            warn!("VNH7070 control failed");
            DRIVER
        }
    }
}

fn pwm_freq<C: MotorContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let hz = data.arg_in(0, 1..=i32::MAX, NOT_POSITIVE)? as u32;
    let setting = ctx.pwm_clock().select(hz).map_err(|_| NOT_POSITIVE)?;
    ctx.apply_pwm(setting);
    data.result = CmdResult::UInt(setting.hz);
    Ok(())
}

fn pwm_duty<C: MotorContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let duty = data.arg_in(0, 0..=100, BAD_DUTY)? as u8;
    ctx.motor().set_duty(duty).map_err(driver_fault)
}

fn set_motor<C: MotorContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let signed = data.arg_in(0, -100..=100, BAD_DUTY)?;
    ctx.motor().set_motor(signed).map_err(driver_fault)
}

fn brake<C: MotorContext>(ctx: &mut C, _: &mut CmdData) -> Result<(), Fault> {
    ctx.motor().brake().map_err(driver_fault)
}

fn get_speed<C: MotorContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    data.result = CmdResult::Float(ctx.take_speed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::vnh7070::Control;
    use crate::test_util::{PinMock, PwmMock};

    struct Rig {
        motor: Vnh7070<PinMock, PwmMock>,
        applied: Option<PwmSetting>,
        speed: f32,
    }

    impl MotorContext for Rig {
        type Pin = PinMock;
        type Pwm = PwmMock;

        fn motor(&mut self) -> &mut Vnh7070<PinMock, PwmMock> {
            &mut self.motor
        }

        fn pwm_clock(&self) -> PwmClock {
            PwmClock::default()
        }

        fn apply_pwm(&mut self, setting: PwmSetting) {
            self.applied = Some(setting);
        }

        fn take_speed(&mut self) -> f32 {
            core::mem::take(&mut self.speed)
        }
    }

    fn setup() -> (Interpreter<Rig, 8, 16>, ErrorCode, Rig) {
        let mut i = Interpreter::new().unwrap();
        let base = register(&mut i).unwrap();
        let rig = Rig {
            motor: Vnh7070::new(
                PinMock::default(),
                PinMock::default(),
                PinMock::default(),
                PwmMock::default(),
            ),
            applied: None,
            speed: 0.0,
        };
        (i, base, rig)
    }

    #[test]
    fn frequency_reports_achieved_value() {
        let (interp, base, mut rig) = setup();
        let out = interp.execute(&mut rig, "pwmFreq 10000");
        assert_eq!(out.result, CmdResult::UInt(10_486));
        assert_eq!(rig.applied.map(|s| s.divider()), Some(1));
        assert_eq!(interp.execute(&mut rig, "pwmFreq 0").code, base);
        assert_eq!(interp.message(base), "Value must be positive.");
    }

    #[test]
    fn direction_and_duty() {
        let (interp, base, mut rig) = setup();
        interp.execute(&mut rig, "setMtr -40");
        assert_eq!(rig.motor.control(), Control::IN_A);
        assert_eq!(rig.motor.duty(), 40);
        interp.execute(&mut rig, "setMtr 25");
        assert_eq!(rig.motor.control(), Control::IN_B | Control::SEL);
        interp.execute(&mut rig, "pwmDuty 60");
        assert_eq!(rig.motor.control(), Control::IN_B | Control::SEL);
        assert_eq!(rig.motor.duty(), 60);
        interp.execute(&mut rig, "brake");
        assert_eq!(rig.motor.control(), Control::empty());
        assert_eq!(rig.motor.duty(), 100);

        assert_eq!(interp.execute(&mut rig, "pwmDuty 101").code, ErrorCode(base.0 + 1));
        assert_eq!(interp.execute(&mut rig, "setMtr -101").code, ErrorCode(base.0 + 1));
    }

    #[test]
    fn speed_is_a_float_result() {
        let (interp, _, mut rig) = setup();
        rig.speed = -12.5;
        let out = interp.execute(&mut rig, "getSpeed");
        assert_eq!(out.result.to_string(), "-12.500");
        assert_eq!(interp.execute(&mut rig, "getSpeed").result, CmdResult::Float(0.0));
    }
}
