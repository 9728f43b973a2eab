//! Shaft velocity from the time between encoder pulses.
//!
//! The capture unit of a free-running 16-bit timer latches the timer on each rising edge of
//! encoder channel A. Channel B, sampled at the same moment, gives the direction. The overflow
//! interrupt extends the timer so slow pulses are measured correctly.

use core::f32::consts::PI;

/// Ticks per timer overflow.
const WRAP: u32 = 1 << 16;

/// Timer rate and encoder resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VelocityConfig {
    /// Capture timer clock.
    pub timer_hz: u32,
    /// Channel A pulses per output shaft revolution, gearbox included.
    pub pulses_per_rev: u32,
}

impl Default for VelocityConfig {
    /// SMCLK (2^20 Hz) divided by 14, and a 1150 pulse gearmotor encoder.
    fn default() -> Self {
        VelocityConfig {
            timer_hz: 74_898,
            pulses_per_rev: 1150,
        }
    }
}

impl VelocityConfig {
    /// Radians per second times timer ticks per pulse.
    pub fn rad_per_sec_ticks(&self) -> f32 {
        self.timer_hz as f32 * 2.0 * PI / self.pulses_per_rev.max(1) as f32
    }
}

/// Pulse-period velocity meter.
#[derive(Debug, Clone)]
pub struct VelocityMeter {
    k: f32,
    last: Option<u16>,
    overflows: u16,
    period: Option<u32>,
    reversed: bool,
}

impl VelocityMeter {
    /// Meter with no measurement yet.
    pub fn new(config: VelocityConfig) -> Self {
        VelocityMeter {
            k: config.rad_per_sec_ticks(),
            last: None,
            overflows: 0,
            period: None,
            reversed: false,
        }
    }

    /// Records a capture at timer value `ccr`. `dir_high` is the level of channel B.
    ///
    /// The first capture only sets the reference point.
    pub fn on_capture(&mut self, ccr: u16, dir_high: bool) {
        if let Some(last) = self.last {
            let ticks = (u32::from(self.overflows) * WRAP + u32::from(ccr)).wrapping_sub(u32::from(last));
            if ticks != 0 {
                self.period = Some(ticks);
                self.reversed = dir_high;
            }
        }
        self.last = Some(ccr);
        self.overflows = 0;
    }

    /// Records a timer overflow.
    pub fn on_overflow(&mut self) {
        self.overflows = self.overflows.saturating_add(1);
    }

    /// Ticks between the last two pulses, if a new one arrived.
    pub fn period(&self) -> Option<u32> {
        self.period
    }

    /// Velocity in rad/s from the latest period, negative when channel B was high. Zero if no
    /// pulse arrived since the previous call.
    pub fn take_rad_per_sec(&mut self) -> f32 {
        match self.period.take() {
            Some(ticks) if self.reversed => -self.k / ticks as f32,
            Some(ticks) => self.k / ticks as f32,
            None => 0.0,
        }
    }

    /// Drops the reference point, e.g. after the motor was stopped for a long time.
    pub fn reset(&mut self) {
        self.last = None;
        self.overflows = 0;
        self.period = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3 * b.abs().max(1.0)
    }

    #[test]
    fn default_constant() {
        assert!(close(VelocityConfig::default().rad_per_sec_ticks(), 409.216));
    }

    #[test]
    fn first_capture_is_reference() {
        let mut m = VelocityMeter::new(VelocityConfig::default());
        m.on_capture(1000, false);
        assert_eq!(m.period(), None);
        assert_eq!(m.take_rad_per_sec(), 0.0);
        m.on_capture(1100, false);
        assert_eq!(m.period(), Some(100));
        assert!(close(m.take_rad_per_sec(), 4.09216));
        assert_eq!(m.take_rad_per_sec(), 0.0);
    }

    #[test]
    fn period_across_overflows() {
        let mut m = VelocityMeter::new(VelocityConfig::default());
        m.on_capture(60_000, false);
        m.on_overflow();
        m.on_capture(1_000, true);
        assert_eq!(m.period(), Some(65_536 + 1_000 - 60_000));
        m.on_capture(2_000, false);
        m.on_overflow();
        m.on_overflow();
        m.on_capture(2_000, true);
        assert_eq!(m.period(), Some(2 * 65_536));
        assert!(m.take_rad_per_sec() < 0.0);
    }

    #[test]
    fn reset_forgets_reference() {
        let mut m = VelocityMeter::new(VelocityConfig::default());
        m.on_capture(10, false);
        m.reset();
        m.on_capture(20, false);
        assert_eq!(m.period(), None);
    }
}
