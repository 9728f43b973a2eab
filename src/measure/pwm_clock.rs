//! Timer clock dividers for a PWM carrier.
//!
//! The PWM period is fixed so duty cycle stays a plain percentage. Frequency is then set by
//! the timer's two input dividers, ID (1, 2, 4 or 8) and IDEX (1 to 8).

/// Input divider choices.
pub const ID: [u8; 4] = [1, 2, 4, 8];
/// Largest expansion divider.
pub const IDEX_MAX: u8 = 8;

/// Why a frequency cannot be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmClockError {
    /// Zero Hz was asked for.
    ZeroFrequency,
}

/// Divider pair and the carrier frequency it gives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmSetting {
    /// ID divider: 1, 2, 4 or 8.
    pub id: u8,
    /// IDEX divider: 1 to 8.
    pub idex: u8,
    /// Achieved carrier frequency, rounded.
    pub hz: u32,
}

impl PwmSetting {
    /// Total clock division.
    pub fn divider(&self) -> u32 {
        u32::from(self.id) * u32::from(self.idex)
    }
}

/// Timer clock and PWM period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmClock {
    /// Timer source clock.
    pub source_hz: u32,
    /// Timer counts per PWM period.
    pub period: u16,
}

impl Default for PwmClock {
    /// SMCLK at its reset value of 2^20 Hz, 100 counts per period.
    fn default() -> Self {
        PwmClock {
            source_hz: 1 << 20,
            period: 100,
        }
    }
}

impl PwmClock {
    /// Carrier frequency for a total clock division, rounded to the nearest Hz.
    pub fn frequency(&self, divider: u32) -> u32 {
        let den = u64::from(divider.max(1)) * u64::from(self.period.max(1));
        ((u64::from(self.source_hz) + den / 2) / den) as u32
    }

    /// Dividers whose carrier is nearest `desired_hz`. Ties go to the smaller division.
    pub fn select(&self, desired_hz: u32) -> Result<PwmSetting, PwmClockError> {
        if desired_hz == 0 {
            return Err(PwmClockError::ZeroFrequency);
        }
        let best = ID
            .iter()
            .flat_map(|&id| (1..=IDEX_MAX).map(move |idex| (id, idex)))
            .map(|(id, idex)| {
                let div = u32::from(id) * u32::from(idex);
                PwmSetting {
                    id,
                    idex,
                    hz: self.frequency(div),
                }
            })
            .min_by_key(|s| (s.hz.abs_diff(desired_hz), s.divider()));
        let setting = best.ok_or(PwmClockError::ZeroFrequency)?;
        debug!("pwm {=u32} Hz -> /{=u8}/{=u8}", desired_hz, setting.id, setting.idex);
        Ok(setting)
    }

    /// Compare value for `percent` duty, saturating at the full period.
    pub fn compare_for(&self, percent: u8) -> u16 {
        let counts = u32::from(self.period) * u32::from(percent.min(100)) / 100;
        counts as u16
    }
}
