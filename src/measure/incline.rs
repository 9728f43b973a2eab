//! Tilt from a two-axis analog accelerometer.
//!
//! The ADC converts the X then the Y axis in a repeating sequence. Each axis keeps a moving sum
//! over the last `N` samples, and every `N` Y samples the averaged tilt is reported.

use core::f32::consts::{FRAC_PI_2, PI};

/// ADC reading at 0 g (mid-scale of a 12-bit converter).
pub const MIDSCALE: i32 = 2047;

/// Moving-sum inclinometer.
#[derive(Debug, Clone)]
pub struct Inclinometer<const N: usize = 25> {
    xs: [u16; N],
    ys: [u16; N],
    sum_x: i32,
    sum_y: i32,
    index: usize,
}

impl<const N: usize> Default for Inclinometer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Inclinometer<N> {
    /// Empty windows.
    pub const fn new() -> Self {
        Inclinometer {
            xs: [0; N],
            ys: [0; N],
            sum_x: 0,
            sum_y: 0,
            index: 0,
        }
    }

    /// Adds an X-axis sample.
    pub fn push_x(&mut self, sample: u16) {
        if let Some(slot) = self.xs.get_mut(self.index) {
            self.sum_x += i32::from(sample) - i32::from(*slot);
            *slot = sample;
        }
    }

    /// Adds a Y-axis sample, completing one X/Y pair. Returns the tilt in degrees after every
    /// `N`-th pair.
    pub fn push_y(&mut self, sample: u16) -> Option<f32> {
        if let Some(slot) = self.ys.get_mut(self.index) {
            self.sum_y += i32::from(sample) - i32::from(*slot);
            *slot = sample;
        }
        self.index += 1;
        if self.index < N {
            return None;
        }
        self.index = 0;
        Some(self.angle())
    }

    /// Tilt of the current windows in degrees.
    pub fn angle(&self) -> f32 {
        let mid = MIDSCALE * N as i32;
        atan2((mid - self.sum_x) as f32, (mid - self.sum_y) as f32).to_degrees()
    }
}

// Abramowitz and Stegun 4.4.49, |error| < 1e-5 rad on [-1, 1].
fn atan_unit(z: f32) -> f32 {
    let z2 = z * z;
    z * (0.999_866 + z2 * (-0.330_299_5 + z2 * (0.180_141 + z2 * (-0.085_133 + z2 * 0.020_835_1))))
}

// `f32::abs` lives in std, not core.
fn abs_f32(v: f32) -> f32 {
    if v < 0.0 {
        -v
    } else {
        v
    }
}

/// Four-quadrant arctangent of `y / x` in radians. `atan2(0, 0)` is zero.
pub fn atan2(y: f32, x: f32) -> f32 {
    if x == 0.0 && y == 0.0 {
        return 0.0;
    }
    if abs_f32(y) <= abs_f32(x) {
        let a = atan_unit(y / x);
        if x > 0.0 {
            a
        } else if y >= 0.0 {
            a + PI
        } else {
            a - PI
        }
    } else {
        let a = -atan_unit(x / y);
        if y > 0.0 {
            a + FRAC_PI_2
        } else {
            a - FRAC_PI_2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_without_std() {
        assert_eq!(abs_f32(-2.5), 2.5);
        assert_eq!(abs_f32(2.5), 2.5);
        assert_eq!(abs_f32(-0.0), 0.0);
    }

    #[test]
    fn atan2_matches_std() {
        let mut worst = 0.0f32;
        for i in -20..=20 {
            for j in -20..=20 {
                let (y, x) = (i as f32 * 13.0, j as f32 * 7.0);
                if x == 0.0 && y == 0.0 {
                    continue;
                }
                worst = worst.max((atan2(y, x) - y.atan2(x)).abs());
            }
        }
        assert!(worst.to_degrees() < 0.1, "worst error {worst}");
        assert_eq!(atan2(0.0, 0.0), 0.0);
    }

    fn feed<const N: usize>(inc: &mut Inclinometer<N>, x: u16, y: u16) -> Option<f32> {
        let mut out = None;
        for _ in 0..N {
            inc.push_x(x);
            out = inc.push_y(y);
        }
        out
    }

    #[test]
    fn reports_once_per_window() {
        let mut inc: Inclinometer<4> = Inclinometer::new();
        for _ in 0..3 {
            inc.push_x(2047);
            assert_eq!(inc.push_y(1947), None);
        }
        inc.push_x(2047);
        let level = inc.push_y(1947).unwrap();
        assert!(level.abs() < 0.1);
    }

    #[test]
    fn tilt_angles() {
        let mut inc: Inclinometer = Inclinometer::new();
        let side = feed(&mut inc, 1947, 2047).unwrap();
        assert!((side - 90.0).abs() < 0.1);
        let diag = feed(&mut inc, 1947, 1947).unwrap();
        assert!((diag - 45.0).abs() < 0.1);
        let back = feed(&mut inc, 2147, 2047).unwrap();
        assert!((back + 90.0).abs() < 0.1);
    }
}
