//! Measurement helpers fed from interrupt handlers: shaft velocity from capture timestamps, PWM
//! clock selection and tilt from a two-axis accelerometer.

pub mod incline;
pub mod pwm_clock;
pub mod velocity;

pub use incline::{atan2, Inclinometer};
pub use pwm_clock::{PwmClock, PwmClockError, PwmSetting};
pub use velocity::{VelocityConfig, VelocityMeter};
