//! Drivers for the external parts used in the labs, written against `embedded-hal` traits.

pub mod ls7366;
pub mod pcd8544;
pub mod pixy2;
pub mod vnh7070;
