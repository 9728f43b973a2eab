//! Building blocks for the MSP430FR2355 LaunchPad labs: a serial command interpreter, drivers
//! for the parts wired to the board, and the small amount of math the labs need.
//! Here are the [`datasheet`] and [`User's guide`] for reference.
//!
//! Everything except [`board`] is written against [`embedded_hal`] 1.0 traits and builds on the
//! host, so `cargo test` runs the whole interpreter and every driver against recording mocks.
//! The `msp430fr2355` feature adds the register-level glue for the LaunchPad itself.
//!
//! [`embedded_hal`]: https://github.com/rust-embedded/embedded-hal
//! [`datasheet`]: http://www.ti.com/lit/ds/symlink/msp430fr2355.pdf
//! [`User's guide`]: http://www.ti.com/lit/ug/slau445i/slau445i.pdf
//!
//! # Usage
//!
//! Requires `msp430-elf-gcc` installed and in $PATH to build for the device.
//!
//! When using this crate as a dependency, make sure you include the appropriate `memory.x` file for
//! your microcontroller.
//!
//! # Demos
//!
//! The `demos/` directory contains two consoles built from these pieces. Build them with
//! `cargo build --release --target msp430-none-elf -Z build-std=core --features msp430fr2355
//! --example lab_console` and flash the ELF with `mspdebug tilib`.

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

#[macro_use]
mod fmt;

pub mod cmd;
pub mod commands;
pub mod drivers;
pub mod fedi;
pub mod measure;

#[cfg(feature = "msp430fr2355")]
pub mod board;

#[cfg(feature = "msp430fr2355")]
pub use msp430fr2355 as pac;

#[cfg(test)]
mod test_util;
