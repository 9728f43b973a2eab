//! Register-level glue for the MSP430FR2355 LaunchPad as wired for the labs.
//!
//! | Part | Peripheral | Pins |
//! |---|---|---|
//! | Console UART | eUSCI_A1 | TX P4.3, RX P4.2 |
//! | LCD and encoder counter | eUSCI_B1 SPI | CLK P4.5, SIMO P4.6, SOMI P4.7 |
//! | Pixy2 camera | eUSCI_B0 I2C | SDA P1.2, SCL P1.3 |
//! | Motor PWM | Timer_B3 CCR1 | P6.0 |
//! | Encoder velocity | Timer_B1 CCR1 capture | P2.0 |
//! | Service tick | Timer_B0 CCR0 | none |
//!
//! Each module takes the PAC peripheral by value when it is configured and hands back
//! zero-sized handles that reach the registers again through `steal()`, so they can be moved
//! into interrupt handlers freely.

pub mod capture;
pub mod i2c;
pub mod port;
pub mod pwm;
pub mod serial;
pub mod spi;
pub mod tick;

mod regs;

use msp430fr2355 as pac;

/// SMCLK frequency after reset: the FLL locks DCOCLKDIV to 32 times the 32768 Hz REFO.
pub const SMCLK_HZ: u32 = 1 << 20;

const WDTPW: u16 = 0x5A00;
const WDTHOLD: u16 = 0x0080;

/// Stops the watchdog. The demos never feed it.
pub fn hold_watchdog(wdt: &pac::WDT_A) {
    wdt.wdtctl.write(|w| unsafe { w.bits(WDTPW | WDTHOLD) });
}

/// Releases the pins from their power-on high-impedance state. Call after the pins have been
/// configured so they switch straight to their final function.
pub fn unlock_pins(pmm: &pac::PMM) {
    pmm.pm5ctl0.write(|w| w.locklpm5().locklpm5_0());
    info!("pins unlocked");
}
