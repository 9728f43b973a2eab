#![no_main]
#![no_std]

use msp430_rt::entry;
use msp430fr2x5x_labs::{
    board::{self, port::Ports, serial::SerialConfig},
    cmd::{Interpreter, PolledConsole},
    commands::{port, PortContext},
};

#[cfg(debug_assertions)]
use panic_msp430 as _;

#[cfg(not(debug_assertions))]
use panic_never as _;

struct Lab {
    ports: Ports,
}

impl PortContext for Lab {
    type Ports = Ports;

    fn ports(&mut self) -> &mut Ports {
        &mut self.ports
    }
}

// Blocking command console with the port commands on UART1, 9600 8N1.
// Try `portSetup 1 1 1` then `writeBits 1 2 1` to toggle the red LED.
#[entry]
fn main() -> ! {
    let Some(periph) = msp430fr2355::Peripherals::take() else {
        loop {}
    };
    board::hold_watchdog(&periph.WDT_A);

    let (mut tx, mut rx) = SerialConfig::new(periph.E_USCI_A1, 9600)
        .use_smclk(board::SMCLK_HZ)
        .split(&periph.P4);
    board::unlock_pins(&periph.PMM);

    let mut lab = Lab {
        ports: Ports::new(periph.P1, periph.P2, periph.P3, periph.P4, periph.P5, periph.P6),
    };

    let Ok(mut interp) = Interpreter::<Lab, 8, 16>::new() else {
        loop {}
    };
    if port::register(&mut interp).is_err() {
        loop {}
    }

    let mut console = PolledConsole::new();
    loop {
        // Serial errors only cost the current line
        let _ = console.run_once(&mut rx, &mut tx, &interp, &mut lab);
    }
}

// The compiler will emit calls to the abort() compiler intrinsic if debug assertions are
// enabled (default for dev profile). MSP430 does not actually have meaningful abort() support
// so for now, we create our own in each application where debug assertions are present.
#[no_mangle]
extern "C" fn abort() -> ! {
    panic!();
}
