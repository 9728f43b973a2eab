#![no_main]
#![no_std]
#![feature(abi_msp430_interrupt)]

// Interrupt-driven command console on UART1 (9600 8N1) with every lab command set.
//
// Wiring besides the fixed peripheral pins:
//   LCD chip select P4.4, LCD D/C P4.0
//   LS7366R chip select P5.0
//   VNH7070 INA P3.0, INB P3.1, SEL0 P3.2
//   Encoder channel B P2.1 (channel A on the capture input P2.0)
//
// `pixyVector 1 3` keeps printing and drawing the camera's line on every tick until Enter.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use embedded_hal::{digital::InputPin, spi::MODE_0};
use embedded_hal_nb::serial::{Read, Write};
use embedded_io::WriteReady;
use msp430_rt::entry;
use msp430fr2355::{self as pac, interrupt};
use msp430fr2x5x_labs::{
    board::{
        self,
        capture::{Capture, CaptureConfig, CaptureEvent},
        i2c::{I2c, I2cConfig},
        port::{PortPin, Ports},
        pwm::{Pwm, PwmConfig},
        serial::{Rx, SerialConfig, Tx},
        spi::{ExclusiveSpi, SpiConfig},
        tick,
    },
    cmd::{Console, Full, Interpreter},
    commands::{
        encoder, lcd, motor, pixy, port, EncoderContext, EncoderParts, LcdContext, MotorContext,
        PixyContext, PixyParts, PortContext, VectorStream,
    },
    drivers::{ls7366::Ls7366, pcd8544::Pcd8544, pixy2::{Pixy2, VectorTracker}, vnh7070::Vnh7070},
    fedi::{EncoderGeometry, EncoderView},
    measure::{PwmClock, PwmSetting, VelocityConfig, VelocityMeter},
};

#[cfg(debug_assertions)]
use panic_msp430 as _;

#[cfg(not(debug_assertions))]
use panic_never as _;

type Lcd = Pcd8544<ExclusiveSpi<pac::E_USCI_B1, PortPin<pac::P4>>, PortPin<pac::P4>>;
type Counter = Ls7366<ExclusiveSpi<pac::E_USCI_B1, PortPin<pac::P5>>>;
type Motor = Vnh7070<PortPin<pac::P3>, Pwm<pac::TB3>>;
type Camera = Pixy2<I2c<pac::E_USCI_B0>>;

struct Speedo {
    capture: Capture<pac::TB1>,
    channel_b: PortPin<pac::P2>,
    meter: VelocityMeter,
}

static CONSOLE: Console = Console::new();
static SERIAL: Mutex<RefCell<Option<(Tx<pac::E_USCI_A1>, Rx<pac::E_USCI_A1>)>>> =
    Mutex::new(RefCell::new(None));
static SPEEDO: Mutex<RefCell<Option<Speedo>>> = Mutex::new(RefCell::new(None));
static TICKED: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));

struct Lab {
    ports: Ports,
    lcd: Lcd,
    counter: Counter,
    view: EncoderView,
    motor: Motor,
    pwm_clock: PwmClock,
    camera: Camera,
    tracker: VectorTracker,
    stream: VectorStream,
}

impl PortContext for Lab {
    type Ports = Ports;

    fn ports(&mut self) -> &mut Ports {
        &mut self.ports
    }
}

impl LcdContext for Lab {
    type Lcd = Lcd;

    fn lcd(&mut self) -> &mut Lcd {
        &mut self.lcd
    }
}

impl EncoderContext for Lab {
    type Spi = ExclusiveSpi<pac::E_USCI_B1, PortPin<pac::P5>>;
    type Lcd = Lcd;

    fn encoder(&mut self) -> EncoderParts<'_, Self::Spi, Lcd> {
        EncoderParts {
            counter: &mut self.counter,
            view: &mut self.view,
            lcd: &mut self.lcd,
        }
    }
}

impl MotorContext for Lab {
    type Pin = PortPin<pac::P3>;
    type Pwm = Pwm<pac::TB3>;

    fn motor(&mut self) -> &mut Motor {
        &mut self.motor
    }

    fn pwm_clock(&self) -> PwmClock {
        self.pwm_clock
    }

    fn apply_pwm(&mut self, setting: PwmSetting) {
        self.motor.pwm_mut().retime(setting);
    }

    fn take_speed(&mut self) -> f32 {
        critical_section::with(|cs| {
            SPEEDO
                .borrow_ref_mut(cs)
                .as_mut()
                .map_or(0.0, |s| s.meter.take_rad_per_sec())
        })
    }
}

impl PixyContext for Lab {
    type I2c = I2c<pac::E_USCI_B0>;
    type Lcd = Lcd;

    fn pixy(&mut self) -> PixyParts<'_, Self::I2c, Lcd> {
        PixyParts {
            camera: &mut self.camera,
            tracker: &mut self.tracker,
            lcd: Some(&mut self.lcd),
            stream: &mut self.stream,
        }
    }
}

impl Lab {
    fn refresh_view(&mut self) {
        if let Ok(count) = self.counter.count() {
            self.view.refresh(&mut self.lcd, count).ok();
        }
    }

    // One sample of a running `pixyVector 1 ..`
    fn stream_vector(&mut self) {
        if self.stream.mode().is_none() {
            return;
        }
        if !CONSOLE.streaming() {
            self.stream.stop();
            return;
        }
        match pixy::poll_stream(self) {
            Ok(Some(line)) => {
                if CONSOLE.stream(line) {
                    enable_tx();
                }
            }
            Ok(None) => {}
            Err(_) => {
                CONSOLE.stop_stream();
                enable_tx();
            }
        }
    }
}

fn register_all(interp: &mut Interpreter<Lab, 32, 32>) -> Result<(), Full> {
    port::register(interp)?;
    lcd::register(interp)?;
    motor::register(interp)?;
    pixy::register(interp)?;
    encoder::register(interp)?;
    Ok(())
}

fn enable_tx() {
    critical_section::with(|cs| {
        if let Some((tx, _)) = SERIAL.borrow_ref_mut(cs).as_mut() {
            tx.enable_tx_interrupts();
        }
    });
}

#[entry]
fn main() -> ! {
    let Some(periph) = pac::Peripherals::take() else {
        loop {}
    };
    board::hold_watchdog(&periph.WDT_A);

    let (tx, mut rx) = SerialConfig::new(periph.E_USCI_A1, 9600)
        .use_smclk(board::SMCLK_HZ)
        .split(&periph.P4);
    rx.enable_rx_interrupts();

    let bus = SpiConfig::new(periph.E_USCI_B1, MODE_0, true)
        .use_smclk(4)
        .configure(&periph.P4);
    let camera_bus = I2cConfig::new(periph.E_USCI_B0, 10).configure(&periph.P1);

    let pwm_clock = PwmClock::default();
    let Ok(setting) = pwm_clock.select(10_000) else {
        loop {}
    };
    let pwm = PwmConfig::new(periph.TB3, pwm_clock, setting).configure(&periph.P6);

    let Ok(lcd_spi) = ExclusiveSpi::new(bus.handle(), PortPin::output(&periph.P4, 4)) else {
        loop {}
    };
    let Ok(counter_spi) = ExclusiveSpi::new(bus, PortPin::output(&periph.P5, 0)) else {
        loop {}
    };

    let speedo = Speedo {
        capture: CaptureConfig::default().configure(periph.TB1, &periph.P2),
        channel_b: PortPin::input(&periph.P2, 1),
        meter: VelocityMeter::new(VelocityConfig::default()),
    };

    let mut lab = Lab {
        lcd: Pcd8544::new(lcd_spi, PortPin::output(&periph.P4, 0)),
        counter: Ls7366::new(counter_spi),
        view: EncoderView::new(EncoderGeometry::default()),
        motor: Vnh7070::new(
            PortPin::output(&periph.P3, 0),
            PortPin::output(&periph.P3, 1),
            PortPin::output(&periph.P3, 2),
            pwm,
        ),
        pwm_clock,
        camera: Pixy2::new(camera_bus),
        tracker: VectorTracker::new(),
        stream: VectorStream::new(),
        ports: Ports::new(periph.P1, periph.P2, periph.P3, periph.P4, periph.P5, periph.P6),
    };
    let _tick = tick::start(periph.TB0, 20);
    board::unlock_pins(&periph.PMM);

    lab.lcd.init().ok();
    lab.counter.init().ok();
    lab.motor.init().ok();
    lab.view.redraw_frame(&mut lab.lcd).ok();

    let Ok(mut interp) = Interpreter::<Lab, 32, 32>::new() else {
        loop {}
    };
    if register_all(&mut interp).is_err() {
        loop {}
    }

    critical_section::with(|cs| {
        SERIAL.borrow_ref_mut(cs).replace((tx, rx));
        SPEEDO.borrow_ref_mut(cs).replace(speedo);
    });
    unsafe { msp430::interrupt::enable() };
    // First prompt
    enable_tx();

    loop {
        let output = CONSOLE.service(&interp, &mut lab);
        if lab.stream.take_started() {
            CONSOLE.start_stream();
        }
        if output {
            enable_tx();
        }
        if critical_section::with(|cs| TICKED.borrow(cs).replace(false)) {
            lab.refresh_view();
            lab.stream_vector();
        }
    }
}

#[interrupt]
fn EUSCI_A1() {
    critical_section::with(|cs| {
        let mut serial = SERIAL.borrow_ref_mut(cs);
        let Some((tx, rx)) = serial.as_mut() else {
            return;
        };
        if let Ok(byte) = rx.read() {
            if CONSOLE.on_rx(byte).wants_tx() {
                tx.enable_tx_interrupts();
            }
        }
        if let Ok(true) = tx.write_ready() {
            match CONSOLE.next_tx() {
                Some(byte) => {
                    tx.write(byte).ok();
                }
                None => tx.disable_tx_interrupts(),
            }
        }
    });
}

#[interrupt]
fn TIMER0_B0() {
    critical_section::with(|cs| TICKED.borrow(cs).set(true));
}

#[interrupt]
fn TIMER1_B1() {
    critical_section::with(|cs| {
        let mut speedo = SPEEDO.borrow_ref_mut(cs);
        let Some(s) = speedo.as_mut() else {
            return;
        };
        match s.capture.event() {
            CaptureEvent::Edge(ccr) => {
                let dir_high = s.channel_b.is_high().unwrap_or(false);
                s.meter.on_capture(ccr, dir_high);
            }
            CaptureEvent::Overflow => s.meter.on_overflow(),
            CaptureEvent::None => {}
        }
    });
}

// The compiler will emit calls to the abort() compiler intrinsic if debug assertions are
// enabled (default for dev profile). MSP430 does not actually have meaningful abort() support
// so for now, we create our own in each application where debug assertions are present.
#[no_mangle]
extern "C" fn abort() -> ! {
    panic!();
}
