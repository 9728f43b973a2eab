//! Command sets for the interpreter.
//!
//! Each set is generic over a context trait that hands its handlers the peripherals they drive.
//! A lab's context type implements the traits of every set it uses and registers each set with
//! its `register` function:
//!
//! ```ignore
//! let mut interp: Interpreter<Lab, 24, 32> = Interpreter::new()?;
//! commands::port::register(&mut interp)?;
//! commands::motor::register(&mut interp)?;
//! ```

pub mod encoder;
pub mod lcd;
pub mod motor;
pub mod pixy;
pub mod port;

pub use encoder::{EncoderContext, EncoderParts};
pub use lcd::LcdContext;
pub use motor::MotorContext;
pub use pixy::{PixyContext, PixyParts, VectorMode, VectorStream};
pub use port::{BitOp, PortAccess, PortContext};

use crate::cmd::Fault;
use crate::drivers::pcd8544::DrawError;

/// Maps a drawing error onto a set's "off screen" and "bus" faults.
pub(crate) fn draw_fault<E>(e: DrawError<E>, off_screen: Fault, bus: Fault) -> Fault {
    match e {
        DrawError::OutOfRange => off_screen,
        DrawError::Bus(_) => {
            warn!("LCD write failed");
            bus
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cmd::MESSAGE_LEN;

    #[test]
    fn messages_fit_a_report() {
        let sets: [&[&str]; 5] = [
            &super::encoder::ERRORS,
            &super::lcd::ERRORS,
            &super::motor::ERRORS,
            &super::pixy::ERRORS,
            &super::port::ERRORS,
        ];
        for msg in sets.iter().flat_map(|set| set.iter()) {
            assert!(msg.len() <= MESSAGE_LEN, "{msg:?}");
        }
    }
}
