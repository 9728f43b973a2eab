//! Digital I/O port commands.
//!
//! | Command | Arguments | Effect |
//! |---|---|---|
//! | `portSetup` | port, dir (0 in, 1 out), mask | sets the direction of the masked pins |
//! | `writeBits` | port, mode (0 clear, 1 set, 2 toggle), mask | changes the masked output bits |
//! | `writeByte` | port, byte | writes the whole output register |
//! | `readBits` | port, mask, type (0 number, 1 text) | reads the masked input bits |

use crate::cmd::{CmdData, CmdResult, Command, ErrorCode, Fault, Full, Interpreter};

/// Messages of this set, in fault order.
pub const ERRORS: [&str; 6] = [
    "port number out of range",
    "dir must be 0=input, 1=output",
    "mask must be 1 to 255",
    "mode must be 0=clear, 1=set, 2=toggle",
    "data must be 0 to 255",
    "type must be 0=number, 1=text",
];

const BAD_PORT: Fault = Fault(0);
const BAD_DIR: Fault = Fault(1);
const BAD_MASK: Fault = Fault(2);
const BAD_MODE: Fault = Fault(3);
const BAD_DATA: Fault = Fault(4);
const BAD_TYPE: Fault = Fault(5);

/// What `writeBits` does to the masked bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOp {
    /// Drive low.
    Clear,
    /// Drive high.
    Set,
    /// Invert.
    Toggle,
}

impl TryFrom<i32> for BitOp {
    type Error = i32;

    fn try_from(mode: i32) -> Result<Self, i32> {
        match mode {
            0 => Ok(BitOp::Clear),
            1 => Ok(BitOp::Set),
            2 => Ok(BitOp::Toggle),
            other => Err(other),
        }
    }
}

/// Byte-wide I/O ports numbered from 1.
pub trait PortAccess {
    /// Highest port number.
    fn port_count(&self) -> u8;

    /// Makes the `mask` pins outputs or inputs.
    fn set_direction(&mut self, port: u8, mask: u8, output: bool);

    /// Changes the `mask` bits of the output register.
    fn modify(&mut self, port: u8, mask: u8, op: BitOp);

    /// Writes the whole output register.
    fn write(&mut self, port: u8, value: u8);

    /// Reads the input register.
    fn read(&mut self, port: u8) -> u8;
}

/// Gives the port commands their ports.
pub trait PortContext {
    /// Port implementation.
    type Ports: PortAccess;

    /// The ports.
    fn ports(&mut self) -> &mut Self::Ports;
}

/// Registers `portSetup`, `writeBits`, `writeByte` and `readBits`.
pub fn register<C: PortContext, const CMDS: usize, const ERRS: usize>(
    interp: &mut Interpreter<C, CMDS, ERRS>,
) -> Result<ErrorCode, Full> {
    interp.register_set(
        &ERRORS,
        &[
            Command::new("portSetup", 3, port_setup::<C>),
            Command::new("writeBits", 3, write_bits::<C>),
            Command::new("writeByte", 2, write_byte::<C>),
            Command::new("readBits", 3, read_bits::<C>),
        ],
    )
}

fn port_arg<P: PortAccess>(ports: &P, data: &CmdData) -> Result<u8, Fault> {
    let max = i32::from(ports.port_count());
    data.arg_in(0, 1..=max, BAD_PORT).map(|p| p as u8)
}

fn mask_arg(data: &CmdData, index: usize) -> Result<u8, Fault> {
    data.arg_in(index, 1..=255, BAD_MASK).map(|m| m as u8)
}

fn port_setup<C: PortContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let ports = ctx.ports();
    let port = port_arg(ports, data)?;
    let output = data.arg_in(1, 0..=1, BAD_DIR)? == 1;
    let mask = mask_arg(data, 2)?;
    ports.set_direction(port, mask, output);
    Ok(())
}

fn write_bits<C: PortContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let ports = ctx.ports();
    let port = port_arg(ports, data)?;
    let op = BitOp::try_from(data.arg(1)).map_err(|_| BAD_MODE)?;
    let mask = mask_arg(data, 2)?;
    ports.modify(port, mask, op);
    Ok(())
}

fn write_byte<C: PortContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let ports = ctx.ports();
    let port = port_arg(ports, data)?;
    let value = data.arg_u8(1, BAD_DATA)?;
    ports.write(port, value);
    Ok(())
}

fn read_bits<C: PortContext>(ctx: &mut C, data: &mut CmdData) -> Result<(), Fault> {
    let ports = ctx.ports();
    let port = port_arg(ports, data)?;
    let mask = mask_arg(data, 1)?;
    let text = data.arg_in(2, 0..=1, BAD_TYPE)? == 1;
    let value = ports.read(port) & mask;
    if text {
        data.set_text(format_args!("P{}IN = {}", port, value));
    } else {
        data.result = CmdResult::UInt(u32::from(value));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Six ports held in memory. Inputs read back whatever the test puts in `input`.
    #[derive(Debug, Default)]
    pub(crate) struct MemPorts {
        pub dir: [u8; 6],
        pub out: [u8; 6],
        pub input: [u8; 6],
    }

    impl PortAccess for MemPorts {
        fn port_count(&self) -> u8 {
            6
        }

        fn set_direction(&mut self, port: u8, mask: u8, output: bool) {
            let d = &mut self.dir[usize::from(port - 1)];
            if output {
                *d |= mask;
            } else {
                *d &= !mask;
            }
        }

        fn modify(&mut self, port: u8, mask: u8, op: BitOp) {
            let o = &mut self.out[usize::from(port - 1)];
            match op {
                BitOp::Clear => *o &= !mask,
                BitOp::Set => *o |= mask,
                BitOp::Toggle => *o ^= mask,
            }
        }

        fn write(&mut self, port: u8, value: u8) {
            self.out[usize::from(port - 1)] = value;
        }

        fn read(&mut self, port: u8) -> u8 {
            self.input[usize::from(port - 1)]
        }
    }

    impl PortContext for MemPorts {
        type Ports = Self;

        fn ports(&mut self) -> &mut Self {
            self
        }
    }

    fn interp() -> (Interpreter<MemPorts, 8, 16>, ErrorCode) {
        let mut i = Interpreter::new().unwrap();
        let base = register(&mut i).unwrap();
        (i, base)
    }

    #[test]
    fn setup_and_write() {
        let (interp, base) = interp();
        assert_eq!(base, ErrorCode(8));
        let mut ports = MemPorts::default();
        assert!(interp.execute(&mut ports, "portSetup 2 1 0x0F").code.is_success());
        assert_eq!(ports.dir[1], 0x0F);
        interp.execute(&mut ports, "portSetup 2 0 11b");
        assert_eq!(ports.dir[1], 0x0C);

        interp.execute(&mut ports, "writeByte 1 0xA5");
        interp.execute(&mut ports, "writeBits 1 2 0x0F");
        assert_eq!(ports.out[0], 0xAA);
        interp.execute(&mut ports, "writeBits 1 0 0xF0");
        assert_eq!(ports.out[0], 0x0A);
        interp.execute(&mut ports, "writeBits 1 1 1");
        assert_eq!(ports.out[0], 0x0B);
    }

    #[test]
    fn read_as_number_and_text() {
        let (interp, _) = interp();
        let mut ports = MemPorts::default();
        ports.input[2] = 0b1011_0110;
        let out = interp.execute(&mut ports, "readBits 3 0xF0 0");
        assert_eq!(out.result, CmdResult::UInt(0b1011_0000));
        let out = interp.execute(&mut ports, "readBits 3 255 1");
        assert_eq!(out.result.to_string(), "P3IN = 182");
    }

    #[test]
    fn argument_faults() {
        let (interp, base) = interp();
        let mut ports = MemPorts::default();
        let code = |ports: &mut MemPorts, line: &str| interp.execute(ports, line).code.0 - base.0;
        assert_eq!(code(&mut ports, "portSetup 7 1 1"), 0);
        assert_eq!(code(&mut ports, "portSetup 0 1 1"), 0);
        assert_eq!(code(&mut ports, "portSetup 1 2 1"), 1);
        assert_eq!(code(&mut ports, "portSetup 1 1 0"), 2);
        assert_eq!(code(&mut ports, "writeBits 1 3 1"), 3);
        assert_eq!(code(&mut ports, "writeByte 1 256"), 4);
        assert_eq!(code(&mut ports, "readBits 1 1 -1"), 5);
        assert_eq!(interp.message(ErrorCode(base.0 + 2)), "mask must be 1 to 255");
        assert_eq!(ports.dir, [0; 6]);
    }
}
