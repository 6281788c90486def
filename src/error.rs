use thiserror::Error;

use crate::addressing::AddressingMode;

/// Structured failures the core can report. Fatal variants unwind out of
/// [`crate::Cpu::step`]/[`crate::Cpu::run`]; `TraceWriteError` is non-fatal and is only
/// ever returned from [`crate::trace::TraceSink::write_record`] implementations.
#[derive(Error, Debug)]
pub enum Error {
    /// A write targeted `$8000-$FFFF`, which is backed by read-only PRG-ROM.
    #[error("write to read-only ROM at ${address:04X} (value ${value:02X}) while executing instruction at ${pc:04X}")]
    RomWriteFault { pc: u16, address: u16, value: u8 },

    /// The fetched opcode byte has no instruction signature.
    #[error("unknown opcode ${opcode:02X} at ${pc:04X}")]
    UnknownOpcode { pc: u16, opcode: u8 },

    /// A trace sink rejected a record. Non-fatal.
    #[error("trace sink rejected record at ${pc:04X}: {source}")]
    TraceWriteError {
        pc: u16,
        #[source]
        source: std::io::Error,
    },

    /// The ROM image supplied to the constructor was too short to contain a
    /// 16-byte iNES header followed by 32 KiB of PRG-ROM.
    #[error("rom image too short: expected at least {expected} bytes (16-byte header + 32 KiB PRG), got {actual}")]
    RomLoadError { expected: usize, actual: usize },

    /// An addressing mode that yields no address (`Accumulator`/`Immediate`) was asked
    /// for one. This only happens for instructions misassigned to the wrong mode and is
    /// treated the same as a decode failure.
    #[error("addressing mode {0} has no addressable memory location")]
    NoEffectiveAddress(AddressingMode),
}

pub type Result<T> = std::result::Result<T, Error>;
