//! A cycle-accurate MOS 6502 / Ricoh 2A03 CPU core, the kind of thing an NES emulator
//! builds its PPU/APU/mapper machinery around. This crate owns the fetch-decode-execute
//! loop, the ten addressing modes, ALU flag semantics, and the official instruction set;
//! it knows nothing about rendering, audio, or cartridge mappers beyond a flat 32 KiB PRG
//! image, and it depends on nothing beyond an address bus its caller supplies.

mod addressing;
mod alu;
mod bus;
mod cpu;
mod error;
mod instruction;
mod opcode;
mod registers;
mod status;
mod trace;

pub use addressing::{AddressingMode, Operand, Resolved};
pub use bus::{Bus, IoHandler, NoIoHandler, SystemBus, PRG_SIZE};
pub use cpu::Cpu;
pub use error::{Error, Result};
pub use instruction::{decode, Signature};
pub use opcode::Opcode;
pub use registers::Registers;
pub use status::Status;
pub use trace::{TraceRecord, TraceSink, WriterTraceSink};
