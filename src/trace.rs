//! Execution tracing. The fetch-decode-execute loop can optionally hand a [`TraceRecord`]
//! to a [`TraceSink`] before each instruction executes, which is how a consumer gets a
//! cycle-by-cycle log without this crate depending on any particular file format.

use std::io::{self, Write};

use crate::status::Status;

/// A snapshot of CPU state taken immediately before the instruction at `pc` executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub pc: u16,
    pub opcode: u8,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub status: Status,
}

/// Receives one [`TraceRecord`] per executed instruction. Errors are non-fatal to the
/// execution loop — they're logged and recorded on [`crate::Cpu::last_trace_error`]
/// rather than unwinding `step`/`run`.
pub trait TraceSink {
    fn write_record(&mut self, record: &TraceRecord) -> io::Result<()>;
}

/// Writes tab-separated trace rows, one per instruction, in the column order `pc opcode
/// a x y sp status`. Any `std::io::Write` works, so a caller can point this at a file, a
/// `Vec<u8>` for tests, or stdout.
pub struct WriterTraceSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterTraceSink<W> {
    pub fn new(writer: W) -> WriterTraceSink<W> {
        WriterTraceSink { writer }
    }
}

impl<W: Write> TraceSink for WriterTraceSink<W> {
    fn write_record(&mut self, record: &TraceRecord) -> io::Result<()> {
        writeln!(
            self.writer,
            "{:04X}\t{:02X}\t{:02X}\t{:02X}\t{:02X}\t{:02X}\t{}",
            record.pc,
            record.opcode,
            record.a,
            record.x,
            record.y,
            record.sp,
            record.status.to_trace_string(),
        )
    }
}
