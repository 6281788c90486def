use log::{trace, warn};

use crate::addressing::{AddressingMode, Operand, Resolved};
use crate::alu;
use crate::bus::{Bus, NoIoHandler, SystemBus, PRG_SIZE};
use crate::error::{Error, Result};
use crate::instruction::{self, Signature};
use crate::opcode::Opcode;
use crate::registers::Registers;
use crate::status::Status;
use crate::trace::{TraceRecord, TraceSink};

const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_BRK_VECTOR: u16 = 0xFFFE;
const STACK_PAGE: u16 = 0x0100;
const HALT_OPCODE: u8 = 0x02;
const INES_HEADER_SIZE: usize = 16;

/// Drives a [`Bus`] through the fetch-decode-execute loop. `B` is generic so tests and
/// embedders can swap in their own memory map; [`Cpu::from_ines`] is the convenience
/// constructor for the common case of a flat 32 KiB PRG image backed by [`SystemBus`].
pub struct Cpu<B: Bus> {
    pub registers: Registers,
    pub status: Status,
    pub cycles: u64,
    pub halted: bool,
    bus: B,
    tracer: Option<Box<dyn TraceSink>>,
    last_trace_error: Option<Error>,
}

impl<B: Bus> std::fmt::Debug for Cpu<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("registers", &self.registers)
            .field("status", &self.status)
            .field("cycles", &self.cycles)
            .field("halted", &self.halted)
            .field("last_trace_error", &self.last_trace_error)
            .finish_non_exhaustive()
    }
}

impl Cpu<SystemBus<NoIoHandler>> {
    /// Builds a `Cpu` from a full iNES-container byte slice: the fixed 16-byte header is
    /// skipped and the following 32 KiB are mapped as PRG-ROM at `$8000`. `debug_entry`,
    /// when given, overrides the reset vector as the initial PC.
    pub fn from_ines(rom: &[u8], debug_entry: Option<u16>) -> Result<Cpu<SystemBus<NoIoHandler>>> {
        let expected = INES_HEADER_SIZE + PRG_SIZE;
        if rom.len() < expected {
            return Err(Error::RomLoadError {
                expected,
                actual: rom.len(),
            });
        }

        let mut prg = [0u8; PRG_SIZE];
        prg.copy_from_slice(&rom[INES_HEADER_SIZE..expected]);
        Ok(Cpu::with_bus(SystemBus::new(prg), debug_entry))
    }
}

impl<B: Bus> Cpu<B> {
    /// Builds a `Cpu` directly from an already-constructed bus, for embedders supplying
    /// their own memory map or an I/O handler via [`SystemBus::with_io_handler`].
    pub fn with_bus(bus: B, debug_entry: Option<u16>) -> Cpu<B> {
        let mut cpu = Cpu {
            registers: Registers::at_reset(),
            status: Status::at_reset(),
            cycles: 0,
            halted: false,
            bus,
            tracer: None,
            last_trace_error: None,
        };
        cpu.reset(debug_entry);
        cpu
    }

    /// Attaches a trace sink; the loop will call it once per instruction from then on.
    pub fn with_tracer(mut self, tracer: Box<dyn TraceSink>) -> Cpu<B> {
        self.tracer = Some(tracer);
        self
    }

    /// Restores the defined reset state (A=X=Y=0, SP=0xFD, I=1, cycles=0) and loads PC
    /// from `debug_entry` if given, otherwise from the reset vector at `$FFFC/$FFFD`.
    pub fn reset(&mut self, debug_entry: Option<u16>) {
        self.registers = Registers::at_reset();
        self.status = Status::at_reset();
        self.cycles = 0;
        self.halted = false;
        self.registers.pc = debug_entry.unwrap_or_else(|| self.bus.read_u16(RESET_VECTOR));
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// The most recent `TraceWriteError` swallowed by the loop, if any. Trace failures
    /// never halt execution; this is how a caller who cares can still observe them.
    pub fn last_trace_error(&self) -> Option<&Error> {
        self.last_trace_error.as_ref()
    }

    /// Runs until `halted` or a fatal error.
    pub fn run(&mut self) -> Result<()> {
        while !self.halted {
            self.step()?;
        }
        Ok(())
    }

    /// Executes exactly one instruction, or does nothing if already halted.
    pub fn step(&mut self) -> Result<()> {
        if self.halted {
            return Ok(());
        }

        let pc = self.registers.pc;
        let opcode_byte = self.bus.read(pc);
        self.emit_trace(pc, opcode_byte);

        if opcode_byte == HALT_OPCODE {
            self.registers.pc = pc.wrapping_add(1);
            self.halted = true;
            return Ok(());
        }

        let signature = instruction::decode(opcode_byte).ok_or(Error::UnknownOpcode {
            pc,
            opcode: opcode_byte,
        })?;

        trace!(
            "{:04X}: {} {} (cycles={})",
            pc,
            signature.opcode,
            signature.mode,
            self.cycles
        );

        self.registers.pc = pc.wrapping_add(1);
        self.execute(pc, signature)
    }

    fn emit_trace(&mut self, pc: u16, opcode: u8) {
        let Some(tracer) = self.tracer.as_mut() else {
            return;
        };
        let record = TraceRecord {
            pc,
            opcode,
            a: self.registers.a,
            x: self.registers.x,
            y: self.registers.y,
            sp: self.registers.sp,
            status: self.status,
        };
        if let Err(source) = tracer.write_record(&record) {
            let error = Error::TraceWriteError { pc, source };
            warn!("{error}");
            self.last_trace_error = Some(error);
        }
    }

    /// Writes through the bus, rewriting a `RomWriteFault`'s `pc` field to the address of
    /// the instruction that caused it — the bus itself has no notion of "current
    /// instruction", only of addresses.
    fn write(&mut self, instruction_pc: u16, address: u16, value: u8) -> Result<()> {
        self.bus.write(address, value).map_err(|err| match err {
            Error::RomWriteFault { address, value, .. } => Error::RomWriteFault {
                pc: instruction_pc,
                address,
                value,
            },
            other => other,
        })
    }

    fn operand_value(&self, resolved: &Resolved) -> u8 {
        match resolved.operand {
            Operand::Accumulator => self.registers.a,
            Operand::Immediate(value) => value,
            Operand::Memory(address) => self.bus.read(address),
        }
    }

    fn effective_address(&self, resolved: &Resolved) -> Result<u16> {
        match resolved.operand {
            Operand::Memory(address) => Ok(address),
            _ => Err(Error::NoEffectiveAddress(AddressingMode::Accumulator)),
        }
    }

    fn execute(&mut self, pc: u16, signature: Signature) -> Result<()> {
        if signature.opcode.is_branch() {
            return self.execute_branch(signature.opcode, signature.mode);
        }

        let resolved = signature.mode.resolve(self.registers.pc, &self.registers, &self.bus);
        self.registers.pc = self.registers.pc.wrapping_add(resolved.bytes_used);

        self.cycles += signature.base_cycles as u64;
        if resolved.page_crossed && reads_with_page_penalty(signature.opcode) {
            self.cycles += 1;
        }

        use Opcode::*;
        match signature.opcode {
            LDA => {
                self.registers.a = self.operand_value(&resolved);
                self.status.set_nz(self.registers.a);
            }
            LDX => {
                self.registers.x = self.operand_value(&resolved);
                self.status.set_nz(self.registers.x);
            }
            LDY => {
                self.registers.y = self.operand_value(&resolved);
                self.status.set_nz(self.registers.y);
            }
            STA => {
                let address = self.effective_address(&resolved)?;
                self.write(pc, address, self.registers.a)?;
            }
            STX => {
                let address = self.effective_address(&resolved)?;
                self.write(pc, address, self.registers.x)?;
            }
            STY => {
                let address = self.effective_address(&resolved)?;
                self.write(pc, address, self.registers.y)?;
            }

            TAX => {
                self.registers.x = self.registers.a;
                self.status.set_nz(self.registers.x);
            }
            TAY => {
                self.registers.y = self.registers.a;
                self.status.set_nz(self.registers.y);
            }
            TXA => {
                self.registers.a = self.registers.x;
                self.status.set_nz(self.registers.a);
            }
            TYA => {
                self.registers.a = self.registers.y;
                self.status.set_nz(self.registers.a);
            }
            TSX => {
                self.registers.x = self.registers.sp;
                self.status.set_nz(self.registers.x);
            }
            TXS => {
                self.registers.sp = self.registers.x;
            }

            PHA => self.push(pc, self.registers.a)?,
            PLA => {
                self.registers.a = self.pull()?;
                self.status.set_nz(self.registers.a);
            }
            PHP => {
                let byte = self.status.to_byte(true);
                self.push(pc, byte)?;
            }
            PLP => {
                let byte = self.pull()?;
                self.status = Status::from_byte(byte);
            }

            AND => {
                self.registers.a &= self.operand_value(&resolved);
                self.status.set_nz(self.registers.a);
            }
            ORA => {
                self.registers.a |= self.operand_value(&resolved);
                self.status.set_nz(self.registers.a);
            }
            EOR => {
                self.registers.a ^= self.operand_value(&resolved);
                self.status.set_nz(self.registers.a);
            }
            BIT => {
                let value = self.operand_value(&resolved);
                alu::bit(&mut self.status, self.registers.a, value);
            }

            ADC => {
                let value = self.operand_value(&resolved);
                self.registers.a = alu::adc(&mut self.status, self.registers.a, value);
            }
            SBC => {
                let value = self.operand_value(&resolved);
                self.registers.a = alu::sbc(&mut self.status, self.registers.a, value);
            }
            CMP => {
                let value = self.operand_value(&resolved);
                alu::cmp(&mut self.status, self.registers.a, value);
            }
            CPX => {
                let value = self.operand_value(&resolved);
                alu::cmp(&mut self.status, self.registers.x, value);
            }
            CPY => {
                let value = self.operand_value(&resolved);
                alu::cmp(&mut self.status, self.registers.y, value);
            }

            ASL => self.read_modify_write(pc, &resolved, alu::asl)?,
            LSR => self.read_modify_write(pc, &resolved, alu::lsr)?,
            ROL => self.read_modify_write(pc, &resolved, alu::rol)?,
            ROR => self.read_modify_write(pc, &resolved, alu::ror)?,

            INC => self.read_modify_write(pc, &resolved, alu::inc)?,
            DEC => self.read_modify_write(pc, &resolved, alu::dec)?,
            INX => {
                self.registers.x = self.registers.x.wrapping_add(1);
                self.status.set_nz(self.registers.x);
            }
            INY => {
                self.registers.y = self.registers.y.wrapping_add(1);
                self.status.set_nz(self.registers.y);
            }
            DEX => {
                self.registers.x = self.registers.x.wrapping_sub(1);
                self.status.set_nz(self.registers.x);
            }
            DEY => {
                self.registers.y = self.registers.y.wrapping_sub(1);
                self.status.set_nz(self.registers.y);
            }

            JMP => {
                self.registers.pc = self.effective_address(&resolved)?;
            }
            JSR => {
                let target = self.effective_address(&resolved)?;
                let return_address = self.registers.pc.wrapping_sub(1);
                self.push_word(pc, return_address)?;
                self.registers.pc = target;
            }
            RTS => {
                let address = self.pull_word()?;
                self.registers.pc = address.wrapping_add(1);
            }
            RTI => {
                let byte = self.pull()?;
                self.status = Status::from_byte(byte);
                self.registers.pc = self.pull_word()?;
            }

            CLC => self.status.carry = false,
            SEC => self.status.carry = true,
            CLI => self.status.interrupt_disable = false,
            SEI => self.status.interrupt_disable = true,
            CLV => self.status.overflow = false,
            CLD => self.status.decimal = false,
            SED => self.status.decimal = true,

            BRK => {
                let return_address = pc.wrapping_add(2);
                self.push_word(pc, return_address)?;
                let status_byte = self.status.to_byte(true);
                self.push(pc, status_byte)?;
                self.status.interrupt_disable = true;
                self.registers.pc = self.bus.read_u16(IRQ_BRK_VECTOR);
            }
            NOP => {}

            HALT => unreachable!("HALT is intercepted before dispatch"),
            BPL | BMI | BVC | BVS | BCC | BCS | BNE | BEQ => {
                unreachable!("branches are dispatched by execute_branch")
            }
        }

        Ok(())
    }

    fn execute_branch(&mut self, opcode: Opcode, mode: AddressingMode) -> Result<()> {
        let resolved = mode.resolve(self.registers.pc, &self.registers, &self.bus);
        self.registers.pc = self.registers.pc.wrapping_add(resolved.bytes_used);

        let condition = match opcode {
            Opcode::BPL => !self.status.negative,
            Opcode::BMI => self.status.negative,
            Opcode::BVC => !self.status.overflow,
            Opcode::BVS => self.status.overflow,
            Opcode::BCC => !self.status.carry,
            Opcode::BCS => self.status.carry,
            Opcode::BNE => !self.status.zero,
            Opcode::BEQ => self.status.zero,
            _ => unreachable!("execute_branch called with a non-branch opcode"),
        };

        if !condition {
            self.cycles += 2;
            return Ok(());
        }

        let target = self.effective_address(&resolved)?;
        let next_instruction = self.registers.pc;
        let page_crossed = (next_instruction & 0xFF00) != (target & 0xFF00);
        self.cycles += if page_crossed { 4 } else { 3 };
        self.registers.pc = target;
        Ok(())
    }

    fn read_modify_write(&mut self, pc: u16, resolved: &Resolved, op: fn(&mut Status, u8) -> u8) -> Result<()> {
        match resolved.operand {
            Operand::Accumulator => {
                self.registers.a = op(&mut self.status, self.registers.a);
            }
            Operand::Memory(address) => {
                let value = self.bus.read(address);
                let result = op(&mut self.status, value);
                self.write(pc, address, result)?;
            }
            Operand::Immediate(_) => return Err(Error::NoEffectiveAddress(AddressingMode::Immediate)),
        }
        Ok(())
    }

    fn push(&mut self, pc: u16, value: u8) -> Result<()> {
        let address = STACK_PAGE + self.registers.sp as u16;
        self.write(pc, address, value)?;
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        Ok(())
    }

    fn pull(&mut self) -> Result<u8> {
        self.registers.sp = self.registers.sp.wrapping_add(1);
        let address = STACK_PAGE + self.registers.sp as u16;
        Ok(self.bus.read(address))
    }

    fn push_word(&mut self, pc: u16, value: u16) -> Result<()> {
        let [lo, hi] = value.to_le_bytes();
        self.push(pc, hi)?;
        self.push(pc, lo)?;
        Ok(())
    }

    fn pull_word(&mut self) -> Result<u16> {
        let lo = self.pull()?;
        let hi = self.pull()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }
}

impl Opcode {
    fn is_branch(self) -> bool {
        matches!(
            self,
            Opcode::BPL
                | Opcode::BMI
                | Opcode::BVC
                | Opcode::BVS
                | Opcode::BCC
                | Opcode::BCS
                | Opcode::BNE
                | Opcode::BEQ
        )
    }
}

/// Whether a page crossing while resolving this opcode's operand address costs an extra
/// cycle. True for the read-only instructions; stores and read-modify-write instructions
/// already charge the worst case cycle count in the decode table.
fn reads_with_page_penalty(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::LDA
            | Opcode::LDX
            | Opcode::LDY
            | Opcode::AND
            | Opcode::ORA
            | Opcode::EOR
            | Opcode::ADC
            | Opcode::SBC
            | Opcode::CMP
            | Opcode::BIT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_with_program(bytes: &[u8]) -> Cpu<SystemBus<NoIoHandler>> {
        let mut prg = [0u8; PRG_SIZE];
        prg[..bytes.len()].copy_from_slice(bytes);
        Cpu::with_bus(SystemBus::new(prg), Some(0x8000))
    }

    #[test]
    fn lda_immediate_sets_register_and_flags() {
        let mut cpu = cpu_with_program(&[0xA9, 0x00, 0x02]); // LDA #$00; HALT
        cpu.run().unwrap();
        assert_eq!(cpu.registers.a, 0x00);
        assert!(cpu.status.zero);
        assert!(cpu.halted);
    }

    #[test]
    fn adc_immediate_overflow_scenario() {
        let mut cpu = cpu_with_program(&[0xA9, 0x50, 0x69, 0x50, 0x02]); // LDA #$50; ADC #$50; HALT
        cpu.run().unwrap();
        assert_eq!(cpu.registers.a, 0xA0);
        assert!(cpu.status.overflow);
        assert!(cpu.status.negative);
        assert!(!cpu.status.carry);
    }

    #[test]
    fn jsr_then_rts_returns_to_the_instruction_after_jsr() {
        // JSR $8006; LDA #$01; HALT; (pad) ; RTS at $8006
        let mut prg = [0u8; PRG_SIZE];
        prg[0] = 0x20; // JSR
        prg[1] = 0x06;
        prg[2] = 0x80;
        prg[3] = 0xA9; // LDA #$01
        prg[4] = 0x01;
        prg[5] = 0x02; // HALT
        prg[6] = 0x60; // RTS
        let mut cpu = Cpu::with_bus(SystemBus::new(prg), Some(0x8000));
        cpu.run().unwrap();
        assert_eq!(cpu.registers.a, 0x01);
    }

    #[test]
    fn writing_to_rom_reports_the_faulting_instruction_pc() {
        let mut cpu = cpu_with_program(&[0x8D, 0x00, 0x90]); // STA $9000
        let err = cpu.run().unwrap_err();
        match err {
            Error::RomWriteFault { pc, address, .. } => {
                assert_eq!(pc, 0x8000);
                assert_eq!(address, 0x9000);
            }
            other => panic!("expected RomWriteFault, got {other:?}"),
        }
    }

    #[test]
    fn unknown_opcode_is_reported_with_pc() {
        let mut cpu = cpu_with_program(&[0x03]); // undocumented opcode
        let err = cpu.run().unwrap_err();
        assert!(matches!(err, Error::UnknownOpcode { pc: 0x8000, opcode: 0x03 }));
    }

    #[test]
    fn beq_branch_taken_skips_the_next_instruction() {
        // Starting with Z already set: BEQ +2; LDA #$11; HALT; LDA #$22; HALT
        let mut cpu = cpu_with_program(&[0xF0, 0x02, 0xA9, 0x11, 0x02, 0xA9, 0x22, 0x02]);
        cpu.status.zero = true;
        cpu.run().unwrap();
        assert_eq!(cpu.registers.a, 0x22);
    }

    #[test]
    fn branch_taken_across_a_page_boundary_costs_four_cycles() {
        let mut prg = [0u8; PRG_SIZE];
        // BEQ at $80FC with offset +0x10: next instruction is $80FE, target $810E —
        // different pages.
        prg[0x00FC] = 0xF0; // BEQ
        prg[0x00FD] = 0x10;
        prg[0x010E] = 0x02; // HALT
        let mut cpu = Cpu::with_bus(SystemBus::new(prg), Some(0x80FC));
        cpu.step().unwrap();
        assert_eq!(cpu.cycles, 4);
        assert_eq!(cpu.registers.pc, 0x810E);
    }

    #[test]
    fn stack_round_trip_preserves_the_pushed_byte_and_restores_sp() {
        let mut cpu = cpu_with_program(&[0x02]);
        let sp_before = cpu.registers.sp;
        cpu.push(0x8000, 0x42).unwrap();
        let value = cpu.pull().unwrap();
        assert_eq!(value, 0x42);
        assert_eq!(cpu.registers.sp, sp_before);
    }

    #[test]
    fn status_round_trip_through_php_plp() {
        let mut cpu = cpu_with_program(&[0x02]);
        cpu.status.negative = true;
        cpu.status.carry = true;
        let before = cpu.status;
        let byte = cpu.status.to_byte(true);
        cpu.push(0x8000, byte).unwrap();
        let pulled = cpu.pull().unwrap();
        cpu.status = Status::from_byte(pulled);
        assert_eq!(cpu.status, before);
    }
}
