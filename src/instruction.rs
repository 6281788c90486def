use crate::addressing::AddressingMode;
use crate::opcode::Opcode;

/// The opcode/addressing-mode/base-cycle-cost triple a raw byte decodes to. Branches and
/// the indexed/indirect-indexed addressing modes can add cycles on top of `base_cycles`;
/// that's computed by the dispatcher once the effective address is known, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub opcode: Opcode,
    pub mode: AddressingMode,
    pub base_cycles: u8,
}

const fn sig(opcode: Opcode, mode: AddressingMode, base_cycles: u8) -> Option<Signature> {
    Some(Signature { opcode, mode, base_cycles })
}

/// Looks up the decoded signature for a fetched opcode byte. `None` means the byte is
/// either a genuinely undocumented 6502 opcode (out of scope) or `$02`, which is this
/// system's reserved synthetic `HALT` and is special-cased by the caller before this
/// table is even consulted.
pub fn decode(byte: u8) -> Option<Signature> {
    SIGNATURES[byte as usize]
}

use AddressingMode::*;
use Opcode::*;

#[rustfmt::skip]
static SIGNATURES: [Option<Signature>; 256] = [
    /*0x00*/ sig(BRK, Accumulator, 7), // Accumulator here stands in for Implied; BRK reads no operand bytes.
    /*0x01*/ sig(ORA, IndexedIndirect, 6),
    /*0x02*/ None, // Reserved for the synthetic HALT opcode; handled before dispatch.
    /*0x03*/ None,
    /*0x04*/ None,
    /*0x05*/ sig(ORA, ZeroPage, 3),
    /*0x06*/ sig(ASL, ZeroPage, 5),
    /*0x07*/ None,
    /*0x08*/ sig(PHP, Accumulator, 3),
    /*0x09*/ sig(ORA, Immediate, 2),
    /*0x0A*/ sig(ASL, Accumulator, 2),
    /*0x0B*/ None,
    /*0x0C*/ None,
    /*0x0D*/ sig(ORA, Absolute, 4),
    /*0x0E*/ sig(ASL, Absolute, 6),
    /*0x0F*/ None,

    /*0x10*/ sig(BPL, Relative, 2),
    /*0x11*/ sig(ORA, IndirectIndexed, 5),
    /*0x12*/ None,
    /*0x13*/ None,
    /*0x14*/ None,
    /*0x15*/ sig(ORA, ZeroPageX, 4),
    /*0x16*/ sig(ASL, ZeroPageX, 6),
    /*0x17*/ None,
    /*0x18*/ sig(CLC, Accumulator, 2),
    /*0x19*/ sig(ORA, AbsoluteY, 4),
    /*0x1A*/ None,
    /*0x1B*/ None,
    /*0x1C*/ None,
    /*0x1D*/ sig(ORA, AbsoluteX, 4),
    /*0x1E*/ sig(ASL, AbsoluteX, 7),
    /*0x1F*/ None,

    /*0x20*/ sig(JSR, Absolute, 6),
    /*0x21*/ sig(AND, IndexedIndirect, 6),
    /*0x22*/ None,
    /*0x23*/ None,
    /*0x24*/ sig(BIT, ZeroPage, 3),
    /*0x25*/ sig(AND, ZeroPage, 3),
    /*0x26*/ sig(ROL, ZeroPage, 5),
    /*0x27*/ None,
    /*0x28*/ sig(PLP, Accumulator, 4),
    /*0x29*/ sig(AND, Immediate, 2),
    /*0x2A*/ sig(ROL, Accumulator, 2),
    /*0x2B*/ None,
    /*0x2C*/ sig(BIT, Absolute, 4),
    /*0x2D*/ sig(AND, Absolute, 4),
    /*0x2E*/ sig(ROL, Absolute, 6),
    /*0x2F*/ None,

    /*0x30*/ sig(BMI, Relative, 2),
    /*0x31*/ sig(AND, IndirectIndexed, 5),
    /*0x32*/ None,
    /*0x33*/ None,
    /*0x34*/ None,
    /*0x35*/ sig(AND, ZeroPageX, 4),
    /*0x36*/ sig(ROL, ZeroPageX, 6),
    /*0x37*/ None,
    /*0x38*/ sig(SEC, Accumulator, 2),
    /*0x39*/ sig(AND, AbsoluteY, 4),
    /*0x3A*/ None,
    /*0x3B*/ None,
    /*0x3C*/ None,
    /*0x3D*/ sig(AND, AbsoluteX, 4),
    /*0x3E*/ sig(ROL, AbsoluteX, 7),
    /*0x3F*/ None,

    /*0x40*/ sig(RTI, Accumulator, 6),
    /*0x41*/ sig(EOR, IndexedIndirect, 6),
    /*0x42*/ None,
    /*0x43*/ None,
    /*0x44*/ None,
    /*0x45*/ sig(EOR, ZeroPage, 3),
    /*0x46*/ sig(LSR, ZeroPage, 5),
    /*0x47*/ None,
    /*0x48*/ sig(PHA, Accumulator, 3),
    /*0x49*/ sig(EOR, Immediate, 2),
    /*0x4A*/ sig(LSR, Accumulator, 2),
    /*0x4B*/ None,
    /*0x4C*/ sig(JMP, Absolute, 3),
    /*0x4D*/ sig(EOR, Absolute, 4),
    /*0x4E*/ sig(LSR, Absolute, 6),
    /*0x4F*/ None,

    /*0x50*/ sig(BVC, Relative, 2),
    /*0x51*/ sig(EOR, IndirectIndexed, 5),
    /*0x52*/ None,
    /*0x53*/ None,
    /*0x54*/ None,
    /*0x55*/ sig(EOR, ZeroPageX, 4),
    /*0x56*/ sig(LSR, ZeroPageX, 6),
    /*0x57*/ None,
    /*0x58*/ sig(CLI, Accumulator, 2),
    /*0x59*/ sig(EOR, AbsoluteY, 4),
    /*0x5A*/ None,
    /*0x5B*/ None,
    /*0x5C*/ None,
    /*0x5D*/ sig(EOR, AbsoluteX, 4),
    /*0x5E*/ sig(LSR, AbsoluteX, 7),
    /*0x5F*/ None,

    /*0x60*/ sig(RTS, Accumulator, 6),
    /*0x61*/ sig(ADC, IndexedIndirect, 6),
    /*0x62*/ None,
    /*0x63*/ None,
    /*0x64*/ None,
    /*0x65*/ sig(ADC, ZeroPage, 3),
    /*0x66*/ sig(ROR, ZeroPage, 5),
    /*0x67*/ None,
    /*0x68*/ sig(PLA, Accumulator, 4),
    /*0x69*/ sig(ADC, Immediate, 2),
    /*0x6A*/ sig(ROR, Accumulator, 2),
    /*0x6B*/ None,
    /*0x6C*/ sig(JMP, Indirect, 5),
    /*0x6D*/ sig(ADC, Absolute, 4),
    /*0x6E*/ sig(ROR, Absolute, 6),
    /*0x6F*/ None,

    /*0x70*/ sig(BVS, Relative, 2),
    /*0x71*/ sig(ADC, IndirectIndexed, 5),
    /*0x72*/ None,
    /*0x73*/ None,
    /*0x74*/ None,
    /*0x75*/ sig(ADC, ZeroPageX, 4),
    /*0x76*/ sig(ROR, ZeroPageX, 6),
    /*0x77*/ None,
    /*0x78*/ sig(SEI, Accumulator, 2),
    /*0x79*/ sig(ADC, AbsoluteY, 4),
    /*0x7A*/ None,
    /*0x7B*/ None,
    /*0x7C*/ None,
    /*0x7D*/ sig(ADC, AbsoluteX, 4),
    /*0x7E*/ sig(ROR, AbsoluteX, 7),
    /*0x7F*/ None,

    /*0x80*/ None,
    /*0x81*/ sig(STA, IndexedIndirect, 6),
    /*0x82*/ None,
    /*0x83*/ None,
    /*0x84*/ sig(STY, ZeroPage, 3),
    /*0x85*/ sig(STA, ZeroPage, 3),
    /*0x86*/ sig(STX, ZeroPage, 3),
    /*0x87*/ None,
    /*0x88*/ sig(DEY, Accumulator, 2),
    /*0x89*/ None,
    /*0x8A*/ sig(TXA, Accumulator, 2),
    /*0x8B*/ None,
    /*0x8C*/ sig(STY, Absolute, 4),
    /*0x8D*/ sig(STA, Absolute, 4),
    /*0x8E*/ sig(STX, Absolute, 4),
    /*0x8F*/ None,

    /*0x90*/ sig(BCC, Relative, 2),
    /*0x91*/ sig(STA, IndirectIndexed, 6),
    /*0x92*/ None,
    /*0x93*/ None,
    /*0x94*/ sig(STY, ZeroPageX, 4),
    /*0x95*/ sig(STA, ZeroPageX, 4),
    /*0x96*/ sig(STX, ZeroPageY, 4),
    /*0x97*/ None,
    /*0x98*/ sig(TYA, Accumulator, 2),
    /*0x99*/ sig(STA, AbsoluteY, 5),
    /*0x9A*/ sig(TXS, Accumulator, 2),
    /*0x9B*/ None,
    /*0x9C*/ None,
    /*0x9D*/ sig(STA, AbsoluteX, 5),
    /*0x9E*/ None,
    /*0x9F*/ None,

    /*0xA0*/ sig(LDY, Immediate, 2),
    /*0xA1*/ sig(LDA, IndexedIndirect, 6),
    /*0xA2*/ sig(LDX, Immediate, 2),
    /*0xA3*/ None,
    /*0xA4*/ sig(LDY, ZeroPage, 3),
    /*0xA5*/ sig(LDA, ZeroPage, 3),
    /*0xA6*/ sig(LDX, ZeroPage, 3),
    /*0xA7*/ None,
    /*0xA8*/ sig(TAY, Accumulator, 2),
    /*0xA9*/ sig(LDA, Immediate, 2),
    /*0xAA*/ sig(TAX, Accumulator, 2),
    /*0xAB*/ None,
    /*0xAC*/ sig(LDY, Absolute, 4),
    /*0xAD*/ sig(LDA, Absolute, 4),
    /*0xAE*/ sig(LDX, Absolute, 4),
    /*0xAF*/ None,

    /*0xB0*/ sig(BCS, Relative, 2),
    /*0xB1*/ sig(LDA, IndirectIndexed, 5),
    /*0xB2*/ None,
    /*0xB3*/ None,
    /*0xB4*/ sig(LDY, ZeroPageX, 4),
    /*0xB5*/ sig(LDA, ZeroPageX, 4),
    /*0xB6*/ sig(LDX, ZeroPageY, 4),
    /*0xB7*/ None,
    /*0xB8*/ sig(CLV, Accumulator, 2),
    /*0xB9*/ sig(LDA, AbsoluteY, 4),
    /*0xBA*/ sig(TSX, Accumulator, 2),
    /*0xBB*/ None,
    /*0xBC*/ sig(LDY, AbsoluteX, 4),
    /*0xBD*/ sig(LDA, AbsoluteX, 4),
    /*0xBE*/ sig(LDX, AbsoluteY, 4),
    /*0xBF*/ None,

    /*0xC0*/ sig(CPY, Immediate, 2),
    /*0xC1*/ sig(CMP, IndexedIndirect, 6),
    /*0xC2*/ None,
    /*0xC3*/ None,
    /*0xC4*/ sig(CPY, ZeroPage, 3),
    /*0xC5*/ sig(CMP, ZeroPage, 3),
    /*0xC6*/ sig(DEC, ZeroPage, 5),
    /*0xC7*/ None,
    /*0xC8*/ sig(INY, Accumulator, 2),
    /*0xC9*/ sig(CMP, Immediate, 2),
    /*0xCA*/ sig(DEX, Accumulator, 2),
    /*0xCB*/ None,
    /*0xCC*/ sig(CPY, Absolute, 4),
    /*0xCD*/ sig(CMP, Absolute, 4),
    /*0xCE*/ sig(DEC, Absolute, 6),
    /*0xCF*/ None,

    /*0xD0*/ sig(BNE, Relative, 2),
    /*0xD1*/ sig(CMP, IndirectIndexed, 5),
    /*0xD2*/ None,
    /*0xD3*/ None,
    /*0xD4*/ None,
    /*0xD5*/ sig(CMP, ZeroPageX, 4),
    /*0xD6*/ sig(DEC, ZeroPageX, 6),
    /*0xD7*/ None,
    /*0xD8*/ sig(CLD, Accumulator, 2),
    /*0xD9*/ sig(CMP, AbsoluteY, 4),
    /*0xDA*/ None,
    /*0xDB*/ None,
    /*0xDC*/ None,
    /*0xDD*/ sig(CMP, AbsoluteX, 4),
    /*0xDE*/ sig(DEC, AbsoluteX, 7),
    /*0xDF*/ None,

    /*0xE0*/ sig(CPX, Immediate, 2),
    /*0xE1*/ sig(SBC, IndexedIndirect, 6),
    /*0xE2*/ None,
    /*0xE3*/ None,
    /*0xE4*/ sig(CPX, ZeroPage, 3),
    /*0xE5*/ sig(SBC, ZeroPage, 3),
    /*0xE6*/ sig(INC, ZeroPage, 5),
    /*0xE7*/ None,
    /*0xE8*/ sig(INX, Accumulator, 2),
    /*0xE9*/ sig(SBC, Immediate, 2),
    /*0xEA*/ sig(NOP, Accumulator, 2),
    /*0xEB*/ None,
    /*0xEC*/ sig(CPX, Absolute, 4),
    /*0xED*/ sig(SBC, Absolute, 4),
    /*0xEE*/ sig(INC, Absolute, 6),
    /*0xEF*/ None,

    /*0xF0*/ sig(BEQ, Relative, 2),
    /*0xF1*/ sig(SBC, IndirectIndexed, 5),
    /*0xF2*/ None,
    /*0xF3*/ None,
    /*0xF4*/ None,
    /*0xF5*/ sig(SBC, ZeroPageX, 4),
    /*0xF6*/ sig(INC, ZeroPageX, 6),
    /*0xF7*/ None,
    /*0xF8*/ sig(SED, Accumulator, 2),
    /*0xF9*/ sig(SBC, AbsoluteY, 4),
    /*0xFA*/ None,
    /*0xFB*/ None,
    /*0xFC*/ None,
    /*0xFD*/ sig(SBC, AbsoluteX, 4),
    /*0xFE*/ sig(INC, AbsoluteX, 7),
    /*0xFF*/ None,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halt_opcode_has_no_signature() {
        assert_eq!(decode(0x02), None);
    }

    #[test]
    fn known_opcodes_decode_to_their_documented_mode_and_cycles() {
        assert_eq!(decode(0xA9), sig(LDA, Immediate, 2));
        assert_eq!(decode(0x69), sig(ADC, Immediate, 2));
        assert_eq!(decode(0x20), sig(JSR, Absolute, 6));
        assert_eq!(decode(0x6C), sig(JMP, Indirect, 5));
        assert_eq!(decode(0x00), sig(BRK, Accumulator, 7));
    }

    #[test]
    fn illegal_opcodes_decode_to_none() {
        for illegal in [0x03, 0x04, 0x07, 0x0B, 0x0C, 0x89, 0xFF] {
            assert_eq!(decode(illegal), None, "expected {illegal:#04X} to be undecodable");
        }
    }
}
