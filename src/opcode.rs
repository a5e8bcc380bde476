/*!

  Instruction descriptors for the Z80 subset that e-Reader program cards use.

  A descriptor carries the mnemonic template, the kind of operand that fills
  the template's placeholder, and the flow class the tracer keys its
  successor computation on. The encoded length is not stored; it is always
  `1 + operand width`, so a descriptor's size can be determined with a
  trivial computation. `*` in a template stands for a one byte operand and
  `**` for a little-endian word operand.

  One design decision that needed to be made is how to render operands.
  Early revisions of this tool spliced pre-formatted text into the template
  at each decode site, which scattered the numeric formatting rules across
  the tracer. Instead, the decoded operand is carried as a tagged
  `OperandValue` and `render` below is the single place where a value meets
  a template.

*/

use crate::address::Address;
use crate::erapi::Vector;
use crate::labels::LabelTable;

/// What fills the placeholder of a mnemonic template.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Operand {
  /// No placeholder; the template is the rendered text.
  Implied,
  /// One byte immediate, rendered `#0xHH`.
  Imm8,
  /// Little-endian word immediate, rendered `#0xHHHH`.
  Imm16,
  /// Little-endian word rendered as a bare address, `0xHHHH`.
  Addr16,
  /// Signed displacement from the instruction's end, rendered as a label.
  Rel8,
}

impl Operand {
  /// Number of operand bytes following the opcode.
  pub fn width(&self) -> usize {
    match self {
      Operand::Implied                 => 0,
      Operand::Imm8 | Operand::Rel8    => 1,
      Operand::Imm16 | Operand::Addr16 => 2,
    }
  }
}

/// How the tracer computes successors after decoding an instruction.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Flow {
  /// Execution continues at the next instruction.
  Fallthrough,
  /// Unconditional relative branch; only the target is explored.
  Branch,
  /// Conditional relative branch (including djnz); both paths are explored.
  BranchConditional,
  /// Unconditional absolute jump; only the target is explored.
  Jump,
  /// Absolute call; the fallthrough is pushed as the return address.
  Call,
  /// Return; the pending return address, if any, is the sole successor.
  Return,
  /// Software-call vector; the following byte is an API selector, not code.
  Vector(Vector),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct OpcodeDesc {
  pub template : &'static str,
  pub operand  : Operand,
  pub flow     : Flow,
}

impl OpcodeDesc {
  /// Encoded instruction length in bytes, 1 to 3.
  pub fn size(&self) -> usize {
    1 + self.operand.width()
  }
}

/// The decoded value matching a descriptor's operand kind.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum OperandValue {
  None,
  Byte(u8),
  Word(u16),
  Target(Address),
}

/**
  Renders an instruction by substituting the decoded operand into the
  descriptor's template. Relative targets are interned in the label table on
  first render and reuse their name afterwards.
*/
pub fn render(desc: &OpcodeDesc, value: &OperandValue, labels: &mut LabelTable) -> String {
  match (desc.operand, value) {

    (Operand::Implied, OperandValue::None) => {
      desc.template.to_string()
    }

    (Operand::Imm8, OperandValue::Byte(byte)) => {
      desc.template.replace('*', &format!("#0x{:02x}", byte))
    }

    (Operand::Imm16, OperandValue::Word(word)) => {
      desc.template.replace("**", &format!("#0x{:04x}", word))
    }

    (Operand::Addr16, OperandValue::Word(word)) => {
      desc.template.replace("**", &format!("0x{:04x}", word))
    }

    (Operand::Rel8, OperandValue::Target(target)) => {
      let name = labels.intern(*target);
      desc.template.replace('*', &name)
    }

    _ => unreachable!("operand kind and decoded value disagree: {:?}", desc),
  }
}

/// Descriptor for the opcode byte, or `None` where the byte is not an
/// instruction of the subset.
pub fn lookup(opcode: u8) -> Option<&'static OpcodeDesc> {
  OPCODE_TABLE[opcode as usize].as_ref()
}

const fn op(template: &'static str, operand: Operand, flow: Flow) -> OpcodeDesc {
  OpcodeDesc { template, operand, flow }
}

const fn plain(template: &'static str) -> OpcodeDesc {
  op(template, Operand::Implied, Flow::Fallthrough)
}

const fn imm8(template: &'static str) -> OpcodeDesc {
  op(template, Operand::Imm8, Flow::Fallthrough)
}

const fn imm16(template: &'static str) -> OpcodeDesc {
  op(template, Operand::Imm16, Flow::Fallthrough)
}

// Conditional absolute jumps render a bare address and, like conditional
// calls and returns, get no successor override in the tracer.
const fn cond_jump(template: &'static str) -> OpcodeDesc {
  op(template, Operand::Addr16, Flow::Fallthrough)
}

const fn cond_branch(template: &'static str) -> OpcodeDesc {
  op(template, Operand::Rel8, Flow::BranchConditional)
}

lazy_static! {
  static ref OPCODE_TABLE: [Option<OpcodeDesc>; 256] = {
    let mut table = [None; 256];
    for (opcode, desc) in OPCODES {
      table[*opcode as usize] = Some(*desc);
    }
    table
  };
}

// Bytes absent from this list decode as data. Transcribed from the
// e-Reader opcode reference; note 0x76 and 0xd3, which this target rebinds
// to `wait`.
#[rustfmt::skip]
const OPCODES: &[(u8, OpcodeDesc)] = &[
  (0x00, plain("nop")),
  (0x01, imm16("ld bc,**")),
  (0x02, plain("ld (bc),a")),
  (0x03, plain("inc bc")),
  (0x04, plain("inc b")),
  (0x05, plain("dec b")),
  (0x06, imm8("ld b,*")),
  (0x07, plain("rlca")),
  (0x09, plain("add hl,bc")),
  (0x0a, plain("ld a,(bc)")),
  (0x0b, plain("dec bc")),
  (0x0c, plain("inc c")),
  (0x0d, plain("dec c")),
  (0x0e, imm8("ld c,*")),
  (0x0f, plain("rrca")),
  (0x10, cond_branch("djnz *")),
  (0x11, imm16("ld de,**")),
  (0x12, plain("ld (de),a")),
  (0x13, plain("inc de")),
  (0x14, plain("inc d")),
  (0x15, plain("dec d")),
  (0x16, imm8("ld d,*")),
  (0x17, plain("rla")),
  (0x18, op("jr *", Operand::Rel8, Flow::Branch)),
  (0x19, plain("add hl,de")),
  (0x1a, plain("ld a,(de)")),
  (0x1b, plain("dec de")),
  (0x1c, plain("inc e")),
  (0x1d, plain("dec e")),
  (0x1e, imm8("ld e,*")),
  (0x1f, plain("rra")),
  (0x20, cond_branch("jr nz,*")),
  (0x21, imm16("ld hl,**")),
  (0x22, imm16("ld (**),hl")),
  (0x23, plain("inc hl")),
  (0x24, plain("inc h")),
  (0x25, plain("dec h")),
  (0x26, imm8("ld h,*")),
  (0x28, cond_branch("jr z,*")),
  (0x29, plain("add hl,hl")),
  (0x2a, imm16("ld hl,(**)")),
  (0x2b, plain("dec hl")),
  (0x2c, plain("inc l")),
  (0x2d, plain("dec l")),
  (0x2e, imm8("ld l,*")),
  (0x2f, plain("cpl")),
  (0x30, cond_branch("jr nc,*")),
  (0x31, imm16("ld sp,**")),
  (0x32, imm16("ld (**),a")),
  (0x33, plain("inc sp")),
  (0x34, plain("inc (hl)")),
  (0x35, plain("dec (hl)")),
  (0x36, imm8("ld (hl),*")),
  (0x37, plain("scf")),
  (0x38, cond_branch("jr c,*")),
  (0x39, plain("add hl,sp")),
  (0x3a, imm16("ld a,(**)")),
  (0x3b, plain("dec sp")),
  (0x3c, plain("inc a")),
  (0x3d, plain("dec a")),
  (0x3e, imm8("ld a,*")),
  (0x3f, plain("ccf")),
  (0x40, plain("ld b,b")),
  (0x41, plain("ld b,c")),
  (0x42, plain("ld b,d")),
  (0x43, plain("ld b,e")),
  (0x44, plain("ld b,h")),
  (0x45, plain("ld b,l")),
  (0x46, plain("ld b,(hl)")),
  (0x47, plain("ld b,a")),
  (0x48, plain("ld c,b")),
  (0x49, plain("ld c,c")),
  (0x4a, plain("ld c,d")),
  (0x4b, plain("ld c,e")),
  (0x4c, plain("ld c,h")),
  (0x4d, plain("ld c,l")),
  (0x4e, plain("ld c,(hl)")),
  (0x4f, plain("ld c,a")),
  (0x50, plain("ld d,b")),
  (0x51, plain("ld d,c")),
  (0x52, plain("ld d,d")),
  (0x53, plain("ld d,e")),
  (0x54, plain("ld d,h")),
  (0x55, plain("ld d,l")),
  (0x56, plain("ld d,(hl)")),
  (0x57, plain("ld d,a")),
  (0x58, plain("ld e,b")),
  (0x59, plain("ld e,c")),
  (0x5a, plain("ld e,d")),
  (0x5b, plain("ld e,e")),
  (0x5c, plain("ld e,h")),
  (0x5d, plain("ld e,l")),
  (0x5e, plain("ld e,(hl)")),
  (0x5f, plain("ld e,a")),
  (0x60, plain("ld h,b")),
  (0x61, plain("ld h,c")),
  (0x62, plain("ld h,d")),
  (0x63, plain("ld h,e")),
  (0x64, plain("ld h,h")),
  (0x65, plain("ld h,l")),
  (0x66, plain("ld h,(hl)")),
  (0x67, plain("ld h,a")),
  (0x68, plain("ld l,b")),
  (0x69, plain("ld l,c")),
  (0x6a, plain("ld l,d")),
  (0x6b, plain("ld l,e")),
  (0x6c, plain("ld l,h")),
  (0x6d, plain("ld l,l")),
  (0x6e, plain("ld l,(hl)")),
  (0x6f, plain("ld l,a")),
  (0x70, plain("ld (hl),b")),
  (0x71, plain("ld (hl),c")),
  (0x72, plain("ld (hl),d")),
  (0x73, plain("ld (hl),e")),
  (0x74, plain("ld (hl),h")),
  (0x75, plain("ld (hl),l")),
  (0x76, plain("wait a")),
  (0x77, plain("ld (hl),a")),
  (0x78, plain("ld a,b")),
  (0x79, plain("ld a,c")),
  (0x7a, plain("ld a,d")),
  (0x7b, plain("ld a,e")),
  (0x7c, plain("ld a,h")),
  (0x7d, plain("ld a,l")),
  (0x7e, plain("ld a,(hl)")),
  (0x7f, plain("ld a,a")),
  (0x80, plain("add a,b")),
  (0x81, plain("add a,c")),
  (0x82, plain("add a,d")),
  (0x83, plain("add a,e")),
  (0x84, plain("add a,h")),
  (0x85, plain("add a,l")),
  (0x86, plain("add a,(hl)")),
  (0x87, plain("add a,a")),
  (0x88, plain("adc a,b")),
  (0x89, plain("adc a,c")),
  (0x8a, plain("adc a,d")),
  (0x8b, plain("adc a,e")),
  (0x8c, plain("adc a,h")),
  (0x8d, plain("adc a,l")),
  (0x8e, plain("adc a,(hl)")),
  (0x8f, plain("adc a,a")),
  (0x90, plain("sub b")),
  (0x91, plain("sub c")),
  (0x92, plain("sub d")),
  (0x93, plain("sub e")),
  (0x94, plain("sub h")),
  (0x95, plain("sub l")),
  (0x96, plain("sub (hl)")),
  (0x97, plain("sub a")),
  (0x98, plain("sbc a,b")),
  (0x99, plain("sbc a,c")),
  (0x9a, plain("sbc a,d")),
  (0x9b, plain("sbc a,e")),
  (0x9c, plain("sbc a,h")),
  (0x9d, plain("sbc a,l")),
  (0x9e, plain("sbc a,(hl)")),
  (0x9f, plain("sbc a,a")),
  (0xa0, plain("and b")),
  (0xa1, plain("and c")),
  (0xa2, plain("and d")),
  (0xa3, plain("and e")),
  (0xa4, plain("and h")),
  (0xa5, plain("and l")),
  (0xa6, plain("and (hl)")),
  (0xa7, plain("and a")),
  (0xa8, plain("xor b")),
  (0xa9, plain("xor c")),
  (0xaa, plain("xor d")),
  (0xab, plain("xor e")),
  (0xac, plain("xor h")),
  (0xad, plain("xor l")),
  (0xae, plain("xor (hl)")),
  (0xaf, plain("xor a")),
  (0xb0, plain("or b")),
  (0xb1, plain("or c")),
  (0xb2, plain("or d")),
  (0xb3, plain("or e")),
  (0xb4, plain("or h")),
  (0xb5, plain("or l")),
  (0xb6, plain("or (hl)")),
  (0xb7, plain("or a")),
  (0xb8, plain("cp b")),
  (0xb9, plain("cp c")),
  (0xba, plain("cp d")),
  (0xbb, plain("cp e")),
  (0xbc, plain("cp h")),
  (0xbd, plain("cp l")),
  (0xbe, plain("cp (hl)")),
  (0xbf, plain("cp a")),
  (0xc0, plain("ret nz")),
  (0xc1, plain("pop bc")),
  (0xc2, cond_jump("jp nz,**")),
  (0xc3, op("jp **", Operand::Addr16, Flow::Jump)),
  (0xc4, imm16("call nz,**")),
  (0xc5, plain("push bc")),
  (0xc6, imm8("add a,*")),
  (0xc7, op("rst 0x00", Operand::Implied, Flow::Vector(Vector::Rst00))),
  (0xc8, plain("ret z")),
  (0xc9, op("ret", Operand::Implied, Flow::Return)),
  (0xca, cond_jump("jp z,**")),
  (0xcc, imm16("call z,**")),
  (0xcd, op("call **", Operand::Imm16, Flow::Call)),
  (0xce, imm8("adc a,*")),
  (0xcf, op("rst 0x08", Operand::Implied, Flow::Vector(Vector::Rst08))),
  (0xd0, plain("ret nc")),
  (0xd1, plain("pop de")),
  (0xd2, cond_jump("jp nc,**")),
  (0xd3, imm8("wait *")),
  (0xd4, imm16("call nc,**")),
  (0xd5, plain("push de")),
  (0xd6, imm8("sub *")),
  (0xd8, plain("ret c")),
  (0xda, cond_jump("jp c,**")),
  (0xdc, imm16("call c,**")),
  (0xde, imm8("sbc a,*")),
  (0xe1, plain("pop hl")),
  (0xe3, plain("ex (sp),hl")),
  (0xe5, plain("push hl")),
  (0xe6, imm8("and *")),
  (0xe9, plain("jp (hl)")),
  (0xeb, plain("ex de,hl")),
  (0xee, imm8("xor *")),
  (0xf0, plain("ret p")),
  (0xf1, plain("pop af")),
  (0xf2, cond_jump("jp p,**")),
  (0xf5, plain("push af")),
  (0xf6, imm8("or *")),
  (0xf8, plain("ret m")),
  (0xf9, plain("ld sp,hl")),
  (0xfa, cond_jump("jp m,**")),
  (0xfe, imm8("cp *")),
];


#[cfg(test)]
mod tests {
  use super::*;

  // Bytes with no instruction encoding in this subset.
  const INVALID: &[u8] = &[
    0x08, 0x27, 0xcb, 0xd7, 0xd9, 0xdb, 0xdd, 0xdf, 0xe0, 0xe2, 0xe4, 0xe7,
    0xe8, 0xea, 0xec, 0xed, 0xef, 0xf3, 0xf4, 0xf7, 0xfb, 0xfc, 0xfd, 0xff,
  ];

  #[test]
  fn invalid_opcodes_have_no_descriptor() {
    for opcode in INVALID {
      assert!(lookup(*opcode).is_none(), "0x{:02x} should be invalid", opcode);
    }
  }

  #[test]
  fn every_other_byte_decodes() {
    let valid = (0..=255u8).filter(|b| lookup(*b).is_some()).count();
    assert_eq!(valid, 256 - INVALID.len());
  }

  #[test]
  fn sizes_follow_operand_width() {
    assert_eq!(lookup(0x00).unwrap().size(), 1); // nop
    assert_eq!(lookup(0x0e).unwrap().size(), 2); // ld c,*
    assert_eq!(lookup(0x01).unwrap().size(), 3); // ld bc,**
    assert_eq!(lookup(0x18).unwrap().size(), 2); // jr *
    assert_eq!(lookup(0xc3).unwrap().size(), 3); // jp **
    assert_eq!(lookup(0xc7).unwrap().size(), 1); // rst 0x00
  }

  #[test]
  fn render_immediates() {
    let mut labels = LabelTable::new();
    assert_eq!(
      render(lookup(0x0e).unwrap(), &OperandValue::Byte(0xff), &mut labels),
      "ld c,#0xff"
    );
    assert_eq!(
      render(lookup(0x01).unwrap(), &OperandValue::Word(0xcdab), &mut labels),
      "ld bc,#0xcdab"
    );
    assert_eq!(
      render(lookup(0x00).unwrap(), &OperandValue::None, &mut labels),
      "nop"
    );
  }

  #[test]
  fn render_jump_address_is_bare_but_call_is_immediate() {
    let mut labels = LabelTable::new();
    assert_eq!(
      render(lookup(0xc3).unwrap(), &OperandValue::Word(0x0105), &mut labels),
      "jp 0x0105"
    );
    assert_eq!(
      render(lookup(0xc2).unwrap(), &OperandValue::Word(0x0105), &mut labels),
      "jp nz,0x0105"
    );
    assert_eq!(
      render(lookup(0xcd).unwrap(), &OperandValue::Word(0x0105), &mut labels),
      "call #0x0105"
    );
  }

  #[test]
  fn render_relative_target_as_label() {
    let mut labels = LabelTable::new();
    let target = OperandValue::Target(Address(0x0105));
    assert_eq!(
      render(lookup(0x18).unwrap(), &target, &mut labels),
      "jr label_0x0105"
    );
    assert_eq!(
      render(lookup(0x20).unwrap(), &target, &mut labels),
      "jr nz,label_0x0105"
    );
    assert_eq!(
      render(lookup(0x10).unwrap(), &target, &mut labels),
      "djnz label_0x0105"
    );
    assert_eq!(labels.len(), 1);
  }
}
