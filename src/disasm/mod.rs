/*!

  The control-flow tracer. Disassembly is a breadth-first walk over stream
  offsets: a FIFO queue is seeded with offset 0, and every decoded
  instruction contributes its successors according to its flow class:
  the fallthrough, a branch target, both for a conditional branch, and the
  pushed or popped return offset for calls and returns. Offsets that leave
  the stream are discarded when popped, not when enqueued, so branch
  arithmetic never needs bounds checks of its own.

  The visited set makes the walk terminate: each offset is decoded as an
  origin at most once, and every byte an instruction consumes is marked so
  the reconciliation pass afterwards can fill the never-reached gaps with
  raw data lines. Together the two passes account for every input offset
  exactly once.

*/

pub mod context;
pub mod render;

use std::collections::VecDeque;

use thiserror::Error;

use crate::address::{signed_displacement, Address, START_ADDR};
use crate::erapi::ApiCatalog;
use crate::opcode::{self, Flow, Operand, OperandValue};

pub use context::{Line, TraceContext, Warning};
pub use render::{render_flat, render_program, OutputMode, Program};

pub type Result<T> = std::result::Result<T, DisasmError>;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum DisasmError {
  /// Disassembly was requested before any byte stream was supplied.
  #[error("No input stream")]
  NoInput,
  /// An operand or selector byte lies beyond the end of the stream. The
  /// input is malformed, so the whole run aborts.
  #[error("truncated instruction at {0}")]
  TruncatedInstruction(Address),
}

/// The disassembler engine. Holds the input stream and the injected API
/// catalog; all per-run state lives in a [`TraceContext`].
pub struct Disasm {
  input   : Option<Vec<u8>>,
  catalog : ApiCatalog,
}

impl Disasm {

  pub fn new() -> Disasm {
    Disasm::with_catalog(ApiCatalog::default())
  }

  pub fn with_catalog(catalog: ApiCatalog) -> Disasm {
    Disasm {
      input   :  None,
      catalog,
    }
  }

  pub fn set_input(&mut self, bytes: Vec<u8>) {
    self.input = Some(bytes);
  }

  pub fn catalog(&self) -> &ApiCatalog {
    &self.catalog
  }

  // region Tracing

  /**
    Runs the breadth-first walk and the reconciliation pass, returning the
    completed per-run context. Every call starts from a fresh context, so
    tracing the same input twice yields identical results.
  */
  pub fn trace(&self) -> Result<TraceContext> {
    let input = self.input.as_ref().ok_or(DisasmError::NoInput)?;
    let mut ctx = TraceContext::new(input.len());
    self.walk(input, &mut ctx)?;
    reconcile(input, &mut ctx);
    Ok(ctx)
  }

  fn walk(&self, input: &[u8], ctx: &mut TraceContext) -> Result<()> {
    let mut queue: VecDeque<isize> = VecDeque::new();
    queue.push_back(0);

    while let Some(popped) = queue.pop_front() {
      // Unreachable successors are dropped here, not treated as errors.
      if popped < 0 || popped as usize >= input.len() {
        continue;
      }
      let origin = popped as usize;
      if ctx.visited[origin] {
        continue;
      }

      #[cfg(feature = "trace_flow")]
      println!("trace {}  opcode 0x{:02x}", Address::from_offset(origin), input[origin]);

      let opcode_byte = input[origin];
      let desc = match opcode::lookup(opcode_byte) {
        None => {
          // Not an instruction of the subset; render as data and keep walking.
          ctx.visit(origin);
          ctx.lines[origin] = Some(Line::data(opcode_byte));
          queue.push_back(popped + 1);
          continue;
        }
        Some(desc) => desc,
      };

      let size = desc.size();
      if origin + size > input.len() {
        return Err(DisasmError::TruncatedInstruction(Address::from_offset(origin)));
      }
      ctx.visit_span(origin, size);

      let fallthrough = popped + size as isize;

      let (value, branch_target) = match desc.operand {

        Operand::Implied => (OperandValue::None, None),

        Operand::Imm8 => (OperandValue::Byte(input[origin + 1]), None),

        Operand::Imm16 | Operand::Addr16 => {
          let word = input[origin + 1] as u16 | ((input[origin + 2] as u16) << 8);
          (OperandValue::Word(word), None)
        }

        Operand::Rel8 => {
          let target = fallthrough + signed_displacement(input[origin + 1]);
          (OperandValue::Target(Address::from_signed_offset(target)), Some(target))
        }

      };

      ctx.lines[origin] =
        Some(Line::instruction(opcode::render(desc, &value, &mut ctx.labels)));

      match desc.flow {

        Flow::Fallthrough => {
          queue.push_back(fallthrough);
        }

        Flow::Branch => {
          if let Some(target) = branch_target {
            queue.push_back(target);
          }
        }

        Flow::BranchConditional => {
          // The tracer cannot know which path executes; explore both.
          queue.push_back(fallthrough);
          if let Some(target) = branch_target {
            queue.push_back(target);
          }
        }

        Flow::Jump => {
          if let OperandValue::Word(word) = value {
            queue.push_back(word as isize - START_ADDR as isize);
          }
        }

        Flow::Call => {
          if let OperandValue::Word(word) = value {
            ctx.stack.push(fallthrough);
            queue.push_back(word as isize - START_ADDR as isize);
          }
        }

        Flow::Return => {
          match ctx.stack.pop() {
            Some(resume) => queue.push_back(resume),
            None => {
              ctx.warnings.push(Warning::ReturnWithoutCall {
                at: Address::from_offset(origin),
              });
            }
          }
        }

        Flow::Vector(vector) => {
          // The byte after the vector selects an API routine; it is never
          // decoded as an opcode.
          let selector_offset = origin + 1;
          if selector_offset >= input.len() {
            return Err(DisasmError::TruncatedInstruction(Address::from_offset(origin)));
          }
          ctx.visit(selector_offset);
          let selector = input[selector_offset];
          ctx.lines[selector_offset] = Some(match self.catalog.lookup(vector, selector) {
            Some(name) => Line::named_data(name),
            None => {
              ctx.warnings.push(Warning::UnknownApiCall {
                at: Address::from_offset(selector_offset),
                selector,
              });
              Line::data(selector).with_comment("unknown API call")
            }
          });
          queue.push_back(popped + 2);
        }

      } // end match flow
    } // end while queue non-empty

    Ok(())
  }

  // endregion

  // region Output

  /// Flat listing of the trace, one address-prefixed line per offset.
  pub fn disassemble(&self) -> Result<String> {
    Ok(render_flat(&self.trace()?))
  }

  /// Assembler-ready artifacts: the main unit and the definitions unit.
  pub fn disassemble_program(&self) -> Result<Program> {
    Ok(render_program(&self.trace()?, &self.catalog))
  }

  // endregion
}

/// Fills every never-visited offset with a raw data line. Offsets visited
/// as part of an instruction are already accounted for by the owning
/// line, so the visited set is the only gate consulted here.
fn reconcile(input: &[u8], ctx: &mut TraceContext) {
  for (offset, byte) in input.iter().enumerate() {
    if !ctx.visited[offset] {
      ctx.lines[offset] = Some(Line::data(*byte));
    }
  }
}
