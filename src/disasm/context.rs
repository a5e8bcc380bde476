/*!

  Per-run mutable state of a trace. Everything a run touches (the line
  map, the visited set, the emulated call stack, the label table and the
  collected warnings) lives in one `TraceContext` value constructed fresh
  for each run and threaded through every step. Repeated runs on the same
  engine therefore cannot leak state into each other.

*/

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;

use crate::address::Address;
use crate::labels::LabelTable;

/// Rendered text for one origin offset.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Line {
  pub body    : String,
  pub comment : Option<&'static str>,
}

impl Line {

  pub fn instruction(body: String) -> Line {
    Line { body, comment: None }
  }

  /// A raw data byte, `.db 0xHH`.
  pub fn data(byte: u8) -> Line {
    Line { body: format!(".db 0x{:02x}", byte), comment: None }
  }

  /// A data byte with a symbolic name, `.db ER_API_FadeIn`.
  pub fn named_data(name: &DefaultAtom) -> Line {
    Line { body: format!(".db {}", name), comment: None }
  }

  pub fn with_comment(mut self, comment: &'static str) -> Line {
    self.comment = Some(comment);
    self
  }

  pub fn is_data(&self) -> bool {
    self.body.starts_with(".db")
  }
}

/// Non-fatal findings of a run. The trace keeps going; the caller decides
/// whether to surface these.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Warning {
  /// A `ret` was decoded with no pending call; that queue branch ends.
  ReturnWithoutCall { at: Address },
  /// A software-call selector with no catalog entry.
  UnknownApiCall { at: Address, selector: u8 },
}

impl Display for Warning {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Warning::ReturnWithoutCall { at } => {
        write!(f, "return without matching call at {}", at)
      }

      Warning::UnknownApiCall { at, selector } => {
        write!(f, "unknown API call 0x{:02x} at {}", selector, at)
      }

    }
  }
}

pub struct TraceContext {
  /// Rendered lines, indexed by origin offset. Offsets consumed as operand
  /// or selector bytes stay `None`; their instruction's line accounts for
  /// them.
  pub lines    : Vec<Option<Line>>,
  /// One flag per offset; monotonic for the duration of the run.
  pub visited  : Vec<bool>,
  /// Pending return offsets, pushed by calls and popped by returns.
  pub stack    : Vec<isize>,
  pub labels   : LabelTable,
  pub warnings : Vec<Warning>,
}

impl TraceContext {

  pub fn new(len: usize) -> TraceContext {
    TraceContext {
      lines    :  vec![None; len],
      visited  :  vec![false; len],
      stack    :  vec![],
      labels   :  LabelTable::new(),
      warnings :  vec![],
    }
  }

  pub fn visit(&mut self, offset: usize) {
    self.visited[offset] = true;
  }

  /// Marks the whole encoded span of an instruction, origin included.
  pub fn visit_span(&mut self, origin: usize, size: usize) {
    for offset in origin..origin + size {
      self.visited[offset] = true;
    }
  }

  /// Offsets that carry a rendered line, in ascending order.
  pub fn rendered(&self) -> impl Iterator<Item = (usize, &Line)> + '_ {
    self.lines
      .iter()
      .enumerate()
      .filter_map(|(offset, slot)| slot.as_ref().map(|line| (offset, line)))
  }

  pub fn line_count(&self) -> usize {
    self.rendered().count()
  }

  pub fn data_line_count(&self) -> usize {
    self.rendered().filter(|(_, line)| line.is_data()).count()
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresh_context_is_empty() {
    let ctx = TraceContext::new(4);
    assert_eq!(ctx.lines.len(), 4);
    assert!(ctx.visited.iter().all(|visited| !visited));
    assert!(ctx.stack.is_empty());
    assert!(ctx.warnings.is_empty());
    assert_eq!(ctx.line_count(), 0);
  }

  #[test]
  fn visit_span_covers_trailing_bytes() {
    let mut ctx = TraceContext::new(5);
    ctx.visit_span(1, 3);
    assert_eq!(ctx.visited, vec![false, true, true, true, false]);
  }

  #[test]
  fn data_lines_are_recognized() {
    assert!(Line::data(0xff).is_data());
    assert!(!Line::instruction("nop".to_string()).is_data());
  }

  #[test]
  fn warning_display() {
    let warning = Warning::ReturnWithoutCall { at: Address(0x0100) };
    assert_eq!(format!("{}", warning), "return without matching call at 0x0100");
    let warning = Warning::UnknownApiCall { at: Address(0x0101), selector: 0xff };
    assert_eq!(format!("{}", warning), "unknown API call 0xff at 0x0101");
  }
}
