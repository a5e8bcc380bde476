/*!

  Turns a traced line map into final text. Two surfaces exist: a flat
  listing with one address-prefixed line per rendered offset (the minimal
  and debugging form), and the assembler-ready pair of artifacts: a main
  unit opening with segment/origin/include directives, plus a definitions
  unit declaring every known API routine name.

*/

use strum_macros::{Display as StrumDisplay, EnumString};

use super::context::{Line, TraceContext};
use crate::address::Address;
use crate::erapi::ApiCatalog;

/// Column where a trailing comment begins, measured on the bare body.
pub const COMMENT_COLUMN: usize = 20;

pub const MAIN_UNIT: &str = "main.asm";
pub const DEFS_UNIT: &str = "erapi.asm";

/// Fixed prologue of the main unit.
pub const PREAMBLE: &str =
  "    .area CODE (ABS)\n    .include \"erapi.asm\"\n    .org 0x100\n";

#[derive(
EnumString, StrumDisplay,
Clone,      Copy,         Eq, PartialEq, Debug
)]
pub enum OutputMode {
  #[strum(serialize = "flat")]
  Flat,
  #[strum(serialize = "asm")]
  Assembler,
}

/// The assembler-ready artifacts of one run.
pub struct Program {
  pub main        : String,
  pub definitions : String,
}

impl Program {
  /// Artifact file names with their contents, in write order.
  pub fn units(&self) -> Vec<(&'static str, &str)> {
    vec![
      (MAIN_UNIT, self.main.as_str()),
      (DEFS_UNIT, self.definitions.as_str()),
    ]
  }
}

fn format_line(line: &Line) -> String {
  match line.comment {
    Some(comment) => {
      format!("{:<width$}; {}", line.body, comment, width = COMMENT_COLUMN)
    }
    None => line.body.clone(),
  }
}

/// Flat listing: `0xHHHH    <body>` per rendered offset, no labels.
pub fn render_flat(ctx: &TraceContext) -> String {
  ctx
    .rendered()
    .map(|(offset, line)| {
      format!("{}    {}", Address::from_offset(offset), format_line(line))
    })
    .collect::<Vec<String>>()
    .join("\n")
}

/**
  Assembler mode. The main unit walks offsets in ascending order; a label
  bound to a rendered offset's address is emitted on its own line, set off
  by a blank line above it. The definitions unit comes straight from the
  catalog.
*/
pub fn render_program(ctx: &TraceContext, catalog: &ApiCatalog) -> Program {
  let mut body: Vec<String> = Vec::new();

  for (offset, line) in ctx.rendered() {
    if let Some(name) = ctx.labels.get(&Address::from_offset(offset)) {
      body.push(String::new());
      body.push(format!("{}:", name));
    }
    body.push(format!("    {}", format_line(line)));
  }

  Program {
    main        : format!("{}{}", PREAMBLE, body.join("\n")),
    definitions : catalog.definitions(),
  }
}
