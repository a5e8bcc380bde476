//! Command line front end: loads a program card binary, traces it, and
//! either prints the flat listing or emits the assembler-ready units.
#![allow(dead_code)]

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

mod address;
mod disasm;
mod erapi;
mod labels;
mod opcode;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{info, warn};
use prettytable::{format as TableFormat, Table};

use crate::disasm::{render_flat, render_program, Disasm, OutputMode, Program, TraceContext};

#[derive(Parser, Debug)]
#[command(name = "erdasm")]
#[command(about = "Control-flow tracing disassembler for e-Reader Z80 program cards")]
struct Args {
  /// Program binary to disassemble
  #[arg(short, long)]
  input: PathBuf,

  /// Output format: a `flat` listing, or assembler-ready `asm` units
  #[arg(short, long, default_value = "flat")]
  format: OutputMode,

  /// Directory to write main.asm and erapi.asm into (asm format only);
  /// without it the units go to stdout
  #[arg(short, long)]
  out_dir: Option<PathBuf>,

  /// Print a summary table after disassembling
  #[arg(long)]
  stats: bool,
}

lazy_static! {
  static ref STATS_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

fn print_stats(ctx: &TraceContext) {
  let mut table = Table::new();
  table.set_format(*STATS_FORMAT);
  table.set_titles(row![ubr->"Metric", ubl->"Count"]);
  table.add_row(row![r->"input bytes", ctx.visited.len()]);
  table.add_row(row![r->"rendered lines", ctx.line_count()]);
  table.add_row(row![r->"data lines", ctx.data_line_count()]);
  table.add_row(row![r->"labels", ctx.labels.len()]);
  table.add_row(row![r->"warnings", ctx.warnings.len()]);
  table.printstd();
}

fn write_units(dir: &Path, program: &Program) -> std::io::Result<()> {
  fs::create_dir_all(dir)?;
  for (name, content) in program.units() {
    let path = dir.join(name);
    fs::write(&path, content)?;
    info!("wrote {}", path.display());
  }
  Ok(())
}

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
  let args = Args::parse();

  let bytes = match fs::read(&args.input) {
    Ok(bytes) => bytes,
    Err(error) => {
      eprintln!("cannot read {}: {}", args.input.display(), error);
      process::exit(1);
    }
  };
  info!("loaded {} bytes from {}", bytes.len(), args.input.display());

  let mut disasm = Disasm::new();
  disasm.set_input(bytes);

  let ctx = match disasm.trace() {
    Ok(ctx) => ctx,
    Err(error) => {
      eprintln!("{}", error);
      process::exit(1);
    }
  };
  for warning in &ctx.warnings {
    warn!("{}", warning);
  }

  match args.format {

    OutputMode::Flat => {
      println!("{}", render_flat(&ctx));
    }

    OutputMode::Assembler => {
      let program = render_program(&ctx, disasm.catalog());
      match &args.out_dir {
        Some(dir) => {
          if let Err(error) = write_units(dir, &program) {
            eprintln!("cannot write units: {}", error);
            process::exit(1);
          }
        }
        None => {
          for (name, content) in program.units() {
            println!(";; {}", name);
            println!("{}", content);
          }
        }
      }
    }

  }

  if args.stats {
    print_stats(&ctx);
  }
}
