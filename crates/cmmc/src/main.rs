//! C-- compiler CLI.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use cmmc::{run, Emit};

#[derive(Parser)]
#[command(name = "cmmc")]
#[command(about = "C-- compiler - emits MIPS assembly for SPIM")]
#[command(version)]
struct Cli {
    /// Input .cmm source file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output type
    #[arg(long, default_value = "asm")]
    emit: EmitArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmitArg {
    /// Pretty-printed program
    Ast,
    /// Pretty-printed program with resolved names
    Names,
    /// MIPS assembly
    Asm,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let src = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {e}", cli.input.display());
            return ExitCode::from(2);
        }
    };

    let emit = match cli.emit {
        EmitArg::Ast => Emit::Ast,
        EmitArg::Names => Emit::Names,
        EmitArg::Asm => Emit::Asm,
    };

    let compilation = match run(&src, emit) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    for diag in compilation.reporter.diags() {
        eprintln!("{diag}");
    }

    if let Some(out) = &compilation.output {
        match &cli.output {
            Some(path) => {
                if let Err(e) = fs::write(path, out) {
                    eprintln!("{}: {e}", path.display());
                    return ExitCode::from(2);
                }
            }
            None => print!("{out}"),
        }
    }

    if compilation.reporter.errored() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
