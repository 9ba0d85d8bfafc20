//! The phase pipeline: lex, parse, resolve names, type check, lay out
//! storage, emit. The error flag is inspected between phases; nothing after
//! type checking runs once a diagnostic has been reported.

use log::debug;

use crate::report::Reporter;
use crate::symtab::Symbols;
use crate::{codegen, layout, lex, names, parse, typecheck, unparse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// Pretty-print the parsed program.
    Ast,
    /// Pretty-print with resolved-entry annotations on every identifier.
    Names,
    /// MIPS assembly.
    Asm,
}

/// An internal failure (a broken symbol-table invariant), as opposed to
/// diagnostics about the user's program. The driver exits non-zero without
/// pretending this was the program's fault.
#[derive(Debug)]
pub struct DriverError(pub String);

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for DriverError {}

fn derr(msg: impl Into<String>) -> DriverError {
    DriverError(msg.into())
}

pub struct Compilation {
    /// The requested output, absent when errors stopped the pipeline.
    pub output: Option<String>,
    pub reporter: Reporter,
}

impl Compilation {
    fn stopped(reporter: Reporter) -> Compilation {
        Compilation {
            output: None,
            reporter,
        }
    }
}

pub fn run(src: &str, emit: Emit) -> Result<Compilation, DriverError> {
    let mut reporter = Reporter::new();

    let tokens = lex::lex(src, &mut reporter);
    if reporter.errored() {
        debug!("stopping after lexing");
        return Ok(Compilation::stopped(reporter));
    }

    let mut prog = match parse::parse(&tokens) {
        Ok(p) => p,
        Err(e) => {
            reporter.fatal(e.span, e.msg);
            debug!("stopping after parsing");
            return Ok(Compilation::stopped(reporter));
        }
    };

    if emit == Emit::Ast {
        return Ok(Compilation {
            output: Some(unparse::unparse(&prog)),
            reporter,
        });
    }

    let mut syms = Symbols::new();
    names::resolve(&mut prog, &mut syms, &mut reporter)
        .map_err(|e| derr(format!("internal symbol-table failure: {e}")))?;

    if emit == Emit::Names {
        return Ok(Compilation {
            output: Some(unparse::unparse_annotated(&prog, &syms)),
            reporter,
        });
    }

    typecheck::check(&prog, &syms, &mut reporter);
    if reporter.errored() {
        debug!("errors reported, skipping code generation");
        return Ok(Compilation::stopped(reporter));
    }

    layout::layout(&prog, &mut syms);
    let asm = codegen::generate(&prog, &syms);
    Ok(Compilation {
        output: Some(asm),
        reporter,
    })
}
