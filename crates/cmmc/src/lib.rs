pub mod ast;
pub mod codegen;
pub mod driver;
pub mod layout;
pub mod lex;
pub mod names;
pub mod parse;
pub mod report;
pub mod symtab;
pub mod typecheck;
pub mod types;
pub mod unparse;

pub use driver::{run, Compilation, DriverError, Emit};
