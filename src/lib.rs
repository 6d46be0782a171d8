//! Crate root: wires together the compilation pipeline.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `lexer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge, merging the postfix stream into
//!   an AST and registering extern and variable declarations as it goes.
//! - `codegen` lowers the parsed program into NASM x86-64 assembly while
//!   type-checking the compile-time stack model.
//! - `error` centralises the per-stage error enums.
//! - `ty` holds the symbolic value types and the declarable element types.
//!
//! The emitted assembly defines `sweet_main` and leans on a small runtime
//! for allocation and I/O; assembling and linking happen outside this crate.

pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod ty;

pub use error::{CompileError, Error, LexerError, ParserError};

/// Compile source text into NASM x86-64 assembly.
pub fn generate_assembly(source: &str) -> Result<String, Error> {
  let tokens = lexer::tokenize(source)?;
  let program = parser::parse(tokens)?;
  Ok(codegen::generate(&program)?)
}
