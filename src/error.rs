//! Error types for the three pipeline stages.
//!
//! Each stage owns a distinct enum so callers can tell lexical, structural,
//! and code-generation failures apart without string matching; `Error` wraps
//! the three for the top-level pipeline. Messages carry a `line:column`
//! position where a token is available – code generation works on
//! position-free nodes and reports without one.

use snafu::Snafu;

use crate::ty::ValueType;

pub type LexResult<T> = Result<T, LexerError>;
pub type ParseResult<T> = Result<T, ParserError>;
pub type CompileResult<T> = Result<T, CompileError>;

/// Malformed raw text. Fatal to the compilation; the lexer does not
/// resynchronise and continue.
#[derive(Debug, Snafu)]
pub enum LexerError {
  #[snafu(display("line {line}:{column}: unterminated string literal"))]
  UnterminatedString { line: u32, column: u32 },

  #[snafu(display("line {line}:{column}: unterminated block comment"))]
  UnterminatedComment { line: u32, column: u32 },

  #[snafu(display("line {line}:{column}: unknown character {ch:?}"))]
  UnknownCharacter { ch: char, line: u32, column: u32 },

  #[snafu(display("line {line}:{column}: invalid number: {source}"))]
  InvalidNumber {
    line: u32,
    column: u32,
    source: std::num::ParseIntError,
  },
}

/// Structurally invalid token sequence. Parsing aborts at the first error;
/// there is no multi-error batching.
#[derive(Debug, Snafu)]
pub enum ParserError {
  #[snafu(display("line {line}:{column}: expected {expected}, but got {found}"))]
  UnexpectedToken {
    expected: &'static str,
    found: String,
    line: u32,
    column: u32,
  },

  #[snafu(display("line {line}:{column}: keyword \"{word}\" is not valid here"))]
  UnsupportedKeyword { word: String, line: u32, column: u32 },

  #[snafu(display("line {line}:{column}: not enough operands for \"{op}\""))]
  InsufficientOperands { op: String, line: u32, column: u32 },

  #[snafu(display("line {line}:{column}: expected \"end\" to close {construct}, but got {found}"))]
  ExpectedEnd {
    construct: &'static str,
    found: String,
    line: u32,
    column: u32,
  },

  #[snafu(display("line {line}:{column}: expected \"do\" after loop condition, but got {found}"))]
  ExpectedDo { found: String, line: u32, column: u32 },

  #[snafu(display(
    "line {line}:{column}: loop condition must reduce to exactly one node, found {count}"
  ))]
  LoopCondition { count: usize, line: u32, column: u32 },

  #[snafu(display("line {line}:{column}: unknown identifier \"{name}\""))]
  UnknownIdentifier { name: String, line: u32, column: u32 },

  #[snafu(display("line {line}:{column}: \"{name}\" is not a declared variable"))]
  UnknownVariable { name: String, line: u32, column: u32 },

  #[snafu(display("line {line}:{column}: unknown type \"{name}\""))]
  UnknownType { name: String, line: u32, column: u32 },

  #[snafu(display("line {line}:{column}: \"{name}\" is already declared"))]
  DuplicateName { name: String, line: u32, column: u32 },

  #[snafu(display(
    "line {line}:{column}: extern \"{name}\" declares {arity} arguments, the calling convention passes at most 6"
  ))]
  TooManyArguments {
    name: String,
    arity: u64,
    line: u32,
    column: u32,
  },

  #[snafu(display(
    "line {line}:{column}: \"{name}\" is not an array, initializers need an array declaration"
  ))]
  InitializerOnScalar { name: String, line: u32, column: u32 },

  #[snafu(display(
    "line {line}:{column}: initializer is {len} bytes, declared capacity is {capacity}"
  ))]
  InitializerTooLong {
    len: usize,
    capacity: u64,
    line: u32,
    column: u32,
  },

  #[snafu(display("line {line}:{column}: initializer character {ch:?} does not fit a single byte"))]
  UnencodableInitializer { ch: char, line: u32, column: u32 },
}

/// Well-formed AST that violates a code-generation invariant. Code generation
/// aborts at the first error.
#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("stack underflow: \"{op}\" needs more operands than the stack holds"))]
  StackUnderflow { op: String },

  #[snafu(display("type mismatch: \"{op}\" expects {expected}, found {found}"))]
  TypeMismatch {
    op: String,
    expected: &'static str,
    found: ValueType,
  },

  #[snafu(display("undefined variable \"{name}\""))]
  UndefinedVariable { name: String },

  #[snafu(display("loop condition must push exactly one value, net effect was {pushed}"))]
  LoopConditionDepth { pushed: i64 },

  #[snafu(display("loop body must leave the stack as it found it"))]
  UnbalancedLoop,

  #[snafu(display("if and else branches must leave the same stack behind"))]
  BranchMismatch,

  #[snafu(display("index {index} is out of bounds for \"{name}\" ({count} elements)"))]
  IndexOutOfBounds { name: String, index: u64, count: u64 },

  #[snafu(display("call to \"{name}\" passes {arity} arguments, the calling convention allows 6"))]
  ArgumentLimit { name: String, arity: usize },

  #[snafu(display("string character {ch:?} does not fit a single byte"))]
  UnencodableString { ch: char },
}

/// Any pipeline failure, as returned by `generate_assembly`.
#[derive(Debug, Snafu)]
pub enum Error {
  #[snafu(transparent)]
  Lex { source: LexerError },

  #[snafu(transparent)]
  Parse { source: ParserError },

  #[snafu(transparent)]
  Compile { source: CompileError },
}
