//! Symbolic types tracked by the code generator.
//!
//! The language has no type annotations on values; every type is inferred
//! from the node that pushed the slot. `ValueType` describes one slot of the
//! compile-time stack model, `ElemType` describes what a variable was
//! declared to hold.

use std::fmt;

/// Type of one operand-stack slot. A string value occupies two slots
/// (length below, pointer on top), both tagged `InlineString`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
  Number,
  Char,
  InlineString,
}

impl ValueType {
  /// Numeric slots can be branched on and fed to arithmetic.
  pub fn is_numeric(self) -> bool {
    matches!(self, Self::Number | Self::Char)
  }
}

impl fmt::Display for ValueType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Number => "number",
      Self::Char => "char",
      Self::InlineString => "string",
    };
    f.write_str(name)
  }
}

/// Element type a variable is declared with. Fixed sizes, no alignment
/// padding: `int` elements are quadwords, `char` elements single bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemType {
  Number,
  Char,
}

impl ElemType {
  /// Resolve a surface type name from a declaration.
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "int" => Some(Self::Number),
      "char" => Some(Self::Char),
      _ => None,
    }
  }

  /// Size of one element in bytes.
  pub fn size(self) -> u64 {
    match self {
      Self::Number => 8,
      Self::Char => 1,
    }
  }

  /// Stack-slot type a load of one element produces.
  pub fn value_type(self) -> ValueType {
    match self {
      Self::Number => ValueType::Number,
      Self::Char => ValueType::Char,
    }
  }
}
