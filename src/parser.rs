//! Postfix parsing: assembles the AST by merging an operand stack of nodes.
//!
//! The language is concatenative, so there is no precedence to climb – the
//! parser keeps a working stack of finished nodes, and each operator pops its
//! operands off that stack. Nested bodies recurse through `parse_block`,
//! which stops at its caller's terminator keywords without consuming them.
//! Extern and variable declarations register as they parse; later uses
//! resolve against what is already registered, and the finished tables travel
//! with the returned `Program` so code generation agrees with the parse on
//! every name.

use crate::error::{ParseResult, ParserError};
use crate::lexer::{Keyword, Token, TokenKind, decode_escapes};
use crate::ty::ElemType;

/// Binary arithmetic operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl BinaryOp {
  /// Source spelling, used in diagnostics.
  pub fn symbol(self) -> &'static str {
    match self {
      Self::Add => "+",
      Self::Sub => "-",
      Self::Mul => "*",
      Self::Div => "/",
    }
  }
}

/// Syntax tree produced by the parser. Each variant owns its children and is
/// inert data until code generation walks it.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
  Num {
    value: u64,
  },
  /// A string literal, still carrying its raw (undecoded) source text.
  Str {
    value: String,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
  /// Equality test `?`; pushes 1 or 0.
  Compare {
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
  Dup,
  Print,
  Input,
  /// `!` with nothing parsed before it; negates whatever the running
  /// program left on top of the stack.
  Bang,
  /// `!` applied to the node parsed directly before it.
  BangWrapper {
    inner: Box<AstNode>,
  },
  IfElse {
    condition: Box<AstNode>,
    if_body: Vec<AstNode>,
    else_body: Option<Vec<AstNode>>,
  },
  Loop {
    condition: Box<AstNode>,
    body: Vec<AstNode>,
  },
  Extern {
    name: String,
  },
  Call {
    name: String,
    arg_count: usize,
  },
  VarDef {
    name: String,
    count: u64,
    elem: ElemType,
    init: Option<String>,
  },
  LoadVar {
    name: String,
  },
  LoadVarIndexed {
    name: String,
    index: u64,
  },
  StoreVar {
    name: String,
  },
  /// Grouping node with no syntax of its own; compiles as its body in order.
  Block {
    body: Vec<AstNode>,
  },
}

impl AstNode {
  pub fn number(value: u64) -> Self {
    Self::Num { value }
  }

  pub fn string(value: impl Into<String>) -> Self {
    Self::Str {
      value: value.into(),
    }
  }

  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn compare(lhs: AstNode, rhs: AstNode) -> Self {
    Self::Compare {
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn bang(inner: AstNode) -> Self {
    Self::BangWrapper {
      inner: Box::new(inner),
    }
  }

  pub fn if_else(
    condition: AstNode,
    if_body: Vec<AstNode>,
    else_body: Option<Vec<AstNode>>,
  ) -> Self {
    Self::IfElse {
      condition: Box::new(condition),
      if_body,
      else_body,
    }
  }

  pub fn loop_while(condition: AstNode, body: Vec<AstNode>) -> Self {
    Self::Loop {
      condition: Box::new(condition),
      body,
    }
  }

  pub fn block(body: Vec<AstNode>) -> Self {
    Self::Block { body }
  }
}

/// Descriptor of one declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VarInfo {
  pub name: String,
  /// Data-section label of the pointer cell backing this variable.
  pub label: String,
  pub elem: ElemType,
  pub count: u64,
}

impl VarInfo {
  /// Bytes the heap allocation for this variable spans.
  pub fn total_size(&self) -> u64 {
    self.count.saturating_mul(self.elem.size())
  }
}

/// Descriptor of one declared extern.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternInfo {
  pub name: String,
  pub arity: usize,
}

/// Extern and variable registries, in declaration order. Externs and
/// variables share one namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Symbols {
  vars: Vec<VarInfo>,
  externs: Vec<ExternInfo>,
}

impl Symbols {
  pub fn variable(&self, name: &str) -> Option<&VarInfo> {
    self.vars.iter().find(|var| var.name == name)
  }

  pub fn extern_fn(&self, name: &str) -> Option<&ExternInfo> {
    self.externs.iter().find(|ext| ext.name == name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.variable(name).is_some() || self.extern_fn(name).is_some()
  }

  pub fn register_variable(&mut self, name: &str, elem: ElemType, count: u64) {
    let label = format!("V{}_{}", self.vars.len(), sanitize_label(name));
    self.vars.push(VarInfo {
      name: name.to_string(),
      label,
      elem,
      count,
    });
  }

  pub fn register_extern(&mut self, name: &str, arity: usize) {
    self.externs.push(ExternInfo {
      name: name.to_string(),
      arity,
    });
  }

  pub fn variables(&self) -> &[VarInfo] {
    &self.vars
  }

  pub fn externs(&self) -> &[ExternInfo] {
    &self.externs
  }
}

/// Map a surface identifier to the assembler's label alphabet. Identifiers
/// may contain `-`, which is not valid in a label.
fn sanitize_label(name: &str) -> String {
  name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
    .collect()
}

/// A parsed compilation unit: the top-level node sequence plus the symbol
/// tables the code generator inherits.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  pub body: Vec<AstNode>,
  pub symbols: Symbols,
}

/// Parse a token stream into a `Program`. An empty stream parses to an
/// empty program.
pub fn parse(tokens: Vec<Token>) -> ParseResult<Program> {
  let mut parser = Parser::new(tokens);
  let body = parser.parse_block(&[])?;
  Ok(Program {
    body,
    symbols: parser.symbols,
  })
}

/// Pop the right then the left operand for a two-operand merge.
fn pop_operands(
  stack: &mut Vec<AstNode>,
  op: &str,
  token: &Token,
) -> ParseResult<(AstNode, AstNode)> {
  let underflow = || ParserError::InsufficientOperands {
    op: op.to_string(),
    line: token.line,
    column: token.column,
  };
  let rhs = stack.pop().ok_or_else(underflow)?;
  let lhs = stack.pop().ok_or_else(underflow)?;
  Ok((lhs, rhs))
}

/// Lightweight cursor over the token vector, plus the growing symbol tables.
struct Parser {
  tokens: Vec<Token>,
  pos: usize,
  symbols: Symbols,
}

impl Parser {
  /// Take ownership of the token stream. The cursor assumes a trailing
  /// `Eof`; one is appended if the caller's stream lacks it.
  fn new(mut tokens: Vec<Token>) -> Self {
    if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
      let (line, column) = tokens.last().map(|t| (t.line, t.column)).unwrap_or((1, 1));
      tokens.push(Token::new(TokenKind::Eof, line, column));
    }
    Self {
      tokens,
      pos: 0,
      symbols: Symbols::default(),
    }
  }

  fn current(&self) -> &Token {
    &self.tokens[self.pos.min(self.tokens.len() - 1)]
  }

  fn advance(&mut self) {
    self.pos = (self.pos + 1).min(self.tokens.len() - 1);
  }

  fn at_keyword(&self, word: Keyword) -> bool {
    matches!(self.current().kind, TokenKind::Keyword(w) if w == word)
  }

  /// Parse nodes until end of input or one of the `stop` keywords. The stop
  /// keyword itself is left as the current token for the caller to consume.
  fn parse_block(&mut self, stop: &[Keyword]) -> ParseResult<Vec<AstNode>> {
    let mut stack: Vec<AstNode> = Vec::new();

    loop {
      let token = self.current().clone();
      match &token.kind {
        TokenKind::Eof => break,
        TokenKind::Keyword(word) if stop.contains(word) => break,
        TokenKind::Number(value) => {
          let value = *value;
          self.advance();
          stack.push(AstNode::number(value));
        }
        TokenKind::Str(value) => {
          let value = value.clone();
          self.advance();
          stack.push(AstNode::string(value));
        }
        TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
          let op = match token.kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            _ => BinaryOp::Div,
          };
          self.advance();
          let (lhs, rhs) = pop_operands(&mut stack, op.symbol(), &token)?;
          stack.push(AstNode::binary(op, lhs, rhs));
        }
        TokenKind::Question => {
          self.advance();
          let (lhs, rhs) = pop_operands(&mut stack, "?", &token)?;
          stack.push(AstNode::compare(lhs, rhs));
        }
        TokenKind::Bang => {
          self.advance();
          match stack.pop() {
            Some(inner) => stack.push(AstNode::bang(inner)),
            None => stack.push(AstNode::Bang),
          }
        }
        TokenKind::LBracket | TokenKind::RBracket => {
          return Err(ParserError::UnexpectedToken {
            expected: "an expression",
            found: token.kind.describe(),
            line: token.line,
            column: token.column,
          });
        }
        TokenKind::Keyword(word) => {
          let word = *word;
          self.keyword(word, &token, &mut stack)?;
        }
        TokenKind::Ident(name) => {
          let name = name.clone();
          self.advance();
          let node = self.identifier(name, &token)?;
          stack.push(node);
        }
      }
    }

    Ok(stack)
  }

  /// Handle one keyword-introduced construct. `token` is the keyword itself;
  /// the cursor still points at it on entry.
  fn keyword(&mut self, word: Keyword, token: &Token, stack: &mut Vec<AstNode>) -> ParseResult<()> {
    match word {
      Keyword::Dup => {
        self.advance();
        stack.push(AstNode::Dup);
      }
      Keyword::Print => {
        self.advance();
        stack.push(AstNode::Print);
      }
      Keyword::Input => {
        self.advance();
        stack.push(AstNode::Input);
      }
      Keyword::If => {
        self.advance();
        let condition = stack.pop().ok_or_else(|| ParserError::InsufficientOperands {
          op: "if".to_string(),
          line: token.line,
          column: token.column,
        })?;
        let if_body = self.parse_block(&[Keyword::Else, Keyword::End])?;
        let else_body = if self.at_keyword(Keyword::Else) {
          self.advance();
          Some(self.parse_block(&[Keyword::End])?)
        } else {
          None
        };
        self.expect_end("if")?;
        stack.push(AstNode::if_else(condition, if_body, else_body));
      }
      Keyword::Loop => {
        self.advance();
        let mut condition_nodes = self.parse_block(&[Keyword::Do])?;
        if !self.at_keyword(Keyword::Do) {
          let current = self.current();
          return Err(ParserError::ExpectedDo {
            found: current.kind.describe(),
            line: current.line,
            column: current.column,
          });
        }
        self.advance();
        let condition = match (condition_nodes.pop(), condition_nodes.is_empty()) {
          (Some(node), true) => node,
          (popped, _) => {
            let count = condition_nodes.len() + usize::from(popped.is_some());
            return Err(ParserError::LoopCondition {
              count,
              line: token.line,
              column: token.column,
            });
          }
        };
        let body = self.parse_block(&[Keyword::End])?;
        self.expect_end("loop")?;
        stack.push(AstNode::loop_while(condition, body));
      }
      Keyword::Extern => {
        self.advance();
        let (name, name_token) = self.expect_ident()?;
        if self.symbols.contains(&name) {
          return Err(ParserError::DuplicateName {
            name,
            line: name_token.line,
            column: name_token.column,
          });
        }
        let (arity, arity_token) = self.expect_number()?;
        if arity > 6 {
          return Err(ParserError::TooManyArguments {
            name,
            arity,
            line: arity_token.line,
            column: arity_token.column,
          });
        }
        self.symbols.register_extern(&name, arity as usize);
        stack.push(AstNode::Extern { name });
      }
      Keyword::Var => self.var_decl(stack)?,
      Keyword::Set => {
        self.advance();
        let (name, name_token) = self.expect_ident()?;
        if self.symbols.variable(&name).is_none() {
          return Err(ParserError::UnknownVariable {
            name,
            line: name_token.line,
            column: name_token.column,
          });
        }
        stack.push(AstNode::StoreVar { name });
      }
      // `else`, `end` and `do` only close constructs; reaching one here means
      // it is not in the caller's stop set.
      Keyword::Else | Keyword::End | Keyword::Do => {
        return Err(ParserError::UnsupportedKeyword {
          word: word.as_str().to_string(),
          line: token.line,
          column: token.column,
        });
      }
    }
    Ok(())
  }

  /// `var NAME TYPE` with an optional `[ COUNT ]` suffix and, for arrays, an
  /// optional inline string initializer.
  fn var_decl(&mut self, stack: &mut Vec<AstNode>) -> ParseResult<()> {
    self.advance();
    let (name, name_token) = self.expect_ident()?;
    if self.symbols.contains(&name) {
      return Err(ParserError::DuplicateName {
        name,
        line: name_token.line,
        column: name_token.column,
      });
    }

    let (type_name, type_token) = self.expect_ident()?;
    let Some(elem) = ElemType::from_name(&type_name) else {
      return Err(ParserError::UnknownType {
        name: type_name,
        line: type_token.line,
        column: type_token.column,
      });
    };

    let mut count = 1u64;
    let mut is_array = false;
    if matches!(self.current().kind, TokenKind::LBracket) {
      self.advance();
      let (n, _) = self.expect_number()?;
      self.expect_rbracket()?;
      count = n;
      is_array = true;
    }

    let init = {
      let token = self.current().clone();
      if let TokenKind::Str(text) = token.kind {
        self.advance();
        if !is_array {
          return Err(ParserError::InitializerOnScalar {
            name,
            line: token.line,
            column: token.column,
          });
        }
        let bytes = decode_escapes(&text).map_err(|ch| ParserError::UnencodableInitializer {
          ch,
          line: token.line,
          column: token.column,
        })?;
        let capacity = count.saturating_mul(elem.size());
        if bytes.len() as u64 > capacity {
          return Err(ParserError::InitializerTooLong {
            len: bytes.len(),
            capacity,
            line: token.line,
            column: token.column,
          });
        }
        Some(text)
      } else {
        None
      }
    };

    self.symbols.register_variable(&name, elem, count);
    stack.push(AstNode::VarDef {
      name,
      count,
      elem,
      init,
    });
    Ok(())
  }

  /// Resolve a bare identifier against the symbol tables. The cursor has
  /// already passed the identifier, so an index suffix is available here.
  fn identifier(&mut self, name: String, token: &Token) -> ParseResult<AstNode> {
    if let Some(info) = self.symbols.extern_fn(&name) {
      let arg_count = info.arity;
      return Ok(AstNode::Call { name, arg_count });
    }

    if self.symbols.variable(&name).is_some() {
      if matches!(self.current().kind, TokenKind::LBracket) {
        self.advance();
        let (index, _) = self.expect_number()?;
        self.expect_rbracket()?;
        return Ok(AstNode::LoadVarIndexed { name, index });
      }
      return Ok(AstNode::LoadVar { name });
    }

    Err(ParserError::UnknownIdentifier {
      name,
      line: token.line,
      column: token.column,
    })
  }

  /// Consume an identifier token, returning its text together with the
  /// token for position reporting.
  fn expect_ident(&mut self) -> ParseResult<(String, Token)> {
    let token = self.current().clone();
    if let TokenKind::Ident(name) = &token.kind {
      let name = name.clone();
      self.advance();
      return Ok((name, token));
    }
    Err(ParserError::UnexpectedToken {
      expected: "an identifier",
      found: token.kind.describe(),
      line: token.line,
      column: token.column,
    })
  }

  /// Consume a number token.
  fn expect_number(&mut self) -> ParseResult<(u64, Token)> {
    let token = self.current().clone();
    if let TokenKind::Number(value) = token.kind {
      self.advance();
      return Ok((value, token));
    }
    Err(ParserError::UnexpectedToken {
      expected: "a number",
      found: token.kind.describe(),
      line: token.line,
      column: token.column,
    })
  }

  fn expect_rbracket(&mut self) -> ParseResult<()> {
    if matches!(self.current().kind, TokenKind::RBracket) {
      self.advance();
      return Ok(());
    }
    let current = self.current();
    Err(ParserError::UnexpectedToken {
      expected: "\"]\"",
      found: current.kind.describe(),
      line: current.line,
      column: current.column,
    })
  }

  fn expect_end(&mut self, construct: &'static str) -> ParseResult<()> {
    if self.at_keyword(Keyword::End) {
      self.advance();
      return Ok(());
    }
    let current = self.current();
    Err(ParserError::ExpectedEnd {
      construct,
      found: current.kind.describe(),
      line: current.line,
      column: current.column,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lexer::tokenize;

  fn parse_source(source: &str) -> ParseResult<Program> {
    parse(tokenize(source).expect("lexes"))
  }

  fn body(source: &str) -> Vec<AstNode> {
    parse_source(source).expect("parses").body
  }

  #[test]
  fn empty_programs_parse() {
    assert_eq!(body(""), Vec::new());
    assert_eq!(body("// nothing but a comment"), Vec::new());
  }

  #[test]
  fn merges_binary_operators_postfix() {
    assert_eq!(
      body("3 4 +"),
      vec![AstNode::binary(BinaryOp::Add, AstNode::number(3), AstNode::number(4))]
    );
  }

  #[test]
  fn left_operand_is_second_from_top() {
    assert_eq!(
      body("10 2 -"),
      vec![AstNode::binary(BinaryOp::Sub, AstNode::number(10), AstNode::number(2))]
    );
  }

  #[test]
  fn chains_fold_into_nested_nodes() {
    // 1 2 + 3 *  is  (1 + 2) * 3
    let expected = AstNode::binary(
      BinaryOp::Mul,
      AstNode::binary(BinaryOp::Add, AstNode::number(1), AstNode::number(2)),
      AstNode::number(3),
    );
    assert_eq!(body("1 2 + 3 *"), vec![expected]);
  }

  #[test]
  fn question_builds_compare() {
    assert_eq!(
      body("3 4 ?"),
      vec![AstNode::compare(AstNode::number(3), AstNode::number(4))]
    );
  }

  #[test]
  fn operators_need_two_operands() {
    assert!(matches!(
      parse_source("+"),
      Err(ParserError::InsufficientOperands { .. })
    ));
    assert!(matches!(
      parse_source("3 +"),
      Err(ParserError::InsufficientOperands { .. })
    ));
  }

  #[test]
  fn markers_stay_flat() {
    assert_eq!(body("dup print input"), vec![AstNode::Dup, AstNode::Print, AstNode::Input]);
  }

  #[test]
  fn bang_wraps_the_node_before_it() {
    assert_eq!(body("5 !"), vec![AstNode::bang(AstNode::number(5))]);
    assert_eq!(body("!"), vec![AstNode::Bang]);
  }

  #[test]
  fn if_else_consumes_condition_and_bodies() {
    let expected = AstNode::if_else(
      AstNode::number(1),
      vec![AstNode::number(2)],
      Some(vec![AstNode::number(3)]),
    );
    assert_eq!(body("1 if 2 else 3 end"), vec![expected]);
  }

  #[test]
  fn else_branch_is_optional() {
    assert_eq!(
      body("1 if print end"),
      vec![AstNode::if_else(AstNode::number(1), vec![AstNode::Print], None)]
    );
  }

  #[test]
  fn if_needs_a_condition_on_the_stack() {
    assert!(matches!(
      parse_source("if 1 end"),
      Err(ParserError::InsufficientOperands { .. })
    ));
  }

  #[test]
  fn unterminated_if_is_rejected() {
    assert!(matches!(parse_source("1 if 2"), Err(ParserError::ExpectedEnd { .. })));
  }

  #[test]
  fn stop_keywords_are_left_for_the_caller() {
    // the inner if's end must not close the outer if
    let nodes = body("1 if 2 if 3 end else 4 end");
    assert_eq!(nodes.len(), 1);
    let AstNode::IfElse { if_body, else_body, .. } = &nodes[0] else {
      panic!("expected IfElse, got {:?}", nodes[0]);
    };
    assert!(matches!(if_body[..], [AstNode::IfElse { .. }]));
    assert_eq!(else_body.as_deref(), Some(&[AstNode::number(4)][..]));
  }

  #[test]
  fn loop_parses_condition_and_body() {
    assert_eq!(
      body("loop 1 do print end"),
      vec![AstNode::loop_while(AstNode::number(1), vec![AstNode::Print])]
    );
  }

  #[test]
  fn loop_condition_must_be_a_single_node() {
    assert!(matches!(
      parse_source("loop do end"),
      Err(ParserError::LoopCondition { count: 0, .. })
    ));
    assert!(matches!(
      parse_source("loop 1 2 do end"),
      Err(ParserError::LoopCondition { count: 2, .. })
    ));
  }

  #[test]
  fn loop_needs_do_and_end() {
    assert!(matches!(parse_source("loop 1 print"), Err(ParserError::ExpectedDo { .. })));
    assert!(matches!(
      parse_source("loop 1 do print"),
      Err(ParserError::ExpectedEnd { .. })
    ));
  }

  #[test]
  fn extern_registers_name_and_arity() {
    let program = parse_source("extern add2 2 1 2 add2").expect("parses");
    assert_eq!(
      program.body[3],
      AstNode::Call {
        name: "add2".into(),
        arg_count: 2
      }
    );
    assert_eq!(program.symbols.extern_fn("add2").map(|e| e.arity), Some(2));
  }

  #[test]
  fn identifiers_must_be_declared_before_use() {
    assert!(matches!(
      parse_source("frobnicate"),
      Err(ParserError::UnknownIdentifier { .. })
    ));
  }

  #[test]
  fn extern_arity_is_capped_at_six() {
    assert!(matches!(
      parse_source("extern wide 7"),
      Err(ParserError::TooManyArguments { .. })
    ));
  }

  #[test]
  fn var_scalar_and_array_forms() {
    let program = parse_source("var n int var buf char[16]").expect("parses");
    assert_eq!(
      program.body[0],
      AstNode::VarDef {
        name: "n".into(),
        count: 1,
        elem: ElemType::Number,
        init: None
      }
    );
    assert_eq!(
      program.body[1],
      AstNode::VarDef {
        name: "buf".into(),
        count: 16,
        elem: ElemType::Char,
        init: None
      }
    );
    let info = program.symbols.variable("buf").expect("registered");
    assert_eq!(info.total_size(), 16);
    assert_eq!(program.symbols.variable("n").map(|v| v.total_size()), Some(8));
  }

  #[test]
  fn var_accepts_an_inline_initializer() {
    let program = parse_source("var msg char[8] \"hi\"").expect("parses");
    assert_eq!(
      program.body[0],
      AstNode::VarDef {
        name: "msg".into(),
        count: 8,
        elem: ElemType::Char,
        init: Some("hi".into())
      }
    );
  }

  #[test]
  fn initializers_need_an_array_declaration() {
    assert!(matches!(
      parse_source("var c char \"x\""),
      Err(ParserError::InitializerOnScalar { .. })
    ));
  }

  #[test]
  fn initializers_must_fit_the_declared_capacity() {
    assert!(matches!(
      parse_source("var b char[2] \"hello\""),
      Err(ParserError::InitializerTooLong {
        len: 5,
        capacity: 2,
        ..
      })
    ));
  }

  #[test]
  fn initializers_reject_characters_wider_than_a_byte() {
    assert!(matches!(
      parse_source("var b char[8] \"€\""),
      Err(ParserError::UnencodableInitializer { ch: '€', .. })
    ));
  }

  #[test]
  fn declarations_reject_duplicate_names() {
    assert!(matches!(
      parse_source("var x int var x int"),
      Err(ParserError::DuplicateName { .. })
    ));
    assert!(matches!(
      parse_source("extern f 1 var f int"),
      Err(ParserError::DuplicateName { .. })
    ));
  }

  #[test]
  fn unknown_types_are_rejected() {
    assert!(matches!(parse_source("var x float"), Err(ParserError::UnknownType { .. })));
  }

  #[test]
  fn set_requires_a_declared_variable() {
    assert_eq!(body("var x int 4 set x")[2], AstNode::StoreVar { name: "x".into() });
    assert!(matches!(
      parse_source("4 set y"),
      Err(ParserError::UnknownVariable { .. })
    ));
  }

  #[test]
  fn variable_loads_plain_and_indexed() {
    let nodes = body("var buf char[4] buf buf[2]");
    assert_eq!(nodes[1], AstNode::LoadVar { name: "buf".into() });
    assert_eq!(
      nodes[2],
      AstNode::LoadVarIndexed {
        name: "buf".into(),
        index: 2
      }
    );
  }

  #[test]
  fn stray_keywords_and_brackets_are_rejected() {
    assert!(matches!(
      parse_source("end"),
      Err(ParserError::UnsupportedKeyword { .. })
    ));
    assert!(matches!(
      parse_source("else"),
      Err(ParserError::UnsupportedKeyword { .. })
    ));
    assert!(matches!(parse_source("["), Err(ParserError::UnexpectedToken { .. })));
  }

  #[test]
  fn variable_labels_survive_dashed_names() {
    let program = parse_source("var my-buf char[2]").expect("parses");
    assert_eq!(
      program.symbols.variable("my-buf").map(|v| v.label.as_str()),
      Some("V0_my_buf")
    );
  }
}
