//! Code generation: lower the parsed program into NASM-flavoured x86-64
//! assembly.
//!
//! The emitter is a stack machine: runtime values live on the native call
//! stack, and every node compiles in one post-order pass over the tree. The
//! `Context` threads the compile-time model of that stack (one `ValueType`
//! per slot), the label counter, the string pool, and the symbol tables
//! through the walk, so emission and type checking happen in the same match
//! arm. `rax`/`rbx` are the scratch pair; `rbp` is saved on entry and reused
//! as the stack-pointer save around calls.

use crate::error::{CompileError, CompileResult};
use crate::lexer::decode_escapes;
use crate::parser::{AstNode, BinaryOp, Program, Symbols, VarInfo};
use crate::ty::{ElemType, ValueType};

/// Argument registers of the calling convention, in order.
const ARG_REGS: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];

/// One interned string literal, keyed by its raw source text.
struct PoolString {
  literal: String,
  label: String,
  bytes: Vec<u8>,
}

/// Mutable state threaded through one compilation.
struct Context {
  /// Compile-time model of the runtime stack; its length always equals the
  /// runtime depth at the point being compiled.
  types: Vec<ValueType>,
  next_label: u32,
  strings: Vec<PoolString>,
  symbols: Symbols,
  /// Externs declared in the source, in declaration order.
  user_externs: Vec<String>,
  /// Runtime symbols the emitted code calls, in first-use order.
  externs: Vec<String>,
}

impl Context {
  fn new(symbols: &Symbols) -> Self {
    Self {
      types: Vec::new(),
      next_label: 0,
      strings: Vec::new(),
      symbols: symbols.clone(),
      user_externs: Vec::new(),
      externs: Vec::new(),
    }
  }

  /// Allocate the next `L{n}` label. Labels are never reused within one
  /// compilation, whatever construct asked for them.
  fn new_label(&mut self) -> String {
    let label = format!("L{}", self.next_label);
    self.next_label += 1;
    label
  }

  /// Intern a string literal, returning its pool label. Identical literal
  /// text shares one entry.
  fn intern(&mut self, literal: &str, bytes: &[u8]) -> String {
    if let Some(entry) = self.strings.iter().find(|entry| entry.literal == literal) {
      return entry.label.clone();
    }
    let label = format!("S{}", self.strings.len());
    self.strings.push(PoolString {
      literal: literal.to_string(),
      label: label.clone(),
      bytes: bytes.to_vec(),
    });
    label
  }

  fn is_declared(&self, name: &str) -> bool {
    self.user_externs.iter().any(|n| n == name) || self.externs.iter().any(|n| n == name)
  }

  /// Record a source-level `extern` declaration.
  fn declare_extern(&mut self, name: &str) {
    if !self.is_declared(name) {
      self.user_externs.push(name.to_string());
    }
  }

  /// Record a runtime symbol the output must declare `extern`.
  fn declare(&mut self, name: &str) {
    if !self.is_declared(name) {
      self.externs.push(name.to_string());
    }
  }

  fn push(&mut self, ty: ValueType) {
    self.types.push(ty);
  }

  /// Pop one symbolic slot, or fail with a stack underflow for `op`.
  fn pop(&mut self, op: &str) -> CompileResult<ValueType> {
    self.types.pop().ok_or_else(|| CompileError::StackUnderflow {
      op: op.to_string(),
    })
  }

  /// Pop a slot that must hold a number or a char.
  fn pop_numeric(&mut self, op: &str) -> CompileResult<ValueType> {
    let ty = self.pop(op)?;
    if !ty.is_numeric() {
      return Err(CompileError::TypeMismatch {
        op: op.to_string(),
        expected: "a number",
        found: ty,
      });
    }
    Ok(ty)
  }

  fn depth(&self) -> usize {
    self.types.len()
  }

  fn variable(&self, name: &str) -> CompileResult<VarInfo> {
    self
      .symbols
      .variable(name)
      .cloned()
      .ok_or_else(|| CompileError::UndefinedVariable {
        name: name.to_string(),
      })
  }
}

/// Emit the full assembly text for a parsed program.
pub fn generate(program: &Program) -> CompileResult<String> {
  let mut ctx = Context::new(&program.symbols);
  let mut body = Vec::new();
  emit_body(&program.body, &mut ctx, &mut body)?;

  let mut lines: Vec<String> = Vec::new();
  lines.push("global sweet_main".to_string());
  for name in ctx.user_externs.iter().chain(&ctx.externs) {
    lines.push(format!("extern {name}"));
  }

  if !ctx.strings.is_empty() || !ctx.symbols.variables().is_empty() {
    lines.push("section .data".to_string());
    for entry in &ctx.strings {
      lines.push(format!("{}: {}", entry.label, format_db(&entry.bytes)));
    }
    for info in ctx.symbols.variables() {
      lines.push(format!("{}: dq 0", info.label));
    }
  }

  lines.push("section .text".to_string());
  lines.push("sweet_main:".to_string());
  lines.push("    push rbp".to_string());
  lines.extend(body);
  if ctx.depth() > 0 {
    lines.push(format!("    add rsp, {}", 8 * ctx.depth()));
  }
  lines.push("    pop rbp".to_string());
  lines.push("    ret".to_string());

  let mut asm = lines.join("\n");
  asm.push('\n');
  Ok(asm)
}

fn emit_body(nodes: &[AstNode], ctx: &mut Context, out: &mut Vec<String>) -> CompileResult<()> {
  for node in nodes {
    emit_node(node, ctx, out)?;
  }
  Ok(())
}

/// Lower one node, keeping the symbolic stack in step with the emitted code.
fn emit_node(node: &AstNode, ctx: &mut Context, out: &mut Vec<String>) -> CompileResult<()> {
  match node {
    AstNode::Num { value } => {
      emit_push_imm(*value, out);
      ctx.push(ValueType::Number);
    }
    AstNode::Str { value } => emit_string(value, ctx, out)?,
    AstNode::Binary { op, lhs, rhs } => {
      emit_node(lhs, ctx, out)?;
      emit_node(rhs, ctx, out)?;
      let symbol = op.symbol();
      ctx.pop_numeric(symbol)?; // right
      ctx.pop_numeric(symbol)?; // left
      out.push("    pop rbx".to_string());
      out.push("    pop rax".to_string());
      match op {
        BinaryOp::Add => out.push("    add rax, rbx".to_string()),
        BinaryOp::Sub => out.push("    sub rax, rbx".to_string()),
        BinaryOp::Mul => out.push("    imul rax, rbx".to_string()),
        BinaryOp::Div => {
          out.push("    cqo".to_string());
          out.push("    idiv rbx".to_string());
        }
      }
      out.push("    push rax".to_string());
      ctx.push(ValueType::Number);
    }
    AstNode::Compare { lhs, rhs } => {
      emit_node(lhs, ctx, out)?;
      emit_node(rhs, ctx, out)?;
      emit_compare(ctx, out)?;
    }
    AstNode::Dup => {
      let Some(top) = ctx.types.last().copied() else {
        return Err(CompileError::StackUnderflow {
          op: "dup".to_string(),
        });
      };
      out.push("    pop rax".to_string());
      out.push("    push rax".to_string());
      out.push("    push rax".to_string());
      ctx.push(top);
    }
    AstNode::Print => emit_print(ctx, out)?,
    AstNode::Input => {
      emit_call("stdin_getline", ctx, out);
      // length is not known until runtime; the pair still occupies the
      // usual two slots, with a zero in the length one
      out.push("    push 0".to_string());
      out.push("    push rax".to_string());
      ctx.push(ValueType::InlineString);
      ctx.push(ValueType::InlineString);
    }
    AstNode::Bang => emit_bang(ctx, out)?,
    AstNode::BangWrapper { inner } => {
      emit_node(inner, ctx, out)?;
      emit_bang(ctx, out)?;
    }
    AstNode::IfElse {
      condition,
      if_body,
      else_body,
    } => {
      emit_node(condition, ctx, out)?;
      ctx.pop_numeric("if")?;
      let else_label = ctx.new_label();
      let end_label = ctx.new_label();
      out.push("    pop rax".to_string());
      out.push("    cmp rax, 0".to_string());
      out.push(format!("    je {else_label}"));

      let entry = ctx.types.clone();
      emit_body(if_body, ctx, out)?;
      let then_types = std::mem::replace(&mut ctx.types, entry);

      out.push(format!("    jmp {end_label}"));
      out.push(format!("{else_label}:"));
      if let Some(nodes) = else_body {
        emit_body(nodes, ctx, out)?;
      }
      if ctx.types != then_types {
        return Err(CompileError::BranchMismatch);
      }
      out.push(format!("{end_label}:"));
    }
    AstNode::Loop { condition, body } => {
      let loop_label = ctx.new_label();
      let end_label = ctx.new_label();
      let entry = ctx.types.clone();

      out.push(format!("{loop_label}:"));
      emit_node(condition, ctx, out)?;
      let pushed = ctx.depth() as i64 - entry.len() as i64;
      if pushed != 1 {
        return Err(CompileError::LoopConditionDepth { pushed });
      }
      ctx.pop_numeric("loop")?;
      out.push("    pop rax".to_string());
      out.push("    cmp rax, 0".to_string());
      out.push(format!("    je {end_label}"));

      emit_body(body, ctx, out)?;
      if ctx.types != entry {
        return Err(CompileError::UnbalancedLoop);
      }
      out.push(format!("    jmp {loop_label}"));
      out.push(format!("{end_label}:"));
    }
    AstNode::Extern { name } => ctx.declare_extern(name),
    AstNode::Call { name, arg_count } => {
      if *arg_count > ARG_REGS.len() {
        return Err(CompileError::ArgumentLimit {
          name: name.clone(),
          arity: *arg_count,
        });
      }
      let op = format!("call {name}");
      for _ in 0..*arg_count {
        ctx.pop(&op)?;
      }
      // the top of the stack is the last argument
      for i in (0..*arg_count).rev() {
        out.push(format!("    pop {}", ARG_REGS[i]));
      }
      emit_call(name, ctx, out);
      out.push("    push rax".to_string());
      ctx.push(ValueType::Number);
    }
    AstNode::VarDef {
      name,
      count,
      elem,
      init,
    } => emit_var_def(name, *count, *elem, init.as_deref(), ctx, out)?,
    AstNode::LoadVar { name } => emit_load(name, ctx, out)?,
    AstNode::LoadVarIndexed { name, index } => emit_load_indexed(name, *index, ctx, out)?,
    AstNode::StoreVar { name } => emit_store(name, ctx, out)?,
    AstNode::Block { body } => emit_body(body, ctx, out)?,
  }
  Ok(())
}

/// Push an immediate, routing through `rax` when it exceeds the signed
/// 32-bit range `push` accepts directly.
fn emit_push_imm(value: u64, out: &mut Vec<String>) {
  if value <= i32::MAX as u64 {
    out.push(format!("    push {value}"));
  } else {
    out.push(format!("    mov rax, {value}"));
    out.push("    push rax".to_string());
  }
}

/// Push a string literal as its two-slot pair: length first, then the
/// pooled data pointer on top.
fn emit_string(literal: &str, ctx: &mut Context, out: &mut Vec<String>) -> CompileResult<()> {
  let bytes = decode_escapes(literal).map_err(|ch| CompileError::UnencodableString { ch })?;
  let len = bytes.len() as u64;
  let label = ctx.intern(literal, &bytes);
  emit_push_imm(len, out);
  out.push(format!("    lea rax, [{label}]"));
  out.push("    push rax".to_string());
  ctx.push(ValueType::InlineString);
  ctx.push(ValueType::InlineString);
  Ok(())
}

/// Call an external symbol with its arguments already in registers. The
/// operand stack may be misaligned, so `rbp` holds the true stack pointer
/// across the aligned call.
fn emit_call(name: &str, ctx: &mut Context, out: &mut Vec<String>) {
  ctx.declare(name);
  out.push("    mov rbp, rsp".to_string());
  out.push("    and rsp, -16".to_string());
  out.push(format!("    call {name}"));
  out.push("    mov rsp, rbp".to_string());
}

/// Lower `?`: two numerics go to `compare_int`, two string pairs to
/// `compare_str` (their length slots are discarded), anything else is a
/// type error. Both helpers return 1 for equal, 0 otherwise.
fn emit_compare(ctx: &mut Context, out: &mut Vec<String>) -> CompileResult<()> {
  let right = ctx.pop("?")?;
  if right.is_numeric() {
    let left = ctx.pop("?")?;
    if !left.is_numeric() {
      return Err(CompileError::TypeMismatch {
        op: "?".to_string(),
        expected: "a number",
        found: left,
      });
    }
    out.push("    pop rsi".to_string());
    out.push("    pop rdi".to_string());
    emit_call("compare_int", ctx, out);
  } else {
    for _ in 0..3 {
      let ty = ctx.pop("?")?;
      if ty != ValueType::InlineString {
        return Err(CompileError::TypeMismatch {
          op: "?".to_string(),
          expected: "a string",
          found: ty,
        });
      }
    }
    out.push("    pop rsi".to_string()); // right pointer
    out.push("    pop rbx".to_string()); // right length, unused
    out.push("    pop rdi".to_string()); // left pointer
    out.push("    pop rbx".to_string()); // left length, unused
    emit_call("compare_str", ctx, out);
  }
  out.push("    push rax".to_string());
  ctx.push(ValueType::Number);
  Ok(())
}

/// `print` inspects the symbolic stack: a two-slot string pair on top goes
/// to `print_str`, anything else prints the top slot as an integer.
fn emit_print(ctx: &mut Context, out: &mut Vec<String>) -> CompileResult<()> {
  let top = ctx.pop("print")?;
  if top == ValueType::InlineString && ctx.types.last() == Some(&ValueType::InlineString) {
    ctx.pop("print")?;
    out.push("    pop rdi".to_string()); // pointer
    out.push("    pop rsi".to_string()); // length
    emit_call("print_str", ctx, out);
  } else {
    out.push("    pop rdi".to_string());
    emit_call("print_int", ctx, out);
  }
  Ok(())
}

/// Boolean negation: 1 if the operand was zero, 0 otherwise. Plain numbers
/// only.
fn emit_bang(ctx: &mut Context, out: &mut Vec<String>) -> CompileResult<()> {
  let ty = ctx.pop("!")?;
  if ty != ValueType::Number {
    return Err(CompileError::TypeMismatch {
      op: "!".to_string(),
      expected: "a number",
      found: ty,
    });
  }
  out.push("    pop rax".to_string());
  out.push("    cmp rax, 0".to_string());
  out.push("    sete al".to_string());
  out.push("    movzx rax, al".to_string());
  out.push("    push rax".to_string());
  ctx.push(ValueType::Number);
  Ok(())
}

/// `var`: one arena allocation, the pointer parked in the variable's data
/// cell, plus an optional initializer copy out of the string pool.
fn emit_var_def(
  name: &str,
  count: u64,
  elem: ElemType,
  init: Option<&str>,
  ctx: &mut Context,
  out: &mut Vec<String>,
) -> CompileResult<()> {
  if ctx.symbols.variable(name).is_none() {
    // parsed programs arrive pre-registered; hand-assembled trees register here
    ctx.symbols.register_variable(name, elem, count);
  }
  let info = ctx.variable(name)?;
  out.push(format!("    mov rdi, {}", info.total_size()));
  emit_call("new", ctx, out);
  out.push(format!("    mov [{}], rax", info.label));

  if let Some(text) = init {
    let bytes = decode_escapes(text).map_err(|ch| CompileError::UnencodableString { ch })?;
    let label = ctx.intern(text, &bytes);
    // include the pool's NUL terminator when the buffer has room for it
    let copy = (bytes.len() as u64 + 1).min(info.total_size());
    out.push(format!("    mov rdi, [{}]", info.label));
    out.push(format!("    lea rsi, [{label}]"));
    out.push(format!("    mov rdx, {copy}"));
    emit_call("memcpy", ctx, out);
  }
  Ok(())
}

/// A bare variable name: scalars load their element value; arrays push the
/// buffer address – as a (size, pointer) string pair for `char` buffers, as
/// a bare number otherwise.
fn emit_load(name: &str, ctx: &mut Context, out: &mut Vec<String>) -> CompileResult<()> {
  let info = ctx.variable(name)?;
  if info.count == 1 {
    out.push(format!("    mov rax, [{}]", info.label));
    match info.elem {
      ElemType::Char => out.push("    movzx rbx, byte [rax]".to_string()),
      ElemType::Number => out.push("    mov rbx, [rax]".to_string()),
    }
    out.push("    push rbx".to_string());
    ctx.push(info.elem.value_type());
  } else if info.elem == ElemType::Char {
    emit_push_imm(info.total_size(), out);
    out.push(format!("    mov rax, [{}]", info.label));
    out.push("    push rax".to_string());
    ctx.push(ValueType::InlineString);
    ctx.push(ValueType::InlineString);
  } else {
    out.push(format!("    mov rax, [{}]", info.label));
    out.push("    push rax".to_string());
    ctx.push(ValueType::Number);
  }
  Ok(())
}

/// `name [ INDEX ]`: load one element at a constant index, checked against
/// the declared element count.
fn emit_load_indexed(
  name: &str,
  index: u64,
  ctx: &mut Context,
  out: &mut Vec<String>,
) -> CompileResult<()> {
  let info = ctx.variable(name)?;
  if index >= info.count {
    return Err(CompileError::IndexOutOfBounds {
      name: name.to_string(),
      index,
      count: info.count,
    });
  }
  let offset = index.saturating_mul(info.elem.size());
  out.push(format!("    mov rax, [{}]", info.label));
  match info.elem {
    ElemType::Char => out.push(format!("    movzx rbx, byte [rax + {offset}]")),
    ElemType::Number => out.push(format!("    mov rbx, [rax + {offset}]")),
  }
  out.push("    push rbx".to_string());
  ctx.push(info.elem.value_type());
  Ok(())
}

/// `set name`: a string stored into a `char` destination copies bytes,
/// bounded by the declared size; everything else is a direct write through
/// the variable's pointer cell, at the destination's element width.
fn emit_store(name: &str, ctx: &mut Context, out: &mut Vec<String>) -> CompileResult<()> {
  let info = ctx.variable(name)?;
  let value = ctx.pop("set")?;
  match (info.elem, value) {
    (ElemType::Char, ValueType::InlineString) => {
      ctx.pop("set")?; // length slot
      out.push("    pop rsi".to_string()); // source pointer
      out.push("    pop rbx".to_string()); // length; the declared size bounds the copy instead
      out.push(format!("    mov rdi, [{}]", info.label));
      out.push(format!("    mov rdx, {}", info.total_size()));
      emit_call("memcpy", ctx, out);
    }
    (ElemType::Number, ValueType::InlineString) => {
      // store the data pointer itself; the length slot goes with it
      ctx.pop("set")?;
      out.push("    pop rbx".to_string());
      out.push("    pop rcx".to_string());
      out.push(format!("    mov rax, [{}]", info.label));
      out.push("    mov [rax], rbx".to_string());
    }
    _ => {
      out.push("    pop rbx".to_string());
      out.push(format!("    mov rax, [{}]", info.label));
      match info.elem {
        ElemType::Char => out.push("    mov [rax], bl".to_string()),
        ElemType::Number => out.push("    mov [rax], rbx".to_string()),
      }
    }
  }
  Ok(())
}

/// Render pool bytes as a NASM `db` line: printable runs quoted, everything
/// else decimal, always NUL-terminated.
fn format_db(bytes: &[u8]) -> String {
  let mut parts: Vec<String> = Vec::new();
  let mut run = String::new();
  for &b in bytes {
    if (0x20..0x7f).contains(&b) && b != b'"' {
      run.push(b as char);
    } else {
      if !run.is_empty() {
        parts.push(format!("\"{run}\""));
        run.clear();
      }
      parts.push(b.to_string());
    }
  }
  if !run.is_empty() {
    parts.push(format!("\"{run}\""));
  }
  parts.push("0".to_string());
  format!("db {}", parts.join(", "))
}
