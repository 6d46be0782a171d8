//! End-to-end tests driving the public `generate_assembly` entry point.

use sweetc::parser::{AstNode, BinaryOp, parse};
use sweetc::{CompileError, Error, LexerError, ParserError, generate_assembly, lexer};

#[test]
fn a_full_program_compiles_to_one_translation_unit() {
  let source = r#"
    // greet, then count down from 5
    extern exit 1
    var msg char[16] "hello\n"
    var n int
    5 set n
    msg print
    loop n 0 ? ! do
      n print
      n 1 - set n
    end
    0 if "unreachable" print else "done\n" print end
    0 exit
  "#;

  let asm = generate_assembly(source).expect("program compiles");

  assert!(asm.starts_with("global sweet_main\n"));
  for name in ["exit", "new", "memcpy", "print_str", "print_int", "compare_int"] {
    assert!(asm.contains(&format!("extern {name}\n")), "missing extern {name}");
  }
  assert!(asm.contains("section .data"));
  assert!(asm.contains("S0: db \"hello\", 10, 0"));
  assert!(asm.contains("V0_msg: dq 0"));
  assert!(asm.contains("V1_n: dq 0"));
  assert!(asm.contains("section .text"));
  assert!(asm.contains("sweet_main:"));
  assert!(asm.ends_with("    ret\n"));
}

#[test]
fn each_stage_reports_through_its_own_error_kind() {
  assert!(matches!(
    generate_assembly("\"oops"),
    Err(Error::Lex {
      source: LexerError::UnterminatedString { .. }
    })
  ));
  assert!(matches!(
    generate_assembly("+"),
    Err(Error::Parse {
      source: ParserError::InsufficientOperands { .. }
    })
  ));
  assert!(matches!(
    generate_assembly("dup"),
    Err(Error::Compile {
      source: CompileError::StackUnderflow { .. }
    })
  ));
}

#[test]
fn diagnostics_carry_positions_where_tokens_exist() {
  let err = generate_assembly("  \"x").expect_err("must fail");
  assert_eq!(err.to_string(), "line 1:3: unterminated string literal");

  let err = generate_assembly("3 +").expect_err("must fail");
  assert_eq!(err.to_string(), "line 1:3: not enough operands for \"+\"");

  let err = generate_assembly("dup").expect_err("must fail");
  assert_eq!(
    err.to_string(),
    "stack underflow: \"dup\" needs more operands than the stack holds"
  );
}

/// Constant-fold a pure arithmetic tree the way the emitted code would
/// evaluate it.
fn eval(node: &AstNode) -> i64 {
  match node {
    AstNode::Num { value } => *value as i64,
    AstNode::Binary { op, lhs, rhs } => {
      let lhs = eval(lhs);
      let rhs = eval(rhs);
      match op {
        BinaryOp::Add => lhs + rhs,
        BinaryOp::Sub => lhs - rhs,
        BinaryOp::Mul => lhs * rhs,
        BinaryOp::Div => lhs / rhs,
      }
    }
    AstNode::Compare { lhs, rhs } => i64::from(eval(lhs) == eval(rhs)),
    AstNode::BangWrapper { inner } => i64::from(eval(inner) == 0),
    other => panic!("not a constant expression: {other:?}"),
  }
}

#[test]
fn parsed_arithmetic_agrees_with_direct_evaluation() {
  let cases = [
    ("3 4 +", 7),
    ("10 2 - 3 *", 24),
    ("9 3 /", 3),
    ("5 5 ?", 1),
    ("5 4 ?", 0),
    ("0 !", 1),
    ("7 !", 0),
  ];
  for (source, expected) in cases {
    let program = parse(lexer::tokenize(source).expect("lexes")).expect("parses");
    assert_eq!(program.body.len(), 1, "{source}");
    assert_eq!(eval(&program.body[0]), expected, "{source}");
    // and the same expression must survive the full pipeline
    assert!(generate_assembly(source).is_ok(), "{source}");
  }
}

#[test]
fn empty_input_still_produces_a_well_formed_unit() {
  let asm = generate_assembly("").expect("empty program compiles");
  assert!(asm.starts_with("global sweet_main\n"));
  assert!(!asm.contains("section .data"));
  assert!(asm.ends_with("    ret\n"));
}
