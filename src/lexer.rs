//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The lexer is intentionally tiny – it knows the operator set, the reserved
//! keywords, and the two comment forms, and nothing about what the parser
//! will build. Positions are 1-based line/column pairs counted in
//! characters. String literals keep their contents raw; escape decoding is
//! deferred to `decode_escapes` so the parser and the code generator agree
//! on one decoder.

use crate::error::{LexResult, LexerError};

/// Reserved words of the surface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
  If,
  Else,
  End,
  Dup,
  Print,
  Input,
  Extern,
  Var,
  Set,
  Loop,
  Do,
}

impl Keyword {
  fn from_ident(text: &str) -> Option<Self> {
    Some(match text {
      "if" => Self::If,
      "else" => Self::Else,
      "end" => Self::End,
      "dup" => Self::Dup,
      "print" => Self::Print,
      "input" => Self::Input,
      "extern" => Self::Extern,
      "var" => Self::Var,
      "set" => Self::Set,
      "loop" => Self::Loop,
      "do" => Self::Do,
      _ => return None,
    })
  }

  /// Source spelling, used in diagnostics.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::If => "if",
      Self::Else => "else",
      Self::End => "end",
      Self::Dup => "dup",
      Self::Print => "print",
      Self::Input => "input",
      Self::Extern => "extern",
      Self::Var => "var",
      Self::Set => "set",
      Self::Loop => "loop",
      Self::Do => "do",
    }
  }
}

/// Kinds of tokens recognised by the front-end, carrying their payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
  Number(u64),
  Str(String),
  Ident(String),
  Keyword(Keyword),
  Plus,
  Minus,
  Star,
  Slash,
  Question,
  Bang,
  LBracket,
  RBracket,
  Eof,
}

impl TokenKind {
  /// Human-friendly description used in diagnostics.
  pub fn describe(&self) -> String {
    match self {
      Self::Number(value) => format!("number {value}"),
      Self::Str(_) => "string literal".to_string(),
      Self::Ident(name) => format!("identifier \"{name}\""),
      Self::Keyword(word) => format!("keyword \"{}\"", word.as_str()),
      Self::Plus => "\"+\"".to_string(),
      Self::Minus => "\"-\"".to_string(),
      Self::Star => "\"*\"".to_string(),
      Self::Slash => "\"/\"".to_string(),
      Self::Question => "\"?\"".to_string(),
      Self::Bang => "\"!\"".to_string(),
      Self::LBracket => "\"[\"".to_string(),
      Self::RBracket => "\"]\"".to_string(),
      Self::Eof => "end of input".to_string(),
    }
  }
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub line: u32,
  pub column: u32,
}

impl Token {
  /// Convenience constructor to keep the lexer loop readable.
  pub fn new(kind: TokenKind, line: u32, column: u32) -> Self {
    Self { kind, line, column }
  }
}

/// Cursor over the decoded source characters.
pub struct Lexer {
  chars: Vec<char>,
  pos: usize,
  line: u32,
  column: u32,
}

impl Lexer {
  pub fn new(source: &str) -> Self {
    Self {
      chars: source.chars().collect(),
      pos: 0,
      line: 1,
      column: 1,
    }
  }

  fn peek(&self) -> Option<char> {
    self.chars.get(self.pos).copied()
  }

  fn peek_next(&self) -> Option<char> {
    self.chars.get(self.pos + 1).copied()
  }

  /// Step one character forward, keeping the line/column counters honest.
  fn advance(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += 1;
    if c == '\n' {
      self.line += 1;
      self.column = 1;
    } else {
      self.column += 1;
    }
    Some(c)
  }

  /// Skip whitespace and both comment forms. A block comment left open at
  /// end of input is an error, reported at the comment's opening `/*`.
  fn skip_trivia(&mut self) -> LexResult<()> {
    loop {
      match self.peek() {
        Some(c) if c.is_whitespace() => {
          self.advance();
        }
        Some('/') if self.peek_next() == Some('/') => {
          while let Some(c) = self.peek() {
            if c == '\n' {
              break;
            }
            self.advance();
          }
        }
        Some('/') if self.peek_next() == Some('*') => {
          let (line, column) = (self.line, self.column);
          self.advance();
          self.advance();
          loop {
            match self.peek() {
              Some('*') if self.peek_next() == Some('/') => {
                self.advance();
                self.advance();
                break;
              }
              Some(_) => {
                self.advance();
              }
              None => return Err(LexerError::UnterminatedComment { line, column }),
            }
          }
        }
        _ => return Ok(()),
      }
    }
  }

  /// Produce the next token. Once the input is exhausted every further call
  /// yields `Eof` again.
  pub fn next_token(&mut self) -> LexResult<Token> {
    self.skip_trivia()?;
    let (line, column) = (self.line, self.column);

    let Some(c) = self.peek() else {
      return Ok(Token::new(TokenKind::Eof, line, column));
    };

    if c.is_ascii_digit() {
      let start = self.pos;
      while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
        self.advance();
      }
      let text: String = self.chars[start..self.pos].iter().collect();
      let value = text
        .parse::<u64>()
        .map_err(|source| LexerError::InvalidNumber { line, column, source })?;
      return Ok(Token::new(TokenKind::Number(value), line, column));
    }

    let operator = match c {
      '+' => Some(TokenKind::Plus),
      '-' => Some(TokenKind::Minus),
      '*' => Some(TokenKind::Star),
      '/' => Some(TokenKind::Slash),
      '?' => Some(TokenKind::Question),
      '!' => Some(TokenKind::Bang),
      '[' => Some(TokenKind::LBracket),
      ']' => Some(TokenKind::RBracket),
      _ => None,
    };
    if let Some(kind) = operator {
      self.advance();
      return Ok(Token::new(kind, line, column));
    }

    if c == '"' {
      return self.string_literal(line, column);
    }

    if c.is_alphabetic() {
      let start = self.pos;
      while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-') {
        self.advance();
      }
      let text: String = self.chars[start..self.pos].iter().collect();
      let kind = match Keyword::from_ident(&text) {
        Some(word) => TokenKind::Keyword(word),
        None => TokenKind::Ident(text),
      };
      return Ok(Token::new(kind, line, column));
    }

    Err(LexerError::UnknownCharacter { ch: c, line, column })
  }

  /// Scan a string literal. Contents are kept raw; a backslash carries the
  /// following character through verbatim so an escaped quote does not close
  /// the literal.
  fn string_literal(&mut self, line: u32, column: u32) -> LexResult<Token> {
    self.advance();
    let mut raw = String::new();
    loop {
      match self.peek() {
        Some('"') => {
          self.advance();
          return Ok(Token::new(TokenKind::Str(raw), line, column));
        }
        Some('\\') => {
          self.advance();
          raw.push('\\');
          if let Some(escaped) = self.advance() {
            raw.push(escaped);
          }
        }
        Some(_) => {
          if let Some(c) = self.advance() {
            raw.push(c);
          }
        }
        None => return Err(LexerError::UnterminatedString { line, column }),
      }
    }
  }

  /// Drive `next_token` to the end, collecting the whole stream.
  fn run(mut self) -> LexResult<Vec<Token>> {
    let mut tokens = Vec::new();
    loop {
      let token = self.next_token()?;
      let done = token.kind == TokenKind::Eof;
      tokens.push(token);
      if done {
        return Ok(tokens);
      }
    }
  }
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
  Lexer::new(source).run()
}

/// Decode the escape sequences of a raw string literal into bytes.
///
/// `\n`, `\t`, `\r` and `\0` decode to their control bytes; any other
/// escaped character decodes to itself, which covers `\"` and `\\`. Every
/// decoded character must fit a single byte; the first one that does not is
/// returned as the error.
pub fn decode_escapes(raw: &str) -> Result<Vec<u8>, char> {
  let mut bytes = Vec::with_capacity(raw.len());
  let mut chars = raw.chars();
  while let Some(c) = chars.next() {
    let decoded = if c == '\\' {
      match chars.next() {
        Some('n') => '\n',
        Some('t') => '\t',
        Some('r') => '\r',
        Some('0') => '\0',
        Some(other) => other,
        None => '\\',
      }
    } else {
      c
    };
    if decoded as u32 > 0xff {
      return Err(decoded);
    }
    bytes.push(decoded as u8);
  }
  Ok(bytes)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source)
      .expect("lexes")
      .into_iter()
      .map(|token| token.kind)
      .collect()
  }

  #[test]
  fn lexes_every_token_kind() {
    assert_eq!(kinds("42"), vec![TokenKind::Number(42), TokenKind::Eof]);
    assert_eq!(kinds("\"hi\""), vec![TokenKind::Str("hi".into()), TokenKind::Eof]);
    assert_eq!(kinds("total"), vec![TokenKind::Ident("total".into()), TokenKind::Eof]);
    assert_eq!(
      kinds("+ - * / ?"),
      vec![
        TokenKind::Plus,
        TokenKind::Minus,
        TokenKind::Star,
        TokenKind::Slash,
        TokenKind::Question,
        TokenKind::Eof,
      ]
    );
    assert_eq!(
      kinds("! [ ]"),
      vec![TokenKind::Bang, TokenKind::LBracket, TokenKind::RBracket, TokenKind::Eof]
    );
  }

  #[test]
  fn keywords_are_reserved() {
    let table = [
      ("if", Keyword::If),
      ("else", Keyword::Else),
      ("end", Keyword::End),
      ("dup", Keyword::Dup),
      ("print", Keyword::Print),
      ("input", Keyword::Input),
      ("extern", Keyword::Extern),
      ("var", Keyword::Var),
      ("set", Keyword::Set),
      ("loop", Keyword::Loop),
      ("do", Keyword::Do),
    ];
    for (text, word) in table {
      assert_eq!(kinds(text), vec![TokenKind::Keyword(word), TokenKind::Eof], "{text}");
      assert_eq!(word.as_str(), text);
    }
  }

  #[test]
  fn identifiers_continue_with_underscore_and_dash() {
    assert_eq!(kinds("my_var-2"), vec![TokenKind::Ident("my_var-2".into()), TokenKind::Eof]);
  }

  #[test]
  fn a_lone_dash_is_the_subtraction_operator() {
    assert_eq!(
      kinds("3 4 -"),
      vec![TokenKind::Number(3), TokenKind::Number(4), TokenKind::Minus, TokenKind::Eof]
    );
  }

  #[test]
  fn positions_are_one_based_lines_and_columns() {
    let tokens = tokenize("1 2\n  3").expect("lexes");
    let positions: Vec<(u32, u32)> = tokens.iter().map(|t| (t.line, t.column)).collect();
    assert_eq!(positions, vec![(1, 1), (1, 3), (2, 3), (2, 4)]);
  }

  #[test]
  fn comments_are_skipped() {
    assert_eq!(
      kinds("1 // trailing words\n2"),
      vec![TokenKind::Number(1), TokenKind::Number(2), TokenKind::Eof]
    );
    assert_eq!(
      kinds("1 /* spans\nlines */ 2"),
      vec![TokenKind::Number(1), TokenKind::Number(2), TokenKind::Eof]
    );
  }

  #[test]
  fn slash_is_division_unless_doubled() {
    assert_eq!(
      kinds("6 2 /"),
      vec![TokenKind::Number(6), TokenKind::Number(2), TokenKind::Slash, TokenKind::Eof]
    );
  }

  #[test]
  fn string_contents_stay_raw() {
    assert_eq!(
      kinds(r#""a\n\"b""#),
      vec![TokenKind::Str(r#"a\n\"b"#.into()), TokenKind::Eof]
    );
  }

  #[test]
  fn unterminated_string_reports_the_opening_quote() {
    let err = tokenize("  \"abc").expect_err("must fail");
    assert!(matches!(err, LexerError::UnterminatedString { line: 1, column: 3 }));
  }

  #[test]
  fn unterminated_block_comment_is_an_error() {
    let err = tokenize("1 /* oops").expect_err("must fail");
    assert!(matches!(err, LexerError::UnterminatedComment { line: 1, column: 3 }));
  }

  #[test]
  fn unknown_characters_are_rejected() {
    assert!(matches!(
      tokenize("@"),
      Err(LexerError::UnknownCharacter { ch: '@', .. })
    ));
    // identifiers must start alphabetic
    assert!(matches!(
      tokenize("_x"),
      Err(LexerError::UnknownCharacter { ch: '_', .. })
    ));
  }

  #[test]
  fn oversized_numbers_are_rejected() {
    assert!(matches!(
      tokenize("99999999999999999999999"),
      Err(LexerError::InvalidNumber { .. })
    ));
  }

  #[test]
  fn eof_repeats_once_input_is_exhausted() {
    let mut lexer = Lexer::new("1");
    assert_eq!(lexer.next_token().expect("token").kind, TokenKind::Number(1));
    assert_eq!(lexer.next_token().expect("token").kind, TokenKind::Eof);
    assert_eq!(lexer.next_token().expect("token").kind, TokenKind::Eof);
  }

  #[test]
  fn decode_escapes_handles_the_usual_set() {
    assert_eq!(decode_escapes(r"hi\n"), Ok(vec![b'h', b'i', b'\n']));
    assert_eq!(decode_escapes(r"\t\r\0\\"), Ok(vec![b'\t', b'\r', 0, b'\\']));
    assert_eq!(decode_escapes(r#"\""#), Ok(vec![b'"']));
    // unknown escapes decode to the escaped character itself
    assert_eq!(decode_escapes(r"\q"), Ok(vec![b'q']));
  }

  #[test]
  fn decode_escapes_accepts_latin_1_and_nothing_wider() {
    assert_eq!(decode_escapes("café"), Ok(vec![0x63, 0x61, 0x66, 0xe9]));
    assert_eq!(decode_escapes("€"), Err('€'));
  }
}
