//! Tokenizer for interpreter source text.

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Real(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    /// `<-`
    Arrow,
    /// `=` (assignment at statement level, named argument inside a call)
    Equal,
    Plus,
    Minus,
    Star,
    Slash,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Bang,
    Dollar,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    /// Newlines inside parentheses do not separate statements.
    paren_depth: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            paren_depth: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
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

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn token(&self, kind: TokenKind, line: usize, column: usize) -> Token {
        Token { kind, line, column }
    }

    fn next_token(&mut self) -> Result<Token> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('\n') if self.paren_depth > 0 => {
                    self.bump();
                }
                _ => break,
            }
        }

        let line = self.line;
        let column = self.column;
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(self.token(TokenKind::Eof, line, column)),
        };

        let kind = match c {
            '\n' => TokenKind::Newline,
            '(' => {
                self.paren_depth += 1;
                TokenKind::LParen
            }
            ')' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                TokenKind::RParen
            }
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '$' => TokenKind::Dollar,
            '<' => {
                if self.match_next('-') {
                    TokenKind::Arrow
                } else if self.match_next('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.match_next('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '=' => {
                if self.match_next('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Equal
                }
            }
            '!' => {
                if self.match_next('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '\'' | '"' => return self.string(c, line, column),
            '.' => {
                if self.peek().is_some_and(|next| next.is_ascii_digit()) {
                    return self.number(c, line, column);
                }
                return self.identifier(c, line, column);
            }
            c if c.is_ascii_digit() => return self.number(c, line, column),
            c if c.is_ascii_alphabetic() => return self.identifier(c, line, column),
            other => {
                return Err(EngineError::Syntax(format!(
                    "unexpected character '{}' at line {}",
                    other, line
                )))
            }
        };

        Ok(self.token(kind, line, column))
    }

    fn string(&mut self, quote: char, line: usize, column: usize) -> Result<Token> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(EngineError::Syntax(format!(
                        "unterminated string constant starting at line {}",
                        line
                    )))
                }
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escaped = self.bump().ok_or_else(|| {
                        EngineError::Syntax(format!(
                            "unterminated string constant starting at line {}",
                            line
                        ))
                    })?;
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        '\\' => text.push('\\'),
                        '\'' => text.push('\''),
                        '"' => text.push('"'),
                        other => {
                            return Err(EngineError::Syntax(format!(
                                "unrecognized escape '\\{}' at line {}",
                                other, self.line
                            )))
                        }
                    }
                }
                Some(c) => text.push(c),
            }
        }
        Ok(self.token(TokenKind::Str(text), line, column))
    }

    fn number(&mut self, first: char, line: usize, column: usize) -> Result<Token> {
        let mut text = String::from(first);
        let mut is_real = first == '.';

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else if c == '.' && !is_real {
                is_real = true;
                text.push(c);
                self.bump();
            } else if c == 'e' || c == 'E' {
                is_real = true;
                text.push(c);
                self.bump();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    text.push(sign);
                    self.bump();
                }
            } else {
                break;
            }
        }

        if !is_real {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(self.token(TokenKind::Int(i), line, column));
            }
        }
        match text.parse::<f64>() {
            Ok(r) => Ok(self.token(TokenKind::Real(r), line, column)),
            Err(_) => Err(EngineError::Syntax(format!(
                "malformed numeric constant '{}' at line {}",
                text, line
            ))),
        }
    }

    fn identifier(&mut self, first: char, line: usize, column: usize) -> Result<Token> {
        let mut text = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let kind = match text.as_str() {
            "TRUE" => TokenKind::True,
            "FALSE" => TokenKind::False,
            "NULL" => TokenKind::Null,
            _ => TokenKind::Ident(text),
        };
        Ok(self.token(kind, line, column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn numbers_split_int_and_real() {
        assert_eq!(
            kinds("42 4.2 1e3 .5"),
            vec![
                TokenKind::Int(42),
                TokenKind::Real(4.2),
                TokenKind::Real(1000.0),
                TokenKind::Real(0.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn arrow_and_comparisons() {
        assert_eq!(
            kinds("x <- 1 <= 2"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Arrow,
                TokenKind::Int(1),
                TokenKind::Le,
                TokenKind::Int(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn dotted_identifiers() {
        assert_eq!(
            kinds("set.seed .statlink_container"),
            vec![
                TokenKind::Ident("set.seed".into()),
                TokenKind::Ident(".statlink_container".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn both_quote_styles_and_escapes() {
        assert_eq!(
            kinds(r#"'a\nb' "c'd""#),
            vec![
                TokenKind::Str("a\nb".into()),
                TokenKind::Str("c'd".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            kinds("1 # ignored\n2"),
            vec![
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Int(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newlines_inside_parens_do_not_separate() {
        assert_eq!(
            kinds("c(1,\n2)"),
            vec![
                TokenKind::Ident("c".into()),
                TokenKind::LParen,
                TokenKind::Int(1),
                TokenKind::Comma,
                TokenKind::Int(2),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(Lexer::new("'abc").tokenize().is_err());
    }
}
