//! Very small hand-written lexer for one command line.
//!
//! The lexer only breaks the line into `Token`s. Operation names such as
//! `load_csv` or `mean` come out as `Ident("load_csv")`; the catalog decides
//! later whether they exist.
//
//  Lexical items:
//
//      Ident    ::= [A-Za-z_][A-Za-z0-9_]*
//      Number   ::= [+-]? [0-9]+ ('.' [0-9]*)? ([eE] [+-]? [0-9]+)?
//                 | [+-]? '.' [0-9]+ ...
//      Str      ::= '"' ( [^"\\] | '\\' . )* '"'
//      Symbols  ::= '(' | ')' | ',' | ';'
//      Whitespace is discarded; '#' outside a string ends the line.

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Number(String), // verbatim source text
    Str(String),    // escapes already decoded
    LParen,
    RParen,
    Comma,
    Semicolon,
    Eof,
}

#[derive(Clone)]
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            finished: false,
        }
    }

    fn next_char(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                buf.push(c);
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self, first: char) -> String {
        let mut id = String::new();
        id.push(first);
        self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_', &mut id);
        id
    }

    fn read_number(&mut self, first: char) -> Result<String, String> {
        let mut num = String::new();
        num.push(first);

        if first == '+' || first == '-' {
            match self.peek_char() {
                Some(c) if c.is_ascii_digit() || c == '.' => {}
                _ => return Err(format!("expected digits after '{first}'")),
            }
        }

        self.consume_while(|c| c.is_ascii_digit() || c == '.', &mut num);

        if let Some(e @ ('e' | 'E')) = self.peek_char() {
            num.push(e);
            self.next_char();
            if let Some(sign @ ('+' | '-')) = self.peek_char() {
                num.push(sign);
                self.next_char();
            }
            let before = num.len();
            self.consume_while(|c| c.is_ascii_digit(), &mut num);
            if num.len() == before {
                return Err(format!("malformed exponent in number {num}"));
            }
        }

        if num.matches('.').count() > 1 || !num.chars().any(|c| c.is_ascii_digit()) {
            return Err(format!("malformed number {num}"));
        }
        if let Some(c) = self.peek_char() {
            if c.is_ascii_alphabetic() || c == '_' {
                return Err(format!("unexpected character {c} after number {num}"));
            }
        }
        Ok(num)
    }

    fn read_string(&mut self) -> Result<String, String> {
        let mut txt = String::new();
        while let Some(c) = self.next_char() {
            match c {
                '"' => return Ok(txt),
                '\\' => match self.next_char() {
                    Some('n') => txt.push('\n'),
                    Some('t') => txt.push('\t'),
                    Some('"') => txt.push('"'),
                    Some('\\') => txt.push('\\'),
                    Some(other) => {
                        txt.push('\\');
                        txt.push(other);
                    }
                    None => break,
                },
                c => txt.push(c),
            }
        }
        Err("unterminated string literal".into())
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }

        let ch = match self.next_char() {
            Some('#') | None => {
                self.finished = true;
                return Some(Ok(Token::Eof));
            }
            Some(c) => c,
        };

        let tok_res = match ch {
            '(' => Ok(Token::LParen),
            ')' => Ok(Token::RParen),
            ',' => Ok(Token::Comma),
            ';' => Ok(Token::Semicolon),
            '"' => self.read_string().map(Token::Str),
            c if c.is_ascii_digit() || matches!(c, '+' | '-' | '.') => {
                self.read_number(c).map(Token::Number)
            }
            c if c.is_ascii_alphabetic() || c == '_' => Ok(Token::Ident(self.read_identifier(c))),
            e => Err(format!("unexpected character {e}")),
        };

        if tok_res.is_err() {
            self.finished = true;
        }
        Some(tok_res)
    }
}
