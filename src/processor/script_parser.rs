//! Recursive-descent parser that consumes the lexer and builds a `ParsedCall`
//! for every command line.
//
//      command ::= IDENT '(' [ expr { ',' expr } ] ')' [ ';' ] EOF
//      expr    ::= STRING | NUMBER | IDENT [ '(' [ expr { ',' expr } ] ')' ]

use super::ast::{Command, Expr, ParsedCall};
use super::lexer::{Lexer, Token};
use crate::error::PipelineError;

/// Parse every command of the script. The first malformed line aborts the
/// whole script.
pub fn parse_commands(commands: &[Command]) -> Result<Vec<ParsedCall>, PipelineError> {
    commands.iter().map(parse_command).collect()
}

pub fn parse_command(command: &Command) -> Result<ParsedCall, PipelineError> {
    let mut p = Parser::new(&command.text);
    let (name, args) = p.parse().map_err(|reason| PipelineError::InvalidSyntax {
        line: command.line,
        text: command.text.clone(),
        reason,
    })?;

    Ok(ParsedCall {
        name,
        args,
        line: command.line,
        source: command.text.clone(),
    })
}

struct Parser<'a> {
    lex: std::iter::Peekable<Lexer<'a>>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            lex: Lexer::new(src).peekable(),
        }
    }

    fn next_token(&mut self) -> Result<Token, String> {
        match self.lex.next() {
            Some(token) => token,
            None => Err("unexpected end of line".to_string()),
        }
    }

    fn peek_is(&mut self, expected: &Token) -> bool {
        matches!(self.lex.peek(), Some(Ok(t)) if t == expected)
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), String> {
        let token = self.next_token()?;
        if token == expected {
            Ok(())
        } else {
            Err(format!("expected {what}, found {}", describe(&token)))
        }
    }

    fn parse(&mut self) -> Result<(String, Vec<Expr>), String> {
        let name = match self.next_token()? {
            Token::Ident(ident) => ident,
            other => {
                return Err(format!(
                    "expected an operation name, found {}",
                    describe(&other)
                ));
            }
        };

        self.expect(Token::LParen, "'(' after operation name")?;
        let args = self.parse_args()?;

        if self.peek_is(&Token::Semicolon) {
            self.next_token()?;
        }
        match self.next_token()? {
            Token::Eof => Ok((name, args)),
            other => Err(format!(
                "unexpected {} after closing ')'",
                describe(&other)
            )),
        }
    }

    /// Parses the argument list up to and including the closing `)`.
    fn parse_args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.peek_is(&Token::RParen) {
            self.next_token()?;
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr()?);
            match self.next_token()? {
                Token::Comma => continue,
                Token::RParen => return Ok(args),
                other => {
                    return Err(format!(
                        "expected ',' or ')' in argument list, found {}",
                        describe(&other)
                    ));
                }
            }
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        match self.next_token()? {
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Ident(name) => {
                if self.peek_is(&Token::LParen) {
                    self.next_token()?;
                    let args = self.parse_args()?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            other => Err(format!("expected an argument, found {}", describe(&other))),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(i) => format!("identifier {i}"),
        Token::Number(n) => format!("number {n}"),
        Token::Str(s) => format!("string {s:?}"),
        Token::LParen => "'('".into(),
        Token::RParen => "')'".into(),
        Token::Comma => "','".into(),
        Token::Semicolon => "';'".into(),
        Token::Eof => "end of line".into(),
    }
}
