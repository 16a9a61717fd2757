//! Expression tree for one command *before* it is checked against the catalog.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `"..."` with escapes decoded.
    Str(String),
    /// Numeric literal, kept exactly as written.
    Number(String),
    /// Bare identifier, including `true` / `false`.
    Ident(String),
    /// `name(args…)` nested inside an argument list.
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    /// The argument as a plain string token: quotes stripped, everything
    /// else as written.
    pub fn text(&self) -> String {
        match self {
            Expr::Str(s) | Expr::Number(s) | Expr::Ident(s) => s.clone(),
            Expr::Call { .. } => self.to_string(),
        }
    }

    /// Short description used in argument errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Str(_) => "string",
            Expr::Number(_) => "number",
            Expr::Ident(_) => "identifier",
            Expr::Call { .. } => "nested call",
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Str(s) => write!(f, "{s:?}"),
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Ident(i) => write!(f, "{i}"),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// One raw, non-blank line of the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// 1-based line number in the submitted script.
    pub line: usize,
    pub text: String,
}

/// `name(args…)` as written on one line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub line: usize,
    /// The command line verbatim, for error messages.
    pub source: String,
}

impl ParsedCall {
    pub fn arg_texts(&self) -> Vec<String> {
        self.args.iter().map(Expr::text).collect()
    }
}
