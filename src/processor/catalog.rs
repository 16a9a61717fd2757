//! The fixed operation catalog.
//!
//! Every supported operation is one variant of [`Operation`] holding its
//! already-checked arguments. The same table produces [`CATALOG`], which the
//! assembler turns into the C++ declarations of the helper library, so a
//! renderer and its declaration can never drift apart.

use std::fmt;

use super::ast::{Expr, ParsedCall};
use super::lexer::{Lexer, Token};
use crate::error::PipelineError;

/// Shape of one positional parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Always rendered as a quoted C++ string.
    Text,
    /// Any numeric literal, rendered verbatim.
    Number,
    /// Integral literal, rendered verbatim.
    Integer,
    /// Optional trailing boolean.
    Flag { default: bool },
    /// Variadic tail rendered as an initializer list.
    Values,
}

impl Slot {
    fn cpp_type(self) -> &'static str {
        match self {
            Slot::Text => "const string&",
            Slot::Number => "double",
            Slot::Integer => "int",
            Slot::Flag { .. } => "bool",
            Slot::Values => "const vector<string>&",
        }
    }
}

/// Argument-count contract of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
        match *self {
            Arity::Exact(0) => write!(f, "no arguments"),
            Arity::Exact(n) => write!(f, "exactly {n} {}", plural(n)),
            Arity::Range(min, max) if max == min + 1 => write!(f, "{min} or {max} arguments"),
            Arity::Range(min, max) => write!(f, "{min} to {max} arguments"),
            Arity::AtLeast(n) => write!(f, "at least {n} {}", plural(n)),
        }
    }
}

#[derive(Debug)]
pub struct Param {
    pub name: &'static str,
    pub slot: Slot,
}

/// One operation contract: name plus ordered parameters.
#[derive(Debug)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub params: &'static [Param],
}

impl CatalogEntry {
    pub fn arity(&self) -> Arity {
        let optional = self
            .params
            .iter()
            .filter(|p| matches!(p.slot, Slot::Flag { .. }))
            .count();
        let required = self.params.len() - optional;

        if self.params.iter().any(|p| p.slot == Slot::Values) {
            Arity::AtLeast(required)
        } else if optional == 0 {
            Arity::Exact(required)
        } else {
            Arity::Range(required, required + optional)
        }
    }

    /// C++ declaration the helper library must provide.
    pub fn declaration(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match p.slot {
                Slot::Flag { default } => format!("bool {} = {default}", p.name),
                slot => format!("{} {}", slot.cpp_type(), p.name),
            })
            .collect();
        format!("void {}({});", self.name, params.join(", "))
    }
}

pub fn lookup(name: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.name == name)
}

/// Numeric literal kept exactly as the user wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Numeric(String);

impl Numeric {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One element of a variadic value list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Text(String),
    Number(String),
    Bool(bool),
}

trait RenderArg {
    fn render_arg(&self) -> String;
}

impl RenderArg for String {
    fn render_arg(&self) -> String {
        quote(self)
    }
}

impl RenderArg for Numeric {
    fn render_arg(&self) -> String {
        self.0.clone()
    }
}

impl RenderArg for bool {
    fn render_arg(&self) -> String {
        self.to_string()
    }
}

impl RenderArg for Vec<Literal> {
    fn render_arg(&self) -> String {
        let items: Vec<String> = self
            .iter()
            .map(|lit| match lit {
                Literal::Text(s) => quote(s),
                Literal::Number(n) => n.clone(),
                Literal::Bool(b) => b.to_string(),
            })
            .collect();
        format!("{{{}}}", items.join(", "))
    }
}

/// C++ string literal for `s`.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `Some(text)` when `s`, ignoring surrounding whitespace, is exactly one
/// numeric literal. The lexer stops at `#`, so the token must cover all of it.
fn numeric_text(s: &str) -> Option<String> {
    let trimmed = s.trim();
    let mut tokens = Lexer::new(trimmed);
    match (tokens.next(), tokens.next()) {
        (Some(Ok(Token::Number(n))), Some(Ok(Token::Eof))) if n == trimmed => Some(n),
        _ => None,
    }
}

fn is_integer(n: &str) -> bool {
    !n.contains(['.', 'e', 'E']) && n.parse::<i32>().is_ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Walks the arguments of one call in parameter order.
struct ArgReader<'a> {
    call: &'a ParsedCall,
    entry: &'static CatalogEntry,
    pos: usize,
}

impl<'a> ArgReader<'a> {
    fn advance(&mut self) -> (Option<&'a Expr>, usize) {
        let at = self.pos;
        self.pos += 1;
        (self.call.args.get(at), at)
    }

    fn invalid(&self, at: usize, reason: String) -> PipelineError {
        let param = self
            .entry
            .params
            .get(at)
            .or_else(|| self.entry.params.last())
            .map_or("argument", |p| p.name);
        PipelineError::InvalidArgument {
            line: self.call.line,
            text: self.call.source.clone(),
            name: self.entry.name.to_string(),
            position: at + 1,
            param,
            reason,
        }
    }

    fn missing(&self, at: usize) -> PipelineError {
        self.invalid(at, "missing argument".to_string())
    }

    fn text(&mut self) -> Result<String, PipelineError> {
        match self.advance() {
            (Some(Expr::Str(s) | Expr::Ident(s) | Expr::Number(s)), _) => Ok(s.clone()),
            (Some(other), at) => {
                Err(self.invalid(at, format!("expected a string, found {}", other.kind())))
            }
            (None, at) => Err(self.missing(at)),
        }
    }

    fn number(&mut self) -> Result<Numeric, PipelineError> {
        match self.advance() {
            (Some(Expr::Number(n)), _) => Ok(Numeric(n.clone())),
            (Some(Expr::Str(s)), at) => numeric_text(s)
                .map(Numeric)
                .ok_or_else(|| self.invalid(at, format!("expected a number, found {s:?}"))),
            (Some(other), at) => {
                Err(self.invalid(at, format!("expected a number, found {other}")))
            }
            (None, at) => Err(self.missing(at)),
        }
    }

    fn integer(&mut self) -> Result<Numeric, PipelineError> {
        let at = self.pos;
        let value = self.number()?;
        if is_integer(value.as_str()) {
            Ok(value)
        } else {
            Err(self.invalid(
                at,
                format!("expected an integer, found {}", value.as_str()),
            ))
        }
    }

    fn flag(&mut self) -> Result<bool, PipelineError> {
        let default = match self.entry.params.get(self.pos).map(|p| p.slot) {
            Some(Slot::Flag { default }) => default,
            _ => true,
        };
        match self.advance() {
            (None, _) => Ok(default),
            (Some(Expr::Ident(s) | Expr::Str(s)), at) => parse_bool(s).ok_or_else(|| {
                self.invalid(at, format!("expected true or false, found {s:?}"))
            }),
            (Some(other), at) => {
                Err(self.invalid(at, format!("expected true or false, found {other}")))
            }
        }
    }

    fn values(&mut self) -> Result<Vec<Literal>, PipelineError> {
        let start = self.pos;
        let rest = self.call.args.get(start..).unwrap_or_default();
        if rest.is_empty() {
            return Err(self.invalid(start, "expected at least one value".to_string()));
        }

        let mut values = Vec::with_capacity(rest.len());
        for (offset, arg) in rest.iter().enumerate() {
            let literal = match arg {
                Expr::Str(s) => Literal::Text(s.clone()),
                Expr::Number(n) => Literal::Number(n.clone()),
                Expr::Ident(s) => match parse_bool(s) {
                    Some(b) => Literal::Bool(b),
                    None => {
                        return Err(self.invalid(
                            start + offset,
                            format!("expected a value, found identifier {s}"),
                        ));
                    }
                },
                Expr::Call { .. } => {
                    return Err(self.invalid(
                        start + offset,
                        format!("expected a value, found {arg}"),
                    ));
                }
            };
            values.push(literal);
        }
        self.pos = self.call.args.len();
        Ok(values)
    }
}

macro_rules! slot {
    (text) => { Slot::Text };
    (number) => { Slot::Number };
    (integer) => { Slot::Integer };
    (flag = $default:literal) => { Slot::Flag { default: $default } };
    (values) => { Slot::Values };
}

macro_rules! slot_type {
    (text) => { String };
    (number) => { Numeric };
    (integer) => { Numeric };
    (flag = $default:literal) => { bool };
    (values) => { Vec<Literal> };
}

macro_rules! operations {
    ($(
        $variant:ident => $name:literal ( $( $field:ident : $slot:ident $(= $default:literal)? ),* );
    )*) => {
        /// A validated call, one variant per catalog entry.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Operation {
            $( $variant { $( $field: slot_type!($slot $(= $default)?) ),* }, )*
        }

        pub static CATALOG: &[CatalogEntry] = &[
            $(
                CatalogEntry {
                    name: $name,
                    params: &[ $( Param { name: stringify!($field), slot: slot!($slot $(= $default)?) } ),* ],
                },
            )*
        ];

        impl Operation {
            pub fn name(&self) -> &'static str {
                match self {
                    $( Operation::$variant { .. } => $name, )*
                }
            }

            fn build(reader: &mut ArgReader<'_>) -> Result<Self, PipelineError> {
                match reader.entry.name {
                    $( $name => Ok(Operation::$variant { $( $field: reader.$slot()? ),* }), )*
                    other => Err(PipelineError::UnknownFunction {
                        line: reader.call.line,
                        text: reader.call.source.clone(),
                        name: other.to_string(),
                    }),
                }
            }

            /// The C++ statement for this call, including the trailing `;`.
            pub fn render(&self) -> String {
                match self {
                    $(
                        Operation::$variant { $( $field ),* } => {
                            let args: Vec<String> = vec![ $( $field.render_arg() ),* ];
                            format!("{}({});", $name, args.join(", "))
                        }
                    )*
                }
            }
        }
    };
}

operations! {
    // data loading
    LoadCsv => "load_csv"(filename: text);
    Print => "print"(message: text);

    // basic data operations
    RemoveNulls => "remove_nulls"();
    DescribeData => "describe_data"();
    FillNulls => "fill_nulls"(value: text);
    RenameColumn => "rename_column"(old_name: text, new_name: text);
    AddColumn => "add_column"(column_name: text, values: values);
    DropColumn => "drop_column"(column_name: text);
    FilterRows => "filter_rows"(column_name: text, value: text);
    SortData => "sort_data"(column_name: text, ascending: flag = true);
    GroupByData => "group_by_data"(column: text);
    PivotTable => "pivot_table"(index: text, columns: text, values: text);

    // statistics
    Mean => "mean"(column: text);
    Correlation => "correlation"(col1: text, col2: text);
    StandardDeviation => "standard_deviation"(column: text);
    Median => "median"(column: text);
    Variance => "variance"(column: text);

    // visualization
    Plot => "plot"(col1: text, col2: text);
    ScatterPlot => "scatter_plot"(col1: text, col2: text);
    BarChart => "bar_chart"(column: text);
    PieChart => "pie_chart"(column: text);
    Histogram => "histogram"(column: text);

    // machine learning
    TrainModel => "train_model"(feature: text, target: text);
    Predict => "predict"();
    SaveModel => "save_model"(filename: text);
    EvaluateModel => "evaluate_model"();
    SplitData => "split_data"(train_ratio: number);

    // preprocessing
    Normalize => "normalize"(column: text);
    Standardize => "standardize"(column: text);
    ScaleData => "scale_data"(column: text, new_min: number, new_max: number);

    // text processing
    RemoveStopwords => "remove_stopwords"(text_column: text);
    StemText => "stem_text"(text_column: text);
    CapitalizeWords => "capitalize_words"(text_column: text);
    CountWords => "count_words"(text_column: text);

    // time series
    RollingMean => "rolling_mean"(column: text, window_size: integer);
    ResampleData => "resample_data"(frequency: text);
    DetectTrends => "detect_trends"(column: text);
    SeasonalDecompose => "seasonal_decompose"(column: text);
    DetectAnomalies => "detect_anomalies"(column: text);

    // analysis
    GetShape => "get_shape"();
    DataQualityReport => "data_quality_report"();
    GetColumnProfile => "get_column_profile"(column: text);
    CategorizeColumn => "categorize_column"(column: text);
    Describe => "describe"();
}

/// Resolve a parsed call against the catalog: name first, then argument
/// count, then the shape of every argument.
pub fn validate(call: &ParsedCall) -> Result<Operation, PipelineError> {
    let entry = lookup(&call.name).ok_or_else(|| PipelineError::UnknownFunction {
        line: call.line,
        text: call.source.clone(),
        name: call.name.clone(),
    })?;

    let arity = entry.arity();
    if !arity.accepts(call.args.len()) {
        return Err(PipelineError::ArityError {
            line: call.line,
            text: call.source.clone(),
            name: entry.name.to_string(),
            expected: arity,
            got: call.args.len(),
        });
    }

    let mut reader = ArgReader {
        call,
        entry,
        pos: 0,
    };
    Operation::build(&mut reader)
}
