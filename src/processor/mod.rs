//! The functional core: parse every command, check it against the catalog
//! and render it into a C++ statement.
pub mod ast;
pub mod catalog;
pub mod lexer;
pub mod script_parser;

use tracing::debug;

use crate::error::PipelineError;
use crate::model::GeneratedStatement;
use ast::{Command, ParsedCall};

/// Parsing stage: every line must be a well-formed call.
pub fn parse(commands: &[Command]) -> Result<Vec<ParsedCall>, PipelineError> {
    script_parser::parse_commands(commands)
}

/// Validation stage: resolve each call and render it, keeping script order.
pub fn validate(calls: &[ParsedCall]) -> Result<Vec<GeneratedStatement>, PipelineError> {
    calls
        .iter()
        .map(|call| {
            let op = catalog::validate(call)?;
            let text = op.render();
            debug!(line = call.line, statement = %text, "rendered");
            Ok(GeneratedStatement {
                line: call.line,
                text,
            })
        })
        .collect()
}

/// Parse and validate a whole script in one go.
pub fn translate(script: &str) -> Result<Vec<GeneratedStatement>, PipelineError> {
    let commands = crate::parser::commands(script);
    let calls = parse(&commands)?;
    validate(&calls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_follow_script_order() {
        let script = "load_csv(\"a.csv\")\ndescribe()\nmean(\"age\")\nsort_data(\"age\", false)\n";
        let statements = translate(script).unwrap();

        let texts: Vec<&str> = statements.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "load_csv(\"a.csv\");",
                "describe();",
                "mean(\"age\");",
                "sort_data(\"age\", false);",
            ]
        );
        let lines: Vec<usize> = statements.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_syntax_errors_win_over_validation_errors() {
        // line 1 is unknown, line 2 is malformed: parsing runs over the whole
        // script before anything is validated
        let err = translate("foo(1)\nmean(\"a\"").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSyntax { line: 2, .. }));
    }

    #[test]
    fn test_errors_quote_the_line_as_written() {
        let test_cases = vec![
            ("describe()\n    mean(\"a\"  ", "Error parsing line 2 \"    mean(\"a\"  \""),
            ("\tfoo(1) ;", "Error parsing line 1 \"\tfoo(1) ;\": unknown function: foo"),
        ];

        for (script, expected) in test_cases {
            let err = translate(script).unwrap_err();
            assert!(err.to_string().starts_with(expected), "got: {err}");
        }

        let statements = translate("   get_shape()   ").unwrap();
        assert_eq!(statements[0].text, "get_shape();");
    }

    #[test]
    fn test_first_invalid_call_aborts() {
        let err = translate("describe()\nmean()\nfoo(1)").unwrap_err();
        assert!(matches!(err, PipelineError::ArityError { line: 2, .. }));
    }

    #[test]
    fn test_empty_script_has_no_statements() {
        assert_eq!(translate("\n  \n# nothing\n").unwrap(), vec![]);
    }
}
