//! Input loading: turns submitted text into numbered command lines.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::processor::ast::Command;

/// Split a script into its commands.
///
/// Blank lines and `#` comment lines are dropped; the remaining lines keep
/// their 1-based position and their text exactly as written.
pub fn commands(script: &str) -> Vec<Command> {
    script
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                None
            } else {
                Some(Command {
                    line: i + 1,
                    text: line.to_string(),
                })
            }
        })
        .collect()
}

/// Read a script from `path`; `-` means stdin.
///
/// A `.json` file is treated as a saved request body and must carry the
/// script in its `command` (or `code`) field.
pub fn load_script(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Reading script from stdin")?;
        return Ok(buf);
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Reading {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        script_from_json(&text).with_context(|| format!("Parsing {}", path.display()))
    } else {
        Ok(text)
    }
}

/// Pull the script out of a request body such as `{"command": "..."}`.
pub fn script_from_json(json: &str) -> Result<String> {
    let root: Value = serde_json::from_str(json)?;

    let script = root
        .get("command")
        .or_else(|| root.get("code"))
        .ok_or_else(|| anyhow!("request has no `command` field"))?;

    script
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("`command` must be a string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_skip_blank_and_comment_lines() {
        let script = "\n# load the data\nload_csv(\"a.csv\")\n   \n  describe();  \n";
        let cmds = commands(script);

        assert_eq!(
            cmds,
            vec![
                Command {
                    line: 3,
                    text: "load_csv(\"a.csv\")".into()
                },
                Command {
                    line: 5,
                    text: "  describe();  ".into()
                },
            ]
        );
    }

    #[test]
    fn test_commands_handle_crlf() {
        let cmds = commands("get_shape()\r\ndescribe()\r\n");
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[1].text, "describe()");
    }

    #[test]
    fn test_script_from_json() {
        let test_cases = vec![
            (r#"{"command": "describe()"}"#, Some("describe()")),
            (r#"{"code": "get_shape()"}"#, Some("get_shape()")),
            (r#"{"script": "get_shape()"}"#, None),
            (r#"{"command": 42}"#, None),
        ];

        for (json, expected) in test_cases {
            let result = script_from_json(json).ok();
            assert_eq!(result.as_deref(), expected, "json: {json}");
        }
    }
}
