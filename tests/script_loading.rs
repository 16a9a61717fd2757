use std::path::Path;

use dsl2cpp::parser::load_script;
use dsl2cpp::processor::translate;
use dsl2cpp::writer::cpp::assemble;

#[test]
fn loads_plain_script_file() {
    let script = load_script(Path::new("tests/data/survey.dsl")).unwrap();
    let statements = translate(&script).unwrap();

    let lines: Vec<usize> = statements.iter().map(|s| s.line).collect();
    assert_eq!(lines, vec![2, 3, 5, 6, 7, 8, 9]);

    let program = assemble(&statements);
    assert_eq!(program.statement_count, 7);
    assert!(program.source.contains(
        "    sort_data(\"age\", false);\n    scale_data(\"income\", 0, 1);\n    rolling_mean(\"income\", 3);\n"
    ));
}

#[test]
fn loads_script_from_request_body() {
    let script = load_script(Path::new("tests/data/survey_request.json")).unwrap();
    assert_eq!(script, "load_csv(\"survey.csv\")\nmean(\"age\")\nget_shape()");

    let texts: Vec<String> = translate(&script)
        .unwrap()
        .into_iter()
        .map(|s| s.text)
        .collect();
    assert_eq!(
        texts,
        vec!["load_csv(\"survey.csv\");", "mean(\"age\");", "get_shape();"]
    );
}

#[test]
fn missing_file_names_the_path() {
    let err = load_script(Path::new("tests/data/nope.dsl")).unwrap_err();
    assert!(format!("{err:#}").contains("tests/data/nope.dsl"));
}
