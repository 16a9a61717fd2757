//! Assemble the complete C++ program for one script.
//!
//! Layout, joined by blank lines:
//!   1. header: includes, shared state, one declaration per catalog entry
//!   2. inline body of `describe_data`
//!   3. `int main()` with the statements in script order
//!
//! Every other operation body comes from the external helper library.

use std::fmt::Write;

use crate::model::{GeneratedProgram, GeneratedStatement};
use crate::processor::catalog::CATALOG;

const PREAMBLE: &str = r#"// Auto-generated by dsl2cpp - DO NOT EDIT
#include <iostream>
#include <fstream>
#include <sstream>
#include <vector>
#include <string>
#include <set>
#include <map>
#include <numeric>
#include <algorithm>
#include <cmath>
#include <cstdlib>

using namespace std;

struct CSVRow {
    vector<string> data;
};

// Shared state owned by the helper library.
extern vector<CSVRow> dataset;
extern double model_slope;
extern double model_intercept;"#;

const DESCRIBE_DATA: &str = r#"void describe_data() {
    if (dataset.empty()) {
        cout << "Dataset is empty" << endl;
        return;
    }

    const vector<string>& header = dataset[0].data;
    cout << "Dataset Summary:" << endl;
    cout << "Number of rows: " << dataset.size() - 1 << endl;
    cout << "Number of columns: " << header.size() << endl;
    cout << "\nColumns:" << endl;

    for (size_t col = 0; col < header.size(); col++) {
        cout << "\n" << header[col] << ":" << endl;

        vector<double> values;
        bool numeric = true;
        for (size_t row = 1; row < dataset.size(); row++) {
            if (col >= dataset[row].data.size()) {
                numeric = false;
                break;
            }
            try {
                values.push_back(stod(dataset[row].data[col]));
            } catch (...) {
                numeric = false;
                break;
            }
        }

        if (numeric && !values.empty()) {
            double sum = accumulate(values.begin(), values.end(), 0.0);
            sort(values.begin(), values.end());
            cout << "  Type: Numeric" << endl;
            cout << "  Mean: " << sum / values.size() << endl;
            cout << "  Median: " << values[values.size() / 2] << endl;
            cout << "  Min: " << values.front() << endl;
            cout << "  Max: " << values.back() << endl;
        } else {
            set<string> unique_values;
            for (size_t row = 1; row < dataset.size(); row++) {
                if (col < dataset[row].data.size()) {
                    unique_values.insert(dataset[row].data[col]);
                }
            }
            cout << "  Type: Categorical" << endl;
            cout << "  Unique values: " << unique_values.size() << endl;
        }
    }
}"#;

/// Header section: preamble plus the declarations of every catalog entry.
pub fn header() -> String {
    let mut out = String::from(PREAMBLE);
    out.push_str("\n\n// Operation library\n");
    for entry in CATALOG {
        out.push_str(&entry.declaration());
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// Concatenate header, embedded implementation and the ordered statements.
pub fn assemble(statements: &[GeneratedStatement]) -> GeneratedProgram {
    let mut main = String::from("int main() {\n");
    for stmt in statements {
        // writing to a String cannot fail
        let _ = writeln!(main, "    {}", stmt.text);
    }
    main.push_str("    return 0;\n}\n");

    let source = [header(), DESCRIBE_DATA.to_string(), main].join("\n\n");

    GeneratedProgram {
        source,
        statement_count: statements.len(),
    }
}
