/// Markdown-based golden tests
///
/// Each file in tests/compiler-examples/ holds an input document and the exact
/// command string it must compile to.
use std::fs;
use std::path::PathBuf;

use similar::{ChangeTag, TextDiff};

#[derive(Debug)]
struct GoldenTest {
    name: String,
    input: String,
    expected_output: String,
}

fn parse_test_file(content: &str, filename: &str) -> Result<GoldenTest, String> {
    let mut name = String::new();
    let mut input = String::new();
    let mut expected_output = String::new();

    let mut in_input_section = false;
    let mut in_output_section = false;
    let mut in_code_block = false;

    for line in content.lines() {
        if name.is_empty() {
            if let Some(title) = line.strip_prefix("# ") {
                name = title.trim().to_string();
            }
            continue;
        }

        if !in_code_block && line.starts_with("## ") {
            in_input_section = line.starts_with("## Input");
            in_output_section = line.starts_with("## Output");
            continue;
        }

        if line.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block {
            let target = if in_input_section {
                &mut input
            } else if in_output_section {
                &mut expected_output
            } else {
                continue;
            };
            target.push_str(line);
            target.push('\n');
        }
    }

    if name.is_empty() {
        return Err(format!("No title found in {}", filename));
    }
    if input.is_empty() {
        return Err(format!("No input section found in {}", filename));
    }
    if expected_output.is_empty() {
        return Err(format!("No output section found in {}", filename));
    }

    Ok(GoldenTest {
        name,
        input: input.trim().to_string(),
        expected_output: expected_output.trim().to_string(),
    })
}

fn load_test_files() -> Vec<(String, String)> {
    let test_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("compiler-examples");

    let mut tests = Vec::new();
    for entry in fs::read_dir(&test_dir).expect("compiler-examples directory").flatten() {
        let path = entry.path();
        let Some(filename) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if path.extension().and_then(|s| s.to_str()) != Some("md") || filename == "README.md" {
            continue;
        }
        let content = fs::read_to_string(&path).expect("readable example");
        tests.push((filename.to_string(), content));
    }

    tests.sort_by(|a, b| a.0.cmp(&b.0));
    tests
}

fn print_diff(expected: &str, actual: &str) {
    let diff = TextDiff::from_lines(expected, actual);
    for change in diff.iter_all_changes() {
        let (sign, style) = match change.tag() {
            ChangeTag::Delete => ("-", "\x1b[31m"),
            ChangeTag::Insert => ("+", "\x1b[32m"),
            ChangeTag::Equal => (" ", ""),
        };
        print!("{}{}{}\x1b[0m", style, sign, change);
        if change.missing_newline() {
            println!();
        }
    }
}

#[test]
fn test_all_compiler_examples() {
    let files = load_test_files();
    assert!(!files.is_empty(), "no golden examples found");

    let mut failures = Vec::new();
    for (filename, content) in &files {
        let test = match parse_test_file(content, filename) {
            Ok(test) => test,
            Err(e) => {
                failures.push(e);
                continue;
            }
        };

        match customui::parse(&test.input) {
            Ok(template) => {
                let actual = template.build();
                if actual != test.expected_output {
                    println!("\n✗ {} ({})", test.name, filename);
                    print_diff(&test.expected_output, &actual);
                    failures.push(format!("{}: output mismatch", filename));
                }
            }
            Err(e) => failures.push(format!("{}: compile failed: {}", filename, e)),
        }
    }

    assert!(failures.is_empty(), "failing examples:\n{}", failures.join("\n"));
}

#[test]
fn test_examples_build_identically_twice() {
    for (filename, content) in load_test_files() {
        let test = parse_test_file(&content, &filename).unwrap();
        let template = customui::parse(&test.input).unwrap();
        assert_eq!(template.build(), template.build(), "{}", filename);
        assert_eq!(
            customui::parse(&test.input).unwrap().build(),
            template.build(),
            "{}",
            filename
        );
    }
}
