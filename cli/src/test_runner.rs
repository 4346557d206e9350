use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use engine::{EngineConfig, Renderer, Widget};
use talamo::block::ContentNode;
use talamo::parser::ParseError;

use crate::simulate;

#[derive(Debug, Deserialize)]
pub struct ExpectedDiagnostic {
    /// Substring that must appear in the diagnostic message.
    pub contains: String,

    /// If set, the diagnostic's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

/// One decision played on a simulator, with the outcome it must produce.
#[derive(Debug, Deserialize)]
pub struct ExpectedDecision {
    /// Which trading simulator, counting from 1.
    #[serde(default = "first_block")]
    pub block: usize,
    pub action: String,
    #[serde(default)]
    pub expect_pips: Option<i64>,
    #[serde(default)]
    pub expect_correct: Option<bool>,
    #[serde(default)]
    pub expect_score: Option<f64>,
    /// Substring of the feedback shown after the reveal.
    #[serde(default)]
    pub expect_feedback: Option<String>,
    /// Substring of the error the decision must fail with.
    #[serde(default)]
    pub expect_error: Option<String>,
}

fn first_block() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LessonTest {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Node kinds in authored order (`prose`, `callout`, `trading-sim-v2`, ...).
    #[serde(default)]
    pub expect_nodes: Option<Vec<String>>,

    /// Top-level widget kinds after rendering; `diagnostic` marks a contained failure.
    #[serde(default)]
    pub expect_widgets: Option<Vec<String>>,

    /// Expected block errors. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_errors: Option<Vec<ExpectedDiagnostic>>,

    /// Expected warnings, checked the same way.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedDiagnostic>>,

    #[serde(default)]
    pub decisions: Vec<ExpectedDecision>,
}

/// Split a `.test.md` file into its TOML front matter and lesson source.
fn parse_test_file(content: &str) -> Result<(LessonTest, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- front matter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close = after_open
        .find("\n---")
        .ok_or("missing closing --- front matter delimiter")?;

    let front_matter = after_open[..close].trim_end_matches('\r');
    let rest = &after_open[close + "\n---".len()..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let test: LessonTest =
        toml::from_str(front_matter).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((test, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path, config: &EngineConfig) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (test, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("front matter error: {}", e)),
    };

    let description = test.description.clone();
    match check_lesson(&test, source, config) {
        Some(reason) => fail(description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Every expectation in order; the first mismatch is the failure reason.
fn check_lesson(test: &LessonTest, source: &str, config: &EngineConfig) -> Option<String> {
    let lesson = talamo::parser::Parser::new(source.to_string(), 0).parse();

    if let Some(expected) = &test.expect_nodes {
        let actual: Vec<&str> = lesson.nodes().map(ContentNode::kind_name).collect();
        if let Some(reason) = check_kinds("node", &actual, expected) {
            return Some(reason);
        }
    }

    let nested = lesson.nested_diagnostics(config.max_render_depth);
    let (errors, warnings): (Vec<&ParseError>, Vec<&ParseError>) = lesson
        .diagnostics
        .iter()
        .chain(&nested)
        .partition(|d| d.is_error());

    match &test.expect_errors {
        Some(expected) => {
            if let Some(reason) = check_diagnostics("error", source, &errors, expected) {
                return Some(reason);
            }
        }
        None if !errors.is_empty() => {
            let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
            return Some(format!("unexpected error(s): {}", messages.join("; ")));
        }
        None => {}
    }

    if let Some(expected) = &test.expect_warnings {
        if let Some(reason) = check_diagnostics("warning", source, &warnings, expected) {
            return Some(reason);
        }
    }

    if let Some(expected) = &test.expect_widgets {
        let widgets = Renderer::new(config.clone()).render_lesson(&lesson);
        let actual: Vec<&str> = widgets.iter().map(Widget::kind_name).collect();
        if let Some(reason) = check_kinds("widget", &actual, expected) {
            return Some(reason);
        }
    }

    for (i, decision) in test.decisions.iter().enumerate() {
        if let Some(reason) = check_decision(&lesson, decision, config) {
            return Some(format!("decision[{}] ({}): {}", i, decision.action, reason));
        }
    }

    None
}

fn check_kinds(what: &str, actual: &[&str], expected: &[String]) -> Option<String> {
    if actual.iter().copied().eq(expected.iter().map(String::as_str)) {
        return None;
    }
    Some(format!(
        "{} kinds mismatch\n  expected: [{}]\n  actual:   [{}]",
        what,
        expected.join(", "),
        actual.join(", ")
    ))
}

fn check_decision(
    lesson: &talamo::Lesson,
    expected: &ExpectedDecision,
    config: &EngineConfig,
) -> Option<String> {
    let result = simulate::simulator(lesson, expected.block)
        .and_then(|node| simulate::decide(node, &expected.action, config));

    let outcome = match (result, &expected.expect_error) {
        (Ok(_), Some(error)) => {
            return Some(format!("expected error containing \"{}\", but it succeeded", error));
        }
        (Err(actual), Some(error)) => {
            let actual = format!("{:#}", actual);
            if actual.contains(error.as_str()) {
                return None;
            }
            return Some(format!("expected error containing \"{}\", got: {}", error, actual));
        }
        (Err(actual), None) => return Some(format!("unexpected error: {:#}", actual)),
        (Ok(outcome), None) => outcome,
    };

    if let Some(pips) = expected.expect_pips {
        if outcome.pips != pips {
            return Some(format!("expected {} pips, got {}", pips, outcome.pips));
        }
    }
    if let Some(correct) = expected.expect_correct {
        if outcome.correct != correct {
            return Some(format!("expected correct = {}, got {}", correct, outcome.correct));
        }
    }
    if let Some(score) = expected.expect_score {
        match outcome.score {
            Some(actual) if (actual - score).abs() < 1e-9 => {}
            actual => return Some(format!("expected score {}, got {:?}", score, actual)),
        }
    }
    if let Some(feedback) = &expected.expect_feedback {
        if !outcome.feedback.contains(feedback.as_str()) {
            return Some(format!(
                "expected feedback containing \"{}\", got: {}",
                feedback, outcome.feedback
            ));
        }
    }
    None
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Compare diagnostics of one severity against expectations. Returns `Some(reason)` on mismatch.
fn check_diagnostics(
    what: &str,
    source: &str,
    actual: &[&ParseError],
    expected: &[ExpectedDiagnostic],
) -> Option<String> {
    if actual.len() != expected.len() {
        let listed: Vec<String> = actual.iter().map(|d| format!("  - {}", d.message)).collect();
        return Some(format!(
            "expected {} {}(s), got {}\n  actual:\n{}",
            expected.len(),
            what,
            actual.len(),
            if listed.is_empty() {
                "    (none)".to_string()
            } else {
                listed.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual.iter().zip(expected).enumerate() {
        if !actual.message.contains(&expected.contains) {
            return Some(format!(
                "{}[{}]: expected message containing \"{}\", got: {}",
                what, i, expected.contains, actual.message
            ));
        }

        if let Some(expected_line) = expected.line {
            let actual_line = byte_offset_to_line(source, actual.span.start);
            if actual_line != expected_line {
                return Some(format!(
                    "{}[{}]: expected on line {}, but span is on line {}",
                    what, i, expected_line, actual_line
                ));
            }
        }
    }

    None
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
            continue;
        }
        let is_test = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".test.md"));
        if is_test {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

struct Style {
    no_color: bool,
}

impl Style {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, "1")
    }
}

/// Select the categories to run; unknown names are reported and skipped.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }

    let mut selected = BTreeMap::new();
    for requested in requested {
        let wanted = requested.trim_matches('/');
        let prefix = format!("{}/", wanted);
        let before = selected.len();
        for (category, files) in all {
            if category == wanted || category.starts_with(&prefix) {
                selected.insert(category.as_str(), files);
            }
        }
        if selected.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                wanted,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected
}

/// Run all `.test.md` files under `path` (or a single file).
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String], config: &EngineConfig) -> i32 {
    let style = Style { no_color };

    let all = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };
    if all.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return 1;
    }

    let selected = select_categories(&all, categories);
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &selected {
        if path.is_dir() {
            eprintln!();
            eprintln!("{}", style.bold(category_label(category)));
        }
        for file in *files {
            let result = run_single_test(file, config);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("ok", "32"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("FAILED", "31"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}
