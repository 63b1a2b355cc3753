use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use displayinframe::error::error_chain;
use displayinframe::host::{AccessRule, AccessRules, MemoryWiki, RenderRequest, Wiki};
use wiki::reference::{DefaultResolver, DocumentReference, EntityType};
use wiki::render::{to_html, to_plain_text};
use wiki::{DocumentModel, Syntax, UserReference};

/// Wiki every case runs in.
const CASE_WIKI: &str = "xwiki";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Html,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Reference the case body is stored under and the page that is rendered.
    #[serde(default = "default_page")]
    pub page: String,

    /// Acting user. Defaults to the guest user.
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub locale: Option<String>,

    #[serde(default)]
    pub format: OutputFormat,

    /// Expected rendered output (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Expected failure of the page render; the error chain must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// If true, the case body itself must fail to parse.
    #[serde(default)]
    pub expect_parse_error: bool,

    /// Other pages of the wiki, keyed by reference.
    #[serde(default)]
    pub pages: BTreeMap<String, String>,

    /// Translated sources: reference, then locale.
    #[serde(default)]
    pub translations: BTreeMap<String, BTreeMap<String, String>>,

    /// View rules, first match wins.
    #[serde(default)]
    pub rights: Vec<AccessRule>,
}

fn default_page() -> String {
    "Main.Test".to_string()
}

/// Split a `.test.md` file into its TOML front matter and page body.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');
    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;
    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;
    Ok((config, body))
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
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(".test.md"))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match std::fs::read_to_string(path) {
        Err(e) => (None, Err(format!("cannot read file: {}", e))),
        Ok(content) => match parse_test_file(&content) {
            Err(e) => (None, Err(format!("frontmatter error: {}", e))),
            Ok((config, body)) => (config.description.clone(), check_case(&config, body)),
        },
    };

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: match outcome {
            Ok(()) => TestOutcome::Pass,
            Err(reason) => TestOutcome::Fail(reason),
        },
    }
}

fn check_case(config: &TestConfig, body: &str) -> Result<(), String> {
    if config.expect_parse_error {
        return match wiki::parser::Parser::new(body.to_string(), 0).parse() {
            Err(_) => Ok(()),
            Ok(_) => Err("expected parse error, but parsing succeeded".into()),
        };
    }

    let resolver = DefaultResolver::new(CASE_WIKI);
    let resolve = |raw: &str| -> Result<DocumentReference, String> {
        resolver
            .resolve(raw, EntityType::Document, None)
            .map_err(|e| format!("bad page reference '{}': {}", raw, e))
    };

    let page = resolve(&config.page)?;
    let mut store = MemoryWiki::new();
    let sources = config
        .pages
        .iter()
        .map(|(raw, content)| (raw.as_str(), content.as_str()))
        .chain(std::iter::once((config.page.as_str(), body)));
    for (raw, content) in sources {
        let mut document = DocumentModel::new(resolve(raw)?, content);
        if let Some(translations) = config.translations.get(raw) {
            document.translations = translations.clone();
        }
        store.insert_document(document);
    }

    let wiki = Wiki::new(
        CASE_WIKI,
        Arc::new(store),
        Arc::new(AccessRules::new(config.rights.clone())),
    );
    let request = RenderRequest {
        user: config
            .user
            .clone()
            .map(UserReference::new)
            .unwrap_or_else(UserReference::guest),
        locale: config.locale.clone(),
        target_syntax: match config.format {
            OutputFormat::Plain => Syntax::Plain,
            OutputFormat::Html => Syntax::Html,
        },
    };

    let rendered = wiki.render_page(&page, &request).map(|xdom| match config.format {
        OutputFormat::Plain => to_plain_text(&xdom.children),
        OutputFormat::Html => to_html(&xdom.children),
    });

    match (&config.expect_error, rendered) {
        (Some(expected), Err(err)) => {
            let chain = error_chain(&err);
            if chain.contains(expected.as_str()) {
                Ok(())
            } else {
                Err(format!("expected error containing \"{}\", got: {}", expected, chain))
            }
        }
        (Some(expected), Ok(_)) => Err(format!(
            "expected error containing \"{}\", but rendering succeeded",
            expected
        )),
        (None, Err(err)) => Err(format!("unexpected render error: {}", error_chain(&err))),
        (None, Ok(actual)) => match &config.expect_output {
            Some(expected) if actual.trim() != expected.trim() => Err(format!(
                "output mismatch\n  expected: {}\n  actual:   {}",
                expected.trim(),
                actual.trim()
            )),
            _ => Ok(()),
        },
    }
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
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".test.md"))
        {
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

struct Palette {
    no_color: bool,
}

impl Palette {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(&self) -> String {
        self.paint("31", "FAIL")
    }

    fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }
}

/// Categories of `all` selected by the `requested` names (a name also selects
/// its sub-categories). Everything when nothing is requested.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }

    let mut selected = BTreeMap::new();
    for name in requested {
        let name = name.trim_matches('/');
        let prefix = format!("{}/", name);
        let before = selected.len();
        for (category, files) in all {
            if category == name || category.starts_with(&prefix) {
                selected.insert(category.as_str(), files);
            }
        }
        if selected.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                name,
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
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let palette = Palette { no_color };

    let groups: Vec<(String, Vec<PathBuf>)> = if path.is_file() {
        vec![(String::new(), vec![path.to_path_buf()])]
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no .test.md files found in {}", path.display());
            return 1;
        }
        let selected = select_categories(&all, categories);
        if selected.is_empty() {
            eprintln!("no matching categories found");
            return 1;
        }
        selected
            .into_iter()
            .map(|(category, files)| (category.to_string(), files.clone()))
            .collect()
    };
    let show_headers = !path.is_file();

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &groups {
        if show_headers {
            eprintln!();
            eprintln!("{}", palette.bold(category_label(category)));
        }
        for file in files {
            let result = run_single_test(file);
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", palette.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", palette.fail(), result.label());
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
        eprintln!("test result: {}. {} passed, 0 failed", palette.paint("32", "ok"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            palette.paint("31", "FAILED"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(text: &str) -> Result<(), String> {
        let (config, body) = parse_test_file(text)?;
        check_case(&config, body)
    }

    #[test]
    fn splits_front_matter_from_body() {
        let (config, body) =
            parse_test_file("---\ndescription = \"d\"\n[pages]\n\"Main.B\" = \"b\"\n---\nbody\n").unwrap();
        assert_eq!(config.description.as_deref(), Some("d"));
        assert_eq!(config.page, "Main.Test");
        assert_eq!(config.pages["Main.B"], "b");
        assert_eq!(body, "body\n");
    }

    #[test]
    fn missing_delimiters_are_reported() {
        assert!(parse_test_file("no front matter").is_err());
        assert!(parse_test_file("---\ndescription = \"d\"\n").is_err());
    }

    #[test]
    fn passing_and_failing_output_cases() {
        let passing = "---\nexpect_output = \"b\"\n[pages]\n\"Main.B\" = \"b\"\n---\n{{displayinframe reference=\"B\"/}}\n";
        assert!(case(passing).is_ok());

        let failing = passing.replace("expect_output = \"b\"", "expect_output = \"c\"");
        assert!(case(&failing).unwrap_err().starts_with("output mismatch"));
    }

    #[test]
    fn expected_render_error_matches_chain() {
        let text = "---\nexpect_error = \"doesn't have view rights\"\n[[rights]]\ntarget = \"*\"\nallow = false\n---\nbody\n";
        assert!(case(text).is_ok());
    }

    #[test]
    fn expected_parse_error() {
        assert!(case("---\nexpect_parse_error = true\n---\n{{open}}\nno end\n").is_ok());
        assert!(case("---\nexpect_parse_error = true\n---\nfine\n").is_err());
    }
}
