//! Regex tables used by the content analyzer.
//!
//! Tables are ordered: the framework table is evaluated top to bottom and
//! the first hit wins, so its order is a priority order.

use lazy_static::lazy_static;
use regex::Regex;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static analyzer pattern must compile"))
        .collect()
}

fn case_insensitive(patterns: &[&str]) -> Vec<Regex> {
    let prefixed: Vec<String> = patterns.iter().map(|p| format!("(?i){}", p)).collect();
    let refs: Vec<&str> = prefixed.iter().map(String::as_str).collect();
    compile(&refs)
}

lazy_static! {
    /// Framework name and the signatures that identify it.
    pub static ref FRAMEWORK_SIGNATURES: Vec<(&'static str, Vec<Regex>)> = vec![
        ("React", case_insensitive(&[
            r#"from\s+['"]react['"]"#,
            r#"require\(\s*['"]react['"]\s*\)"#,
            r"React\.(?:Component|createElement)",
            r"\buse(?:State|Effect)\s*\(",
        ])),
        ("Vue", case_insensitive(&[
            r#"from\s+['"]vue['"]"#,
            r"new\s+Vue\s*\(",
            r"<template>",
            r"defineComponent\s*\(",
        ])),
        ("Angular", case_insensitive(&[
            r"@angular/",
            r"@Component\s*\(",
            r"@NgModule\s*\(",
        ])),
        ("Express", case_insensitive(&[
            r#"require\(\s*['"]express['"]\s*\)"#,
            r#"from\s+['"]express['"]"#,
            r"\bexpress\(\s*\)",
        ])),
        ("Next.js", case_insensitive(&[
            r#"from\s+['"]next(?:/[\w-]+)?['"]"#,
            r"\bget(?:ServerSideProps|StaticProps)\b",
        ])),
        ("Django", case_insensitive(&[
            r"from\s+django\b",
            r"import\s+django\b",
        ])),
        ("Flask", case_insensitive(&[
            r"from\s+flask\s+import",
            r"Flask\(\s*__name__\s*\)",
        ])),
        ("FastAPI", case_insensitive(&[
            r"from\s+fastapi\s+import",
            r"FastAPI\(\s*\)",
        ])),
        ("Spring", case_insensitive(&[
            r"org\.springframework",
            r"@SpringBootApplication",
            r"@RestController",
        ])),
    ];

    /// Import families: ECMAScript modules, Python, Java.
    pub static ref DEPENDENCY_PATTERNS: Vec<(&'static str, Vec<Regex>)> = vec![
        ("ecmascript", compile(&[
            r#"import\s+[^;]*?\s+from\s+['"]([^'"]+)['"]"#,
        ])),
        ("python", compile(&[
            r"(?m)^\s*from\s+([\w.]+)\s+import\b",
            r"(?m)^\s*import\s+([\w.]+)(?:\s+as\s+\w+)?\s*(?:,|$)",
        ])),
        ("java", compile(&[
            r"(?m)^\s*import\s+(?:static\s+)?([\w.]+(?:\.\*)?)\s*;",
        ])),
    ];

    /// `export [default] (function|class|const|let|var) name`
    pub static ref EXPORT_PATTERN: Regex = Regex::new(
        r"export\s+(?:default\s+)?(?:async\s+)?(?:function\*?|class|const|let|var)\s+(\w+)"
    ).expect("static analyzer pattern must compile");

    /// Named declaration, arrow assignment, or object-method arrow shorthand.
    pub static ref JS_FUNCTION_PATTERN: Regex = Regex::new(concat!(
        r"function\s+(\w+)\s*\(",
        r"|(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s*)?(?:\([^)]*\)(?:\s*:\s*[^=;{]+)?|\w+)\s*=>",
        r"|(\w+)\s*:\s*(?:async\s*)?(?:\([^)]*\)|\w+)\s*=>",
    )).expect("static analyzer pattern must compile");

    pub static ref PYTHON_FUNCTION_PATTERN: Regex =
        Regex::new(r"\bdef\s+(\w+)\s*\(").expect("static analyzer pattern must compile");

    /// Shared by the JS/TS and Python class passes.
    pub static ref CLASS_PATTERN: Regex =
        Regex::new(r"\bclass\s+(\w+)").expect("static analyzer pattern must compile");

    pub static ref BLOCK_COMMENT_PATTERN: Regex =
        Regex::new(r"(?s)/\*\*?(.*?)\*/").expect("static analyzer pattern must compile");

    // Raw occurrences: `elif (` and `_if(` count too.
    pub static ref BRANCH_PATTERN: Regex =
        Regex::new(r"(?:if|for|while|switch|catch)\s*\(").expect("static analyzer pattern must compile");

    pub static ref LOGICAL_OPERATOR_PATTERN: Regex =
        Regex::new(r"&&|\|\|").expect("static analyzer pattern must compile");
}
