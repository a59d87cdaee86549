//! File and line extraction from failure text.
//!
//! Each field runs its own ordered chain of heuristics; the first candidate
//! that passes validation wins. File and line are extracted independently.

use std::sync::LazyLock;

use regex::Regex;

use super::types::ErrorContext;

const PATH_TOKEN: &str = r"[\w@~.\-/\\]+\.[A-Za-z][A-Za-z0-9]{0,5}";

static FILE_HEURISTICS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "in src/foo.ts", "at ./lib/bar.js", "from '../x.py'"
        format!(r#"\b(?:in|at|from)\s+['"`(]?({PATH_TOKEN})"#),
        // Conventional source roots
        format!(
            r"(?:^|[\s'(])((?:src|lib|test|tests|app|packages|components|pages)/{PATH_TOKEN})"
        ),
        // path:line:col
        format!(r"({PATH_TOKEN}):\d+:\d+"),
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static LINE_HEURISTICS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // tsc style: "file.ts:12:5 - error"
        r":(\d+):\d+\s*-\s*error",
        r":(\d+):\d+",
        r"(?i)\bline\s+(\d+)",
        // stack frame: "at fn (file.js:12:5)"
        r"\bat\s+.*?:(\d+):\d+",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

pub fn extract_context(text: &str) -> ErrorContext {
    ErrorContext {
        file: extract_file(text),
        line: extract_line(text),
    }
}

pub fn extract_file(text: &str) -> Option<String> {
    FILE_HEURISTICS.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .find(|candidate| is_valid_path(candidate))
            .map(str::to_string)
    })
}

pub fn extract_line(text: &str) -> Option<u32> {
    LINE_HEURISTICS.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| m.as_str().parse::<u32>().ok())
            .find(|line| *line > 0)
    })
}

/// Reject tokens that only look like paths: URLs, version numbers, bare
/// dotted identifiers such as `console.log`.
fn is_valid_path(candidate: &str) -> bool {
    if candidate.len() < 3 || candidate.contains("://") {
        return false;
    }
    if candidate.starts_with("www.") || candidate.starts_with("http") {
        return false;
    }
    if candidate.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return false;
    }
    let has_dir = candidate.contains('/') || candidate.contains('\\');
    let extension = candidate.rsplit('.').next().unwrap_or_default();
    has_dir || KNOWN_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
}

const KNOWN_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "json", "py", "rs", "go", "java", "kt", "rb", "php",
    "cs", "c", "h", "cc", "cpp", "hpp", "swift", "vue", "svelte", "css", "scss", "html", "md",
    "yml", "yaml", "toml", "sh", "sql",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_after_preposition() {
        assert_eq!(
            extract_file("TypeError: x is undefined in src/utils/math.ts"),
            Some("src/utils/math.ts".into())
        );
    }

    #[test]
    fn test_file_from_source_root() {
        assert_eq!(
            extract_file("Compilation failed: lib/parser.rs has errors"),
            Some("lib/parser.rs".into())
        );
    }

    #[test]
    fn test_file_from_path_line_col() {
        assert_eq!(
            extract_file("main.go:42:7: undefined: foo"),
            Some("main.go".into())
        );
    }

    #[test]
    fn test_file_rejects_urls_and_identifiers() {
        assert_eq!(extract_file("failed to fetch from https://example.com/a.js"), None);
        assert_eq!(extract_file("error at console.log call"), None);
        assert_eq!(extract_file("upgrade from 1.2.3 failed"), None);
    }

    #[test]
    fn test_line_tsc_style() {
        assert_eq!(
            extract_line("src/app.ts:17:3 - error TS2322: Type 'string'"),
            Some(17)
        );
    }

    #[test]
    fn test_line_word_form() {
        assert_eq!(extract_line("SyntaxError on line 8"), Some(8));
    }

    #[test]
    fn test_line_zero_is_rejected() {
        assert_eq!(extract_line("foo.js:0:0 and later line 5"), Some(5));
    }

    #[test]
    fn test_fields_are_independent() {
        let ctx = extract_context("Unexpected token on line 12");
        assert_eq!(ctx.file, None);
        assert_eq!(ctx.line, Some(12));

        let ctx = extract_context("Cannot find module 'x' from src/index.js");
        assert_eq!(ctx.file, Some("src/index.js".into()));
        assert_eq!(ctx.line, None);
    }

    #[test]
    fn test_no_context() {
        assert_eq!(extract_context("something broke"), ErrorContext::default());
    }
}
