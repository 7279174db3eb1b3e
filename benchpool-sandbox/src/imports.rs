//! Import path scanning
//!
//! Submitted code may import third-party packages. Fetching or vendoring
//! them is not supported: the scan only reports what was found so the
//! worker can log it.

use regex::Regex;
use std::sync::OnceLock;

fn single_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^import\s+(?:[\w.]+\s+)?"([^"]+)""#).expect("static regex")
    })
}

fn block_entry() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^(?:[\w.]+\s+)?"([^"]+)""#).expect("static regex"))
}

/// Import paths declared by `code`, in source order.
pub fn scan_imports(code: &str) -> Vec<String> {
    let mut imports = Vec::new();
    let mut in_block = false;

    for raw in code.lines() {
        let line = raw.split("//").next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        if in_block {
            if line.starts_with(')') {
                in_block = false;
            } else if let Some(caps) = block_entry().captures(line) {
                imports.push(caps[1].to_string());
            }
            continue;
        }

        if line.starts_with("import") {
            let rest = line["import".len()..].trim_start();
            if rest.starts_with('(') {
                in_block = true;
                let inner = rest[1..].trim();
                if let Some(caps) = block_entry().captures(inner) {
                    imports.push(caps[1].to_string());
                }
                if inner.ends_with(')') {
                    in_block = false;
                }
            } else if let Some(caps) = single_import().captures(line) {
                imports.push(caps[1].to_string());
            }
        } else if line.starts_with("func ")
            || line.starts_with("type ")
            || line.starts_with("var ")
            || line.starts_with("const ")
        {
            break;
        }
    }

    imports
}

/// Imports outside the standard library (first path element has a dot).
pub fn third_party(imports: &[String]) -> Vec<&str> {
    imports
        .iter()
        .map(String::as_str)
        .filter(|path| {
            path.split('/')
                .next()
                .is_some_and(|first| first.contains('.'))
        })
        .collect()
}
