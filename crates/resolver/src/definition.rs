//! Structured view of a definition file for import injection.
//!
//! A definition is an ordered list of lines, each either an `import`
//! statement or opaque text, plus the position of its header (`amends` or
//! `extends`). Rendering joins the lines back with `\n`, so parsing and
//! rendering an untouched file reproduces it byte for byte.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(amends|extends)\b").expect("Invalid header regex"));

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+"([^"]+)"(?:\s+as\s+(\w+))?\s*$"#).expect("Invalid import regex")
});

static SHORTHAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\(").expect("Invalid interpolation regex"));

/// One `import "<uri>" [as <alias>]` statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportDecl {
    pub uri: String,
    pub alias: Option<String>,
}

impl ImportDecl {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            alias: None,
        }
    }

    pub fn aliased(uri: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            alias: Some(alias.into()),
        }
    }

    fn parse(line: &str) -> Option<Self> {
        let caps = IMPORT_RE.captures(line)?;
        Some(Self {
            uri: caps.get(1)?.as_str().to_string(),
            alias: caps.get(2).map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for ImportDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "import \"{}\" as {alias}", self.uri),
            None => write!(f, "import \"{}\"", self.uri),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Import { decl: ImportDecl, raw: String },
    Text(String),
}

impl Line {
    fn raw(&self) -> &str {
        match self {
            Line::Import { raw, .. } => raw,
            Line::Text(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    lines: Vec<Line>,
    header: Option<usize>,
}

impl Definition {
    pub fn parse(text: &str) -> Self {
        let mut header = None;
        let lines = text
            .split('\n')
            .enumerate()
            .map(|(i, raw)| {
                if header.is_none() && HEADER_RE.is_match(raw) {
                    header = Some(i);
                }
                match ImportDecl::parse(raw) {
                    Some(decl) => Line::Import {
                        decl,
                        raw: raw.to_string(),
                    },
                    None => Line::Text(raw.to_string()),
                }
            })
            .collect();
        Self { lines, header }
    }

    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }

    /// Whether an equivalent import (same URI and alias) is already declared.
    pub fn has_import(&self, wanted: &ImportDecl) -> bool {
        self.imports().any(|decl| decl == wanted)
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.lines.iter().filter_map(|line| match line {
            Line::Import { decl, .. } => Some(decl),
            Line::Text(_) => None,
        })
    }

    /// Splice `imports` directly below the header, skipping ones already
    /// present. Returns how many were inserted; zero when there is no header.
    pub fn insert_after_header(&mut self, imports: &[ImportDecl]) -> usize {
        let Some(header) = self.header else {
            return 0;
        };

        let mut fresh: Vec<Line> = Vec::new();
        for decl in imports {
            let seen = fresh.iter().any(|l| matches!(l, Line::Import { decl: d, .. } if d == decl));
            if seen || self.has_import(decl) {
                continue;
            }
            fresh.push(Line::Import {
                raw: decl.to_string(),
                decl: decl.clone(),
            });
        }

        let inserted = fresh.len();
        let at = header + 1;
        self.lines.splice(at..at, fresh);
        inserted
    }

    /// Rewrite `@(expr)` into `\(expr)` in every non-import line. Returns
    /// whether anything changed.
    pub fn expand_interpolation(&mut self) -> bool {
        let mut changed = false;
        for line in &mut self.lines {
            if let Line::Text(raw) = line
                && SHORTHAND_RE.is_match(raw)
            {
                *raw = SHORTHAND_RE.replace_all(raw, r"\(").into_owned();
                changed = true;
            }
        }
        changed
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line.raw())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "amends \"package://schema/Resource.pkl\"\n\nimport \"pkl:json\"\nid = \"a\"\n";

    #[test]
    fn parse_render_round_trip() {
        for text in [SAMPLE, "", "no header here", "extends \"x.pkl\"\r\nid = \"a\"\r\n"] {
            assert_eq!(Definition::parse(text).to_string(), text);
        }
    }

    #[test]
    fn recognises_imports_with_and_without_alias() {
        let def = Definition::parse("amends \"a\"\nimport \"pkl:json\"\n  import \"/x/y.pkl\" as llm\n");
        let imports: Vec<_> = def.imports().cloned().collect();
        assert_eq!(
            imports,
            vec![
                ImportDecl::new("pkl:json"),
                ImportDecl::aliased("/x/y.pkl", "llm")
            ]
        );
    }

    #[test]
    fn inserts_below_header_and_skips_present() {
        let mut def = Definition::parse(SAMPLE);
        let inserted = def.insert_after_header(&[
            ImportDecl::new("pkl:json"),
            ImportDecl::new("pkl:math"),
            ImportDecl::aliased("/req.pkl", "request"),
        ]);
        assert_eq!(inserted, 2);
        assert_eq!(
            def.to_string(),
            "amends \"package://schema/Resource.pkl\"\nimport \"pkl:math\"\nimport \"/req.pkl\" as request\n\nimport \"pkl:json\"\nid = \"a\"\n"
        );
    }

    #[test]
    fn header_may_follow_comments() {
        let mut def = Definition::parse("// generated\nextends \"base.pkl\"\nx = 1");
        assert_eq!(def.insert_after_header(&[ImportDecl::new("pkl:yaml")]), 1);
        assert_eq!(
            def.to_string(),
            "// generated\nextends \"base.pkl\"\nimport \"pkl:yaml\"\nx = 1"
        );
    }

    #[test]
    fn missing_header_is_no_op() {
        let mut def = Definition::parse("id = \"a\"\n");
        assert!(!def.has_header());
        assert_eq!(def.insert_after_header(&[ImportDecl::new("pkl:json")]), 0);
        assert_eq!(def.to_string(), "id = \"a\"\n");
    }

    #[test]
    fn alias_distinguishes_imports() {
        let def = Definition::parse("amends \"a\"\nimport \"/r.pkl\"\n");
        assert!(!def.has_import(&ImportDecl::aliased("/r.pkl", "request")));
        assert!(def.has_import(&ImportDecl::new("/r.pkl")));
    }

    #[test]
    fn interpolation_shorthand_is_expanded_once() {
        let mut def = Definition::parse("amends \"a\"\nprompt = \"@(request.data()) and @(llm.response(\"x\"))\"");
        assert!(def.expand_interpolation());
        let expanded = def.to_string();
        assert_eq!(
            expanded,
            "amends \"a\"\nprompt = \"\\(request.data()) and \\(llm.response(\"x\"))\""
        );

        let mut again = Definition::parse(&expanded);
        assert!(!again.expand_interpolation());
        assert_eq!(again.to_string(), expanded);
    }
}
