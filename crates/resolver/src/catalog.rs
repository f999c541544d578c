//! Resource catalog — every definition under a resources directory.
//!
//! Definitions are read as text and scanned for the three facts the engine
//! needs: the `id`, the `requires` listing and the action-kind block. Comments
//! and multi-line string bodies are masked out first, and `id` / `requires`
//! only count at the start of a statement. Files that cannot be read or carry
//! no id are logged and skipped; a duplicate id fails the whole load.

use agentflow_core::{ActionKind, CatalogError, DependencyMap, ResourceEntry};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extension of resource definition files.
pub const DEFINITION_EXTENSION: &str = "pkl";

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^[ \t]*id\s*=\s*"([^"]+)""#).expect("Invalid id regex"));

static REQUIRES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?ms)^[ \t]*requires\s*(?:=\s*new\s+Listing\s*)?\{(.*?)\}"#)
        .expect("Invalid requires regex")
});

static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("Invalid quoted string regex"));

static KIND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(exec|chat|httpClient|python|data)\s*\{").expect("Invalid kind regex")
});

/// Loaded set of resource definitions, indexed by id.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    entries: Vec<ResourceEntry>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Walk `root` recursively and load every definition file.
    pub fn load(root: &Path) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::default();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| CatalogError::Walk {
                root: root.to_path_buf(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(DEFINITION_EXTENSION)
            {
                continue;
            }

            let text = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable definition");
                    continue;
                }
            };

            match parse_definition(path, &text) {
                Ok(resource) => catalog.insert(resource)?,
                Err(e) => warn!(error = %e, "Skipping definition"),
            }
        }

        debug!(root = %root.display(), resources = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Build a catalog from already-parsed entries.
    pub fn from_entries(
        entries: impl IntoIterator<Item = ResourceEntry>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::default();
        for entry in entries {
            catalog.insert(entry)?;
        }
        Ok(catalog)
    }

    fn insert(&mut self, entry: ResourceEntry) -> Result<(), CatalogError> {
        if let Some(&existing) = self.index.get(&entry.id) {
            return Err(CatalogError::DuplicateResource {
                id: entry.id,
                first: self.entries[existing].file.clone(),
                second: entry.file,
            });
        }
        self.index.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ResourceEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fresh id → requirements map for order computation.
    pub fn dependency_map(&self) -> DependencyMap {
        self.entries
            .iter()
            .map(|e| (e.id.clone(), e.requires.clone()))
            .collect()
    }
}

/// Extract the id, requirements and kind from one definition's text.
pub fn parse_definition(path: &Path, text: &str) -> Result<ResourceEntry, CatalogError> {
    let code = mask_comments(text);
    let text = code.as_str();

    let id = ID_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CatalogError::Parse {
            path: path.to_path_buf(),
            reason: "no `id` declaration".into(),
        })?;

    let requires = REQUIRES_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|block| {
            QUOTED_RE
                .captures_iter(block.as_str())
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|r| !r.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let kind = KIND_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| ActionKind::from_keyword(m.as_str()));

    Ok(ResourceEntry {
        id,
        requires,
        kind,
        file: PathBuf::from(path),
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    LineComment,
    BlockComment,
    Str,
    MultiLineStr,
}

/// Blank out comments and multi-line string bodies, keeping line breaks so
/// statement starts stay where they were. Single-line strings are kept since
/// ids and requirements live in them.
fn mask_comments(text: &str) -> String {
    fn blank(c: char) -> char {
        if c == '\n' { '\n' } else { ' ' }
    }

    let mut out = String::with_capacity(text.len());
    let mut state = Scan::Code;
    let mut chars = text.char_indices();

    while let Some((i, c)) = chars.next() {
        let rest = &text[i..];
        match state {
            Scan::Code => {
                if rest.starts_with("//") {
                    state = Scan::LineComment;
                    out.push(' ');
                } else if rest.starts_with("/*") {
                    state = Scan::BlockComment;
                    chars.next();
                    out.push_str("  ");
                } else if rest.starts_with("\"\"\"") {
                    state = Scan::MultiLineStr;
                    chars.nth(1);
                    out.push_str("\"\"\"");
                } else {
                    if c == '"' {
                        state = Scan::Str;
                    }
                    out.push(c);
                }
            }
            Scan::LineComment => {
                if c == '\n' {
                    state = Scan::Code;
                }
                out.push(blank(c));
            }
            Scan::BlockComment => {
                if rest.starts_with("*/") {
                    state = Scan::Code;
                    chars.next();
                    out.push_str("  ");
                } else {
                    out.push(blank(c));
                }
            }
            Scan::Str => {
                out.push(c);
                if c == '\\' {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == '"' || c == '\n' {
                    state = Scan::Code;
                }
            }
            Scan::MultiLineStr => {
                if rest.starts_with("\"\"\"") {
                    state = Scan::Code;
                    chars.nth(1);
                    out.push_str("\"\"\"");
                } else {
                    out.push(blank(c));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn parse_full_definition() {
        let text = r#"amends "package://schema/Resource.pkl"

id = "summarize"
name = "Summarize"
requires {
  "fetch"
  "clean"
}
run {
  chat {
    prompt = "hi"
  }
}
"#;
        let entry = parse_definition(Path::new("/r/summarize.pkl"), text).unwrap();
        assert_eq!(entry.id, "summarize");
        assert_eq!(entry.requires, vec!["fetch", "clean"]);
        assert_eq!(entry.kind, Some(ActionKind::Chat));
    }

    #[test]
    fn parse_listing_form_and_no_kind() {
        let text = "id = \"respond\"\nrequires = new Listing { \"a\" }\n";
        let entry = parse_definition(Path::new("/r/respond.pkl"), text).unwrap();
        assert_eq!(entry.requires, vec!["a"]);
        assert_eq!(entry.kind, None);
    }

    #[test]
    fn parse_without_requires() {
        let text = "id = \"leaf\"\nrun {\n  exec {\n    command = \"ls\"\n  }\n}\n";
        let entry = parse_definition(Path::new("/r/leaf.pkl"), text).unwrap();
        assert!(entry.requires.is_empty());
        assert_eq!(entry.kind, Some(ActionKind::Exec));
    }

    #[test]
    fn commented_requires_is_ignored() {
        let text = r#"/// This resource requires { "ghost" } before it can run
id = "a"
// requires { "old" }
/* requires {
  "older"
} */
requires {
  "real"
}
"#;
        let entry = parse_definition(Path::new("/r/a.pkl"), text).unwrap();
        assert_eq!(entry.id, "a");
        assert_eq!(entry.requires, vec!["real"]);
    }

    #[test]
    fn requires_inside_strings_is_ignored() {
        let text = r#"id = "b"
description = "note: requires { \"ghost\" } is resolved first"
prompt = """
requires {
  "phantom"
}
"""
requires = new Listing { "fetch" }
"#;
        let entry = parse_definition(Path::new("/r/b.pkl"), text).unwrap();
        assert_eq!(entry.requires, vec!["fetch"]);
    }

    #[test]
    fn commented_items_inside_listing_are_dropped() {
        let text = r#"id = "c"
requires = new Listing {
  "fetch" // primary source
  // "retired"
  "clean"
}
run {
  requires {
    "nested"
  }
}
"#;
        let entry = parse_definition(Path::new("/r/c.pkl"), text).unwrap();
        assert_eq!(entry.requires, vec!["fetch", "clean"]);
    }

    #[test]
    fn commented_id_is_ignored() {
        let text = "/*\nid = \"stale\"\n*/\n// id = \"older\"\nid = \"fresh\"\n";
        let entry = parse_definition(Path::new("/r/fresh.pkl"), text).unwrap();
        assert_eq!(entry.id, "fresh");
    }

    #[test]
    fn urls_in_strings_are_not_comments() {
        let text = "id = \"web\"\nurl = \"https://example.com\"\nrequires { \"fetch\" }\n";
        let entry = parse_definition(Path::new("/r/web.pkl"), text).unwrap();
        assert_eq!(entry.requires, vec!["fetch"]);
    }

    #[test]
    fn parse_rejects_missing_id() {
        let err = parse_definition(Path::new("/r/x.pkl"), "name = \"x\"\n").unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn load_walks_nested_directories_and_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.pkl", "id = \"A\"\n");
        write(dir.path(), "nested/b.pkl", "id = \"B\"\nrequires { \"A\" }\n");
        write(dir.path(), "notes.txt", "id = \"ignored\"\n");
        write(dir.path(), "broken.pkl", "this has no identifier\n");

        let catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("A"));
        assert!(!catalog.contains("ignored"));
        assert_eq!(catalog.get("B").unwrap().requires, vec!["A"]);

        let deps = catalog.dependency_map();
        assert_eq!(deps["A"], Vec::<String>::new());
        assert_eq!(deps["B"], vec!["A"]);
    }

    #[test]
    fn duplicate_ids_fail_the_load() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "one.pkl", "id = \"same\"\n");
        write(dir.path(), "two.pkl", "id = \"same\"\n");

        let err = Catalog::load(dir.path()).unwrap_err();
        match err {
            CatalogError::DuplicateResource { id, first, second } => {
                assert_eq!(id, "same");
                assert!(first.ends_with("one.pkl"));
                assert!(second.ends_with("two.pkl"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_root_is_walk_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::load(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, CatalogError::Walk { .. }));
    }
}
