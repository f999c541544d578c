//! Import injection — wires a definition to everything it may read.
//!
//! Candidates are emitted in a fixed order: standard library modules, schema
//! helpers, then the request's output records and request descriptor. The
//! last group is existence-gated so a definition never imports a file that
//! is not on disk yet. Injection is idempotent.

use agentflow_config::ResolverConfig;
use agentflow_core::{ActionKind, Error, Result};
use std::path::Path;
use tracing::debug;

use crate::context::RequestContext;
use crate::definition::{Definition, ImportDecl};
use crate::descriptor::schema_uri;

/// Standard library modules imported by every definition.
pub const STDLIB_IMPORTS: [&str; 8] = [
    "pkl:json",
    "pkl:test",
    "pkl:math",
    "pkl:platform",
    "pkl:semver",
    "pkl:shell",
    "pkl:xml",
    "pkl:yaml",
];

/// Schema helper modules and their aliases.
pub const SCHEMA_IMPORTS: [(&str, &str); 3] = [
    ("Document.pkl", "document"),
    ("Skip.pkl", "skip"),
    ("Utils.pkl", "utils"),
];

#[derive(Debug, Clone)]
pub struct ImportInjector {
    schema_package: String,
    expand_interpolation: bool,
}

impl ImportInjector {
    pub fn new(schema_package: impl Into<String>) -> Self {
        Self {
            schema_package: schema_package.into(),
            expand_interpolation: true,
        }
    }

    pub fn with_interpolation(mut self, enabled: bool) -> Self {
        self.expand_interpolation = enabled;
        self
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.schema_package.clone()).with_interpolation(config.expand_interpolation)
    }

    /// Imports `ctx` allows right now, in emission order.
    pub fn candidates(&self, ctx: &RequestContext) -> Vec<ImportDecl> {
        let mut imports: Vec<ImportDecl> = STDLIB_IMPORTS.iter().map(|m| ImportDecl::new(*m)).collect();

        imports.extend(
            SCHEMA_IMPORTS
                .iter()
                .map(|(module, alias)| ImportDecl::aliased(schema_uri(&self.schema_package, module), *alias)),
        );

        for kind in ActionKind::ALL {
            let record = ctx.output_record(kind);
            if record.exists() {
                imports.push(ImportDecl::aliased(
                    record.to_string_lossy(),
                    kind.output_dir(),
                ));
            }
        }

        if ctx.request_file.exists() {
            imports.push(ImportDecl::aliased(
                ctx.request_file.to_string_lossy(),
                "request",
            ));
        }

        imports
    }

    /// Apply `candidates` to a definition's text. `None` means the text is
    /// already up to date or has no header to anchor the imports.
    pub fn apply(&self, text: &str, candidates: &[ImportDecl]) -> Option<String> {
        let mut definition = Definition::parse(text);
        if !definition.has_header() {
            return None;
        }

        let inserted = definition.insert_after_header(candidates);
        let expanded = self.expand_interpolation && definition.expand_interpolation();

        (inserted > 0 || expanded).then(|| definition.to_string())
    }

    /// Rewrite `file` in place. Returns whether it was changed.
    pub async fn inject(&self, file: &Path, ctx: &RequestContext) -> Result<bool> {
        let text = tokio::fs::read_to_string(file)
            .await
            .map_err(|e| Error::io(file, e))?;

        let candidates = self.candidates(ctx);
        let Some(updated) = self.apply(&text, &candidates) else {
            if !Definition::parse(&text).has_header() {
                debug!(file = %file.display(), "No amends/extends header, leaving definition untouched");
            }
            return Ok(false);
        };

        tokio::fs::write(file, updated)
            .await
            .map_err(|e| Error::io(file, e))?;
        debug!(file = %file.display(), request_id = %ctx.request_id, "Imports injected");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RouteTemplate;
    use agentflow_core::ResponseFormat;

    const SCHEMA: &str = "package://schema.test/core@1.0.0";

    fn context(root: &Path) -> RequestContext {
        RouteTemplate {
            route_path: "/run".into(),
            project_dir: root.join("project"),
            workflow_dir: root.join("workflow"),
            action_dir: root.join("action"),
            response_format: ResponseFormat::Json,
        }
        .request_with_id("req-1")
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn always_on_imports_without_records() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let injector = ImportInjector::new(SCHEMA);

        let candidates = injector.candidates(&ctx);
        assert_eq!(candidates.len(), STDLIB_IMPORTS.len() + SCHEMA_IMPORTS.len());
        assert_eq!(candidates[0], ImportDecl::new("pkl:json"));
        assert_eq!(
            candidates[8],
            ImportDecl::aliased(format!("{SCHEMA}#/Document.pkl"), "document")
        );
        assert!(candidates.iter().all(|c| c.alias.as_deref() != Some("request")));
    }

    #[test]
    fn only_existing_records_are_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        touch(&ctx.output_record(ActionKind::Exec));
        touch(&ctx.request_file);

        let candidates = ImportInjector::new(SCHEMA).candidates(&ctx);
        let aliases: Vec<_> = candidates
            .iter()
            .skip(STDLIB_IMPORTS.len() + SCHEMA_IMPORTS.len())
            .map(|c| c.alias.clone().unwrap())
            .collect();
        assert_eq!(aliases, vec!["exec", "request"]);

        for c in &candidates {
            if c.uri.starts_with('/') {
                assert!(Path::new(&c.uri).exists(), "{} does not exist", c.uri);
            }
        }
    }

    #[test]
    fn apply_is_idempotent() {
        let injector = ImportInjector::new(SCHEMA);
        let candidates = vec![
            ImportDecl::new("pkl:json"),
            ImportDecl::aliased("/a/llm.pkl", "llm"),
        ];
        let text = "amends \"res.pkl\"\nid = \"x\"\nprompt = \"@(llm.response(\\\"y\\\"))\"\n";

        let once = injector.apply(text, &candidates).unwrap();
        assert!(once.contains("import \"/a/llm.pkl\" as llm"));
        assert!(once.contains("\\(llm.response"));
        assert!(injector.apply(&once, &candidates).is_none());
    }

    #[test]
    fn apply_without_header_is_none() {
        let injector = ImportInjector::new(SCHEMA);
        assert!(injector.apply("id = \"x\"\n", &[ImportDecl::new("pkl:json")]).is_none());
    }

    #[test]
    fn interpolation_can_be_disabled() {
        let injector = ImportInjector::new(SCHEMA).with_interpolation(false);
        let out = injector
            .apply("amends \"r\"\nx = \"@(y)\"", &[ImportDecl::new("pkl:json")])
            .unwrap();
        assert!(out.contains("@(y)"));
    }

    #[tokio::test]
    async fn inject_twice_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        touch(&ctx.output_record(ActionKind::Chat));
        let file = dir.path().join("res.pkl");
        std::fs::write(&file, "amends \"res.pkl\"\n\nid = \"x\"\n").unwrap();

        let injector = ImportInjector::new(SCHEMA);
        assert!(injector.inject(&file, &ctx).await.unwrap());
        let once = std::fs::read(&file).unwrap();
        assert!(!injector.inject(&file, &ctx).await.unwrap());
        let twice = std::fs::read(&file).unwrap();
        assert_eq!(once, twice);

        let text = String::from_utf8(once).unwrap();
        assert!(text.starts_with("amends \"res.pkl\"\nimport \"pkl:json\"\n"));
        assert!(text.contains("__llm_output.pkl\" as llm"));
    }

    #[tokio::test]
    async fn inject_leaves_headerless_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let file = dir.path().join("bare.pkl");
        std::fs::write(&file, "id = \"x\"\n").unwrap();

        assert!(!ImportInjector::new(SCHEMA).inject(&file, &ctx).await.unwrap());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "id = \"x\"\n");
    }
}
