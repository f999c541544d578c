//! Per-request working files: signals, staged project copy, output records.

use agentflow_core::{ActionKind, Error, ResponseFormat, Result};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::context::RequestContext;
use crate::descriptor::schema_uri;

/// Remove every flag and rendered response left in the request's api dir.
pub fn clear_signals(ctx: &RequestContext) -> Result<()> {
    for format in ResponseFormat::PRIORITY {
        remove_file_if_exists(&ctx.flag_file(format))?;
        remove_file_if_exists(&ctx.target_file(format))?;
    }
    Ok(())
}

/// Announce the route's response format for this request.
pub fn create_flag(ctx: &RequestContext) -> Result<()> {
    std::fs::create_dir_all(&ctx.api_dir).map_err(|e| Error::io(&ctx.api_dir, e))?;
    let flag = ctx.flag_file(ctx.response_format);
    std::fs::write(&flag, b"").map_err(|e| Error::io(&flag, e))
}

/// Copy the pristine project into the request's agent dir, replacing any
/// earlier copy. Run and output directories nested in the project are never
/// copied into themselves.
pub fn stage_workflow(ctx: &RequestContext) -> Result<()> {
    remove_dir_if_exists(&ctx.agent_dir)?;

    let excluded: Vec<&Path> = [ctx.agent_dir.parent(), Some(ctx.action_dir.as_path())]
        .into_iter()
        .flatten()
        .filter(|dir| dir.starts_with(&ctx.project_dir) && **dir != *ctx.project_dir)
        .collect();

    let walk = WalkDir::new(&ctx.project_dir)
        .into_iter()
        .filter_entry(|e| !excluded.iter().any(|dir| *dir == e.path()));
    for entry in walk {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(&ctx.project_dir).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            Error::io(path, source)
        })?;

        let relative = entry
            .path()
            .strip_prefix(&ctx.project_dir)
            .map_err(|e| Error::Config {
                message: format!("{} escapes the project dir: {e}", entry.path().display()),
            })?;
        let target = ctx.agent_dir.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| Error::io(&target, e))?;
        }
    }

    debug!(
        request_id = %ctx.request_id,
        from = %ctx.project_dir.display(),
        to = %ctx.agent_dir.display(),
        "Workflow staged"
    );
    Ok(())
}

/// Create each kind's output record for this request unless it exists.
pub fn prepare_output_records(ctx: &RequestContext, schema_package: &str) -> Result<()> {
    for kind in ActionKind::ALL {
        let record = ctx.output_record(kind);
        if record.exists() {
            continue;
        }
        if let Some(parent) = record.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let body = format!(
            "extends \"{}\"\n\n{} {{\n}}\n",
            schema_uri(schema_package, kind.schema_file()),
            kind.record_block()
        );
        std::fs::write(&record, body).map_err(|e| Error::io(&record, e))?;
    }
    Ok(())
}

/// Remove everything this request wrote. Failures are logged, not returned.
pub fn cleanup(ctx: &RequestContext) {
    let mut leftovers = Vec::new();
    if let Err(e) = remove_dir_if_exists(&ctx.agent_dir) {
        leftovers.push(e);
    }
    if let Err(e) = remove_dir_if_exists(&ctx.api_dir) {
        leftovers.push(e);
    }
    for kind in ActionKind::ALL {
        if let Err(e) = remove_file_if_exists(&ctx.output_record(kind)) {
            leftovers.push(e);
        }
    }
    for e in leftovers {
        warn!(request_id = %ctx.request_id, error = %e, "Cleanup incomplete");
    }
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RouteTemplate;

    fn context(root: &Path, format: ResponseFormat) -> RequestContext {
        RouteTemplate {
            route_path: "/run".into(),
            project_dir: root.join("project"),
            workflow_dir: root.join("workflow"),
            action_dir: root.join("action"),
            response_format: format,
        }
        .request_with_id("req-1")
    }

    #[test]
    fn flag_replaces_stale_signals() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), ResponseFormat::Yaml);
        std::fs::create_dir_all(&ctx.api_dir).unwrap();
        std::fs::write(ctx.flag_file(ResponseFormat::Json), "").unwrap();
        std::fs::write(ctx.target_file(ResponseFormat::Json), "{}").unwrap();

        clear_signals(&ctx).unwrap();
        create_flag(&ctx).unwrap();

        assert!(ctx.flag_file(ResponseFormat::Yaml).exists());
        assert!(!ctx.flag_file(ResponseFormat::Json).exists());
        assert!(!ctx.target_file(ResponseFormat::Json).exists());
    }

    #[test]
    fn clear_signals_without_api_dir_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        clear_signals(&context(dir.path(), ResponseFormat::Json)).unwrap();
    }

    #[test]
    fn staging_copies_the_project_tree() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), ResponseFormat::Json);
        let resources = ctx.project_dir.join("resources");
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::write(resources.join("a.pkl"), "id = \"a\"").unwrap();
        std::fs::write(ctx.project_dir.join("workflow.pkl"), "name = \"w\"").unwrap();

        std::fs::create_dir_all(&ctx.agent_dir).unwrap();
        std::fs::write(ctx.agent_dir.join("stale.pkl"), "").unwrap();

        stage_workflow(&ctx).unwrap();

        assert_eq!(
            std::fs::read_to_string(ctx.resources_dir().join("a.pkl")).unwrap(),
            "id = \"a\""
        );
        assert!(ctx.agent_dir.join("workflow.pkl").exists());
        assert!(!ctx.agent_dir.join("stale.pkl").exists());
    }

    #[test]
    fn staging_skips_run_dirs_nested_in_the_project() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project");
        let ctx = RouteTemplate {
            route_path: "/run".into(),
            project_dir: project.clone(),
            workflow_dir: project.join("runs"),
            action_dir: project.join("actions"),
            response_format: ResponseFormat::Json,
        }
        .request_with_id("r1");
        std::fs::create_dir_all(project.join("resources")).unwrap();
        std::fs::write(project.join("resources/a.pkl"), "id = \"a\"").unwrap();
        std::fs::create_dir_all(project.join("runs/other")).unwrap();
        std::fs::write(project.join("runs/other/leftover.pkl"), "").unwrap();
        std::fs::create_dir_all(project.join("actions/exec")).unwrap();

        stage_workflow(&ctx).unwrap();

        assert!(ctx.resources_dir().join("a.pkl").exists());
        assert!(!ctx.agent_dir.join("runs").exists());
        assert!(!ctx.agent_dir.join("actions").exists());
    }

    #[test]
    fn output_records_are_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), ResponseFormat::Json);
        prepare_output_records(&ctx, "package://s/core@1").unwrap();

        let exec = std::fs::read_to_string(ctx.output_record(ActionKind::Exec)).unwrap();
        assert_eq!(exec, "extends \"package://s/core@1#/Exec.pkl\"\n\nresources {\n}\n");
        let data = std::fs::read_to_string(ctx.output_record(ActionKind::Data)).unwrap();
        assert!(data.contains("files {\n}"));

        std::fs::write(ctx.output_record(ActionKind::Exec), "kept").unwrap();
        prepare_output_records(&ctx, "package://s/core@1").unwrap();
        assert_eq!(
            std::fs::read_to_string(ctx.output_record(ActionKind::Exec)).unwrap(),
            "kept"
        );
    }

    #[test]
    fn cleanup_removes_request_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), ResponseFormat::Json);
        std::fs::create_dir_all(&ctx.project_dir).unwrap();
        std::fs::write(ctx.project_dir.join("workflow.pkl"), "").unwrap();
        stage_workflow(&ctx).unwrap();
        create_flag(&ctx).unwrap();
        prepare_output_records(&ctx, "package://s/core@1").unwrap();

        cleanup(&ctx);

        assert!(!ctx.agent_dir.exists());
        assert!(!ctx.api_dir.exists());
        assert!(!ctx.output_record(ActionKind::Chat).exists());
        assert!(ctx.project_dir.join("workflow.pkl").exists());
    }
}
