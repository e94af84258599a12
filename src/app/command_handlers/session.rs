use crate::app::command_support::{now_secs, AppContext};
use crate::canvas::{export_document, parse_document, DocumentError};
use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::ids::new_session_id;
use serde_json::json;
use std::fs;
use std::path::Path;

pub fn cmd_status(args: &[String], context: &AppContext) -> Result<String, String> {
    if !args.is_empty() {
        return Err("usage: status".to_string());
    }
    let session = context.open_session()?;
    Ok(format!(
        "session_id={}\n{}",
        session.session_id(),
        session.status_summary()
    ))
}

pub fn cmd_export(args: &[String], context: &AppContext) -> Result<String, String> {
    if args.len() > 1 {
        return Err("usage: export [path]".to_string());
    }
    let state = context.load_state()?;
    let body = export_document(&state)
        .to_json_pretty()
        .map_err(|err| err.to_string())?;
    let Some(target) = args.first() else {
        return Ok(body);
    };
    let path = Path::new(target);
    atomic_write_file(path, format!("{body}\n").as_bytes())
        .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    context.log.info(
        "configuration_exported",
        &[("path", json!(path.display().to_string()))],
    );
    Ok(format!("exported configuration to {}", path.display()))
}

pub fn cmd_import(args: &[String], context: &AppContext) -> Result<String, String> {
    if args.len() != 1 {
        return Err("usage: import <path>".to_string());
    }
    let path = Path::new(&args[0]);
    let raw =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let state = parse_document(&raw).map_err(|err| match err {
        DocumentError::Invalid { issues } => format!(
            "{} is not a valid configuration:\n{}",
            path.display(),
            issues
                .iter()
                .map(|issue| format!("  - {issue}"))
                .collect::<Vec<_>>()
                .join("\n")
        ),
        other => format!("{}: {other}", path.display()),
    })?;

    let session_id = new_session_id(now_secs())?;
    context
        .session_store()
        .save(&session_id, &state)
        .map_err(|err| err.to_string())?;
    context.log.info(
        "configuration_imported",
        &[
            ("path", json!(path.display().to_string())),
            ("session_id", json!(session_id)),
        ],
    );
    let session = context.open_session()?;
    Ok(format!(
        "imported configuration from {}\n{}",
        path.display(),
        session.status_summary()
    ))
}

pub fn cmd_reset(args: &[String], context: &AppContext) -> Result<String, String> {
    if !args.is_empty() {
        return Err("usage: reset".to_string());
    }
    context
        .session_store()
        .start_fresh()
        .map_err(|err| err.to_string())?;
    Ok("session reset".to_string())
}
