use crate::backup;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn resolve_workspace(state: &AppState, req: &Request) -> Result<PathBuf, serde_json::Value> {
    if let Some(p) = req.params.get("workspacePath").and_then(|v| v.as_str()) {
        return Ok(PathBuf::from(p));
    }
    match state.workspace.as_ref() {
        Some(p) => Ok(p.clone()),
        None => Err(err(
            &req.id,
            "no_workspace",
            "select a workspace first or pass workspacePath",
            None,
        )),
    }
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let workspace = match resolve_workspace(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) => PathBuf::from(v),
        None => return err(&req.id, "bad_params", "missing outPath", None),
    };

    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "dbSha256": summary.db_sha256,
                "outPath": out_path.to_string_lossy(),
            }),
        ),
        Err(e) => err(&req.id, "backup_export_failed", format!("{e:?}"), None),
    }
}

fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let workspace = match resolve_workspace(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let in_path = match req.params.get("inPath").and_then(|v| v.as_str()) {
        Some(v) => PathBuf::from(v),
        None => return err(&req.id, "bad_params", "missing inPath", None),
    };

    let summary = match backup::import_workspace_bundle(&in_path, &workspace) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "backup_import_failed", format!("{e:?}"), None),
    };

    // If the restored database is the one currently open, the live
    // connection points at the replaced file; reopen it.
    if state.workspace.as_deref() == Some(workspace.as_path()) {
        match db::open_db(&workspace) {
            Ok(conn) => {
                state.db = Some(conn);
                state.cache.clear();
                state.conflicts.clear();
            }
            Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
        }
    }

    ok(
        &req.id,
        json!({ "bundleFormatDetected": summary.bundle_format_detected }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_backup_export(state, req)),
        "backup.import" => Some(handle_backup_import(state, req)),
        _ => None,
    }
}
