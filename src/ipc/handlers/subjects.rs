use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "subjects": [] }));
    };

    let mut stmt = match conn.prepare("SELECT id, name FROM subjects ORDER BY name") {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            Ok(json!({ "id": id, "name": name }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }

    let subject_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO subjects(id, name) VALUES(?, ?)",
        (&subject_id, &name),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "subjects" })),
        );
    }

    state.cache.invalidate_for("subjects.create");
    ok(&req.id, json!({ "subjectId": subject_id, "name": name }))
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let subject_id = match req.params.get("subjectId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing subjectId", None),
    };

    let in_use: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM courses WHERE subject_id = ? LIMIT 1",
            [&subject_id],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if in_use.is_some() {
        return err(
            &req.id,
            "in_use",
            "subject is referenced by existing courses",
            None,
        );
    }

    match conn.execute("DELETE FROM subjects WHERE id = ?", [&subject_id]) {
        Ok(0) => err(&req.id, "not_found", "subject not found", None),
        Ok(_) => {
            state.cache.invalidate_for("subjects.delete");
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "subjects" })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.create" => Some(handle_subjects_create(state, req)),
        "subjects.delete" => Some(handle_subjects_delete(state, req)),
        _ => None,
    }
}
