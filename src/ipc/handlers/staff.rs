use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_staff_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "staff": [] }));
    };

    let mut stmt = match conn.prepare(
        "SELECT id, last_name, first_name FROM staff ORDER BY last_name, first_name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let last_name: String = row.get(1)?;
            let first_name: String = row.get(2)?;
            Ok(json!({
                "id": id,
                "lastName": last_name,
                "firstName": first_name
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(staff) => ok(&req.id, json!({ "staff": staff })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_staff_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let last_name = match req.params.get("lastName").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing lastName", None),
    };
    let first_name = match req.params.get("firstName").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing firstName", None),
    };
    if last_name.is_empty() {
        return err(&req.id, "bad_params", "lastName must not be empty", None);
    }

    let staff_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO staff(id, last_name, first_name) VALUES(?, ?, ?)",
        (&staff_id, &last_name, &first_name),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "staff" })),
        );
    }

    state.cache.invalidate_for("staff.create");
    ok(
        &req.id,
        json!({ "staffId": staff_id, "lastName": last_name, "firstName": first_name }),
    )
}

fn handle_staff_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let staff_id = match req.params.get("staffId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing staffId", None),
    };

    let in_use: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM courses WHERE teacher_id = ? LIMIT 1",
            [&staff_id],
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
            "staff member is referenced by existing courses",
            None,
        );
    }

    match conn.execute("DELETE FROM staff WHERE id = ?", [&staff_id]) {
        Ok(0) => err(&req.id, "not_found", "staff member not found", None),
        Ok(_) => {
            state.cache.invalidate_for("staff.delete");
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "staff" })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "staff.list" => Some(handle_staff_list(state, req)),
        "staff.create" => Some(handle_staff_create(state, req)),
        "staff.delete" => Some(handle_staff_delete(state, req)),
        _ => None,
    }
}
