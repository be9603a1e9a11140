use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_class_groups_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "classGroups": [] }));
    };

    // Include basic counts so the UI can show a useful dashboard.
    // Use correlated subqueries to avoid double-counting from joins.
    let mut stmt = match conn.prepare(
        "SELECT
           cg.id,
           cg.name,
           (SELECT COUNT(*) FROM courses c WHERE c.class_group_id = cg.id) AS course_count,
           (SELECT COUNT(*)
              FROM schedule_slots s
              JOIN courses c ON c.id = s.course_id
             WHERE c.class_group_id = cg.id) AS slot_count
         FROM class_groups cg
         ORDER BY cg.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let course_count: i64 = row.get(2)?;
            let slot_count: i64 = row.get(3)?;
            Ok(json!({
                "id": id,
                "name": name,
                "courseCount": course_count,
                "slotCount": slot_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(class_groups) => ok(&req.id, json!({ "classGroups": class_groups })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_class_groups_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let class_group_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO class_groups(id, name) VALUES(?, ?)",
        (&class_group_id, &name),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "class_groups" })),
        );
    }

    state.cache.invalidate_for("classGroups.create");
    ok(&req.id, json!({ "classGroupId": class_group_id, "name": name }))
}

fn handle_class_groups_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let class_group_id = match req.params.get("classGroupId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classGroupId", None),
    };

    let exists: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM class_groups WHERE id = ?",
            [&class_group_id],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    if exists.is_none() {
        return err(&req.id, "not_found", "class group not found", None);
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    // Explicitly delete in dependency order (no ON DELETE CASCADE).
    if let Err(e) = tx.execute(
        "DELETE FROM schedule_slots
         WHERE course_id IN (SELECT id FROM courses WHERE class_group_id = ?)",
        [&class_group_id],
    ) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "schedule_slots" })),
        );
    }

    if let Err(e) = tx.execute(
        "DELETE FROM courses WHERE class_group_id = ?",
        [&class_group_id],
    ) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "courses" })),
        );
    }

    if let Err(e) = tx.execute("DELETE FROM class_groups WHERE id = ?", [&class_group_id]) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "class_groups" })),
        );
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    state.cache.invalidate_for("classGroups.delete");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classGroups.list" => Some(handle_class_groups_list(state, req)),
        "classGroups.create" => Some(handle_class_groups_create(state, req)),
        "classGroups.delete" => Some(handle_class_groups_delete(state, req)),
        _ => None,
    }
}
