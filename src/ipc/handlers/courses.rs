use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use super::slots::HandlerErr;

fn require_row(
    conn: &Connection,
    table: &'static str,
    id_value: &str,
) -> Result<(), HandlerErr> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    let found: Option<i64> = conn
        .query_row(&sql, [id_value], |r| r.get(0))
        .optional()
        .map_err(HandlerErr::db)?;
    if found.is_none() {
        return Err(HandlerErr {
            code: "not_found",
            message: format!("{} row not found", table),
            details: Some(json!({ "table": table, "id": id_value })),
        });
    }
    Ok(())
}

fn course_row_json(row: &rusqlite::Row<'_>) -> rusqlite::Result<serde_json::Value> {
    let id: String = row.get(0)?;
    let class_group_id: String = row.get(1)?;
    let subject_id: String = row.get(2)?;
    let teacher_id: String = row.get(3)?;
    let name: String = row.get(4)?;
    let is_optional: i64 = row.get(5)?;
    let created_at: Option<String> = row.get(6)?;
    let updated_at: Option<String> = row.get(7)?;
    let subject_name: String = row.get(8)?;
    let teacher_last: String = row.get(9)?;
    let teacher_first: String = row.get(10)?;
    let class_group_name: String = row.get(11)?;
    Ok(json!({
        "id": id,
        "classGroupId": class_group_id,
        "subjectId": subject_id,
        "teacherId": teacher_id,
        "name": name,
        "isOptional": is_optional != 0,
        "createdAt": created_at,
        "updatedAt": updated_at,
        "subjectName": subject_name,
        "teacherName": format!("{} {}", teacher_first, teacher_last).trim().to_string(),
        "classGroupName": class_group_name,
    }))
}

const COURSE_SELECT: &str = "SELECT
       c.id, c.class_group_id, c.subject_id, c.teacher_id, c.name,
       c.is_optional, c.created_at, c.updated_at,
       sub.name, st.last_name, st.first_name, cg.name
     FROM courses c
     JOIN subjects sub ON sub.id = c.subject_id
     JOIN staff st ON st.id = c.teacher_id
     JOIN class_groups cg ON cg.id = c.class_group_id";

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "courses": [] }));
    };

    let class_group_id = req.params.get("classGroupId").and_then(|v| v.as_str());
    let teacher_id = req.params.get("teacherId").and_then(|v| v.as_str());

    let mut sql = String::from(COURSE_SELECT);
    let mut binds: Vec<String> = Vec::new();
    let mut clauses: Vec<&str> = Vec::new();
    if let Some(cg) = class_group_id {
        clauses.push("c.class_group_id = ?");
        binds.push(cg.to_string());
    }
    if let Some(t) = teacher_id {
        clauses.push("c.teacher_id = ?");
        binds.push(t.to_string());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY c.name");

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map(rusqlite::params_from_iter(binds.iter()), course_row_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(courses) => ok(&req.id, json!({ "courses": courses })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let class_group_id = match req.params.get("classGroupId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classGroupId", None),
    };
    let subject_id = match req.params.get("subjectId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing subjectId", None),
    };
    let teacher_id = match req.params.get("teacherId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing teacherId", None),
    };
    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    let is_optional = req
        .params
        .get("isOptional")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    for (table, id_value) in [
        ("class_groups", class_group_id.as_str()),
        ("subjects", subject_id.as_str()),
        ("staff", teacher_id.as_str()),
    ] {
        if let Err(e) = require_row(conn, table, id_value) {
            return e.response(&req.id);
        }
    }

    let course_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    if let Err(e) = conn.execute(
        "INSERT INTO courses(id, class_group_id, subject_id, teacher_id, name,
                             is_optional, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &course_id,
            &class_group_id,
            &subject_id,
            &teacher_id,
            &name,
            is_optional as i64,
            &now,
            &now,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "courses" })),
        );
    }

    state.cache.invalidate_for("courses.create");
    ok(&req.id, json!({ "courseId": course_id, "name": name }))
}

fn handle_courses_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch", None);
    };

    if let Err(e) = require_row(conn, "courses", &course_id) {
        return e.response(&req.id);
    }

    let mut sets: Vec<&str> = Vec::new();
    let mut binds: Vec<rusqlite::types::Value> = Vec::new();

    if let Some(name) = patch.get("name").and_then(|v| v.as_str()) {
        let name = name.trim();
        if name.is_empty() {
            return err(&req.id, "bad_params", "name must not be empty", None);
        }
        sets.push("name = ?");
        binds.push(rusqlite::types::Value::Text(name.to_string()));
    }
    if let Some(subject_id) = patch.get("subjectId").and_then(|v| v.as_str()) {
        if let Err(e) = require_row(conn, "subjects", subject_id) {
            return e.response(&req.id);
        }
        sets.push("subject_id = ?");
        binds.push(rusqlite::types::Value::Text(subject_id.to_string()));
    }
    if let Some(teacher_id) = patch.get("teacherId").and_then(|v| v.as_str()) {
        if let Err(e) = require_row(conn, "staff", teacher_id) {
            return e.response(&req.id);
        }
        sets.push("teacher_id = ?");
        binds.push(rusqlite::types::Value::Text(teacher_id.to_string()));
    }
    if let Some(class_group_id) = patch.get("classGroupId").and_then(|v| v.as_str()) {
        if let Err(e) = require_row(conn, "class_groups", class_group_id) {
            return e.response(&req.id);
        }
        sets.push("class_group_id = ?");
        binds.push(rusqlite::types::Value::Text(class_group_id.to_string()));
    }
    if let Some(is_optional) = patch.get("isOptional").and_then(|v| v.as_bool()) {
        sets.push("is_optional = ?");
        binds.push(rusqlite::types::Value::Integer(is_optional as i64));
    }

    if sets.is_empty() {
        return err(&req.id, "bad_params", "patch has no recognized fields", None);
    }

    sets.push("updated_at = ?");
    binds.push(rusqlite::types::Value::Text(Utc::now().to_rfc3339()));
    binds.push(rusqlite::types::Value::Text(course_id.clone()));

    let sql = format!("UPDATE courses SET {} WHERE id = ?", sets.join(", "));
    if let Err(e) = conn.execute(&sql, rusqlite::params_from_iter(binds)) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "courses" })),
        );
    }

    state.cache.invalidate_for("courses.update");
    ok(&req.id, json!({ "ok": true }))
}

fn handle_courses_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };

    if let Err(e) = require_row(conn, "courses", &course_id) {
        return e.response(&req.id);
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    if let Err(e) = tx.execute("DELETE FROM schedule_slots WHERE course_id = ?", [&course_id]) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "schedule_slots" })),
        );
    }
    if let Err(e) = tx.execute("DELETE FROM courses WHERE id = ?", [&course_id]) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "courses" })),
        );
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    state.cache.invalidate_for("courses.delete");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_courses_list(state, req)),
        "courses.create" => Some(handle_courses_create(state, req)),
        "courses.update" => Some(handle_courses_update(state, req)),
        "courses.delete" => Some(handle_courses_delete(state, req)),
        _ => None,
    }
}
