use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::timegrid;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

pub(crate) struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }

    pub(crate) fn db(e: rusqlite::Error) -> Self {
        HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        }
    }
}

/// A slot row joined with its course, as every schedule surface needs it.
#[derive(Debug, Clone)]
pub(crate) struct SlotRow {
    pub id: String,
    pub course_id: String,
    pub course_name: String,
    pub class_group_id: String,
    pub teacher_id: String,
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    pub classroom: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

const SLOT_SELECT: &str = "SELECT
       s.id, s.course_id, c.name, c.class_group_id, c.teacher_id,
       s.day_of_week, s.start_time, s.end_time, s.classroom,
       s.created_at, s.updated_at
     FROM schedule_slots s
     JOIN courses c ON c.id = s.course_id";

fn slot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SlotRow> {
    Ok(SlotRow {
        id: row.get(0)?,
        course_id: row.get(1)?,
        course_name: row.get(2)?,
        class_group_id: row.get(3)?,
        teacher_id: row.get(4)?,
        day_of_week: row.get(5)?,
        start_time: row.get(6)?,
        end_time: row.get(7)?,
        classroom: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub(crate) fn slot_json(s: &SlotRow) -> serde_json::Map<String, serde_json::Value> {
    let mut obj = serde_json::Map::new();
    obj.insert("id".into(), json!(s.id));
    obj.insert("courseId".into(), json!(s.course_id));
    obj.insert("courseName".into(), json!(s.course_name));
    obj.insert("dayOfWeek".into(), json!(s.day_of_week));
    obj.insert("startTime".into(), json!(s.start_time));
    obj.insert("endTime".into(), json!(s.end_time));
    obj.insert(
        "classroom".into(),
        if s.classroom.is_empty() {
            serde_json::Value::Null
        } else {
            json!(s.classroom)
        },
    );
    obj.insert("createdAt".into(), json!(s.created_at));
    obj.insert("updatedAt".into(), json!(s.updated_at));
    obj
}

pub(crate) fn load_slot(conn: &Connection, slot_id: &str) -> Result<SlotRow, HandlerErr> {
    let sql = format!("{} WHERE s.id = ?", SLOT_SELECT);
    let row = conn
        .query_row(&sql, [slot_id], slot_from_row)
        .optional()
        .map_err(HandlerErr::db)?;
    row.ok_or_else(|| HandlerErr {
        code: "not_found",
        message: "schedule slot not found".to_string(),
        details: Some(json!({ "slotId": slot_id })),
    })
}

pub(crate) fn list_slots(
    conn: &Connection,
    course_id: Option<&str>,
    class_group_id: Option<&str>,
) -> Result<Vec<SlotRow>, HandlerErr> {
    let mut sql = String::from(SLOT_SELECT);
    let mut binds: Vec<String> = Vec::new();
    let mut clauses: Vec<&str> = Vec::new();
    if let Some(cid) = course_id {
        clauses.push("s.course_id = ?");
        binds.push(cid.to_string());
    }
    if let Some(cg) = class_group_id {
        clauses.push("c.class_group_id = ?");
        binds.push(cg.to_string());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY s.day_of_week, s.start_time, s.id");

    let mut stmt = conn.prepare(&sql).map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(binds.iter()), slot_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    Ok(rows)
}

/// Validated time range, normalized to the canonical "HH:MM:SS" form.
pub(crate) struct ValidatedTimes {
    pub start_min: i64,
    pub end_min: i64,
    pub start_time: String,
    pub end_time: String,
}

pub(crate) fn validate_day_of_week(day: i64) -> Result<i64, HandlerErr> {
    if !(0..timegrid::DAYS_PER_WEEK).contains(&day) {
        return Err(HandlerErr {
            code: "bad_params",
            message: "dayOfWeek must be in 0..=6 (0=Monday)".to_string(),
            details: Some(json!({ "dayOfWeek": day })),
        });
    }
    Ok(day)
}

pub(crate) fn validate_times(start_raw: &str, end_raw: &str) -> Result<ValidatedTimes, HandlerErr> {
    let bad = |e: timegrid::BadTime| HandlerErr {
        code: "bad_params",
        message: e.to_string(),
        details: None,
    };
    let start_min = timegrid::parse_time_minutes(start_raw).map_err(bad)?;
    let end_min = timegrid::parse_time_minutes(end_raw).map_err(bad)?;
    if end_min <= start_min {
        return Err(HandlerErr {
            code: "bad_params",
            message: "endTime must be after startTime".to_string(),
            details: Some(json!({ "startTime": start_raw, "endTime": end_raw })),
        });
    }
    Ok(ValidatedTimes {
        start_min,
        end_min,
        start_time: timegrid::format_hhmmss(start_min),
        end_time: timegrid::format_hhmmss(end_min),
    })
}

fn course_exists(conn: &Connection, course_id: &str) -> Result<(), HandlerErr> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM courses WHERE id = ?", [course_id], |r| {
            r.get(0)
        })
        .optional()
        .map_err(HandlerErr::db)?;
    if found.is_none() {
        return Err(HandlerErr {
            code: "not_found",
            message: "course not found".to_string(),
            details: Some(json!({ "courseId": course_id })),
        });
    }
    Ok(())
}

fn handle_slots_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "slots": [] }));
    };

    let course_id = req.params.get("courseId").and_then(|v| v.as_str());
    let class_group_id = req.params.get("classGroupId").and_then(|v| v.as_str());

    match list_slots(conn, course_id, class_group_id) {
        Ok(rows) => {
            let slots: Vec<_> = rows.iter().map(slot_json).collect();
            ok(&req.id, json!({ "slots": slots }))
        }
        Err(e) => e.response(&req.id),
    }
}

fn handle_slots_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let slot_id = match req.params.get("slotId").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing slotId", None),
    };
    match load_slot(conn, slot_id) {
        Ok(slot) => ok(&req.id, json!({ "slot": slot_json(&slot) })),
        Err(e) => e.response(&req.id),
    }
}

fn handle_slots_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };
    let day_of_week = match req.params.get("dayOfWeek").and_then(|v| v.as_i64()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing dayOfWeek", None),
    };
    let start_raw = match req.params.get("startTime").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing startTime", None),
    };
    let end_raw = match req.params.get("endTime").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing endTime", None),
    };
    let classroom = req
        .params
        .get("classroom")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    let day_of_week = match validate_day_of_week(day_of_week) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let times = match validate_times(start_raw, end_raw) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = course_exists(conn, &course_id) {
        return e.response(&req.id);
    }

    let slot_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    if let Err(e) = conn.execute(
        "INSERT INTO schedule_slots(id, course_id, day_of_week, start_time, end_time,
                                    classroom, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &slot_id,
            &course_id,
            day_of_week,
            &times.start_time,
            &times.end_time,
            &classroom,
            &now,
            &now,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "schedule_slots" })),
        );
    }

    state.cache.invalidate_for("schedule.slots.create");
    match load_slot(conn, &slot_id) {
        Ok(slot) => ok(&req.id, json!({ "slot": slot_json(&slot) })),
        Err(e) => e.response(&req.id),
    }
}

/// Apply a patch on top of an existing slot and write the merged,
/// re-validated row. Shared with the grid drop handler.
pub(crate) fn apply_slot_update(
    conn: &Connection,
    slot_id: &str,
    patch: &serde_json::Map<String, serde_json::Value>,
) -> Result<SlotRow, HandlerErr> {
    let existing = load_slot(conn, slot_id)?;

    let course_id = match patch.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => {
            course_exists(conn, v)?;
            v.to_string()
        }
        None => existing.course_id.clone(),
    };
    let day_of_week = match patch.get("dayOfWeek").and_then(|v| v.as_i64()) {
        Some(v) => validate_day_of_week(v)?,
        None => existing.day_of_week,
    };
    let start_raw = patch
        .get("startTime")
        .and_then(|v| v.as_str())
        .unwrap_or(&existing.start_time);
    let end_raw = patch
        .get("endTime")
        .and_then(|v| v.as_str())
        .unwrap_or(&existing.end_time);
    let times = validate_times(start_raw, end_raw)?;
    let classroom = match patch.get("classroom") {
        Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(_) => {
            return Err(HandlerErr {
                code: "bad_params",
                message: "classroom must be a string or null".to_string(),
                details: None,
            })
        }
        None => existing.classroom.clone(),
    };

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE schedule_slots
         SET course_id = ?, day_of_week = ?, start_time = ?, end_time = ?,
             classroom = ?, updated_at = ?
         WHERE id = ?",
        (
            &course_id,
            day_of_week,
            &times.start_time,
            &times.end_time,
            &classroom,
            &now,
            slot_id,
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "schedule_slots" })),
    })?;

    load_slot(conn, slot_id)
}

fn handle_slots_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let slot_id = match req.params.get("slotId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing slotId", None),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch", None);
    };

    match apply_slot_update(conn, &slot_id, patch) {
        Ok(slot) => {
            state.cache.invalidate_for("schedule.slots.update");
            ok(&req.id, json!({ "slot": slot_json(&slot) }))
        }
        Err(e) => e.response(&req.id),
    }
}

fn handle_slots_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let slot_id = match req.params.get("slotId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing slotId", None),
    };

    match conn.execute("DELETE FROM schedule_slots WHERE id = ?", [&slot_id]) {
        Ok(0) => err(&req.id, "not_found", "schedule slot not found", None),
        Ok(_) => {
            state.cache.invalidate_for("schedule.slots.delete");
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "schedule_slots" })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.slots.list" => Some(handle_slots_list(state, req)),
        "schedule.slots.get" => Some(handle_slots_get(state, req)),
        "schedule.slots.create" => Some(handle_slots_create(state, req)),
        "schedule.slots.update" => Some(handle_slots_update(state, req)),
        "schedule.slots.delete" => Some(handle_slots_delete(state, req)),
        _ => None,
    }
}
