use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, ConflictPair, Request};
use crate::timegrid;
use serde_json::json;

use super::slots::{list_slots, slot_json, SlotRow};

pub const KIND_TEACHER: &str = "teacher";
pub const KIND_CLASSROOM: &str = "classroom";
pub const KIND_CLASS_GROUP: &str = "class_group";

/// Why two overlapping slots conflict, if they do. Kind precedence:
/// teacher, then classroom, then class group.
fn conflict_kind(a: &SlotRow, b: &SlotRow) -> Option<&'static str> {
    if a.teacher_id == b.teacher_id {
        return Some(KIND_TEACHER);
    }
    if !a.classroom.is_empty() && a.classroom == b.classroom {
        return Some(KIND_CLASSROOM);
    }
    if a.class_group_id == b.class_group_id {
        return Some(KIND_CLASS_GROUP);
    }
    None
}

fn handle_conflicts_check(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let slots = match list_slots(conn, None, None) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let mut minutes: Vec<(i64, i64)> = Vec::with_capacity(slots.len());
    for s in &slots {
        let parse = |raw: &str| {
            timegrid::parse_time_minutes(raw).map_err(|e| {
                err(
                    &req.id,
                    "bad_data",
                    format!("stored slot time is invalid: {}", e),
                    Some(json!({ "slotId": s.id })),
                )
            })
        };
        let start = match parse(&s.start_time) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let end = match parse(&s.end_time) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        minutes.push((start, end));
    }

    // Every unordered pair once; the slot count on one timetable is small
    // enough that the quadratic scan is not worth indexing.
    let mut pairs: Vec<ConflictPair> = Vec::new();
    let mut conflicts_json: Vec<serde_json::Value> = Vec::new();
    for i in 0..slots.len() {
        for j in (i + 1)..slots.len() {
            let (a, b) = (&slots[i], &slots[j]);
            if a.day_of_week != b.day_of_week {
                continue;
            }
            let (a_start, a_end) = minutes[i];
            let (b_start, b_end) = minutes[j];
            if !timegrid::ranges_overlap(a_start, a_end, b_start, b_end) {
                continue;
            }
            let Some(kind) = conflict_kind(a, b) else {
                continue;
            };
            pairs.push(ConflictPair {
                slot1_id: a.id.clone(),
                slot2_id: b.id.clone(),
                kind: kind.to_string(),
            });
            conflicts_json.push(json!({
                "slot1": slot_json(a),
                "slot2": slot_json(b),
                "kind": kind,
            }));
        }
    }

    let suggestions: Vec<&str> = if pairs.is_empty() {
        Vec::new()
    } else {
        vec![
            "Move one of the conflicting slots to a different time",
            "Assign a different teacher or classroom",
        ]
    };

    state.conflicts = pairs;
    state.cache.invalidate_for("schedule.conflicts.check");

    ok(
        &req.id,
        json!({
            "conflicts": conflicts_json,
            "suggestions": suggestions,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.conflicts.check" => Some(handle_conflicts_check(state, req)),
        _ => None,
    }
}
