use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::timegrid::{self, GridGeometry};
use rusqlite::OptionalExtension;
use serde_json::json;

use super::slots::{apply_slot_update, list_slots, slot_json, HandlerErr, SlotRow};

fn parse_geometry(params: &serde_json::Value) -> Result<GridGeometry, HandlerErr> {
    let mut geo = GridGeometry::default();

    let bad_time = |e: timegrid::BadTime| HandlerErr {
        code: "bad_params",
        message: e.to_string(),
        details: None,
    };
    if let Some(raw) = params.get("dayOriginTime").and_then(|v| v.as_str()) {
        geo.day_origin_min = timegrid::parse_time_minutes(raw).map_err(bad_time)?;
    }
    if let Some(raw) = params.get("dayEndTime").and_then(|v| v.as_str()) {
        geo.day_end_min = timegrid::parse_time_minutes(raw).map_err(bad_time)?;
    }
    if geo.day_end_min <= geo.day_origin_min {
        return Err(HandlerErr {
            code: "bad_params",
            message: "dayEndTime must be after dayOriginTime".to_string(),
            details: None,
        });
    }
    if let Some(h) = params.get("rowHeightPx").and_then(|v| v.as_f64()) {
        if !(h > 0.0) {
            return Err(HandlerErr {
                code: "bad_params",
                message: "rowHeightPx must be positive".to_string(),
                details: Some(json!({ "rowHeightPx": h })),
            });
        }
        geo.row_height_px = h;
    }
    Ok(geo)
}

fn band_json(geo: &GridGeometry, slot: &SlotRow, conflict: bool) -> Result<serde_json::Value, HandlerErr> {
    let bad_data = |e: timegrid::BadTime| HandlerErr {
        code: "bad_data",
        message: format!("stored slot time is invalid: {}", e),
        details: Some(json!({ "slotId": slot.id })),
    };
    let start_min = timegrid::parse_time_minutes(&slot.start_time).map_err(bad_data)?;
    let end_min = timegrid::parse_time_minutes(&slot.end_time).map_err(bad_data)?;
    let band = geo.band(start_min, end_min);

    let mut obj = slot_json(slot);
    obj.insert("slotId".into(), json!(slot.id));
    obj.remove("id");
    obj.insert("rowIndex".into(), json!(geo.row_index(start_min)));
    obj.insert("topPx".into(), json!(band.top_px));
    obj.insert("heightPx".into(), json!(band.height_px));
    obj.insert("conflict".into(), json!(conflict));
    Ok(serde_json::Value::Object(obj))
}

fn handle_grid_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let class_group_id = match req.params.get("classGroupId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classGroupId", None),
    };
    let geo = match parse_geometry(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
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

    let cache_key = format!(
        "schedule.grid/{}/{}/{}/{}",
        class_group_id, geo.day_origin_min, geo.day_end_min, geo.row_height_px
    );
    if let Some(cached) = state.cache.get(&cache_key) {
        return ok(&req.id, cached.clone());
    }

    let rows = match list_slots(conn, None, Some(&class_group_id)) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let mut days: Vec<serde_json::Value> = Vec::with_capacity(timegrid::DAYS_PER_WEEK as usize);
    for day in 0..timegrid::DAYS_PER_WEEK {
        let mut bands: Vec<serde_json::Value> = Vec::new();
        for slot in rows.iter().filter(|s| s.day_of_week == day) {
            let conflict = state.slot_has_conflict(&slot.id);
            match band_json(&geo, slot, conflict) {
                Ok(b) => bands.push(b),
                Err(e) => return e.response(&req.id),
            }
        }
        days.push(json!({ "dayOfWeek": day, "bands": bands }));
    }

    let time_rows: Vec<String> = geo
        .row_starts()
        .into_iter()
        .map(timegrid::format_hhmm)
        .collect();

    let result = json!({
        "classGroupId": class_group_id,
        "geometry": {
            "dayOriginTime": timegrid::format_hhmm(geo.day_origin_min),
            "dayEndTime": timegrid::format_hhmm(geo.day_end_min),
            "rowHeightPx": geo.row_height_px,
            "rowMinutes": timegrid::ROW_MINUTES,
        },
        "timeRows": time_rows,
        "days": days,
    });
    state.cache.put(cache_key, result.clone());

    ok(&req.id, result)
}

fn handle_grid_drop(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let slot_id = match req.params.get("slotId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing slotId", None),
    };
    let target_day = match req.params.get("targetDay").and_then(|v| v.as_i64()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing targetDay", None),
    };
    let target_time = match req.params.get("targetTime").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing targetTime", None),
    };

    if let Err(e) = super::slots::validate_day_of_week(target_day) {
        return e.response(&req.id);
    }
    let target_start = match timegrid::parse_time_minutes(&target_time) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let existing = match super::slots::load_slot(conn, &slot_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let bad_data = |e: timegrid::BadTime| {
        err(
            &req.id,
            "bad_data",
            format!("stored slot time is invalid: {}", e),
            Some(json!({ "slotId": slot_id })),
        )
    };
    let start_min = match timegrid::parse_time_minutes(&existing.start_time) {
        Ok(v) => v,
        Err(e) => return bad_data(e),
    };
    let end_min = match timegrid::parse_time_minutes(&existing.end_time) {
        Ok(v) => v,
        Err(e) => return bad_data(e),
    };

    // The drop keeps the slot's duration; only day and start move.
    let (new_start, new_end) = timegrid::retarget(start_min, end_min, target_start);

    let mut patch = serde_json::Map::new();
    patch.insert("dayOfWeek".into(), json!(target_day));
    patch.insert(
        "startTime".into(),
        json!(timegrid::format_hhmmss(new_start)),
    );
    patch.insert("endTime".into(), json!(timegrid::format_hhmmss(new_end)));

    match apply_slot_update(conn, &slot_id, &patch) {
        Ok(slot) => {
            state.cache.invalidate_for("schedule.grid.drop");
            ok(&req.id, json!({ "slot": slot_json(&slot) }))
        }
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.grid.get" => Some(handle_grid_get(state, req)),
        "schedule.grid.drop" => Some(handle_grid_drop(state, req)),
        _ => None,
    }
}
