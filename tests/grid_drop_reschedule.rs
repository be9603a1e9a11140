
use serde_json::json;
use test_support::{request_err, request_ok, seed_course, spawn_sidecar, temp_dir};

#[test]
fn drop_moves_slot_and_preserves_duration() {
    let workspace = temp_dir("timetabled-drop");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let (class_group_id, course_id) = seed_course(&mut stdin, &mut reader, "drop", "Geometry");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "schedule.slots.create",
        json!({
            "courseId": course_id,
            "dayOfWeek": 0,
            "startTime": "09:00",
            "endTime": "09:45",
            "classroom": "A1"
        }),
    );
    let slot_id = created
        .get("slot")
        .and_then(|s| s.get("id"))
        .and_then(|v| v.as_str())
        .expect("slot id")
        .to_string();

    // A 45-minute slot dropped on (day 2, 10:30) becomes 10:30-11:15.
    let dropped = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "schedule.grid.drop",
        json!({ "slotId": slot_id, "targetDay": 2, "targetTime": "10:30" }),
    );
    let slot = dropped.get("slot").expect("slot");
    assert_eq!(slot.get("dayOfWeek").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(slot.get("startTime").and_then(|v| v.as_str()), Some("10:30:00"));
    assert_eq!(slot.get("endTime").and_then(|v| v.as_str()), Some("11:15:00"));
    // The drop only moves the slot.
    assert_eq!(slot.get("classroom").and_then(|v| v.as_str()), Some("A1"));

    // The grid reflects the move immediately.
    let grid = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "schedule.grid.get",
        json!({ "classGroupId": class_group_id }),
    );
    let days = grid.get("days").and_then(|v| v.as_array()).expect("days");
    let day0 = days[0].get("bands").and_then(|v| v.as_array()).expect("bands");
    let day2 = days[2].get("bands").and_then(|v| v.as_array()).expect("bands");
    assert!(day0.is_empty());
    assert_eq!(day2.len(), 1);
    assert_eq!(
        day2[0].get("startTime").and_then(|v| v.as_str()),
        Some("10:30:00")
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn failed_drop_leaves_slot_unchanged() {
    let workspace = temp_dir("timetabled-drop-fail");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let (_cg, course_id) = seed_course(&mut stdin, &mut reader, "dropf", "Music");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "schedule.slots.create",
        json!({
            "courseId": course_id,
            "dayOfWeek": 1,
            "startTime": "09:00",
            "endTime": "10:00"
        }),
    );
    let slot_id = created
        .get("slot")
        .and_then(|s| s.get("id"))
        .and_then(|v| v.as_str())
        .expect("slot id")
        .to_string();

    // Dropping a 60-minute slot at 23:30 would end past midnight.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "schedule.grid.drop",
        json!({ "slotId": slot_id, "targetDay": 1, "targetTime": "23:30" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "schedule.grid.drop",
        json!({ "slotId": slot_id, "targetDay": 9, "targetTime": "10:00" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "schedule.grid.drop",
        json!({ "slotId": "missing", "targetDay": 1, "targetTime": "10:00" }),
    );
    assert_eq!(code, "not_found");

    // No partial updates from the failures above.
    let fetched = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "schedule.slots.get",
        json!({ "slotId": slot_id }),
    );
    let slot = fetched.get("slot").expect("slot");
    assert_eq!(slot.get("dayOfWeek").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(slot.get("startTime").and_then(|v| v.as_str()), Some("09:00:00"));
    assert_eq!(slot.get("endTime").and_then(|v| v.as_str()), Some("10:00:00"));

    let _ = std::fs::remove_dir_all(workspace);
}
