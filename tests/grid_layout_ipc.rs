
use serde_json::json;
use test_support::{request_err, request_ok, seed_course, spawn_sidecar, temp_dir};

fn bands_for_day(grid: &serde_json::Value, day: i64) -> Vec<serde_json::Value> {
    grid.get("days")
        .and_then(|v| v.as_array())
        .expect("days")
        .iter()
        .find(|d| d.get("dayOfWeek").and_then(|v| v.as_i64()) == Some(day))
        .and_then(|d| d.get("bands"))
        .and_then(|v| v.as_array())
        .cloned()
        .expect("bands")
}

#[test]
fn empty_class_group_renders_empty_grid() {
    let workspace = temp_dir("timetabled-grid-empty");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let cg = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "classGroups.create",
        json!({ "name": "Empty 7A" }),
    );
    let class_group_id = cg
        .get("classGroupId")
        .and_then(|v| v.as_str())
        .expect("classGroupId");

    let grid = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "schedule.grid.get",
        json!({ "classGroupId": class_group_id }),
    );

    let time_rows = grid.get("timeRows").and_then(|v| v.as_array()).expect("timeRows");
    assert_eq!(time_rows.len(), 21);
    assert_eq!(time_rows[0], json!("08:00"));
    assert_eq!(time_rows[20], json!("18:00"));

    let days = grid.get("days").and_then(|v| v.as_array()).expect("days");
    assert_eq!(days.len(), 7);
    for day in days {
        let bands = day.get("bands").and_then(|v| v.as_array()).expect("bands");
        assert!(bands.is_empty());
    }

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn band_geometry_follows_pixel_formula() {
    let workspace = temp_dir("timetabled-grid-geometry");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let (class_group_id, course_id) = seed_course(&mut stdin, &mut reader, "geo", "Physics");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "schedule.slots.create",
        json!({
            "courseId": course_id,
            "dayOfWeek": 0,
            "startTime": "09:00",
            "endTime": "09:45",
            "classroom": "101"
        }),
    );

    // Default geometry: origin 08:00, 60px per half hour.
    let grid = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "schedule.grid.get",
        json!({ "classGroupId": class_group_id }),
    );
    let bands = bands_for_day(&grid, 0);
    assert_eq!(bands.len(), 1);
    let band = &bands[0];
    assert_eq!(band.get("topPx").and_then(|v| v.as_f64()), Some(120.0));
    assert_eq!(band.get("heightPx").and_then(|v| v.as_f64()), Some(90.0));
    // The slot lives in exactly one row: the half-hour bucket of its start.
    assert_eq!(band.get("rowIndex").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(band.get("courseName").and_then(|v| v.as_str()), Some("Physics"));
    assert_eq!(band.get("conflict").and_then(|v| v.as_bool()), Some(false));

    // It appears nowhere else, even though it spans two half-hour rows.
    let total: usize = (0..7).map(|d| bands_for_day(&grid, d).len()).sum();
    assert_eq!(total, 1);

    // Custom geometry rescales offsets.
    let grid = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "schedule.grid.get",
        json!({
            "classGroupId": class_group_id,
            "dayOriginTime": "09:00",
            "rowHeightPx": 40.0
        }),
    );
    let bands = bands_for_day(&grid, 0);
    assert_eq!(bands[0].get("topPx").and_then(|v| v.as_f64()), Some(0.0));
    assert_eq!(bands[0].get("heightPx").and_then(|v| v.as_f64()), Some(60.0));
    assert_eq!(bands[0].get("rowIndex").and_then(|v| v.as_u64()), Some(0));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn grid_rejects_bad_geometry_and_unknown_class_group() {
    let workspace = temp_dir("timetabled-grid-bad");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let cg = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "classGroups.create",
        json!({ "name": "8C" }),
    );
    let class_group_id = cg
        .get("classGroupId")
        .and_then(|v| v.as_str())
        .expect("classGroupId");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "schedule.grid.get",
        json!({ "classGroupId": "nope" }),
    );
    assert_eq!(code, "not_found");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "schedule.grid.get",
        json!({ "classGroupId": class_group_id, "rowHeightPx": 0.0 }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "schedule.grid.get",
        json!({
            "classGroupId": class_group_id,
            "dayOriginTime": "18:00",
            "dayEndTime": "08:00"
        }),
    );
    assert_eq!(code, "bad_params");

    let _ = std::fs::remove_dir_all(workspace);
}
