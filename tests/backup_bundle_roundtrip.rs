
use serde_json::json;
use test_support::{request_err, request_ok, seed_course, spawn_sidecar, temp_dir};

#[test]
fn export_then_import_restores_earlier_data() {
    let workspace = temp_dir("timetabled-backup-rt");
    let bundle = workspace.join("before-edits.ttbackup.zip");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let (_cg, course_id) = seed_course(&mut stdin, &mut reader, "bk", "Geography");
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "schedule.slots.create",
        json!({
            "courseId": course_id,
            "dayOfWeek": 0,
            "startTime": "08:00",
            "endTime": "08:45"
        }),
    );
    let slot_id = created
        .get("slot")
        .and_then(|s| s.get("id"))
        .and_then(|v| v.as_str())
        .expect("slot id")
        .to_string();

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "backup.export",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(
        exported.get("bundleFormat").and_then(|v| v.as_str()),
        Some("timetable-workspace-v1")
    );
    assert!(exported
        .get("dbSha256")
        .and_then(|v| v.as_str())
        .map(|s| s.len() == 64)
        .unwrap_or(false));
    assert!(bundle.is_file());

    // Mutate after the snapshot, then restore it.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "schedule.slots.delete",
        json!({ "slotId": slot_id }),
    );
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "schedule.slots.list",
        json!({ "courseId": course_id }),
    );
    assert_eq!(
        listed.get("slots").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "backup.import",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(
        imported
            .get("bundleFormatDetected")
            .and_then(|v| v.as_str()),
        Some("timetable-workspace-v1")
    );

    // The deleted slot is back, served by the reopened connection.
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "schedule.slots.list",
        json!({ "courseId": course_id }),
    );
    let slots = listed.get("slots").and_then(|v| v.as_array()).expect("slots");
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].get("id").and_then(|v| v.as_str()), Some(slot_id.as_str()));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn import_rejects_bundles_that_are_not_ours() {
    let workspace = temp_dir("timetabled-backup-bad");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Not a zip at all.
    let garbage = workspace.join("not-a-bundle.zip");
    std::fs::write(&garbage, b"definitely not a zip archive").expect("write garbage");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "backup.import",
        json!({ "inPath": garbage.to_string_lossy() }),
    );
    assert_eq!(code, "backup_import_failed");

    // Missing file.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "backup.import",
        json!({ "inPath": workspace.join("nope.zip").to_string_lossy() }),
    );
    assert_eq!(code, "backup_import_failed");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn export_requires_workspace_and_out_path() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "backup.export",
        json!({ "outPath": "/tmp/never-written.zip" }),
    );
    assert_eq!(code, "no_workspace");

    let workspace = temp_dir("timetabled-backup-params");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let code = request_err(&mut stdin, &mut reader, "3", "backup.export", json!({}));
    assert_eq!(code, "bad_params");

    let _ = std::fs::remove_dir_all(workspace);
}
