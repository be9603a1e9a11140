
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn session_requires_a_selected_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "session.open",
        json!({
            "token": "tok",
            "user": { "id": "u-1", "displayName": "Nobody", "role": "teacher" }
        }),
    );
    assert_eq!(code, "no_workspace");

    let code = request_err(&mut stdin, &mut reader, "2", "session.close", json!({}));
    assert_eq!(code, "no_workspace");

    // session.get is a pure state read and always answers.
    let got = request_ok(&mut stdin, &mut reader, "3", "session.get", json!({}));
    assert_eq!(got.get("session"), Some(&serde_json::Value::Null));
}

#[test]
fn open_get_close_lifecycle() {
    let workspace = temp_dir("timetabled-session");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(
        selected.get("sessionRestored").and_then(|v| v.as_bool()),
        Some(false)
    );

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.open",
        json!({
            "token": "tok-abc",
            "user": { "id": "u-7", "displayName": "Pat Admin", "role": "school_admin" }
        }),
    );
    let session = opened.get("session").expect("session");
    assert_eq!(session.get("token").and_then(|v| v.as_str()), Some("tok-abc"));
    assert_eq!(
        session
            .get("user")
            .and_then(|u| u.get("displayName"))
            .and_then(|v| v.as_str()),
        Some("Pat Admin")
    );

    let got = request_ok(&mut stdin, &mut reader, "3", "session.get", json!({}));
    assert_eq!(got.get("session"), opened.get("session"));

    let _ = request_ok(&mut stdin, &mut reader, "4", "session.close", json!({}));
    let got = request_ok(&mut stdin, &mut reader, "5", "session.get", json!({}));
    assert_eq!(got.get("session"), Some(&serde_json::Value::Null));

    // The close also removed the persisted copy.
    let restored = request_ok(&mut stdin, &mut reader, "6", "session.restore", json!({}));
    assert_eq!(restored.get("session"), Some(&serde_json::Value::Null));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn session_survives_workspace_reselect_and_process_restart() {
    let workspace = temp_dir("timetabled-session-restart");

    {
        let (_child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "session.open",
            json!({
                "token": "tok-persist",
                "user": { "id": "u-9", "displayName": "Sam", "role": "teacher" }
            }),
        );
    }

    // A fresh process hydrates the session when the workspace is selected.
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(
        selected.get("sessionRestored").and_then(|v| v.as_bool()),
        Some(true)
    );
    let got = request_ok(&mut stdin, &mut reader, "2", "session.get", json!({}));
    assert_eq!(
        got.get("session")
            .and_then(|s| s.get("token"))
            .and_then(|v| v.as_str()),
        Some("tok-persist")
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn open_rejects_missing_token_or_user() {
    let workspace = temp_dir("timetabled-session-bad");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "session.open",
        json!({ "user": { "id": "u-1" } }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "session.open",
        json!({ "token": "tok" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "session.open",
        json!({ "token": "tok", "user": { "displayName": "No Id" } }),
    );
    assert_eq!(code, "bad_params");

    let _ = std::fs::remove_dir_all(workspace);
}
