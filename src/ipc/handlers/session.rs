use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::session::{Session, SessionUser};
use serde_json::json;

fn session_json(session: &Session) -> serde_json::Value {
    json!({
        "token": session.token,
        "user": {
            "id": session.user.id,
            "displayName": session.user.display_name,
            "role": session.user.role,
        }
    })
}

fn handle_session_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let token = match req.params.get("token").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => return err(&req.id, "bad_params", "missing token", None),
    };
    let Some(user) = req.params.get("user").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing user", None);
    };
    let user_id = match user.get("id").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing user.id", None),
    };
    let display_name = user
        .get("displayName")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let role = user
        .get("role")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let session = Session {
        token,
        user: SessionUser {
            id: user_id,
            display_name,
            role,
        },
    };
    if let Err(e) = session.persist(&workspace) {
        return err(&req.id, "session_persist_failed", e.to_string(), None);
    }
    state.session = Some(session.clone());

    ok(&req.id, json!({ "session": session_json(&session) }))
}

fn handle_session_restore(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    match Session::hydrate(&workspace) {
        Ok(Some(session)) => {
            state.session = Some(session.clone());
            ok(&req.id, json!({ "session": session_json(&session) }))
        }
        Ok(None) => {
            state.session = None;
            ok(&req.id, json!({ "session": null }))
        }
        Err(e) => err(&req.id, "session_read_failed", e.to_string(), None),
    }
}

fn handle_session_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.session.as_ref() {
        Some(session) => ok(&req.id, json!({ "session": session_json(session) })),
        None => ok(&req.id, json!({ "session": null })),
    }
}

fn handle_session_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Err(e) = Session::clear(&workspace) {
        return err(&req.id, "session_clear_failed", e.to_string(), None);
    }
    state.session = None;
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.open" => Some(handle_session_open(state, req)),
        "session.restore" => Some(handle_session_restore(state, req)),
        "session.get" => Some(handle_session_get(state, req)),
        "session.close" => Some(handle_session_close(state, req)),
        _ => None,
    }
}
