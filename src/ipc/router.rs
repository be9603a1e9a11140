use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::session::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::class_groups::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::subjects::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::staff::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::courses::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::slots::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::grid::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::conflicts::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::backup::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
