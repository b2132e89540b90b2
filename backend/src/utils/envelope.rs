//! Success envelope and the session expiry decoration applied to it.

use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::session::{SessionContext, SessionInfo};

pub const SESSION_INFO_KEY: &str = "sessionInfo";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Serializes the envelope and attaches the expiry of `ctx`'s session.
    pub fn synced(self, ctx: &SessionContext) -> Json<Value> {
        let body = match serde_json::to_value(&self) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(error = %err, "Failed to serialize response body");
                return Json(Value::Null);
            }
        };
        Json(attach_session_info(body, &ctx.info()))
    }
}

/// Adds `data.sessionInfo` to a successful envelope.
///
/// Error bodies, arrays, primitives and envelopes whose `data` is an array or
/// a primitive are returned unchanged.
pub fn attach_session_info(mut body: Value, info: &SessionInfo) -> Value {
    let Some(envelope) = body.as_object_mut() else {
        return body;
    };
    if envelope.get("success") == Some(&Value::Bool(false)) {
        return body;
    }
    let info = match serde_json::to_value(info) {
        Ok(info) => info,
        Err(_) => return body,
    };

    match envelope.get_mut("data") {
        Some(Value::Object(data)) => {
            data.insert(SESSION_INFO_KEY.to_string(), info);
        }
        None | Some(Value::Null) => {
            let mut data = Map::new();
            data.insert(SESSION_INFO_KEY.to_string(), info);
            envelope.insert("data".to_string(), Value::Object(data));
        }
        Some(_) => {}
    }
    body
}
