//! HTTP endpoints of the player
//!
//! Player resources live at the root under their device names
//! (`/assign_color`, `/start`, `/count`, ...); JSON status endpoints are
//! under /api/v1/.

use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response as HttpResponse};
use pushup_core::stats::store::ScoreHistory;
use pushup_core::{CommandError, ControlStatus, Response};
use serde::Serialize;

/// Resource type advertised for every player resource
pub const RESOURCE_TYPE: &str = "pushups_player";

/// Resources listed in /.well-known/core, in device order
const RESOURCES: [&str; 7] = [
    "assign_color",
    "start",
    "count",
    "set_to_winner",
    "set_to_looser",
    "fake_pushup",
    "reset",
];

/// Application status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    #[serde(flatten)]
    pub status: ControlStatus,
}

type ApiError = (StatusCode, String);

fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!("Control request failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn rejected(e: CommandError) -> ApiError {
    let status = match e {
        CommandError::UnknownResource(_) => StatusCode::NOT_FOUND,
        CommandError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
    };
    (status, e.to_string())
}

fn into_http(response: Response) -> HttpResponse {
    match response {
        Response::Ack => StatusCode::NO_CONTENT.into_response(),
        Response::Count(count) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            count.to_string(),
        )
            .into_response(),
    }
}

async fn dispatch(state: &AppState, resource: &str, payload: Bytes) -> Result<HttpResponse, ApiError> {
    state
        .control
        .dispatch(resource, payload.to_vec())
        .await
        .map_err(internal)?
        .map(into_http)
        .map_err(rejected)
}

/// Link-format listing of the player resources
pub fn link_format() -> String {
    RESOURCES
        .iter()
        .map(|&resource| {
            if resource == "count" {
                format!("</{resource}>;ct=0;rt=\"{RESOURCE_TYPE}\";obs")
            } else {
                format!("</{resource}>;rt=\"{RESOURCE_TYPE}\"")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// GET /.well-known/core
pub async fn well_known_core() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/link-format")],
        link_format(),
    )
}

/// PUT /assign_color
pub async fn assign_color(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    dispatch(&state, "assign_color", body).await
}

/// GET /count
pub async fn get_count(State(state): State<AppState>) -> Result<HttpResponse, ApiError> {
    dispatch(&state, "count", Bytes::new()).await
}

/// POST /{resource} for the payload-less commands
pub async fn post_command(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    dispatch(&state, &resource, body).await
}

/// GET /api/v1/status
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.control.status().await.map_err(internal)?;

    Ok(Json(StatusResponse {
        version: pushup_core::VERSION.to_string(),
        status,
    }))
}

/// GET /api/v1/history
pub async fn get_history(State(state): State<AppState>) -> Result<Json<ScoreHistory>, ApiError> {
    let history = state.control.history().await.map_err(internal)?;
    Ok(Json(history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushup_core::game::session::SessionSnapshot;

    #[test]
    fn test_link_format_lists_all_resources() {
        let links = link_format();
        for resource in RESOURCES {
            assert!(links.contains(&format!("</{resource}>")), "Missing {resource}");
        }
        assert!(links.contains("</count>;ct=0;rt=\"pushups_player\";obs"));
        assert!(links.starts_with("</assign_color>;rt=\"pushups_player\","));
        assert_eq!(links.matches("obs").count(), 1, "Only count is observable");
    }

    #[test]
    fn test_rejections_map_to_status_codes() {
        let (status, _) = rejected(CommandError::UnknownResource("x".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, message) = rejected(CommandError::InvalidPayload("bad".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("bad"));
    }

    #[test]
    fn test_ack_is_no_content() {
        assert_eq!(into_http(Response::Ack).status(), StatusCode::NO_CONTENT);
        assert_eq!(into_http(Response::Count(4)).status(), StatusCode::OK);
    }

    #[test]
    fn test_status_response_serializes() {
        let resp = StatusResponse {
            version: "0.1.0".to_string(),
            status: ControlStatus {
                session: SessionSnapshot {
                    color: pushup_core::Color::Red,
                    repetition_count: 5,
                    round_active: true,
                    round_id: 2,
                    indication: Default::default(),
                },
                detector_running: true,
                blinking: false,
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"version\":\"0.1.0\""));
        assert!(json.contains("\"color\":\"red\""));
        assert!(json.contains("\"repetition_count\":5"));
        assert!(json.contains("\"detector_running\":true"));
    }
}
