//! Message endpoints: post, update and delete template messages by name.
//!
//! Successful lookups always answer with Slack's own status code and JSON
//! body, whether Slack accepted the call or not.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::services::DispatchResult;
use crate::state::AppState;

/// Create message routes.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/message",
        post(post_message).put(update_message).delete(delete_message),
    )
}

/// Body of `POST /api/message`.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub app_name: String,
    pub template_name: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Body of `PUT /api/message`.
#[derive(Debug, Deserialize)]
pub struct UpdateMessageRequest {
    pub app_name: String,
    pub template_name: String,
    #[serde(default)]
    pub text: Option<String>,
    pub ts: String,
}

/// Body of `DELETE /api/message`.
#[derive(Debug, Deserialize)]
pub struct DeleteMessageRequest {
    pub app_name: String,
    pub channel_id: String,
    pub ts: String,
}

#[instrument(skip(state, body))]
async fn post_message(
    State(state): State<AppState>,
    body: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    require("app_name", &req.app_name)?;
    require("template_name", &req.template_name)?;

    let result = state
        .messages()
        .post(&req.app_name, &req.template_name, req.text.as_deref())
        .await?;

    Ok(slack_passthrough(result))
}

#[instrument(skip(state, body))]
async fn update_message(
    State(state): State<AppState>,
    body: Result<Json<UpdateMessageRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    require("app_name", &req.app_name)?;
    require("template_name", &req.template_name)?;
    require("ts", &req.ts)?;

    let result = state
        .messages()
        .update(
            &req.app_name,
            &req.template_name,
            req.text.as_deref(),
            &req.ts,
        )
        .await?;

    Ok(slack_passthrough(result))
}

#[instrument(skip(state, body))]
async fn delete_message(
    State(state): State<AppState>,
    body: Result<Json<DeleteMessageRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    require("app_name", &req.app_name)?;
    require("channel_id", &req.channel_id)?;
    require("ts", &req.ts)?;

    let result = state
        .messages()
        .delete(&req.app_name, &req.channel_id, &req.ts)
        .await?;

    Ok(slack_passthrough(result))
}

/// Reject blank required fields.
fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} may not be blank")));
    }
    Ok(())
}

/// Answer with Slack's status and body, unchanged.
fn slack_passthrough(result: DispatchResult) -> Response {
    let status =
        StatusCode::from_u16(result.response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(result.response.body)).into_response()
}
