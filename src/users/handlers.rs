use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use crate::{
    state::AppState,
    users::{
        dto::{CreateUserRequest, UpdateUserRequest, UserResponse},
        error::{ErrorKind, UserError},
        repo_types::User,
    },
};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(get_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user_by_id).delete(delete_user).patch(update_user),
        )
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: ErrorMessage,
    error: &'static str,
}

/// Error returned by every handler: a status plus one or more messages.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: ErrorMessage,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: ErrorMessage::One(message.into()),
        }
    }

    fn validation(errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: ErrorMessage::Many(errors),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status_code: self.status.as_u16(),
            message: self.message,
            error: self.status.canonical_reason().unwrap_or("Error"),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        let status = match e.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::AlreadyExists => {
                warn!(operation = e.operation(), "{}", e);
                StatusCode::CONFLICT
            }
            ErrorKind::NotFound => {
                if let UserError::UserNotFound { operation, id } = &e {
                    debug!(operation, id, "user not found");
                }
                StatusCode::NOT_FOUND
            }
            ErrorKind::HashingFailure | ErrorKind::PersistenceFailure => {
                error!(operation = e.operation(), error = %e, "user operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            return ApiError::new(status, "Internal server error");
        }
        ApiError::new(status, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "malformed request body");
        ApiError::validation(vec![rejection.body_text()])
    }
}

/// An absent or blank body decodes as `{}` so the empty-patch rule applies to it.
fn decode_patch(body: &[u8]) -> Result<UpdateUserRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(UpdateUserRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "malformed request body");
        ApiError::validation(vec![format!("Failed to parse the request body as JSON: {e}")])
    })
}

fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "id must be a number"))
}

#[instrument(skip(state))]
pub async fn get_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.get_users().await?;
    Ok(Json(users))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(payload) = payload?;
    let input = payload.validate().map_err(ApiError::validation)?;

    let user = state.users.create_user(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse::new("User has been created", user)),
    ))
}

#[instrument(skip(state))]
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id)?;
    match state.users.get_user_by_id(id).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "User is not found")),
    }
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&id)?;
    let user = state.users.delete_user(id).await?;
    Ok(Json(UserResponse::new("User has been deleted", user)))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&id)?;
    let payload = decode_patch(&body)?;
    let patch = payload.validate().map_err(ApiError::validation)?;

    let user = state.users.update_user(id, patch).await?;
    Ok(Json(UserResponse::new("User has been updated", user)))
}
