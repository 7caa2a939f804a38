use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use careers_service::ServiceError;
use careers_storage::StorageDiagnostic;
use serde::Serialize;

/// JSON body shared by every mutating route and every failure.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<StorageDiagnostic>,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    success(StatusCode::OK, data)
}

pub fn created<T: Serialize>(data: T) -> Response {
    success(StatusCode::CREATED, data)
}

fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    let body = Envelope {
        success: true,
        data: Some(data),
        error: None,
    };
    (status, Json(body)).into_response()
}

pub fn failure(status: StatusCode, error: ErrorBody) -> Response {
    let body = Envelope::<()> {
        success: false,
        data: None,
        error: Some(error),
    };
    (status, Json(body)).into_response()
}

pub fn not_found(message: impl Into<String>) -> Response {
    failure(
        StatusCode::NOT_FOUND,
        ErrorBody {
            code: "not_found",
            message: message.into(),
            field: None,
            diagnostic: None,
        },
    )
}

pub fn bad_request(field: &'static str, message: impl Into<String>) -> Response {
    failure(
        StatusCode::UNPROCESSABLE_ENTITY,
        ErrorBody {
            code: "validation",
            message: message.into(),
            field: Some(field),
            diagnostic: None,
        },
    )
}

pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_)
        | ServiceError::InvalidInput { .. }
        | ServiceError::InvalidReference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::TransitionRejected(_)
        | ServiceError::PositionTransition { .. }
        | ServiceError::DeleteRejected { .. }
        | ServiceError::StillReferenced { .. }
        | ServiceError::SlugConflict { .. } => StatusCode::CONFLICT,
        ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Failure raised inside a handler; rendered as an envelope.
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    Body(JsonRejection),
    NotFound(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Service(err) => err,
            ApiError::Body(rejection) => return bad_request("body", rejection.body_text()),
            ApiError::NotFound(message) => return not_found(message),
        };
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "request failed");
        }
        failure(
            status,
            ErrorBody {
                code: err.code(),
                message: err.to_string(),
                field: err.field(),
                diagnostic: err.diagnostic(),
            },
        )
    }
}

pub type ApiResult = Result<Response, ApiError>;
