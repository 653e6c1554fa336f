use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{SyncError, SyncErrorKind};

pub type ApiResult<T> = Result<T, SyncError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

pub fn status_for(kind: SyncErrorKind) -> StatusCode {
    match kind {
        SyncErrorKind::NotFound => StatusCode::NOT_FOUND,
        SyncErrorKind::Conflict => StatusCode::CONFLICT,
        SyncErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        SyncErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let body = ErrorBody {
            error: self.to_string(),
            code: kind.to_string(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

pub fn bad_json(rejection: JsonRejection) -> SyncError {
    SyncError::bad_request(format!("malformed delta payload: {}", rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinkType;

    #[test]
    fn error_kinds_map_to_status_codes() {
        let cases = [
            (SyncError::not_found("X"), StatusCode::NOT_FOUND),
            (
                SyncError::LinkAlreadyExists {
                    company_number: "X".to_string(),
                    link_type: LinkType::Charges,
                },
                StatusCode::CONFLICT,
            ),
            (SyncError::bad_request("nope"), StatusCode::BAD_REQUEST),
            (SyncError::unavailable("timeout"), StatusCode::SERVICE_UNAVAILABLE),
            (
                SyncError::Notification("down".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
