use axum::{
    extract::{FromRequest, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::web::error::AppError;

pub const INVALID_REQUEST_MESSAGE: &str = "Invalid request format. Please use JSON.";

/// JSON body of an action endpoint. A missing, malformed or mistyped body is
/// answered with `{success: false, message}` like any other action failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ActionRejection))]
pub struct ActionJson<T>(pub T);

#[derive(Debug)]
pub struct ActionRejection(AppError);

impl From<JsonRejection> for ActionRejection {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "Rejected request body.");
        ActionRejection(AppError::InvalidInput(INVALID_REQUEST_MESSAGE.to_string()))
    }
}

impl IntoResponse for ActionRejection {
    fn into_response(self) -> Response {
        self.0.into_action_response().into_response()
    }
}
