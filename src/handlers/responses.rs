use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::booth::error::BoothError;
use crate::booth::session::{GENERATION_FAILED_MESSAGE, UPLOAD_FAILED_MESSAGE};

impl BoothError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BoothError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            BoothError::InvalidStage { .. } | BoothError::Superseded => StatusCode::CONFLICT,
            BoothError::UnknownKeyword(_)
            | BoothError::KeywordCount { .. }
            | BoothError::DuplicateKeyword(_)
            | BoothError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            BoothError::Prompt(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BoothError::Generation(_) | BoothError::Upload(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short status tag for the timing log.
    pub fn kind(&self) -> &'static str {
        match self {
            BoothError::SessionNotFound(_) => "not_found",
            BoothError::InvalidStage { .. } => "invalid_stage",
            BoothError::Superseded => "superseded",
            BoothError::UnknownKeyword(_)
            | BoothError::KeywordCount { .. }
            | BoothError::DuplicateKeyword(_) => "bad_keywords",
            BoothError::InvalidImage(_) => "bad_image",
            BoothError::Prompt(_) => "prompt_error",
            BoothError::Generation(_) => "generation_failed",
            BoothError::Upload(_) => "upload_failed",
        }
    }
}

impl IntoResponse for BoothError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            BoothError::Generation(err) => {
                warn!("{}", err);
                GENERATION_FAILED_MESSAGE.to_string()
            }
            BoothError::Upload(err) => {
                warn!("{}", err);
                UPLOAD_FAILED_MESSAGE.to_string()
            }
            BoothError::Prompt(err) => {
                error!("Prompt error: {}", err);
                err.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
