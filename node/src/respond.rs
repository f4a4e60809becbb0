//! Error-to-HTTP mapping shared by the peer and orderer routers.

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use litefab::LitefabError;

/// Maps the library error taxonomy onto HTTP statuses.
pub fn status_for(err: &LitefabError) -> StatusCode {
    match err {
        LitefabError::SignatureInvalid(_) | LitefabError::BadRequest(_) => StatusCode::BAD_REQUEST,
        LitefabError::NotFound(_) => StatusCode::NOT_FOUND,
        LitefabError::ChaincodeExecution(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LitefabError::Consensus(_) => StatusCode::SERVICE_UNAVAILABLE,
        LitefabError::Transport(_) => StatusCode::BAD_GATEWAY,
        LitefabError::Storage(_) | LitefabError::Crypto(_) | LitefabError::Encoding(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// JSON error body paired with the mapped status.
pub fn error_response(err: &LitefabError) -> (StatusCode, Json<Value>) {
    (status_for(err), Json(json!({ "error": err.to_string() })))
}
