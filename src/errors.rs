// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FondayError {
    #[error("image data missing")]
    MissingImage,

    #[error("analysis service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("upstream rejected the image: {0}")]
    UpstreamRejected(String),

    #[error("unparseable model response: {0}")]
    MalformedResponse(String),

    #[error("model response failed validation: {0}")]
    InvalidPayload(String),

    #[error("scan requested outside the scanning state")]
    NotScanning,

    #[error("image processing error: {0}")]
    ImageProcessing(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("oauth error: {0}")]
    OAuth(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl ResponseError for FondayError {
    fn error_response(&self) -> HttpResponse {
        match self {
            FondayError::MissingImage => HttpResponse::BadRequest().json(serde_json::json!({
                "message": "이미지 데이터가 없습니다."
            })),
            FondayError::UpstreamRejected(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "message": "이미지가 차단되었습니다. 다른 사진으로 시도해 주세요.",
                    "detail": self.to_string()
                }))
            }
            FondayError::ServiceUnavailable(_)
            | FondayError::MalformedResponse(_)
            | FondayError::InvalidPayload(_)
            | FondayError::NotScanning => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "message": "피부 분석 중 오류가 발생했습니다.",
                    "detail": self.to_string()
                }))
            }
            FondayError::ImageProcessing(_) | FondayError::Validation(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "message": "요청을 처리할 수 없습니다.",
                    "detail": self.to_string()
                }))
            }
            FondayError::Store(_) | FondayError::Serialization(_) | FondayError::OAuth(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "message": "서버 오류가 발생했습니다.",
                    "detail": self.to_string()
                }))
            }
        }
    }
}
