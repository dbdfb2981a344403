// src/error.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// 요청 값 검증 실패 (클라이언트 잘못)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Неверный формат группы. Пример корректного формата: БАСО-03-24.")]
    BadGroup,

    #[error("Неверный формат даты. Используйте ГГГГ-ММ-ДД.")]
    BadDate,

    #[error("Дата вне допустимого диапазона (должна быть в пределах 2 лет от текущей даты).")]
    DateOutOfRange,
}

// 스크래핑 실패: 하루 단위로 흡수되어 빈 시간표가 됨
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("navigation to {url} failed: {source:#}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("browser error: {0:#}")]
    Browser(#[from] anyhow::Error),

    #[error("scrape task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// 캐시 입출력 실패: 로그만 남기고 미스/무시로 처리
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache json: {0}")]
    Json(#[from] serde_json::Error),
}

// 호출자에게 전달되는 유일한 에러
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
