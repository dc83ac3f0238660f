use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorBody;

pub const MISSING_API_KEY: &str = "API Key is required";

/**
 * \brief 中继的错误分类：本地校验失败与上游调用失败。
 */
#[derive(Debug, Error)]
pub enum RelayError {
    /** \brief 请求未携带或携带空的 API Key */
    #[error("API Key is required")]
    MissingApiKey,
    /** \brief 请求体无法解析（JSON 语法、字段类型、缺少 message、非法模型名） */
    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },
    /** \brief Gemini 调用失败，消息原样透传给调用方 */
    #[error("{0}")]
    Upstream(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingApiKey => StatusCode::BAD_REQUEST,
            RelayError::InvalidBody { status, .. } => *status,
            RelayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /**
     * \brief 包装上游错误，保留完整的 cause 链（如连接被拒绝的原因）。
     */
    pub fn upstream(e: anyhow::Error) -> Self {
        RelayError::Upstream(format!("{:#}", e))
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
