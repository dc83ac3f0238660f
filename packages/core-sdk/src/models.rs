use serde::{Deserialize, Serialize};

/**
 * \brief 未指定模型时使用的 Gemini 模型。
 */
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/**
 * \brief POST /api/chat 请求体。
 */
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /** \brief 用户消息；缺失时在校验密钥之后拒绝 */
    #[serde(default)]
    pub message: Option<String>,
    /** \brief 调用方提供的 Gemini API Key，不落盘、不写日志 */
    #[serde(default)]
    pub api_key: String,
    /** \brief 模型名，可带或不带 `models/` 前缀 */
    #[serde(default)]
    pub model: Option<String>,
}

/**
 * \brief POST /api/models 请求体。
 */
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsRequest {
    #[serde(default)]
    pub api_key: String,
}

// Debug is hand-written so the credential never reaches a log line.
impl std::fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRequest")
            .field("message_len", &self.message.as_ref().map(|m| m.len()))
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl std::fmt::Debug for ModelsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelsRequest")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

/**
 * \brief 所有错误响应的统一结构。
 */
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub detail: String,
}
