use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get_service, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    config::RelayConfig,
    error::RelayError,
    llm::{is_valid_model_id, GeminiClient},
    models::{ChatRequest, ChatResponse, ModelsRequest, ModelsResponse},
    telemetry,
};

/**
 * \brief 启动中继 HTTP 服务，提供静态前端与 API。
 */
pub async fn run(config: RelayConfig) -> Result<()> {
    let addr = config.addr.clone();
    telemetry::set_enabled(config.telemetry);
    let app = router(config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/**
 * \brief 构建路由：/api/chat、/api/models，其余路径回落到静态目录。
 */
pub fn router(config: RelayConfig) -> Router {
    let static_service =
        get_service(ServeDir::new(&config.static_dir).append_index_html_on_directories(true));
    let cors = cors_layer(&config.cors_origins);

    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/models", post(list_models))
        .fallback_service(static_service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(config))
}

/**
 * \brief 未配置来源列表时回显请求的 Origin/Method/Headers，使凭据跨域可用。
 */
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let list: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(list)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/**
 * \brief 不看 Content-Type 直接按 JSON 解析请求体：语法错误 400，字段类型错误 422。
 */
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, RelayError> {
    serde_json::from_slice(body).map_err(|e| {
        let status = if e.is_data() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::BAD_REQUEST
        };
        RelayError::InvalidBody {
            status,
            message: format!("invalid request body: {}", e),
        }
    })
}

/**
 * \brief POST /api/chat：校验密钥，调用 Gemini 生成，返回 {"response": text}。
 */
async fn chat(
    State(config): State<Arc<RelayConfig>>,
    body: Bytes,
) -> Result<Json<ChatResponse>, RelayError> {
    let req: ChatRequest = parse_body(&body)?;
    if req.api_key.is_empty() {
        return Err(RelayError::MissingApiKey);
    }
    let message = req.message.as_deref().ok_or_else(|| RelayError::InvalidBody {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        message: "missing field `message`".to_string(),
    })?;
    let model = config.resolve_model(req.model.as_deref());
    if !is_valid_model_id(model) {
        return Err(RelayError::InvalidBody {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: format!("invalid model name: {}", model),
        });
    }

    tracing::debug!(model, message_len = message.len(), "chat request");
    let result = match GeminiClient::new(&config.api_base, &req.api_key) {
        Ok(client) => client.generate(model, message).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(text) => {
            telemetry::log_event(
                "relay.chat",
                &format!("model={} prompt_len={} reply_len={}", model, message.len(), text.len()),
            );
            Ok(Json(ChatResponse { response: text }))
        }
        Err(e) => {
            tracing::error!(model, "chat failed: {}", e);
            telemetry::log_error("relay.chat", &format!("model={} error={}", model, e));
            Err(RelayError::upstream(e))
        }
    }
}

/**
 * \brief POST /api/models：列出当前密钥可用、支持 generateContent 的模型。
 */
async fn list_models(
    State(config): State<Arc<RelayConfig>>,
    body: Bytes,
) -> Result<Json<ModelsResponse>, RelayError> {
    let req: ModelsRequest = parse_body(&body)?;
    if req.api_key.is_empty() {
        return Err(RelayError::MissingApiKey);
    }

    let result = match GeminiClient::new(&config.api_base, &req.api_key) {
        Ok(client) => client.list_models().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(models) => {
            tracing::debug!(count = models.len(), "models listed");
            telemetry::log_event("relay.models", &format!("count={}", models.len()));
            Ok(Json(ModelsResponse { models }))
        }
        Err(e) => {
            tracing::error!("list models failed: {}", e);
            telemetry::log_error("relay.models", &format!("error={}", e));
            Err(RelayError::upstream(e))
        }
    }
}
