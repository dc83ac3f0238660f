use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};

const API_KEY_HEADER: &str = "x-goog-api-key";
const GENERATE_CONTENT: &str = "generateContent";
const MODELS_PAGE_SIZE: &str = "1000";

/**
 * \brief Gemini REST 客户端；每次请求按调用方密钥单独构造，不共享全局配置。
 */
pub struct GeminiClient {
    base: String,
    api_key: String,
    http: reqwest::Client,
}

impl GeminiClient {
    /**
     * \brief 以指定基地址与密钥构造客户端。
     * \param api_base 如 "https://generativelanguage.googleapis.com"
     * \param api_key  调用方提供的 API Key
     */
    pub fn new(api_base: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            base: normalize_gemini_base(api_base),
            api_key: api_key.to_string(),
            http,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| anyhow!("API key contains characters not allowed in a header"))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        Ok(headers)
    }

    /**
     * \brief 非流式生成，返回首个候选的完整文本。
     */
    pub async fn generate(&self, model: &str, message: &str) -> Result<String> {
        if !is_valid_model_id(model) {
            return Err(anyhow!("invalid model name: {}", model));
        }
        let url = format!(
            "{}/{}:{}",
            self.base,
            model_resource(model),
            GENERATE_CONTENT
        );
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": message}]
            }]
        });

        let resp = self
            .http
            .post(url)
            .headers(self.headers()?)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(upstream_failure(resp).await);
        }
        let v: Value = resp.json().await?;
        extract_gemini_text(&v)
    }

    /**
     * \brief 列出支持 generateContent 的模型，按上游返回顺序，自动翻页。
     */
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.base);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", MODELS_PAGE_SIZE.to_string())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let resp = self
                .http
                .get(&url)
                .headers(self.headers()?)
                .query(&query)
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(upstream_failure(resp).await);
            }
            let page: Value = resp.json().await?;
            models.extend(parse_gemini_model_list(&page)?);

            let next = page
                .get("nextPageToken")
                .and_then(|t| t.as_str())
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string());
            match next {
                None => break,
                Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                    return Err(anyhow!("gemini models pagination did not advance"));
                }
                Some(token) => page_token = Some(token),
            }
        }
        Ok(models)
    }
}

/**
 * \brief 将模型名规范为资源路径：已带 `models/` 或 `tunedModels/` 前缀的原样使用。
 */
pub fn model_resource(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

/**
 * \brief 模型名只能是单个路径段（可带 `models/`、`tunedModels/` 前缀），
 * 不得含有会改写请求 URL 的字符。
 */
pub fn is_valid_model_id(model: &str) -> bool {
    let id = model
        .strip_prefix("models/")
        .or_else(|| model.strip_prefix("tunedModels/"))
        .unwrap_or(model);
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace())
}

async fn upstream_failure(resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    describe_error_body(status, &text)
}

/**
 * \brief Google 错误体形如 {"error":{"code":400,"message":"..."}}，转为 "400 message"。
 */
fn describe_error_body(status: reqwest::StatusCode, text: &str) -> anyhow::Error {
    let parsed = serde_json::from_str::<Value>(text).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str());
    match message {
        Some(message) => anyhow!("{} {}", status.as_u16(), message),
        None => anyhow!("{} -> {}", status, text),
    }
}

fn extract_gemini_text(v: &Value) -> Result<String> {
    if let Some(reason) = v
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Err(anyhow!("prompt was blocked: {}", reason));
    }

    let first = v
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| anyhow!("response contained no candidates"))?;

    let texts = first
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if texts.is_empty() {
        let finish = first
            .get("finishReason")
            .and_then(|r| r.as_str())
            .unwrap_or("UNKNOWN");
        return Err(anyhow!(
            "response contained no text part (finish reason: {})",
            finish
        ));
    }
    Ok(texts.join(""))
}

fn parse_gemini_model_list(v: &Value) -> Result<Vec<String>> {
    // An empty page omits "models" entirely.
    let Some(arr) = v.get("models") else {
        return Ok(Vec::new());
    };
    let arr = arr
        .as_array()
        .ok_or_else(|| anyhow!("unexpected gemini models payload: {}", v))?;
    Ok(arr
        .iter()
        .filter(|item| supports_generate_content(item))
        .filter_map(|item| item.get("name").and_then(|s| s.as_str()))
        .map(|s| s.to_string())
        .collect())
}

fn supports_generate_content(model: &Value) -> bool {
    model
        .get("supportedGenerationMethods")
        .and_then(|m| m.as_array())
        .map(|methods| {
            methods
                .iter()
                .any(|m| m.as_str() == Some(GENERATE_CONTENT))
        })
        .unwrap_or(false)
}

fn normalize_gemini_base(api_base: &str) -> String {
    let trimmed = api_base.trim_end_matches('/');
    if trimmed.ends_with("/v1")
        || trimmed.ends_with("/v1beta")
        || trimmed.contains("/v1/")
        || trimmed.contains("/v1beta/")
    {
        trimmed.to_string()
    } else {
        format!("{}/v1beta", trimmed)
    }
}
