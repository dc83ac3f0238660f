use serde::{Deserialize, Serialize};

use crate::models::DEFAULT_MODEL;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_UI_DIR: &str = "web";

/**
 * \brief 中继服务运行配置。
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /** \brief 监听地址，如 "0.0.0.0:8000" */
    pub addr: String,
    /** \brief 静态前端目录 */
    pub static_dir: String,
    /** \brief Gemini API 基地址 */
    pub api_base: String,
    /** \brief 请求未指定模型时使用的模型 */
    pub default_model: String,
    /** \brief 允许的跨域来源；为空时回显任意来源 */
    pub cors_origins: Vec<String>,
    /** \brief 是否写入遥测日志文件 */
    pub telemetry: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            static_dir: std::env::var("GEMINI_RELAY_UI_DIR")
                .unwrap_or_else(|_| DEFAULT_UI_DIR.to_string()),
            api_base: DEFAULT_API_BASE.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            cors_origins: Vec::new(),
            telemetry: false,
        }
    }
}

impl RelayConfig {
    /**
     * \brief 解析请求使用的模型：空或缺省时回落到默认模型。
     */
    pub fn resolve_model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested.map(str::trim) {
            Some(m) if !m.is_empty() => m,
            _ => &self.default_model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_surface() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.addr, "0.0.0.0:8000");
        assert_eq!(cfg.default_model, "gemini-2.0-flash-exp");
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert!(cfg.cors_origins.is_empty());
        assert!(!cfg.telemetry);
    }

    #[test]
    fn resolve_model_falls_back_on_missing_or_blank() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.resolve_model(None), "gemini-2.0-flash-exp");
        assert_eq!(cfg.resolve_model(Some("  ")), "gemini-2.0-flash-exp");
        assert_eq!(cfg.resolve_model(Some("gemini-1.5-pro")), "gemini-1.5-pro");
    }
}
