pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod server;
pub mod telemetry;

/**
 * \brief SDK 预导入集合，方便外部引用常用模块。
 */
pub mod prelude {
    pub use crate::config::RelayConfig;
    pub use crate::error::RelayError;
    pub use crate::llm::GeminiClient;
    pub use crate::models;
    pub use crate::server;
    pub use crate::telemetry;
}
