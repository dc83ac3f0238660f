use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
};

use anyhow::Result;
use once_cell::sync::Lazy;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

const LOG_FILE: &str = "gemini-relay.log";

static ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_DIR: Lazy<RwLock<PathBuf>> = Lazy::new(|| RwLock::new(PathBuf::from("logs")));

/**
 * \brief 遥测事件级别。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Error => "ERROR",
        }
    }
}

/**
 * \brief 打开或关闭遥测文件（`serve --telemetry`）。
 */
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/**
 * \brief 修改遥测文件所在目录（默认 ./logs）。
 */
pub fn set_log_dir(dir: impl Into<PathBuf>) {
    if let Ok(mut guard) = LOG_DIR.write() {
        *guard = dir.into();
    }
}

/**
 * \brief 追加一条中继事件。category 如 "relay.chat"；detail 只应含模型名、长度、计数，
 * 不得包含 API Key。写入失败只告警，不影响请求。
 */
pub fn record(level: Level, category: &str, detail: &str) {
    if !is_enabled() {
        return;
    }
    if let Err(err) = append(level, category, detail) {
        tracing::warn!(category, "telemetry write failed: {}", err);
    }
}

pub fn log_event(category: &str, detail: &str) {
    record(Level::Info, category, detail);
}

pub fn log_error(category: &str, detail: &str) {
    record(Level::Error, category, detail);
}

fn append(level: Level, category: &str, detail: &str) -> Result<()> {
    let dir = LOG_DIR
        .read()
        .map(|g| g.clone())
        .unwrap_or_else(|_| PathBuf::from("logs"));
    std::fs::create_dir_all(&dir)?;

    let line = format!(
        "{} [{}] {} - {}",
        OffsetDateTime::now_utc().format(&Rfc3339)?,
        level.as_str(),
        category,
        detail
    );
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))?;
    writeln!(file, "{}", line)?;
    Ok(())
}
