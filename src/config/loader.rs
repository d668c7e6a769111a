//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（shadowtts.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, TtsBackend};
use crate::domain::{VoiceCatalog, MAX_SPEED_PERCENT, MIN_SPEED_PERCENT};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["shadowtts", "shadowtts.local"];

/// 轮询间隔允许范围（毫秒）
const POLL_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 10..=100;

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `SHADOWTTS_`，层级分隔符 `__`）
/// 2. 配置文件（shadowtts.toml 或 shadowtts.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `SHADOWTTS_TTS__URL=http://tts-server:8000`
/// - `SHADOWTTS_TTS__BACKEND=fake`
/// - `SHADOWTTS_CACHE__DIR=/tmp/shadowtts`
/// - `SHADOWTTS_SESSION__REPEAT_COUNT=3`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级），音色表由 serde 默认值提供
    builder = builder
        .set_default("tts.backend", "http")?
        .set_default("tts.url", "http://localhost:8000")?
        .set_default("tts.timeout_secs", 60)?
        .set_default("tts.max_retries", 0)?
        .set_default("ocr.enabled", false)?
        .set_default("ocr.url", "http://localhost:8001/api/ocr/general")?
        .set_default("ocr.timeout_secs", 30)?
        .set_default("cache.dir", "data/audio")?
        .set_default("cache.extension", "mp3")?
        .set_default("cache.clear_on_start", true)?
        .set_default("generation.max_concurrent", 4)?
        .set_default("generation.min_chars", 0)?
        .set_default("playback.backend", "rodio")?
        .set_default("playback.poll_interval_ms", 100)?
        .set_default("session.speed_percent", 0)?
        .set_default("session.repeat_mode", "full")?
        .set_default("session.repeat_count", 1)?
        .set_default("session.infinite_loop", false)?
        .set_default("session.interval_ms", 500)?
        .set_default("events.capacity", 100)?
        .set_default("log.level", "info")?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: SHADOWTTS_PLAYBACK__POLL_INTERVAL_MS=50
    builder = builder.add_source(
        Environment::with_prefix("SHADOWTTS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.tts.backend == TtsBackend::Http && config.tts.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty".to_string(),
        ));
    }

    if config.ocr.enabled && config.ocr.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "OCR URL cannot be empty when OCR is enabled".to_string(),
        ));
    }

    if config.cache.extension.is_empty() {
        return Err(ConfigError::ValidationError(
            "Cache extension cannot be empty".to_string(),
        ));
    }

    if !POLL_INTERVAL_RANGE.contains(&config.playback.poll_interval_ms) {
        return Err(ConfigError::ValidationError(format!(
            "Poll interval must be between 10 and 100 ms, got {}",
            config.playback.poll_interval_ms
        )));
    }

    let speed = config.session.speed_percent;
    if !(MIN_SPEED_PERCENT..=MAX_SPEED_PERCENT).contains(&speed) {
        return Err(ConfigError::ValidationError(format!(
            "Default speed must be between -50% and +100%, got {}%",
            speed
        )));
    }

    if config.events.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "Event channel capacity cannot be 0".to_string(),
        ));
    }

    let catalog = VoiceCatalog::new(config.voices.clone())
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    if let Some(name) = &config.session.default_voice {
        catalog
            .resolve(name)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    match config.tts.backend {
        TtsBackend::Http => {
            tracing::info!("TTS URL: {}", config.tts.url);
            tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
        }
        TtsBackend::Fake => tracing::info!("TTS Backend: fake"),
    }
    tracing::info!("OCR Enabled: {}", config.ocr.enabled);
    if config.ocr.enabled {
        tracing::info!("OCR URL: {}", config.ocr.url);
    }
    tracing::info!("Audio Directory: {:?}", config.cache.dir);
    tracing::info!("Clear Cache On Start: {}", config.cache.clear_on_start);
    tracing::info!("Max Concurrent Synthesis: {}", config.generation.max_concurrent);
    tracing::info!("Player Backend: {}", config.playback.backend.as_str());
    tracing::info!("Poll Interval: {}ms", config.playback.poll_interval_ms);
    tracing::info!("Voices: {}", config.voices.len());
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
