//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::ports::PlayerBackend;
use crate::domain::{default_voices, RepeatMode, SegmentConfig, Voice, DEFAULT_DELIMITERS};

/// 应用主配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// TTS 服务配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// OCR 服务配置
    #[serde(default)]
    pub ocr: OcrConfig,

    /// 音频缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 生成管线配置
    #[serde(default)]
    pub generation: GenerationConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackSettings,

    /// 会话初始设置
    #[serde(default)]
    pub session: SessionConfig,

    /// 事件通道配置
    #[serde(default)]
    pub events: EventsConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,

    /// 音色表
    #[serde(default = "default_voices")]
    pub voices: Vec<Voice>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tts: TtsConfig::default(),
            ocr: OcrConfig::default(),
            cache: CacheConfig::default(),
            generation: GenerationConfig::default(),
            playback: PlaybackSettings::default(),
            session: SessionConfig::default(),
            events: EventsConfig::default(),
            log: LogConfig::default(),
            voices: default_voices(),
        }
    }
}

/// TTS 后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsBackend {
    /// 外部 HTTP 服务
    #[default]
    Http,
    /// 离线静音音频（演示与测试）
    Fake,
}

/// TTS 服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub backend: TtsBackend,

    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 传输失败时的重试次数
    #[serde(default)]
    pub max_retries: u32,
}

fn default_tts_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tts_timeout() -> u64 {
    60
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            backend: TtsBackend::default(),
            url: default_tts_url(),
            timeout_secs: default_tts_timeout(),
            max_retries: 0,
        }
    }
}

/// OCR 服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// 是否启用图片识别
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_ocr_url")]
    pub url: String,

    #[serde(default = "default_ocr_timeout")]
    pub timeout_secs: u64,
}

fn default_ocr_url() -> String {
    "http://localhost:8001/api/ocr/general".to_string()
}

fn default_ocr_timeout() -> u64 {
    30
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_ocr_url(),
            timeout_secs: default_ocr_timeout(),
        }
    }
}

/// 音频缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// 缓存目录
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// 音频文件扩展名（不含点）
    #[serde(default = "default_extension")]
    pub extension: String,

    /// 启动时清空缓存目录
    #[serde(default = "default_clear_on_start")]
    pub clear_on_start: bool,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/audio")
}

fn default_extension() -> String {
    "mp3".to_string()
}

fn default_clear_on_start() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            extension: default_extension(),
            clear_on_start: default_clear_on_start(),
        }
    }
}

/// 生成管线配置
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// 最大并发合成数，0 表示不限制
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// 句末分隔符（每个字符一个）
    #[serde(default = "default_delimiters")]
    pub delimiters: String,

    /// 短句合并阈值，0 表示不合并
    #[serde(default)]
    pub min_chars: usize,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_delimiters() -> String {
    DEFAULT_DELIMITERS.iter().collect()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            delimiters: default_delimiters(),
            min_chars: 0,
        }
    }
}

impl GenerationConfig {
    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            delimiters: self.delimiters.chars().collect(),
            min_chars: self.min_chars,
        }
    }
}

/// 播放配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackSettings {
    #[serde(default)]
    pub backend: PlayerBackend,

    /// 停止/暂停的响应粒度（毫秒）
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    100
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            backend: PlayerBackend::default(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl PlaybackSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// 会话初始设置
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// 默认音色显示名，为空时使用音色表第一项
    #[serde(default)]
    pub default_voice: Option<String>,

    #[serde(default)]
    pub speed_percent: i32,

    #[serde(default)]
    pub repeat_mode: RepeatMode,

    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,

    #[serde(default)]
    pub infinite_loop: bool,

    /// 重复播放的间隔（毫秒）
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
}

fn default_repeat_count() -> u32 {
    1
}

fn default_interval() -> u64 {
    500
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_voice: None,
            speed_percent: 0,
            repeat_mode: RepeatMode::Full,
            repeat_count: default_repeat_count(),
            infinite_loop: false,
            interval_ms: default_interval(),
        }
    }
}

/// 事件通道配置
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_event_capacity() -> usize {
    100
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
