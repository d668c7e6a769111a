//! Audio Player Port - 平台播放能力
//!
//! 只描述平台能做什么（加载、播放一次、暂停、恢复、停止、是否在出声），
//! 重复/间隔/暂停的循环逻辑只在 PlaybackEngine 里实现一次。

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// 播放器错误
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Failed to load audio: {0}")]
    LoadFailed(String),

    #[error("No audio loaded")]
    NotLoaded,

    #[error("Device error: {0}")]
    DeviceError(String),
}

/// 播放后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerBackend {
    /// 系统默认音频设备
    #[default]
    Rodio,
    /// 按音频时长计时，不输出声音
    Headless,
    /// 空实现，加载即成功，从不处于播放状态
    Null,
}

impl PlayerBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerBackend::Rodio => "rodio",
            PlayerBackend::Headless => "headless",
            PlayerBackend::Null => "null",
        }
    }
}

/// Audio Player Port
///
/// 所有方法都是非阻塞的，由引擎的后台循环轮询 `is_busy`
pub trait AudioPlayerPort: Send + Sync {
    /// 加载音频文件，替换之前加载的资源
    fn load(&self, path: &Path) -> Result<(), PlayerError>;

    /// 从头播放已加载的音频一次
    fn play_once(&self) -> Result<(), PlayerError>;

    /// 暂停当前播放
    fn pause(&self);

    /// 恢复暂停的播放
    fn resume(&self);

    /// 完全停止播放
    fn stop(&self) -> Result<(), PlayerError>;

    /// 底层是否仍在出声（暂停时返回 true）
    fn is_busy(&self) -> bool;

    /// 实现名称（用于日志）
    fn name(&self) -> &'static str;
}
