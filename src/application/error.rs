//! 应用层错误定义
//!
//! 统一的生成/播放/识别错误类型。错误是携带原因的数据，不用于正常流程控制。
//! 需要 `Clone`：single-flight 的共享 future 会把同一个结果交给所有等待者。

use thiserror::Error;

use crate::application::ports::{CacheError, OcrError, PlayerError, TtsError};
use crate::domain::VoiceError;

/// 应用层错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApplicationError {
    /// 输入文本或片段为空
    #[error("Input text is empty: {0}")]
    EmptyInput(String),

    /// 外部合成服务失败或返回了不可用的结果
    #[error("TTS generation failed: {0}")]
    Generation(String),

    /// 请求播放的音频不存在（或已失效）
    #[error("Audio not found: {0}")]
    AudioNotFound(String),

    /// 生成的音频写入缓存失败
    #[error("Cache write failed: {0}")]
    CacheWrite(String),

    /// 播放器加载或播放失败
    #[error("Playback failed: {0}")]
    Playback(String),

    /// 参数或配置无效
    #[error("Validation error: {0}")]
    Validation(String),

    /// 图片文字识别失败
    #[error("Recognition failed: {0}")]
    Recognition(String),
}

impl ApplicationError {
    /// 创建空输入错误
    pub fn empty_input(message: impl Into<String>) -> Self {
        Self::EmptyInput(message.into())
    }

    /// 创建生成错误
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 创建音频不存在错误
    pub fn audio_not_found(path: &std::path::Path) -> Self {
        Self::AudioNotFound(path.display().to_string())
    }
}

impl From<TtsError> for ApplicationError {
    fn from(err: TtsError) -> Self {
        Self::Generation(err.to_string())
    }
}

impl From<CacheError> for ApplicationError {
    fn from(err: CacheError) -> Self {
        Self::CacheWrite(err.to_string())
    }
}

impl From<PlayerError> for ApplicationError {
    fn from(err: PlayerError) -> Self {
        Self::Playback(err.to_string())
    }
}

impl From<OcrError> for ApplicationError {
    fn from(err: OcrError) -> Self {
        Self::Recognition(err.to_string())
    }
}

impl From<VoiceError> for ApplicationError {
    fn from(err: VoiceError) -> Self {
        Self::Validation(err.to_string())
    }
}
