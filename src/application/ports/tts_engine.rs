//! TTS Engine Port - 语音合成抽象
//!
//! 定义外部语音合成服务的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::SpeechRate;

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 要合成的文本内容
    pub text: String,
    /// 外部服务的音色标识（如 zh-CN-XiaoyiNeural）
    pub voice_id: String,
    /// 语速
    pub rate: SpeechRate,
}

/// 合成结果
#[derive(Debug, Clone)]
pub struct SynthesisResponse {
    /// 编码后的音频数据（mp3/wav，原样落盘）
    pub audio_data: Vec<u8>,
    /// 音频时长（毫秒），服务未提供时为 None
    pub duration_ms: Option<u64>,
}

/// TTS Engine Port
///
/// 外部语音合成服务。一次调用对应一次完整合成，不支持中途取消。
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 合成音频
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisResponse, TtsError>;

    /// 检查 TTS 服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
