//! Fake TTS Client - 离线/测试用的 TTS 客户端
//!
//! 不调用外部服务，返回一段静音 WAV，并统计调用次数

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::application::ports::{SynthesisRequest, SynthesisResponse, TtsEnginePort, TtsError};

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 返回音频的时长（毫秒）
    pub duration_ms: u64,
    /// 采样率
    pub sample_rate: u32,
    /// 模拟推理延迟（毫秒）
    pub latency_ms: u64,
    /// 文本包含该标记时返回错误
    pub fail_marker: Option<String>,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            duration_ms: 1000,
            sample_rate: 16000,
            latency_ms: 200,
            fail_marker: None,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    calls: AtomicUsize,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            duration_ms = config.duration_ms,
            latency_ms = config.latency_ms,
            "FakeTtsClient initialized"
        );
        Self {
            config,
            calls: AtomicUsize::new(0),
        }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// 已收到的合成请求数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// 生成 16-bit 单声道静音 WAV
pub fn silent_wav(duration_ms: u64, sample_rate: u32) -> Vec<u8> {
    let num_samples = (sample_rate as u64 * duration_ms / 1000) as u32;
    let data_len = num_samples * 2;
    let mut wav = Vec::with_capacity(44 + data_len as usize);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    wav.extend_from_slice(&2u16.to_le_bytes()); // block align
    wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);

    wav
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisResponse, TtsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            text_len = request.text.len(),
            voice_id = %request.voice_id,
            rate = %request.rate,
            "FakeTtsClient: returning silent audio"
        );

        // 模拟推理延迟
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        if let Some(marker) = &self.config.fail_marker {
            if request.text.contains(marker.as_str()) {
                return Err(TtsError::ServiceError(format!(
                    "rejected text containing {:?}",
                    marker
                )));
            }
        }

        Ok(SynthesisResponse {
            audio_data: silent_wav(self.config.duration_ms, self.config.sample_rate),
            duration_ms: Some(self.config.duration_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SpeechRate;

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_string(),
            voice_id: "zh-CN-XiaoyiNeural".to_string(),
            rate: SpeechRate::default(),
        }
    }

    #[test]
    fn test_silent_wav_header() {
        let wav = silent_wav(500, 16000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 0.5s * 16000 * 2 bytes
        assert_eq!(wav.len(), 44 + 16000);
    }

    #[tokio::test]
    async fn test_counts_calls_and_fails_on_marker() {
        let client = FakeTtsClient::new(FakeTtsClientConfig {
            latency_ms: 0,
            fail_marker: Some("坏".to_string()),
            ..Default::default()
        });

        assert!(client.synthesize(request("好句子。")).await.is_ok());
        assert!(client.synthesize(request("坏句子。")).await.is_err());
        assert_eq!(client.call_count(), 2);
    }
}
