//! Voice - 音色目录与语速值对象

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 语速百分比的合法范围
pub const MIN_SPEED_PERCENT: i32 = -50;
pub const MAX_SPEED_PERCENT: i32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("Unknown voice: {0}")]
    NotFound(String),

    #[error("Duplicate voice name: {0}")]
    Duplicate(String),

    #[error("Invalid voice entry: {0}")]
    Invalid(String),

    #[error("Speed must be between -50% and +100%, got {0}%")]
    SpeedOutOfRange(i32),
}

/// 音色：界面显示名 + 外部 TTS 服务的不透明标识
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub id: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// 默认的普通话音色表
pub fn default_voices() -> Vec<Voice> {
    vec![
        Voice::new("Mandarin Female (Xiaoyi)", "zh-CN-XiaoyiNeural"),
        Voice::new("Mandarin Female (Xiaoxiao)", "zh-CN-XiaoxiaoNeural"),
        Voice::new("Mandarin Female (Yunxi)", "zh-CN-YunxiNeural"),
        Voice::new("Mandarin Male (Yunjian)", "zh-CN-YunjianNeural"),
        Voice::new("Mandarin Female (Lingling)", "zh-CN-LinglingNeural"),
        Voice::new("Northeast Mandarin Female", "zh-CN-Liaoning-XiaobeiNeural"),
    ]
}

/// 音色目录
///
/// 不变量:
/// - 至少一个音色
/// - 名称唯一，名称和标识都非空
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    pub fn new(voices: Vec<Voice>) -> Result<Self, VoiceError> {
        if voices.is_empty() {
            return Err(VoiceError::Invalid("voice catalog is empty".to_string()));
        }
        for (i, voice) in voices.iter().enumerate() {
            if voice.name.trim().is_empty() || voice.id.trim().is_empty() {
                return Err(VoiceError::Invalid(format!(
                    "entry {} has an empty name or id",
                    i
                )));
            }
            if voices[..i].iter().any(|v| v.name == voice.name) {
                return Err(VoiceError::Duplicate(voice.name.clone()));
            }
        }
        Ok(Self { voices })
    }

    pub fn resolve(&self, name: &str) -> Result<&Voice, VoiceError> {
        self.voices
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| VoiceError::NotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.voices.iter().map(|v| v.name.clone()).collect()
    }

    pub fn first(&self) -> &Voice {
        // new() 保证非空
        &self.voices[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self {
            voices: default_voices(),
        }
    }
}

/// 语速（相对默认语速的百分比，带符号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpeechRate(i32);

impl SpeechRate {
    pub fn new(percent: i32) -> Result<Self, VoiceError> {
        if !(MIN_SPEED_PERCENT..=MAX_SPEED_PERCENT).contains(&percent) {
            return Err(VoiceError::SpeedOutOfRange(percent));
        }
        Ok(Self(percent))
    }

    pub fn percent(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for SpeechRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+}%", self.0)
    }
}
