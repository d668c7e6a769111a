//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_cache;
mod audio_player;
mod ocr_engine;
mod tts_engine;

pub use audio_cache::{
    cache_key, sanitize_voice_id, AudioCachePort, CacheError, CacheKey, ClearStats, SegmentKind,
};
pub use audio_player::{AudioPlayerPort, PlayerBackend, PlayerError};
pub use ocr_engine::{OcrEnginePort, OcrError};
pub use tts_engine::{SynthesisRequest, SynthesisResponse, TtsEnginePort, TtsError};
