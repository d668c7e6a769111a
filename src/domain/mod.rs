//! Domain Layer - 领域层
//!
//! 纯逻辑，不依赖运行时:
//! - 文本分割器
//! - 音色目录与语速
//! - 播放值对象（重复策略、状态、按钮使能）
//! - OCR 文本过滤

mod ocr_filter;
mod playback;
mod text_segmenter;
mod voice;

pub use ocr_filter::filter_recognized_text;
pub use playback::{compute_buttons, ButtonState, PlaybackState, RepeatMode, RepeatPolicy};
pub use text_segmenter::{
    normalize_for_key, segment_text, segment_text_default, SegmentConfig, DEFAULT_DELIMITERS,
};
pub use voice::{
    default_voices, SpeechRate, Voice, VoiceCatalog, VoiceError, MAX_SPEED_PERCENT,
    MIN_SPEED_PERCENT,
};
