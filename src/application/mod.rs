//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、AudioCache、AudioPlayer、OcrEngine）
//! - pipeline: 音频生成管线（缓存、single-flight、批量）
//! - playback: 播放引擎（重复、间隔、暂停）
//! - controller: 会话编排
//! - error: 应用层错误定义

pub mod controller;
pub mod error;
pub mod pipeline;
pub mod playback;
pub mod ports;

pub use controller::{ControllerPhase, SessionController, SessionDefaults, SessionState};
pub use error::ApplicationError;
pub use pipeline::{BatchReport, FullAudio, GenerationPipeline, PipelineConfig, SegmentOutcome};
pub use playback::{PlaybackConfig, PlaybackEngine, PlaybackRequest, DEFAULT_POLL_INTERVAL};
