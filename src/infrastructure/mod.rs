//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现以及事件发布

pub mod adapters;
pub mod events;

pub use adapters::{create_audio_player, FileAudioCache, FakeTtsClient, HttpOcrClient, HttpTtsClient};
pub use events::{ControllerEvent, EventPublisher};
