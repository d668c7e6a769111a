//! Player Adapter - 平台播放器实现与工厂

mod headless_player;
mod null_player;
mod rodio_player;
#[cfg(test)]
pub(crate) mod scripted_player;

pub use headless_player::{probe_duration, HeadlessPlayer};
pub use null_player::NullPlayer;
pub use rodio_player::RodioPlayer;

use std::sync::Arc;

use crate::application::ports::{AudioPlayerPort, PlayerBackend};

/// 根据配置创建播放器
///
/// 音频设备打不开时退回 HeadlessPlayer
pub fn create_audio_player(backend: PlayerBackend) -> Arc<dyn AudioPlayerPort> {
    let player: Arc<dyn AudioPlayerPort> = match backend {
        PlayerBackend::Rodio => match RodioPlayer::spawn() {
            Ok(player) => Arc::new(player),
            Err(e) => {
                tracing::warn!(error = %e, "Audio device unavailable, falling back to headless player");
                Arc::new(HeadlessPlayer::new())
            }
        },
        PlayerBackend::Headless => Arc::new(HeadlessPlayer::new()),
        PlayerBackend::Null => Arc::new(NullPlayer::new()),
    };
    tracing::info!(backend = player.name(), "Audio player created");
    player
}
