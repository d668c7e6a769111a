//! Null Player - 空播放器
//!
//! 加载只检查文件存在，播放立即结束

use std::path::Path;

use crate::application::ports::{AudioPlayerPort, PlayerError};

#[derive(Debug, Default)]
pub struct NullPlayer;

impl NullPlayer {
    pub fn new() -> Self {
        Self
    }
}

impl AudioPlayerPort for NullPlayer {
    fn load(&self, path: &Path) -> Result<(), PlayerError> {
        if !path.is_file() {
            return Err(PlayerError::LoadFailed(path.display().to_string()));
        }
        Ok(())
    }

    fn play_once(&self) -> Result<(), PlayerError> {
        Ok(())
    }

    fn pause(&self) {}

    fn resume(&self) {}

    fn stop(&self) -> Result<(), PlayerError> {
        Ok(())
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
