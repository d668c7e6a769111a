//! Session State - 控制器拥有的会话状态

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::domain::{compute_buttons, ButtonState, RepeatMode, RepeatPolicy, SpeechRate};

/// 控制器对外呈现的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    Idle,
    Processing,
    Ready,
    Playing,
    Paused,
}

/// 会话状态
///
/// 不变量: 音色或语速变化后两个音频路径都为 None，且 epoch 递增
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// 当前音色的显示名
    pub selected_voice: String,
    pub speed: SpeechRate,
    pub repeat_mode: RepeatMode,
    pub infinite_loop: bool,
    pub repeat_count: u32,
    pub interval_ms: u64,

    pub is_processing: bool,
    pub is_batch_processing: bool,
    pub is_playing: bool,
    pub is_paused: bool,

    pub sentences: Vec<String>,
    pub full_audio_path: Option<PathBuf>,
    pub single_audio_path: Option<PathBuf>,
    pub selected_single_index: Option<usize>,
    pub selected_single_text: Option<String>,

    /// 音频失效计数，后台任务据此丢弃过期结果
    pub epoch: u64,
}

impl SessionState {
    pub fn new(selected_voice: impl Into<String>, speed: SpeechRate) -> Self {
        Self {
            selected_voice: selected_voice.into(),
            speed,
            repeat_mode: RepeatMode::Full,
            infinite_loop: false,
            repeat_count: 1,
            interval_ms: 500,
            is_processing: false,
            is_batch_processing: false,
            is_playing: false,
            is_paused: false,
            sentences: Vec::new(),
            full_audio_path: None,
            single_audio_path: None,
            selected_single_index: None,
            selected_single_text: None,
            epoch: 0,
        }
    }

    pub fn phase(&self) -> ControllerPhase {
        if self.is_processing {
            ControllerPhase::Processing
        } else if self.is_playing && self.is_paused {
            ControllerPhase::Paused
        } else if self.is_playing {
            ControllerPhase::Playing
        } else if self.full_audio_path.is_some() || self.single_audio_path.is_some() {
            ControllerPhase::Ready
        } else {
            ControllerPhase::Idle
        }
    }

    /// 当前播放目标对应的音频路径
    pub fn current_audio_path(&self) -> Option<&Path> {
        match self.repeat_mode {
            RepeatMode::Full => self.full_audio_path.as_deref(),
            RepeatMode::Single => self.single_audio_path.as_deref(),
        }
    }

    pub fn repeat_policy(&self) -> RepeatPolicy {
        RepeatPolicy::from_settings(self.infinite_loop, self.repeat_count)
    }

    /// 使已生成的音频失效
    pub fn invalidate_audio(&mut self) {
        self.full_audio_path = None;
        self.single_audio_path = None;
        self.epoch += 1;
    }

    pub fn clear_selection(&mut self) {
        self.selected_single_index = None;
        self.selected_single_text = None;
    }

    pub fn set_repeat(&mut self, mode: RepeatMode, infinite: bool, count: u32, interval_ms: u64) {
        self.repeat_mode = mode;
        self.infinite_loop = infinite;
        self.repeat_count = if infinite { 1 } else { count.max(1) };
        self.interval_ms = interval_ms;
    }

    /// 按钮状态（检查磁盘上的文件是否仍存在）
    pub fn buttons(&self) -> ButtonState {
        let has_audio = self.current_audio_path().is_some_and(Path::is_file);
        compute_buttons(has_audio, self.is_playing, self.is_paused)
    }

    /// 状态栏里描述重复设置的片段
    pub fn repeat_summary(&self) -> String {
        format!(
            "Repeat: {} | Interval: {}ms",
            self.repeat_policy(),
            self.interval_ms
        )
    }
}
