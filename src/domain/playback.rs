//! Playback - 播放相关值对象

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// 播放目标：整段文本或选中的单句
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    #[default]
    Full,
    Single,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Full => "full",
            RepeatMode::Single => "single",
        }
    }

    /// 状态栏显示名
    pub fn label(&self) -> &'static str {
        match self {
            RepeatMode::Full => "Full Text",
            RepeatMode::Single => "Single Sentence",
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 重复策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPolicy {
    Times(NonZeroU32),
    Infinite,
}

impl RepeatPolicy {
    /// 由界面配置构造：无限循环时忽略次数，次数至少为 1
    pub fn from_settings(infinite: bool, count: u32) -> Self {
        if infinite {
            RepeatPolicy::Infinite
        } else {
            RepeatPolicy::Times(NonZeroU32::new(count).unwrap_or(NonZeroU32::MIN))
        }
    }

    pub fn once() -> Self {
        RepeatPolicy::Times(NonZeroU32::MIN)
    }

    /// 第 `played` 次播放结束后是否还有下一次
    pub fn has_more(&self, played: u32) -> bool {
        match self {
            RepeatPolicy::Infinite => true,
            RepeatPolicy::Times(n) => played < n.get(),
        }
    }
}

impl std::fmt::Display for RepeatPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatPolicy::Infinite => f.write_str("Infinite"),
            RepeatPolicy::Times(n) => write!(f, "{}", n),
        }
    }
}

/// 播放引擎状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Completed,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Completed => "completed",
        }
    }

    /// 暂停也算“正在播放”
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PlaybackState::Loading | PlaybackState::Playing | PlaybackState::Paused
        )
    }
}

/// 按钮使能状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ButtonState {
    pub play_enabled: bool,
    pub pause_enabled: bool,
    pub stop_enabled: bool,
}

/// 按钮使能是当前状态的纯函数
pub fn compute_buttons(has_audio: bool, is_playing: bool, is_paused: bool) -> ButtonState {
    ButtonState {
        play_enabled: has_audio && (!is_playing || is_paused),
        pause_enabled: is_playing && !is_paused,
        stop_enabled: is_playing,
    }
}
