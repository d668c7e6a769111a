//! 测试用播放器：每次播放保持“忙”若干次轮询，并记录调用

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::application::ports::{AudioPlayerPort, PlayerError};

pub(crate) struct ScriptedPlayer {
    busy_polls: u32,
    remaining: AtomicU32,
    paused: AtomicBool,
    plays: AtomicU32,
    fail_load: bool,
    fail_play: bool,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedPlayer {
    /// 每次 play_once 后 `is_busy` 连续返回 true 的次数
    pub(crate) fn new(busy_polls: u32) -> Self {
        Self {
            busy_polls,
            remaining: AtomicU32::new(0),
            paused: AtomicBool::new(false),
            plays: AtomicU32::new(0),
            fail_load: false,
            fail_play: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Self::new(0)
        }
    }

    pub(crate) fn failing_play() -> Self {
        Self {
            fail_play: true,
            ..Self::new(0)
        }
    }

    pub(crate) fn plays(&self) -> u32 {
        self.plays.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: &'static str) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl AudioPlayerPort for ScriptedPlayer {
    fn load(&self, _path: &Path) -> Result<(), PlayerError> {
        self.record("load");
        if self.fail_load {
            return Err(PlayerError::LoadFailed("scripted".to_string()));
        }
        Ok(())
    }

    fn play_once(&self) -> Result<(), PlayerError> {
        self.record("play_once");
        if self.fail_play {
            return Err(PlayerError::DeviceError("scripted".to_string()));
        }
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.remaining.store(self.busy_polls, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.record("pause");
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.record("resume");
        self.paused.store(false, Ordering::SeqCst);
    }

    fn stop(&self) -> Result<(), PlayerError> {
        self.record("stop");
        self.remaining.store(0, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_busy(&self) -> bool {
        if self.paused.load(Ordering::SeqCst) {
            return true;
        }
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
