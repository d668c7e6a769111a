//! Headless Player - 不出声的计时播放器
//!
//! 用 symphonia 探测音频时长，按墙钟时间模拟“正在播放”，暂停期间不计时。
//! 适用于无音频设备的环境与端到端测试。

use std::fs::File;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioPlayerPort, PlayerError};

#[derive(Debug, Default)]
struct HeadlessState {
    duration: Option<Duration>,
    started_at: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl HeadlessState {
    fn elapsed(&self, now: Instant) -> Duration {
        let Some(started) = self.started_at else {
            return Duration::ZERO;
        };
        let frozen_until = self.paused_at.unwrap_or(now);
        frozen_until
            .saturating_duration_since(started)
            .saturating_sub(self.paused_total)
    }
}

/// Headless Player
#[derive(Default)]
pub struct HeadlessPlayer {
    state: Mutex<HeadlessState>,
}

impl HeadlessPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 使用 symphonia 探测音频时长
///
/// 优先用容器头里的帧数，没有时逐包累加
pub fn probe_duration(path: &Path) -> Result<Duration, PlayerError> {
    let file = File::open(path)
        .map_err(|e| PlayerError::LoadFailed(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlayerError::LoadFailed(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| PlayerError::LoadFailed("No audio track found".to_string()))?;

    let track_id = track.id;
    let params = track.codec_params.clone();

    let to_duration = |frames: u64| -> Option<Duration> {
        if let Some(time_base) = params.time_base {
            let time = time_base.calc_time(frames);
            Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac))
        } else {
            params
                .sample_rate
                .filter(|rate| *rate > 0)
                .map(|rate| Duration::from_secs_f64(frames as f64 / rate as f64))
        }
    };

    if let Some(frames) = params.n_frames {
        if let Some(duration) = to_duration(frames) {
            return Ok(duration);
        }
    }

    let mut total: u64 = 0;
    loop {
        match format.next_packet() {
            Ok(packet) if packet.track_id() == track_id => total += packet.dur(),
            Ok(_) => {}
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(PlayerError::LoadFailed(format!("Packet read error: {}", e)));
            }
        }
    }

    to_duration(total)
        .ok_or_else(|| PlayerError::LoadFailed("Unknown audio duration".to_string()))
}

impl AudioPlayerPort for HeadlessPlayer {
    fn load(&self, path: &Path) -> Result<(), PlayerError> {
        let duration = probe_duration(path)?;
        tracing::debug!(
            path = %path.display(),
            duration_ms = duration.as_millis() as u64,
            "Audio loaded"
        );

        *self.lock() = HeadlessState {
            duration: Some(duration),
            ..Default::default()
        };
        Ok(())
    }

    fn play_once(&self) -> Result<(), PlayerError> {
        let mut state = self.lock();
        if state.duration.is_none() {
            return Err(PlayerError::NotLoaded);
        }
        state.started_at = Some(Instant::now());
        state.paused_at = None;
        state.paused_total = Duration::ZERO;
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.lock();
        if state.started_at.is_some() && state.paused_at.is_none() {
            state.paused_at = Some(Instant::now());
        }
    }

    fn resume(&self) {
        let mut state = self.lock();
        if let Some(paused_at) = state.paused_at.take() {
            state.paused_total += paused_at.elapsed();
        }
    }

    fn stop(&self) -> Result<(), PlayerError> {
        let mut state = self.lock();
        state.started_at = None;
        state.paused_at = None;
        state.paused_total = Duration::ZERO;
        Ok(())
    }

    fn is_busy(&self) -> bool {
        let state = self.lock();
        let (Some(duration), Some(_)) = (state.duration, state.started_at) else {
            return false;
        };
        state.paused_at.is_some() || state.elapsed(Instant::now()) < duration
    }

    fn name(&self) -> &'static str {
        "headless"
    }
}
