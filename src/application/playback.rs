//! Playback Engine - 播放引擎
//!
//! 同一时刻只有一个播放会话。重复次数、间隔、暂停都在这里的后台循环中处理，
//! 平台播放器只负责“播一次”和“是否还在出声”。
//!
//! 状态: Idle → Loading → Playing ⇄ Paused → (Idle | Completed)

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::application::error::ApplicationError;
use crate::application::ports::AudioPlayerPort;
use crate::domain::{PlaybackState, RepeatPolicy};

/// 默认轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

type CompleteCallback = Box<dyn FnOnce() + Send>;
type ErrorCallback = Box<dyn FnOnce(ApplicationError) + Send>;

/// 播放请求
pub struct PlaybackRequest {
    pub audio: PathBuf,
    pub repeat: RepeatPolicy,
    /// 两次播放之间的静默时间（毫秒）
    pub interval_ms: u64,
    on_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

impl PlaybackRequest {
    pub fn new(audio: impl Into<PathBuf>, repeat: RepeatPolicy) -> Self {
        Self {
            audio: audio.into(),
            repeat,
            interval_ms: 0,
            on_complete: None,
            on_error: None,
        }
    }

    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// 自然播放完所有次数后调用一次（stop 不会触发）
    pub fn on_complete(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// 播放过程中出错时调用
    pub fn on_error(mut self, callback: impl FnOnce(ApplicationError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for PlaybackRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackRequest")
            .field("audio", &self.audio)
            .field("repeat", &self.repeat)
            .field("interval_ms", &self.interval_ms)
            .finish_non_exhaustive()
    }
}

/// 引擎配置
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// 停止/暂停的最大响应延迟
    pub poll_interval: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// 引擎与后台循环共享的会话标志
#[derive(Debug)]
struct PlaybackSession {
    playing: AtomicBool,
    paused: AtomicBool,
}

impl PlaybackSession {
    fn new() -> Self {
        Self {
            playing: AtomicBool::new(true),
            paused: AtomicBool::new(false),
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.playing.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct EngineState {
    state: PlaybackState,
    session: Option<Arc<PlaybackSession>>,
}

/// 一次播放能否开始
#[derive(Debug)]
enum PassStart {
    Started,
    Paused,
    Cancelled,
    Failed(ApplicationError),
}

/// 循环退出原因
enum LoopExit {
    Finished,
    Stopped,
    Failed(ApplicationError),
}

/// 播放引擎
pub struct PlaybackEngine {
    player: Arc<dyn AudioPlayerPort>,
    config: PlaybackConfig,
    inner: Arc<Mutex<EngineState>>,
}

impl PlaybackEngine {
    pub fn new(player: Arc<dyn AudioPlayerPort>, config: PlaybackConfig) -> Self {
        tracing::info!(
            player = player.name(),
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            "PlaybackEngine created"
        );
        Self {
            player,
            config,
            inner: Arc::new(Mutex::new(EngineState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        lock_state(&self.inner)
    }

    /// 开始播放，替换当前会话
    ///
    /// 文件不存在时返回 AudioNotFound 且状态不变。需要在 tokio 运行时中调用。
    pub fn play(&self, mut request: PlaybackRequest) -> Result<(), ApplicationError> {
        if !request.audio.is_file() {
            return Err(ApplicationError::audio_not_found(&request.audio));
        }

        self.stop();
        self.lock().state = PlaybackState::Loading;

        if let Err(e) = self.player.load(&request.audio) {
            tracing::error!(path = %request.audio.display(), error = %e, "Failed to load audio");
            self.lock().state = PlaybackState::Idle;
            return Err(e.into());
        }

        let session = Arc::new(PlaybackSession::new());
        {
            let mut inner = self.lock();
            inner.session = Some(session.clone());
            inner.state = PlaybackState::Playing;
        }

        tracing::info!(
            path = %request.audio.display(),
            repeat = %request.repeat,
            interval_ms = request.interval_ms,
            "Playback started"
        );

        let player = self.player.clone();
        let inner = self.inner.clone();
        let poll = self.config.poll_interval;
        let repeat = request.repeat;
        let interval = Duration::from_millis(request.interval_ms);
        let on_complete = request.on_complete.take();
        let on_error = request.on_error.take();

        tokio::spawn(async move {
            let exit = run_loop(player.as_ref(), &inner, &session, repeat, interval, poll).await;

            // 只有仍是当前会话时才能改变引擎状态
            let owned = {
                let mut guard = lock_state(&inner);
                let current = guard
                    .session
                    .as_ref()
                    .is_some_and(|s| Arc::ptr_eq(s, &session));
                if current && session.is_playing() {
                    guard.session = None;
                    guard.state = match exit {
                        LoopExit::Finished => PlaybackState::Completed,
                        _ => PlaybackState::Idle,
                    };
                    true
                } else {
                    false
                }
            };

            match exit {
                LoopExit::Finished if owned => {
                    tracing::info!("Playback completed");
                    if let Some(callback) = on_complete {
                        callback();
                    }
                }
                LoopExit::Failed(e) if owned => {
                    tracing::error!(error = %e, "Playback aborted");
                    if let Some(callback) = on_error {
                        callback(e);
                    }
                }
                _ => tracing::debug!("Playback session ended"),
            }
        });

        Ok(())
    }

    /// 暂停（只在 Playing 时生效）
    pub fn pause(&self) {
        let mut inner = self.lock();
        if inner.state != PlaybackState::Playing {
            return;
        }
        let Some(session) = inner.session.clone() else {
            return;
        };
        session.paused.store(true, Ordering::SeqCst);
        inner.state = PlaybackState::Paused;
        drop(inner);

        self.player.pause();
        tracing::debug!("Playback paused");
    }

    /// 恢复（只在 Paused 时生效）
    pub fn resume(&self) {
        let mut inner = self.lock();
        if inner.state != PlaybackState::Paused {
            return;
        }
        let Some(session) = inner.session.clone() else {
            return;
        };
        inner.state = PlaybackState::Playing;
        drop(inner);

        self.player.resume();
        session.paused.store(false, Ordering::SeqCst);
        tracing::debug!("Playback resumed");
    }

    /// 停止播放，任意状态下都可调用，不会触发完成回调
    pub fn stop(&self) {
        let stopped = {
            let mut inner = self.lock();
            inner.state = PlaybackState::Idle;
            // 在锁内取消，后台循环不会在取消后再开始新一遍
            match inner.session.take() {
                Some(session) => {
                    session.cancel();
                    true
                }
                None => false,
            }
        };

        if stopped {
            tracing::debug!("Playback stopped");
        }

        if let Err(e) = self.player.stop() {
            tracing::warn!(error = %e, "Player stop failed");
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    /// 正在播放（含暂停和加载中）
    pub fn is_playing(&self) -> bool {
        self.state().is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.state() == PlaybackState::Paused
    }
}

fn lock_state(inner: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 在引擎锁内确认会话仍是当前会话且未暂停，然后开始一次播放
///
/// pause/stop/play 都要先拿这把锁，所以检查和 play_once 之间不会插入它们
fn start_pass(
    player: &dyn AudioPlayerPort,
    inner: &Mutex<EngineState>,
    session: &Arc<PlaybackSession>,
) -> PassStart {
    let guard = lock_state(inner);
    let current = guard
        .session
        .as_ref()
        .is_some_and(|s| Arc::ptr_eq(s, session));
    if !current || !session.is_playing() {
        return PassStart::Cancelled;
    }
    if session.is_paused() {
        return PassStart::Paused;
    }
    match player.play_once() {
        Ok(()) => PassStart::Started,
        Err(e) => PassStart::Failed(e.into()),
    }
}

async fn run_loop(
    player: &dyn AudioPlayerPort,
    inner: &Mutex<EngineState>,
    session: &Arc<PlaybackSession>,
    repeat: RepeatPolicy,
    interval: Duration,
    poll: Duration,
) -> LoopExit {
    let mut played: u32 = 0;

    loop {
        while session.is_paused() {
            if !session.is_playing() {
                return LoopExit::Stopped;
            }
            tokio::time::sleep(poll).await;
        }
        match start_pass(player, inner, session) {
            PassStart::Started => {}
            PassStart::Paused => continue,
            PassStart::Cancelled => return LoopExit::Stopped,
            PassStart::Failed(e) => return LoopExit::Failed(e),
        }

        // 等待本次播放结束，暂停期间不推进
        loop {
            tokio::time::sleep(poll).await;
            if !session.is_playing() {
                return LoopExit::Stopped;
            }
            if session.is_paused() {
                continue;
            }
            if !player.is_busy() {
                break;
            }
        }

        played = played.saturating_add(1);
        tracing::debug!(played, repeat = %repeat, "Playback pass finished");

        if !repeat.has_more(played) {
            return LoopExit::Finished;
        }

        // 间隔按轮询粒度切片，暂停时冻结
        let mut remaining = interval;
        while !remaining.is_zero() {
            if !session.is_playing() {
                return LoopExit::Stopped;
            }
            if session.is_paused() {
                tokio::time::sleep(poll).await;
                continue;
            }
            let step = remaining.min(poll);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }
    }
}
