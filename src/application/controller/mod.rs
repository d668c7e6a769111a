//! Session Controller - 会话编排
//!
//! 把生成管线和播放引擎组合成一个交互会话：
//! 音色/语速/重复设置、文本处理、单句选择、播放控制、图片识别。
//! 所有结果通过 EventPublisher 发布，调用者不直接拿到返回值。
//!
//! SessionState 只通过一把 std Mutex 访问，锁不会跨越 await。
//! 后台任务携带启动时的 epoch，音色/语速变化后的旧结果直接丢弃。

mod state;

pub use state::{ControllerPhase, SessionState};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::application::error::ApplicationError;
use crate::application::pipeline::GenerationPipeline;
use crate::application::playback::{PlaybackEngine, PlaybackRequest};
use crate::application::ports::OcrEnginePort;
use crate::domain::{
    filter_recognized_text, ButtonState, RepeatMode, SpeechRate, VoiceCatalog,
};
use crate::infrastructure::events::{ControllerEvent, EventPublisher};

/// 会话初始设置
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub voice: String,
    pub speed_percent: i32,
    pub repeat_mode: RepeatMode,
    pub infinite_loop: bool,
    pub repeat_count: u32,
    pub interval_ms: u64,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            voice: "Mandarin Female (Xiaoyi)".to_string(),
            speed_percent: 0,
            repeat_mode: RepeatMode::Full,
            infinite_loop: false,
            repeat_count: 1,
            interval_ms: 500,
        }
    }
}

struct ControllerShared {
    pipeline: Arc<GenerationPipeline>,
    engine: Arc<PlaybackEngine>,
    events: Arc<EventPublisher>,
    voices: VoiceCatalog,
    ocr: Option<Arc<dyn OcrEnginePort>>,
    state: Mutex<SessionState>,
    /// 最近一次批量生成的序号
    batch_seq: AtomicU64,
    /// 最近一次播放请求的序号，旧播放的回调据此忽略
    play_seq: AtomicU64,
    /// 正在运行的后台任务数
    active_tasks: watch::Sender<usize>,
}

/// 后台任务结束（包括 panic）时计数减一
struct BackgroundGuard(Arc<ControllerShared>);

impl Drop for BackgroundGuard {
    fn drop(&mut self) {
        self.0.active_tasks.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// 会话控制器
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<ControllerShared>,
}

impl SessionController {
    pub fn new(
        pipeline: Arc<GenerationPipeline>,
        engine: Arc<PlaybackEngine>,
        events: Arc<EventPublisher>,
        voices: VoiceCatalog,
        ocr: Option<Arc<dyn OcrEnginePort>>,
        defaults: SessionDefaults,
    ) -> Result<Self, ApplicationError> {
        voices.resolve(&defaults.voice)?;
        let speed = SpeechRate::new(defaults.speed_percent)?;

        let mut state = SessionState::new(defaults.voice, speed);
        state.set_repeat(
            defaults.repeat_mode,
            defaults.infinite_loop,
            defaults.repeat_count,
            defaults.interval_ms,
        );

        tracing::info!(
            voice = %state.selected_voice,
            speed = %state.speed,
            repeat_mode = %state.repeat_mode,
            ocr_enabled = ocr.is_some(),
            "SessionController created"
        );

        let (active_tasks, _) = watch::channel(0);
        Ok(Self {
            shared: Arc::new(ControllerShared {
                pipeline,
                engine,
                events,
                voices,
                ocr,
                state: Mutex::new(state),
                batch_seq: AtomicU64::new(0),
                play_seq: AtomicU64::new(0),
                active_tasks,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self, message: impl Into<String>) {
        self.shared.events.publish_status(message);
    }

    fn refresh_buttons(&self) {
        let buttons = self.lock().buttons();
        self.shared.events.publish_buttons(buttons);
    }

    fn spawn_background<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shared.active_tasks.send_modify(|n| *n += 1);
        let guard = BackgroundGuard(self.shared.clone());
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        })
    }

    /// 当前音色对应的外部标识
    fn voice_id(&self, name: &str) -> String {
        match self.shared.voices.resolve(name) {
            Ok(voice) => voice.id.clone(),
            Err(_) => self.shared.voices.first().id.clone(),
        }
    }

    /// 停止播放，不发布状态
    fn halt_playback(&self) {
        self.shared.play_seq.fetch_add(1, Ordering::SeqCst);
        self.shared.engine.stop();
        let mut state = self.lock();
        state.is_playing = false;
        state.is_paused = false;
    }

    // ---------------- 设置 ----------------

    /// 切换音色
    ///
    /// 未知名称只发布状态消息。成功时停止播放并使已生成的音频失效。
    pub fn set_voice(&self, name: &str) {
        if let Err(e) = self.shared.voices.resolve(name) {
            self.status(format!("Status: Error | {}", e));
            return;
        }

        self.halt_playback();
        let mode = {
            let mut state = self.lock();
            state.selected_voice = name.to_string();
            state.invalidate_audio();
            state.clear_selection();
            state.repeat_mode
        };

        tracing::info!(voice = %name, "Voice changed");
        self.status(format!(
            "Status: Ready | Voice changed -> {} | Re-generate required",
            name
        ));
        self.shared.events.publish_mode(mode);
        self.refresh_buttons();
    }

    /// 调整语速（-50..=100）
    pub fn set_speed(&self, percent: i32) {
        let speed = match SpeechRate::new(percent) {
            Ok(speed) => speed,
            Err(e) => {
                self.status(format!("Status: Error | {}", e));
                return;
            }
        };

        let was_playing = self.lock().is_playing;
        if was_playing {
            self.halt_playback();
        }

        {
            let mut state = self.lock();
            state.speed = speed;
            state.invalidate_audio();
        }

        tracing::info!(speed = %speed, "Speed changed");
        self.status(format!(
            "Status: Ready | Speed: {} | Click 'Process' to regenerate",
            speed
        ));
        self.refresh_buttons();
    }

    /// 重复设置：无限循环时次数强制为 1，否则至少为 1
    pub fn set_repeat_config(&self, mode: RepeatMode, infinite: bool, count: u32, interval_ms: u64) {
        let mode = {
            let mut state = self.lock();
            state.set_repeat(mode, infinite, count, interval_ms);
            tracing::debug!(
                mode = %state.repeat_mode,
                repeat = %state.repeat_policy(),
                interval_ms = state.interval_ms,
                "Repeat config changed"
            );
            state.repeat_mode
        };
        self.shared.events.publish_mode(mode);
        self.refresh_buttons();
    }

    // ---------------- 文本处理 ----------------

    /// 处理文本：生成整段音频，发布分句，后台预生成所有单句
    ///
    /// 正在处理或文本为空时只发布状态消息并返回 None
    pub fn process(&self, text: &str, auto_play: bool) -> Option<JoinHandle<()>> {
        let text = text.trim().to_string();
        {
            let mut state = self.lock();
            if state.is_processing {
                drop(state);
                self.status("Status: Processing | Already running, please wait...");
                return None;
            }
            if text.is_empty() {
                drop(state);
                self.status("Status: Error | Please enter text first");
                return None;
            }
            state.is_processing = true;
        }

        self.halt_playback();
        let (epoch, voice_name, rate) = {
            let mut state = self.lock();
            state.invalidate_audio();
            (state.epoch, state.selected_voice.clone(), state.speed)
        };
        let voice_id = self.voice_id(&voice_name);
        self.refresh_buttons();

        tracing::info!(
            text_len = text.chars().count(),
            voice = %voice_name,
            speed = %rate,
            auto_play,
            "Processing text"
        );

        let this = self.clone();
        Some(self.spawn_background(async move {
            this.run_process(text, epoch, voice_name, voice_id, rate, auto_play)
                .await;
        }))
    }

    async fn run_process(
        &self,
        text: String,
        epoch: u64,
        voice_name: String,
        voice_id: String,
        rate: SpeechRate,
        auto_play: bool,
    ) {
        self.status(format!(
            "Status: Processing | Play Type: Full Text | Voice: {} | Splitting text...",
            voice_name
        ));

        match self
            .shared
            .pipeline
            .generate_full(&text, &voice_id, rate)
            .await
        {
            Ok(full) => {
                let accepted = {
                    let mut state = self.lock();
                    if state.epoch == epoch {
                        state.sentences = full.segments.clone();
                        state.full_audio_path = Some(full.path.clone());
                        state.clear_selection();
                        state.is_batch_processing = true;
                        if auto_play {
                            state.repeat_mode = RepeatMode::Full;
                        }
                        true
                    } else {
                        false
                    }
                };

                if accepted {
                    self.shared.events.publish_sentences(full.segments.clone());
                    self.status(format!(
                        "Status: Ready | Play Type: Full Text | Voice: {} | Audio Generated Successfully",
                        voice_name
                    ));
                    self.spawn_batch(full.segments, voice_id, rate);
                    self.refresh_buttons();

                    if auto_play {
                        self.shared.events.publish_mode(RepeatMode::Full);
                        self.status("Status: Processing | Generation complete, starting playback...");
                        self.play(true);
                    }
                } else {
                    tracing::debug!(epoch, "Discarding stale full audio");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Full audio generation failed");
                self.status(format!(
                    "Status: Error | Play Type: Full Text | Voice: {} | Error: {}",
                    voice_name, e
                ));
            }
        }

        self.lock().is_processing = false;
        self.refresh_buttons();
    }

    /// 后台预生成所有单句，失败只记日志
    fn spawn_batch(&self, segments: Vec<String>, voice_id: String, rate: SpeechRate) {
        let seq = self.shared.batch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let this = self.clone();
        self.spawn_background(async move {
            let report = this
                .shared
                .pipeline
                .generate_batch(&segments, &voice_id, rate)
                .await;
            if !report.is_success() {
                tracing::warn!(
                    failed = report.failed(),
                    total = report.outcomes.len(),
                    "Batch pre-generation incomplete"
                );
            }

            if this.shared.batch_seq.load(Ordering::SeqCst) == seq {
                this.lock().is_batch_processing = false;
            }
            this.refresh_buttons();
        });
    }

    // ---------------- 单句 ----------------

    /// 选择单句：切到单句模式，生成该句音频并自动播放
    pub fn select_segment(&self, index: usize) -> Option<JoinHandle<()>> {
        let (segment, epoch, voice_name, rate) = {
            let mut state = self.lock();
            if state.is_processing || state.is_batch_processing {
                drop(state);
                self.status("Status: Processing | Please wait for tasks to finish...");
                return None;
            }
            let Some(segment) = state.sentences.get(index).cloned() else {
                drop(state);
                self.status("Status: Error | Selected sentence is invalid");
                return None;
            };
            state.selected_single_index = Some(index);
            state.selected_single_text = Some(segment.clone());
            state.repeat_mode = RepeatMode::Single;
            (segment, state.epoch, state.selected_voice.clone(), state.speed)
        };
        let voice_id = self.voice_id(&voice_name);

        self.shared.events.publish_mode(RepeatMode::Single);
        self.status(format!(
            "Status: Processing | Play Type: Single Sentence | Generating audio... (Voice: {})",
            voice_name
        ));

        let this = self.clone();
        Some(self.spawn_background(async move {
            match this
                .shared
                .pipeline
                .generate_single(&segment, &voice_id, rate)
                .await
            {
                Ok(path) => {
                    let accepted = {
                        let mut state = this.lock();
                        if state.epoch == epoch && state.selected_single_index == Some(index) {
                            state.single_audio_path = Some(path);
                            true
                        } else {
                            false
                        }
                    };

                    if accepted {
                        this.status(format!(
                            "Status: Ready | Play Type: Single Sentence | Audio Generated (Voice: {})",
                            voice_name
                        ));
                        this.play(true);
                    } else {
                        tracing::debug!(index, "Discarding stale single audio");
                    }
                }
                Err(e) => {
                    tracing::error!(index, error = %e, "Single audio generation failed");
                    this.status(format!(
                        "Status: Error | Play Type: Single Sentence | {} (Voice: {})",
                        e, voice_name
                    ));
                }
            }
            this.refresh_buttons();
        }))
    }

    // ---------------- 播放 ----------------

    /// 播放当前模式对应的音频
    ///
    /// 音频不存在时发布 "Audio not found"，`skip_warning` 为 true 时静默
    pub fn play(&self, skip_warning: bool) {
        let (path, mode, policy, interval_ms, voice_name, summary) = {
            let state = self.lock();
            (
                state.current_audio_path().map(Path::to_path_buf),
                state.repeat_mode,
                state.repeat_policy(),
                state.interval_ms,
                state.selected_voice.clone(),
                state.repeat_summary(),
            )
        };

        let Some(path) = path.filter(|p| p.is_file()) else {
            if !skip_warning {
                self.status(format!("Status: Error | Audio not found for {}", mode));
            }
            self.refresh_buttons();
            return;
        };

        let seq = self.shared.play_seq.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.lock();
            state.is_playing = true;
            state.is_paused = false;
        }

        let on_done = self.clone();
        let on_fail = self.clone();
        let request = PlaybackRequest::new(path, policy)
            .with_interval(interval_ms)
            .on_complete(move || on_done.playback_finished(seq))
            .on_error(move |e| on_fail.playback_failed(seq, e));

        match self.shared.engine.play(request) {
            Ok(()) => self.status(format!(
                "Status: Playing | Play Type: {} | Voice: {} | {}",
                mode.label(),
                voice_name,
                summary
            )),
            Err(e) => {
                {
                    let mut state = self.lock();
                    state.is_playing = false;
                    state.is_paused = false;
                }
                self.status(format!(
                    "Status: Error | Play Type: {} | Voice: {} | Playback failed: {}",
                    mode.label(),
                    voice_name,
                    e
                ));
            }
        }
        self.refresh_buttons();
    }

    fn playback_finished(&self, seq: u64) {
        if self.shared.play_seq.load(Ordering::SeqCst) != seq {
            return;
        }
        let (mode, voice_name) = {
            let mut state = self.lock();
            state.is_playing = false;
            state.is_paused = false;
            (state.repeat_mode, state.selected_voice.clone())
        };
        self.status(format!(
            "Status: Completed | Play Type: {} | Voice: {}",
            mode.label(),
            voice_name
        ));
        self.refresh_buttons();
    }

    fn playback_failed(&self, seq: u64, error: ApplicationError) {
        if self.shared.play_seq.load(Ordering::SeqCst) != seq {
            return;
        }
        let mode = {
            let mut state = self.lock();
            state.is_playing = false;
            state.is_paused = false;
            state.repeat_mode
        };
        self.status(format!(
            "Status: Error | Play Type: {} | Playback failed: {}",
            mode.label(),
            error
        ));
        self.refresh_buttons();
    }

    pub fn pause(&self) {
        {
            let state = self.lock();
            if !state.is_playing || state.is_paused {
                return;
            }
        }

        self.shared.engine.pause();
        if !self.shared.engine.is_paused() {
            return;
        }

        let (mode, voice_name) = {
            let mut state = self.lock();
            state.is_paused = true;
            (state.repeat_mode, state.selected_voice.clone())
        };
        self.status(format!(
            "Status: Paused | Play Type: {} | Voice: {}",
            mode.label(),
            voice_name
        ));
        self.refresh_buttons();
    }

    pub fn resume(&self) {
        if !self.lock().is_paused {
            return;
        }

        self.shared.engine.resume();
        let (mode, voice_name) = {
            let mut state = self.lock();
            state.is_paused = false;
            (state.repeat_mode, state.selected_voice.clone())
        };
        self.status(format!(
            "Status: Playing | Play Type: {} | Voice: {}",
            mode.label(),
            voice_name
        ));
        self.refresh_buttons();
    }

    pub fn stop(&self) {
        self.halt_playback();
        let (mode, voice_name) = {
            let state = self.lock();
            (state.repeat_mode, state.selected_voice.clone())
        };
        self.status(format!(
            "Status: Ready | Play Type: {} | Voice: {} | Playback Stopped",
            mode.label(),
            voice_name
        ));
        self.refresh_buttons();
    }

    // ---------------- 图片识别 ----------------

    /// 识别图片中的中文文本，结果通过 OcrResult 事件发布
    pub fn recognize_image(&self, path: impl AsRef<Path>) -> Option<JoinHandle<()>> {
        let path: PathBuf = path.as_ref().to_path_buf();

        let Some(ocr) = self.shared.ocr.clone() else {
            self.status("Status: Error | OCR engine not configured");
            return None;
        };
        if !path.is_file() {
            self.status(format!("Status: Error | Image not found: {}", path.display()));
            return None;
        }

        self.status("Status: Processing | Recognizing text from image...");

        let this = self.clone();
        Some(self.spawn_background(async move {
            let result = async {
                let image = tokio::fs::read(&path).await.map_err(|e| {
                    ApplicationError::Recognition(format!("{}: {}", path.display(), e))
                })?;
                let raw = ocr.recognize(image).await?;
                Ok::<_, ApplicationError>(filter_recognized_text(&raw))
            }
            .await;

            match result {
                Ok(text) if text.is_empty() => {
                    this.status("Status: Ready | No text recognized");
                }
                Ok(text) => {
                    let lines = text.lines().count();
                    tracing::info!(lines, "Image recognized");
                    this.shared.events.publish_ocr_result(text);
                    this.status(format!(
                        "Status: Ready | Recognition completed, total {} lines | OCR: Success",
                        lines
                    ));
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "OCR failed");
                    this.status(format!("Status: Error | OCR failed: {}", e));
                }
            }
            this.refresh_buttons();
        }))
    }

    // ---------------- 查询 ----------------

    /// 等待所有后台任务（处理、批量生成、单句、识别）结束
    pub async fn wait_for_background(&self) {
        let mut rx = self.shared.active_tasks.subscribe();
        let _ = rx.wait_for(|active| *active == 0).await;
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn phase(&self) -> ControllerPhase {
        self.lock().phase()
    }

    pub fn buttons(&self) -> ButtonState {
        self.lock().buttons()
    }

    pub fn voice_names(&self) -> Vec<String> {
        self.shared.voices.names()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.shared.events.subscribe()
    }
}
