//! ShadowTTS - 跟读练习 TTS 播放器
//!
//! 读取文本（命令行、标准输入或图片识别），生成整段与单句音频，
//! 按重复设置播放，Ctrl-C 停止。

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio::sync::broadcast;

use shadowtts::application::ports::{AudioCachePort, OcrEnginePort, TtsEnginePort};
use shadowtts::application::{
    GenerationPipeline, PipelineConfig, PlaybackConfig, PlaybackEngine, SessionController,
    SessionDefaults,
};
use shadowtts::cli::Cli;
use shadowtts::config::{load_config, load_config_from_path, print_config, AppConfig, TtsBackend};
use shadowtts::domain::VoiceCatalog;
use shadowtts::infrastructure::adapters::{
    create_audio_player, FakeTtsClient, FileAudioCache, HttpOcrClient, HttpOcrClientConfig,
    HttpTtsClient, HttpTtsClientConfig,
};
use shadowtts::infrastructure::events::{ControllerEvent, EventPublisher};

/// 等待播放结束时的检查间隔
const PLAYBACK_WATCH_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = match &cli.config {
        Some(path) => load_config_from_path(Some(path)),
        None => load_config(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!("{},shadowtts={}", config.log.level, config.log.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("ShadowTTS - 跟读练习 TTS 播放器");
    print_config(&config);

    let voices = VoiceCatalog::new(config.voices.clone())?;
    if cli.list_voices {
        for voice in voices.iter() {
            println!("{}\t{}", voice.name, voice.id);
        }
        return Ok(());
    }

    let controller = build_controller(&config, voices).await?;
    apply_cli_overrides(&controller, &cli, &config);

    // 事件日志
    let logger = tokio::spawn(log_events(controller.subscribe()));

    let text = match &cli.image {
        Some(image) => recognize(&controller, image).await?,
        None => match cli.inline_text() {
            Some(text) => text,
            None => read_stdin().await?,
        },
    };

    let auto_play = !cli.no_play && cli.sentence.is_none();
    if let Some(handle) = controller.process(&text, auto_play) {
        handle.await?;
    }
    controller.wait_for_background().await;

    if let (Some(index), false) = (cli.sentence, cli.no_play) {
        if let Some(handle) = controller.select_segment(index) {
            handle.await?;
        }
    }

    if !cli.no_play {
        wait_for_playback(&controller).await;
    }

    controller.stop();
    controller.wait_for_background().await;
    logger.abort();

    tracing::info!("ShadowTTS exited");
    Ok(())
}

/// 组装各层组件
async fn build_controller(
    config: &AppConfig,
    voices: VoiceCatalog,
) -> anyhow::Result<SessionController> {
    let cache: Arc<dyn AudioCachePort> = Arc::new(
        FileAudioCache::new(&config.cache.dir, config.cache.extension.clone()).await?,
    );

    let tts: Arc<dyn TtsEnginePort> = match config.tts.backend {
        TtsBackend::Http => {
            let tts_config = HttpTtsClientConfig::new(config.tts.url.clone())
                .with_timeout(config.tts.timeout_secs)
                .with_max_retries(config.tts.max_retries);
            Arc::new(HttpTtsClient::new(tts_config)?)
        }
        TtsBackend::Fake => Arc::new(FakeTtsClient::with_defaults()),
    };

    let ocr: Option<Arc<dyn OcrEnginePort>> = if config.ocr.enabled {
        let ocr_config =
            HttpOcrClientConfig::new(config.ocr.url.clone()).with_timeout(config.ocr.timeout_secs);
        Some(Arc::new(HttpOcrClient::new(ocr_config)?) as Arc<dyn OcrEnginePort>)
    } else {
        None
    };

    let pipeline = Arc::new(GenerationPipeline::new(
        tts,
        cache,
        PipelineConfig {
            segment: config.generation.segment_config(),
            max_concurrent: config.generation.max_concurrent,
            clear_on_start: config.cache.clear_on_start,
        },
    ));
    if let Err(e) = pipeline.initialize().await {
        tracing::warn!(error = %e, "Failed to clear audio cache on start");
    }

    let player = create_audio_player(config.playback.backend);
    let engine = Arc::new(PlaybackEngine::new(
        player,
        PlaybackConfig {
            poll_interval: config.playback.poll_interval(),
        },
    ));

    let events = Arc::new(EventPublisher::with_capacity(config.events.capacity));

    let defaults = SessionDefaults {
        voice: config
            .session
            .default_voice
            .clone()
            .unwrap_or_else(|| voices.first().name.clone()),
        speed_percent: config.session.speed_percent,
        repeat_mode: config.session.repeat_mode,
        infinite_loop: config.session.infinite_loop,
        repeat_count: config.session.repeat_count,
        interval_ms: config.session.interval_ms,
    };

    Ok(SessionController::new(
        pipeline, engine, events, voices, ocr, defaults,
    )?)
}

fn apply_cli_overrides(controller: &SessionController, cli: &Cli, config: &AppConfig) {
    if let Some(voice) = &cli.voice {
        controller.set_voice(voice);
    }
    if let Some(speed) = cli.speed {
        controller.set_speed(speed);
    }

    let session = &config.session;
    controller.set_repeat_config(
        cli.repeat_mode(session.repeat_mode),
        cli.infinite || session.infinite_loop,
        cli.repeat.unwrap_or(session.repeat_count),
        cli.interval_ms.unwrap_or(session.interval_ms),
    );
}

/// 识别图片并取回识别出的文本
async fn recognize(
    controller: &SessionController,
    image: &std::path::Path,
) -> anyhow::Result<String> {
    let mut rx = controller.subscribe();
    let handle = controller
        .recognize_image(image)
        .ok_or_else(|| anyhow::anyhow!("Cannot recognize image: {}", image.display()))?;
    handle.await?;

    loop {
        match rx.try_recv() {
            Ok(ControllerEvent::OcrResult { text }) => return Ok(text),
            Ok(_) => continue,
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => anyhow::bail!("No text recognized from {}", image.display()),
        }
    }
}

async fn read_stdin() -> anyhow::Result<String> {
    let mut text = String::new();
    tokio::io::stdin().read_to_string(&mut text).await?;
    Ok(text)
}

/// 等待播放自然结束或 Ctrl-C
async fn wait_for_playback(controller: &SessionController) {
    let finished = async {
        while controller.snapshot().is_playing {
            tokio::time::sleep(PLAYBACK_WATCH_INTERVAL).await;
        }
    };

    tokio::select! {
        _ = finished => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Failed to listen for ctrl-c");
            }
            tracing::info!("Received shutdown signal");
        }
    }
}

async fn log_events(mut rx: broadcast::Receiver<ControllerEvent>) {
    loop {
        match rx.recv().await {
            Ok(ControllerEvent::Status { message }) => tracing::info!("{}", message),
            Ok(ControllerEvent::SentencesReady { segments }) => {
                for (index, segment) in segments.iter().enumerate() {
                    tracing::info!(index, "{}", segment);
                }
            }
            Ok(ControllerEvent::ModeChanged { mode }) => {
                tracing::debug!(mode = %mode, "Mode changed");
            }
            Ok(ControllerEvent::ButtonsUpdate { .. }) | Ok(ControllerEvent::OcrResult { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event logger lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
