//! Generation Pipeline - 音频生成管线
//!
//! 文本 → 分句 → 缓存查找 → 外部合成 → 原子写入缓存。
//! 同一个缓存 key 同时只会有一次合成在进行，并发调用者共享结果。

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    cache_key, AudioCachePort, CacheKey, SegmentKind, SynthesisRequest, TtsEnginePort,
};
use crate::domain::{segment_text, SegmentConfig, SpeechRate};

type GenerationResult = Result<PathBuf, ApplicationError>;
type SharedGeneration = Shared<BoxFuture<'static, GenerationResult>>;

/// 管线配置
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// 分句配置
    pub segment: SegmentConfig,
    /// 同时进行的合成请求上限，0 表示不限制
    pub max_concurrent: usize,
    /// 初始化时清空缓存目录
    pub clear_on_start: bool,
}

/// 整段生成结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullAudio {
    pub path: PathBuf,
    /// 分句结果，按原文顺序
    pub segments: Vec<String>,
}

/// 单个片段的批量生成结果
#[derive(Debug, Clone)]
pub struct SegmentOutcome {
    pub index: usize,
    pub result: GenerationResult,
}

/// 批量生成报告
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// 按片段下标排序
    pub outcomes: Vec<SegmentOutcome>,
}

impl BatchReport {
    /// 所有片段都成功
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// 音频生成管线
pub struct GenerationPipeline {
    tts_engine: Arc<dyn TtsEnginePort>,
    audio_cache: Arc<dyn AudioCachePort>,
    config: PipelineConfig,
    limiter: Option<Arc<Semaphore>>,
    in_flight: DashMap<CacheKey, SharedGeneration>,
}

impl GenerationPipeline {
    pub fn new(
        tts_engine: Arc<dyn TtsEnginePort>,
        audio_cache: Arc<dyn AudioCachePort>,
        config: PipelineConfig,
    ) -> Self {
        let limiter = (config.max_concurrent > 0)
            .then(|| Arc::new(Semaphore::new(config.max_concurrent)));

        Self {
            tts_engine,
            audio_cache,
            config,
            limiter,
            in_flight: DashMap::new(),
        }
    }

    /// 启动时的缓存准备
    pub async fn initialize(&self) -> Result<(), ApplicationError> {
        tracing::info!(
            max_concurrent = self.config.max_concurrent,
            clear_on_start = self.config.clear_on_start,
            "GenerationPipeline initializing"
        );

        if !self.tts_engine.health_check().await {
            tracing::warn!("TTS service health check failed, synthesis may not be available");
        }

        if self.config.clear_on_start {
            let stats = self.audio_cache.clear_all().await?;
            if stats.failed > 0 {
                tracing::warn!(failed = stats.failed, "Some cache entries could not be removed");
            }
        }
        Ok(())
    }

    /// 生成整段文本的音频
    pub async fn generate_full(
        &self,
        text: &str,
        voice_id: &str,
        rate: SpeechRate,
    ) -> Result<FullAudio, ApplicationError> {
        if text.trim().is_empty() {
            return Err(ApplicationError::empty_input("text is blank"));
        }

        let segments = segment_text(text, &self.config.segment);
        if segments.is_empty() {
            return Err(ApplicationError::empty_input("no segments"));
        }

        let clean_text = segments.concat();
        let key = cache_key(&clean_text, voice_id, rate, SegmentKind::Full);

        tracing::info!(
            segments = segments.len(),
            text_len = clean_text.chars().count(),
            voice_id = %voice_id,
            rate = %rate,
            "Generating full audio"
        );

        let path = self.generate_keyed(key, clean_text).await?;
        Ok(FullAudio { path, segments })
    }

    /// 生成单句音频
    pub async fn generate_single(
        &self,
        segment: &str,
        voice_id: &str,
        rate: SpeechRate,
    ) -> Result<PathBuf, ApplicationError> {
        let text = segment.trim();
        if text.is_empty() {
            return Err(ApplicationError::empty_input("segment is blank"));
        }

        let key = cache_key(text, voice_id, rate, SegmentKind::Single);
        self.generate_keyed(key, text.to_string()).await
    }

    /// 为所有片段生成单句音频
    ///
    /// 每个片段一个任务，全部等待完成，单个失败不影响其他片段
    pub async fn generate_batch(
        &self,
        segments: &[String],
        voice_id: &str,
        rate: SpeechRate,
    ) -> BatchReport {
        tracing::info!(segments = segments.len(), "Batch generation started");

        let tasks = segments.iter().enumerate().map(|(index, segment)| async move {
            let result = self.generate_single(segment, voice_id, rate).await;
            if let Err(e) = &result {
                tracing::warn!(index, error = %e, "Segment generation failed");
            }
            SegmentOutcome { index, result }
        });

        let report = BatchReport {
            outcomes: join_all(tasks).await,
        };

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch generation finished"
        );
        report
    }

    /// 缓存命中直接返回，否则加入（或发起）该 key 的合成
    async fn generate_keyed(&self, key: CacheKey, text: String) -> GenerationResult {
        let path = self.audio_cache.path_for(&key);
        if self.audio_cache.exists(&path) {
            tracing::debug!(path = %path.display(), "Cache hit");
            return Ok(path);
        }

        let shared = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                tracing::debug!(path = %path.display(), "Joining in-flight generation");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                tracing::debug!(path = %path.display(), "Cache miss");
                let generation = synthesize_and_store(
                    self.tts_engine.clone(),
                    self.audio_cache.clone(),
                    self.limiter.clone(),
                    key.clone(),
                    text,
                )
                .boxed()
                .shared();
                entry.insert(generation.clone());
                generation
            }
        };

        let result = shared.clone().await;
        self.in_flight
            .remove_if(&key, |_, current| current.ptr_eq(&shared));
        result
    }
}

async fn synthesize_and_store(
    tts_engine: Arc<dyn TtsEnginePort>,
    audio_cache: Arc<dyn AudioCachePort>,
    limiter: Option<Arc<Semaphore>>,
    key: CacheKey,
    text: String,
) -> GenerationResult {
    let _permit = match limiter {
        Some(semaphore) => Some(
            semaphore
                .acquire_owned()
                .await
                .map_err(|_| ApplicationError::generation("generation limiter closed"))?,
        ),
        None => None,
    };

    // 排队期间可能已有别的生成写入了同一个文件
    let path = audio_cache.path_for(&key);
    if audio_cache.exists(&path) {
        return Ok(path);
    }

    let response = tts_engine
        .synthesize(SynthesisRequest {
            text,
            voice_id: key.voice_id.clone(),
            rate: key.rate,
        })
        .await?;

    if response.audio_data.is_empty() {
        return Err(ApplicationError::generation("TTS returned empty audio"));
    }

    let path = audio_cache.write_atomic(&key, &response.audio_data).await?;
    tracing::debug!(
        path = %path.display(),
        duration_ms = ?response.duration_ms,
        "Audio generated"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{SynthesisResponse, TtsError};
    use crate::infrastructure::adapters::{FakeTtsClient, FakeTtsClientConfig, FileAudioCache};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const VOICE: &str = "zh-CN-XiaoyiNeural";

    fn fake_tts(latency_ms: u64, fail_marker: Option<&str>) -> Arc<FakeTtsClient> {
        Arc::new(FakeTtsClient::new(FakeTtsClientConfig {
            duration_ms: 50,
            latency_ms,
            fail_marker: fail_marker.map(str::to_string),
            ..Default::default()
        }))
    }

    async fn pipeline_with(
        dir: &std::path::Path,
        tts: Arc<dyn TtsEnginePort>,
        max_concurrent: usize,
    ) -> GenerationPipeline {
        let cache = Arc::new(FileAudioCache::new(dir, "wav").await.unwrap());
        GenerationPipeline::new(
            tts,
            cache,
            PipelineConfig {
                max_concurrent,
                ..Default::default()
            },
        )
    }

    fn file_count(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_cache_hit_skips_synthesis() {
        let dir = tempdir().unwrap();
        let tts = fake_tts(0, None);
        let pipeline = pipeline_with(dir.path(), tts.clone(), 0).await;

        let first = pipeline
            .generate_single("你好。", VOICE, SpeechRate::default())
            .await
            .unwrap();
        // 空白差异命中同一个缓存
        let second = pipeline
            .generate_single(" 你 好。 ", VOICE, SpeechRate::default())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(first.is_file());
        assert_eq!(tts.call_count(), 1);
    }

    #[tokio::test]
    async fn test_different_rate_is_different_entry() {
        let dir = tempdir().unwrap();
        let tts = fake_tts(0, None);
        let pipeline = pipeline_with(dir.path(), tts.clone(), 0).await;

        let normal = pipeline
            .generate_single("你好。", VOICE, SpeechRate::default())
            .await
            .unwrap();
        let fast = pipeline
            .generate_single("你好。", VOICE, SpeechRate::new(20).unwrap())
            .await
            .unwrap();

        assert_ne!(normal, fast);
        assert_eq!(tts.call_count(), 2);
    }

    #[tokio::test]
    async fn test_generate_full() {
        let dir = tempdir().unwrap();
        let tts = fake_tts(0, None);
        let pipeline = pipeline_with(dir.path(), tts.clone(), 0).await;

        let full = pipeline
            .generate_full("今天天气很好。我们去公园吧！", VOICE, SpeechRate::default())
            .await
            .unwrap();

        assert_eq!(full.segments, vec!["今天天气很好。", "我们去公园吧！"]);
        let name = full.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("full_zh_CN_XiaoyiNeural_0_"));

        // 第二次命中缓存
        pipeline
            .generate_full("今天天气很好。 我们去公园吧！", VOICE, SpeechRate::default())
            .await
            .unwrap();
        assert_eq!(tts.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let dir = tempdir().unwrap();
        let tts = fake_tts(0, None);
        let pipeline = pipeline_with(dir.path(), tts.clone(), 0).await;

        assert!(matches!(
            pipeline.generate_full("   \n", VOICE, SpeechRate::default()).await,
            Err(ApplicationError::EmptyInput(_))
        ));
        assert!(matches!(
            pipeline.generate_single("", VOICE, SpeechRate::default()).await,
            Err(ApplicationError::EmptyInput(_))
        ));
        assert_eq!(tts.call_count(), 0);
    }

    #[tokio::test]
    async fn test_synthesis_failure_leaves_no_file() {
        let dir = tempdir().unwrap();
        let tts = fake_tts(0, Some("坏"));
        let pipeline = pipeline_with(dir.path(), tts.clone(), 0).await;

        let result = pipeline
            .generate_single("坏句子。", VOICE, SpeechRate::default())
            .await;
        assert!(matches!(result, Err(ApplicationError::Generation(_))));
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_batch_partial_failure() {
        let dir = tempdir().unwrap();
        let tts = fake_tts(10, Some("坏"));
        let pipeline = pipeline_with(dir.path(), tts.clone(), 0).await;

        let segments: Vec<String> = ["一。", "二。", "坏。", "四。", "五。"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = pipeline
            .generate_batch(&segments, VOICE, SpeechRate::default())
            .await;

        assert!(!report.is_success());
        assert_eq!(report.succeeded(), 4);
        assert_eq!(report.failed(), 1);
        assert!(report.outcomes[2].result.is_err());
        assert_eq!(
            report.outcomes.iter().map(|o| o.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4]
        );
        assert_eq!(file_count(dir.path()), 4);
    }

    #[tokio::test]
    async fn test_concurrent_same_key_synthesizes_once() {
        let dir = tempdir().unwrap();
        let tts = fake_tts(100, None);
        let pipeline = Arc::new(pipeline_with(dir.path(), tts.clone(), 0).await);

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    pipeline
                        .generate_single("同一句话。", VOICE, SpeechRate::default())
                        .await
                })
            })
            .collect();

        let mut paths = Vec::new();
        for handle in handles {
            paths.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(tts.call_count(), 1);
        assert!(paths.windows(2).all(|w| w[0] == w[1]));
        assert!(pipeline.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_shared_failure_reaches_all_waiters() {
        let dir = tempdir().unwrap();
        let tts = fake_tts(50, Some("坏"));
        let pipeline = pipeline_with(dir.path(), tts.clone(), 0).await;

        let (a, b) = tokio::join!(
            pipeline.generate_single("坏。", VOICE, SpeechRate::default()),
            pipeline.generate_single("坏。", VOICE, SpeechRate::default()),
        );
        assert!(a.is_err());
        assert_eq!(a, b);
        assert_eq!(tts.call_count(), 1);

        // 失败不会被记住，下次重新合成
        let _ = pipeline
            .generate_single("坏。", VOICE, SpeechRate::default())
            .await;
        assert_eq!(tts.call_count(), 2);
    }

    /// 记录同时进行的合成数峰值
    struct PeakTts {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TtsEnginePort for PeakTts {
        async fn synthesize(
            &self,
            _request: SynthesisRequest,
        ) -> Result<SynthesisResponse, TtsError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(SynthesisResponse {
                audio_data: vec![1, 2, 3],
                duration_ms: None,
            })
        }
    }

    #[tokio::test]
    async fn test_max_concurrent_caps_synthesis() {
        let dir = tempdir().unwrap();
        let tts = Arc::new(PeakTts {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let pipeline = pipeline_with(dir.path(), tts.clone(), 2).await;

        let segments: Vec<String> = (0..6).map(|i| format!("第{}句。", i)).collect();
        let report = pipeline
            .generate_batch(&segments, VOICE, SpeechRate::default())
            .await;

        assert!(report.is_success());
        assert_eq!(tts.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_initialize_clears_cache() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("stale.mp3"), b"old").unwrap();

        let cache = Arc::new(FileAudioCache::new(dir.path(), "mp3").await.unwrap());
        let pipeline = GenerationPipeline::new(
            fake_tts(0, None),
            cache,
            PipelineConfig {
                clear_on_start: true,
                ..Default::default()
            },
        );
        pipeline.initialize().await.unwrap();

        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_initialize_tolerates_unreachable_tts() {
        use crate::infrastructure::adapters::{HttpTtsClient, HttpTtsClientConfig};

        let dir = tempdir().unwrap();
        let tts = HttpTtsClient::new(HttpTtsClientConfig::new("http://127.0.0.1:1")).unwrap();
        let pipeline = pipeline_with(dir.path(), Arc::new(tts), 0).await;

        assert!(!pipeline.tts_engine.health_check().await);
        assert!(pipeline.initialize().await.is_ok());
    }
}
