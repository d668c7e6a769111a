//! File Audio Cache - 文件系统音频缓存实现
//!
//! 实现 AudioCachePort trait

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::application::ports::{AudioCachePort, CacheError, CacheKey, ClearStats};

/// 文件系统音频缓存
pub struct FileAudioCache {
    /// 缓存根目录
    base_dir: PathBuf,
    /// 音频文件扩展名（不含点）
    extension: String,
}

impl FileAudioCache {
    /// 创建新的文件缓存
    pub async fn new(
        base_dir: impl AsRef<Path>,
        extension: impl Into<String>,
    ) -> Result<Self, CacheError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        // 确保目录存在
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| CacheError::RootUnavailable(format!("{}: {}", base_dir.display(), e)))?;

        Ok(Self {
            base_dir,
            extension: extension.into(),
        })
    }

    fn temp_path_for(&self, key: &CacheKey) -> PathBuf {
        self.base_dir
            .join(format!(".{}.{}.tmp", key.file_stem(), Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl AudioCachePort for FileAudioCache {
    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", key.file_stem(), self.extension))
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    async fn write_atomic(&self, key: &CacheKey, data: &[u8]) -> Result<PathBuf, CacheError> {
        let final_path = self.path_for(key);
        let temp_path = self.temp_path_for(key);

        fs::write(&temp_path, data)
            .await
            .map_err(|e| CacheError::IoError(format!("{}: {}", temp_path.display(), e)))?;

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::IoError(format!(
                "{}: {}",
                final_path.display(),
                e
            )));
        }

        tracing::debug!(
            path = %final_path.display(),
            size_bytes = data.len(),
            "Audio cached"
        );

        Ok(final_path)
    }

    async fn clear_all(&self) -> Result<ClearStats, CacheError> {
        let mut stats = ClearStats::default();

        let mut entries = fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| CacheError::RootUnavailable(format!("{}: {}", self.base_dir.display(), e)))?;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read cache directory entry");
                    stats.failed += 1;
                    break;
                }
            };

            let path = entry.path();
            let result = match entry.file_type().await {
                Ok(ft) if ft.is_dir() => fs::remove_dir_all(&path).await,
                Ok(_) => fs::remove_file(&path).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => stats.removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to delete cache entry");
                    stats.failed += 1;
                }
            }
        }

        tracing::info!(
            dir = %self.base_dir.display(),
            removed = stats.removed,
            failed = stats.failed,
            "Cache cleared"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{cache_key, SegmentKind};
    use crate::domain::SpeechRate;
    use tempfile::tempdir;

    fn key(text: &str) -> CacheKey {
        cache_key(text, "zh-CN-XiaoyiNeural", SpeechRate::default(), SegmentKind::Single)
    }

    #[tokio::test]
    async fn test_write_atomic_and_exists() {
        let temp_dir = tempdir().unwrap();
        let cache = FileAudioCache::new(temp_dir.path(), "mp3").await.unwrap();

        let key = key("你好。");
        let path = cache.path_for(&key);
        assert!(!cache.exists(&path));

        let written = cache.write_atomic(&key, b"fake mp3 data").await.unwrap();
        assert_eq!(written, path);
        assert!(cache.exists(&path));
        assert_eq!(std::fs::read(&path).unwrap(), b"fake mp3 data");

        // 没有残留临时文件
        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_path_naming() {
        let temp_dir = tempdir().unwrap();
        let cache = FileAudioCache::new(temp_dir.path(), "mp3").await.unwrap();

        let key = key("你好。");
        let name = cache
            .path_for(&key)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert!(name.starts_with("single_zh_CN_XiaoyiNeural_0_"));
        assert!(name.ends_with(".mp3"));
    }

    #[tokio::test]
    async fn test_exists_reflects_filesystem() {
        let temp_dir = tempdir().unwrap();
        let cache = FileAudioCache::new(temp_dir.path(), "mp3").await.unwrap();

        let path = cache.write_atomic(&key("一。"), b"data").await.unwrap();
        assert!(cache.exists(&path));

        std::fs::remove_file(&path).unwrap();
        assert!(!cache.exists(&path));
    }

    #[tokio::test]
    async fn test_clear_all() {
        let temp_dir = tempdir().unwrap();
        let cache = FileAudioCache::new(temp_dir.path(), "mp3").await.unwrap();

        for text in ["一。", "二。", "三。"] {
            cache.write_atomic(&key(text), b"data").await.unwrap();
        }
        std::fs::create_dir(temp_dir.path().join("nested")).unwrap();
        std::fs::write(temp_dir.path().join("nested/file.mp3"), b"x").unwrap();

        let stats = cache.clear_all().await.unwrap();
        assert_eq!(stats.removed, 4);
        assert_eq!(stats.failed, 0);

        // 根目录保留
        assert!(temp_dir.path().is_dir());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
