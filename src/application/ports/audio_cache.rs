//! Audio Cache Port - 音频缓存
//!
//! 缓存条目就是磁盘上的文件，文件系统是唯一的事实来源。
//! 缓存 key 由 (去空白文本, 音色, 语速, 片段类型) 决定，具体实现使用文件目录。

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::{normalize_for_key, SpeechRate};

/// Audio Cache 错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Cache root unavailable: {0}")]
    RootUnavailable(String),
}

/// 片段类型：整段 / 单句
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Full,
    Single,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Full => "full",
            SegmentKind::Single => "single",
        }
    }
}

/// 缓存 key
///
/// 不变量: 相同输入总是得到相同的 key（纯函数）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: SegmentKind,
    pub voice_id: String,
    pub rate: SpeechRate,
    /// sha256(去空白文本) 的十六进制
    pub digest: String,
}

impl CacheKey {
    /// 文件名主干: {kind}_{voice}_{rate}_{hash}
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.kind.as_str(),
            sanitize_voice_id(&self.voice_id),
            self.rate.percent(),
            self.digest
        )
    }
}

/// 生成缓存 key
///
/// 文本先去掉所有空白，保证排版差异不会击穿缓存
pub fn cache_key(text: &str, voice_id: &str, rate: SpeechRate, kind: SegmentKind) -> CacheKey {
    let normalized = normalize_for_key(text);
    let digest = format!("{:x}", Sha256::digest(normalized.as_bytes()));
    CacheKey {
        kind,
        voice_id: voice_id.to_string(),
        rate,
        digest,
    }
}

/// 把音色标识里不适合做文件名的字符替换成下划线
pub fn sanitize_voice_id(voice_id: &str) -> String {
    voice_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// 清空统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearStats {
    pub removed: u64,
    pub failed: u64,
}

/// Audio Cache Port
#[async_trait]
pub trait AudioCachePort: Send + Sync {
    /// key 对应的文件路径（纯计算，不访问磁盘）
    fn path_for(&self, key: &CacheKey) -> PathBuf;

    /// 文件是否存在，每次调用都查询文件系统
    fn exists(&self, path: &Path) -> bool;

    /// 原子写入：先写临时文件再 rename，返回最终路径
    async fn write_atomic(&self, key: &CacheKey, data: &[u8]) -> Result<PathBuf, CacheError>;

    /// 删除缓存根目录下的全部条目
    ///
    /// 单个条目删除失败只记录日志，不中断清理
    async fn clear_all(&self) -> Result<ClearStats, CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(p: i32) -> SpeechRate {
        SpeechRate::new(p).unwrap()
    }

    #[test]
    fn test_cache_key_deterministic() {
        let a = cache_key("你好。世界！", "zh-CN-XiaoyiNeural", rate(0), SegmentKind::Full);
        let b = cache_key("你好。世界！", "zh-CN-XiaoyiNeural", rate(0), SegmentKind::Full);
        assert_eq!(a, b);
        assert_eq!(a.digest.len(), 64);
    }

    #[test]
    fn test_cache_key_ignores_whitespace() {
        let a = cache_key("你好。 世界！", "v", rate(0), SegmentKind::Single);
        let b = cache_key("  你好。\n世界！ ", "v", rate(0), SegmentKind::Single);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_key_depends_on_every_input() {
        let base = cache_key("文本。", "v1", rate(0), SegmentKind::Full);
        assert_ne!(base, cache_key("文本！", "v1", rate(0), SegmentKind::Full));
        assert_ne!(base, cache_key("文本。", "v2", rate(0), SegmentKind::Full));
        assert_ne!(base, cache_key("文本。", "v1", rate(10), SegmentKind::Full));
        assert_ne!(base, cache_key("文本。", "v1", rate(0), SegmentKind::Single));
    }

    #[test]
    fn test_file_stem_format() {
        let key = cache_key("文本。", "zh-CN-XiaoyiNeural", rate(-10), SegmentKind::Single);
        let stem = key.file_stem();
        assert!(stem.starts_with("single_zh_CN_XiaoyiNeural_-10_"));
        assert!(stem.ends_with(&key.digest));
    }

    #[test]
    fn test_sanitize_voice_id() {
        assert_eq!(sanitize_voice_id("zh-CN-Liaoning-XiaobeiNeural"), "zh_CN_Liaoning_XiaobeiNeural");
        assert_eq!(sanitize_voice_id("a/b\\c:d"), "a_b_c_d");
    }
}
