//! Storage Adapter - 音频缓存存储

mod file_cache;

pub use file_cache::FileAudioCache;
